//! Focus bookkeeping.

use super::view::View;
use super::{ContainerId, NodeId, Root, SeatId, WorkspaceId};

#[derive(Debug)]
pub struct Seat {
    pub(crate) name: String,
    /// Every node this seat has focused, most recent first.
    pub(crate) focus_stack: Vec<NodeId>,
    /// Whether the first node of the stack is actually focused.
    pub(crate) has_focus: bool,
}

impl Seat {
    pub fn new(name: String) -> Self {
        Self {
            name,
            focus_stack: Vec::new(),
            has_focus: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn focus_stack(&self) -> &[NodeId] {
        &self.focus_stack
    }
}

impl<W: View> Root<W> {
    pub fn add_seat(&mut self, name: String) -> SeatId {
        self.seats.insert(Seat::new(name))
    }

    pub fn seat_get_focus(&self, seat: SeatId) -> Option<NodeId> {
        let seat = self.seats.get(seat)?;
        if !seat.has_focus {
            return None;
        }
        seat.focus_stack.first().copied()
    }

    pub fn seat_get_focused_container(&self, seat: SeatId) -> Option<ContainerId> {
        match self.seat_get_focus(seat)? {
            NodeId::Container(con) => Some(con),
            _ => None,
        }
    }

    /// Workspace the seat is on, even if nothing on it is focused right now.
    pub fn seat_get_focused_workspace(&self, seat: SeatId) -> Option<WorkspaceId> {
        match self.seat_get_focus_inactive(seat, NodeId::Root)? {
            NodeId::Workspace(ws) => Some(ws),
            NodeId::Container(con) => self.containers[con].pending.workspace,
            NodeId::Output(output) => self.outputs[output].active_workspace,
            NodeId::Root => None,
        }
    }

    /// Most recently focused node among `node` and its descendants.
    pub fn seat_get_focus_inactive(&self, seat: SeatId, node: NodeId) -> Option<NodeId> {
        let seat = self.seats.get(seat)?;
        seat.focus_stack
            .iter()
            .copied()
            .find(|&n| n == node || self.node_has_ancestor(n, node))
    }

    /// Most recently focused view container among `node` and its descendants.
    pub fn seat_get_focus_inactive_view(&self, seat: SeatId, node: NodeId) -> Option<ContainerId> {
        let seat = self.seats.get(seat)?;
        seat.focus_stack.iter().find_map(|&n| match n {
            NodeId::Container(con)
                if self.containers[con].view.is_some()
                    && (n == node || self.node_has_ancestor(n, node)) =>
            {
                Some(con)
            }
            _ => None,
        })
    }

    /// Most recently focused tiling container of a workspace.
    pub fn seat_get_focus_inactive_tiling(
        &self,
        seat: SeatId,
        ws: WorkspaceId,
    ) -> Option<ContainerId> {
        if self.workspaces.get(ws)?.pending.tiling.is_empty() {
            return None;
        }

        let seat = self.seats.get(seat)?;
        seat.focus_stack.iter().find_map(|&n| match n {
            NodeId::Container(con)
                if self.containers[con].pending.workspace == Some(ws)
                    && !self.is_floating_or_child(con) =>
            {
                Some(con)
            }
            _ => None,
        })
    }

    /// Moves a node to the top of the focus stack without focusing it.
    pub(crate) fn seat_set_raw_focus(&mut self, seat: SeatId, node: NodeId) {
        let stack = &mut self.seats[seat].focus_stack;
        stack.retain(|n| *n != node);
        stack.insert(0, node);

        if let NodeId::Container(con) = node {
            let c = &self.containers[con];
            match (c.pending.parent, c.pending.workspace) {
                (Some(parent), _) => {
                    self.containers[parent].pending.focused_inactive_child = Some(con);
                }
                (None, Some(ws)) => {
                    self.workspaces[ws].pending.focused_inactive_child = Some(con);
                }
                (None, None) => (),
            }
        }

        self.node_set_dirty(node);
    }

    fn seat_send_focus(&mut self, node: NodeId) {
        match node {
            NodeId::Container(con) => {
                let c = &mut self.containers[con];
                c.pending.focused = true;
                if let Some(view) = c.view {
                    self.views[view].view.set_activated(true);
                    self.view_set_urgent(view, false);
                }
            }
            NodeId::Workspace(ws) => self.workspaces[ws].pending.focused = true,
            _ => (),
        }
        self.node_set_dirty(node);
    }

    fn seat_send_unfocus(&mut self, node: NodeId) {
        match node {
            NodeId::Container(con) => {
                let Some(c) = self.containers.get_mut(con) else {
                    return;
                };
                c.pending.focused = false;
                if let Some(view) = c.view {
                    self.views[view].view.set_activated(false);
                }
            }
            NodeId::Workspace(ws) => {
                let Some(ws) = self.workspaces.get_mut(ws) else {
                    return;
                };
                ws.pending.focused = false;
            }
            _ => return,
        }
        self.node_set_dirty(node);
    }

    /// Focuses a container or workspace, or clears the focus with `None`.
    ///
    /// Focus is refused for containers hidden behind a fullscreen container they're not
    /// transient for. Focusing a workspace on another workspace of its output switches to it.
    pub fn seat_set_focus(&mut self, seat: SeatId, node: Option<NodeId>) {
        if !self.seats.contains_key(seat) {
            return;
        }

        let last_focus = self.seat_get_focus(seat);
        if last_focus == node {
            return;
        }
        let last_ws = self.seat_get_focused_workspace(seat);

        let Some(node) = node else {
            if let Some(last) = last_focus {
                self.seat_send_unfocus(last);
            }
            self.seats[seat].has_focus = false;
            return;
        };

        let (new_ws, con) = match node {
            NodeId::Container(con) => match self.containers.get(con) {
                Some(c) if !c.destroying => (c.pending.workspace, Some(con)),
                _ => {
                    warn!("tried to focus a missing container");
                    return;
                }
            },
            NodeId::Workspace(ws) => match self.workspaces.get(ws) {
                Some(w) if !w.destroying => (Some(ws), None),
                _ => {
                    warn!("tried to focus a missing workspace");
                    return;
                }
            },
            _ => {
                warn!("only containers and workspaces can be focused");
                return;
            }
        };

        if let Some(con) = con {
            if self.container_obstructing_fullscreen(con).is_some() {
                debug!("not focusing {con:?}, it's behind a fullscreen container");
                return;
            }
        } else if self.fullscreen_global.is_some() {
            return;
        }

        let new_output_last_ws = new_ws
            .and_then(|ws| self.workspaces[ws].pending.output)
            .and_then(|output| self.outputs[output].active_workspace);

        if let Some(last) = last_focus {
            self.seat_send_unfocus(last);
        }

        // Put the ancestors on the stack first so focus-inactive children are right on the way
        // down.
        if let Some(con) = con {
            let mut parent = self.containers[con].pending.parent;
            while let Some(p) = parent {
                self.seat_set_raw_focus(seat, NodeId::Container(p));
                parent = self.containers[p].pending.parent;
            }
        }
        if let Some(ws) = new_ws {
            self.seat_set_raw_focus(seat, NodeId::Workspace(ws));
        }
        self.seat_set_raw_focus(seat, node);
        self.seat_send_focus(node);
        self.seats[seat].has_focus = true;

        if let Some(ws) = new_ws {
            if let Some(output) = self.workspaces[ws].pending.output {
                if new_output_last_ws != Some(ws) {
                    self.output_set_active_workspace(output, ws);
                }
            }
        }

        if let Some(last_ws) = last_ws {
            if Some(last_ws) != new_output_last_ws && Some(last_ws) != new_ws {
                self.workspace_consider_destroy(last_ws);
            }
        }
    }

    /// Drops a node that's going away from every focus stack, moving focus to what comes next.
    pub(crate) fn seats_handle_node_destroy(&mut self, node: NodeId) {
        let seats: Vec<_> = self.seats.keys().collect();
        for seat in seats {
            self.seat_handle_node_destroy(seat, node);
        }
    }

    fn seat_handle_node_destroy(&mut self, seat: SeatId, node: NodeId) {
        let focus = self.seat_get_focus(seat);
        let needs_new_focus =
            focus.is_some_and(|focus| focus == node || self.node_has_ancestor(focus, node));

        let s = &mut self.seats[seat];
        s.focus_stack.retain(|n| *n != node);
        if matches!(node, NodeId::Workspace(_)) {
            if needs_new_focus {
                s.has_focus = false;
            }
            return;
        }

        let mut parent = self.node_parent(node);
        if parent.is_none() && !needs_new_focus {
            return;
        }

        // Look for a sibling, then for anything else on the way up to the workspace.
        let mut next_focus = None;
        while let Some(p) = parent {
            next_focus = self.seat_get_focus_inactive_view(seat, p).map(NodeId::Container);
            if next_focus.is_some() {
                break;
            }
            if matches!(p, NodeId::Workspace(_)) {
                next_focus = Some(p);
                break;
            }
            parent = self.node_parent(p);
        }

        let next_focus = match next_focus {
            Some(next) => next,
            None => {
                let last_ws = self.seats[seat].focus_stack.iter().find_map(|n| match *n {
                    NodeId::Workspace(ws) => Some(ws),
                    _ => None,
                });
                let Some(ws) = last_ws else {
                    if needs_new_focus {
                        self.seats[seat].has_focus = false;
                    }
                    return;
                };
                self.seat_get_focus_inactive_view(seat, NodeId::Workspace(ws))
                    .map_or(NodeId::Workspace(ws), NodeId::Container)
            }
        };

        if let NodeId::Workspace(ws) = next_focus {
            if !self.workspace_is_visible(ws) {
                if needs_new_focus {
                    self.seats[seat].has_focus = false;
                }
                return;
            }
        }

        if needs_new_focus {
            // The next node may already be on top of the stack without having been focused.
            self.seats[seat].has_focus = false;
            self.seat_set_focus(seat, Some(next_focus));
        } else {
            let focus = self.seat_get_focus_inactive(seat, NodeId::Root);
            self.seat_set_raw_focus(seat, next_focus);
            if let Some(focus) = focus {
                if let NodeId::Container(con) = focus {
                    if let Some(ws) = self.containers[con].pending.workspace {
                        self.seat_set_raw_focus(seat, NodeId::Workspace(ws));
                    }
                }
                self.seat_set_raw_focus(seat, focus);
            }
        }
    }
}
