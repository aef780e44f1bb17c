//! Scratchpad: floating containers parked off-workspace and summoned on demand.

use trellis_ipc::FullscreenMode;

use super::view::View;
use super::{ContainerId, NodeId, Root};
use crate::utils::{center, contains_point};

impl<W: View> Root<W> {
    /// Moves a container into the scratchpad and hides it.
    pub fn scratchpad_add(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if c.scratchpad {
            warn!("container {con:?} is already in the scratchpad");
            return;
        }
        if c.pending.parent.is_none() && c.pending.workspace.is_none() {
            warn!("tried to move detached container {con:?} to the scratchpad");
            return;
        }
        let ws = c.pending.workspace;

        if c.pending.fullscreen_mode != FullscreenMode::None {
            self.container_fullscreen_disable(con);
        }

        if !self.is_floating(con) {
            self.container_set_floating(con, true);
            self.container_floating_set_default_size(con);
            self.container_floating_move_to_center(con);
        }

        self.container_detach(con);
        self.containers[con].scratchpad = true;
        self.scratchpad.push(con);

        let seat = self.default_seat;
        if let Some(ws) = ws {
            let node = NodeId::Container(con);
            let had_focus = self
                .seat_get_focus(seat)
                .is_some_and(|f| f == node || self.node_has_ancestor(f, node));
            if had_focus {
                let next = self
                    .seat_get_focus_inactive(seat, NodeId::Workspace(ws))
                    .or(Some(NodeId::Workspace(ws)));
                self.seat_set_focus(seat, next);
            }
            self.workspace_consider_destroy(ws);
        }

        debug!("moved container {con:?} to the scratchpad");
        self.node_set_dirty(NodeId::Container(con));
    }

    /// Forgets that a container was in the scratchpad. It stays wherever it is.
    pub fn scratchpad_remove_container(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get_mut(con) else {
            return;
        };
        if !c.scratchpad {
            warn!("container {con:?} is not in the scratchpad");
            return;
        }

        c.scratchpad = false;
        self.scratchpad.retain(|c| *c != con);
        self.node_set_dirty(NodeId::Container(con));
    }

    /// Shows a scratchpad container on the focused workspace and focuses it.
    pub fn scratchpad_show(&mut self, con: ContainerId) {
        let seat = self.default_seat;
        let Some(new_ws) = self.seat_get_focused_workspace(seat) else {
            debug!("no focused workspace to show the scratchpad on");
            return;
        };
        if !self.containers.contains_key(con) {
            return;
        }

        if let Some(fs) = self.workspaces[new_ws].pending.fullscreen {
            self.container_fullscreen_disable(fs);
        }
        if let Some(global) = self.fullscreen_global {
            self.container_fullscreen_disable(global);
        }

        let old_ws = self.containers[con].pending.workspace;
        let con = match old_ws {
            Some(old_ws) => {
                self.container_detach(con);
                // Whatever was focused on the old workspace stays its focus-inactive node.
                if let Some(node) = self.seat_get_focus_inactive(seat, NodeId::Workspace(old_ws)) {
                    self.seat_set_raw_focus(seat, node);
                }
                con
            }
            None => self.toplevel_ancestor(con),
        };

        self.workspace_add_floating(new_ws, con);

        let area = self.workspaces[new_ws].pending.geometry;
        let geometry = self.containers[con].pending.geometry;
        if !contains_point(area, center(geometry)) {
            if geometry.size.w > area.size.w || geometry.size.h > area.size.h {
                self.container_floating_resize_and_center(con);
            }
            let size = self.containers[con].pending.geometry.size;
            let x = area.loc.x + (area.size.w - size.w) / 2.;
            let y = area.loc.y + (area.size.h - size.h) / 2.;
            self.container_floating_move_to(con, x, y);
        }

        let focus = self
            .seat_get_focus_inactive(seat, NodeId::Container(con))
            .unwrap_or(NodeId::Container(con));
        self.seat_set_focus(seat, Some(focus));

        if let Some(old_ws) = old_ws.filter(|old| *old != new_ws) {
            self.workspace_consider_destroy(old_ws);
        }

        debug!("showing scratchpad container {con:?}");
    }

    /// Takes a shown scratchpad container off its workspace.
    pub fn scratchpad_hide(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if !c.scratchpad {
            warn!("container {con:?} is not in the scratchpad");
            return;
        }
        let Some(ws) = c.pending.workspace else {
            return;
        };

        let seat = self.default_seat;
        let focus = self.seat_get_focus_inactive(seat, NodeId::Root);

        for c in self.subtree(con) {
            if self.containers[c].pending.fullscreen_mode != FullscreenMode::None {
                self.container_fullscreen_disable(c);
            }
        }

        self.container_detach(con);

        let node = NodeId::Container(con);
        if focus.is_some_and(|focus| focus == node || self.node_has_ancestor(focus, node)) {
            let next = self
                .seat_get_focus_inactive(seat, NodeId::Workspace(ws))
                .or(Some(NodeId::Workspace(ws)));
            self.seat_set_focus(seat, next);
        }

        // Hidden containers get shown again oldest first.
        self.scratchpad.retain(|c| *c != con);
        self.scratchpad.push(con);

        debug!("hid scratchpad container {con:?}");
    }

    /// Hides a scratchpad container shown on the focused workspace, otherwise shows it here.
    pub fn scratchpad_toggle(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if !c.scratchpad {
            warn!("container {con:?} is not in the scratchpad");
            return;
        }

        let ws = c.pending.workspace;
        if ws.is_some() && ws == self.seat_get_focused_workspace(self.default_seat) {
            self.scratchpad_hide(con);
        } else {
            self.scratchpad_show(con);
        }
    }

    /// Picks the scratchpad container to toggle: the focused one, one shown on the focused
    /// workspace, or else the one hidden the longest.
    pub fn scratchpad_toggle_auto(&mut self) {
        let seat = self.default_seat;
        let focus = self
            .seat_get_focused_container(seat)
            .map(|con| self.toplevel_ancestor(con));
        if let Some(focus) = focus.filter(|con| self.containers[*con].scratchpad) {
            self.scratchpad_hide(focus);
            return;
        }

        let ws = self.seat_get_focused_workspace(seat);
        let shown_here = ws.and_then(|ws| {
            self.workspaces[ws]
                .pending
                .floating
                .iter()
                .rev()
                .copied()
                .find(|con| self.containers[*con].scratchpad)
        });
        if let Some(con) = shown_here {
            self.scratchpad_hide(con);
            return;
        }

        let hidden = self
            .scratchpad
            .iter()
            .copied()
            .find(|con| self.is_scratchpad_hidden(*con));
        match hidden {
            Some(con) => self.scratchpad_show(con),
            None => debug!("scratchpad is empty"),
        }
    }
}
