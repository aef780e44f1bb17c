//! Fullscreen state machine.
//!
//! A container is either not fullscreen, fullscreen on its workspace, or fullscreen across the
//! whole layout. Each workspace has one slot for a workspace-fullscreen container and the root
//! has one slot for the global one; taking a slot evicts whoever held it.

use trellis_ipc::FullscreenMode;

use super::view::View;
use super::{ContainerId, NodeId, Root};

impl<W: View> Root<W> {
    pub fn container_set_fullscreen(&mut self, con: ContainerId, mode: FullscreenMode) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if c.destroying {
            return;
        }
        if c.pending.fullscreen_mode == mode {
            warn!("container {con:?} is already in fullscreen mode {mode:?}");
            return;
        }
        let ws = c.pending.workspace;

        match mode {
            FullscreenMode::None => self.container_fullscreen_disable(con),
            FullscreenMode::Workspace => {
                if let Some(global) = self.fullscreen_global {
                    self.container_fullscreen_disable(global);
                }
                let holder = ws.and_then(|ws| self.workspaces[ws].pending.fullscreen);
                if let Some(holder) = holder {
                    self.container_fullscreen_disable(holder);
                }
                self.container_fullscreen_workspace(con);
            }
            FullscreenMode::Global => {
                if let Some(global) = self.fullscreen_global {
                    self.container_fullscreen_disable(global);
                }
                if self.containers[con].pending.fullscreen_mode == FullscreenMode::Workspace {
                    self.container_fullscreen_disable(con);
                }
                self.container_fullscreen_global(con);
            }
        }
    }

    /// Tells every view of the subtree about its fullscreen state.
    fn set_views_fullscreen(&mut self, con: ContainerId, fullscreen: bool) {
        for c in self.subtree(con) {
            if let Some(view) = self.containers[c].view {
                self.views[view].view.set_fullscreen(fullscreen);
            }
        }
    }

    fn save_geometry(&mut self, con: ContainerId) {
        let c = &mut self.containers[con];
        c.saved_geometry = c.pending.geometry;
        c.saved_content = c.pending.content;
    }

    fn container_fullscreen_workspace(&mut self, con: ContainerId) {
        self.set_views_fullscreen(con, true);
        self.save_geometry(con);
        self.containers[con].pending.fullscreen_mode = FullscreenMode::Workspace;

        if let Some(ws) = self.containers[con].pending.workspace {
            self.workspaces[ws].pending.fullscreen = Some(con);

            let seats: Vec<_> = self.seats.keys().collect();
            for seat in seats {
                if self.seat_get_focused_workspace(seat) == Some(ws) {
                    self.seat_set_focus(seat, Some(NodeId::Container(con)));
                } else {
                    // Keep the seat where it is, but make this the one to focus on return.
                    let focus = self.seat_get_focus_inactive(seat, NodeId::Root);
                    self.seat_set_raw_focus(seat, NodeId::Container(con));
                    if let Some(focus) = focus {
                        self.seat_set_raw_focus(seat, focus);
                    }
                }
            }
        }

        debug!("container {con:?} is now fullscreen on its workspace");
        self.node_set_dirty(NodeId::Container(con));
    }

    fn container_fullscreen_global(&mut self, con: ContainerId) {
        self.set_views_fullscreen(con, true);
        self.save_geometry(con);
        self.fullscreen_global = Some(con);
        self.containers[con].pending.fullscreen_mode = FullscreenMode::Global;

        let seats: Vec<_> = self.seats.keys().collect();
        for seat in seats {
            let focus = self.seat_get_focused_container(seat);
            if focus.is_some_and(|focus| focus != con) {
                self.seat_set_focus(seat, Some(NodeId::Container(con)));
            }
        }

        debug!("container {con:?} is now fullscreen globally");
        self.node_set_dirty(NodeId::Root);
        self.node_set_dirty(NodeId::Container(con));
    }

    /// Takes a container out of fullscreen, restoring its floating geometry.
    pub fn container_fullscreen_disable(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        let mode = c.pending.fullscreen_mode;
        if mode == FullscreenMode::None {
            warn!("container {con:?} is not fullscreen");
            return;
        }

        self.set_views_fullscreen(con, false);

        let floating = self.is_floating(con);
        if floating {
            let c = &mut self.containers[con];
            c.pending.geometry = c.saved_geometry;
            c.pending.content = c.saved_content;
        }

        match mode {
            FullscreenMode::Workspace => {
                let ws = self.containers[con].pending.workspace;
                if let Some(ws) = ws.and_then(|ws| self.workspaces.get_mut(ws)) {
                    if ws.pending.fullscreen == Some(con) {
                        ws.pending.fullscreen = None;
                    }
                }
            }
            _ => {
                if self.fullscreen_global == Some(con) {
                    self.fullscreen_global = None;
                }
                self.node_set_dirty(NodeId::Root);
            }
        }

        self.containers[con].pending.fullscreen_mode = FullscreenMode::None;

        // Mapped fullscreen straight into floating, so it never had a size of its own.
        let size = self.containers[con].pending.geometry.size;
        if floating && (size.w == 0. || size.h == 0.) {
            self.container_floating_resize_and_center(con);
        }

        if self.containers[con].scratchpad {
            let seats: Vec<_> = self.seats.keys().collect();
            for seat in seats {
                let focus = self.seat_get_focused_container(seat);
                if focus.is_some_and(|focus| focus == con || self.container_has_ancestor(focus, con))
                {
                    let next = self.seat_get_focus_inactive(seat, NodeId::Root);
                    self.seat_set_focus(seat, next);
                }
            }
        }

        debug!("container {con:?} left fullscreen");
        self.node_set_dirty(NodeId::Container(con));
    }

    pub fn container_toggle_fullscreen(&mut self, con: ContainerId, mode: FullscreenMode) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if c.pending.fullscreen_mode == FullscreenMode::None {
            self.container_set_fullscreen(con, mode);
        } else {
            self.container_fullscreen_disable(con);
        }
    }

    /// Re-claims fullscreen slots for a subtree that was just attached somewhere.
    pub(crate) fn container_handle_fullscreen_reparent(&mut self, con: ContainerId) {
        for c in self.subtree(con) {
            let state = &self.containers[c].pending;
            match state.fullscreen_mode {
                FullscreenMode::None => (),
                FullscreenMode::Workspace => {
                    let Some(ws) = state.workspace else {
                        continue;
                    };
                    let holder = self.workspaces[ws].pending.fullscreen;
                    if holder == Some(c) {
                        continue;
                    }
                    if let Some(holder) = holder {
                        self.container_fullscreen_disable(holder);
                    }
                    self.workspaces[ws].pending.fullscreen = Some(c);
                    self.node_set_dirty(NodeId::Workspace(ws));
                }
                FullscreenMode::Global => {
                    let holder = self.fullscreen_global;
                    if holder == Some(c) {
                        continue;
                    }
                    if let Some(holder) = holder {
                        self.container_fullscreen_disable(holder);
                    }
                    self.fullscreen_global = Some(c);
                    self.node_set_dirty(NodeId::Root);
                }
            }
        }
    }

    /// The fullscreen container hiding `con`, if any.
    ///
    /// Views transient for the fullscreen container are drawn above it and aren't obstructed.
    pub fn container_obstructing_fullscreen(&self, con: ContainerId) -> Option<ContainerId> {
        let c = self.containers.get(con)?;

        let ws_fullscreen = c
            .pending
            .workspace
            .and_then(|ws| self.workspaces.get(ws))
            .and_then(|ws| ws.pending.fullscreen);
        if let Some(fs) = ws_fullscreen {
            if !self.is_fullscreen_or_child(con) {
                return (!self.is_transient_for(con, fs)).then_some(fs);
            }
        }

        let global = self.fullscreen_global?;
        if con != global && !self.container_has_ancestor(con, global) {
            return (!self.is_transient_for(con, global)).then_some(global);
        }

        None
    }
}
