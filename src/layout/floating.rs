//! Floating containers.
//!
//! Floating containers sit at the root of their workspace's floating list and keep whatever
//! position and size they were given. For view containers the content box is authoritative; the
//! outer box is derived from it with [`Root::container_set_geometry_from_content()`].

use smithay::utils::{Logical, Point, Rectangle, Size};
use trellis_ipc::{BorderStyle, FullscreenMode};

use super::view::View;
use super::{ContainerId, NodeId, Root};
use crate::utils::{center, closest_rect, is_empty};

/// Size limits applied to floating containers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingConstraints {
    pub min: Size<f64, Logical>,
    pub max: Size<f64, Logical>,
}

impl FloatingConstraints {
    pub fn clamp(&self, size: Size<f64, Logical>) -> Size<f64, Logical> {
        Size::from((
            size.w.min(self.max.w).max(self.min.w),
            size.h.min(self.max.h).max(self.min.h),
        ))
    }
}

impl<W: View> Root<W> {
    /// Floating size limits for a workspace. Zero maximums fall back to the workspace size.
    pub fn floating_calculate_constraints(&self, area: Rectangle<f64, Logical>) -> FloatingConstraints {
        let min = self.options.floating_minimum_size;
        let max = self.options.floating_maximum_size;

        let limit = |configured: i32, fallback: f64| {
            if configured > 0 {
                f64::from(configured)
            } else {
                fallback
            }
        };

        FloatingConstraints {
            min: Size::from((f64::from(min.width.max(0)), f64::from(min.height.max(0)))),
            max: Size::from((limit(max.width, area.size.w), limit(max.height, area.size.h))),
        }
    }

    /// Makes a container floating or puts it back into the tiling layout.
    pub fn container_set_floating(&mut self, con: ContainerId, enable: bool) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if self.is_floating(con) == enable {
            return;
        }
        let Some(ws) = c.pending.workspace else {
            warn!("tried to change floating state of detached container {con:?}");
            return;
        };
        let view = c.view;

        let seat = self.default_seat;
        let set_focus = self.seat_get_focused_container(seat) == Some(con);

        if enable {
            let old_parent = c.pending.parent;
            self.container_detach(con);
            self.workspace_add_floating(ws, con);
            if let Some(view) = view {
                self.views[view].view.set_tiled(false);
            }

            self.container_floating_set_default_size(con);
            self.container_floating_resize_and_center(con);

            if let Some(old_parent) = old_parent {
                if set_focus {
                    self.seat_set_raw_focus(seat, NodeId::Container(old_parent));
                    self.seat_set_raw_focus(seat, NodeId::Container(con));
                }
                self.container_reap_empty(old_parent);
            }
        } else {
            if self.containers[con].scratchpad {
                self.scratchpad_remove_container(con);
            }
            self.container_detach(con);

            match self.seat_get_focus_inactive_tiling(seat, ws) {
                Some(reference) if self.containers[reference].view.is_some() => {
                    self.container_add_sibling(reference, con, true);
                }
                Some(reference) => self.container_add_child(reference, con),
                None => self.workspace_add_tiling(ws, con),
            }

            if let Some(view) = view {
                self.views[view].view.set_tiled(true);
            }
            if set_focus {
                self.seat_set_raw_focus(seat, NodeId::Container(con));
            }
        }

        debug!("container {con:?} floating: {enable}");
        self.node_set_dirty(NodeId::Container(con));
    }

    /// Gives a floating container half the width and three quarters of the height of its
    /// workspace, within the configured limits.
    pub fn container_floating_set_default_size(&mut self, con: ContainerId) {
        let Some(area) = self.container_workspace_box(con) else {
            return;
        };
        let constraints = self.floating_calculate_constraints(area);
        let size = constraints.clamp(Size::from((area.size.w * 0.5, area.size.h * 0.75)));

        let c = &mut self.containers[con];
        if c.view.is_none() {
            c.pending.geometry.size = size;
        } else {
            c.pending.content.size = size;
            self.container_set_geometry_from_content(con);
        }
    }

    /// Sizes a floating container to its natural size and centers it on its workspace.
    ///
    /// Containers larger than the workspace are centered on the output instead. On an output with
    /// no area the container gets a zero box.
    pub fn container_floating_resize_and_center(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        let Some(ws_id) = c.pending.workspace else {
            warn!("tried to center floating container {con:?} without a workspace");
            return;
        };
        let ws = &self.workspaces[ws_id];
        let area = ws.pending.geometry;
        let output_box = ws
            .pending
            .output
            .map(|output| self.outputs[output].geometry)
            .unwrap_or_default();

        if is_empty(output_box) {
            // Gets sized for real once the workspace lands on an output.
            let c = &mut self.containers[con];
            c.pending.geometry = Rectangle::default();
            c.pending.content = Rectangle::default();
            return;
        }

        let constraints = self.floating_calculate_constraints(area);
        let centered_in = |size: Size<f64, Logical>| {
            let target = if size.w > area.size.w || size.h > area.size.h {
                output_box
            } else {
                area
            };
            Point::from((
                target.loc.x + (target.size.w - size.w) / 2.,
                target.loc.y + (target.size.h - size.h) / 2.,
            ))
        };

        match c.view.and_then(|view| self.views.get(view)) {
            Some(view) => {
                let size = constraints.clamp(view.natural_size);
                let size = view.view.constraints().clamp(size);
                let loc = centered_in(size);
                self.containers[con].pending.content = Rectangle::new(loc, size);
                self.container_set_geometry_from_content(con);
            }
            None => {
                let size = constraints.clamp(c.pending.geometry.size);
                let loc = centered_in(size);
                self.containers[con].pending.geometry = Rectangle::new(loc, size);
            }
        }

        self.node_set_dirty(NodeId::Container(con));
    }

    /// Derives the outer box of a floating view container from its content box.
    pub fn container_set_geometry_from_content(&mut self, con: ContainerId) {
        let titlebar_height = self.options.titlebar_height();
        let Some(c) = self.containers.get_mut(con) else {
            return;
        };
        if c.view.is_none() {
            warn!("only view containers have a content box");
            return;
        }

        let state = &mut c.pending;
        let (border_width, top) = if state.fullscreen_mode != FullscreenMode::None {
            (0., 0.)
        } else {
            match state.border {
                BorderStyle::None | BorderStyle::Csd => (0., 0.),
                BorderStyle::Pixel => (state.border_thickness, state.border_thickness),
                BorderStyle::Normal => (
                    state.border_thickness,
                    titlebar_height + state.border_thickness,
                ),
            }
        };

        let content = state.content;
        state.geometry = Rectangle::new(
            Point::from((content.loc.x - border_width, content.loc.y - top)),
            Size::from((
                content.size.w + border_width * 2.,
                top + content.size.h + border_width,
            )),
        );

        self.node_set_dirty(NodeId::Container(con));
    }

    pub fn container_floating_move_to_center(&mut self, con: ContainerId) {
        let Some(area) = self.container_workspace_box(con) else {
            return;
        };
        let geometry = self.containers[con].pending.geometry;
        let x = area.loc.x + (area.size.w - geometry.size.w) / 2.;
        let y = area.loc.y + (area.size.h - geometry.size.h) / 2.;
        self.container_floating_translate(con, x - geometry.loc.x, y - geometry.loc.y);
    }

    /// Moves a floating container and everything inside it.
    pub fn container_floating_translate(&mut self, con: ContainerId, dx: f64, dy: f64) {
        if !self.containers.contains_key(con) {
            return;
        }

        for c in self.subtree(con) {
            let state = &mut self.containers[c].pending;
            state.geometry.loc.x += dx;
            state.geometry.loc.y += dy;
            state.content.loc.x += dx;
            state.content.loc.y += dy;
            if let Some(bar) = &mut state.title_bar {
                bar.loc.x += dx;
                bar.loc.y += dy;
            }
        }

        self.node_set_dirty(NodeId::Container(con));
    }

    /// Output whose box is closest to the center of a floating container.
    pub fn container_floating_find_output(&self, con: ContainerId) -> Option<super::OutputId> {
        let geometry = self.containers.get(con)?.pending.geometry;
        let idx = closest_rect(
            self.output_order.iter().map(|o| self.outputs[*o].geometry),
            center(geometry),
        )?;
        self.output_order.get(idx).copied()
    }

    /// Moves a floating container to a global position, switching it to the workspace of the
    /// output it lands on.
    pub fn container_floating_move_to(&mut self, con: ContainerId, x: f64, y: f64) {
        if !self.is_floating(con) {
            warn!("tried to move non-floating container {con:?} as floating");
            return;
        }

        let geometry = self.containers[con].pending.geometry;
        self.container_floating_translate(con, x - geometry.loc.x, y - geometry.loc.y);

        let old_ws = self.containers[con].pending.workspace;
        let new_ws = self
            .container_floating_find_output(con)
            .and_then(|output| self.outputs[output].active_workspace);
        if let (Some(old_ws), Some(new_ws)) = (old_ws, new_ws) {
            if old_ws != new_ws {
                self.container_detach(con);
                self.workspace_add_floating(new_ws, con);
                self.workspace_detect_urgent(old_ws);
                self.workspace_detect_urgent(new_ws);
            }
        }
    }

    /// Moves a floating container from one workspace box to another, keeping the position of
    /// its center relative to the workspace.
    pub fn floating_fix_coordinates(
        &mut self,
        con: ContainerId,
        old: Rectangle<f64, Logical>,
        new: Rectangle<f64, Logical>,
    ) {
        let Some(c) = self.containers.get(con) else {
            return;
        };

        if old.size.w == 0. || old.size.h == 0. {
            self.container_floating_move_to_center(con);
            return;
        }

        let geometry = c.pending.geometry;
        let rel_x = geometry.loc.x - old.loc.x + geometry.size.w / 2.;
        let rel_y = geometry.loc.y - old.loc.y + geometry.size.h / 2.;
        let x = new.loc.x + rel_x * new.size.w / old.size.w - geometry.size.w / 2.;
        let y = new.loc.y + rel_y * new.size.h / old.size.h - geometry.size.h / 2.;

        self.container_floating_translate(con, x - geometry.loc.x, y - geometry.loc.y);
    }

    /// Makes a floating container follow the focused workspace of its output.
    pub fn container_set_sticky(&mut self, con: ContainerId, sticky: bool) {
        let Some(c) = self.containers.get_mut(con) else {
            return;
        };
        c.is_sticky = sticky;
        let ws = c.pending.workspace;

        if !sticky || !self.is_floating(con) {
            return;
        }

        // Sticky containers are always on the visible workspace.
        let Some(ws) = ws else {
            return;
        };
        let active = self.workspaces[ws]
            .pending
            .output
            .and_then(|output| self.outputs[output].active_workspace);
        if let Some(active) = active.filter(|active| *active != ws) {
            self.move_container_to_workspace(con, active);
        }
    }

    fn container_workspace_box(&self, con: ContainerId) -> Option<Rectangle<f64, Logical>> {
        let ws = self.containers.get(con)?.pending.workspace?;
        Some(self.workspaces[ws].pending.geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_clamp() {
        let constraints = FloatingConstraints {
            min: Size::from((75., 50.)),
            max: Size::from((1920., 1080.)),
        };
        assert_eq!(constraints.clamp(Size::from((0., 0.))), Size::from((75., 50.)));
        assert_eq!(
            constraints.clamp(Size::from((4000., 600.))),
            Size::from((1920., 600.))
        );
    }
}
