//! Arrangement: computing pending geometry top-down.
//!
//! Arranging is idempotent. It only writes pending state and marks what it touched dirty so the
//! next [`Transaction`](super::Transaction) picks it up. Views are configured along the way, but
//! only when their content box actually changed.

use smithay::utils::{Logical, Rectangle};
use trellis_ipc::{BorderStyle, FullscreenMode};

use super::tiling::{layout_children, TilingParams};
use super::view::View;
use super::{ContainerId, NodeId, OutputId, Root, Transaction, WorkspaceId};
use crate::utils::{bounding_box, inset, is_empty};

impl<W: View> Root<W> {
    /// Arranges everything, or only the global fullscreen container if there is one.
    pub fn arrange_root(&mut self) {
        let _span = tracy_client::span!("Root::arrange_root");

        self.geometry = bounding_box(self.output_order.iter().map(|o| self.outputs[*o].geometry));

        if let Some(global) = self.fullscreen_global {
            let geometry = self.geometry;
            self.arrange_container_in(global, geometry, None);
            return;
        }

        for output in self.output_order.clone() {
            self.arrange_output(output);
        }
    }

    /// Arranges the layer surfaces and workspaces of an output.
    ///
    /// Does nothing while a global fullscreen container covers all outputs.
    pub fn arrange_output(&mut self, output: OutputId) {
        if !self.outputs.contains_key(output) || self.fullscreen_global.is_some() {
            return;
        }

        self.arrange_layers(output);
        for ws in self.outputs[output].workspaces.clone() {
            self.arrange_workspace(ws);
        }
    }

    /// Fits a workspace to the usable area of its output and arranges its containers.
    ///
    /// Like [`Self::arrange_output()`], skipped under global fullscreen.
    pub fn arrange_workspace(&mut self, ws: WorkspaceId) {
        if self.fullscreen_global.is_some() {
            return;
        }
        let Some(w) = self.workspaces.get(ws) else {
            return;
        };
        let Some(output) = w.pending.output else {
            return;
        };
        let prev = w.pending.geometry;
        let area = self.output_usable_box(output);
        let output_box = self.outputs[output].geometry;

        self.workspaces[ws].pending.geometry = area;
        self.mark_dirty(NodeId::Workspace(ws));

        if prev != area {
            trace!("workspace {} moved to {area:?}", self.workspaces[ws].name);
            let (dx, dy) = (area.loc.x - prev.loc.x, area.loc.y - prev.loc.y);
            if !is_empty(prev) && (dx != 0. || dy != 0.) {
                for con in self.workspaces[ws].pending.floating.clone() {
                    if self.containers[con].pending.fullscreen_mode == FullscreenMode::None {
                        self.container_floating_translate(con, dx, dy);
                    }
                }
            }
            self.workspace_fix_floating_positions(ws);
        }

        let w = &self.workspaces[ws];
        let fullscreen = w.pending.fullscreen;
        let floating = w.pending.floating.clone();

        for con in floating {
            if Some(con) != fullscreen {
                self.arrange_floating(con);
            }
        }

        if let Some(fs) = fullscreen {
            self.arrange_container_in(fs, output_box, None);
            return;
        }

        let w = &self.workspaces[ws];
        let (layout, gap) = (w.layout, w.gaps_inner);
        let outer = w.gaps_outer + gap;
        let tiling = w.pending.tiling.to_vec();
        let percents: Vec<_> = (0..tiling.len())
            .map(|idx| w.pending.tiling.percent(idx))
            .collect();

        let area = inset(area, outer, outer, outer, outer);
        let params = self.tiling_params(&tiling, gap);
        let boxes = layout_children(layout, area, &percents, tiling.len(), params);
        for (con, child) in tiling.into_iter().zip(boxes) {
            self.arrange_container_in(con, child.geometry, child.title_bar);
        }
    }

    /// Re-arranges a container within the box it already has.
    pub fn arrange_container(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if self.is_floating(con) && c.pending.fullscreen_mode == FullscreenMode::None {
            self.arrange_floating(con);
            return;
        }

        let geometry = c.pending.geometry;
        let title_bar = c.pending.title_bar;
        // Keep stacked strips, which lie outside of the box.
        let strip = title_bar.filter(|bar| bar.loc.y < geometry.loc.y);
        self.arrange_container_in(con, geometry, strip);
    }

    /// Floating containers keep their box. For views, the content box is what the client got.
    fn arrange_floating(&mut self, con: ContainerId) {
        let c = &self.containers[con];
        let geometry = c.pending.geometry;

        let Some(view) = c.view else {
            self.arrange_container_in(con, geometry, None);
            return;
        };

        let state = &c.pending;
        let title_bar = (state.border == BorderStyle::Normal).then(|| {
            Rectangle::new(
                geometry.loc,
                (geometry.size.w, self.options.titlebar_height()).into(),
            )
        });
        let content = state.content;

        self.containers[con].pending.title_bar = title_bar;
        self.mark_dirty(NodeId::Container(con));
        self.view_configure(view, content);
    }

    fn tiling_params(&self, children: &[ContainerId], gap: f64) -> TilingParams {
        let collapse_single = match children {
            [only] => {
                let c = &self.containers[*only];
                c.view.is_some() && c.pending.border != BorderStyle::Normal
            }
            _ => false,
        };

        TilingParams {
            gap,
            titlebar_height: self.options.titlebar_height(),
            collapse_single,
        }
    }

    /// Gives a container its box and lays out whatever is inside.
    ///
    /// `strip` is the title bar reserved by a stacked parent. Without one, leaves with normal
    /// borders draw their title bar at the top of their own box.
    fn arrange_container_in(
        &mut self,
        con: ContainerId,
        geometry: Rectangle<f64, Logical>,
        strip: Option<Rectangle<f64, Logical>>,
    ) {
        let titlebar_height = self.options.titlebar_height();
        let Some(c) = self.containers.get_mut(con) else {
            return;
        };
        let state = &mut c.pending;
        state.geometry = geometry;

        let Some(view) = c.view else {
            state.content = geometry;
            state.title_bar = strip;

            let layout = state.layout;
            let children = state.children.to_vec();
            let percents: Vec<_> = (0..children.len())
                .map(|idx| state.children.percent(idx))
                .collect();
            let gap = state
                .workspace
                .and_then(|ws| self.workspaces.get(ws))
                .map_or(0., |ws| ws.gaps_inner);

            self.mark_dirty(NodeId::Container(con));

            let params = self.tiling_params(&children, gap);
            let boxes = layout_children(layout, geometry, &percents, children.len(), params);
            for (child, child_box) in children.into_iter().zip(boxes) {
                self.arrange_container_in(child, child_box.geometry, child_box.title_bar);
            }
            return;
        };

        let t = state.border_thickness;
        let (content, title_bar) = if state.fullscreen_mode != FullscreenMode::None {
            (geometry, None)
        } else {
            match state.border {
                BorderStyle::None | BorderStyle::Csd => (geometry, strip),
                BorderStyle::Pixel => (inset(geometry, t, t, t, t), strip),
                BorderStyle::Normal => match strip {
                    Some(strip) => (inset(geometry, t, t, t, t), Some(strip)),
                    None => {
                        let bar = Rectangle::new(
                            geometry.loc,
                            (geometry.size.w, titlebar_height.min(geometry.size.h)).into(),
                        );
                        let top = titlebar_height + t;
                        (inset(geometry, t, top, t, t), Some(bar))
                    }
                },
            }
        };

        state.content = content;
        state.title_bar = title_bar;
        self.mark_dirty(NodeId::Container(con));
        self.view_configure(view, content);
    }

    /// Arranges the dirty part of the tree and commits it.
    pub fn commit_dirty(&mut self) {
        if self.dirty.is_empty() {
            return;
        }

        let _span = tracy_client::span!("Root::commit_dirty");

        self.arrange_root();
        let transaction = Transaction::new(self);
        transaction.apply(self);
    }
}
