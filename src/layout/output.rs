use bitflags::bitflags;
use smithay::utils::{Logical, Point, Rectangle, Size};
use trellis_ipc::FullscreenMode;

use super::scene::OutputLayers;
use super::view::View;
use super::{NodeId, OutputId, Root, WorkspaceId};
use crate::utils::{bounding_box, is_empty};

bitflags! {
    /// Output edges a layer surface is attached to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Anchor : u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

/// Shell layers, bottom to top. Usable area is computed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Bottom,
    Top,
    Overlay,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// A panel, wallpaper or overlay surface placed along the edges of an output.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSurface {
    pub layer: Layer,
    pub anchor: Anchor,
    /// Space to reserve along the anchored edge. `-1` asks to ignore other reservations.
    pub exclusive_zone: i32,
    pub margin: Margins,
    /// Zero along an axis means stretch between both anchored edges.
    pub desired_size: Size<f64, Logical>,
    /// Computed placement, in output-local coordinates.
    pub geometry: Rectangle<f64, Logical>,
}

impl LayerSurface {
    pub fn new(layer: Layer, anchor: Anchor, exclusive_zone: i32, size: Size<f64, Logical>) -> Self {
        Self {
            layer,
            anchor,
            exclusive_zone,
            margin: Margins::default(),
            desired_size: size,
            geometry: Rectangle::default(),
        }
    }
}

#[derive(Debug)]
pub struct Output {
    pub(crate) id: u64,
    pub(crate) name: String,
    /// Position and size in the global space.
    pub(crate) geometry: Rectangle<f64, Logical>,
    /// Area left after exclusive zones, in output-local coordinates.
    pub(crate) usable_area: Rectangle<f64, Logical>,
    pub(crate) workspaces: Vec<WorkspaceId>,
    pub(crate) active_workspace: Option<WorkspaceId>,
    pub(crate) layer_surfaces: Vec<LayerSurface>,
    pub(crate) dirty: bool,
    pub(crate) scene: OutputLayers,
}

impl Output {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> Rectangle<f64, Logical> {
        self.geometry
    }

    pub fn usable_area(&self) -> Rectangle<f64, Logical> {
        self.usable_area
    }

    pub fn workspaces(&self) -> &[WorkspaceId] {
        &self.workspaces
    }

    pub fn active_workspace(&self) -> Option<WorkspaceId> {
        self.active_workspace
    }

    pub fn layer_surfaces(&self) -> &[LayerSurface] {
        &self.layer_surfaces
    }

    pub fn scene(&self) -> &OutputLayers {
        &self.scene
    }
}

/// Places a layer surface inside `bounds`, which are output-local.
fn place_layer_surface(surface: &LayerSurface, bounds: Rectangle<f64, Logical>) -> Rectangle<f64, Logical> {
    let anchor = surface.anchor;
    let margin = surface.margin;
    let horiz = Anchor::LEFT | Anchor::RIGHT;
    let vert = Anchor::TOP | Anchor::BOTTOM;

    let mut w = surface.desired_size.w;
    if w == 0. && anchor.contains(horiz) {
        w = bounds.size.w - margin.left - margin.right;
    }
    let mut h = surface.desired_size.h;
    if h == 0. && anchor.contains(vert) {
        h = bounds.size.h - margin.top - margin.bottom;
    }
    let (w, h) = (w.max(0.), h.max(0.));

    let x = if anchor.contains(horiz) || !anchor.intersects(horiz) {
        bounds.loc.x + (bounds.size.w - w) / 2.
    } else if anchor.contains(Anchor::LEFT) {
        bounds.loc.x + margin.left
    } else {
        bounds.loc.x + bounds.size.w - w - margin.right
    };
    let y = if anchor.contains(vert) || !anchor.intersects(vert) {
        bounds.loc.y + (bounds.size.h - h) / 2.
    } else if anchor.contains(Anchor::TOP) {
        bounds.loc.y + margin.top
    } else {
        bounds.loc.y + bounds.size.h - h - margin.bottom
    };

    Rectangle::new(Point::from((x, y)), Size::from((w, h)))
}

/// Shrinks `usable` by the exclusive zone of a surface anchored to one edge, or to one edge and
/// both edges perpendicular to it. Other anchor combinations reserve nothing.
fn apply_exclusive_zone(usable: &mut Rectangle<f64, Logical>, surface: &LayerSurface) {
    if surface.exclusive_zone <= 0 {
        return;
    }
    let zone = f64::from(surface.exclusive_zone);
    let anchor = surface.anchor;
    let margin = surface.margin;
    let horiz = Anchor::LEFT | Anchor::RIGHT;
    let vert = Anchor::TOP | Anchor::BOTTOM;

    let edge = [Anchor::TOP, Anchor::BOTTOM, Anchor::LEFT, Anchor::RIGHT]
        .into_iter()
        .find(|&edge| {
            let across = if vert.contains(edge) { horiz } else { vert };
            anchor == edge || anchor == edge | across
        });

    let Some(edge) = edge else {
        return;
    };

    if edge == Anchor::TOP {
        let amount = zone + margin.top;
        usable.loc.y += amount;
        usable.size.h -= amount;
    } else if edge == Anchor::BOTTOM {
        usable.size.h -= zone + margin.bottom;
    } else if edge == Anchor::LEFT {
        let amount = zone + margin.left;
        usable.loc.x += amount;
        usable.size.w -= amount;
    } else {
        usable.size.w -= zone + margin.right;
    }

    usable.size.w = usable.size.w.max(0.);
    usable.size.h = usable.size.h.max(0.);
}

impl<W: View> Root<W> {
    /// Adds an output, giving it the fallback workspaces or a fresh one.
    pub fn add_output(&mut self, name: String, geometry: Rectangle<f64, Logical>) -> Option<OutputId> {
        if self.find_output(&name).is_some() {
            warn!("output {name} already exists");
            return None;
        }

        let scene = match OutputLayers::new(&mut *self.scene, &self.layers) {
            Ok(scene) => scene,
            Err(err) => {
                warn!("error creating output: {err:?}");
                return None;
            }
        };

        let output = self.outputs.insert(Output {
            id: self.ids.next(),
            name,
            geometry,
            usable_area: Rectangle::new(Point::default(), geometry.size),
            workspaces: Vec::new(),
            active_workspace: None,
            layer_surfaces: Vec::new(),
            dirty: false,
            scene,
        });
        self.output_order.push(output);
        self.arrange_layers(output);

        let new_box = self.output_usable_box(output);
        for ws in std::mem::take(&mut self.fallback_workspaces) {
            let old_box = self.workspaces[ws].pending.geometry;
            self.workspace_attach_to_output(ws, output, old_box, new_box);
        }

        if self.outputs[output].workspaces.is_empty() {
            let name = self.workspace_next_name();
            if self.create_workspace(Some(output), &name).is_none() {
                if let Some(o) = self.outputs.remove(output) {
                    o.scene.destroy(&mut *self.scene);
                }
                self.output_order.retain(|o| *o != output);
                return None;
            }
        }

        self.update_root_geometry();
        debug!("added output {}", self.outputs[output].name);
        self.node_set_dirty(NodeId::Output(output));
        Some(output)
    }

    /// Removes an output, moving its workspaces to another output or to the fallback list.
    pub fn remove_output(&mut self, output: OutputId) {
        let Some(o) = self.outputs.get(output) else {
            return;
        };
        let workspaces = o.workspaces.clone();
        let destination = self.output_order.iter().copied().find(|o| *o != output);

        for ws in workspaces.iter().copied() {
            let has_others = match destination {
                Some(dest) => !self.outputs[dest].workspaces.is_empty(),
                None => !self.fallback_workspaces.is_empty(),
            };
            if self.workspaces[ws].is_empty() && has_others {
                self.workspace_begin_destroy(ws);
                continue;
            }

            let old_box = self.workspaces[ws].pending.geometry;
            self.workspace_detach(ws);
            match destination {
                Some(dest) => {
                    let new_box = self.output_usable_box(dest);
                    self.workspace_attach_to_output(ws, dest, old_box, new_box);
                }
                None => {
                    self.fallback_workspaces.push(ws);
                    self.node_set_dirty(NodeId::Workspace(ws));
                }
            }
        }

        // Workspace layers live under the output layers. Keep them, and the containers inside,
        // until the next scene update puts them where they belong.
        for ws in &workspaces {
            if let Some(w) = self.workspaces.get(*ws) {
                self.scene.reparent(w.scene.tiling, self.layers.staging);
                self.scene.reparent(w.scene.fullscreen, self.layers.staging);
            }
        }

        self.output_order.retain(|o| *o != output);
        if let Some(o) = self.outputs.remove(output) {
            debug!("removed output {}", o.name);
            o.scene.destroy(&mut *self.scene);
        }
        self.dirty.retain(|node| *node != NodeId::Output(output));

        self.update_root_geometry();
        self.node_set_dirty(NodeId::Root);
    }

    fn workspace_attach_to_output(
        &mut self,
        ws: WorkspaceId,
        output: OutputId,
        old_box: Rectangle<f64, Logical>,
        new_box: Rectangle<f64, Logical>,
    ) {
        {
            let w = &mut self.workspaces[ws];
            w.pending.output = Some(output);
            w.pending.geometry = new_box;
        }
        let o = &mut self.outputs[output];
        o.workspaces.push(ws);
        if o.active_workspace.is_none() {
            o.active_workspace = Some(ws);
        }

        let floating = self.workspaces[ws].pending.floating.clone();
        for con in floating {
            if self.containers[con].pending.fullscreen_mode == FullscreenMode::None {
                self.floating_fix_coordinates(con, old_box, new_box);
            }
        }

        self.node_set_dirty(NodeId::Workspace(ws));
    }

    pub fn find_output(&self, name: &str) -> Option<OutputId> {
        self.output_order
            .iter()
            .copied()
            .find(|o| self.outputs[*o].name == name)
    }

    pub fn set_output_geometry(&mut self, output: OutputId, geometry: Rectangle<f64, Logical>) {
        let Some(o) = self.outputs.get_mut(output) else {
            return;
        };
        if o.geometry == geometry {
            return;
        }
        o.geometry = geometry;

        self.arrange_layers(output);
        self.update_root_geometry();
        self.node_set_dirty(NodeId::Output(output));
        self.node_set_dirty(NodeId::Root);
    }

    /// Replaces the layer surfaces of an output and recomputes its usable area.
    pub fn set_layer_surfaces(&mut self, output: OutputId, surfaces: Vec<LayerSurface>) {
        let Some(o) = self.outputs.get_mut(output) else {
            return;
        };
        o.layer_surfaces = surfaces;
        self.arrange_layers(output);
        self.node_set_dirty(NodeId::Output(output));
    }

    /// Places the layer surfaces of an output and computes what's left for workspaces.
    ///
    /// Layers go from the background up, and every exclusive zone shrinks the area the
    /// following surfaces are placed in.
    pub fn arrange_layers(&mut self, output: OutputId) {
        let Some(o) = self.outputs.get_mut(output) else {
            return;
        };

        let full = Rectangle::new(Point::default(), o.geometry.size);
        let mut usable = full;

        let mut order: Vec<usize> = (0..o.layer_surfaces.len()).collect();
        order.sort_by_key(|&idx| o.layer_surfaces[idx].layer);

        for idx in order {
            let surface = &mut o.layer_surfaces[idx];
            let bounds = if surface.exclusive_zone == -1 {
                full
            } else {
                usable
            };
            surface.geometry = place_layer_surface(surface, bounds);
            apply_exclusive_zone(&mut usable, surface);
        }

        if is_empty(full) {
            usable = Rectangle::default();
        }

        if o.usable_area != usable {
            trace!("usable area of {} is now {usable:?}", o.name);
            o.usable_area = usable;
            self.node_set_dirty(NodeId::Output(output));
        }
    }

    /// Usable area of an output in global coordinates.
    pub fn output_usable_box(&self, output: OutputId) -> Rectangle<f64, Logical> {
        let Some(o) = self.outputs.get(output) else {
            return Rectangle::default();
        };
        let usable = o.usable_area;
        Rectangle::new(
            Point::from((o.geometry.loc.x + usable.loc.x, o.geometry.loc.y + usable.loc.y)),
            usable.size,
        )
    }

    fn update_root_geometry(&mut self) {
        self.geometry = bounding_box(self.output_order.iter().map(|o| self.outputs[*o].geometry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: f64, h: f64) -> Size<f64, Logical> {
        Size::from((w, h))
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rectangle<f64, Logical> {
        Rectangle::new(Point::from((x, y)), Size::from((w, h)))
    }

    #[test]
    fn top_panel_reserves_its_zone() {
        let bar = LayerSurface::new(
            Layer::Top,
            Anchor::TOP | Anchor::LEFT | Anchor::RIGHT,
            30,
            size(0., 30.),
        );
        let output = rect(0., 0., 1920., 1080.);
        assert_eq!(place_layer_surface(&bar, output), rect(0., 0., 1920., 30.));

        let mut usable = output;
        apply_exclusive_zone(&mut usable, &bar);
        assert_eq!(usable, rect(0., 30., 1920., 1050.));
    }

    #[test]
    fn corner_anchor_reserves_nothing() {
        let surface = LayerSurface::new(Layer::Top, Anchor::TOP | Anchor::LEFT, 30, size(100., 30.));
        let mut usable = rect(0., 0., 1920., 1080.);
        apply_exclusive_zone(&mut usable, &surface);
        assert_eq!(usable, rect(0., 0., 1920., 1080.));
    }

    #[test]
    fn right_dock_with_margin() {
        let mut dock = LayerSurface::new(Layer::Bottom, Anchor::RIGHT, 48, size(48., 400.));
        dock.margin.right = 4.;
        let output = rect(0., 0., 1280., 720.);
        assert_eq!(place_layer_surface(&dock, output), rect(1228., 160., 48., 400.));

        let mut usable = output;
        apply_exclusive_zone(&mut usable, &dock);
        assert_eq!(usable, rect(0., 0., 1228., 720.));
    }

    #[test]
    fn unanchored_surface_is_centered() {
        let surface = LayerSurface::new(Layer::Overlay, Anchor::empty(), 0, size(200., 100.));
        assert_eq!(
            place_layer_surface(&surface, rect(0., 0., 1000., 500.)),
            rect(400., 200., 200., 100.)
        );
    }
}
