//! Scene graph the tree renders into.
//!
//! The tree never draws anything itself. Every container owns a handful of scene nodes (its
//! title bar, border edges and a tree for the view's surfaces) and after each transaction those
//! nodes are moved into the right layer, positioned and colored according to current state.
//!
//! Container nodes are kept flat: each container tree is a direct child of a layer and positioned
//! in global coordinates, so moving a container between parents never needs nodes re-nested.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::{bail, ensure};
use smithay::utils::{Logical, Point, Rectangle, Size};
use trellis_config::{Color, ColorSet};
use trellis_ipc::LayoutMode;

use super::decoration::Edge;
use super::view::View;
use super::{ContainerId, Root};

/// Handle to a node of a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneNode(pub u64);

/// Retained scene graph of the compositor.
///
/// Children are drawn in order, later ones on top.
pub trait SceneGraph {
    fn root(&self) -> SceneNode;

    fn create_tree(&mut self, parent: SceneNode) -> anyhow::Result<SceneNode>;

    fn create_rect(
        &mut self,
        parent: SceneNode,
        size: Size<f64, Logical>,
        color: Color,
    ) -> anyhow::Result<SceneNode>;

    /// Destroys a node along with all of its children. Unknown nodes are ignored.
    fn destroy(&mut self, node: SceneNode);

    /// Moves `node` under `parent`, above its existing children.
    fn reparent(&mut self, node: SceneNode, parent: SceneNode);

    /// Sets the position of a node relative to its parent.
    fn set_position(&mut self, node: SceneNode, position: Point<f64, Logical>);

    fn set_enabled(&mut self, node: SceneNode, enabled: bool);

    fn set_size(&mut self, node: SceneNode, size: Size<f64, Logical>);

    fn set_color(&mut self, node: SceneNode, color: Color);
}

/// Creates one tree under each parent, leaving nothing behind on failure.
fn create_trees<const N: usize>(
    scene: &mut dyn SceneGraph,
    parents: [SceneNode; N],
) -> anyhow::Result<[SceneNode; N]> {
    let mut rv = [SceneNode(0); N];
    for (idx, parent) in parents.into_iter().enumerate() {
        match scene.create_tree(parent) {
            Ok(node) => rv[idx] = node,
            Err(err) => {
                for node in rv[..idx].iter().rev() {
                    scene.destroy(*node);
                }
                return Err(err);
            }
        }
    }
    Ok(rv)
}

fn create_edges(scene: &mut dyn SceneGraph, parent: SceneNode) -> anyhow::Result<[SceneNode; 4]> {
    let mut rv = [SceneNode(0); 4];
    for edge in &mut rv {
        *edge = scene.create_rect(parent, Size::default(), Color::default())?;
    }
    Ok(rv)
}

/// Top-level layers, bottom to top.
#[derive(Debug, Clone, Copy)]
pub struct RootLayers {
    pub shell_background: SceneNode,
    pub shell_bottom: SceneNode,
    pub tiling: SceneNode,
    pub floating: SceneNode,
    pub shell_top: SceneNode,
    pub fullscreen: SceneNode,
    pub fullscreen_global: SceneNode,
    pub shell_overlay: SceneNode,
    /// Disabled layer holding nodes that aren't part of the visible tree.
    pub staging: SceneNode,
}

impl RootLayers {
    pub fn new(scene: &mut dyn SceneGraph) -> anyhow::Result<Self> {
        let root = scene.root();
        let [shell_background, shell_bottom, tiling, floating, shell_top, fullscreen, fullscreen_global, shell_overlay, staging] =
            create_trees(scene, [root; 9])?;
        scene.set_enabled(staging, false);

        Ok(Self {
            shell_background,
            shell_bottom,
            tiling,
            floating,
            shell_top,
            fullscreen,
            fullscreen_global,
            shell_overlay,
            staging,
        })
    }
}

/// Per-output layers, each a child of the root layer of the same name.
#[derive(Debug, Clone, Copy)]
pub struct OutputLayers {
    pub shell_background: SceneNode,
    pub shell_bottom: SceneNode,
    pub tiling: SceneNode,
    pub fullscreen: SceneNode,
    pub shell_top: SceneNode,
    pub shell_overlay: SceneNode,
}

impl OutputLayers {
    pub fn new(scene: &mut dyn SceneGraph, root: &RootLayers) -> anyhow::Result<Self> {
        let [shell_background, shell_bottom, tiling, fullscreen, shell_top, shell_overlay] =
            create_trees(
                scene,
                [
                    root.shell_background,
                    root.shell_bottom,
                    root.tiling,
                    root.fullscreen,
                    root.shell_top,
                    root.shell_overlay,
                ],
            )?;

        Ok(Self {
            shell_background,
            shell_bottom,
            tiling,
            fullscreen,
            shell_top,
            shell_overlay,
        })
    }

    pub fn destroy(self, scene: &mut dyn SceneGraph) {
        for node in [
            self.shell_background,
            self.shell_bottom,
            self.tiling,
            self.fullscreen,
            self.shell_top,
            self.shell_overlay,
        ] {
            scene.destroy(node);
        }
    }
}

/// Workspace layers, children of the layers of the output the workspace is on.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceLayers {
    pub tiling: SceneNode,
    pub fullscreen: SceneNode,
}

impl WorkspaceLayers {
    pub fn new(scene: &mut dyn SceneGraph, parent: SceneNode) -> anyhow::Result<Self> {
        let [tiling, fullscreen] = create_trees(scene, [parent; 2])?;
        Ok(Self { tiling, fullscreen })
    }

    pub fn destroy(self, scene: &mut dyn SceneGraph) {
        scene.destroy(self.tiling);
        scene.destroy(self.fullscreen);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TitleBarScene {
    pub tree: SceneNode,
    pub background: SceneNode,
    /// Top, bottom, left and right.
    pub border: [SceneNode; 4],
}

#[derive(Debug, Clone, Copy)]
pub struct BorderScene {
    pub tree: SceneNode,
    /// Top, bottom, left and right.
    pub edges: [SceneNode; 4],
}

/// Scene nodes owned by one container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerScene {
    pub tree: SceneNode,
    pub title_bar: TitleBarScene,
    pub border: BorderScene,
    /// Where the compositor attaches the surfaces of the view.
    pub content: SceneNode,
}

impl ContainerScene {
    pub fn new(scene: &mut dyn SceneGraph, parent: SceneNode) -> anyhow::Result<Self> {
        let tree = scene.create_tree(parent)?;
        match Self::populate(scene, tree) {
            Ok(rv) => Ok(rv),
            Err(err) => {
                scene.destroy(tree);
                Err(err)
            }
        }
    }

    fn populate(scene: &mut dyn SceneGraph, tree: SceneNode) -> anyhow::Result<Self> {
        let [title_bar_tree, border_tree, content] = create_trees(scene, [tree; 3])?;

        let background = scene.create_rect(title_bar_tree, Size::default(), Color::default())?;
        let title_bar = TitleBarScene {
            tree: title_bar_tree,
            background,
            border: create_edges(scene, title_bar_tree)?,
        };
        let border = BorderScene {
            tree: border_tree,
            edges: create_edges(scene, border_tree)?,
        };

        Ok(Self {
            tree,
            title_bar,
            border,
            content,
        })
    }

    pub fn destroy(self, scene: &mut dyn SceneGraph) {
        scene.destroy(self.tree);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Full,
    /// Only the title bar, for inactive children of a stacked container.
    TitleOnly,
    Hidden,
}

/// Everything needed to push one container into the scene.
struct Placement {
    nodes: ContainerScene,
    parent: SceneNode,
    visibility: Visibility,
    geometry: Rectangle<f64, Logical>,
    content: Rectangle<f64, Logical>,
    title_bar: Option<Rectangle<f64, Logical>>,
    is_leaf: bool,
    colors: ColorSet,
    indicator: Option<Edge>,
    title_bar_border: f64,
}

fn rel(rect: Rectangle<f64, Logical>, origin: Point<f64, Logical>) -> Rectangle<f64, Logical> {
    Rectangle::new(
        Point::from((rect.loc.x - origin.x, rect.loc.y - origin.y)),
        rect.size,
    )
}

fn place_rect(scene: &mut dyn SceneGraph, node: SceneNode, rect: Rectangle<f64, Logical>, color: Color) {
    let size = Size::from((rect.size.w.max(0.), rect.size.h.max(0.)));
    scene.set_position(node, rect.loc);
    scene.set_size(node, size);
    scene.set_color(node, color);
}

/// Top, bottom, left and right edges of the frame between `outer` and `inner`.
fn frame(outer: Size<f64, Logical>, inner: Rectangle<f64, Logical>, top: f64) -> [Rectangle<f64, Logical>; 4] {
    let (w, h) = (outer.w, outer.h);
    let (cx, cy, cw, ch) = (inner.loc.x, inner.loc.y, inner.size.w, inner.size.h);
    let r = |x: f64, y: f64, w: f64, h: f64| {
        Rectangle::new(Point::from((x, y)), Size::from((w.max(0.), h.max(0.))))
    };

    [
        r(cx, top, cw, cy - top),
        r(cx, cy + ch, cw, h - (cy + ch)),
        r(0., top, cx, h - top),
        r(cx + cw, top, w - (cx + cw), h - top),
    ]
}

impl Placement {
    fn apply(&self, scene: &mut dyn SceneGraph) {
        let nodes = &self.nodes;
        scene.reparent(nodes.tree, self.parent);
        scene.set_enabled(nodes.tree, self.visibility != Visibility::Hidden);
        if self.visibility == Visibility::Hidden {
            return;
        }

        let origin = self.geometry.loc;
        scene.set_position(nodes.tree, origin);

        let mut frame_top = 0.;
        match self.title_bar {
            Some(bar) => {
                let bar = rel(bar, origin);
                if bar.loc.y >= 0. && bar.loc.y < self.geometry.size.h {
                    frame_top = bar.loc.y + bar.size.h;
                }

                let tb = &nodes.title_bar;
                scene.set_enabled(tb.tree, true);
                scene.set_position(tb.tree, bar.loc);
                place_rect(
                    scene,
                    tb.background,
                    Rectangle::new(Point::default(), bar.size),
                    self.colors.background,
                );

                let inner = Rectangle::new(
                    Point::from((self.title_bar_border, self.title_bar_border)),
                    Size::from((
                        bar.size.w - 2. * self.title_bar_border,
                        bar.size.h - 2. * self.title_bar_border,
                    )),
                );
                for (node, rect) in tb.border.iter().zip(frame(bar.size, inner, 0.)) {
                    place_rect(scene, *node, rect, self.colors.border);
                }
            }
            None => scene.set_enabled(nodes.title_bar.tree, false),
        }

        let full = self.visibility == Visibility::Full && self.is_leaf;
        scene.set_enabled(nodes.content, full);
        scene.set_enabled(nodes.border.tree, full);
        if !full {
            return;
        }

        let content = rel(self.content, origin);
        scene.set_position(nodes.content, content.loc);

        let edges = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];
        let rects = frame(self.geometry.size, content, frame_top);
        for ((node, rect), edge) in nodes.border.edges.iter().zip(rects).zip(edges) {
            let color = if self.indicator == Some(edge) {
                self.colors.indicator
            } else {
                self.colors.child_border
            };
            place_rect(scene, *node, rect, color);
        }
    }
}

impl<W: View> Root<W> {
    /// Pushes current state into the scene graph.
    pub(crate) fn update_scene(&mut self) {
        let _span = tracy_client::span!("Root::update_scene");

        let placements = self.plan_scene();
        let layers = self.layers;
        let global = self
            .current_fullscreen_global
            .filter(|con| self.containers.contains_key(*con));

        let scene = &mut *self.scene;
        scene.set_enabled(layers.tiling, global.is_none());
        scene.set_enabled(layers.floating, global.is_none());
        scene.set_enabled(layers.fullscreen, global.is_none());

        for &output_id in &self.output_order {
            let output = &self.outputs[output_id];
            for &ws_id in &output.workspaces {
                let ws = &self.workspaces[ws_id];
                let active = output.active_workspace == Some(ws_id);
                scene.reparent(ws.scene.tiling, output.scene.tiling);
                scene.reparent(ws.scene.fullscreen, output.scene.fullscreen);
                scene.set_enabled(ws.scene.tiling, active && ws.current.fullscreen.is_none());
                scene.set_enabled(ws.scene.fullscreen, active);
            }
        }
        for &ws_id in &self.fallback_workspaces {
            let ws = &self.workspaces[ws_id];
            scene.reparent(ws.scene.tiling, layers.staging);
            scene.reparent(ws.scene.fullscreen, layers.staging);
        }

        let mut placed = HashSet::new();
        for (con, placement) in &placements {
            placement.apply(scene);
            placed.insert(*con);
        }

        for (con, c) in &self.containers {
            if !placed.contains(&con) {
                scene.reparent(c.scene.tree, layers.staging);
                scene.set_enabled(c.scene.tree, false);
            }
        }
    }

    fn plan_scene(&self) -> Vec<(ContainerId, Placement)> {
        let mut rv = Vec::new();
        let layers = &self.layers;

        for &output_id in &self.output_order {
            let output = &self.outputs[output_id];
            for &ws_id in &output.workspaces {
                let ws = &self.workspaces[ws_id];
                let active = output.active_workspace == Some(ws_id);
                let fs = ws
                    .current
                    .fullscreen
                    .filter(|con| self.containers.contains_key(*con));

                for &con in ws.current.tiling.iter() {
                    self.plan_container(con, ws.scene.tiling, Visibility::Full, &mut rv);
                }

                for &con in &ws.current.floating {
                    if Some(con) == fs {
                        continue;
                    }
                    let transient = fs.is_some_and(|fs| self.is_transient_for(con, fs));
                    let (parent, visible) = match fs {
                        Some(_) if transient => (layers.fullscreen, active),
                        Some(_) => (layers.floating, false),
                        None => (layers.floating, active),
                    };
                    let visibility = if visible {
                        Visibility::Full
                    } else {
                        Visibility::Hidden
                    };
                    self.plan_container(con, parent, visibility, &mut rv);
                }

                if let Some(fs) = fs {
                    self.plan_container(fs, ws.scene.fullscreen, Visibility::Full, &mut rv);
                }
            }
        }

        if let Some(global) = self
            .current_fullscreen_global
            .filter(|con| self.containers.contains_key(*con))
        {
            self.plan_container(global, layers.fullscreen_global, Visibility::Full, &mut rv);
        }

        rv
    }

    fn plan_container(
        &self,
        con: ContainerId,
        parent: SceneNode,
        visibility: Visibility,
        out: &mut Vec<(ContainerId, Placement)>,
    ) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        let state = &c.current;

        out.retain(|(placed, _)| *placed != con);
        out.push((
            con,
            Placement {
                nodes: c.scene,
                parent,
                visibility,
                geometry: state.geometry,
                content: state.content,
                title_bar: state.title_bar,
                is_leaf: c.view.is_some(),
                colors: self.get_colors(con),
                indicator: self.indicator_edge(con),
                title_bar_border: self.options.titlebar.border_width.0,
            },
        ));

        let active = state
            .focused_inactive_child
            .filter(|child| state.children.contains(child))
            .or_else(|| state.children.first().copied());

        for &child in state.children.iter() {
            let child_visibility = match visibility {
                Visibility::Full if state.layout == LayoutMode::None && Some(child) != active => {
                    Visibility::TitleOnly
                }
                Visibility::Full => Visibility::Full,
                Visibility::TitleOnly | Visibility::Hidden => Visibility::Hidden,
            };
            self.plan_container(child, parent, child_visibility, out);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HeadlessKind {
    Tree,
    Rect { size: Size<f64, Logical>, color: Color },
}

#[derive(Debug, Clone)]
struct HeadlessNode {
    parent: Option<SceneNode>,
    children: Vec<SceneNode>,
    kind: HeadlessKind,
    position: Point<f64, Logical>,
    enabled: bool,
}

#[derive(Debug, Default)]
struct HeadlessState {
    nodes: HashMap<SceneNode, HeadlessNode>,
    next_id: u64,
    capacity: Option<usize>,
}

/// In-memory scene graph for running without a renderer.
///
/// Clones share the same graph, so a clone can be kept around to inspect the scene after handing
/// the original to [`Root`].
#[derive(Debug, Clone)]
pub struct HeadlessScene {
    inner: Rc<RefCell<HeadlessState>>,
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessScene {
    pub fn new() -> Self {
        let mut state = HeadlessState::default();
        state.nodes.insert(
            SceneNode(0),
            HeadlessNode {
                parent: None,
                children: Vec::new(),
                kind: HeadlessKind::Tree,
                position: Point::default(),
                enabled: true,
            },
        );
        state.next_id = 1;

        Self {
            inner: Rc::new(RefCell::new(state)),
        }
    }

    /// Limits how many nodes can exist at once. Allocations past the limit fail.
    pub fn set_capacity(&self, capacity: Option<usize>) {
        self.inner.borrow_mut().capacity = capacity;
    }

    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn exists(&self, node: SceneNode) -> bool {
        self.inner.borrow().nodes.contains_key(&node)
    }

    pub fn parent(&self, node: SceneNode) -> Option<SceneNode> {
        self.inner.borrow().nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: SceneNode) -> Vec<SceneNode> {
        self.inner
            .borrow()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn position(&self, node: SceneNode) -> Option<Point<f64, Logical>> {
        self.inner.borrow().nodes.get(&node).map(|n| n.position)
    }

    pub fn is_enabled(&self, node: SceneNode) -> bool {
        self.inner.borrow().nodes.get(&node).is_some_and(|n| n.enabled)
    }

    /// Whether the node and all of its ancestors are enabled.
    pub fn is_visible(&self, node: SceneNode) -> bool {
        let state = self.inner.borrow();
        let mut next = Some(node);
        while let Some(node) = next {
            match state.nodes.get(&node) {
                Some(n) if n.enabled => next = n.parent,
                _ => return false,
            }
        }
        true
    }

    /// Size and color of a rect node.
    pub fn rect(&self, node: SceneNode) -> Option<(Size<f64, Logical>, Color)> {
        match self.inner.borrow().nodes.get(&node)?.kind {
            HeadlessKind::Rect { size, color } => Some((size, color)),
            HeadlessKind::Tree => None,
        }
    }

    fn create(&mut self, parent: SceneNode, kind: HeadlessKind) -> anyhow::Result<SceneNode> {
        let mut state = self.inner.borrow_mut();
        if let Some(capacity) = state.capacity {
            ensure!(
                state.nodes.len() < capacity,
                "scene node limit of {capacity} reached"
            );
        }

        let node = SceneNode(state.next_id);
        let Some(p) = state.nodes.get_mut(&parent) else {
            bail!("parent node {parent:?} does not exist");
        };
        p.children.push(node);

        state.next_id += 1;
        state.nodes.insert(
            node,
            HeadlessNode {
                parent: Some(parent),
                children: Vec::new(),
                kind,
                position: Point::default(),
                enabled: true,
            },
        );
        Ok(node)
    }

    fn with_node(&mut self, node: SceneNode, f: impl FnOnce(&mut HeadlessNode)) {
        if let Some(n) = self.inner.borrow_mut().nodes.get_mut(&node) {
            f(n);
        }
    }
}

impl SceneGraph for HeadlessScene {
    fn root(&self) -> SceneNode {
        SceneNode(0)
    }

    fn create_tree(&mut self, parent: SceneNode) -> anyhow::Result<SceneNode> {
        self.create(parent, HeadlessKind::Tree)
    }

    fn create_rect(
        &mut self,
        parent: SceneNode,
        size: Size<f64, Logical>,
        color: Color,
    ) -> anyhow::Result<SceneNode> {
        self.create(parent, HeadlessKind::Rect { size, color })
    }

    fn destroy(&mut self, node: SceneNode) {
        if node == self.root() {
            return;
        }

        let mut state = self.inner.borrow_mut();
        let Some(n) = state.nodes.remove(&node) else {
            return;
        };
        if let Some(parent) = n.parent.and_then(|p| state.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }

        let mut stack = n.children;
        while let Some(child) = stack.pop() {
            if let Some(n) = state.nodes.remove(&child) {
                stack.extend(n.children);
            }
        }
    }

    fn reparent(&mut self, node: SceneNode, parent: SceneNode) {
        let mut state = self.inner.borrow_mut();
        if !state.nodes.contains_key(&node) || !state.nodes.contains_key(&parent) {
            return;
        }

        // Refuse to move a node below itself.
        let mut next = Some(parent);
        while let Some(ancestor) = next {
            if ancestor == node {
                return;
            }
            next = state.nodes.get(&ancestor).and_then(|n| n.parent);
        }

        let old = state.nodes.get(&node).and_then(|n| n.parent);
        if let Some(old) = old.and_then(|p| state.nodes.get_mut(&p)) {
            old.children.retain(|c| *c != node);
        }
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.push(node);
        }
        if let Some(n) = state.nodes.get_mut(&node) {
            n.parent = Some(parent);
        }
    }

    fn set_position(&mut self, node: SceneNode, position: Point<f64, Logical>) {
        self.with_node(node, |n| n.position = position);
    }

    fn set_enabled(&mut self, node: SceneNode, enabled: bool) {
        self.with_node(node, |n| n.enabled = enabled);
    }

    fn set_size(&mut self, node: SceneNode, new_size: Size<f64, Logical>) {
        self.with_node(node, |n| {
            if let HeadlessKind::Rect { size, .. } = &mut n.kind {
                *size = new_size;
            }
        });
    }

    fn set_color(&mut self, node: SceneNode, new_color: Color) {
        self.with_node(node, |n| {
            if let HeadlessKind::Rect { color, .. } = &mut n.kind {
                *color = new_color;
            }
        });
    }
}
