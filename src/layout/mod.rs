//! Container tree and arrangement.
//!
//! Trellis lays windows out the i3 way: every output shows one active workspace, a workspace
//! holds a list of tiling containers and a list of floating containers, and tiling containers
//! either wrap a single view (leaves) or hold child containers arranged by one of the
//! [`LayoutMode`]s.
//!
//! All nodes live in arenas inside [`Root`], which is the one context object every operation goes
//! through. Nodes refer to each other by key, so detaching and reattaching subtrees is a matter of
//! moving keys between child lists.
//!
//! Every container and workspace carries two copies of its state. Operations only ever touch the
//! *pending* copy and mark the node dirty. [`Root::commit_dirty()`] then arranges the dirty
//! subtrees, snapshots them into a [`Transaction`] and applies it, which makes pending state
//! *current* and pushes it into the [`SceneGraph`]. Rendering always follows current state, so
//! any number of mutations between two commits are presented at once.

use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use smithay::utils::{Logical, Rectangle};
use trellis_config::{Border, Colors, Config, FloatingSize, Gaps, Titlebar};
use trellis_ipc::{BorderStyle, LayoutMode, NodeType};

use self::container::Container;
use self::output::Output;
use self::scene::{RootLayers, SceneGraph};
use self::seat::Seat;
use self::view::{View, ViewState};
use self::workspace::Workspace;
use crate::utils::id::IdCounter;
use crate::utils::to_ipc_rect;

pub mod arrange;
pub mod container;
pub mod decoration;
pub mod floating;
pub mod fullscreen;
pub mod output;
pub mod scene;
pub mod scratchpad;
pub mod seat;
pub mod tiling;
pub mod transaction;
pub mod view;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use self::transaction::Transaction;

new_key_type! {
    pub struct ContainerId;
    pub struct ViewId;
    pub struct WorkspaceId;
    pub struct OutputId;
    pub struct SeatId;
}

/// Reference to any node of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Root,
    Output(OutputId),
    Workspace(WorkspaceId),
    Container(ContainerId),
}

/// Layout settings derived from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub gaps: Gaps,
    pub default_layout: LayoutMode,
    pub border: Border,
    pub floating_border: Border,
    pub titlebar: Titlebar,
    pub floating_minimum_size: FloatingSize,
    pub floating_maximum_size: FloatingSize,
    pub title_format: String,
    pub colors: Colors,
}

impl Default for Options {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Options {
    pub fn from_config(config: &Config) -> Self {
        let layout = &config.layout;

        Self {
            gaps: layout.gaps,
            default_layout: layout.default_layout,
            border: layout.border,
            floating_border: layout.floating_border,
            titlebar: layout.titlebar,
            floating_minimum_size: layout.floating_minimum_size,
            floating_maximum_size: layout.floating_maximum_size,
            title_format: layout.title_format.clone(),
            colors: config.colors,
        }
    }

    pub fn titlebar_height(&self) -> f64 {
        self.titlebar.height()
    }
}

/// The whole tree: outputs, workspaces, containers, views and seats.
pub struct Root<W: View> {
    /// Bounding box of all outputs.
    pub(crate) geometry: Rectangle<f64, Logical>,
    pub(crate) containers: SlotMap<ContainerId, Container>,
    pub(crate) views: SlotMap<ViewId, ViewState<W>>,
    pub(crate) workspaces: SlotMap<WorkspaceId, Workspace>,
    pub(crate) outputs: SlotMap<OutputId, Output>,
    /// Outputs in the order they were added.
    pub(crate) output_order: Vec<OutputId>,
    /// Workspaces left over after the last output went away.
    pub(crate) fallback_workspaces: Vec<WorkspaceId>,
    /// Containers in the scratchpad, shown or hidden.
    pub(crate) scratchpad: Vec<ContainerId>,
    /// The container in global fullscreen, if any.
    pub(crate) fullscreen_global: Option<ContainerId>,
    /// Global fullscreen container as of the last applied transaction.
    pub(crate) current_fullscreen_global: Option<ContainerId>,
    pub(crate) seats: SlotMap<SeatId, Seat>,
    pub(crate) default_seat: SeatId,
    /// Nodes whose pending state changed since the last transaction.
    pub(crate) dirty: Vec<NodeId>,
    pub(crate) root_dirty: bool,
    pub(crate) scene: Box<dyn SceneGraph>,
    pub(crate) layers: RootLayers,
    pub(crate) options: Rc<Options>,
    pub(crate) ids: IdCounter,
}

impl<W: View> Root<W> {
    pub fn new(mut scene: Box<dyn SceneGraph>, options: Options) -> anyhow::Result<Self> {
        let layers = RootLayers::new(&mut *scene)?;

        let mut seats = SlotMap::with_key();
        let default_seat = seats.insert(Seat::new(String::from("seat0")));

        Ok(Self {
            geometry: Rectangle::default(),
            containers: SlotMap::with_key(),
            views: SlotMap::with_key(),
            workspaces: SlotMap::with_key(),
            outputs: SlotMap::with_key(),
            output_order: Vec::new(),
            fallback_workspaces: Vec::new(),
            scratchpad: Vec::new(),
            fullscreen_global: None,
            current_fullscreen_global: None,
            seats,
            default_seat,
            dirty: Vec::new(),
            root_dirty: false,
            scene,
            layers,
            options: Rc::new(options),
            ids: IdCounter::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn update_config(&mut self, config: &Config) {
        self.update_options(Options::from_config(config));
    }

    pub fn update_options(&mut self, options: Options) {
        let old = std::mem::replace(&mut self.options, Rc::new(options));
        let options = self.options.clone();

        // Only containers still on the configured defaults follow the new defaults.
        let keys: Vec<_> = self.containers.keys().collect();
        for con in keys {
            if self.containers[con].view.is_none() {
                continue;
            }

            let floating = self.is_floating(con);
            let (old_border, new_border) = if floating {
                (old.floating_border, options.floating_border)
            } else {
                (old.border, options.border)
            };

            let c = &mut self.containers[con];
            if c.pending.border == old_border.style
                && c.pending.border_thickness == old_border.width.0
            {
                c.pending.border = new_border.style;
                c.pending.border_thickness = new_border.width.0;
            }
        }

        for (_, ws) in &mut self.workspaces {
            ws.gaps_inner = options.gaps.inner.0;
            ws.gaps_outer = options.gaps.outer.0;
        }

        let views: Vec<_> = self.views.keys().collect();
        for view in views {
            self.view_update_title(view, true);
        }

        self.node_set_dirty(NodeId::Root);
    }

    pub fn default_seat(&self) -> SeatId {
        self.default_seat
    }

    pub fn geometry(&self) -> Rectangle<f64, Logical> {
        self.geometry
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    pub fn workspace(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.workspaces.get(id)
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn outputs(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.output_order.iter().copied()
    }

    pub fn view(&self, id: ViewId) -> Option<&W> {
        self.views.get(id).map(|v| &v.view)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut W> {
        self.views.get_mut(id).map(|v| &mut v.view)
    }

    pub fn fullscreen_global(&self) -> Option<ContainerId> {
        self.fullscreen_global
    }

    pub fn scratchpad(&self) -> &[ContainerId] {
        &self.scratchpad
    }

    pub fn find_workspace(&self, name: &str) -> Option<WorkspaceId> {
        self.workspaces
            .iter()
            .find(|(_, ws)| !ws.destroying && ws.name == name)
            .map(|(id, _)| id)
    }

    /// Parent of a node in the tree, following pending state.
    pub fn node_parent(&self, node: NodeId) -> Option<NodeId> {
        match node {
            NodeId::Root => None,
            NodeId::Output(_) => Some(NodeId::Root),
            NodeId::Workspace(ws) => {
                let ws = self.workspaces.get(ws)?;
                ws.pending.output.map(NodeId::Output)
            }
            NodeId::Container(con) => {
                let c = self.containers.get(con)?;
                if let Some(parent) = c.pending.parent {
                    Some(NodeId::Container(parent))
                } else {
                    c.pending.workspace.map(NodeId::Workspace)
                }
            }
        }
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    pub fn node_has_ancestor(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut parent = self.node_parent(node);
        while let Some(p) = parent {
            if p == ancestor {
                return true;
            }
            parent = self.node_parent(p);
        }
        false
    }

    /// Marks a node and its ancestors as needing arrangement in the next commit.
    pub fn node_set_dirty(&mut self, node: NodeId) {
        let mut next = Some(node);
        while let Some(node) = next {
            self.mark_dirty(node);
            next = self.node_parent(node);
        }
        self.mark_dirty(NodeId::Root);
    }

    pub(crate) fn mark_dirty(&mut self, node: NodeId) {
        let flag = match node {
            NodeId::Root => &mut self.root_dirty,
            NodeId::Output(id) => match self.outputs.get_mut(id) {
                Some(output) => &mut output.dirty,
                None => return,
            },
            NodeId::Workspace(id) => match self.workspaces.get_mut(id) {
                Some(ws) => &mut ws.dirty,
                None => return,
            },
            NodeId::Container(id) => match self.containers.get_mut(id) {
                Some(con) => &mut con.dirty,
                None => return,
            },
        };

        if !*flag {
            *flag = true;
            self.dirty.push(node);
        }
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    fn ipc_node_base(&self, id: u64, node_type: NodeType, rect: Rectangle<f64, Logical>) -> trellis_ipc::Node {
        trellis_ipc::Node {
            id,
            name: None,
            node_type,
            rect: to_ipc_rect(rect),
            window_rect: trellis_ipc::Rect::default(),
            layout: LayoutMode::None,
            border: BorderStyle::None,
            current_border_width: 0.,
            fullscreen_mode: Default::default(),
            focused: false,
            urgent: false,
            sticky: false,
            representation: None,
            app_id: None,
            shell: None,
            nodes: Vec::new(),
            floating_nodes: Vec::new(),
        }
    }

    /// Snapshot of the committed tree for IPC.
    pub fn layout_tree(&self) -> trellis_ipc::Node {
        let focus = self.seat_get_focus(self.default_seat);

        let mut root = self.ipc_node_base(0, NodeType::Root, self.geometry);
        root.name = Some(String::from("root"));
        root.focused = focus == Some(NodeId::Root);

        for &output_id in &self.output_order {
            let output = &self.outputs[output_id];
            let mut node = self.ipc_node_base(output.id, NodeType::Output, output.geometry);
            node.name = Some(output.name.clone());
            node.focused = focus == Some(NodeId::Output(output_id));

            for &ws_id in &output.workspaces {
                node.nodes.push(self.ipc_workspace(ws_id, focus));
            }
            root.nodes.push(node);
        }

        root
    }

    fn ipc_workspace(&self, ws_id: WorkspaceId, focus: Option<NodeId>) -> trellis_ipc::Node {
        let ws = &self.workspaces[ws_id];
        let mut node = self.ipc_node_base(ws.id, NodeType::Workspace, ws.current.geometry);
        node.name = Some(ws.name.clone());
        node.layout = ws.layout;
        node.focused = focus == Some(NodeId::Workspace(ws_id));
        node.urgent = ws.urgent;
        node.representation = ws.representation.clone();
        node.nodes = ws
            .current
            .tiling
            .iter()
            .map(|&con| self.ipc_container(con, NodeType::Container, focus))
            .collect();
        node.floating_nodes = ws
            .current
            .floating
            .iter()
            .map(|&con| self.ipc_container(con, NodeType::FloatingContainer, focus))
            .collect();
        node
    }

    fn ipc_container(
        &self,
        con: ContainerId,
        node_type: NodeType,
        focus: Option<NodeId>,
    ) -> trellis_ipc::Node {
        let c = &self.containers[con];
        let state = &c.current;
        let mut node = self.ipc_node_base(c.id, node_type, state.geometry);

        let content = state.content;
        node.window_rect = trellis_ipc::Rect {
            x: content.loc.x - state.geometry.loc.x,
            y: content.loc.y - state.geometry.loc.y,
            width: content.size.w,
            height: content.size.h,
        };
        node.name = c.formatted_title.clone();
        node.layout = state.layout;
        node.border = state.border;
        node.current_border_width = state.border_thickness;
        node.fullscreen_mode = state.fullscreen_mode;
        node.focused = focus == Some(NodeId::Container(con));
        node.urgent = self.container_is_urgent(con);
        node.sticky = c.is_sticky;

        if let Some(view) = c.view.and_then(|v| self.views.get(v)) {
            node.app_id = view.view.app_id();
            node.shell = Some(view.view.kind().name().to_owned());
        } else {
            node.representation = c.formatted_title.clone();
            node.nodes = state
                .children
                .iter()
                .map(|&child| self.ipc_container(child, NodeType::Container, focus))
                .collect();
        }

        node
    }

    #[cfg(test)]
    pub(crate) fn debug_tree(&self) -> String {
        use std::fmt::Write as _;

        let focus = self.seat_get_focus(self.default_seat);

        let mut out = String::new();
        for &output_id in &self.output_order {
            let output = &self.outputs[output_id];
            let _ = writeln!(out, "Output {}", output.name);
            for &ws_id in &output.workspaces {
                let ws = &self.workspaces[ws_id];
                let active = if output.active_workspace == Some(ws_id) {
                    " (active)"
                } else {
                    ""
                };
                let focused = if focus == Some(NodeId::Workspace(ws_id)) {
                    " *"
                } else {
                    ""
                };
                let _ = writeln!(out, "  Workspace {}{active}{focused}", ws.name);
                for &con in ws.pending.tiling.iter() {
                    self.debug_tree_container(con, 2, "", focus, &mut out);
                }
                for &con in &ws.pending.floating {
                    self.debug_tree_container(con, 2, "Floating ", focus, &mut out);
                }
            }
        }

        for &con in &self.scratchpad {
            if self.is_scratchpad_hidden(con) {
                self.debug_tree_container(con, 0, "Scratchpad ", focus, &mut out);
            }
        }

        if out.is_empty() {
            out.push_str("(empty)\n");
        }
        out
    }

    #[cfg(test)]
    fn debug_tree_container(
        &self,
        con: ContainerId,
        depth: usize,
        prefix: &str,
        focus: Option<NodeId>,
        out: &mut String,
    ) {
        use std::fmt::Write as _;

        let indent = "  ".repeat(depth);
        let c = &self.containers[con];
        let focused = if focus == Some(NodeId::Container(con)) {
            " *"
        } else {
            ""
        };
        let fullscreen = match c.pending.fullscreen_mode {
            trellis_ipc::FullscreenMode::None => "",
            trellis_ipc::FullscreenMode::Workspace => " [fullscreen]",
            trellis_ipc::FullscreenMode::Global => " [global fullscreen]",
        };

        match c.view.and_then(|v| self.views.get(v)) {
            Some(view) => {
                let name = view.view.app_id().unwrap_or_default();
                let _ = writeln!(out, "{indent}{prefix}View {name}{fullscreen}{focused}");
            }
            None => {
                let label = c.formatted_title.as_deref().unwrap_or("(null)");
                let _ = writeln!(out, "{indent}{prefix}{label}{fullscreen}{focused}");
                for &child in c.pending.children.iter() {
                    self.debug_tree_container(child, depth + 1, "", focus, out);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn verify_invariants(&self) {
        use std::collections::HashSet;

        use approx::assert_abs_diff_eq;
        use trellis_ipc::FullscreenMode;

        let mut seen = HashSet::new();

        for &output_id in &self.output_order {
            let output = &self.outputs[output_id];
            if let Some(active) = output.active_workspace {
                assert!(
                    output.workspaces.contains(&active),
                    "active workspace must be on its output"
                );
            }
            for &ws_id in &output.workspaces {
                let ws = &self.workspaces[ws_id];
                assert_eq!(ws.pending.output, Some(output_id));
                assert!(!ws.destroying, "destroyed workspace must be off its output");
            }
        }

        for &ws_id in &self.fallback_workspaces {
            assert_eq!(self.workspaces[ws_id].pending.output, None);
        }

        let mut global_count = 0;
        for (ws_id, ws) in &self.workspaces {
            if ws.destroying {
                continue;
            }

            ws.pending.tiling.verify_invariants();
            let mut workspace_count = 0;

            for &con in ws.pending.tiling.iter() {
                assert!(
                    !ws.pending.floating.contains(&con),
                    "container cannot be both tiling and floating"
                );
                assert!(!self.is_floating(con), "tiling containers are not floating");
                let c = &self.containers[con];
                assert_eq!(c.pending.parent, None);
                self.verify_subtree(con, ws_id, &mut seen, &mut workspace_count, &mut global_count);
            }
            for &con in &ws.pending.floating {
                assert!(self.is_floating(con), "floating list holds floating containers");
                let c = &self.containers[con];
                assert_eq!(c.pending.parent, None);
                self.verify_subtree(con, ws_id, &mut seen, &mut workspace_count, &mut global_count);
            }

            assert!(
                workspace_count <= 1,
                "workspace {} has {workspace_count} fullscreen containers",
                ws.name
            );
            if let Some(fs) = ws.pending.fullscreen {
                let c = &self.containers[fs];
                assert_eq!(c.pending.fullscreen_mode, FullscreenMode::Workspace);
                assert_eq!(c.pending.workspace, Some(ws_id));
                assert!(!c.destroying);
                assert_eq!(workspace_count, 1);
            } else {
                assert_eq!(workspace_count, 0);
            }
        }

        for &con in &self.scratchpad {
            let c = &self.containers[con];
            assert!(c.scratchpad, "scratchpad containers carry the scratchpad flag");
            assert_eq!(c.pending.parent, None);
            if c.pending.workspace.is_none() {
                assert!(!seen.contains(&con));
                if c.pending.fullscreen_mode == FullscreenMode::Global {
                    global_count += 1;
                }
            }
        }

        assert!(global_count <= 1, "{global_count} containers in global fullscreen");
        if let Some(fs) = self.fullscreen_global {
            let c = &self.containers[fs];
            assert_eq!(c.pending.fullscreen_mode, FullscreenMode::Global);
            assert!(!c.destroying);
            assert_eq!(global_count, 1);
        }

        for (con, c) in &self.containers {
            if c.scratchpad {
                assert!(self.scratchpad.contains(&con));
            }
            if !c.destroying && !c.scratchpad {
                assert!(
                    seen.contains(&con) || c.pending.workspace.is_none(),
                    "container with a workspace must be reachable from it"
                );
            }
            if let Some(view) = c.view {
                assert_eq!(self.views[view].container, Some(con));
            }
            if !c.destroying {
                let urgent = match c.view {
                    Some(view) => self.views[view].urgent_at.is_some(),
                    None => c
                        .pending
                        .children
                        .iter()
                        .any(|&child| self.containers[child].pending.urgent),
                };
                assert_eq!(c.pending.urgent, urgent, "cached urgency must match the subtree");
            }
        }

        for (view_id, view) in &self.views {
            if let Some(con) = view.container {
                assert_eq!(self.containers[con].view, Some(view_id));
            }
        }

        for (_, seat) in &self.seats {
            let mut unique = HashSet::new();
            for node in &seat.focus_stack {
                assert!(unique.insert(*node), "duplicate node in focus stack");
                match *node {
                    NodeId::Container(con) => {
                        assert!(!self.containers[con].destroying, "focus stack holds live nodes")
                    }
                    NodeId::Workspace(ws) => {
                        assert!(!self.workspaces[ws].destroying, "focus stack holds live nodes")
                    }
                    _ => (),
                }
            }
        }

        // Fractions of Horizontal children always add up to one.
        for (_, c) in &self.containers {
            if !c.pending.children.is_empty() {
                let sum: f64 = (0..c.pending.children.len())
                    .map(|idx| c.pending.children.percent(idx))
                    .sum();
                assert_abs_diff_eq!(sum, 1., epsilon = 1e-6);
            }
        }
    }

    #[cfg(test)]
    fn verify_subtree(
        &self,
        con: ContainerId,
        ws: WorkspaceId,
        seen: &mut std::collections::HashSet<ContainerId>,
        workspace_count: &mut usize,
        global_count: &mut usize,
    ) {
        use trellis_ipc::FullscreenMode;

        assert!(seen.insert(con), "container must appear in the tree once");

        let c = &self.containers[con];
        assert!(!c.destroying, "destroying containers are detached");
        assert_eq!(c.pending.workspace, Some(ws), "cached workspace must match");
        match c.pending.fullscreen_mode {
            FullscreenMode::None => (),
            FullscreenMode::Workspace => *workspace_count += 1,
            FullscreenMode::Global => *global_count += 1,
        }

        if c.view.is_some() {
            assert!(
                c.pending.children.is_empty(),
                "view containers have no children"
            );
        }

        c.pending.children.verify_invariants();
        for &child in c.pending.children.iter() {
            assert_eq!(self.containers[child].pending.parent, Some(con));
            self.verify_subtree(child, ws, seen, workspace_count, global_count);
        }
    }
}
