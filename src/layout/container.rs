//! Containers: the nodes of the tree.
//!
//! A container either wraps one view (a leaf) or holds an ordered list of child containers. Top
//! level containers have no parent and sit directly in their workspace's tiling or floating list.
//! Every container caches the workspace it belongs to; attaching a subtree re-stamps that cache on
//! every descendant.

use std::ops::Deref;

use smithay::utils::{Logical, Rectangle};
use trellis_ipc::{BorderStyle, FullscreenMode, LayoutMode};

use super::scene::ContainerScene;
use super::view::View;
use super::{ContainerId, NodeId, Root, ViewId, WorkspaceId};

const MIN_CHILD_PERCENT: f64 = 0.05;

/// Ordered list of children along with the share of the parent each child takes.
///
/// Shares are only used by [`LayoutMode::Horizontal`], but they are kept for every list so that
/// switching layouts back and forth preserves them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChildList {
    ids: Vec<ContainerId>,
    /// Relative sizes of children, normalized to sum to 1.
    percents: Vec<f64>,
}

impl Deref for ChildList {
    type Target = [ContainerId];

    fn deref(&self) -> &Self::Target {
        &self.ids
    }
}

impl ChildList {
    pub fn push(&mut self, id: ContainerId) {
        self.insert(self.ids.len(), id);
    }

    /// Inserts a child, giving it an equal share taken proportionally from the others.
    pub fn insert(&mut self, idx: usize, id: ContainerId) {
        let idx = idx.min(self.ids.len());
        let old_len = self.ids.len();

        if old_len == 0 {
            self.ids.insert(idx, id);
            self.percents.clear();
            self.percents.push(1.0);
            return;
        }

        if self.percents.len() != old_len {
            self.percents.clear();
            let value = 1.0 / old_len as f64;
            self.percents.resize(old_len, value);
        } else {
            self.normalize_percents();
        }

        let new_share = 1.0 / (old_len as f64 + 1.0);
        let scale = 1.0 - new_share;
        for percent in &mut self.percents {
            *percent *= scale;
        }

        self.ids.insert(idx, id);
        self.percents.insert(idx, new_share);
        self.normalize_percents();
    }

    /// Removes a child, returning the index it was at.
    pub fn remove(&mut self, id: ContainerId) -> Option<usize> {
        let idx = self.ids.iter().position(|&c| c == id)?;

        self.ids.remove(idx);
        let removed_percent = if self.percents.len() == self.ids.len() + 1 {
            self.percents.remove(idx)
        } else {
            0.0
        };

        if self.ids.is_empty() {
            self.percents.clear();
            return Some(idx);
        }

        if self.percents.len() != self.ids.len() {
            self.recalculate_percents();
            return Some(idx);
        }

        let remaining = 1.0 - removed_percent;
        if remaining > f64::EPSILON {
            let scale = 1.0 / remaining;
            for percent in &mut self.percents {
                *percent *= scale;
            }
            self.normalize_percents();
        } else {
            self.recalculate_percents();
        }

        Some(idx)
    }

    /// Puts `new` in place of `old`, keeping its share.
    pub fn replace(&mut self, old: ContainerId, new: ContainerId) -> bool {
        match self.ids.iter_mut().find(|c| **c == old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    pub fn position(&self, id: ContainerId) -> Option<usize> {
        self.ids.iter().position(|&c| c == id)
    }

    pub fn percent(&self, idx: usize) -> f64 {
        self.percents.get(idx).copied().unwrap_or(0.0)
    }

    /// Sets the share of one child, scaling the others to fit the rest.
    pub fn set_percent(&mut self, idx: usize, percent: f64) {
        if self.percents.len() != self.ids.len() {
            self.recalculate_percents();
        }

        if self.percents.is_empty() || idx >= self.percents.len() {
            return;
        }

        let len = self.percents.len();
        if len == 1 {
            self.percents[0] = 1.0;
            return;
        }

        let min = MIN_CHILD_PERCENT;
        let max = 1.0 - min * (len as f64 - 1.0);
        let new_percent = percent.clamp(min, max.max(min));

        self.percents[idx] = new_percent;

        let mut remaining = 1.0 - new_percent;
        if remaining <= f64::EPSILON {
            remaining = min * (len as f64 - 1.0);
        }

        let others_sum: f64 = self
            .percents
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, value)| *value)
            .sum();

        if others_sum <= f64::EPSILON {
            let share = remaining / (len as f64 - 1.0);
            for (i, value) in self.percents.iter_mut().enumerate() {
                if i != idx {
                    *value = share;
                }
            }
        } else {
            let scale = remaining / others_sum;
            for (i, value) in self.percents.iter_mut().enumerate() {
                if i != idx {
                    *value *= scale;
                }
            }
        }

        self.normalize_percents();
    }

    fn recalculate_percents(&mut self) {
        if self.ids.is_empty() {
            self.percents.clear();
            return;
        }
        let value = 1.0 / self.ids.len() as f64;
        self.percents.clear();
        self.percents.resize(self.ids.len(), value);
    }

    fn normalize_percents(&mut self) {
        if self.percents.is_empty() {
            return;
        }
        let mut sum = 0.0;
        for percent in &self.percents {
            if !percent.is_finite() || *percent < 0.0 {
                sum = 0.0;
                break;
            }
            sum += *percent;
        }
        if sum <= f64::EPSILON {
            self.recalculate_percents();
            return;
        }
        for percent in &mut self.percents {
            *percent /= sum;
        }
    }

    #[cfg(test)]
    pub(crate) fn verify_invariants(&self) {
        assert_eq!(self.ids.len(), self.percents.len());
        for percent in &self.percents {
            assert!(percent.is_finite() && *percent >= 0.);
        }
    }
}

/// Double-buffered part of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerState {
    /// Outer box in global coordinates, decorations included.
    pub geometry: Rectangle<f64, Logical>,
    /// Box handed to the view, in global coordinates.
    pub content: Rectangle<f64, Logical>,
    /// Where this container's title bar is drawn, if it has one.
    ///
    /// For children of a [`LayoutMode::None`] parent this is the strip the parent reserved,
    /// which lies outside of `geometry`.
    pub title_bar: Option<Rectangle<f64, Logical>>,
    pub layout: LayoutMode,
    pub children: ChildList,
    pub parent: Option<ContainerId>,
    pub workspace: Option<WorkspaceId>,
    pub fullscreen_mode: FullscreenMode,
    pub border: BorderStyle,
    pub border_thickness: f64,
    pub alpha: f32,
    /// Whether a seat focuses this container directly.
    pub focused: bool,
    /// Child that was focused most recently.
    pub focused_inactive_child: Option<ContainerId>,
    /// Whether this container's view, or any view below it, wants attention.
    pub urgent: bool,
}

#[derive(Debug)]
pub struct Container {
    pub(crate) id: u64,
    pub(crate) pending: ContainerState,
    pub(crate) current: ContainerState,
    pub(crate) view: Option<ViewId>,
    /// Raw title of the view.
    pub(crate) title: Option<String>,
    /// Title after applying the title format, or the representation for interior containers.
    pub(crate) formatted_title: Option<String>,
    pub(crate) scratchpad: bool,
    pub(crate) is_sticky: bool,
    /// Geometry to restore when a floating container leaves fullscreen.
    pub(crate) saved_geometry: Rectangle<f64, Logical>,
    pub(crate) saved_content: Rectangle<f64, Logical>,
    /// Number of in-flight transactions referencing this container.
    pub(crate) ntxnrefs: usize,
    pub(crate) destroying: bool,
    pub(crate) dirty: bool,
    pub(crate) scene: ContainerScene,
}

impl Container {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pending(&self) -> &ContainerState {
        &self.pending
    }

    pub fn current(&self) -> &ContainerState {
        &self.current
    }

    pub fn view(&self) -> Option<ViewId> {
        self.view
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn formatted_title(&self) -> Option<&str> {
        self.formatted_title.as_deref()
    }

    pub fn is_scratchpad(&self) -> bool {
        self.scratchpad
    }

    pub fn is_destroying(&self) -> bool {
        self.destroying
    }

    pub fn scene(&self) -> &ContainerScene {
        &self.scene
    }
}

/// Bracket glyph for the representation of a layout.
fn representation_glyph(layout: LayoutMode) -> &'static str {
    match layout {
        LayoutMode::Horizontal => "V",
        LayoutMode::OneTwo => "H",
        LayoutMode::TwoOne => "T",
        LayoutMode::Grid => "S",
        LayoutMode::None => "D",
    }
}

impl<W: View> Root<W> {
    /// Creates a detached container, wrapping `view` if given.
    ///
    /// Returns `None` if the view is already in a container or the scene nodes could not be
    /// allocated; nothing is left behind in that case.
    pub fn create_container(&mut self, view: Option<ViewId>) -> Option<ContainerId> {
        if let Some(view) = view {
            match self.views.get(view) {
                Some(v) if v.container.is_none() => (),
                Some(_) => {
                    warn!("view is already in a container");
                    return None;
                }
                None => {
                    warn!("tried to create a container for a missing view");
                    return None;
                }
            }
        }

        let scene = match ContainerScene::new(&mut *self.scene, self.layers.staging) {
            Ok(scene) => scene,
            Err(err) => {
                warn!("error creating container: {err:?}");
                return None;
            }
        };

        let border = self.options.border;
        let state = ContainerState {
            geometry: Rectangle::default(),
            content: Rectangle::default(),
            title_bar: None,
            layout: if view.is_some() {
                LayoutMode::None
            } else {
                self.options.default_layout
            },
            children: ChildList::default(),
            parent: None,
            workspace: None,
            fullscreen_mode: FullscreenMode::None,
            border: border.style,
            border_thickness: border.width.0,
            alpha: 1.,
            focused: false,
            focused_inactive_child: None,
            urgent: false,
        };

        let con = self.containers.insert(Container {
            id: self.ids.next(),
            pending: state.clone(),
            current: state,
            view,
            title: None,
            formatted_title: None,
            scratchpad: false,
            is_sticky: false,
            saved_geometry: Rectangle::default(),
            saved_content: Rectangle::default(),
            ntxnrefs: 0,
            destroying: false,
            dirty: false,
            scene,
        });

        if let Some(view) = view {
            self.views[view].container = Some(con);
        }

        trace!("created container {con:?}");
        self.node_set_dirty(NodeId::Container(con));
        Some(con)
    }

    /// Starts destroying a container: detaches it and frees it once no transaction uses it.
    pub fn begin_destroy_container(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if c.destroying {
            return;
        }
        if !c.pending.children.is_empty() {
            error!("tried to destroy container {con:?} which still has children");
            return;
        }

        // Clear the slot first so that seats pick their new focus away from this container.
        match c.pending.fullscreen_mode {
            FullscreenMode::None => (),
            FullscreenMode::Workspace => {
                if let Some(ws) = c.pending.workspace {
                    let ws = &mut self.workspaces[ws];
                    if ws.pending.fullscreen == Some(con) {
                        ws.pending.fullscreen = None;
                    }
                }
            }
            FullscreenMode::Global => {
                if self.fullscreen_global == Some(con) {
                    self.fullscreen_global = None;
                }
            }
        }

        self.seats_handle_node_destroy(NodeId::Container(con));

        self.node_set_dirty(NodeId::Container(con));
        self.containers[con].destroying = true;

        if self.containers[con].scratchpad {
            self.scratchpad_remove_container(con);
        }

        if self.containers[con].pending.fullscreen_mode == FullscreenMode::Global {
            self.container_fullscreen_disable(con);
        }

        self.container_detach(con);
    }

    /// Frees a container marked as destroying.
    ///
    /// Refuses to do anything while transactions still reference the container.
    pub fn destroy_container(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if !c.destroying {
            error!("tried to free container {con:?} which wasn't marked as destroying");
            return;
        }
        if c.ntxnrefs != 0 {
            error!(
                "tried to free container {con:?} which is still referenced by {} transactions",
                c.ntxnrefs
            );
            return;
        }

        let Some(c) = self.containers.remove(con) else {
            return;
        };
        c.scene.destroy(&mut *self.scene);

        if let Some(view) = c.view.and_then(|view| self.views.get_mut(view)) {
            if view.container == Some(con) {
                view.container = None;
            }
        }

        self.dirty.retain(|node| *node != NodeId::Container(con));
        trace!("freed container {con:?}");
    }

    /// Checks that `child` can be put under `target` without creating a cycle.
    pub(crate) fn can_attach(&self, child: ContainerId, target: NodeId) -> bool {
        let Some(c) = self.containers.get(child) else {
            warn!("tried to attach a missing container");
            return false;
        };
        if c.destroying {
            warn!("tried to attach container {child:?} which is being destroyed");
            return false;
        }

        match target {
            NodeId::Container(parent) => {
                let Some(p) = self.containers.get(parent) else {
                    warn!("tried to attach to a missing container");
                    return false;
                };
                if p.view.is_some() {
                    warn!("tried to attach a child to view container {parent:?}");
                    return false;
                }
                if parent == child || self.container_has_ancestor(parent, child) {
                    warn!("tried to attach container {child:?} inside itself");
                    return false;
                }
                true
            }
            NodeId::Workspace(ws) => match self.workspaces.get(ws) {
                Some(ws) => !ws.destroying,
                None => {
                    warn!("tried to attach to a missing workspace");
                    false
                }
            },
            _ => false,
        }
    }

    /// Appends `child` to the children of `parent`, detaching it first.
    pub fn container_add_child(&mut self, parent: ContainerId, child: ContainerId) {
        let len = match self.containers.get(parent) {
            Some(p) => p.pending.children.len(),
            None => 0,
        };
        self.container_insert_child(parent, child, len);
    }

    /// Inserts `child` at `idx` among the children of `parent`, detaching it first.
    pub fn container_insert_child(&mut self, parent: ContainerId, child: ContainerId, idx: usize) {
        if !self.can_attach(child, NodeId::Container(parent)) {
            return;
        }

        self.container_detach(child);

        let p = &mut self.containers[parent];
        p.pending.children.insert(idx, child);
        let ws = p.pending.workspace;

        self.containers[child].pending.parent = Some(parent);
        self.container_attached(child, ws);
    }

    /// Puts `child` next to `sibling`, in whatever list `sibling` is in.
    pub fn container_add_sibling(&mut self, sibling: ContainerId, child: ContainerId, after: bool) {
        if sibling == child {
            return;
        }
        let Some(s) = self.containers.get(sibling) else {
            warn!("tried to add a sibling to a missing container");
            return;
        };
        let target = match (s.pending.parent, s.pending.workspace) {
            (Some(parent), _) => NodeId::Container(parent),
            (None, Some(ws)) => NodeId::Workspace(ws),
            (None, None) => {
                warn!("tried to add a sibling to detached container {sibling:?}");
                return;
            }
        };
        if !self.can_attach(child, target) {
            return;
        }

        self.container_detach(child);

        let s = &self.containers[sibling];
        let (parent, ws) = (s.pending.parent, s.pending.workspace);
        let offset = usize::from(after);

        match (parent, ws) {
            (Some(parent), _) => {
                let children = &mut self.containers[parent].pending.children;
                let idx = children.position(sibling).map_or(children.len(), |i| i + offset);
                children.insert(idx, child);
            }
            (None, Some(ws)) => {
                let state = &mut self.workspaces[ws].pending;
                if let Some(idx) = state.floating.iter().position(|&c| c == sibling) {
                    state.floating.insert(idx + offset, child);
                } else {
                    let idx = state
                        .tiling
                        .position(sibling)
                        .map_or(state.tiling.len(), |i| i + offset);
                    state.tiling.insert(idx, child);
                }
            }
            (None, None) => return,
        }

        self.containers[child].pending.parent = parent;
        self.container_attached(child, ws);
    }

    /// Finishes attaching a subtree that was just inserted into a list.
    pub(crate) fn container_attached(&mut self, con: ContainerId, ws: Option<WorkspaceId>) {
        for c in self.subtree(con) {
            self.containers[c].pending.workspace = ws;
        }

        self.container_handle_fullscreen_reparent(con);

        self.container_update_urgent(con);
        let c = &self.containers[con];
        if let Some(parent) = c.pending.parent {
            self.container_update_urgent(parent);
            self.container_update_representation(parent);
        } else if let Some(ws) = ws {
            self.workspace_update_representation(ws);
        }

        if let Some(ws) = ws {
            self.workspace_detect_urgent(ws);
        }

        self.node_set_dirty(NodeId::Container(con));
    }

    /// Removes a container from its parent or workspace. Does nothing if it's already detached.
    pub fn container_detach(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        let old_parent = c.pending.parent;
        let old_ws = c.pending.workspace;
        if old_parent.is_none() && old_ws.is_none() {
            return;
        }

        // Mark the old ancestors while the links are still in place.
        self.node_set_dirty(NodeId::Container(con));
        self.release_fullscreen_slots(con);

        if let Some(parent) = old_parent {
            let p = &mut self.containers[parent];
            p.pending.children.remove(con);
            if p.pending.focused_inactive_child == Some(con) {
                p.pending.focused_inactive_child = None;
            }
        } else if let Some(ws) = old_ws {
            let state = &mut self.workspaces[ws].pending;
            state.tiling.remove(con);
            state.floating.retain(|&c| c != con);
            if state.focused_inactive_child == Some(con) {
                state.focused_inactive_child = None;
            }
        }

        self.containers[con].pending.parent = None;
        for c in self.subtree(con) {
            self.containers[c].pending.workspace = None;
        }

        if let Some(parent) = old_parent {
            self.container_update_urgent(parent);
            self.container_update_representation(parent);
        } else if let Some(ws) = old_ws {
            self.workspace_update_representation(ws);
        }
        if let Some(ws) = old_ws {
            self.workspace_detect_urgent(ws);
        }

        self.node_set_dirty(NodeId::Container(con));
    }

    /// Clears every fullscreen slot held by a container of this subtree.
    fn release_fullscreen_slots(&mut self, con: ContainerId) {
        for c in self.subtree(con) {
            let state = &self.containers[c].pending;
            match state.fullscreen_mode {
                FullscreenMode::None => (),
                FullscreenMode::Workspace => {
                    if let Some(ws) = state.workspace.and_then(|ws| self.workspaces.get_mut(ws)) {
                        if ws.pending.fullscreen == Some(c) {
                            ws.pending.fullscreen = None;
                        }
                    }
                }
                FullscreenMode::Global => {
                    if self.fullscreen_global == Some(c) {
                        self.fullscreen_global = None;
                    }
                }
            }
        }
    }

    /// Puts `new` where `old` is, moving the fullscreen state along.
    pub(crate) fn container_replace(&mut self, old: ContainerId, new: ContainerId) {
        let mode = self.containers[old].pending.fullscreen_mode;
        if mode != FullscreenMode::None {
            self.container_fullscreen_disable(old);
        }

        self.container_detach(new);

        if self.containers[old].scratchpad {
            self.containers[old].scratchpad = false;
            self.containers[new].scratchpad = true;
            for slot in self.scratchpad.iter_mut().filter(|c| **c == old) {
                *slot = new;
            }
        }

        let o = &self.containers[old];
        let (parent, ws) = (o.pending.parent, o.pending.workspace);
        match (parent, ws) {
            (Some(parent), _) => {
                let p = &mut self.containers[parent].pending;
                p.children.replace(old, new);
                if p.focused_inactive_child == Some(old) {
                    p.focused_inactive_child = Some(new);
                }
            }
            (None, Some(ws)) => {
                let state = &mut self.workspaces[ws].pending;
                if !state.tiling.replace(old, new) {
                    if let Some(slot) = state.floating.iter_mut().find(|c| **c == old) {
                        *slot = new;
                    }
                }
                if state.focused_inactive_child == Some(old) {
                    state.focused_inactive_child = Some(new);
                }
            }
            (None, None) => return,
        }

        self.node_set_dirty(NodeId::Container(old));
        self.containers[old].pending.parent = None;
        for c in self.subtree(old) {
            self.containers[c].pending.workspace = None;
        }

        self.containers[new].pending.parent = parent;
        self.container_attached(new, ws);

        if mode != FullscreenMode::None {
            self.container_set_fullscreen(new, mode);
        }
    }

    /// Destroys empty interior containers from `con` upwards.
    pub fn container_reap_empty(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        if c.view.is_some() {
            return;
        }

        let ws = c.pending.workspace;
        let mut next = Some(con);
        while let Some(con) = next {
            let c = &self.containers[con];
            if !c.pending.children.is_empty() {
                return;
            }
            next = c.pending.parent;
            self.begin_destroy_container(con);
        }

        if let Some(ws) = ws {
            self.workspace_consider_destroy(ws);
        }
    }

    /// Wraps `child` into a new container with the given layout, taking over its place.
    pub fn container_split(&mut self, child: ContainerId, layout: LayoutMode) -> Option<ContainerId> {
        let c = self.containers.get(child)?;
        if c.pending.workspace.is_none() && !c.scratchpad {
            warn!("tried to split a detached container");
            return None;
        }
        let geometry = c.pending.geometry;
        let view = c.view;

        let seat = self.default_seat;
        let had_focus = self.seat_get_focus(seat) == Some(NodeId::Container(child));

        if self.is_floating(child) {
            if let Some(view) = view {
                self.views[view].view.set_tiled(true);
            }
        }

        let cont = self.create_container(None)?;
        {
            let state = &mut self.containers[cont].pending;
            state.geometry = geometry;
            state.layout = layout;
        }

        self.container_replace(child, cont);
        self.container_add_child(cont, child);

        if had_focus {
            self.seat_set_focus(seat, Some(NodeId::Container(child)));
        }

        Some(cont)
    }

    /// Changes the layout of a container, or of its parent if it's a leaf.
    pub fn container_set_layout(&mut self, con: ContainerId, layout: LayoutMode) {
        let Some(c) = self.containers.get(con) else {
            return;
        };

        if c.view.is_none() {
            self.containers[con].pending.layout = layout;
            self.container_update_representation(con);
            self.node_set_dirty(NodeId::Container(con));
            return;
        }

        match (c.pending.parent, c.pending.workspace) {
            (Some(parent), _) => self.container_set_layout(parent, layout),
            (None, Some(ws)) if !self.is_floating(con) => self.workspace_set_layout(ws, layout),
            _ => (),
        }
    }

    /// Sets the border of a view container. `None` thickness keeps the current one.
    pub fn container_set_border(
        &mut self,
        con: ContainerId,
        style: BorderStyle,
        thickness: Option<f64>,
    ) {
        let Some(c) = self.containers.get_mut(con) else {
            return;
        };
        if c.view.is_none() {
            warn!("borders only apply to view containers");
            return;
        }

        c.pending.border = style;
        if let Some(thickness) = thickness {
            c.pending.border_thickness = thickness.max(0.);
        }

        if self.is_floating(con) {
            self.container_set_geometry_from_content(con);
        }
        self.node_set_dirty(NodeId::Container(con));
    }

    pub fn container_set_alpha(&mut self, con: ContainerId, alpha: f32) {
        if let Some(c) = self.containers.get_mut(con) {
            c.pending.alpha = alpha.clamp(0., 1.);
            self.node_set_dirty(NodeId::Container(con));
        }
    }

    /// Asks every view in the subtree to close.
    pub fn close_container(&mut self, con: ContainerId) {
        if !self.containers.contains_key(con) {
            return;
        }
        for c in self.subtree(con) {
            if let Some(view) = self.containers[c].view {
                self.views[view].view.close();
            }
        }
    }

    /// `con` followed by all of its descendants, depth-first.
    pub(crate) fn subtree(&self, con: ContainerId) -> Vec<ContainerId> {
        let mut rv = Vec::new();
        let mut stack = vec![con];
        while let Some(c) = stack.pop() {
            rv.push(c);
            stack.extend(self.containers[c].pending.children.iter().rev());
        }
        rv
    }

    /// Calls `f` on every descendant of `con`, depth-first.
    pub fn for_each_child(&self, con: ContainerId, mut f: impl FnMut(ContainerId, &Container)) {
        if !self.containers.contains_key(con) {
            return;
        }
        for c in self.subtree(con).into_iter().skip(1) {
            f(c, &self.containers[c]);
        }
    }

    /// First descendant of `con` matching the predicate, depth-first.
    pub fn find_child(
        &self,
        con: ContainerId,
        mut pred: impl FnMut(ContainerId, &Container) -> bool,
    ) -> Option<ContainerId> {
        if !self.containers.contains_key(con) {
            return None;
        }
        self.subtree(con)
            .into_iter()
            .skip(1)
            .find(|&c| pred(c, &self.containers[c]))
    }

    pub fn container_has_ancestor(&self, con: ContainerId, ancestor: ContainerId) -> bool {
        let mut next = self.containers.get(con).and_then(|c| c.pending.parent);
        while let Some(parent) = next {
            if parent == ancestor {
                return true;
            }
            next = self.containers[parent].pending.parent;
        }
        false
    }

    pub fn toplevel_ancestor(&self, con: ContainerId) -> ContainerId {
        let mut con = con;
        while let Some(parent) = self.containers.get(con).and_then(|c| c.pending.parent) {
            con = parent;
        }
        con
    }

    pub fn is_floating(&self, con: ContainerId) -> bool {
        let Some(c) = self.containers.get(con) else {
            return false;
        };
        if c.scratchpad {
            return true;
        }
        c.pending.parent.is_none()
            && c.pending
                .workspace
                .and_then(|ws| self.workspaces.get(ws))
                .is_some_and(|ws| ws.pending.floating.contains(&con))
    }

    pub fn is_floating_or_child(&self, con: ContainerId) -> bool {
        self.is_floating(self.toplevel_ancestor(con))
    }

    pub fn is_sticky(&self, con: ContainerId) -> bool {
        self.containers.get(con).is_some_and(|c| c.is_sticky) && self.is_floating(con)
    }

    pub fn is_sticky_or_child(&self, con: ContainerId) -> bool {
        self.is_sticky(self.toplevel_ancestor(con))
    }

    pub fn is_fullscreen_or_child(&self, con: ContainerId) -> bool {
        let mut next = Some(con);
        while let Some(c) = next.and_then(|c| self.containers.get(c)) {
            if c.pending.fullscreen_mode != FullscreenMode::None {
                return true;
            }
            next = c.pending.parent;
        }
        false
    }

    pub fn is_scratchpad_hidden(&self, con: ContainerId) -> bool {
        self.containers
            .get(con)
            .is_some_and(|c| c.scratchpad && c.pending.workspace.is_none())
    }

    pub fn is_scratchpad_hidden_or_child(&self, con: ContainerId) -> bool {
        self.is_scratchpad_hidden(self.toplevel_ancestor(con))
    }

    /// The list `con` is in: its parent's children or one of its workspace's lists.
    pub fn get_siblings(&self, con: ContainerId) -> &[ContainerId] {
        let Some(c) = self.containers.get(con) else {
            return &[];
        };
        if let Some(parent) = c.pending.parent {
            return &self.containers[parent].pending.children[..];
        }
        let Some(ws) = c.pending.workspace.and_then(|ws| self.workspaces.get(ws)) else {
            return &[];
        };
        if ws.pending.floating.contains(&con) {
            &ws.pending.floating[..]
        } else {
            &ws.pending.tiling[..]
        }
    }

    pub fn sibling_index(&self, con: ContainerId) -> Option<usize> {
        self.get_siblings(con).iter().position(|&c| c == con)
    }

    /// Layout that arranges `con` among its siblings.
    pub fn container_parent_layout(&self, con: ContainerId) -> LayoutMode {
        let Some(c) = self.containers.get(con) else {
            return LayoutMode::None;
        };
        if let Some(parent) = c.pending.parent {
            return self.containers[parent].pending.layout;
        }
        match c.pending.workspace.and_then(|ws| self.workspaces.get(ws)) {
            Some(ws) => ws.layout,
            None => LayoutMode::None,
        }
    }

    /// Pending outer box of a container.
    pub fn get_box(&self, con: ContainerId) -> Rectangle<f64, Logical> {
        self.containers
            .get(con)
            .map(|c| c.pending.geometry)
            .unwrap_or_default()
    }

    /// Whether the view of this container, or any view below it, wants attention.
    pub fn container_is_urgent(&self, con: ContainerId) -> bool {
        self.containers.get(con).is_some_and(|c| c.pending.urgent)
    }

    /// Recomputes the cached urgency of `con` and of its ancestors, stopping at the first one
    /// that didn't change.
    pub(crate) fn container_update_urgent(&mut self, con: ContainerId) {
        let mut next = Some(con);
        while let Some(con) = next {
            let Some(c) = self.containers.get(con) else {
                return;
            };
            let urgent = match c.view {
                Some(view) => self.views.get(view).is_some_and(|v| v.urgent_at.is_some()),
                None => c.pending.children.iter().any(|&child| {
                    self.containers
                        .get(child)
                        .is_some_and(|child| child.pending.urgent)
                }),
            };
            if c.pending.urgent == urgent {
                return;
            }

            self.containers[con].pending.urgent = urgent;
            self.mark_dirty(NodeId::Container(con));
            next = self.containers[con].pending.parent;
        }
    }

    /// Writes the bracketed summary of `children` into `buffer`, returning its length.
    ///
    /// With no buffer only the length is computed, so callers can size the buffer first.
    pub fn build_representation(
        &self,
        layout: LayoutMode,
        children: &[ContainerId],
        mut buffer: Option<&mut String>,
    ) -> usize {
        let mut push = |s: &str| {
            if let Some(buffer) = buffer.as_deref_mut() {
                buffer.push_str(s);
            }
            s.len()
        };

        let mut len = push(representation_glyph(layout));
        len += push("[");

        for (idx, &child) in children.iter().enumerate() {
            if idx != 0 {
                len += push(" ");
            }

            let c = &self.containers[child];
            let identifier = match c.view.and_then(|v| self.views.get(v)) {
                Some(view) => view.view.class().or_else(|| view.view.app_id()),
                None => c.formatted_title.clone(),
            };

            len += push(identifier.as_deref().unwrap_or("(null)"));
        }

        len += push("]");
        len
    }

    /// Rebuilds the representation of `con` and of everything above it.
    pub fn container_update_representation(&mut self, con: ContainerId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };

        if c.view.is_none() {
            let layout = c.pending.layout;
            let children = c.pending.children.to_vec();

            let len = self.build_representation(layout, &children, None);
            let mut buffer = String::with_capacity(len);
            self.build_representation(layout, &children, Some(&mut buffer));

            let c = &mut self.containers[con];
            if c.formatted_title.as_deref() != Some(&buffer) {
                c.formatted_title = Some(buffer);
                self.mark_dirty(NodeId::Container(con));
            }
        }

        let c = &self.containers[con];
        if let Some(parent) = c.pending.parent {
            self.container_update_representation(parent);
        } else if let Some(ws) = c.pending.workspace {
            self.workspace_update_representation(ws);
        }
    }
}
