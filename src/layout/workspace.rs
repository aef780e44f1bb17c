//! Workspaces: a tiling list and a floating list of top-level containers on one output.

use smithay::utils::{Logical, Rectangle};
use trellis_ipc::{FullscreenMode, LayoutMode};

use super::container::ChildList;
use super::scene::WorkspaceLayers;
use super::view::View;
use super::{ContainerId, NodeId, OutputId, Root, WorkspaceId};
use crate::utils::{center, contains_point};

/// Double-buffered part of a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceState {
    /// Usable area of the output, in global coordinates.
    pub geometry: Rectangle<f64, Logical>,
    pub fullscreen: Option<ContainerId>,
    pub tiling: ChildList,
    /// Floating containers, bottom to top.
    pub floating: Vec<ContainerId>,
    pub output: Option<OutputId>,
    pub focused: bool,
    pub focused_inactive_child: Option<ContainerId>,
}

#[derive(Debug)]
pub struct Workspace {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) pending: WorkspaceState,
    pub(crate) current: WorkspaceState,
    /// Layout of the tiling list.
    pub(crate) layout: LayoutMode,
    pub(crate) representation: Option<String>,
    pub(crate) urgent: bool,
    pub(crate) gaps_inner: f64,
    pub(crate) gaps_outer: f64,
    pub(crate) ntxnrefs: usize,
    pub(crate) destroying: bool,
    pub(crate) dirty: bool,
    pub(crate) scene: WorkspaceLayers,
}

impl Workspace {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pending(&self) -> &WorkspaceState {
        &self.pending
    }

    pub fn current(&self) -> &WorkspaceState {
        &self.current
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn representation(&self) -> Option<&str> {
        self.representation.as_deref()
    }

    pub fn is_urgent(&self) -> bool {
        self.urgent
    }

    pub fn is_empty(&self) -> bool {
        self.pending.tiling.is_empty() && self.pending.floating.is_empty()
    }

    pub fn scene(&self) -> &WorkspaceLayers {
        &self.scene
    }
}

impl<W: View> Root<W> {
    /// Creates a workspace at the end of an output, or among the fallback workspaces.
    ///
    /// The workspace becomes active if its output has no active workspace yet.
    pub fn create_workspace(&mut self, output: Option<OutputId>, name: &str) -> Option<WorkspaceId> {
        if self.find_workspace(name).is_some() {
            warn!("workspace {name} already exists");
            return None;
        }
        if output.is_some_and(|output| !self.outputs.contains_key(output)) {
            warn!("tried to create workspace {name} on a missing output");
            return None;
        }

        let scene = match WorkspaceLayers::new(&mut *self.scene, self.layers.staging) {
            Ok(scene) => scene,
            Err(err) => {
                warn!("error creating workspace: {err:?}");
                return None;
            }
        };

        let geometry = output
            .map(|output| self.output_usable_box(output))
            .unwrap_or_default();
        let state = WorkspaceState {
            geometry,
            fullscreen: None,
            tiling: ChildList::default(),
            floating: Vec::new(),
            output,
            focused: false,
            focused_inactive_child: None,
        };

        let options = &self.options;
        let ws = self.workspaces.insert(Workspace {
            id: self.ids.next(),
            name: name.to_owned(),
            pending: state.clone(),
            current: state,
            layout: options.default_layout,
            representation: None,
            urgent: false,
            gaps_inner: options.gaps.inner.0,
            gaps_outer: options.gaps.outer.0,
            ntxnrefs: 0,
            destroying: false,
            dirty: false,
            scene,
        });

        match output {
            Some(output) => {
                let output = &mut self.outputs[output];
                output.workspaces.push(ws);
                if output.active_workspace.is_none() {
                    output.active_workspace = Some(ws);
                }
            }
            None => self.fallback_workspaces.push(ws),
        }

        self.workspace_update_representation(ws);
        debug!("created workspace {name}");
        self.node_set_dirty(NodeId::Workspace(ws));
        Some(ws)
    }

    /// Smallest positive number not used as a workspace name.
    pub fn workspace_next_name(&self) -> String {
        (1..)
            .map(|n: u32| n.to_string())
            .find(|name| self.find_workspace(name).is_none())
            .unwrap_or_default()
    }

    /// Takes a workspace out of its output and schedules it for freeing.
    pub fn workspace_begin_destroy(&mut self, ws: WorkspaceId) {
        let Some(w) = self.workspaces.get(ws) else {
            return;
        };
        if w.destroying {
            return;
        }
        if !w.is_empty() {
            error!("tried to destroy workspace {} which still has containers", w.name);
            return;
        }

        self.seats_handle_node_destroy(NodeId::Workspace(ws));
        self.node_set_dirty(NodeId::Workspace(ws));
        self.workspace_detach(ws);
        self.workspaces[ws].destroying = true;
        debug!("destroying workspace {}", self.workspaces[ws].name);
    }

    /// Frees a workspace marked as destroying once no transaction references it.
    pub fn destroy_workspace(&mut self, ws: WorkspaceId) {
        let Some(w) = self.workspaces.get(ws) else {
            return;
        };
        if !w.destroying {
            error!("tried to free workspace {} which wasn't marked as destroying", w.name);
            return;
        }
        if w.ntxnrefs != 0 {
            error!(
                "tried to free workspace {} which is still referenced by {} transactions",
                w.name, w.ntxnrefs
            );
            return;
        }

        if let Some(w) = self.workspaces.remove(ws) {
            w.scene.destroy(&mut *self.scene);
        }
        self.dirty.retain(|node| *node != NodeId::Workspace(ws));
    }

    /// Removes a workspace from its output or from the fallback list.
    pub(crate) fn workspace_detach(&mut self, ws: WorkspaceId) {
        match self.workspaces[ws].pending.output {
            Some(output_id) => {
                self.node_set_dirty(NodeId::Output(output_id));
                let output = &mut self.outputs[output_id];
                output.workspaces.retain(|w| *w != ws);
                if output.active_workspace == Some(ws) {
                    output.active_workspace = output.workspaces.first().copied();
                }
            }
            None => self.fallback_workspaces.retain(|w| *w != ws),
        }
        self.workspaces[ws].pending.output = None;
    }

    /// Destroys a workspace if nothing needs it: it's empty, not shown and not focused.
    pub fn workspace_consider_destroy(&mut self, ws: WorkspaceId) -> bool {
        let Some(w) = self.workspaces.get(ws) else {
            return false;
        };
        if w.destroying || !w.is_empty() {
            return false;
        }
        if self.workspace_is_visible(ws) {
            return false;
        }

        let focused = self
            .seats
            .keys()
            .any(|seat| self.seat_get_focus_inactive(seat, NodeId::Root) == Some(NodeId::Workspace(ws)));
        if focused {
            return false;
        }

        self.workspace_begin_destroy(ws);
        true
    }

    pub fn workspace_is_visible(&self, ws: WorkspaceId) -> bool {
        let Some(w) = self.workspaces.get(ws) else {
            return false;
        };
        w.pending
            .output
            .is_some_and(|output| self.outputs[output].active_workspace == Some(ws))
    }

    /// Appends a container to the tiling list.
    pub fn workspace_add_tiling(&mut self, ws: WorkspaceId, con: ContainerId) {
        let len = self.workspaces.get(ws).map_or(0, |w| w.pending.tiling.len());
        self.workspace_insert_tiling(ws, con, len);
    }

    pub fn workspace_insert_tiling(&mut self, ws: WorkspaceId, con: ContainerId, idx: usize) {
        if !self.can_attach(con, NodeId::Workspace(ws)) {
            return;
        }
        self.container_detach(con);

        self.workspaces[ws].pending.tiling.insert(idx, con);
        self.containers[con].pending.parent = None;
        self.container_attached(con, Some(ws));
    }

    /// Puts a container on top of the floating list.
    pub fn workspace_add_floating(&mut self, ws: WorkspaceId, con: ContainerId) {
        if !self.can_attach(con, NodeId::Workspace(ws)) {
            return;
        }
        self.container_detach(con);

        self.workspaces[ws].pending.floating.push(con);
        self.containers[con].pending.parent = None;
        self.container_attached(con, Some(ws));
    }

    pub fn workspace_update_representation(&mut self, ws: WorkspaceId) {
        let Some(w) = self.workspaces.get(ws) else {
            return;
        };
        let layout = w.layout;
        let tiling = w.pending.tiling.to_vec();

        let len = self.build_representation(layout, &tiling, None);
        let mut buffer = String::with_capacity(len);
        self.build_representation(layout, &tiling, Some(&mut buffer));

        let w = &mut self.workspaces[ws];
        if w.representation.as_deref() != Some(&buffer) {
            w.representation = Some(buffer);
            self.mark_dirty(NodeId::Workspace(ws));
        }
    }

    /// Recomputes whether any view on the workspace wants attention.
    pub fn workspace_detect_urgent(&mut self, ws: WorkspaceId) {
        let Some(w) = self.workspaces.get(ws) else {
            return;
        };
        let urgent = w
            .pending
            .tiling
            .iter()
            .chain(&w.pending.floating)
            .any(|&con| self.container_is_urgent(con));

        if w.urgent != urgent {
            self.workspaces[ws].urgent = urgent;
            self.node_set_dirty(NodeId::Workspace(ws));
        }
    }

    pub fn workspace_set_layout(&mut self, ws: WorkspaceId, layout: LayoutMode) {
        let Some(w) = self.workspaces.get_mut(ws) else {
            return;
        };
        w.layout = layout;
        self.workspace_update_representation(ws);
        self.node_set_dirty(NodeId::Workspace(ws));
    }

    /// Moves a container to another workspace.
    ///
    /// Floating containers keep their position relative to the workspace. Tiling containers go
    /// next to the most recently focused tiling container there.
    pub fn move_container_to_workspace(&mut self, con: ContainerId, ws: WorkspaceId) {
        let Some(c) = self.containers.get(con) else {
            return;
        };
        let Some(old_ws) = c.pending.workspace else {
            warn!("tried to move detached container {con:?}");
            return;
        };
        if old_ws == ws || !self.workspaces.contains_key(ws) {
            return;
        }
        let old_parent = c.pending.parent;
        let fullscreen = c.pending.fullscreen_mode != FullscreenMode::None;

        if self.is_floating(con) {
            let old_output = self.workspaces[old_ws].pending.output;
            let old_box = self.workspaces[old_ws].pending.geometry;

            self.workspace_add_floating(ws, con);

            let new = &self.workspaces[ws];
            if old_output != new.pending.output && !fullscreen {
                let new_box = new.pending.geometry;
                self.floating_fix_coordinates(con, old_box, new_box);
            }
        } else {
            let seat = self.default_seat;
            match self.seat_get_focus_inactive_tiling(seat, ws) {
                Some(reference) if self.containers[reference].view.is_some() => {
                    self.container_add_sibling(reference, con, true);
                }
                Some(reference) => self.container_add_child(reference, con),
                None => self.workspace_add_tiling(ws, con),
            }
        }

        if self.containers[con].pending.workspace != Some(ws) {
            return;
        }

        match old_parent {
            Some(parent) => self.container_reap_empty(parent),
            None => {
                self.workspace_consider_destroy(old_ws);
            }
        }

        debug!("moved container {con:?} to workspace {}", self.workspaces[ws].name);
    }

    /// Moves a workspace to another output, remapping its floating containers.
    ///
    /// The workspace becomes active on the new output. An output left without workspaces gets a
    /// fresh one.
    pub fn move_workspace_to_output(&mut self, ws: WorkspaceId, output: OutputId) {
        let Some(w) = self.workspaces.get(ws) else {
            return;
        };
        if w.destroying || !self.outputs.contains_key(output) || w.pending.output == Some(output) {
            return;
        }
        let old_output = w.pending.output;
        let old_box = w.pending.geometry;

        self.workspace_detach(ws);

        let new_output_last_ws = self.outputs[output].active_workspace;
        let new_box = self.output_usable_box(output);
        {
            let w = &mut self.workspaces[ws];
            w.pending.output = Some(output);
            w.pending.geometry = new_box;
        }
        let o = &mut self.outputs[output];
        o.workspaces.push(ws);
        o.active_workspace = Some(ws);

        let floating = self.workspaces[ws].pending.floating.clone();
        for con in floating {
            if self.containers[con].pending.fullscreen_mode == FullscreenMode::None {
                self.floating_fix_coordinates(con, old_box, new_box);
            }
        }

        if let Some(old_output) = old_output {
            if self.outputs[old_output].workspaces.is_empty() {
                let name = self.workspace_next_name();
                self.create_workspace(Some(old_output), &name);
            }
            self.node_set_dirty(NodeId::Output(old_output));
        }

        if let Some(last) = new_output_last_ws {
            self.workspace_consider_destroy(last);
        }

        self.node_set_dirty(NodeId::Workspace(ws));
        self.node_set_dirty(NodeId::Output(output));
    }

    /// Shows a workspace on its output, bringing sticky floating containers along.
    pub fn output_set_active_workspace(&mut self, output: OutputId, ws: WorkspaceId) {
        let Some(o) = self.outputs.get(output) else {
            return;
        };
        if !o.workspaces.contains(&ws) {
            warn!("workspace {ws:?} is not on output {}", o.name);
            return;
        }
        let old = o.active_workspace;
        if old == Some(ws) {
            return;
        }

        self.outputs[output].active_workspace = Some(ws);

        if let Some(old) = old {
            let sticky: Vec<_> = self.workspaces[old]
                .pending
                .floating
                .iter()
                .copied()
                .filter(|con| self.is_sticky(*con))
                .collect();
            for con in sticky {
                self.workspace_add_floating(ws, con);
            }

            self.node_set_dirty(NodeId::Workspace(old));
            self.workspace_consider_destroy(old);
        }

        self.node_set_dirty(NodeId::Workspace(ws));
    }

    /// Brings floating containers whose center ended up off the workspace back to its center.
    pub(crate) fn workspace_fix_floating_positions(&mut self, ws: WorkspaceId) {
        let area = self.workspaces[ws].pending.geometry;
        let floating = self.workspaces[ws].pending.floating.clone();
        for con in floating {
            let c = &self.containers[con];
            if c.pending.fullscreen_mode != FullscreenMode::None {
                continue;
            }
            if !contains_point(area, center(c.pending.geometry)) {
                self.container_floating_move_to_center(con);
            }
        }
    }
}
