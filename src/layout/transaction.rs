//! Committing pending state.
//!
//! How to use it:
//! 1. Mutate the tree through [`Root`]; every touched node gets marked dirty.
//! 2. Arrange the tree with [`Root::arrange_root()`].
//! 3. Snapshot the dirty nodes with [`Transaction::new()`]. Every snapshotted container and
//!    workspace holds a reference until the transaction is applied, so it can't be freed
//!    underneath it.
//! 4. Apply it with [`Transaction::apply()`], which makes the snapshot current, frees nodes whose
//!    destruction was waiting on it, and updates the scene.
//!
//! [`Root::commit_dirty()`] does all of this at once.

use super::container::ContainerState;
use super::view::View;
use super::workspace::WorkspaceState;
use super::{ContainerId, NodeId, Root, WorkspaceId};

#[derive(Debug)]
enum Instruction {
    Container(ContainerId, Box<ContainerState>),
    Workspace(WorkspaceId, Box<WorkspaceState>),
}

/// Snapshot of the pending state of every dirty node.
#[derive(Debug)]
#[must_use = "a transaction holds references until it is applied"]
pub struct Transaction {
    instructions: Vec<Instruction>,
    fullscreen_global: Option<ContainerId>,
}

impl Transaction {
    pub fn new<W: View>(root: &mut Root<W>) -> Self {
        let _span = tracy_client::span!("Transaction::new");

        let mut instructions = Vec::new();
        for node in std::mem::take(&mut root.dirty) {
            match node {
                NodeId::Root => root.root_dirty = false,
                NodeId::Output(id) => {
                    if let Some(output) = root.outputs.get_mut(id) {
                        output.dirty = false;
                    }
                }
                NodeId::Workspace(id) => {
                    if let Some(ws) = root.workspaces.get_mut(id) {
                        ws.dirty = false;
                        ws.ntxnrefs += 1;
                        instructions.push(Instruction::Workspace(id, Box::new(ws.pending.clone())));
                    }
                }
                NodeId::Container(id) => {
                    if let Some(con) = root.containers.get_mut(id) {
                        con.dirty = false;
                        con.ntxnrefs += 1;
                        instructions.push(Instruction::Container(id, Box::new(con.pending.clone())));
                    }
                }
            }
        }

        trace!("new transaction with {} instructions", instructions.len());

        Self {
            instructions,
            fullscreen_global: root.fullscreen_global,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn apply<W: View>(self, root: &mut Root<W>) {
        let _span = tracy_client::span!("Transaction::apply");

        let mut freed = Vec::new();
        for instruction in self.instructions {
            match instruction {
                Instruction::Container(id, state) => {
                    let Some(con) = root.containers.get_mut(id) else {
                        error!("container {id:?} was freed during a transaction");
                        continue;
                    };
                    con.current = *state;
                    con.ntxnrefs -= 1;
                    if con.destroying && con.ntxnrefs == 0 {
                        freed.push(NodeId::Container(id));
                    }
                }
                Instruction::Workspace(id, state) => {
                    let Some(ws) = root.workspaces.get_mut(id) else {
                        error!("workspace {id:?} was freed during a transaction");
                        continue;
                    };
                    ws.current = *state;
                    ws.ntxnrefs -= 1;
                    if ws.destroying && ws.ntxnrefs == 0 {
                        freed.push(NodeId::Workspace(id));
                    }
                }
            }
        }

        root.current_fullscreen_global = self.fullscreen_global;

        // Live containers may still sit in the layers of a dying workspace until the scene is
        // updated.
        root.update_scene();

        for node in freed {
            match node {
                NodeId::Container(id) => root.destroy_container(id),
                NodeId::Workspace(id) => root.destroy_workspace(id),
                _ => (),
            }
        }
    }
}
