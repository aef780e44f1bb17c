//! Decoration colors. Everything here reads committed state only.

use trellis_config::ColorSet;
use trellis_ipc::LayoutMode;

use super::view::View;
use super::{ContainerId, Root};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl<W: View> Root<W> {
    /// Palette for the decorations of a container.
    ///
    /// Urgency wins, then focus of the container or an ancestor, then focus somewhere below it,
    /// then being the focus-inactive child of its parent.
    ///
    /// Runs in O(depth): it only walks parent links, so the scene can call it for every
    /// container.
    pub fn get_colors(&self, con: ContainerId) -> ColorSet {
        let colors = &self.options.colors;
        let Some(c) = self.containers.get(con) else {
            return colors.unfocused;
        };

        let set = if c.current.urgent {
            colors.urgent
        } else if self.is_focused_or_ancestor_focused(con) {
            colors.focused
        } else if self.has_focused_descendant(con) {
            colors.focused_tab_title
        } else if self.is_focused_inactive(con) {
            colors.focused_inactive
        } else {
            colors.unfocused
        };

        let alpha = c.current.alpha;
        if alpha == 1. {
            return set;
        }
        ColorSet {
            border: set.border * alpha,
            background: set.background * alpha,
            text: set.text * alpha,
            indicator: set.indicator * alpha,
            child_border: set.child_border * alpha,
        }
    }

    fn is_focused_or_ancestor_focused(&self, con: ContainerId) -> bool {
        let mut next = Some(con);
        let mut ws = None;
        while let Some(c) = next.and_then(|c| self.containers.get(c)) {
            if c.current.focused {
                return true;
            }
            ws = c.current.workspace;
            next = c.current.parent;
        }
        ws.and_then(|ws| self.workspaces.get(ws))
            .is_some_and(|ws| ws.current.focused)
    }

    /// Walks up from what each seat focuses, looking for `con` strictly above it.
    fn has_focused_descendant(&self, con: ContainerId) -> bool {
        self.seats.keys().any(|seat| {
            let Some(focus) = self.seat_get_focused_container(seat) else {
                return false;
            };
            let Some(f) = self.containers.get(focus) else {
                return false;
            };
            if focus == con || !f.current.focused {
                return false;
            }

            let mut next = f.current.parent;
            while let Some(c) = next {
                if c == con {
                    return true;
                }
                next = self.containers.get(c).and_then(|c| c.current.parent);
            }
            false
        })
    }

    fn is_focused_inactive(&self, con: ContainerId) -> bool {
        let c = &self.containers[con];
        match (c.current.parent, c.current.workspace) {
            (Some(parent), _) => self
                .containers
                .get(parent)
                .is_some_and(|p| p.current.focused_inactive_child == Some(con)),
            (None, Some(ws)) => self
                .workspaces
                .get(ws)
                .is_some_and(|ws| ws.current.focused_inactive_child == Some(con)),
            (None, None) => false,
        }
    }

    /// Border edge drawn in the indicator color, showing where the next window would go.
    ///
    /// Only lone tiling children get one.
    pub fn indicator_edge(&self, con: ContainerId) -> Option<Edge> {
        let c = self.containers.get(con)?;
        c.view?;

        let (layout, siblings) = match (c.current.parent, c.current.workspace) {
            (Some(parent), _) => {
                let p = self.containers.get(parent)?;
                (p.current.layout, p.current.children.len())
            }
            (None, Some(ws)) => {
                let ws = self.workspaces.get(ws)?;
                if !ws.current.tiling.contains(&con) {
                    return None;
                }
                (ws.layout, ws.current.tiling.len())
            }
            (None, None) => return None,
        };

        if siblings != 1 {
            return None;
        }

        match layout {
            LayoutMode::Horizontal => Some(Edge::Right),
            LayoutMode::OneTwo | LayoutMode::TwoOne | LayoutMode::Grid => Some(Edge::Bottom),
            LayoutMode::None => None,
        }
    }
}
