//! Types for inspecting the trellis container tree.
//!
//! The compositor core builds a [`Node`] tree out of its outputs, workspaces and containers. The
//! types here are plain data: they serialize with serde and carry no references back into the
//! compositor, so they can be handed to whatever IPC transport the embedding compositor uses.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Layout mode of a container or workspace.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Children are stacked: every child gets a title strip at the top and the focused child
    /// gets the rest of the area.
    None,
    /// Children are placed left to right.
    #[default]
    Horizontal,
    /// The first child takes one third of the width, the rest are stacked in the remaining two
    /// thirds.
    OneTwo,
    /// The first child takes two thirds of the width, the rest are stacked in the remaining
    /// third.
    TwoOne,
    /// Children are placed on a grid.
    Grid,
}

/// Border style of a container.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    /// No border and no title bar.
    None,
    /// Border on all sides, no title bar.
    Pixel,
    /// Title bar and border.
    #[default]
    Normal,
    /// The client draws its own decorations.
    Csd,
}

/// Fullscreen state of a container.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FullscreenMode {
    #[default]
    None,
    /// Fullscreen on the container's workspace.
    Workspace,
    /// Fullscreen across all outputs.
    Global,
}

/// Kind of a tree node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Output,
    Workspace,
    Container,
    FloatingContainer,
}

/// Rectangle in logical coordinates.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One node of the tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique id of this node.
    pub id: u64,
    /// Node name: output name, workspace name, or container title.
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Outer rectangle, in global coordinates.
    pub rect: Rect,
    /// Content rectangle relative to [`Node::rect`]. Zero for non-container nodes.
    pub window_rect: Rect,
    pub layout: LayoutMode,
    pub border: BorderStyle,
    pub current_border_width: f64,
    pub fullscreen_mode: FullscreenMode,
    /// Whether this node has keyboard focus.
    pub focused: bool,
    /// Whether this node or any descendant view is urgent.
    pub urgent: bool,
    pub sticky: bool,
    /// Bracketed summary of the children, e.g. `V[firefox foot]`.
    pub representation: Option<String>,
    /// App id of the view, for view containers.
    pub app_id: Option<String>,
    /// Shell of the view, for view containers.
    pub shell: Option<String>,
    /// Tiling children.
    pub nodes: Vec<Node>,
    /// Floating children (workspaces only).
    pub floating_nodes: Vec<Node>,
}

impl FromStr for LayoutMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "horizontal" => Ok(Self::Horizontal),
            "one-two" => Ok(Self::OneTwo),
            "two-one" => Ok(Self::TwoOne),
            "grid" => Ok(Self::Grid),
            _ => Err(r#"invalid layout, can be "none", "horizontal", "one-two", "two-one" or "grid""#),
        }
    }
}

impl FromStr for BorderStyle {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "pixel" => Ok(Self::Pixel),
            "normal" => Ok(Self::Normal),
            "csd" => Ok(Self::Csd),
            _ => Err(r#"invalid border style, can be "none", "pixel", "normal" or "csd""#),
        }
    }
}

impl Node {
    /// Iterates over this node and all of its descendants, depth-first.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.floating_nodes.iter().rev());
            stack.extend(node.nodes.iter().rev());
            Some(node)
        })
    }

    /// Finds the focused node, if any.
    pub fn find_focused(&self) -> Option<&Node> {
        self.iter().find(|node| node.focused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u64, focused: bool) -> Node {
        Node {
            id,
            name: Some(format!("leaf {id}")),
            node_type: NodeType::Container,
            rect: Rect::default(),
            window_rect: Rect::default(),
            layout: LayoutMode::None,
            border: BorderStyle::Normal,
            current_border_width: 2.,
            fullscreen_mode: FullscreenMode::None,
            focused,
            urgent: false,
            sticky: false,
            representation: None,
            app_id: None,
            shell: None,
            nodes: Vec::new(),
            floating_nodes: Vec::new(),
        }
    }

    #[test]
    fn iter_visits_tiling_before_floating() {
        let mut ws = leaf(1, false);
        ws.node_type = NodeType::Workspace;
        ws.nodes.push(leaf(2, false));
        ws.floating_nodes.push(leaf(3, true));
        ws.nodes[0].nodes.push(leaf(4, false));

        let ids: Vec<_> = ws.iter().map(|node| node.id).collect();
        assert_eq!(ids, [1, 2, 4, 3]);
        assert_eq!(ws.find_focused().map(|node| node.id), Some(3));
    }

    #[test]
    fn serializes_type_field() {
        let json = serde_json::to_value(leaf(7, false)).unwrap();
        assert_eq!(json["type"], "container");
        assert_eq!(json["fullscreen_mode"], "none");
        assert_eq!(json["border"], "normal");
    }

    #[test]
    fn parses_layout_names() {
        assert_eq!("one-two".parse(), Ok(LayoutMode::OneTwo));
        assert_eq!("grid".parse(), Ok(LayoutMode::Grid));
        assert!("tabbed".parse::<LayoutMode>().is_err());
        assert_eq!("csd".parse(), Ok(BorderStyle::Csd));
    }
}
