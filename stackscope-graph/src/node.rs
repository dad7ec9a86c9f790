//! Node types for the resource graph.

use serde::{Deserialize, Serialize};
use stackscope_core::Resource;

/// A point in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Side of a node where edges attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

/// A resource as a drawable node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// The resource id.
    pub id: String,
    /// Display name.
    pub label: String,
    /// Resource type tag.
    pub kind: String,
    /// True when some resource names this one as its parent.
    pub has_children: bool,
    /// Whether the node's children are shown.
    pub expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Top-left corner, assigned by layout.
    pub position: Point,
    /// Where outgoing edges leave.
    pub source_position: HandlePosition,
    /// Where incoming edges arrive.
    pub target_position: HandlePosition,
}

impl GraphNode {
    /// Creates an unpositioned node for a resource.
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            id: resource.id.clone(),
            label: resource.display_name().to_string(),
            kind: resource.kind.clone(),
            has_children: false,
            expanded: false,
            parent: resource.parent_id().map(str::to_string),
            position: Point::default(),
            source_position: HandlePosition::Right,
            target_position: HandlePosition::Left,
        }
    }
}
