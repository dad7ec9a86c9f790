//! Edge types for the resource graph.
//!
//! Two relationships are drawn: structural containment (parent contains
//! child) and inferred data flow (provider feeds consumer).

use serde::{Deserialize, Serialize};
use stackscope_core::display_name;

use crate::node::Point;

/// The type of relationship an edge draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Parent resource contains child resource.
    Contains,

    /// Provider produced a value the consumer reads.
    DataFlow,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Contains => "contains",
            Self::DataFlow => "data_flow",
        };
        write!(f, "{}", s)
    }
}

/// Which heuristic recognized a shared value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Value starts with `arn:`.
    Arn,
    /// Value ends with `-` and seven alphanumerics.
    OpaqueId,
    /// Value is an http(s) URL.
    Url,
}

impl std::fmt::Display for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Arn => "arn",
            Self::OpaqueId => "opaque_id",
            Self::Url => "url",
        };
        write!(f, "{}", s)
    }
}

/// One input/output key pair that shares a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Input key on the consumer.
    pub input: String,
    /// Output key on the provider.
    pub output: String,
    /// The shared value.
    pub value: String,
    pub heuristic: Heuristic,
}

/// An inferred dependency between two resources.
///
/// `from` holds the input, `to` holds the output it matched. For display
/// the direction is reversed; see [`GraphEdge::data_flow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The consumer (input holder).
    pub from: String,
    /// The provider (output holder).
    pub to: String,
    /// Every key pair that matched, in discovery order.
    pub matches: Vec<Relationship>,
}

/// An edge ready for the visualization surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,

    /// Matched key pairs, for data-flow edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,

    /// Bend points through intermediate ranks, filled in by layout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
}

impl GraphEdge {
    /// A containment edge from parent to child.
    pub fn contains(parent: &str, child: &str) -> Self {
        Self {
            id: format!("{}-{}", parent, child),
            source: parent.to_string(),
            target: child.to_string(),
            kind: EdgeKind::Contains,
            relationships: Vec::new(),
            points: Vec::new(),
        }
    }

    /// A data-flow edge for an inferred dependency.
    ///
    /// The edge runs provider → consumer: the arrow follows the value from
    /// the resource that produced it to the one that reads it.
    pub fn data_flow(dependency: &DependencyEdge) -> Self {
        Self {
            id: format!("{}-{}", dependency.from, dependency.to),
            source: dependency.to.clone(),
            target: dependency.from.clone(),
            kind: EdgeKind::DataFlow,
            relationships: dependency.matches.clone(),
            points: Vec::new(),
        }
    }

    /// Short label: the number of matched key pairs, empty for containment.
    pub fn label(&self) -> String {
        if self.relationships.is_empty() {
            String::new()
        } else {
            self.relationships.len().to_string()
        }
    }

    /// One line per relationship, naming the consumer's input and the
    /// provider's output.
    pub fn tooltip_lines(&self) -> Vec<String> {
        let consumer = display_name(&self.target);
        let provider = display_name(&self.source);
        self.relationships
            .iter()
            .map(|rel| {
                format!(
                    "{}.{} depends on {}.{} ({})",
                    consumer, rel.input, provider, rel.output, rel.value
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dependency() -> DependencyEdge {
        DependencyEdge {
            from: "proj::fn".to_string(),
            to: "proj::bucket".to_string(),
            matches: vec![Relationship {
                input: "bucket".to_string(),
                output: "arn".to_string(),
                value: "arn:aws:s3:::my-bucket".to_string(),
                heuristic: Heuristic::Arn,
            }],
        }
    }

    #[test]
    fn test_data_flow_reverses_direction() {
        let edge = GraphEdge::data_flow(&dependency());
        assert_eq!(edge.source, "proj::bucket");
        assert_eq!(edge.target, "proj::fn");
        assert_eq!(edge.id, "proj::fn-proj::bucket");
        assert_eq!(edge.kind, EdgeKind::DataFlow);
    }

    #[test]
    fn test_tooltip_names_consumer_input() {
        let edge = GraphEdge::data_flow(&dependency());
        assert_eq!(
            edge.tooltip_lines(),
            vec!["fn.bucket depends on bucket.arn (arn:aws:s3:::my-bucket)".to_string()]
        );
        assert_eq!(edge.label(), "1");
    }

    #[test]
    fn test_contains_edge() {
        let edge = GraphEdge::contains("a", "a/b");
        assert_eq!(edge.id, "a-a/b");
        assert_eq!(edge.label(), "");
        assert!(edge.tooltip_lines().is_empty());
    }
}
