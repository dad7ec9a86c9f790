//! Stackscope Graph - Resource relationship graphs
//!
//! This crate turns a flat list of deployed resources into a positioned
//! graph. It infers data-flow dependencies between resources, assembles
//! the visible node and edge set for a view mode, and lays it out in ranks.
//!
//! # Architecture
//!
//! The pipeline runs from scratch on every change:
//! - Inference: shared input/output values become dependency edges
//! - Assembly: containment or data-flow edges, filtered by expansion state
//! - Layout: ranks, ordering and coordinates for every node
//!
//! [`GraphSession`] ties the three together and caches inference.
//!
//! # Example
//!
//! ```no_run
//! use stackscope_core::Resource;
//! use stackscope_graph::{GraphMode, GraphSession, RenderOutcome};
//!
//! let resources = vec![
//!     Resource::new("proj::bucket", "aws:s3/bucket:Bucket")
//!         .with_output("arn", "arn:aws:s3:::logs"),
//!     Resource::new("proj::reader", "aws:lambda/function:Function")
//!         .with_input("source", "arn:aws:s3:::logs"),
//! ];
//!
//! let mut session = GraphSession::new(resources);
//! session.set_mode(GraphMode::Dependency);
//!
//! if let RenderOutcome::Ready(result) = session.render() {
//!     for node in &result.nodes {
//!         println!("{} at ({}, {})", node.label, node.position.x, node.position.y);
//!     }
//! }
//! ```

mod builder;
mod edge;
mod expansion;
mod graph;
mod inference;
mod layout;
mod node;
mod session;

pub use builder::{assemble, GraphBuilder, GraphMode};
pub use edge::{DependencyEdge, EdgeKind, GraphEdge, Heuristic, Relationship};
pub use expansion::ExpansionState;
pub use graph::{GraphStats, NodeId, ResourceGraph};
pub use inference::infer_dependencies;
pub use layout::{layout, LayoutConfig, LayoutError, LayoutResult, RankDirection};
pub use node::{GraphNode, HandlePosition, Point};
pub use session::{GraphSession, RenderOutcome};
