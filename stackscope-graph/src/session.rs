//! Interactive graph session.
//!
//! Holds the loaded resources plus the view state (mode and expansion)
//! and recomputes the visible graph from scratch on every change.
//! Dependency inference is the only cached step: its result depends on
//! the resource list alone, so toggling a node or switching modes reuses it.

use crate::builder::{GraphBuilder, GraphMode};
use crate::edge::DependencyEdge;
use crate::expansion::ExpansionState;
use crate::graph::ResourceGraph;
use crate::inference::infer_dependencies;
use crate::layout::{LayoutConfig, LayoutResult};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use stackscope_core::Resource;
use tracing::{debug, warn};

/// What the visualization surface should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    /// No resources loaded.
    Empty,
    /// A positioned graph.
    Ready(LayoutResult),
    /// Layout failed; show this message instead of a graph.
    Fallback { message: String },
}

pub struct GraphSession {
    resources: Vec<Resource>,
    mode: GraphMode,
    expansion: ExpansionState,
    dependencies: OnceCell<Vec<DependencyEdge>>,
    /// Overrides the per-mode layout defaults.
    layout_config: Option<LayoutConfig>,
}

impl GraphSession {
    /// Starts in structural mode with every node expanded.
    pub fn new(resources: Vec<Resource>) -> Self {
        let expansion = ExpansionState::all_expanded(&resources);
        Self {
            resources,
            mode: GraphMode::Structural,
            expansion,
            dependencies: OnceCell::new(),
            layout_config: None,
        }
    }

    pub fn with_layout_config(mut self, config: LayoutConfig) -> Self {
        self.layout_config = Some(config);
        self
    }

    /// Replaces the resource list. Everything is expanded again and the
    /// inferred dependencies are discarded.
    pub fn set_resources(&mut self, resources: Vec<Resource>) {
        self.expansion = ExpansionState::all_expanded(&resources);
        self.resources = resources;
        self.dependencies = OnceCell::new();
    }

    pub fn mode(&self) -> GraphMode {
        self.mode
    }

    /// Switches mode. Entering structural mode expands every node.
    pub fn set_mode(&mut self, mode: GraphMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        if mode == GraphMode::Structural {
            self.expansion = ExpansionState::all_expanded(&self.resources);
        }
        debug!("Switched to {} mode", mode);
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    /// Flips a node's expansion. Returns whether it is now expanded.
    pub fn toggle(&mut self, id: &str) -> bool {
        self.expansion = self.expansion.toggled(id);
        self.expansion.is_expanded(id)
    }

    /// Looks up the record behind a node, for detail views.
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Inferred dependencies, computed on first use.
    pub fn dependencies(&self) -> &[DependencyEdge] {
        self.dependencies
            .get_or_init(|| infer_dependencies(&self.resources))
    }

    /// The layout settings for the current mode.
    pub fn layout_config(&self) -> LayoutConfig {
        self.layout_config
            .clone()
            .unwrap_or_else(|| LayoutConfig::for_mode(self.mode))
    }

    /// Assembles the visible graph for the current mode and expansion.
    pub fn graph(&self) -> ResourceGraph {
        let builder = GraphBuilder::new(&self.resources)
            .mode(self.mode)
            .expansion(&self.expansion);

        match self.mode {
            GraphMode::Structural => builder.build(),
            GraphMode::Dependency => builder.dependencies(self.dependencies()).build(),
        }
    }

    /// Builds and lays out the visible graph.
    ///
    /// A layout error never escapes: it becomes [`RenderOutcome::Fallback`]
    /// and the session stays usable.
    pub fn render(&self) -> RenderOutcome {
        if self.resources.is_empty() {
            return RenderOutcome::Empty;
        }

        match self.graph().layout(&self.layout_config()) {
            Ok(result) => RenderOutcome::Ready(result),
            Err(err) => {
                warn!("Layout failed, showing fallback: {}", err);
                RenderOutcome::Fallback {
                    message: format!("Unable to lay out the graph: {}", err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources() -> Vec<Resource> {
        vec![
            Resource::new("proj::stack", "pulumi:pulumi:Stack"),
            Resource::new("proj::bucket", "aws:s3/bucket:Bucket")
                .with_parent("proj::stack")
                .with_output("arn", "arn:aws:s3:::logs"),
            Resource::new("proj::fn", "aws:lambda/function:Function")
                .with_parent("proj::stack")
                .with_input("bucket", "arn:aws:s3:::logs"),
        ]
    }

    fn ready(outcome: RenderOutcome) -> LayoutResult {
        match outcome {
            RenderOutcome::Ready(result) => result,
            other => panic!("expected a layout, got {:?}", other),
        }
    }

    #[test]
    fn test_starts_structural_and_expanded() {
        let session = GraphSession::new(resources());
        assert_eq!(session.mode(), GraphMode::Structural);
        assert_eq!(session.expansion().len(), 3);

        let result = ready(session.render());
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn test_toggle_hides_children() {
        let mut session = GraphSession::new(resources());
        assert!(!session.toggle("proj::stack"));

        let result = ready(session.render());
        assert_eq!(result.nodes.len(), 1);
        assert!(!result.nodes[0].expanded);

        assert!(session.toggle("proj::stack"));
        assert_eq!(ready(session.render()).nodes.len(), 3);
    }

    #[test]
    fn test_dependency_mode() {
        let mut session = GraphSession::new(resources());
        session.set_mode(GraphMode::Dependency);

        let result = ready(session.render());
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].source, "proj::bucket");
        assert_eq!(result.edges[0].target, "proj::fn");
    }

    #[test]
    fn test_dependencies_cached_until_resources_change() {
        let mut session = GraphSession::new(resources());
        let first = session.dependencies().as_ptr();
        session.toggle("proj::stack");
        session.set_mode(GraphMode::Dependency);
        assert_eq!(session.dependencies().as_ptr(), first);
        assert_eq!(session.dependencies().len(), 1);

        session.set_resources(vec![Resource::new("only", "t")]);
        assert!(session.dependencies().is_empty());
    }

    #[test]
    fn test_entering_structural_expands_all() {
        let mut session = GraphSession::new(resources());
        session.toggle("proj::stack");
        session.set_mode(GraphMode::Dependency);
        session.set_mode(GraphMode::Structural);
        assert!(session.expansion().is_expanded("proj::stack"));
    }

    #[test]
    fn test_set_resources_resets_expansion() {
        let mut session = GraphSession::new(resources());
        session.toggle("proj::stack");
        session.set_resources(resources());
        assert!(session.expansion().is_expanded("proj::stack"));
    }

    #[test]
    fn test_empty_session() {
        let session = GraphSession::new(Vec::new());
        assert_eq!(session.render(), RenderOutcome::Empty);
    }

    #[test]
    fn test_layout_failure_falls_back() {
        let config = LayoutConfig {
            rank_spacing: -1.0,
            ..LayoutConfig::default()
        };
        let session = GraphSession::new(resources()).with_layout_config(config);

        match session.render() {
            RenderOutcome::Fallback { message } => assert!(message.contains("rank_spacing")),
            other => panic!("expected fallback, got {:?}", other),
        }

        // The session still answers queries after a failed render.
        assert!(session.resource("proj::fn").is_some());
    }

    #[test]
    fn test_layout_config_follows_mode() {
        let mut session = GraphSession::new(resources());
        assert_eq!(session.layout_config().rank_spacing, 60.0);
        session.set_mode(GraphMode::Dependency);
        assert_eq!(session.layout_config().rank_spacing, 80.0);
    }

    #[test]
    fn test_resource_lookup() {
        let session = GraphSession::new(resources());
        assert_eq!(
            session.resource("proj::bucket").map(|r| r.kind.as_str()),
            Some("aws:s3/bucket:Bucket")
        );
        assert!(session.resource("missing").is_none());
    }
}
