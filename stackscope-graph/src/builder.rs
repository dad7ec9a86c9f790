//! Graph builder for assembling the visible resource graph.
//!
//! The builder takes the flat resource list and produces the node and edge
//! set for one mode:
//! - Structural: parent → child containment, filtered by expansion state
//! - Dependency: inferred data flow, provider → consumer, every resource shown
//!
//! Bad records never abort a build. A parent that doesn't exist makes the
//! resource a root, a repeated id keeps its first record, and a parent
//! cycle is broken by promoting its first member to a root.

use crate::edge::{DependencyEdge, GraphEdge};
use crate::expansion::ExpansionState;
use crate::graph::ResourceGraph;
use crate::inference::infer_dependencies;
use crate::node::GraphNode;
use serde::{Deserialize, Serialize};
use stackscope_core::Resource;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, warn};

/// Which relationship the graph draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
    /// Parent/child containment.
    #[default]
    Structural,
    /// Inferred data-flow dependencies.
    Dependency,
}

impl std::fmt::Display for GraphMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphMode::Structural => write!(f, "structural"),
            GraphMode::Dependency => write!(f, "dependency"),
        }
    }
}

impl FromStr for GraphMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structural" | "parent-child" => Ok(GraphMode::Structural),
            "dependency" | "dependencies" => Ok(GraphMode::Dependency),
            other => Err(format!("unknown graph mode '{}'", other)),
        }
    }
}

/// Assembles a resource graph.
///
/// In dependency mode the dependencies are inferred on the spot. Callers
/// that rebuild often should infer once and use [`GraphBuilder`] with
/// [`GraphBuilder::dependencies`].
pub fn assemble(
    resources: &[Resource],
    mode: GraphMode,
    expansion: &ExpansionState,
) -> ResourceGraph {
    GraphBuilder::new(resources)
        .mode(mode)
        .expansion(expansion)
        .build()
}

/// Builds a ResourceGraph from resource records.
pub struct GraphBuilder<'a> {
    resources: &'a [Resource],
    mode: GraphMode,
    expansion: Option<&'a ExpansionState>,
    dependencies: Option<&'a [DependencyEdge]>,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a structural-mode builder with everything expanded.
    pub fn new(resources: &'a [Resource]) -> Self {
        Self {
            resources,
            mode: GraphMode::Structural,
            expansion: None,
            dependencies: None,
        }
    }

    pub fn mode(mut self, mode: GraphMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the expansion snapshot. Without one every node is expanded.
    pub fn expansion(mut self, expansion: &'a ExpansionState) -> Self {
        self.expansion = Some(expansion);
        self
    }

    /// Supplies precomputed dependencies for dependency mode.
    pub fn dependencies(mut self, dependencies: &'a [DependencyEdge]) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    /// Finishes building and returns the graph.
    pub fn build(self) -> ResourceGraph {
        let records = unique_records(self.resources);

        let graph = match self.mode {
            GraphMode::Structural => self.build_structural(&records),
            GraphMode::Dependency => self.build_dependency(&records),
        };

        debug!(
            "Assembled {} graph: {} nodes, {} edges",
            self.mode,
            graph.node_count(),
            graph.edge_count()
        );

        graph
    }

    fn is_expanded(&self, id: &str) -> bool {
        self.expansion.map_or(true, |state| state.is_expanded(id))
    }

    fn build_structural(&self, records: &[&Resource]) -> ResourceGraph {
        let tree = Forest::new(records);

        // Walk down from the roots, descending only through expanded nodes.
        // `reached_from` records the parent each node was reached through.
        let mut visible = vec![false; records.len()];
        let mut reached_from: Vec<Option<usize>> = vec![None; records.len()];

        for &root in &tree.roots {
            let mut stack = vec![root];
            visible[root] = true;

            while let Some(current) = stack.pop() {
                if !self.is_expanded(&records[current].id) {
                    continue;
                }
                for &child in tree.children[current].iter().rev() {
                    if visible[child] {
                        continue;
                    }
                    visible[child] = true;
                    reached_from[child] = Some(current);
                    stack.push(child);
                }
            }
        }

        let mut graph = ResourceGraph::new();

        for (index, record) in records.iter().enumerate() {
            if !visible[index] {
                continue;
            }
            let mut node = GraphNode::from_resource(record);
            node.has_children = !tree.children[index].is_empty();
            node.expanded = self.is_expanded(&record.id);
            graph.add_node(node);
        }

        for (child, parent) in reached_from.iter().enumerate() {
            if let Some(parent) = parent {
                graph.add_edge(GraphEdge::contains(&records[*parent].id, &records[child].id));
            }
        }

        graph
    }

    fn build_dependency(&self, records: &[&Resource]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for record in records {
            graph.add_node(GraphNode::from_resource(record));
        }

        let inferred;
        let dependencies = match self.dependencies {
            Some(dependencies) => dependencies,
            None => {
                inferred = infer_dependencies(records);
                &inferred
            }
        };

        for dependency in dependencies {
            if !graph.add_edge(GraphEdge::data_flow(dependency)) {
                debug!(
                    "Dropping dependency {} -> {}: endpoint not in resource set",
                    dependency.from, dependency.to
                );
            }
        }

        graph
    }
}

/// Keeps the first record for each id.
fn unique_records(resources: &[Resource]) -> Vec<&Resource> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(resources.len());
    let mut records = Vec::with_capacity(resources.len());

    for resource in resources {
        if !seen.insert(resource.id.as_str()) {
            warn!("Duplicate resource id {}, keeping first record", resource.id);
            continue;
        }
        records.push(resource);
    }

    records
}

/// Parent/child structure over deduplicated records.
struct Forest {
    /// Children of each record, in input order.
    children: Vec<Vec<usize>>,
    /// Records every other record descends from, in input order.
    roots: Vec<usize>,
}

impl Forest {
    fn new(records: &[&Resource]) -> Self {
        let index: HashMap<&str, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut children = vec![Vec::new(); records.len()];
        let mut parent_of: Vec<Option<usize>> = vec![None; records.len()];
        let mut roots = Vec::new();

        for (i, record) in records.iter().enumerate() {
            match record.parent_id() {
                None => roots.push(i),
                Some(parent) => match index.get(parent) {
                    Some(&p) if p != i => {
                        children[p].push(i);
                        parent_of[i] = Some(p);
                    }
                    Some(_) => {
                        warn!("Resource {} is its own parent, treating as root", record.id);
                        roots.push(i);
                    }
                    None => {
                        warn!(
                            "Parent {} of {} not found, treating as root",
                            parent, record.id
                        );
                        roots.push(i);
                    }
                },
            }
        }

        // Anything not below a root sits on a parent cycle (or below one).
        // Promoting a cycle member keeps every record hanging below the
        // cycle attached to its own parent.
        let mut reached = vec![false; records.len()];
        for &root in &roots {
            mark_subtree(root, &children, &mut reached);
        }
        for i in 0..records.len() {
            if reached[i] {
                continue;
            }
            let member = cycle_member(i, &parent_of);
            warn!(
                "Resource {} is part of a parent cycle, treating as root",
                records[member].id
            );
            roots.push(member);
            mark_subtree(member, &children, &mut reached);
        }
        roots.sort_unstable();

        Self { children, roots }
    }
}

/// Follows parent links from `start` until one repeats, then returns the
/// earliest record (in input order) on the cycle it closed.
fn cycle_member(start: usize, parent_of: &[Option<usize>]) -> usize {
    let mut seen = HashSet::new();
    let mut current = start;
    while seen.insert(current) {
        match parent_of[current] {
            Some(parent) => current = parent,
            None => return current,
        }
    }

    let mut first = current;
    let mut next = parent_of[current];
    while let Some(member) = next {
        if member == current {
            break;
        }
        first = first.min(member);
        next = parent_of[member];
    }
    first
}

fn mark_subtree(start: usize, children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        if reached[current] {
            continue;
        }
        reached[current] = true;
        stack.extend(children[current].iter().copied());
    }
}
