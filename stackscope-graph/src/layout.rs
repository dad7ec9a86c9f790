//! Layered graph layout.
//!
//! Positions every node of a resource graph along a flow direction. The
//! engine is deterministic: the same nodes, edges and config always give
//! the same coordinates. Inputs are never modified; the result carries
//! new copies of the nodes and edges.
//!
//! # Pipeline
//! 1. Split into connected components (each laid out on its own)
//! 2. Cycle breaking (DFS back edges are reversed for ranking only)
//! 3. Rank assignment (longest path, sources pulled toward their successors)
//! 4. Virtual nodes for edges spanning several ranks
//! 5. Ordering within ranks (barycenter sweeps, best crossing count kept)
//! 6. Coordinates (neighbor averaging with minimum separation), then
//!    components stacked along the secondary axis

use crate::builder::GraphMode;
use crate::edge::GraphEdge;
use crate::graph::ResourceGraph;
use crate::node::{GraphNode, HandlePosition, Point};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Neighbor-averaging passes during coordinate assignment.
const REFINEMENT_PASSES: usize = 4;

/// Errors that stop a layout.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),

    #[error("edge {edge} references unknown node {node}")]
    UnknownEndpoint { edge: String, node: String },

    #[error("duplicate node id {0}")]
    DuplicateNode(String),
}

/// Direction ranks flow in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RankDirection {
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "BT")]
    BottomTop,
}

impl RankDirection {
    fn is_horizontal(self) -> bool {
        matches!(self, RankDirection::LeftRight | RankDirection::RightLeft)
    }

    fn is_reversed(self) -> bool {
        matches!(self, RankDirection::RightLeft | RankDirection::BottomTop)
    }

    /// Handle sides as `(source, target)`.
    pub fn handles(self) -> (HandlePosition, HandlePosition) {
        match self {
            RankDirection::LeftRight => (HandlePosition::Right, HandlePosition::Left),
            RankDirection::RightLeft => (HandlePosition::Left, HandlePosition::Right),
            RankDirection::TopBottom => (HandlePosition::Bottom, HandlePosition::Top),
            RankDirection::BottomTop => (HandlePosition::Top, HandlePosition::Bottom),
        }
    }
}

impl std::fmt::Display for RankDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RankDirection::LeftRight => "LR",
            RankDirection::RightLeft => "RL",
            RankDirection::TopBottom => "TB",
            RankDirection::BottomTop => "BT",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RankDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LR" => Ok(RankDirection::LeftRight),
            "RL" => Ok(RankDirection::RightLeft),
            "TB" | "TD" => Ok(RankDirection::TopBottom),
            "BT" => Ok(RankDirection::BottomTop),
            other => Err(format!("unknown direction '{}' (expected LR, RL, TB or BT)", other)),
        }
    }
}

/// Sizes and spacing for layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: RankDirection,
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between adjacent ranks.
    pub rank_spacing: f64,
    /// Minimum gap between neighbors in the same rank.
    pub node_spacing: f64,
    /// Gap between connected components.
    pub component_spacing: f64,
    /// Barycenter sweeps during ordering.
    pub crossing_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: RankDirection::LeftRight,
            node_width: 220.0,
            node_height: 40.0,
            rank_spacing: 60.0,
            node_spacing: 30.0,
            component_spacing: 40.0,
            crossing_passes: 8,
        }
    }
}

impl LayoutConfig {
    /// Spacing tuned for each mode. Dependency graphs get more room since
    /// their edges cross more often.
    pub fn for_mode(mode: GraphMode) -> Self {
        match mode {
            GraphMode::Structural => Self::default(),
            GraphMode::Dependency => Self {
                rank_spacing: 80.0,
                node_spacing: 40.0,
                ..Self::default()
            },
        }
    }

    pub fn with_direction(mut self, direction: RankDirection) -> Self {
        self.direction = direction;
        self
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let fields = [
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("rank_spacing", self.rank_spacing),
            ("node_spacing", self.node_spacing),
            ("component_spacing", self.component_spacing),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.node_width == 0.0 || self.node_height == 0.0 {
            return Err(LayoutError::InvalidConfig(
                "node size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Node size along the rank axis.
    fn primary_size(&self) -> f64 {
        if self.direction.is_horizontal() {
            self.node_width
        } else {
            self.node_height
        }
    }

    /// Node size across the rank axis.
    fn secondary_size(&self) -> f64 {
        if self.direction.is_horizontal() {
            self.node_height
        } else {
            self.node_width
        }
    }
}

/// A positioned graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub width: f64,
    pub height: f64,
    /// Number of ranks in the deepest component.
    pub ranks: usize,
    pub components: usize,
}

impl ResourceGraph {
    /// Lays out this graph. See [`layout`].
    pub fn layout(&self, config: &LayoutConfig) -> Result<LayoutResult, LayoutError> {
        let nodes: Vec<GraphNode> = self.nodes().cloned().collect();
        let edges: Vec<GraphEdge> = self.edges().cloned().collect();
        layout(&nodes, &edges, config)
    }
}

/// An edge between two distinct nodes, by node position.
#[derive(Debug, Clone, Copy)]
struct Link {
    edge: usize,
    from: usize,
    to: usize,
}

/// Computes positions for every node and bend points for every edge.
///
/// Self-loops are kept in the output but ignored for placement.
pub fn layout(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    config: &LayoutConfig,
) -> Result<LayoutResult, LayoutError> {
    config.validate()?;

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            return Err(LayoutError::DuplicateNode(node.id.clone()));
        }
    }

    let mut links = Vec::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        let from = endpoint(&index, edge, &edge.source)?;
        let to = endpoint(&index, edge, &edge.target)?;
        if from != to {
            links.push(Link { edge: i, from, to });
        }
    }

    let (components, component_of) = split_components(nodes.len(), &links);
    let mut component_links = vec![Vec::new(); components.len()];
    for link in &links {
        component_links[component_of[link.from]].push(*link);
    }

    let mut primary = vec![0.0; nodes.len()];
    let mut secondary = vec![0.0; nodes.len()];
    let mut bends: Vec<Vec<(f64, f64)>> = vec![Vec::new(); edges.len()];
    let mut ranks = 0;
    let mut offset = 0.0;
    let separation = config.component_spacing.max(config.node_spacing);

    for (members, links) in components.iter().zip(&component_links) {
        let placed = place_component(members, links, config);

        for (&node, &(p, s)) in members.iter().zip(&placed.centers) {
            primary[node] = p;
            secondary[node] = s + offset;
        }
        for (edge, points) in placed.bends {
            bends[edge] = points.into_iter().map(|(p, s)| (p, s + offset)).collect();
        }

        ranks = ranks.max(placed.ranks);
        offset += placed.span + separation;
    }

    let secondary_extent = if components.is_empty() {
        0.0
    } else {
        offset - separation
    };
    let primary_extent = if ranks == 0 {
        0.0
    } else {
        ranks as f64 * (config.primary_size() + config.rank_spacing) - config.rank_spacing
    };

    let direction = config.direction;
    let to_point = |p: f64, s: f64| {
        let p = if direction.is_reversed() {
            primary_extent - p
        } else {
            p
        };
        if direction.is_horizontal() {
            Point::new(p, s)
        } else {
            Point::new(s, p)
        }
    };

    let (source_position, target_position) = direction.handles();
    let positioned_nodes = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let center = to_point(primary[i], secondary[i]);
            let mut node = node.clone();
            node.position = Point::new(
                center.x - config.node_width / 2.0,
                center.y - config.node_height / 2.0,
            );
            node.source_position = source_position;
            node.target_position = target_position;
            node
        })
        .collect();

    let routed_edges = edges
        .iter()
        .zip(bends)
        .map(|(edge, points)| {
            let mut edge = edge.clone();
            edge.points = points.into_iter().map(|(p, s)| to_point(p, s)).collect();
            edge
        })
        .collect();

    let (width, height) = if direction.is_horizontal() {
        (primary_extent, secondary_extent)
    } else {
        (secondary_extent, primary_extent)
    };

    debug!(
        "Laid out {} nodes in {} components, {} ranks ({:.0}x{:.0})",
        nodes.len(),
        components.len(),
        ranks,
        width,
        height
    );

    Ok(LayoutResult {
        nodes: positioned_nodes,
        edges: routed_edges,
        width,
        height,
        ranks,
        components: components.len(),
    })
}

fn endpoint(index: &HashMap<&str, usize>, edge: &GraphEdge, id: &str) -> Result<usize, LayoutError> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| LayoutError::UnknownEndpoint {
            edge: edge.id.clone(),
            node: id.to_string(),
        })
}

/// Groups nodes into connected components, ignoring edge direction.
///
/// Components are numbered by their first node, members keep input order.
fn split_components(n: usize, links: &[Link]) -> (Vec<Vec<usize>>, Vec<usize>) {
    let mut sets = UnionFind::new(n);
    for link in links {
        sets.union(link.from, link.to);
    }

    let mut numbering: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut component_of = vec![0; n];

    for node in 0..n {
        let root = sets.find(node);
        let id = *numbering.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[id].push(node);
        component_of[node] = id;
    }

    (components, component_of)
}

/// One component's placement, in primary/secondary center coordinates.
struct PlacedComponent {
    /// Center of each member, aligned with the member list.
    centers: Vec<(f64, f64)>,
    /// Bend points per edge index, from source to target.
    bends: Vec<(usize, Vec<(f64, f64)>)>,
    ranks: usize,
    /// Extent along the secondary axis, starting at zero.
    span: f64,
}

fn place_component(members: &[usize], links: &[Link], config: &LayoutConfig) -> PlacedComponent {
    let local: HashMap<usize, usize> = members
        .iter()
        .enumerate()
        .map(|(i, &node)| (node, i))
        .collect();
    let arcs: Vec<(usize, usize)> = links
        .iter()
        .map(|link| (local[&link.from], local[&link.to]))
        .collect();

    let reversed = break_cycles(members.len(), &arcs);
    let acyclic: Vec<(usize, usize)> = arcs
        .iter()
        .zip(&reversed)
        .map(|(&(u, v), &flip)| if flip { (v, u) } else { (u, v) })
        .collect();
    let rank = assign_ranks(members.len(), &acyclic);

    let mut layered = Layered::new(rank, config.secondary_size());
    let chains: Vec<Vec<usize>> = acyclic
        .iter()
        .map(|&(u, v)| layered.connect(u, v))
        .collect();

    let layers = layered.order(config.crossing_passes);
    let centers = layered.coordinates(&layers, config.node_spacing);

    let pitch = config.primary_size() + config.rank_spacing;
    let primary_of = |r: usize| r as f64 * pitch + config.primary_size() / 2.0;

    let span = (0..layered.len())
        .map(|v| centers[v] + layered.extent[v] / 2.0)
        .fold(0.0, f64::max);

    let bends = chains
        .into_iter()
        .zip(&reversed)
        .zip(links)
        .map(|((chain, &flip), link)| {
            let mut points: Vec<(f64, f64)> = chain
                .into_iter()
                .map(|v| (primary_of(layered.rank[v]), centers[v]))
                .collect();
            if flip {
                points.reverse();
            }
            (link.edge, points)
        })
        .collect();

    PlacedComponent {
        centers: (0..members.len())
            .map(|v| (primary_of(layered.rank[v]), centers[v]))
            .collect(),
        bends,
        ranks: layers.len(),
        span,
    }
}

/// Marks the arcs to reverse so the graph becomes acyclic.
///
/// Depth-first from each node in order; an arc into a node still on the
/// stack closes a cycle and is reversed.
fn break_cycles(n: usize, arcs: &[(usize, usize)]) -> Vec<bool> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, &(u, _)) in arcs.iter().enumerate() {
        out[u].push(i);
    }

    let mut mark = vec![Mark::New; n];
    let mut reversed = vec![false; arcs.len()];

    for start in 0..n {
        if mark[start] != Mark::New {
            continue;
        }
        mark[start] = Mark::Active;
        let mut stack = vec![(start, 0usize)];

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let Some(&arc) = out[node].get(top.1) else {
                mark[node] = Mark::Done;
                stack.pop();
                continue;
            };
            top.1 += 1;

            let target = arcs[arc].1;
            match mark[target] {
                Mark::New => {
                    mark[target] = Mark::Active;
                    stack.push((target, 0));
                }
                Mark::Active => reversed[arc] = true,
                Mark::Done => {}
            }
        }
    }

    reversed
}

/// Longest-path ranking over an acyclic arc list.
///
/// Sources that feed into the graph are then moved down to sit just above
/// their nearest successor, which shortens their edges. Isolated nodes stay
/// at rank 0.
fn assign_ranks(n: usize, arcs: &[(usize, usize)]) -> Vec<usize> {
    let mut indegree = vec![0usize; n];
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(u, v) in arcs {
        out[u].push(v);
        indegree[v] += 1;
    }

    let sources: Vec<usize> = (0..n).filter(|&v| indegree[v] == 0).collect();
    let mut queue: VecDeque<usize> = sources.iter().copied().collect();
    let mut rank = vec![0usize; n];

    while let Some(u) = queue.pop_front() {
        for &v in &out[u] {
            rank[v] = rank[v].max(rank[u] + 1);
            indegree[v] -= 1;
            if indegree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    for &source in &sources {
        if let Some(nearest) = out[source].iter().map(|&v| rank[v]).min() {
            rank[source] = nearest - 1;
        }
    }

    rank
}

/// Real and virtual nodes arranged in ranks.
///
/// Ids `0..n` are the component's real nodes; virtual nodes follow.
/// Every link joins adjacent ranks.
struct Layered {
    rank: Vec<usize>,
    /// Size across the rank axis; zero for virtual nodes.
    extent: Vec<f64>,
    /// Neighbors one rank up.
    up: Vec<Vec<usize>>,
    /// Neighbors one rank down.
    down: Vec<Vec<usize>>,
}

impl Layered {
    fn new(rank: Vec<usize>, node_extent: f64) -> Self {
        let n = rank.len();
        Self {
            rank,
            extent: vec![node_extent; n],
            up: vec![Vec::new(); n],
            down: vec![Vec::new(); n],
        }
    }

    fn len(&self) -> usize {
        self.rank.len()
    }

    fn rank_count(&self) -> usize {
        self.rank.iter().max().map_or(0, |&r| r + 1)
    }

    /// Joins `from` to `to` through one virtual node per skipped rank.
    /// Returns the virtual nodes, top to bottom.
    fn connect(&mut self, from: usize, to: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut previous = from;

        for r in self.rank[from] + 1..self.rank[to] {
            let id = self.len();
            self.rank.push(r);
            self.extent.push(0.0);
            self.up.push(Vec::new());
            self.down.push(Vec::new());
            self.link(previous, id);
            chain.push(id);
            previous = id;
        }

        self.link(previous, to);
        chain
    }

    fn link(&mut self, upper: usize, lower: usize) {
        self.down[upper].push(lower);
        self.up[lower].push(upper);
    }

    /// Depth-first walk from the top rank so that children start out next
    /// to each other.
    fn initial_order(&self) -> Vec<Vec<usize>> {
        let mut layers = vec![Vec::new(); self.rank_count()];
        let mut seen = vec![false; self.len()];

        let mut starts: Vec<usize> = (0..self.len()).collect();
        starts.sort_by_key(|&v| self.rank[v]);

        for start in starts {
            let mut stack = vec![start];
            while let Some(v) = stack.pop() {
                if seen[v] {
                    continue;
                }
                seen[v] = true;
                layers[self.rank[v]].push(v);
                stack.extend(self.down[v].iter().rev().filter(|&&w| !seen[w]));
            }
        }

        layers
    }

    /// Orders every rank, keeping the arrangement with fewest crossings.
    fn order(&self, passes: usize) -> Vec<Vec<usize>> {
        let mut layers = self.initial_order();
        let mut position = vec![0usize; self.len()];
        for layer in &layers {
            record_positions(layer, &mut position);
        }

        let mut best = layers.clone();
        let mut best_crossings = count_crossings(&layers, &self.down, &position);

        for pass in 0..passes {
            if best_crossings == 0 {
                break;
            }

            if pass % 2 == 0 {
                for r in 1..layers.len() {
                    sort_by_barycenter(&mut layers[r], &self.up, &mut position);
                }
            } else {
                for r in (0..layers.len().saturating_sub(1)).rev() {
                    sort_by_barycenter(&mut layers[r], &self.down, &mut position);
                }
            }

            let crossings = count_crossings(&layers, &self.down, &position);
            if crossings < best_crossings {
                best_crossings = crossings;
                best = layers.clone();
            }
        }

        best
    }

    /// Secondary-axis centers for every node, smallest edge at zero.
    fn coordinates(&self, layers: &[Vec<usize>], spacing: f64) -> Vec<f64> {
        let mut center = vec![0.0; self.len()];

        for layer in layers {
            let mut previous: Option<usize> = None;
            for &v in layer {
                center[v] = match previous {
                    None => self.extent[v] / 2.0,
                    Some(p) => center[p] + self.gap(p, v, spacing),
                };
                previous = Some(v);
            }
        }

        for pass in 0..REFINEMENT_PASSES {
            let downward = pass % 2 == 0;
            let neighbors = if downward { &self.up } else { &self.down };
            let ranks: Vec<usize> = if downward {
                (0..layers.len()).collect()
            } else {
                (0..layers.len()).rev().collect()
            };

            for r in ranks {
                let layer = &layers[r];
                let desired: Vec<f64> = layer
                    .iter()
                    .map(|&v| {
                        let adjacent = &neighbors[v];
                        if adjacent.is_empty() {
                            center[v]
                        } else {
                            adjacent.iter().map(|&w| center[w]).sum::<f64>() / adjacent.len() as f64
                        }
                    })
                    .collect();
                self.place(layer, &desired, spacing, &mut center);
            }
        }

        let min = (0..self.len())
            .map(|v| center[v] - self.extent[v] / 2.0)
            .fold(f64::INFINITY, f64::min);
        if min.is_finite() {
            for c in &mut center {
                *c -= min;
            }
        }

        center
    }

    /// Moves a rank as close to `desired` as separation allows.
    ///
    /// Packs once pushing rightward and once pushing leftward, then takes
    /// the midpoint. Both packings keep every gap, so the midpoint does too.
    fn place(&self, layer: &[usize], desired: &[f64], spacing: f64, center: &mut [f64]) {
        let k = layer.len();
        if k == 0 {
            return;
        }

        let mut rightward = desired.to_vec();
        for i in 1..k {
            let min = rightward[i - 1] + self.gap(layer[i - 1], layer[i], spacing);
            if rightward[i] < min {
                rightward[i] = min;
            }
        }

        let mut leftward = desired.to_vec();
        for i in (0..k - 1).rev() {
            let max = leftward[i + 1] - self.gap(layer[i], layer[i + 1], spacing);
            if leftward[i] > max {
                leftward[i] = max;
            }
        }

        for (i, &v) in layer.iter().enumerate() {
            center[v] = (rightward[i] + leftward[i]) / 2.0;
        }
    }

    /// Minimum distance between the centers of two neighbors in a rank.
    fn gap(&self, a: usize, b: usize, spacing: f64) -> f64 {
        (self.extent[a] + self.extent[b]) / 2.0 + spacing
    }
}

fn record_positions(layer: &[usize], position: &mut [usize]) {
    for (i, &v) in layer.iter().enumerate() {
        position[v] = i;
    }
}

/// Reorders one rank by the mean position of each node's neighbors in the
/// adjacent fixed rank. Nodes without neighbors keep their current slot as
/// their key; ties keep the current order.
fn sort_by_barycenter(layer: &mut [usize], neighbors: &[Vec<usize>], position: &mut [usize]) {
    let mut keyed: Vec<(f64, usize, usize)> = layer
        .iter()
        .map(|&v| {
            let adjacent = &neighbors[v];
            let key = if adjacent.is_empty() {
                position[v] as f64
            } else {
                adjacent.iter().map(|&w| position[w] as f64).sum::<f64>() / adjacent.len() as f64
            };
            (key, position[v], v)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    for (slot, (_, _, v)) in layer.iter_mut().zip(keyed) {
        *slot = v;
    }
    record_positions(layer, position);
}

/// Counts pairwise crossings between every pair of adjacent ranks.
fn count_crossings(layers: &[Vec<usize>], down: &[Vec<usize>], position: &[usize]) -> usize {
    let mut crossings = 0;

    for layer in layers {
        let mut pairs: Vec<(usize, usize)> = layer
            .iter()
            .flat_map(|&u| down[u].iter().map(move |&w| (position[u], position[w])))
            .collect();
        pairs.sort_unstable();

        for i in 0..pairs.len() {
            for j in i + 1..pairs.len() {
                if pairs[i].1 > pairs[j].1 {
                    crossings += 1;
                }
            }
        }
    }

    crossings
}
