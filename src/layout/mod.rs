//! Layout engine
//!
//! A registry of named layout algorithms. Every algorithm is pure: it takes a
//! graph and returns a new graph with updated `position` fields, leaving the
//! input untouched. Unknown algorithm names are an explicit error.

mod force;
mod quadtree;

pub use force::BARNES_HUT_THRESHOLD;
pub use quadtree::{Aabb, QuadTree};

use std::collections::{HashMap, HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{NodalError, Result};
use crate::types::{GraphData, NodeId, Position};

/// Named layout algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutAlgorithm {
    #[default]
    ForceDirected,
    Circular,
    Hierarchical,
    Grid,
    Radial,
}

impl LayoutAlgorithm {
    /// String representation (the registry name)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutAlgorithm::ForceDirected => "force-directed",
            LayoutAlgorithm::Circular => "circular",
            LayoutAlgorithm::Hierarchical => "hierarchical",
            LayoutAlgorithm::Grid => "grid",
            LayoutAlgorithm::Radial => "radial",
        }
    }

    /// All registered algorithms
    #[must_use]
    pub fn all() -> &'static [LayoutAlgorithm] {
        &[
            LayoutAlgorithm::ForceDirected,
            LayoutAlgorithm::Circular,
            LayoutAlgorithm::Hierarchical,
            LayoutAlgorithm::Grid,
            LayoutAlgorithm::Radial,
        ]
    }
}

impl std::fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LayoutAlgorithm {
    type Err = NodalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "force-directed" | "force" => Ok(LayoutAlgorithm::ForceDirected),
            "circular" => Ok(LayoutAlgorithm::Circular),
            "hierarchical" => Ok(LayoutAlgorithm::Hierarchical),
            "grid" => Ok(LayoutAlgorithm::Grid),
            "radial" => Ok(LayoutAlgorithm::Radial),
            _ => Err(NodalError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Tunables shared by the layout algorithms
#[derive(Debug, Clone)]
pub struct LayoutParams {
    /// Bounding box width for seeding and clamping
    pub width: f32,
    /// Bounding box height for seeding and clamping
    pub height: f32,
    /// Fixed iteration count for the force simulation
    pub iterations: usize,
    /// Repulsion constant (force is repulsion_strength / d^2)
    pub repulsion_strength: f32,
    /// Spring rest length for linked nodes
    pub link_distance: f32,
    /// Spring stiffness (force per unit of rest-length deviation)
    pub spring_stiffness: f32,
    /// Circle radius for the circular layout
    pub radius: f32,
    /// Vertical distance between hierarchy levels
    pub level_separation: f32,
    /// Horizontal distance between nodes within a level
    pub node_spacing: f32,
    /// Column count for the grid layout
    pub columns: usize,
    /// Cell spacing for the grid layout
    pub spacing: f32,
    /// Ring count for the radial layout
    pub levels: usize,
    /// Distance between consecutive rings
    pub ring_gap: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            iterations: 150,
            repulsion_strength: 300.0,
            link_distance: 100.0,
            spring_stiffness: 0.05,
            radius: 200.0,
            level_separation: 120.0,
            node_spacing: 80.0,
            columns: 8,
            spacing: 100.0,
            levels: 4,
            ring_gap: 90.0,
        }
    }
}

impl LayoutParams {
    /// Center of the bounding box
    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Pure layout computation over graph snapshots
#[derive(Debug)]
pub struct LayoutEngine {
    rng: StdRng,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    /// Create an engine seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create an engine with a fixed seed for reproducible layouts
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run the named algorithm. Unknown names yield
    /// [`NodalError::UnknownAlgorithm`].
    pub fn apply(&mut self, name: &str, data: &GraphData, params: &LayoutParams) -> Result<GraphData> {
        let algorithm: LayoutAlgorithm = name.parse()?;
        Ok(self.apply_algorithm(algorithm, data, params))
    }

    /// Run a specific algorithm
    pub fn apply_algorithm(
        &mut self,
        algorithm: LayoutAlgorithm,
        data: &GraphData,
        params: &LayoutParams,
    ) -> GraphData {
        tracing::debug!(
            algorithm = %algorithm,
            nodes = data.nodes.len(),
            links = data.links.len(),
            "applying layout"
        );
        match algorithm {
            LayoutAlgorithm::ForceDirected => force::execute(&mut self.rng, data, params),
            LayoutAlgorithm::Circular => circular(data, params),
            LayoutAlgorithm::Hierarchical => hierarchical(data, params),
            LayoutAlgorithm::Grid => grid(data, params),
            LayoutAlgorithm::Radial => radial(data, params),
        }
    }
}

/// Nodes on a circle: equal radius, equally spaced angles
fn circular(data: &GraphData, params: &LayoutParams) -> GraphData {
    let mut result = data.clone();
    let n = result.nodes.len();
    if n == 0 {
        return result;
    }

    let center = params.center();
    for (i, node) in result.nodes.iter_mut().enumerate() {
        let angle = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
        node.position = Some(Position::new(
            center.x + params.radius * angle.cos(),
            center.y + params.radius * angle.sin(),
        ));
    }
    result
}

/// Row-major grid with a fixed column count
fn grid(data: &GraphData, params: &LayoutParams) -> GraphData {
    let mut result = data.clone();
    let columns = params.columns.max(1);

    for (i, node) in result.nodes.iter_mut().enumerate() {
        let col = i % columns;
        let row = i / columns;
        node.position = Some(Position::new(
            col as f32 * params.spacing,
            row as f32 * params.spacing,
        ));
    }
    result
}

/// Concentric rings indexed by `i mod levels`, angle by position within ring
fn radial(data: &GraphData, params: &LayoutParams) -> GraphData {
    let mut result = data.clone();
    let n = result.nodes.len();
    if n == 0 {
        return result;
    }

    let levels = params.levels.max(1);
    let center = params.center();

    // Nodes per ring, so each ring spreads its members over the full circle
    let mut ring_totals = vec![0usize; levels];
    for i in 0..n {
        ring_totals[i % levels] += 1;
    }

    let mut ring_seen = vec![0usize; levels];
    for (i, node) in result.nodes.iter_mut().enumerate() {
        let ring = i % levels;
        let index_in_ring = ring_seen[ring];
        ring_seen[ring] += 1;

        let count = ring_totals[ring].max(1);
        let angle = 2.0 * std::f32::consts::PI * index_in_ring as f32 / count as f32;
        let r = params.ring_gap * (ring + 1) as f32;
        node.position = Some(Position::new(
            center.x + r * angle.cos(),
            center.y + r * angle.sin(),
        ));
    }
    result
}

/// Levels by breadth-first traversal of outgoing links from zero-in-degree
/// roots; rows evenly spaced and centered
fn hierarchical(data: &GraphData, params: &LayoutParams) -> GraphData {
    let mut result = data.clone();
    if result.nodes.is_empty() {
        return result;
    }

    let node_ids: Vec<NodeId> = result.nodes.iter().map(|n| n.id.clone()).collect();
    let id_set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();

    let mut in_degree: HashMap<&str, usize> = node_ids.iter().map(|id| (id.as_str(), 0)).collect();
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in &result.links {
        if !id_set.contains(link.source.as_str()) || !id_set.contains(link.target.as_str()) {
            continue;
        }
        *in_degree.entry(link.target.as_str()).or_insert(0) += 1;
        outgoing
            .entry(link.source.as_str())
            .or_default()
            .push(link.target.as_str());
    }

    // BFS from the roots, visiting each node once
    let mut level_of: HashMap<String, usize> = HashMap::new();
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    for id in &node_ids {
        if in_degree.get(id.as_str()) == Some(&0) {
            queue.push_back((id.as_str(), 0));
            level_of.insert(id.clone(), 0);
        }
    }
    while let Some((id, level)) = queue.pop_front() {
        if let Some(targets) = outgoing.get(id) {
            for &target in targets {
                if !level_of.contains_key(target) {
                    level_of.insert(target.to_string(), level + 1);
                    queue.push_back((target, level + 1));
                }
            }
        }
    }

    // Nodes unreachable from any root (cycles) land on one final row
    let max_level = level_of.values().max().copied().unwrap_or(0);
    let overflow_level = if level_of.len() < node_ids.len() {
        max_level + 1
    } else {
        max_level
    };
    for id in &node_ids {
        level_of.entry(id.clone()).or_insert(overflow_level);
    }

    let mut level_counts: HashMap<usize, usize> = HashMap::new();
    for &level in level_of.values() {
        *level_counts.entry(level).or_insert(0) += 1;
    }

    let center_x = params.center().x;
    let mut level_seen: HashMap<usize, usize> = HashMap::new();
    for node in result.nodes.iter_mut() {
        let level = level_of[&node.id];
        let count = level_counts[&level];
        let index = *level_seen.entry(level).or_insert(0);
        level_seen.insert(level, index + 1);

        let row_width = (count.saturating_sub(1)) as f32 * params.node_spacing;
        let x = center_x - row_width / 2.0 + index as f32 * params.node_spacing;
        let y = level as f32 * params.level_separation;
        node.position = Some(Position::new(x, y));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphLink, GraphNode, LinkType, NodeType};

    fn make_node(id: &str) -> GraphNode {
        GraphNode::new(id, format!("Node {}", id), NodeType::Note)
    }

    fn make_link(id: &str, source: &str, target: &str) -> GraphLink {
        GraphLink::new(id, source, target, LinkType::Reference)
    }

    fn graph(nodes: &[&str], links: &[(&str, &str)]) -> GraphData {
        GraphData::from_parts(
            nodes.iter().map(|id| make_node(id)).collect(),
            links
                .iter()
                .enumerate()
                .map(|(i, (s, t))| make_link(&format!("l{}", i), s, t))
                .collect(),
        )
    }

    #[test]
    fn test_unknown_algorithm_is_an_error() {
        let mut engine = LayoutEngine::with_seed(1);
        let data = graph(&["a"], &[]);
        let err = engine.apply("voronoi", &data, &LayoutParams::default());
        assert!(matches!(err, Err(NodalError::UnknownAlgorithm(_))));
    }

    #[test]
    fn test_algorithm_names_parse() {
        for algo in LayoutAlgorithm::all() {
            let parsed: LayoutAlgorithm = algo.as_str().parse().unwrap();
            assert_eq!(*algo, parsed);
        }
    }

    #[test]
    fn test_layout_does_not_mutate_input() {
        let mut engine = LayoutEngine::with_seed(7);
        let data = graph(&["a", "b"], &[("a", "b")]);
        let _ = engine.apply_algorithm(LayoutAlgorithm::Circular, &data, &LayoutParams::default());
        assert!(data.nodes.iter().all(|n| n.position.is_none()));
    }

    #[test]
    fn test_circular_equidistant_from_center() {
        let mut engine = LayoutEngine::with_seed(7);
        let params = LayoutParams::default();
        let data = graph(&["a", "b", "c", "d", "e"], &[]);
        let laid = engine.apply_algorithm(LayoutAlgorithm::Circular, &data, &params);

        let center = params.center();
        for node in &laid.nodes {
            let pos = node.position.unwrap();
            assert!((pos.distance(&center) - params.radius).abs() < 1e-3);
        }
    }

    #[test]
    fn test_circular_consecutive_angle_step() {
        let mut engine = LayoutEngine::with_seed(7);
        let params = LayoutParams::default();
        let n = 8;
        let ids: Vec<String> = (0..n).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let laid = engine.apply_algorithm(LayoutAlgorithm::Circular, &graph(&refs, &[]), &params);

        let center = params.center();
        let expected = 2.0 * std::f32::consts::PI / n as f32;
        for pair in laid.nodes.windows(2) {
            let a = pair[0].position.unwrap();
            let b = pair[1].position.unwrap();
            let angle_a = (a.y - center.y).atan2(a.x - center.x);
            let angle_b = (b.y - center.y).atan2(b.x - center.x);
            let mut step = angle_b - angle_a;
            while step < 0.0 {
                step += 2.0 * std::f32::consts::PI;
            }
            assert!((step - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_grid_row_major() {
        let mut engine = LayoutEngine::with_seed(7);
        let params = LayoutParams {
            columns: 3,
            spacing: 10.0,
            ..Default::default()
        };
        let laid = engine.apply_algorithm(
            LayoutAlgorithm::Grid,
            &graph(&["a", "b", "c", "d"], &[]),
            &params,
        );

        assert_eq!(laid.nodes[0].position.unwrap(), Position::new(0.0, 0.0));
        assert_eq!(laid.nodes[1].position.unwrap(), Position::new(10.0, 0.0));
        assert_eq!(laid.nodes[2].position.unwrap(), Position::new(20.0, 0.0));
        assert_eq!(laid.nodes[3].position.unwrap(), Position::new(0.0, 10.0));
    }

    #[test]
    fn test_hierarchical_roots_above_children() {
        let mut engine = LayoutEngine::with_seed(7);
        let params = LayoutParams::default();
        let data = graph(
            &["root", "child1", "child2", "grandchild"],
            &[
                ("root", "child1"),
                ("root", "child2"),
                ("child1", "grandchild"),
            ],
        );
        let laid = engine.apply_algorithm(LayoutAlgorithm::Hierarchical, &data, &params);

        let y = |id: &str| laid.node(id).unwrap().position.unwrap().y;
        assert!(y("root") < y("child1"));
        assert!(y("child1") < y("grandchild"));
        assert_eq!(y("child1"), y("child2"));
    }

    #[test]
    fn test_hierarchical_cycle_nodes_still_positioned() {
        let mut engine = LayoutEngine::with_seed(7);
        // a -> b -> a is a rootless cycle
        let data = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let laid =
            engine.apply_algorithm(LayoutAlgorithm::Hierarchical, &data, &LayoutParams::default());
        assert!(laid.nodes.iter().all(|n| n.position.is_some()));
    }

    #[test]
    fn test_radial_ring_assignment() {
        let mut engine = LayoutEngine::with_seed(7);
        let params = LayoutParams {
            levels: 2,
            ring_gap: 50.0,
            ..Default::default()
        };
        let laid = engine.apply_algorithm(
            LayoutAlgorithm::Radial,
            &graph(&["a", "b", "c", "d"], &[]),
            &params,
        );

        let center = params.center();
        // even indices on ring 0, odd on ring 1
        let r0 = laid.nodes[0].position.unwrap().distance(&center);
        let r1 = laid.nodes[1].position.unwrap().distance(&center);
        let r2 = laid.nodes[2].position.unwrap().distance(&center);
        assert!((r0 - 50.0).abs() < 1e-3);
        assert!((r1 - 100.0).abs() < 1e-3);
        assert!((r2 - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_graph_is_a_noop_everywhere() {
        let mut engine = LayoutEngine::with_seed(7);
        let data = GraphData::new();
        for algo in LayoutAlgorithm::all() {
            let laid = engine.apply_algorithm(*algo, &data, &LayoutParams::default());
            assert!(laid.nodes.is_empty());
        }
    }
}
