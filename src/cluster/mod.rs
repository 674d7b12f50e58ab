//! Clustering engine
//!
//! Each strategy assigns a `cluster` label to every node and returns a new
//! graph; the input is never mutated. Names describe what actually runs:
//! connected components, k-means over positions, and weighted label
//! propagation.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{NodalError, Result};
use crate::types::{GraphData, NodeId, Position};

/// Named clustering strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusteringAlgorithm {
    /// Connected components via undirected flood fill
    #[default]
    Components,
    /// K-means over node positions
    KMeans,
    /// Weighted label propagation over link adjacency
    LabelPropagation,
}

impl ClusteringAlgorithm {
    /// String representation (the registry name)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringAlgorithm::Components => "components",
            ClusteringAlgorithm::KMeans => "kmeans",
            ClusteringAlgorithm::LabelPropagation => "label-propagation",
        }
    }

    /// All registered strategies
    #[must_use]
    pub fn all() -> &'static [ClusteringAlgorithm] {
        &[
            ClusteringAlgorithm::Components,
            ClusteringAlgorithm::KMeans,
            ClusteringAlgorithm::LabelPropagation,
        ]
    }
}

impl std::fmt::Display for ClusteringAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ClusteringAlgorithm {
    type Err = NodalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "components" => Ok(ClusteringAlgorithm::Components),
            "kmeans" | "k-means" => Ok(ClusteringAlgorithm::KMeans),
            "label-propagation" => Ok(ClusteringAlgorithm::LabelPropagation),
            _ => Err(NodalError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Tunables for the clustering strategies
#[derive(Debug, Clone)]
pub struct ClusteringParams {
    /// Centroid count for k-means
    pub k: usize,
    /// Fixed iteration count for k-means
    pub kmeans_iterations: usize,
    /// Iteration cap for label propagation
    pub max_iterations: usize,
    /// Bounding box for random centroid seeding
    pub width: f32,
    pub height: f32,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            k: 5,
            kmeans_iterations: 10,
            max_iterations: 20,
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Pure clustering computation over graph snapshots
#[derive(Debug)]
pub struct ClusteringEngine {
    rng: StdRng,
}

impl Default for ClusteringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusteringEngine {
    /// Create an engine seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create an engine with a fixed seed for reproducible centroids
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run the named strategy. Unknown names yield
    /// [`NodalError::UnknownAlgorithm`].
    pub fn apply(
        &mut self,
        name: &str,
        data: &GraphData,
        params: &ClusteringParams,
    ) -> Result<GraphData> {
        let algorithm: ClusteringAlgorithm = name.parse()?;
        self.apply_algorithm(algorithm, data, params)
    }

    /// Run a specific strategy
    pub fn apply_algorithm(
        &mut self,
        algorithm: ClusteringAlgorithm,
        data: &GraphData,
        params: &ClusteringParams,
    ) -> Result<GraphData> {
        tracing::debug!(
            algorithm = %algorithm,
            nodes = data.nodes.len(),
            "applying clustering"
        );
        match algorithm {
            ClusteringAlgorithm::Components => Ok(components(data)),
            ClusteringAlgorithm::KMeans => kmeans(&mut self.rng, data, params),
            ClusteringAlgorithm::LabelPropagation => Ok(label_propagation(data, params)),
        }
    }
}

/// Undirected adjacency over links whose endpoints both exist
fn adjacency(data: &GraphData) -> HashMap<&str, Vec<&str>> {
    let ids: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &data.nodes {
        adj.insert(node.id.as_str(), Vec::new());
    }
    for link in &data.links {
        if !ids.contains(link.source.as_str()) || !ids.contains(link.target.as_str()) {
            continue;
        }
        adj.entry(link.source.as_str())
            .or_default()
            .push(link.target.as_str());
        adj.entry(link.target.as_str())
            .or_default()
            .push(link.source.as_str());
    }
    adj
}

/// Connected-component clustering: BFS flood fill, one cluster per component
fn components(data: &GraphData) -> GraphData {
    let mut result = data.clone();
    let adj = adjacency(data);

    let mut cluster_of: HashMap<NodeId, String> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut next_cluster = 0usize;

    for node in &data.nodes {
        if visited.contains(node.id.as_str()) {
            continue;
        }
        let label = format!("cluster-{}", next_cluster);
        next_cluster += 1;

        let mut queue = VecDeque::new();
        queue.push_back(node.id.as_str());
        visited.insert(node.id.as_str());

        while let Some(id) = queue.pop_front() {
            cluster_of.insert(id.to_string(), label.clone());
            if let Some(neighbors) = adj.get(id) {
                for &neighbor in neighbors {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    for node in result.nodes.iter_mut() {
        node.cluster = cluster_of.get(&node.id).cloned();
    }
    result.recompute_metadata();
    result
}

/// K-means over node positions with fixed iterations. Fails when any node
/// lacks a position; callers run a layout first.
fn kmeans(rng: &mut StdRng, data: &GraphData, params: &ClusteringParams) -> Result<GraphData> {
    let mut result = data.clone();
    if result.nodes.is_empty() {
        return Ok(result);
    }
    if result.nodes.iter().any(|n| n.position.is_none()) {
        return Err(NodalError::MissingPositions);
    }

    let positions: Vec<Position> = result
        .nodes
        .iter()
        .map(|n| n.position.unwrap_or_default())
        .collect();
    let k = params.k.max(1).min(result.nodes.len());

    let mut centroids: Vec<Position> = (0..k)
        .map(|_| {
            Position::new(
                rng.gen_range(0.0..params.width),
                rng.gen_range(0.0..params.height),
            )
        })
        .collect();

    let mut assignment = vec![0usize; positions.len()];
    for _ in 0..params.kmeans_iterations {
        // Nearest centroid by Euclidean distance
        for (i, pos) in positions.iter().enumerate() {
            let mut best = 0usize;
            let mut best_dist = f32::MAX;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = pos.distance(centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            assignment[i] = best;
        }

        // Centroids move to the mean of their members; empty clusters keep
        // their previous centroid
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Position> = positions
                .iter()
                .zip(&assignment)
                .filter(|(_, &a)| a == c)
                .map(|(p, _)| p)
                .collect();
            if members.is_empty() {
                continue;
            }
            let sum_x: f32 = members.iter().map(|p| p.x).sum();
            let sum_y: f32 = members.iter().map(|p| p.y).sum();
            *centroid = Position::new(sum_x / members.len() as f32, sum_y / members.len() as f32);
        }
    }

    for (node, &a) in result.nodes.iter_mut().zip(&assignment) {
        node.cluster = Some(format!("cluster-{}", a));
    }
    result.recompute_metadata();
    Ok(result)
}

/// Label propagation weighted by link weight x strength; stops early once no
/// label changes
fn label_propagation(data: &GraphData, params: &ClusteringParams) -> GraphData {
    let mut result = data.clone();
    if result.nodes.is_empty() {
        return result;
    }

    let mut labels: HashMap<&str, usize> = data
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let ids: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut adj: HashMap<&str, Vec<(&str, f32)>> = HashMap::new();
    for node in &data.nodes {
        adj.insert(node.id.as_str(), Vec::new());
    }
    for link in &data.links {
        if !ids.contains(link.source.as_str()) || !ids.contains(link.target.as_str()) {
            continue;
        }
        let weight = link.weight * link.metadata.strength;
        adj.entry(link.source.as_str())
            .or_default()
            .push((link.target.as_str(), weight));
        adj.entry(link.target.as_str())
            .or_default()
            .push((link.source.as_str(), weight));
    }

    let node_ids: Vec<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
    for _ in 0..params.max_iterations {
        let mut changed = false;
        for &node_id in &node_ids {
            let Some(neighbors) = adj.get(node_id) else {
                continue;
            };
            if neighbors.is_empty() {
                continue;
            }

            let mut votes: HashMap<usize, f32> = HashMap::new();
            for &(neighbor, weight) in neighbors {
                if let Some(&label) = labels.get(neighbor) {
                    *votes.entry(label).or_insert(0.0) += weight;
                }
            }

            if let Some((&best_label, _)) = votes.iter().max_by(|a, b| a.1.total_cmp(b.1)) {
                let current = labels.get(node_id).copied().unwrap_or(0);
                if best_label != current {
                    labels.insert(node_id, best_label);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    // Renumber surviving labels densely
    let mut dense: HashMap<usize, usize> = HashMap::new();
    let mut cluster_of: HashMap<String, String> = HashMap::new();
    for &node_id in &node_ids {
        let raw = labels.get(node_id).copied().unwrap_or(0);
        let next = dense.len();
        let id = *dense.entry(raw).or_insert(next);
        cluster_of.insert(node_id.to_string(), format!("cluster-{}", id));
    }

    for node in result.nodes.iter_mut() {
        node.cluster = cluster_of.get(&node.id).cloned();
    }
    result.recompute_metadata();
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

    #[test]
    fn test_unknown_strategy_is_an_error() {
        let mut engine = ClusteringEngine::with_seed(1);
        let data = GraphData::from_parts(vec![make_node("a")], vec![]);
        let err = engine.apply("spectral", &data, &ClusteringParams::default());
        assert!(matches!(err, Err(NodalError::UnknownAlgorithm(_))));
    }

    #[test]
    fn test_components_partition() {
        // a-b linked, c isolated
        let data = GraphData::from_parts(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![make_link("l1", "a", "b")],
        );
        let mut engine = ClusteringEngine::with_seed(1);
        let clustered = engine
            .apply_algorithm(
                ClusteringAlgorithm::Components,
                &data,
                &ClusteringParams::default(),
            )
            .unwrap();

        let cluster = |id: &str| clustered.node(id).unwrap().cluster.clone().unwrap();
        assert_eq!(cluster("a"), cluster("b"));
        assert_ne!(cluster("a"), cluster("c"));
        assert_eq!(clustered.metadata.cluster_count, 2);
    }

    #[test]
    fn test_components_does_not_mutate_input() {
        let data = GraphData::from_parts(vec![make_node("a")], vec![]);
        let mut engine = ClusteringEngine::with_seed(1);
        let _ = engine
            .apply_algorithm(
                ClusteringAlgorithm::Components,
                &data,
                &ClusteringParams::default(),
            )
            .unwrap();
        assert!(data.nodes[0].cluster.is_none());
    }

    #[test]
    fn test_kmeans_requires_positions() {
        let data = GraphData::from_parts(vec![make_node("a")], vec![]);
        let mut engine = ClusteringEngine::with_seed(1);
        let err = engine.apply_algorithm(
            ClusteringAlgorithm::KMeans,
            &data,
            &ClusteringParams::default(),
        );
        assert!(matches!(err, Err(NodalError::MissingPositions)));
    }

    #[test]
    fn test_kmeans_assigns_every_node() {
        let mut nodes: Vec<GraphNode> = (0..20).map(|i| make_node(&format!("n{}", i))).collect();
        for (i, node) in nodes.iter_mut().enumerate() {
            // two spatial groups
            let base = if i < 10 { 0.0 } else { 500.0 };
            node.position = Some(Position::new(base + i as f32, base + i as f32));
        }
        let data = GraphData::from_parts(nodes, vec![]);

        let mut engine = ClusteringEngine::with_seed(42);
        let clustered = engine
            .apply_algorithm(
                ClusteringAlgorithm::KMeans,
                &data,
                &ClusteringParams {
                    k: 2,
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(clustered.nodes.iter().all(|n| n.cluster.is_some()));
    }

    #[test]
    fn test_kmeans_seeded_determinism() {
        let mut nodes: Vec<GraphNode> = (0..15).map(|i| make_node(&format!("n{}", i))).collect();
        for (i, node) in nodes.iter_mut().enumerate() {
            node.position = Some(Position::new(i as f32 * 37.0 % 400.0, i as f32 * 17.0 % 300.0));
        }
        let data = GraphData::from_parts(nodes, vec![]);
        let params = ClusteringParams {
            k: 3,
            ..Default::default()
        };

        let a = ClusteringEngine::with_seed(7)
            .apply_algorithm(ClusteringAlgorithm::KMeans, &data, &params)
            .unwrap();
        let b = ClusteringEngine::with_seed(7)
            .apply_algorithm(ClusteringAlgorithm::KMeans, &data, &params)
            .unwrap();

        let clusters = |d: &GraphData| -> Vec<Option<String>> {
            d.nodes.iter().map(|n| n.cluster.clone()).collect()
        };
        assert_eq!(clusters(&a), clusters(&b));
    }

    #[test]
    fn test_label_propagation_separates_dense_groups() {
        // Two triangles joined by nothing
        let data = GraphData::from_parts(
            vec![
                make_node("a1"),
                make_node("a2"),
                make_node("a3"),
                make_node("b1"),
                make_node("b2"),
                make_node("b3"),
            ],
            vec![
                make_link("l1", "a1", "a2"),
                make_link("l2", "a2", "a3"),
                make_link("l3", "a1", "a3"),
                make_link("l4", "b1", "b2"),
                make_link("l5", "b2", "b3"),
                make_link("l6", "b1", "b3"),
            ],
        );
        let mut engine = ClusteringEngine::with_seed(1);
        let clustered = engine
            .apply_algorithm(
                ClusteringAlgorithm::LabelPropagation,
                &data,
                &ClusteringParams::default(),
            )
            .unwrap();

        let cluster = |id: &str| clustered.node(id).unwrap().cluster.clone().unwrap();
        assert_eq!(cluster("a1"), cluster("a2"));
        assert_eq!(cluster("a2"), cluster("a3"));
        assert_eq!(cluster("b1"), cluster("b2"));
        assert_ne!(cluster("a1"), cluster("b1"));
    }

    #[test]
    fn test_empty_graph_is_a_noop() {
        let mut engine = ClusteringEngine::with_seed(1);
        for algo in ClusteringAlgorithm::all() {
            let clustered = engine
                .apply_algorithm(*algo, &GraphData::new(), &ClusteringParams::default())
                .unwrap();
            assert!(clustered.nodes.is_empty());
        }
    }
}
