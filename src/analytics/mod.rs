//! Graph analytics
//!
//! Degree centrality, local clustering coefficients, connected-component
//! communities, bridge detection (Tarjan low-link, not a weight heuristic),
//! isolates, hubs, and summary statistics. Results are cached by the store
//! per loaded graph.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::{GraphData, LinkId, NodeId};

/// Largest graph for which diameter/average path length are computed.
/// Above the cap both are reported as 0.
pub const PATH_METRICS_NODE_CAP: usize = 500;

/// Summary statistics for a graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total number of nodes
    pub node_count: usize,
    /// Total number of links
    pub link_count: usize,
    /// Average degree: 2*|links| / |nodes|
    pub avg_degree: f32,
    /// Density: 2*|links| / (|nodes| * (|nodes|-1))
    pub density: f32,
    /// Longest shortest path (0 when unavailable or above the node cap)
    pub diameter: usize,
    /// Mean shortest-path length over reachable pairs (0 above the node cap)
    pub avg_path_length: f32,
    /// Node counts per node type
    pub nodes_by_type: HashMap<String, usize>,
    /// Link counts per link type
    pub links_by_type: HashMap<String, usize>,
}

/// Full analytics result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphAnalytics {
    /// Degree per node (incident links, both directions summed)
    pub centrality: HashMap<NodeId, usize>,
    /// Local clustering coefficient per node
    pub clustering_coefficients: HashMap<NodeId, f32>,
    /// Connected components under link adjacency
    pub communities: Vec<Vec<NodeId>>,
    /// Links whose removal disconnects the graph
    pub bridges: Vec<LinkId>,
    /// Nodes with zero incident links
    pub isolates: Vec<NodeId>,
    /// Nodes whose degree exceeds twice the mean degree
    pub hubs: Vec<NodeId>,
    /// Most connected nodes (top 10 by degree)
    pub top_hubs: Vec<(NodeId, usize)>,
    /// Summary statistics
    pub stats: GraphStats,
}

struct Adjacency {
    /// Per node: (neighbor index, link index) pairs
    lists: Vec<Vec<(usize, usize)>>,
    index_of: HashMap<NodeId, usize>,
}

fn build_adjacency(data: &GraphData) -> Adjacency {
    let index_of: HashMap<NodeId, usize> = data
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), i))
        .collect();

    let mut lists = vec![Vec::new(); data.nodes.len()];
    for (link_idx, link) in data.links.iter().enumerate() {
        let (Some(&s), Some(&t)) = (index_of.get(&link.source), index_of.get(&link.target)) else {
            continue;
        };
        lists[s].push((t, link_idx));
        lists[t].push((s, link_idx));
    }
    Adjacency { lists, index_of }
}

/// Compute analytics for a graph snapshot
#[must_use]
pub fn compute(data: &GraphData) -> GraphAnalytics {
    let adj = build_adjacency(data);
    let n = data.nodes.len();

    // Degree centrality: both directions of every incident link
    let mut centrality: HashMap<NodeId, usize> = HashMap::with_capacity(n);
    for (i, node) in data.nodes.iter().enumerate() {
        centrality.insert(node.id.clone(), adj.lists[i].len());
    }

    let clustering_coefficients = clustering_coefficients(data, &adj);
    let communities = communities(data, &adj);
    let bridges = bridges(data, &adj);

    let isolates: Vec<NodeId> = data
        .nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| adj.lists[*i].is_empty())
        .map(|(_, node)| node.id.clone())
        .collect();

    let mean_degree = if n > 0 {
        centrality.values().sum::<usize>() as f32 / n as f32
    } else {
        0.0
    };
    let hubs: Vec<NodeId> = data
        .nodes
        .iter()
        .filter(|node| centrality.get(&node.id).copied().unwrap_or(0) as f32 > 2.0 * mean_degree)
        .map(|node| node.id.clone())
        .collect();

    let mut degree_list: Vec<(NodeId, usize)> = centrality
        .iter()
        .map(|(id, &d)| (id.clone(), d))
        .collect();
    degree_list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_hubs: Vec<(NodeId, usize)> = degree_list.into_iter().take(10).collect();

    let mut nodes_by_type: HashMap<String, usize> = HashMap::new();
    for node in &data.nodes {
        *nodes_by_type
            .entry(node.node_type.as_str().to_string())
            .or_insert(0) += 1;
    }
    let mut links_by_type: HashMap<String, usize> = HashMap::new();
    for link in &data.links {
        *links_by_type
            .entry(link.link_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    let link_count = data.links.len();
    let avg_degree = if n > 0 {
        (2 * link_count) as f32 / n as f32
    } else {
        0.0
    };
    let density = if n > 1 {
        (2 * link_count) as f32 / (n * (n - 1)) as f32
    } else {
        0.0
    };

    let (diameter, avg_path_length) = if n > 0 && n <= PATH_METRICS_NODE_CAP {
        path_metrics(&adj)
    } else {
        (0, 0.0)
    };

    tracing::debug!(
        nodes = n,
        links = link_count,
        communities = communities.len(),
        bridges = bridges.len(),
        "analytics computed"
    );

    GraphAnalytics {
        centrality,
        clustering_coefficients,
        communities,
        bridges,
        isolates,
        hubs,
        top_hubs,
        stats: GraphStats {
            node_count: n,
            link_count,
            avg_degree,
            density,
            diameter,
            avg_path_length,
            nodes_by_type,
            links_by_type,
        },
    }
}

/// Triangles among each node's neighbors over possible triangles
fn clustering_coefficients(data: &GraphData, adj: &Adjacency) -> HashMap<NodeId, f32> {
    let neighbor_sets: Vec<HashSet<usize>> = adj
        .lists
        .iter()
        .enumerate()
        .map(|(i, list)| list.iter().map(|&(v, _)| v).filter(|&v| v != i).collect())
        .collect();

    let mut result = HashMap::with_capacity(data.nodes.len());
    for (i, node) in data.nodes.iter().enumerate() {
        let neighbors: Vec<usize> = neighbor_sets[i].iter().copied().collect();
        let k = neighbors.len();
        if k < 2 {
            result.insert(node.id.clone(), 0.0);
            continue;
        }
        let mut triangles = 0usize;
        for a in 0..k {
            for b in (a + 1)..k {
                if neighbor_sets[neighbors[a]].contains(&neighbors[b]) {
                    triangles += 1;
                }
            }
        }
        let possible = k * (k - 1) / 2;
        result.insert(node.id.clone(), triangles as f32 / possible as f32);
    }
    result
}

/// Connected components via BFS over the undirected adjacency
fn communities(data: &GraphData, adj: &Adjacency) -> Vec<Vec<NodeId>> {
    let n = data.nodes.len();
    let mut visited = vec![false; n];
    let mut components = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(u) = queue.pop_front() {
            component.push(data.nodes[u].id.clone());
            for &(v, _) in &adj.lists[u] {
                if !visited[v] {
                    visited[v] = true;
                    queue.push_back(v);
                }
            }
        }
        components.push(component);
    }
    components
}

/// Tarjan bridge finding: iterative DFS with discovery/low-link times.
/// Parallel links between the same pair are never bridges; the traversal
/// skips only the specific link it arrived through.
fn bridges(data: &GraphData, adj: &Adjacency) -> Vec<LinkId> {
    let n = data.nodes.len();
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut timer = 0usize;
    let mut result = Vec::new();

    for start in 0..n {
        if disc[start] != usize::MAX {
            continue;
        }
        disc[start] = timer;
        low[start] = timer;
        timer += 1;

        // (node, link index used to enter it, next child cursor)
        let mut stack: Vec<(usize, usize, usize)> = vec![(start, usize::MAX, 0)];
        while let Some(&mut (u, parent_link, ref mut cursor)) = stack.last_mut() {
            if *cursor < adj.lists[u].len() {
                let (v, link_idx) = adj.lists[u][*cursor];
                *cursor += 1;
                if link_idx == parent_link {
                    continue;
                }
                if disc[v] == usize::MAX {
                    disc[v] = timer;
                    low[v] = timer;
                    timer += 1;
                    stack.push((v, link_idx, 0));
                } else {
                    low[u] = low[u].min(disc[v]);
                }
            } else {
                stack.pop();
                if let Some(&mut (p, _, _)) = stack.last_mut() {
                    low[p] = low[p].min(low[u]);
                    if low[u] > disc[p] {
                        result.push(data.links[parent_link].id.clone());
                    }
                }
            }
        }
    }
    result
}

/// Diameter and average shortest-path length by BFS from every node,
/// over reachable pairs only
fn path_metrics(adj: &Adjacency) -> (usize, f32) {
    let n = adj.lists.len();
    let mut diameter = 0usize;
    let mut total = 0u64;
    let mut pairs = 0u64;

    let mut dist = vec![usize::MAX; n];
    for start in 0..n {
        dist.iter_mut().for_each(|d| *d = usize::MAX);
        dist[start] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(u) = queue.pop_front() {
            for &(v, _) in &adj.lists[u] {
                if dist[v] == usize::MAX {
                    dist[v] = dist[u] + 1;
                    queue.push_back(v);
                }
            }
        }
        for (v, &d) in dist.iter().enumerate() {
            if v != start && d != usize::MAX {
                diameter = diameter.max(d);
                total += d as u64;
                pairs += 1;
            }
        }
    }

    let avg = if pairs > 0 {
        total as f32 / pairs as f32
    } else {
        0.0
    };
    (diameter, avg)
}
