//! Graph filtering
//!
//! Derives reduced graph views. Predicates apply in a fixed order: node types,
//! link types, connection bounds (counted against the already link-type-
//! filtered link set), tag overlap, then cluster membership. Links survive
//! only when both endpoints do.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::{GraphData, GraphLink, GraphNode, LinkType, NodeId, NodeType};

/// Filter predicates for deriving a subgraph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFilter {
    /// Keep only these node types
    pub node_types: Option<Vec<NodeType>>,
    /// Keep only these link types
    pub link_types: Option<Vec<LinkType>>,
    /// Minimum connection count (after link-type filtering)
    pub min_connections: Option<usize>,
    /// Maximum connection count (after link-type filtering)
    pub max_connections: Option<usize>,
    /// Keep nodes sharing at least one of these tags
    pub tags: Option<Vec<String>>,
    /// Keep nodes assigned to one of these clusters
    pub clusters: Option<Vec<String>>,
}

impl GraphFilter {
    /// An empty filter (keeps everything)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_types(mut self, types: Vec<NodeType>) -> Self {
        self.node_types = Some(types);
        self
    }

    pub fn with_link_types(mut self, types: Vec<LinkType>) -> Self {
        self.link_types = Some(types);
        self
    }

    pub fn with_min_connections(mut self, min: usize) -> Self {
        self.min_connections = Some(min);
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_clusters(mut self, clusters: Vec<String>) -> Self {
        self.clusters = Some(clusters);
        self
    }
}

/// Apply a filter, producing a new reduced graph
#[must_use]
pub fn apply(data: &GraphData, filter: &GraphFilter) -> GraphData {
    // Link-type filtering happens first so connection counts see it
    let typed_links: Vec<&GraphLink> = data
        .links
        .iter()
        .filter(|link| match &filter.link_types {
            Some(types) => types.contains(&link.link_type),
            None => true,
        })
        .collect();

    let mut connections: HashMap<&str, usize> = HashMap::new();
    for link in &typed_links {
        *connections.entry(link.source.as_str()).or_insert(0) += 1;
        *connections.entry(link.target.as_str()).or_insert(0) += 1;
    }

    let nodes: Vec<GraphNode> = data
        .nodes
        .iter()
        .filter(|node| {
            if let Some(types) = &filter.node_types {
                if !types.contains(&node.node_type) {
                    return false;
                }
            }

            let degree = connections.get(node.id.as_str()).copied().unwrap_or(0);
            if let Some(min) = filter.min_connections {
                if degree < min {
                    return false;
                }
            }
            if let Some(max) = filter.max_connections {
                if degree > max {
                    return false;
                }
            }

            if let Some(tags) = &filter.tags {
                if !node.metadata.tags.iter().any(|t| tags.contains(t)) {
                    return false;
                }
            }

            if let Some(clusters) = &filter.clusters {
                match &node.cluster {
                    Some(cluster) if clusters.contains(cluster) => {}
                    _ => return false,
                }
            }

            true
        })
        .cloned()
        .collect();

    let surviving: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let links: Vec<GraphLink> = typed_links
        .into_iter()
        .filter(|link| {
            surviving.contains(link.source.as_str()) && surviving.contains(link.target.as_str())
        })
        .cloned()
        .collect();

    GraphData::from_parts(nodes, links)
}

/// BFS-bounded subgraph around a center node
#[must_use]
pub fn neighborhood(data: &GraphData, center: &str, depth: usize) -> GraphData {
    let ids: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
    if !ids.contains(center) {
        return GraphData::new();
    }

    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
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

    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(center.to_string());
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    queue.push_back((center, 0));

    while let Some((id, level)) = queue.pop_front() {
        if level == depth {
            continue;
        }
        if let Some(neighbors) = adj.get(id) {
            for &neighbor in neighbors {
                if visited.insert(neighbor.to_string()) {
                    queue.push_back((neighbor, level + 1));
                }
            }
        }
    }

    let nodes: Vec<GraphNode> = data
        .nodes
        .iter()
        .filter(|n| visited.contains(&n.id))
        .cloned()
        .collect();
    let links: Vec<GraphLink> = data
        .links
        .iter()
        .filter(|l| visited.contains(&l.source) && visited.contains(&l.target))
        .cloned()
        .collect();

    GraphData::from_parts(nodes, links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_node(id: &str, node_type: NodeType, tags: &[&str]) -> GraphNode {
        let mut node = GraphNode::new(id, format!("Node {}", id), node_type);
        node.metadata.tags = tags.iter().map(|t| t.to_string()).collect();
        node
    }

    fn make_link(id: &str, source: &str, target: &str, link_type: LinkType) -> GraphLink {
        GraphLink::new(id, source, target, link_type)
    }

    fn chain() -> GraphData {
        // a - b - c
        GraphData::from_parts(
            vec![
                make_node("a", NodeType::Note, &["rust"]),
                make_node("b", NodeType::Note, &["rust", "graph"]),
                make_node("c", NodeType::Tag, &["graph"]),
            ],
            vec![
                make_link("l1", "a", "b", LinkType::Reference),
                make_link("l2", "b", "c", LinkType::Tag),
            ],
        )
    }

    #[test]
    fn test_empty_filter_is_identity_on_id_sets() {
        let data = chain();
        let filtered = apply(&data, &GraphFilter::new());

        fn node_ids(d: &GraphData) -> Vec<&str> {
            d.nodes.iter().map(|n| n.id.as_str()).collect()
        }
        fn link_ids(d: &GraphData) -> Vec<&str> {
            d.links.iter().map(|l| l.id.as_str()).collect()
        }
        assert_eq!(node_ids(&data), node_ids(&filtered));
        assert_eq!(link_ids(&data), link_ids(&filtered));
    }

    #[test]
    fn test_node_type_filter_drops_links_with_lost_endpoints() {
        let filtered = apply(&chain(), &GraphFilter::new().with_node_types(vec![NodeType::Note]));
        assert_eq!(filtered.nodes.len(), 2);
        assert_eq!(filtered.links.len(), 1);
        assert_eq!(filtered.links[0].id, "l1");
    }

    #[test]
    fn test_min_connections_uses_filtered_link_set() {
        // With only Reference links counted, b has degree 1, not 2
        let filter = GraphFilter::new()
            .with_link_types(vec![LinkType::Reference])
            .with_min_connections(2);
        let filtered = apply(&chain(), &filter);
        assert!(filtered.nodes.is_empty());
    }

    #[test]
    fn test_min_connections_keeps_middle_of_chain() {
        // a-b-c with min_connections 2: only b (degree 2) survives, and both
        // links lose an endpoint
        let filtered = apply(&chain(), &GraphFilter::new().with_min_connections(2));
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert!(filtered.links.is_empty());
    }

    #[test]
    fn test_tag_filter_any_overlap() {
        let filtered = apply(&chain(), &GraphFilter::new().with_tags(vec!["rust".to_string()]));
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_cluster_filter() {
        let mut data = chain();
        data.nodes[0].cluster = Some("c0".to_string());
        data.nodes[1].cluster = Some("c1".to_string());

        let filtered = apply(&data, &GraphFilter::new().with_clusters(vec!["c0".to_string()]));
        let ids: Vec<&str> = filtered.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_metadata_recomputed_for_view() {
        let filtered = apply(&chain(), &GraphFilter::new().with_node_types(vec![NodeType::Note]));
        assert_eq!(filtered.metadata.node_count, 2);
        assert_eq!(filtered.metadata.link_count, 1);
        assert!((filtered.metadata.avg_degree - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_neighborhood_depth_bounds() {
        // a - b - c - d
        let data = GraphData::from_parts(
            vec![
                make_node("a", NodeType::Note, &[]),
                make_node("b", NodeType::Note, &[]),
                make_node("c", NodeType::Note, &[]),
                make_node("d", NodeType::Note, &[]),
            ],
            vec![
                make_link("l1", "a", "b", LinkType::Reference),
                make_link("l2", "b", "c", LinkType::Reference),
                make_link("l3", "c", "d", LinkType::Reference),
            ],
        );

        assert_eq!(neighborhood(&data, "a", 1).nodes.len(), 2);
        assert_eq!(neighborhood(&data, "a", 2).nodes.len(), 3);
        assert_eq!(neighborhood(&data, "missing", 2).nodes.len(), 0);
    }
}
