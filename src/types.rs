//! Core types for Nodal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a graph node
pub type NodeId = String;

/// Unique identifier for a graph link
pub type LinkId = String;

/// 2-D world-space position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Create new position
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Node type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Note,
    Tag,
    User,
    Category,
}

impl NodeType {
    /// String representation (matches the serialized form)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Note => "note",
            NodeType::Tag => "tag",
            NodeType::User => "user",
            NodeType::Category => "category",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "note" => Ok(NodeType::Note),
            "tag" => Ok(NodeType::Tag),
            "user" => Ok(NodeType::User),
            "category" => Ok(NodeType::Category),
            _ => Err(format!("Unknown node type: {}", s)),
        }
    }
}

/// Link type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    Reference,
    Tag,
    Collaboration,
    Hierarchy,
}

impl LinkType {
    /// String representation (matches the serialized form)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Reference => "reference",
            LinkType::Tag => "tag",
            LinkType::Collaboration => "collaboration",
            LinkType::Hierarchy => "hierarchy",
        }
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" => Ok(LinkType::Reference),
            "tag" => Ok(LinkType::Tag),
            "collaboration" => Ok(LinkType::Collaboration),
            "hierarchy" => Ok(LinkType::Hierarchy),
            _ => Err(format!("Unknown link type: {}", s)),
        }
    }
}

/// Per-node metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// When the underlying item was created
    pub created_at: DateTime<Utc>,
    /// When the underlying item was last updated
    pub updated_at: DateTime<Utc>,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Number of links touching this node
    #[serde(default)]
    pub connection_count: usize,
    /// Importance score (0.0 - 1.0)
    #[serde(default = "default_importance")]
    pub importance: f32,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            connection_count: 0,
            importance: default_importance(),
        }
    }
}

fn default_importance() -> f32 {
    0.5
}

/// Per-link metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// When the link was created
    pub created_at: DateTime<Utc>,
    /// Relationship strength (0.0 - 1.0)
    #[serde(default = "default_strength")]
    pub strength: f32,
    /// Whether the link is traversable in both directions
    #[serde(default)]
    pub bidirectional: bool,
}

impl Default for LinkMetadata {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            strength: default_strength(),
            bidirectional: false,
        }
    }
}

fn default_strength() -> f32 {
    0.5
}

/// A node in the visualization graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier
    pub id: NodeId,
    /// Display label
    pub label: String,
    /// Node type
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Computed position (None until laid out)
    pub position: Option<Position>,
    /// Rendering size hint
    #[serde(default = "default_size")]
    pub size: f32,
    /// Rendering color (hex string)
    #[serde(default = "default_color")]
    pub color: String,
    /// Cluster assignment from the last clustering pass
    pub cluster: Option<String>,
    /// Node metadata
    #[serde(default)]
    pub metadata: NodeMetadata,
    /// True for synthetic aggregate nodes produced by the render optimizer
    #[serde(default)]
    pub is_cluster: bool,
    /// Ids of real nodes absorbed into this synthetic cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_nodes: Vec<NodeId>,
    /// Representative child shown when the cluster is expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<NodeId>,
}

fn default_size() -> f32 {
    10.0
}

fn default_color() -> String {
    "#97C2FC".to_string()
}

impl GraphNode {
    /// Create a node with defaults for everything but identity
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            position: None,
            size: default_size(),
            color: default_color(),
            cluster: None,
            metadata: NodeMetadata::default(),
            is_cluster: false,
            child_nodes: Vec::new(),
            representative: None,
        }
    }

    /// Number of absorbed children (0 for real nodes)
    #[must_use]
    pub fn cluster_size(&self) -> usize {
        self.child_nodes.len()
    }
}

/// A link between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    /// Unique identifier
    pub id: LinkId,
    /// Source node id
    pub source: NodeId,
    /// Target node id
    pub target: NodeId,
    /// Link type
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Link weight (>= 0, rendering hint)
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Link metadata
    #[serde(default)]
    pub metadata: LinkMetadata,
}

fn default_weight() -> f32 {
    1.0
}

impl GraphLink {
    /// Create a link with default weight and metadata
    pub fn new(
        id: impl Into<LinkId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        link_type: LinkType,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            link_type,
            weight: default_weight(),
            metadata: LinkMetadata::default(),
        }
    }
}

/// Summary metadata derived from the node/link sets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Total number of nodes
    pub node_count: usize,
    /// Total number of links
    pub link_count: usize,
    /// Number of distinct cluster labels
    pub cluster_count: usize,
    /// Graph density: 2*|links| / (|nodes| * (|nodes|-1))
    pub density: f32,
    /// Average degree: 2*|links| / |nodes|
    pub avg_degree: f32,
}

/// The node/link graph plus summary metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl GraphData {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from parts, deriving the summary metadata
    #[must_use]
    pub fn from_parts(nodes: Vec<GraphNode>, links: Vec<GraphLink>) -> Self {
        let mut data = Self {
            nodes,
            links,
            metadata: GraphMetadata::default(),
        };
        data.recompute_metadata();
        data
    }

    /// Recompute summary metadata from the current node/link sets
    pub fn recompute_metadata(&mut self) {
        let node_count = self.nodes.len();
        let link_count = self.links.len();

        let clusters: std::collections::HashSet<&str> = self
            .nodes
            .iter()
            .filter_map(|n| n.cluster.as_deref())
            .collect();

        let density = if node_count > 1 {
            (2 * link_count) as f32 / (node_count * (node_count - 1)) as f32
        } else {
            0.0
        };
        let avg_degree = if node_count > 0 {
            (2 * link_count) as f32 / node_count as f32
        } else {
            0.0
        };

        self.metadata = GraphMetadata {
            node_count,
            link_count,
            cluster_count: clusters.len(),
            density,
            avg_degree,
        };
    }

    /// Look up a node by id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a link by id
    #[must_use]
    pub fn link(&self, id: &str) -> Option<&GraphLink> {
        self.links.iter().find(|l| l.id == id)
    }
}

/// World-space viewport used for culling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// World-space x of the top-left corner
    pub x: f32,
    /// World-space y of the top-left corner
    pub y: f32,
    /// World-space width
    pub width: f32,
    /// World-space height
    pub height: f32,
    /// Zoom factor (1.0 = no zoom)
    pub zoom: f32,
}

impl Viewport {
    /// Create a viewport
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32, zoom: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            zoom,
        }
    }

    /// Whether a position falls inside the viewport expanded by `margin`
    #[must_use]
    pub fn contains(&self, pos: Position, margin: f32) -> bool {
        pos.x >= self.x - margin
            && pos.x <= self.x + self.width + margin
            && pos.y >= self.y - margin
            && pos.y <= self.y + self.height + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_node_type_roundtrip() {
        for t in [
            NodeType::Note,
            NodeType::Tag,
            NodeType::User,
            NodeType::Category,
        ] {
            let parsed: NodeType = t.as_str().parse().unwrap();
            assert_eq!(t, parsed);
        }
        assert!("widget".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_link_type_roundtrip() {
        for t in [
            LinkType::Reference,
            LinkType::Tag,
            LinkType::Collaboration,
            LinkType::Hierarchy,
        ] {
            let parsed: LinkType = t.as_str().parse().unwrap();
            assert_eq!(t, parsed);
        }
    }

    #[test]
    fn test_recompute_metadata() {
        let mut data = GraphData::from_parts(
            vec![
                GraphNode::new("a", "A", NodeType::Note),
                GraphNode::new("b", "B", NodeType::Note),
                GraphNode::new("c", "C", NodeType::Tag),
            ],
            vec![
                GraphLink::new("l1", "a", "b", LinkType::Reference),
                GraphLink::new("l2", "b", "c", LinkType::Tag),
            ],
        );
        assert_eq!(data.metadata.node_count, 3);
        assert_eq!(data.metadata.link_count, 2);
        // 2*2 / (3*2)
        assert!((data.metadata.density - 2.0 / 3.0).abs() < 1e-6);
        assert!((data.metadata.avg_degree - 4.0 / 3.0).abs() < 1e-6);

        data.nodes[0].cluster = Some("c0".to_string());
        data.nodes[1].cluster = Some("c0".to_string());
        data.recompute_metadata();
        assert_eq!(data.metadata.cluster_count, 1);
    }

    #[test]
    fn test_empty_graph_metadata_is_zero() {
        let data = GraphData::from_parts(Vec::new(), Vec::new());
        assert_eq!(data.metadata.density, 0.0);
        assert_eq!(data.metadata.avg_degree, 0.0);
    }

    #[test]
    fn test_viewport_contains_with_margin() {
        let vp = Viewport::new(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!(vp.contains(Position::new(50.0, 50.0), 0.0));
        assert!(!vp.contains(Position::new(120.0, 50.0), 0.0));
        assert!(vp.contains(Position::new(120.0, 50.0), 25.0));
    }
}
