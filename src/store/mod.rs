//! Graph data store
//!
//! Owns the single mutable graph instance. Every other component either reads
//! it or receives/returns new `GraphData` values. All mutations invalidate the
//! cached analytics, and removing a node cascades to every incident link.

use std::collections::HashMap;

use crate::analytics::{self, GraphAnalytics};
use crate::error::{NodalError, Result};
use crate::types::{
    GraphData, GraphLink, GraphNode, LinkType, NodeType, Position,
};

/// Partial update for a node; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub node_type: Option<NodeType>,
    pub position: Option<Position>,
    pub size: Option<f32>,
    pub color: Option<String>,
    pub cluster: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub importance: Option<f32>,
}

/// Partial update for a link; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct LinkUpdate {
    pub link_type: Option<LinkType>,
    pub weight: Option<f32>,
    pub strength: Option<f32>,
    pub bidirectional: Option<bool>,
}

/// Owner of the current node/link graph and its mutation primitives
#[derive(Debug, Default)]
pub struct GraphStore {
    data: Option<GraphData>,
    analytics_cache: Option<GraphAnalytics>,
}

impl GraphStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current graph. Invalidates cached analytics.
    pub fn set_data(&mut self, data: GraphData) {
        self.data = Some(data);
        self.after_mutation();
    }

    /// The current graph, if one is loaded
    #[must_use]
    pub fn data(&self) -> Option<&GraphData> {
        self.data.as_ref()
    }

    /// Add a node. Fails if a node with the same id already exists.
    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        let data = self.data.get_or_insert_with(GraphData::new);
        if data.nodes.iter().any(|n| n.id == node.id) {
            return Err(NodalError::InvalidInput(format!(
                "duplicate node id: {}",
                node.id
            )));
        }
        data.nodes.push(node);
        self.after_mutation();
        Ok(())
    }

    /// Remove a node and every link touching it
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        let data = self.data.as_mut().ok_or(NodalError::NoGraph)?;
        let before = data.nodes.len();
        data.nodes.retain(|n| n.id != id);
        if data.nodes.len() == before {
            return Err(NodalError::NodeNotFound(id.to_string()));
        }
        data.links.retain(|l| l.source != id && l.target != id);
        self.after_mutation();
        Ok(())
    }

    /// Add a link. Callers own referential integrity of the endpoints.
    pub fn add_link(&mut self, link: GraphLink) -> Result<()> {
        let data = self.data.get_or_insert_with(GraphData::new);
        if data.links.iter().any(|l| l.id == link.id) {
            return Err(NodalError::InvalidInput(format!(
                "duplicate link id: {}",
                link.id
            )));
        }
        data.links.push(link);
        self.after_mutation();
        Ok(())
    }

    /// Remove a link by id
    pub fn remove_link(&mut self, id: &str) -> Result<()> {
        let data = self.data.as_mut().ok_or(NodalError::NoGraph)?;
        let before = data.links.len();
        data.links.retain(|l| l.id != id);
        if data.links.len() == before {
            return Err(NodalError::LinkNotFound(id.to_string()));
        }
        self.after_mutation();
        Ok(())
    }

    /// Apply a partial update to a node
    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> Result<()> {
        let data = self.data.as_mut().ok_or(NodalError::NoGraph)?;
        let node = data
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| NodalError::NodeNotFound(id.to_string()))?;

        if let Some(label) = update.label {
            node.label = label;
        }
        if let Some(node_type) = update.node_type {
            node.node_type = node_type;
        }
        if let Some(position) = update.position {
            node.position = Some(position);
        }
        if let Some(size) = update.size {
            node.size = size;
        }
        if let Some(color) = update.color {
            node.color = color;
        }
        if let Some(cluster) = update.cluster {
            node.cluster = cluster;
        }
        if let Some(tags) = update.tags {
            node.metadata.tags = tags;
        }
        if let Some(importance) = update.importance {
            node.metadata.importance = importance;
        }
        node.metadata.updated_at = chrono::Utc::now();
        self.after_mutation();
        Ok(())
    }

    /// Apply a partial update to a link
    pub fn update_link(&mut self, id: &str, update: LinkUpdate) -> Result<()> {
        let data = self.data.as_mut().ok_or(NodalError::NoGraph)?;
        let link = data
            .links
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| NodalError::LinkNotFound(id.to_string()))?;

        if let Some(link_type) = update.link_type {
            link.link_type = link_type;
        }
        if let Some(weight) = update.weight {
            link.weight = weight;
        }
        if let Some(strength) = update.strength {
            link.metadata.strength = strength;
        }
        if let Some(bidirectional) = update.bidirectional {
            link.metadata.bidirectional = bidirectional;
        }
        self.after_mutation();
        Ok(())
    }

    /// Compute analytics for the loaded graph, caching the result until the
    /// next mutation
    pub fn analytics(&mut self) -> Option<&GraphAnalytics> {
        if self.analytics_cache.is_none() {
            let data = self.data.as_ref()?;
            self.analytics_cache = Some(analytics::compute(data));
        }
        self.analytics_cache.as_ref()
    }

    /// Export the current graph as a JSON document
    pub fn export_json(&self) -> Result<String> {
        let data = self.data.as_ref().ok_or(NodalError::NoGraph)?;
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Import a graph from a JSON document. Replaces the current graph
    /// atomically on success; a parse failure leaves it unchanged.
    pub fn import_json(&mut self, text: &str) -> Result<()> {
        let parsed: GraphData = serde_json::from_str(text)?;
        tracing::debug!(
            nodes = parsed.nodes.len(),
            links = parsed.links.len(),
            "imported graph"
        );
        self.set_data(parsed);
        Ok(())
    }

    /// Export the current graph as Graphviz DOT text
    pub fn export_dot(&self) -> Result<String> {
        let data = self.data.as_ref().ok_or(NodalError::NoGraph)?;

        let colors: HashMap<NodeType, &str> = [
            (NodeType::Note, "#97C2FC"),
            (NodeType::Tag, "#7BE141"),
            (NodeType::User, "#FFA807"),
            (NodeType::Category, "#6E6EFD"),
        ]
        .into_iter()
        .collect();

        let mut dot = String::from("digraph knowledge_graph {\n");
        dot.push_str("    rankdir=LR;\n");
        dot.push_str("    node [shape=box, style=rounded];\n\n");

        for node in &data.nodes {
            let color = colors.get(&node.node_type).unwrap_or(&"#CCCCCC");
            let label = node.label.replace('"', "\\\"");
            dot.push_str(&format!(
                "    \"{}\" [label=\"{}\", fillcolor=\"{}\", style=\"filled,rounded\"];\n",
                node.id, label, color
            ));
        }

        dot.push('\n');

        for link in &data.links {
            let style = match link.link_type {
                LinkType::Reference => "solid",
                LinkType::Tag => "dashed",
                LinkType::Collaboration => "bold",
                LinkType::Hierarchy => "dotted",
            };
            dot.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\", style={}, penwidth={}];\n",
                link.source,
                link.target,
                link.link_type,
                style,
                (link.weight * 2.0 + 0.5).min(3.0)
            ));
        }

        dot.push_str("}\n");
        Ok(dot)
    }

    fn after_mutation(&mut self) {
        if let Some(data) = self.data.as_mut() {
            let mut degree: HashMap<&str, usize> = HashMap::new();
            for link in &data.links {
                *degree.entry(link.source.as_str()).or_insert(0) += 1;
                *degree.entry(link.target.as_str()).or_insert(0) += 1;
            }
            let degree: HashMap<String, usize> =
                degree.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            for node in &mut data.nodes {
                node.metadata.connection_count = degree.get(&node.id).copied().unwrap_or(0);
            }
            data.recompute_metadata();
        }
        self.analytics_cache = None;
    }
}
