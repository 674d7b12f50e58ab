//! Engine facade
//!
//! Wires explicit engine instances together behind the surface the host
//! calls: data mutation, layout, clustering, analytics, filtering, viewport
//! optimization, and import/export. Construct one per graph view; there are
//! no module-level singletons.

use crate::analytics::GraphAnalytics;
use crate::cluster::{ClusteringEngine, ClusteringParams};
use crate::error::{NodalError, Result};
use crate::filter::{self, GraphFilter};
use crate::layout::{LayoutEngine, LayoutParams};
use crate::render::{
    DeviceProvider, OptimizedGraphData, PerformanceMode, RenderOptimizer,
};
use crate::store::{GraphStore, LinkUpdate, NodeUpdate};
use crate::types::{GraphData, GraphLink, GraphNode, Position, Viewport};

/// One graph view: a store plus the engines that operate on it
#[derive(Debug)]
pub struct GraphEngine {
    store: GraphStore,
    layout: LayoutEngine,
    clustering: ClusteringEngine,
    optimizer: RenderOptimizer,
    layout_params: LayoutParams,
    clustering_params: ClusteringParams,
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEngine {
    /// Engine with entropy-seeded randomness and the default device profile
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: GraphStore::new(),
            layout: LayoutEngine::new(),
            clustering: ClusteringEngine::new(),
            optimizer: RenderOptimizer::new(),
            layout_params: LayoutParams::default(),
            clustering_params: ClusteringParams::default(),
        }
    }

    /// Engine with a fixed seed for reproducible layout and clustering
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            layout: LayoutEngine::with_seed(seed),
            clustering: ClusteringEngine::with_seed(seed),
            ..Self::new()
        }
    }

    /// Engine with a host-supplied device provider
    #[must_use]
    pub fn with_device_provider(provider: Box<dyn DeviceProvider>) -> Self {
        Self {
            optimizer: RenderOptimizer::with_provider(provider),
            ..Self::new()
        }
    }

    /// Override the layout tunables
    pub fn set_layout_params(&mut self, params: LayoutParams) {
        self.layout_params = params;
    }

    /// Override the clustering tunables
    pub fn set_clustering_params(&mut self, params: ClusteringParams) {
        self.clustering_params = params;
    }

    // --- data -------------------------------------------------------------

    /// Replace the current graph
    pub fn set_data(&mut self, data: GraphData) {
        self.store.set_data(data);
    }

    /// The current graph, if one is loaded
    #[must_use]
    pub fn data(&self) -> Option<&GraphData> {
        self.store.data()
    }

    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        self.store.add_node(node)
    }

    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        self.store.remove_node(id)
    }

    pub fn add_link(&mut self, link: GraphLink) -> Result<()> {
        self.store.add_link(link)
    }

    pub fn remove_link(&mut self, id: &str) -> Result<()> {
        self.store.remove_link(id)
    }

    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> Result<()> {
        self.store.update_node(id, update)
    }

    pub fn update_link(&mut self, id: &str, update: LinkUpdate) -> Result<()> {
        self.store.update_link(id, update)
    }

    // --- computation ------------------------------------------------------

    /// Run a named layout over the loaded graph and store the result
    pub fn apply_layout(&mut self, name: &str) -> Result<GraphData> {
        let data = self.store.data().cloned().ok_or(NodalError::NoGraph)?;
        let laid = self.layout.apply(name, &data, &self.layout_params)?;
        self.store.set_data(laid.clone());
        Ok(laid)
    }

    /// Run a named clustering strategy over the loaded graph and store the
    /// result
    pub fn apply_clustering(&mut self, name: &str) -> Result<GraphData> {
        let data = self.store.data().cloned().ok_or(NodalError::NoGraph)?;
        let clustered = self
            .clustering
            .apply(name, &data, &self.clustering_params)?;
        self.store.set_data(clustered.clone());
        Ok(clustered)
    }

    /// Analytics for the loaded graph, cached until the next mutation
    pub fn compute_analytics(&mut self) -> Option<&GraphAnalytics> {
        self.store.analytics()
    }

    /// Derive a filtered view of the loaded graph (None when no graph is
    /// loaded)
    #[must_use]
    pub fn filter_data(&self, filter: &GraphFilter) -> Option<GraphData> {
        self.store.data().map(|data| filter::apply(data, filter))
    }

    /// BFS-bounded subgraph around a node
    #[must_use]
    pub fn neighborhood(&self, center: &str, depth: usize) -> Option<GraphData> {
        self.store
            .data()
            .map(|data| filter::neighborhood(data, center, depth))
    }

    /// Cull and aggregate the loaded graph for one viewport
    #[must_use]
    pub fn optimize_graph(
        &self,
        viewport: &Viewport,
        mode: PerformanceMode,
    ) -> Option<OptimizedGraphData> {
        self.store
            .data()
            .map(|data| self.optimizer.optimize(&data.nodes, &data.links, viewport, mode))
    }

    /// Convert canvas geometry plus pan/zoom into the world-space viewport
    #[must_use]
    pub fn calculate_viewport(
        &self,
        canvas_width: f32,
        canvas_height: f32,
        pan: Position,
        zoom: f32,
    ) -> Viewport {
        self.optimizer
            .calculate_viewport(canvas_width, canvas_height, pan, zoom)
    }

    // --- import/export ----------------------------------------------------

    /// Export the loaded graph as JSON
    pub fn export_data(&self) -> Result<String> {
        self.store.export_json()
    }

    /// Import a JSON graph; failure leaves the loaded graph unchanged
    pub fn import_data(&mut self, text: &str) -> Result<()> {
        self.store.import_json(text)
    }

    /// Export the loaded graph as Graphviz DOT text
    pub fn export_dot(&self) -> Result<String> {
        self.store.export_dot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkType, NodeType};

    fn seeded_engine() -> GraphEngine {
        let mut engine = GraphEngine::with_seed(42);
        engine.set_data(GraphData::from_parts(
            vec![
                GraphNode::new("a", "A", NodeType::Note),
                GraphNode::new("b", "B", NodeType::Note),
                GraphNode::new("c", "C", NodeType::Tag),
            ],
            vec![
                GraphLink::new("l1", "a", "b", LinkType::Reference),
                GraphLink::new("l2", "b", "c", LinkType::Tag),
            ],
        ));
        engine
    }

    #[test]
    fn test_layout_then_clustering_pipeline() {
        let mut engine = seeded_engine();
        engine.apply_layout("force-directed").unwrap();
        let clustered = engine.apply_clustering("kmeans").unwrap();
        assert!(clustered.nodes.iter().all(|n| n.cluster.is_some()));
    }

    #[test]
    fn test_kmeans_without_layout_fails() {
        let mut engine = seeded_engine();
        assert!(engine.apply_clustering("kmeans").is_err());
    }

    #[test]
    fn test_analytics_cache_invalidated_by_mutation() {
        let mut engine = seeded_engine();
        let before = engine.compute_analytics().unwrap().stats.link_count;
        assert_eq!(before, 2);

        engine.remove_node("b").unwrap();
        let after = engine.compute_analytics().unwrap().stats.link_count;
        assert_eq!(after, 0);
    }

    #[test]
    fn test_filter_data_without_graph_is_none() {
        let engine = GraphEngine::with_seed(1);
        assert!(engine.filter_data(&GraphFilter::new()).is_none());
    }

    #[test]
    fn test_roundtrip_through_facade() {
        let mut engine = seeded_engine();
        let exported = engine.export_data().unwrap();

        let mut fresh = GraphEngine::with_seed(42);
        fresh.import_data(&exported).unwrap();
        assert_eq!(fresh.data().unwrap().nodes.len(), 3);
    }

    #[test]
    fn test_optimize_graph_uses_loaded_positions() {
        let mut engine = seeded_engine();
        engine.apply_layout("circular").unwrap();

        let viewport = engine.calculate_viewport(800.0, 600.0, Position::new(0.0, 0.0), 1.0);
        let optimized = engine
            .optimize_graph(&viewport, PerformanceMode::Auto)
            .unwrap();
        assert_eq!(optimized.nodes.len(), 3);
    }
}
