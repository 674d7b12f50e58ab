//! Render optimizer
//!
//! Called on every viewport change, so it stays cheap: O(V+E) culling plus
//! greedy spatial aggregation into synthetic cluster markers. It never
//! re-runs layout physics.

mod device;

pub use device::{
    CullingThresholds, DeviceProfile, DeviceProvider, DeviceTier, GpuTier, StaticDeviceProvider,
};

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::NodalError;
use crate::types::{GraphLink, GraphNode, NodeId, NodeType, Position, Viewport};

/// Rendering quality/performance trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    Quality,
    Performance,
    #[default]
    Auto,
}

impl PerformanceMode {
    /// String representation (matches the serialized form)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMode::Quality => "quality",
            PerformanceMode::Performance => "performance",
            PerformanceMode::Auto => "auto",
        }
    }
}

impl std::str::FromStr for PerformanceMode {
    type Err = NodalError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quality" => Ok(PerformanceMode::Quality),
            "performance" => Ok(PerformanceMode::Performance),
            "auto" => Ok(PerformanceMode::Auto),
            _ => Err(NodalError::InvalidInput(format!(
                "unknown performance mode: {}",
                s
            ))),
        }
    }
}

/// How aggressively nearby nodes are aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ClusteringLevel {
    /// Radius scale for the aggregation pass
    #[must_use]
    fn radius_factor(&self) -> f32 {
        match self {
            ClusteringLevel::None => 0.0,
            ClusteringLevel::Low => 1.0,
            ClusteringLevel::Medium => 1.5,
            ClusteringLevel::High => 2.0,
        }
    }
}

/// Result of an optimization pass, ready for the drawing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedGraphData {
    /// Visible nodes, including synthetic cluster markers
    pub nodes: Vec<GraphNode>,
    /// Visible links, remapped onto cluster markers where needed
    pub links: Vec<GraphLink>,
    /// Aggregation level that was applied
    pub clustering_level: ClusteringLevel,
    /// Fraction of nodes removed by culling
    pub culling_efficiency: f32,
    /// Fraction of visible nodes absorbed into cluster markers
    pub clustering_efficiency: f32,
    /// Wall-clock time of the optimization pass in milliseconds
    pub render_time_ms: f32,
    /// Free-text tuning hints derived from threshold comparisons
    pub recommendations: Vec<String>,
}

/// Escalation thresholds for `node_count * performance_multiplier`
const CLUSTER_LOW_THRESHOLD: f32 = 50.0;
const CLUSTER_MEDIUM_THRESHOLD: f32 = 100.0;
const CLUSTER_HIGH_THRESHOLD: f32 = 200.0;

/// World-space base radius for the aggregation pass
const BASE_CLUSTER_RADIUS: f32 = 80.0;

const CLUSTER_PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Viewport culling and spatial aggregation, tuned per device
pub struct RenderOptimizer {
    provider: Box<dyn DeviceProvider>,
}

impl std::fmt::Debug for RenderOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptimizer")
            .field("profile", &self.provider.profile())
            .finish()
    }
}

impl Default for RenderOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderOptimizer {
    /// Optimizer with the default (desktop) device profile
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: Box::new(StaticDeviceProvider::default()),
        }
    }

    /// Optimizer with a host-supplied device provider
    #[must_use]
    pub fn with_provider(provider: Box<dyn DeviceProvider>) -> Self {
        Self { provider }
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
        let zoom = zoom.max(0.01);
        Viewport::new(
            -pan.x / zoom,
            -pan.y / zoom,
            canvas_width / zoom,
            canvas_height / zoom,
            zoom,
        )
    }

    /// Cull and aggregate the positioned graph for one viewport
    pub fn optimize(
        &self,
        nodes: &[GraphNode],
        links: &[GraphLink],
        viewport: &Viewport,
        mode: PerformanceMode,
    ) -> OptimizedGraphData {
        let started = Instant::now();

        let profile = self.provider.profile();
        let thresholds = CullingThresholds::for_profile(&profile);

        let level = clustering_level(nodes.len(), thresholds.performance_multiplier, mode);

        let total_nodes = nodes.len();
        let visible_nodes = cull_nodes(nodes, viewport, &thresholds);
        let after_cull = visible_nodes.len();

        let visible_links = cull_links(links, nodes, &visible_nodes, viewport, &thresholds);

        let (final_nodes, final_links) = if level == ClusteringLevel::None {
            (visible_nodes, visible_links)
        } else {
            aggregate(visible_nodes, visible_links, level, &thresholds)
        };

        let culling_efficiency = if total_nodes > 0 {
            (total_nodes - after_cull) as f32 / total_nodes as f32
        } else {
            0.0
        };
        let clustering_efficiency = if after_cull > 0 {
            (after_cull - final_nodes.len()) as f32 / after_cull as f32
        } else {
            0.0
        };

        let recommendations =
            recommendations(&profile, &thresholds, level, after_cull, final_nodes.len());

        let render_time_ms = started.elapsed().as_secs_f32() * 1000.0;
        tracing::debug!(
            total = total_nodes,
            after_cull,
            final_count = final_nodes.len(),
            level = ?level,
            render_time_ms,
            "optimize pass"
        );

        OptimizedGraphData {
            nodes: final_nodes,
            links: final_links,
            clustering_level: level,
            culling_efficiency,
            clustering_efficiency,
            render_time_ms,
            recommendations,
        }
    }
}

/// Level from effective node count against fixed thresholds, modulated by mode
fn clustering_level(node_count: usize, multiplier: f32, mode: PerformanceMode) -> ClusteringLevel {
    let effective = node_count as f32 * multiplier;
    match mode {
        PerformanceMode::Quality => {
            // quality keeps real nodes on screen until well past the high mark
            if effective > CLUSTER_HIGH_THRESHOLD * 2.0 {
                ClusteringLevel::Low
            } else {
                ClusteringLevel::None
            }
        }
        PerformanceMode::Performance => {
            if effective > CLUSTER_HIGH_THRESHOLD * 0.5 {
                ClusteringLevel::High
            } else if effective > CLUSTER_MEDIUM_THRESHOLD * 0.5 {
                ClusteringLevel::Medium
            } else if effective > CLUSTER_LOW_THRESHOLD * 0.5 {
                ClusteringLevel::Low
            } else {
                ClusteringLevel::None
            }
        }
        PerformanceMode::Auto => {
            if effective > CLUSTER_HIGH_THRESHOLD {
                ClusteringLevel::High
            } else if effective > CLUSTER_MEDIUM_THRESHOLD {
                ClusteringLevel::Medium
            } else if effective > CLUSTER_LOW_THRESHOLD {
                ClusteringLevel::Low
            } else {
                ClusteringLevel::None
            }
        }
    }
}

/// Margin-expanded viewport test with overflow-driven tightening
fn cull_nodes(
    nodes: &[GraphNode],
    viewport: &Viewport,
    thresholds: &CullingThresholds,
) -> Vec<GraphNode> {
    let margin = thresholds.margin * thresholds.zoom_sensitivity / viewport.zoom.max(0.01);

    let mut visible: Vec<GraphNode> = nodes
        .iter()
        .filter(|n| matches!(n.position, Some(p) if viewport.contains(p, margin)))
        .cloned()
        .collect();

    // Still over budget: shrink the effective bounds in proportion to the
    // overflow and re-cull
    if visible.len() > thresholds.max_visible_nodes {
        let ratio = thresholds.max_visible_nodes as f32 / visible.len() as f32;
        let tightened = shrink(viewport, ratio);
        visible.retain(|n| matches!(n.position, Some(p) if tightened.contains(p, margin * ratio)));
    }

    visible
}

/// Keep links whose endpoints survived and whose midpoint stays in bounds
fn cull_links(
    links: &[GraphLink],
    all_nodes: &[GraphNode],
    visible_nodes: &[GraphNode],
    viewport: &Viewport,
    thresholds: &CullingThresholds,
) -> Vec<GraphLink> {
    let margin = thresholds.margin * thresholds.zoom_sensitivity / viewport.zoom.max(0.01);
    let positions: HashMap<&str, Position> = all_nodes
        .iter()
        .filter_map(|n| n.position.map(|p| (n.id.as_str(), p)))
        .collect();
    let visible: HashSet<&str> = visible_nodes.iter().map(|n| n.id.as_str()).collect();

    let midpoint = |link: &GraphLink| -> Option<Position> {
        let s = positions.get(link.source.as_str())?;
        let t = positions.get(link.target.as_str())?;
        Some(Position::new((s.x + t.x) / 2.0, (s.y + t.y) / 2.0))
    };

    let mut kept: Vec<GraphLink> = links
        .iter()
        .filter(|link| {
            visible.contains(link.source.as_str()) && visible.contains(link.target.as_str())
        })
        .filter(|link| matches!(midpoint(link), Some(m) if viewport.contains(m, margin)))
        .cloned()
        .collect();

    if kept.len() > thresholds.max_visible_links {
        let ratio = thresholds.max_visible_links as f32 / kept.len() as f32;
        let tightened = shrink(viewport, ratio);
        kept.retain(|link| matches!(midpoint(link), Some(m) if tightened.contains(m, margin * ratio)));
    }

    kept
}

fn shrink(viewport: &Viewport, ratio: f32) -> Viewport {
    let new_width = viewport.width * ratio;
    let new_height = viewport.height * ratio;
    Viewport::new(
        viewport.x + (viewport.width - new_width) / 2.0,
        viewport.y + (viewport.height - new_height) / 2.0,
        new_width,
        new_height,
        viewport.zoom,
    )
}

/// Greedy radius grouping into synthetic cluster markers, with link remapping
fn aggregate(
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    level: ClusteringLevel,
    thresholds: &CullingThresholds,
) -> (Vec<GraphNode>, Vec<GraphLink>) {
    let radius = BASE_CLUSTER_RADIUS * level.radius_factor() * thresholds.performance_multiplier;

    let mut absorbed: HashMap<NodeId, NodeId> = HashMap::new();
    let mut clustered: HashSet<usize> = HashSet::new();
    let mut markers: Vec<GraphNode> = Vec::new();

    for i in 0..nodes.len() {
        if clustered.contains(&i) {
            continue;
        }
        let Some(anchor_pos) = nodes[i].position else {
            continue;
        };

        let mut group: Vec<usize> = vec![i];
        for (j, other) in nodes.iter().enumerate() {
            if j == i || clustered.contains(&j) {
                continue;
            }
            if let Some(pos) = other.position {
                if anchor_pos.distance(&pos) <= radius {
                    group.push(j);
                }
            }
        }

        // a lone anchor stays a real node and may still join a later group
        if group.len() <= 1 {
            continue;
        }

        for &j in &group {
            clustered.insert(j);
        }
        let cluster_id = format!("cluster-{}", markers.len());

        let marker = make_cluster_marker(&cluster_id, &nodes, &group, level);
        for &j in &group {
            absorbed.insert(nodes[j].id.clone(), cluster_id.clone());
        }
        markers.push(marker);
    }

    let mut result_nodes: Vec<GraphNode> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| !clustered.contains(i))
        .map(|(_, n)| n.clone())
        .collect();
    result_nodes.extend(markers);

    // Remap links onto cluster markers, drop self-loops, dedup by endpoint key
    let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut result_links: Vec<GraphLink> = Vec::new();
    let is_cluster_id = |id: &str| id.starts_with("cluster-");

    for link in links {
        let source = absorbed
            .get(&link.source)
            .cloned()
            .unwrap_or_else(|| link.source.clone());
        let target = absorbed
            .get(&link.target)
            .cloned()
            .unwrap_or_else(|| link.target.clone());
        if source == target && is_cluster_id(&source) {
            continue;
        }
        if !seen.insert((source.clone(), target.clone())) {
            continue;
        }

        let mut remapped = link;
        remapped.source = source.clone();
        remapped.target = target.clone();
        if is_cluster_id(&source) && is_cluster_id(&target) {
            remapped.metadata.strength = (remapped.metadata.strength * 1.5).min(1.0);
        }
        result_links.push(remapped);
    }

    (result_nodes, result_links)
}

fn make_cluster_marker(
    cluster_id: &str,
    nodes: &[GraphNode],
    group: &[usize],
    level: ClusteringLevel,
) -> GraphNode {
    let count = group.len();
    let sum_x: f32 = group.iter().filter_map(|&j| nodes[j].position).map(|p| p.x).sum();
    let sum_y: f32 = group.iter().filter_map(|&j| nodes[j].position).map(|p| p.y).sum();
    let centroid = Position::new(sum_x / count as f32, sum_y / count as f32);

    let largest = group
        .iter()
        .map(|&j| nodes[j].size)
        .fold(0.0f32, f32::max);

    let representative = group
        .iter()
        .max_by(|&&a, &&b| {
            nodes[a]
                .metadata
                .importance
                .total_cmp(&nodes[b].metadata.importance)
        })
        .map(|&j| nodes[j].id.clone());

    // Color keyed off the group's most frequent tag
    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for &j in group {
        for tag in &nodes[j].metadata.tags {
            *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }
    let dominant_tag = tag_counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(tag, _)| *tag)
        .unwrap_or("");
    let mut hasher = DefaultHasher::new();
    dominant_tag.hash(&mut hasher);
    let color = CLUSTER_PALETTE[(hasher.finish() as usize) % CLUSTER_PALETTE.len()].to_string();

    let mut marker = GraphNode::new(
        cluster_id,
        format!("{} items", count),
        NodeType::Category,
    );
    marker.position = Some(centroid);
    marker.size = largest * level.radius_factor().max(1.0);
    marker.color = color;
    marker.is_cluster = true;
    marker.child_nodes = group.iter().map(|&j| nodes[j].id.clone()).collect();
    marker.representative = representative;
    marker
}

fn recommendations(
    profile: &DeviceProfile,
    thresholds: &CullingThresholds,
    level: ClusteringLevel,
    after_cull: usize,
    final_count: usize,
) -> Vec<String> {
    let mut out = Vec::new();
    if final_count > thresholds.max_visible_nodes {
        out.push("increase clustering: visible node count still exceeds the device budget".to_string());
    }
    if level == ClusteringLevel::None && after_cull as f32 > CLUSTER_HIGH_THRESHOLD {
        out.push("enable clustering: viewport holds more nodes than the high threshold".to_string());
    }
    if profile.gpu == GpuTier::Low {
        out.push("low GPU capability detected: prefer performance mode".to_string());
    }
    if profile.memory_gb < 2.0 {
        out.push("low memory device: reduce graph size before rendering".to_string());
    }
    out
}
