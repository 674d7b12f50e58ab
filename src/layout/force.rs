//! Force-directed layout
//!
//! Iterative physics simulation: pairwise repulsion plus spring attraction
//! along links, run for a fixed iteration count with no convergence test.
//! Above [`BARNES_HUT_THRESHOLD`] nodes the repulsion pass goes through a
//! quadtree approximation instead of the exact O(n^2) loop.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;

use super::quadtree::QuadTree;
use super::LayoutParams;
use crate::types::{GraphData, Position};

/// Node count above which repulsion switches to the quadtree
pub const BARNES_HUT_THRESHOLD: usize = 256;

/// Barnes-Hut opening angle
const THETA: f32 = 0.8;

/// Displacement cap decay per iteration
const COOLING: f32 = 0.95;

pub(super) fn execute(rng: &mut StdRng, data: &GraphData, params: &LayoutParams) -> GraphData {
    let mut result = data.clone();
    let n = result.nodes.len();
    if n == 0 {
        return result;
    }

    // Seed nodes that have never been laid out
    for node in result.nodes.iter_mut() {
        if node.position.is_none() {
            node.position = Some(Position::new(
                rng.gen_range(0.0..params.width),
                rng.gen_range(0.0..params.height),
            ));
        }
    }

    let index_of: HashMap<&str, usize> = result
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    // Links resolved to index pairs once; dangling endpoints are skipped
    let springs: Vec<(usize, usize)> = result
        .links
        .iter()
        .filter_map(|link| {
            let s = *index_of.get(link.source.as_str())?;
            let t = *index_of.get(link.target.as_str())?;
            Some((s, t))
        })
        .collect();

    let mut positions: Vec<Position> = result
        .nodes
        .iter()
        .map(|node| node.position.unwrap_or_default())
        .collect();

    let use_quadtree = n > BARNES_HUT_THRESHOLD;
    let mut temperature = params.width.min(params.height) / 10.0;

    tracing::debug!(
        nodes = n,
        springs = springs.len(),
        iterations = params.iterations,
        quadtree = use_quadtree,
        "force simulation"
    );

    for _ in 0..params.iterations {
        let mut forces = vec![(0.0f32, 0.0f32); n];

        if use_quadtree {
            let points: Vec<(f32, f32)> = positions.iter().map(|p| (p.x, p.y)).collect();
            let tree = QuadTree::build(&points);
            for (i, p) in positions.iter().enumerate() {
                let (fx, fy) = tree.repulsion(p.x, p.y, THETA, params.repulsion_strength);
                forces[i].0 += fx;
                forces[i].1 += fy;
            }
        } else {
            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = positions[i].x - positions[j].x;
                    let dy = positions[i].y - positions[j].y;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq < 1e-9 {
                        // coincident nodes have no direction to push along
                        continue;
                    }
                    let dist = dist_sq.sqrt();
                    let force = params.repulsion_strength / dist_sq;
                    let fx = (dx / dist) * force;
                    let fy = (dy / dist) * force;
                    forces[i].0 += fx;
                    forces[i].1 += fy;
                    forces[j].0 -= fx;
                    forces[j].1 -= fy;
                }
            }
        }

        // Spring attraction toward the rest length, proportional to deviation
        for &(s, t) in &springs {
            let dx = positions[t].x - positions[s].x;
            let dy = positions[t].y - positions[s].y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < 1e-9 {
                continue;
            }
            let force = params.spring_stiffness * (dist - params.link_distance);
            let fx = (dx / dist) * force;
            let fy = (dy / dist) * force;
            forces[s].0 += fx;
            forces[s].1 += fy;
            forces[t].0 -= fx;
            forces[t].1 -= fy;
        }

        // Displacements capped by the cooling temperature
        for (pos, &(fx, fy)) in positions.iter_mut().zip(&forces) {
            let mag = (fx * fx + fy * fy).sqrt();
            if mag < 1e-9 {
                continue;
            }
            let capped = mag.min(temperature);
            pos.x += (fx / mag) * capped;
            pos.y += (fy / mag) * capped;
        }

        temperature *= COOLING;
    }

    for (node, pos) in result.nodes.iter_mut().zip(positions) {
        node.position = Some(pos);
    }
    result
}
