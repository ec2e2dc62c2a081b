//! Attraction pass: averaged Hooke springs along each node's edges
//!
//! A node with edges averages the spring force over its run instead of
//! summing it, so high-degree nodes are not dominated by attraction. If the
//! averaged force reaches the gate, the update is dropped for this frame and
//! the node keeps its pre-pass position.

use std::ops::Range;

use glam::Vec3;

use crate::config::SimulationConfig;
use crate::edge::{Edge, edge_run};
use crate::error::{LayoutError, LayoutResult};
use crate::forces::spring;
use crate::node::Node;
use crate::pass::{PassReport, for_each_node};

/// Run the attraction pass from `input` into `output`.
///
/// `edges` must be sorted by source with each node's `first_edge` pointing at
/// its run; violations fail the pass. `report.adjusted` counts nodes whose
/// update was discarded by the gate.
pub fn run(
    input: &[Node],
    edges: &[Edge],
    output: &mut [Node],
    config: &SimulationConfig,
) -> LayoutResult<PassReport> {
    for_each_node(input, output, |id, node| {
        let Some(run) = edge_run(edges, id, node.first_edge)? else {
            return Ok((*node, false));
        };
        let force = mean_spring_force(input, edges, run, node.position, config)?;
        if force.length() < config.attraction_gate {
            Ok((node.moved_to(node.position + force), false))
        } else {
            Ok((*node, true))
        }
    })
}

/// Mean spring force over the edges in `run`, all owned by the node at
/// `position`. Coincident endpoints count toward the mean but add nothing.
pub fn mean_spring_force(
    nodes: &[Node],
    edges: &[Edge],
    run: Range<usize>,
    position: Vec3,
    config: &SimulationConfig,
) -> LayoutResult<Vec3> {
    let stiffness = config.spring_constant * config.edge_attraction;
    let visited = run.len();

    let mut sum = Vec3::ZERO;
    for (i, edge) in edges[run.clone()].iter().enumerate() {
        let neighbor = nodes
            .get(edge.n1 as usize)
            .ok_or(LayoutError::NodeOutOfRange {
                edge: run.start + i,
                node: edge.n1,
                node_count: nodes.len(),
            })?;
        sum += spring(position, neighbor.position, stiffness, config.attraction_epsilon);
    }

    if visited == 0 {
        return Ok(Vec3::ZERO);
    }
    Ok(sum / visited as f32)
}
