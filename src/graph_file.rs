//! Graph input files, position snapshots and random graph generation
//!
//! Graphs are read from JSON:
//!
//! ```json
//! { "nodes": [ { "position": [0.0, 0.1, 0.2], "flag": 1 }, {} ],
//!   "edges": [[0, 1]],
//!   "directed": false }
//! ```
//!
//! Nodes without a position are spread over a small Fibonacci sphere.
//! Undirected graphs (the default) get a reverse copy of every edge.

use std::path::Path;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::edge::{Edge, EdgeIndex};
use crate::error::IoResult;
use crate::node::Node;

/// Radius of the sphere unpositioned nodes start on
pub const INITIAL_RADIUS: f32 = 0.5;

/// A node entry in a graph file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Starting position (Fibonacci sphere if absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    /// Render flag
    #[serde(default)]
    pub flag: i32,
}

/// A graph as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<[u32; 2]>,
    /// Treat edges as one-way pulls only
    #[serde(default)]
    pub directed: bool,
}

impl GraphFile {
    /// Read a graph from a JSON file
    pub fn load(path: &Path) -> IoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the graph as pretty JSON
    pub fn save(&self, path: &Path) -> IoResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Initial node records
    pub fn nodes(&self) -> Vec<Node> {
        let total = self.nodes.len();
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let position = record
                    .position
                    .map(Vec3::from_array)
                    .unwrap_or_else(|| fibonacci_sphere(i, total, INITIAL_RADIUS));
                Node::at(position).with_flag(record.flag)
            })
            .collect()
    }

    /// Build the sorted edge index for this graph
    pub fn edge_index(&self) -> IoResult<EdgeIndex> {
        let edges = self.edges.iter().map(|[n0, n1]| Edge::new(*n0, *n1));
        let index = if self.directed {
            EdgeIndex::build(self.nodes.len(), edges)?
        } else {
            EdgeIndex::build_undirected(self.nodes.len(), edges)?
        };
        Ok(index)
    }
}

/// Point `index` of `total` on a Fibonacci sphere of the given radius
pub fn fibonacci_sphere(index: usize, total: usize, radius: f32) -> Vec3 {
    let golden_ratio = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let i = index as f32;
    let n = total.max(1) as f32;

    let theta = 2.0 * std::f32::consts::PI * i / golden_ratio;
    let phi = (1.0 - 2.0 * (i + 0.5) / n).acos();

    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
    )
}

/// Generate a random tree: each new node links to a random earlier node.
///
/// The same seed always yields the same graph.
pub fn random_tree(node_count: usize, seed: u64) -> GraphFile {
    let mut rng = StdRng::seed_from_u64(seed);

    let nodes = (0..node_count)
        .map(|_| NodeSpec {
            position: Some([
                rng.random::<f32>() - 0.5,
                rng.random::<f32>() - 0.5,
                rng.random::<f32>() - 0.5,
            ]),
            flag: 0,
        })
        .collect();

    let edges = (1..node_count)
        .map(|child| [rng.random_range(0..child) as u32, child as u32])
        .collect();

    GraphFile {
        nodes,
        edges,
        directed: false,
    }
}

/// A node in a position snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: usize,
    pub position: [f32; 3],
    pub flag: i32,
}

/// Node positions after a given frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub frame: u64,
    pub nodes: Vec<SnapshotNode>,
}

impl Snapshot {
    /// Capture the given nodes as of `frame`
    pub fn capture(frame: u64, nodes: &[Node]) -> Self {
        Self {
            frame,
            nodes: nodes
                .iter()
                .enumerate()
                .map(|(id, node)| SnapshotNode {
                    id,
                    position: node.position.to_array(),
                    flag: node.flag,
                })
                .collect(),
        }
    }

    /// Write the snapshot as pretty JSON
    pub fn save(&self, path: &Path) -> IoResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
