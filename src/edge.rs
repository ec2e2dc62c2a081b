//! Sorted edge array and per-node first-edge index (CSR-like adjacency)
//!
//! The attraction pass walks each node's contiguous run of outgoing edges.
//! That only works when the edge array is sorted by source and every node's
//! `first_edge` points at the start of its own run, so this module builds the
//! index, validates it eagerly, and bounds-checks every run it hands out.

use std::fmt;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::node::{EdgeOffset, Node};

/// A directed edge between two node indices.
///
/// Layout matches the WGSL `Edge` struct for direct buffer upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Edge {
    /// Source node (the node whose run this edge belongs to)
    pub n0: u32,
    /// Target node
    pub n1: u32,
}

impl Edge {
    /// Create a new edge from `n0` to `n1`
    pub fn new(n0: u32, n1: u32) -> Self {
        Self { n0, n1 }
    }

    /// The same edge pointing the other way
    pub fn reversed(self) -> Self {
        Self {
            n0: self.n1,
            n1: self.n0,
        }
    }
}

/// Edge array sorted by source, plus each node's first-edge offset
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeIndex {
    edges: Vec<Edge>,
    first_edges: Vec<Option<EdgeOffset>>,
}

impl EdgeIndex {
    /// Build an index for `node_count` nodes from an arbitrary edge list.
    ///
    /// Edges are stably sorted by source, so edges sharing a source keep
    /// their input order.
    pub fn build(node_count: usize, edges: impl IntoIterator<Item = Edge>) -> LayoutResult<Self> {
        let mut edges: Vec<Edge> = edges.into_iter().collect();
        check_endpoints(&edges, node_count)?;

        edges.sort_by_key(|edge| edge.n0);

        let mut first_edges = vec![None; node_count];
        for (i, edge) in edges.iter().enumerate().rev() {
            first_edges[edge.n0 as usize] = Some(EdgeOffset(i as u32));
        }

        Ok(Self { edges, first_edges })
    }

    /// Build an index that also contains the reverse of every edge, so both
    /// endpoints of each edge are pulled together
    pub fn build_undirected(
        node_count: usize,
        edges: impl IntoIterator<Item = Edge>,
    ) -> LayoutResult<Self> {
        let forward: Vec<Edge> = edges.into_iter().collect();
        let reverse: Vec<Edge> = forward.iter().map(|edge| edge.reversed()).collect();
        Self::build(node_count, forward.into_iter().chain(reverse))
    }

    /// Number of nodes the index was built for
    pub fn node_count(&self) -> usize {
        self.first_edges.len()
    }

    /// Number of edges in the sorted array
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The sorted edge array
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// First-edge offset for `node`, if it has any edges
    pub fn first_edge(&self, node: usize) -> Option<EdgeOffset> {
        self.first_edges.get(node).copied().flatten()
    }

    /// Range of edge positions owned by `node`
    pub fn run(&self, node: usize) -> LayoutResult<Option<Range<usize>>> {
        edge_run(&self.edges, node, self.first_edge(node))
    }

    /// Write each node's first-edge offset into its record
    pub fn install(&self, nodes: &mut [Node]) -> LayoutResult<()> {
        if nodes.len() != self.first_edges.len() {
            return Err(LayoutError::BufferLengthMismatch {
                input: self.first_edges.len(),
                output: nodes.len(),
            });
        }
        for (node, first_edge) in nodes.iter_mut().zip(&self.first_edges) {
            node.first_edge = *first_edge;
        }
        Ok(())
    }

    /// Consume the index, returning the sorted edge array
    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }
}

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in 0..self.node_count() {
            if node > 0 {
                writeln!(f)?;
            }
            match self.run(node).map_err(|_| fmt::Error)? {
                None => write!(f, "node {node}: none")?,
                Some(range) => {
                    let targets: Vec<u32> =
                        self.edges[range.clone()].iter().map(|e| e.n1).collect();
                    write!(f, "node {node}: edges {range:?} -> {targets:?}")?;
                }
            }
        }
        Ok(())
    }
}

/// Locate the run of edges owned by `node`.
///
/// Starts at `first_edge` and extends while the source stays `node`. An offset
/// past the end of the array, or one landing on another node's edge, is a
/// contract violation rather than an empty run.
pub fn edge_run(
    edges: &[Edge],
    node: usize,
    first_edge: Option<EdgeOffset>,
) -> LayoutResult<Option<Range<usize>>> {
    let Some(offset) = first_edge else {
        return Ok(None);
    };
    let start = offset.index();
    let first = edges.get(start).ok_or(LayoutError::EdgeOffsetOutOfRange {
        node,
        offset: start,
        edge_count: edges.len(),
    })?;
    if first.n0 as usize != node {
        return Err(LayoutError::EdgeRunMismatch {
            node,
            offset: start,
            found: first.n0,
        });
    }

    let len = edges[start..]
        .iter()
        .take_while(|edge| edge.n0 as usize == node)
        .count();
    Ok(Some(start..start + len))
}

/// Check that `edges` is sorted by source, that every endpoint names a node,
/// and that each node's `first_edge` points at the start of its own run.
pub fn validate_adjacency(nodes: &[Node], edges: &[Edge]) -> LayoutResult<()> {
    check_endpoints(edges, nodes.len())?;

    for (i, pair) in edges.windows(2).enumerate() {
        if pair[1].n0 < pair[0].n0 {
            return Err(LayoutError::UnsortedEdges {
                edge: i + 1,
                previous: pair[0].n0,
                found: pair[1].n0,
            });
        }
    }

    let mut expected = vec![None; nodes.len()];
    for (i, edge) in edges.iter().enumerate().rev() {
        expected[edge.n0 as usize] = Some(i);
    }

    for (id, (node, expected)) in nodes.iter().zip(expected).enumerate() {
        let found = node.first_edge.map(EdgeOffset::index);
        if found != expected {
            return Err(LayoutError::AdjacencyMismatch {
                node: id,
                expected,
                found,
            });
        }
    }
    Ok(())
}

fn check_endpoints(edges: &[Edge], node_count: usize) -> LayoutResult<()> {
    for (i, edge) in edges.iter().enumerate() {
        for node in [edge.n0, edge.n1] {
            if node as usize >= node_count {
                return Err(LayoutError::NodeOutOfRange {
                    edge: i,
                    node,
                    node_count,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_node_index() -> EdgeIndex {
        EdgeIndex::build(5, [Edge::new(0, 1), Edge::new(0, 2), Edge::new(1, 3)]).unwrap()
    }

    #[test]
    fn runs_cover_exactly_each_nodes_edges() {
        let index = five_node_index();

        assert_eq!(index.run(0).unwrap(), Some(0..2));
        assert_eq!(index.run(1).unwrap(), Some(2..3));
        for node in 2..5 {
            assert_eq!(index.run(node).unwrap(), None);
        }
    }

    #[test]
    fn build_sorts_stably_by_source() {
        let index = EdgeIndex::build(
            4,
            [
                Edge::new(2, 0),
                Edge::new(0, 3),
                Edge::new(2, 1),
                Edge::new(0, 1),
            ],
        )
        .unwrap();

        assert_eq!(
            index.edges(),
            &[
                Edge::new(0, 3),
                Edge::new(0, 1),
                Edge::new(2, 0),
                Edge::new(2, 1),
            ]
        );
        assert_eq!(index.first_edge(0), Some(EdgeOffset(0)));
        assert_eq!(index.first_edge(1), None);
        assert_eq!(index.first_edge(2), Some(EdgeOffset(2)));
    }

    #[test]
    fn undirected_build_adds_reverse_edges() {
        let index = EdgeIndex::build_undirected(3, [Edge::new(0, 1), Edge::new(1, 2)]).unwrap();

        assert_eq!(index.edge_count(), 4);
        assert_eq!(index.run(1).unwrap(), Some(1..3));
        assert_eq!(index.run(2).unwrap(), Some(3..4));
    }

    #[test]
    fn build_rejects_unknown_nodes() {
        let err = EdgeIndex::build(2, [Edge::new(0, 5)]).unwrap_err();
        assert_eq!(
            err,
            LayoutError::NodeOutOfRange {
                edge: 0,
                node: 5,
                node_count: 2
            }
        );
    }

    #[test]
    fn offset_past_the_end_fails_fast() {
        let edges = [Edge::new(0, 1)];
        let err = edge_run(&edges, 0, Some(EdgeOffset(4))).unwrap_err();
        assert!(matches!(err, LayoutError::EdgeOffsetOutOfRange { offset: 4, .. }));
    }

    #[test]
    fn offset_into_another_run_fails_fast() {
        let edges = [Edge::new(0, 1), Edge::new(1, 0)];
        let err = edge_run(&edges, 0, Some(EdgeOffset(1))).unwrap_err();
        assert_eq!(
            err,
            LayoutError::EdgeRunMismatch {
                node: 0,
                offset: 1,
                found: 1
            }
        );
    }

    #[test]
    fn validation_accepts_installed_index() {
        let index = five_node_index();
        let mut nodes = vec![Node::default(); 5];
        index.install(&mut nodes).unwrap();

        assert!(validate_adjacency(&nodes, index.edges()).is_ok());
    }

    #[test]
    fn validation_rejects_unsorted_edges() {
        let nodes = vec![Node::default(); 3];
        let edges = [Edge::new(1, 0), Edge::new(0, 2)];

        let err = validate_adjacency(&nodes, &edges).unwrap_err();
        assert!(matches!(err, LayoutError::UnsortedEdges { edge: 1, .. }));
    }

    #[test]
    fn validation_rejects_pointer_into_middle_of_run() {
        let index = five_node_index();
        let mut nodes = vec![Node::default(); 5];
        index.install(&mut nodes).unwrap();
        nodes[0].first_edge = Some(EdgeOffset(1));

        let err = validate_adjacency(&nodes, index.edges()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::AdjacencyMismatch {
                node: 0,
                expected: Some(0),
                found: Some(1)
            }
        );
    }

    #[test]
    fn install_rejects_wrong_node_count() {
        let index = five_node_index();
        let mut nodes = vec![Node::default(); 3];
        assert!(matches!(
            index.install(&mut nodes),
            Err(LayoutError::BufferLengthMismatch { .. })
        ));
    }

    #[test]
    fn adjacency_summary() {
        insta::assert_snapshot!(five_node_index().to_string(), @r"
        node 0: edges 0..2 -> [1, 2]
        node 1: edges 2..3 -> [3]
        node 2: none
        node 3: none
        node 4: none
        ");
    }
}
