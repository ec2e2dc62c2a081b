//! Fixed-size buffer records for upload
//!
//! These types are designed to be uploaded directly to GPU buffers or shared
//! with any host that expects the flat layout. All use f32/u32 and are
//! repr(C) for predictable layout. The adjacency pointer is 1-based here so
//! that 0 can mean "no edges"; everywhere else it is an `Option`.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::node::{EdgeOffset, Node};

/// A node in its flat buffer layout.
///
/// Layout matches the WGSL `Node` struct (vec3 fields are 16-byte aligned).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RawNode {
    /// Position in 3D space
    pub position: [f32; 3],
    /// Render flag
    pub flag: i32,
    /// Velocity in 3D space
    pub velocity: [f32; 3],
    /// Reserved
    pub density: f32,
    /// 1-based index of the node's first edge, 0 = no edges
    pub edge_start: u32,
    /// Padding for 16-byte alignment
    pub _padding: [u32; 3],
}

impl From<&Node> for RawNode {
    fn from(node: &Node) -> Self {
        Self {
            position: node.position.to_array(),
            flag: node.flag,
            velocity: node.velocity.to_array(),
            density: node.density,
            edge_start: node.first_edge.map_or(0, |offset| offset.0 + 1),
            _padding: [0; 3],
        }
    }
}

impl From<&RawNode> for Node {
    fn from(raw: &RawNode) -> Self {
        Self {
            position: Vec3::from_array(raw.position),
            velocity: Vec3::from_array(raw.velocity),
            first_edge: raw.edge_start.checked_sub(1).map(EdgeOffset),
            flag: raw.flag,
            density: raw.density,
        }
    }
}

/// Encode nodes into their flat layout
pub fn encode_nodes(nodes: &[Node]) -> Vec<RawNode> {
    nodes.iter().map(RawNode::from).collect()
}

/// Decode nodes from their flat layout
pub fn decode_nodes(raw: &[RawNode]) -> Vec<Node> {
    raw.iter().map(Node::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;

    #[test]
    fn test_raw_node_size() {
        // 3 floats (position) + flag + 3 floats (velocity) + density
        // + edge_start + 3 words padding = 12 words = 48 bytes
        assert_eq!(std::mem::size_of::<RawNode>(), 48);
    }

    #[test]
    fn test_edge_size() {
        // Two 32-bit node indices
        assert_eq!(std::mem::size_of::<Edge>(), 8);
    }

    #[test]
    fn test_zero_means_no_edges() {
        let node = Node::from(&RawNode::zeroed());
        assert_eq!(node.first_edge, None);
    }

    #[test]
    fn test_edge_start_is_one_based() {
        let node = Node::new(1.0, 2.0, 3.0).with_first_edge(Some(EdgeOffset(0)));
        let raw = RawNode::from(&node);
        assert_eq!(raw.edge_start, 1);
        assert_eq!(Node::from(&raw), node);
    }

    #[test]
    fn test_encoded_slice_casts_to_bytes() {
        let raw = encode_nodes(&[Node::default(), Node::new(1.0, 0.0, 0.0)]);
        let bytes: &[u8] = bytemuck::cast_slice(&raw);
        assert_eq!(bytes.len(), 96);
    }
}
