//! Node records and the double-buffered node store
//!
//! A node's identity is its slot in the buffer. Passes always read one buffer
//! and write the other, so the store hands them a `(&[Node], &mut [Node])`
//! pair split from two distinct allocations.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Offset of a node's first edge in the sorted edge array
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeOffset(pub u32);

impl EdgeOffset {
    /// Offset as an index into the edge slice
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-node simulation state
///
/// This is the superset of every field a pass or the renderer may use.
/// Physics only reads `position` and `first_edge`; the rest is carried along
/// so both buffers stay self-consistent after a swap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Position in 3D space
    pub position: Vec3,
    /// Velocity (carried, not read by the force laws)
    pub velocity: Vec3,
    /// First edge of this node's run in the sorted edge array
    pub first_edge: Option<EdgeOffset>,
    /// Render tag (e.g. highlighted)
    pub flag: i32,
    /// Reserved
    pub density: f32,
}

impl Node {
    /// Create a node at the given position
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self::at(Vec3::new(x, y, z))
    }

    /// Create a node at `position`
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            first_edge: None,
            flag: 0,
            density: 0.0,
        }
    }

    /// Set the render flag
    pub fn with_flag(mut self, flag: i32) -> Self {
        self.flag = flag;
        self
    }

    /// Set the first-edge offset
    pub fn with_first_edge(mut self, offset: Option<EdgeOffset>) -> Self {
        self.first_edge = offset;
        self
    }

    /// Copy of this node with a different position
    pub fn moved_to(&self, position: Vec3) -> Self {
        Self { position, ..*self }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Two explicitly owned node buffers, swapped after each pass, plus a
/// checkpoint copy for rolling back a multi-pass frame
#[derive(Debug, Clone)]
pub struct NodeBuffers {
    current: Vec<Node>,
    next: Vec<Node>,
    saved: Vec<Node>,
}

impl NodeBuffers {
    /// Create a store whose current and next buffers both hold `nodes`
    pub fn new(nodes: Vec<Node>) -> Self {
        let next = nodes.clone();
        Self {
            current: nodes,
            next,
            saved: Vec::new(),
        }
    }

    /// Number of nodes in each buffer
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Check if the store holds no nodes
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// The buffer holding the latest completed pass
    pub fn current(&self) -> &[Node] {
        &self.current
    }

    /// Mutable access to the current buffer (between frames only)
    pub fn current_mut(&mut self) -> &mut [Node] {
        &mut self.current
    }

    /// Split into the read buffer and the write buffer for one pass
    pub fn split(&mut self) -> (&[Node], &mut [Node]) {
        (&self.current, &mut self.next)
    }

    /// Make the buffer written by the last pass current
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Replace both buffers, e.g. after a topology change
    pub fn replace(&mut self, nodes: Vec<Node>) {
        self.next.clear();
        self.next.extend_from_slice(&nodes);
        self.saved.clear();
        self.current = nodes;
    }

    /// Remember the current buffer so [`NodeBuffers::rollback`] can restore it
    pub fn checkpoint(&mut self) {
        self.saved.clone_from(&self.current);
    }

    /// Restore the buffer saved by the last [`NodeBuffers::checkpoint`]
    pub fn rollback(&mut self) {
        if self.saved.len() == self.current.len() {
            self.current.clone_from(&self.saved);
        }
    }

    /// Consume the store, returning the current buffer
    pub fn into_current(self) -> Vec<Node> {
        self.current
    }
}
