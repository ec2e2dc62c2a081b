//! Error types for the layout core and its file surface
//!
//! Contract violations abort the current frame. Numerical degeneracy never
//! shows up here: near-coincident nodes are gated locally by the force laws.

use thiserror::Error;

/// Input-contract violations detected by the passes or the edge index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The input and output node buffers differ in length
    #[error("node buffer length mismatch: input has {input} nodes, output has {output}")]
    BufferLengthMismatch { input: usize, output: usize },

    /// A node's first-edge offset points past the end of the edge array
    #[error("node {node} has first edge {offset}, but the edge array holds {edge_count} edges")]
    EdgeOffsetOutOfRange {
        node: usize,
        offset: usize,
        edge_count: usize,
    },

    /// A node's first-edge offset lands on an edge owned by another node
    #[error("node {node} has first edge {offset}, which starts at node {found} instead")]
    EdgeRunMismatch {
        node: usize,
        offset: usize,
        found: u32,
    },

    /// A node's adjacency pointer disagrees with the edge array
    #[error("node {node} points at first edge {found:?}, but its run starts at {expected:?}")]
    AdjacencyMismatch {
        node: usize,
        expected: Option<usize>,
        found: Option<usize>,
    },

    /// An edge names a node outside the node buffer
    #[error("edge {edge} references node {node}, but only {node_count} nodes exist")]
    NodeOutOfRange {
        edge: usize,
        node: u32,
        node_count: usize,
    },

    /// The edge array is not sorted by source node
    #[error("edge array is not sorted by source: edge {edge} starts at {found} after {previous}")]
    UnsortedEdges {
        edge: usize,
        previous: u32,
        found: u32,
    },

    /// A simulation parameter is outside its valid range
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The GPU backend could not acquire a device or read back results
    #[error("GPU error: {0}")]
    Gpu(String),
}

/// Result type for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors from reading graphs, configs and writing snapshots
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// The file parsed but describes an invalid graph
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl From<serde_json::Error> for IoError {
    fn from(err: serde_json::Error) -> Self {
        IoError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for IoError {
    fn from(err: serde_yaml::Error) -> Self {
        IoError::Parse(err.to_string())
    }
}

/// Result type for file operations
pub type IoResult<T> = Result<T, IoError>;
