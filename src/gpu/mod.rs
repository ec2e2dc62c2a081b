//! GPU backend for the force passes (`gpu` feature)
//!
//! Runs the repulsion and attraction passes as WGSL compute shaders through
//! wgpu, with the same force laws and gates as the CPU passes. Node records
//! are uploaded in the [`crate::buffer::RawNode`] layout.
//!
//! # Example
//!
//! ```rust,ignore
//! use springlayout::{Edge, EdgeIndex, Node, SimulationConfig};
//! use springlayout::gpu::GpuLayout;
//!
//! let nodes = vec![Node::new(0.1, 0.0, 0.0), Node::new(-0.1, 0.0, 0.0)];
//! let index = EdgeIndex::build_undirected(2, [Edge::new(0, 1)])?;
//!
//! let mut layout = GpuLayout::new(nodes, &index, SimulationConfig::default())?;
//! layout.run(100)?;
//! let result = layout.read_nodes()?;
//! ```
//!
//! Contract violations are caught on the host before upload; the shaders
//! themselves cannot fail a frame.

mod shaders;
mod simulation;
mod types;

pub use shaders::PassShaders;
pub use simulation::GpuLayout;
pub use types::PassUniforms;
