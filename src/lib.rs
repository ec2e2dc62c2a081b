//! springlayout - parallel spring-electrical force layout for graphs.
//!
//! Each frame runs two data-parallel passes over a double-buffered node store:
//!
//! - **Repulsion**: every node is pushed away from every other node
//!   (inverse-square) and pulled toward the origin (linear spring).
//! - **Attraction**: every node is pulled toward its neighbors along the
//!   sorted edge array, averaged over its edges, and the update is dropped
//!   when the pull would be too large.
//!
//! # Example
//!
//! ```
//! use springlayout::{Edge, Node, Simulation};
//!
//! let nodes = vec![
//!     Node::new(0.1, 0.0, 0.0),
//!     Node::new(-0.1, 0.0, 0.0),
//!     Node::new(0.0, 0.1, 0.0),
//! ];
//! let edges = [Edge::new(0, 1), Edge::new(1, 0)];
//!
//! let mut sim = Simulation::new(nodes, &edges)?;
//! sim.run(60)?;
//! assert!(sim.positions().iter().all(|p| p.is_finite()));
//! # Ok::<(), springlayout::LayoutError>(())
//! ```

pub mod attraction;
pub mod buffer;
pub mod config;
pub mod edge;
pub mod error;
pub mod forces;
pub mod graph_file;
pub mod node;
pub mod octree;
pub mod render;
pub mod repulsion;
pub mod simulation;

mod pass;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use config::{RepulsionMode, SimulationConfig};
pub use edge::{Edge, EdgeIndex};
pub use error::{IoError, IoResult, LayoutError, LayoutResult};
pub use node::{EdgeOffset, Node, NodeBuffers};
pub use pass::PassReport;
pub use simulation::{FrameStats, Simulation};
