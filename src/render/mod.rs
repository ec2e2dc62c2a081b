//! Render consumer for finished layouts
//!
//! Reads node positions and flags only; nothing in the simulation depends on
//! this module. Positions go through an [`OrbitCamera`] transform to pixel
//! coordinates, and each node becomes a marker whose size and color follow
//! its flag.
//!
//! ```rust,ignore
//! use springlayout::render::{MarkerStyle, OrbitCamera, markers_to_svg, project_markers};
//!
//! let camera = OrbitCamera::new(800.0 / 600.0);
//! let viewport = glam::Vec2::new(800.0, 600.0);
//! let style = MarkerStyle::default();
//! let markers = project_markers(sim.nodes(), camera.view_projection(), viewport, &style);
//! std::fs::write("layout.svg", markers_to_svg(&markers, sim.edges(), viewport))?;
//! ```

pub mod camera;
mod markers;

pub use camera::OrbitCamera;
pub use markers::{Marker, MarkerLook, MarkerStyle, markers_to_svg, project_markers};
