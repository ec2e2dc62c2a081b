//! Uniform block for the GPU passes

use bytemuck::{Pod, Zeroable};

use crate::config::SimulationConfig;

/// Pass parameters passed to the GPU as uniforms
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PassUniforms {
    pub node_count: u32,
    pub edge_count: u32,
    pub repulsion: f32,
    pub edge_attraction: f32,
    pub repulsion_scale: f32,
    pub center_strength: f32,
    pub spring_constant: f32,
    pub repulsion_epsilon: f32,
    pub attraction_epsilon: f32,
    pub attraction_gate: f32,
    /// Stability bound; 0 disables the clamp
    pub stability_bound: f32,
    /// Padding for 16-byte alignment
    pub _padding: f32,
}

impl PassUniforms {
    /// Uniforms for a graph of the given size under `config`
    pub fn new(config: &SimulationConfig, node_count: u32, edge_count: u32) -> Self {
        Self {
            node_count,
            edge_count,
            repulsion: config.repulsion,
            edge_attraction: config.edge_attraction,
            repulsion_scale: config.repulsion_scale,
            center_strength: config.center_strength,
            spring_constant: config.spring_constant,
            repulsion_epsilon: config.repulsion_epsilon,
            attraction_epsilon: config.attraction_epsilon,
            attraction_gate: config.attraction_gate,
            stability_bound: config.stability_bound.unwrap_or(0.0),
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_size() {
        let size = std::mem::size_of::<PassUniforms>();
        assert_eq!(size % 16, 0, "Uniforms size {} is not 16-byte aligned", size);
    }

    #[test]
    fn test_disabled_bound_encodes_as_zero() {
        let config = SimulationConfig::default().with_stability_bound(None);
        assert_eq!(PassUniforms::new(&config, 1, 0).stability_bound, 0.0);
    }
}
