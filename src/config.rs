//! Simulation parameters
//!
//! Every coefficient the passes read lives in [`SimulationConfig`]. Config
//! files may be YAML or JSON; missing keys fall back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoError, IoResult, LayoutError, LayoutResult};

// =============================================================================
// Default Constants
// =============================================================================

/// Default repulsion coefficient `k` (force scales with `k²`)
pub const DEFAULT_REPULSION: f32 = 0.2;

/// Default edge attraction coefficient
pub const DEFAULT_EDGE_ATTRACTION: f32 = 0.2;

/// Empirical scale applied to inverse-square repulsion
pub const DEFAULT_REPULSION_SCALE: f32 = 0.1;

/// Linear pull toward the origin, per unit of distance
pub const DEFAULT_CENTER_STRENGTH: f32 = 0.0125;

/// Hooke spring constant for edge attraction
pub const DEFAULT_SPRING_CONSTANT: f32 = 0.1;

/// Squared distance below which a node pair exerts no repulsion
pub const DEFAULT_REPULSION_EPSILON: f32 = 1e-4;

/// Distance below which an edge exerts no attraction
pub const DEFAULT_ATTRACTION_EPSILON: f32 = 1e-3;

/// Attraction updates with a force magnitude at or above this are dropped
pub const DEFAULT_ATTRACTION_GATE: f32 = 1.0;

/// Positions beyond this magnitude are pulled back onto the unit sphere
pub const DEFAULT_STABILITY_BOUND: f32 = 10.0;

/// Largest per-frame displacement still considered "at rest"
pub const DEFAULT_REST_DISPLACEMENT: f32 = 1e-4;

/// Default Barnes-Hut opening threshold (0 = exact, larger = coarser)
pub const DEFAULT_THETA: f32 = 0.9;

/// How the repulsion pass sums node-node forces
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RepulsionMode {
    /// Every node against every other node, O(N²)
    #[default]
    Exact,
    /// Octree approximation: a cell whose width over distance is at most
    /// `theta` acts as a single mass at its center of mass
    BarnesHut { theta: f32 },
}

impl RepulsionMode {
    /// Barnes-Hut with [`DEFAULT_THETA`]
    pub fn barnes_hut() -> Self {
        Self::BarnesHut {
            theta: DEFAULT_THETA,
        }
    }
}

/// Parameters shared by the repulsion and attraction passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Repulsion coefficient
    pub repulsion: f32,
    /// Exact or Barnes-Hut summation for the repulsion pass
    pub repulsion_mode: RepulsionMode,
    /// Edge attraction coefficient
    pub edge_attraction: f32,
    /// Empirical scale on the inverse-square repulsion law
    pub repulsion_scale: f32,
    /// Centering spring strength
    pub center_strength: f32,
    /// Edge spring constant
    pub spring_constant: f32,
    /// Squared-distance guard for repulsion
    pub repulsion_epsilon: f32,
    /// Distance guard for attraction
    pub attraction_epsilon: f32,
    /// Attraction force magnitude at which the update is discarded
    pub attraction_gate: f32,
    /// Anti-blowup bound for repulsion output, at least 1 (`None` disables
    /// the clamp)
    pub stability_bound: Option<f32>,
    /// Displacement threshold for [`crate::Simulation::run_to_rest`]
    pub rest_displacement: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repulsion: DEFAULT_REPULSION,
            repulsion_mode: RepulsionMode::Exact,
            edge_attraction: DEFAULT_EDGE_ATTRACTION,
            repulsion_scale: DEFAULT_REPULSION_SCALE,
            center_strength: DEFAULT_CENTER_STRENGTH,
            spring_constant: DEFAULT_SPRING_CONSTANT,
            repulsion_epsilon: DEFAULT_REPULSION_EPSILON,
            attraction_epsilon: DEFAULT_ATTRACTION_EPSILON,
            attraction_gate: DEFAULT_ATTRACTION_GATE,
            stability_bound: Some(DEFAULT_STABILITY_BOUND),
            rest_displacement: DEFAULT_REST_DISPLACEMENT,
        }
    }
}

impl SimulationConfig {
    /// Set the repulsion coefficient
    pub fn with_repulsion(mut self, repulsion: f32) -> Self {
        self.repulsion = repulsion;
        self
    }

    /// Set the repulsion summation mode
    pub fn with_repulsion_mode(mut self, mode: RepulsionMode) -> Self {
        self.repulsion_mode = mode;
        self
    }

    /// Set the edge attraction coefficient
    pub fn with_edge_attraction(mut self, edge_attraction: f32) -> Self {
        self.edge_attraction = edge_attraction;
        self
    }

    /// Set the centering strength
    pub fn with_center_strength(mut self, center_strength: f32) -> Self {
        self.center_strength = center_strength;
        self
    }

    /// Set or disable the stability bound
    pub fn with_stability_bound(mut self, bound: Option<f32>) -> Self {
        self.stability_bound = bound;
        self
    }

    /// Load a config from a `.yaml`/`.yml` or `.json` file
    pub fn load(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| IoError::UnsupportedFormat(path.display().to_string()))?;
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, ext)
    }

    /// Parse a config from text, picking the format by extension
    pub fn parse(text: &str, ext: &str) -> IoResult<Self> {
        let config: Self = match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_str(text)?,
            "json" => serde_json::from_str(text)?,
            other => return Err(IoError::UnsupportedFormat(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the parameters the passes cannot guard locally.
    ///
    /// A stability bound below 1 would push clamped nodes outward onto the
    /// unit sphere, so it is rejected along with non-finite values.
    pub fn validate(&self) -> LayoutResult<()> {
        if let Some(bound) = self.stability_bound {
            if !bound.is_finite() || bound < 1.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "stability_bound must be a finite value of at least 1, got {bound}"
                )));
            }
        }
        if let RepulsionMode::BarnesHut { theta } = self.repulsion_mode {
            if !theta.is_finite() || theta < 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "theta must be finite and non-negative, got {theta}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_strength_defaults_to_reference_range() {
        let config = SimulationConfig::default();
        assert!((0.011..=0.014).contains(&config.center_strength));
        assert_eq!(config.stability_bound, Some(10.0));
        assert_eq!(config.attraction_gate, 1.0);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = SimulationConfig::parse("repulsion: 1.5\nstability_bound: null\n", "yaml")
            .expect("valid yaml");
        assert_eq!(config.repulsion, 1.5);
        assert_eq!(config.stability_bound, None);
        assert_eq!(config.edge_attraction, DEFAULT_EDGE_ATTRACTION);
    }

    #[test]
    fn json_config_parses() {
        let config = SimulationConfig::parse(r#"{"edge_attraction": 0.5}"#, "JSON").unwrap();
        assert_eq!(config.edge_attraction, 0.5);
        assert_eq!(config.repulsion, DEFAULT_REPULSION);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = SimulationConfig::parse("", "toml").unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat(ext) if ext == "toml"));
    }

    #[test]
    fn rejects_stability_bound_below_one() {
        for text in ["stability_bound: -1.0", "stability_bound: 0.0", "stability_bound: 0.5"] {
            let err = SimulationConfig::parse(text, "yaml").unwrap_err();
            assert!(
                matches!(err, IoError::Layout(LayoutError::InvalidConfig(_))),
                "{text} was accepted"
            );
        }
        assert!(SimulationConfig::parse("stability_bound: 1.0", "yaml").is_ok());
    }

    #[test]
    fn rejects_non_finite_bound_built_in_code() {
        let config = SimulationConfig::default().with_stability_bound(Some(f32::NAN));
        assert!(matches!(config.validate(), Err(LayoutError::InvalidConfig(_))));
    }

    #[test]
    fn parses_barnes_hut_mode() {
        let config = SimulationConfig::parse(
            "repulsion_mode:\n  mode: barnes_hut\n  theta: 0.5\n",
            "yaml",
        )
        .unwrap();
        assert_eq!(config.repulsion_mode, RepulsionMode::BarnesHut { theta: 0.5 });
        assert_eq!(SimulationConfig::default().repulsion_mode, RepulsionMode::Exact);
    }

    #[test]
    fn rejects_negative_theta() {
        let err = SimulationConfig::parse(
            r#"{"repulsion_mode": {"mode": "barnes_hut", "theta": -0.1}}"#,
            "json",
        )
        .unwrap_err();
        assert!(matches!(err, IoError::Layout(LayoutError::InvalidConfig(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.yml");
        std::fs::write(&path, "center_strength: 0.012\n").unwrap();

        let config = SimulationConfig::load(&path).unwrap();
        assert_eq!(config.center_strength, 0.012);
    }
}
