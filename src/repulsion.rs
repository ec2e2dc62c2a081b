//! Repulsion pass: every node against every other, plus centering
//!
//! Exact mode is O(N²) per frame. Barnes-Hut mode builds an [`Octree`] from
//! the input buffer before the workers start and only reads it during the
//! pass. Each worker reads the full input and writes only its own output slot.
//! The stability clamp applies to the value actually written, so a node
//! that overshoots the bound lands on the unit sphere.

use glam::Vec3;

use crate::config::{RepulsionMode, SimulationConfig};
use crate::error::LayoutResult;
use crate::forces::{center, repel};
use crate::node::Node;
use crate::octree::Octree;
use crate::pass::{PassReport, for_each_node};

/// Run the repulsion pass from `input` into `output`.
///
/// `report.adjusted` counts nodes pulled back by the stability clamp.
pub fn run(
    input: &[Node],
    output: &mut [Node],
    config: &SimulationConfig,
) -> LayoutResult<PassReport> {
    let apply = |node: &Node, force: Vec3| -> LayoutResult<(Node, bool)> {
        let (position, clamped) = clamp_to_bound(node.position + force, config.stability_bound);
        Ok((node.moved_to(position), clamped))
    };

    match config.repulsion_mode {
        RepulsionMode::Exact => for_each_node(input, output, |id, node| {
            apply(node, net_force(input, id, config))
        }),
        RepulsionMode::BarnesHut { theta } => {
            let tree = Octree::build(input);
            for_each_node(input, output, |_, node| {
                let force = tree.repulsion_at(
                    node.position,
                    config.repulsion,
                    config.repulsion_scale,
                    config.repulsion_epsilon,
                    theta,
                );
                apply(node, force + center(node.position, config.center_strength))
            })
        }
    }
}

/// Total repulsion on node `id` from every other node, plus the centering pull
pub fn net_force(nodes: &[Node], id: usize, config: &SimulationConfig) -> Vec3 {
    let position = nodes[id].position;
    let repulsion = nodes
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != id)
        .fold(Vec3::ZERO, |acc, (_, other)| {
            acc + repel(
                position,
                other.position,
                config.repulsion,
                config.repulsion_scale,
                config.repulsion_epsilon,
            )
        });
    repulsion + center(position, config.center_strength)
}

/// Pull a runaway position back onto the unit sphere.
///
/// Returns the position to write and whether the bound was hit. Bounds below
/// 1 are rejected by [`SimulationConfig::validate`].
pub fn clamp_to_bound(position: Vec3, bound: Option<f32>) -> (Vec3, bool) {
    match bound {
        Some(bound) if position.length() > bound => (position.normalize_or_zero(), true),
        _ => (position, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EdgeOffset;

    fn run_once(nodes: &[Node], config: &SimulationConfig) -> Vec<Node> {
        let mut output = vec![Node::default(); nodes.len()];
        run(nodes, &mut output, config).unwrap();
        output
    }

    #[test]
    fn single_node_only_feels_centering() {
        let config = SimulationConfig::default().with_repulsion(5.0);
        let node = Node::new(2.0, -1.0, 0.5);

        let output = run_once(&[node], &config);

        let expected = node.position + center(node.position, config.center_strength);
        assert!((output[0].position - expected).length() < 1e-6);
    }

    #[test]
    fn node_at_origin_stays_put() {
        let output = run_once(&[Node::default()], &SimulationConfig::default());
        assert_eq!(output[0].position, Vec3::ZERO);
    }

    #[test]
    fn isolated_node_moves_toward_origin_every_frame() {
        let config = SimulationConfig::default().with_repulsion(0.0);
        let mut nodes = vec![Node::new(6.0, 3.0, -2.0)];

        for _ in 0..20 {
            let before = nodes[0].position.length();
            nodes = run_once(&nodes, &config);
            assert!(nodes[0].position.length() < before);
        }
    }

    #[test]
    fn pair_forces_are_equal_and_opposite() {
        let config = SimulationConfig::default().with_center_strength(0.0);
        let nodes = [Node::new(0.5, 0.0, 0.0), Node::new(-0.25, 0.4, 0.1)];

        let on_a = net_force(&nodes, 0, &config);
        let on_b = net_force(&nodes, 1, &config);

        assert!(on_a.length() > 0.0);
        assert!((on_a + on_b).length() < 1e-6);
    }

    #[test]
    fn non_position_fields_are_copied() {
        let node = Node::new(1.0, 0.0, 0.0)
            .with_flag(3)
            .with_first_edge(Some(EdgeOffset(2)));

        let output = run_once(&[node, Node::new(-1.0, 0.0, 0.0)], &SimulationConfig::default());

        assert_eq!(output[0].flag, 3);
        assert_eq!(output[0].first_edge, Some(EdgeOffset(2)));
    }

    #[test]
    fn clamp_takes_effect_on_runaway_positions() {
        let config = SimulationConfig::default().with_center_strength(0.0);
        let nodes = [Node::new(40.0, 0.0, 0.0)];

        let mut output = vec![Node::default()];
        let report = run(&nodes, &mut output, &config).unwrap();

        assert_eq!(report.adjusted, 1);
        assert!((output[0].position.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clamp_can_be_disabled() {
        let config = SimulationConfig::default()
            .with_center_strength(0.0)
            .with_stability_bound(None);

        let output = run_once(&[Node::new(40.0, 0.0, 0.0)], &config);
        assert_eq!(output[0].position.x, 40.0);
    }

    #[test]
    fn clamp_never_produces_nan() {
        let (position, clamped) = clamp_to_bound(Vec3::ZERO, Some(-1.0));
        assert!(clamped);
        assert_eq!(position, Vec3::ZERO);

        let (position, _) = clamp_to_bound(Vec3::new(0.6, 0.0, 0.0), Some(1.0));
        assert_eq!(position.x, 0.6);
    }

    #[test]
    fn barnes_hut_with_zero_theta_matches_exact() {
        let nodes: Vec<Node> = (0..30)
            .map(|i| {
                let t = i as f32;
                Node::new((t * 1.3).sin(), (t * 0.7).cos(), (t * 0.4).sin() * 0.6)
            })
            .collect();
        let exact = SimulationConfig::default().with_repulsion(0.5);
        let tree = exact
            .clone()
            .with_repulsion_mode(RepulsionMode::BarnesHut { theta: 0.0 });

        let expected = run_once(&nodes, &exact);
        let approximated = run_once(&nodes, &tree);

        for (a, b) in expected.iter().zip(&approximated) {
            let tolerance = 1e-4 * (1.0 + a.position.length());
            assert!((a.position - b.position).length() < tolerance);
        }
    }

    #[test]
    fn barnes_hut_stays_close_to_exact() {
        let nodes: Vec<Node> = (0..200)
            .map(|i| {
                let t = i as f32;
                Node::new((t * 2.1).sin(), (t * 1.7).cos(), (t * 0.9).sin())
            })
            .collect();
        let exact = SimulationConfig::default().with_repulsion(0.5);
        let tree = exact.clone().with_repulsion_mode(RepulsionMode::barnes_hut());

        let expected = run_once(&nodes, &exact);
        let approximated = run_once(&nodes, &tree);

        let (error, moved) = expected.iter().zip(&approximated).zip(&nodes).fold(
            (0.0, 0.0),
            |(error, moved), ((a, b), before)| {
                (
                    error + (a.position - b.position).length(),
                    moved + (a.position - before.position).length(),
                )
            },
        );
        assert!(error / moved < 0.25, "relative error {}", error / moved);
    }

    #[test]
    fn three_nodes_spread_apart() {
        let config = SimulationConfig::default().with_repulsion(1.0);
        let nodes = [
            Node::new(1.0, 0.0, 0.0),
            Node::new(-1.0, 0.0, 0.0),
            Node::new(0.0, 2.0, 0.0),
        ];

        let output = run_once(&nodes, &config);

        for i in 0..3 {
            for j in (i + 1)..3 {
                let before = nodes[i].position.distance(nodes[j].position);
                let after = output[i].position.distance(output[j].position);
                assert!(after > before, "nodes {i} and {j} did not separate");
            }
        }
    }
}
