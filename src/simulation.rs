//! Frame orchestration over the double-buffered node store
//!
//! A frame is two passes separated by a full join:
//!
//! 1. repulsion reads the current buffer and writes the next one, then swap
//! 2. attraction reads the post-repulsion buffer and writes the other, then swap
//!
//! The current buffer is checkpointed before the frame starts. If either pass
//! fails, the store is rolled back to that checkpoint and the frame counter
//! does not move, so a retried frame starts from the same state.

use glam::Vec3;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::edge::{Edge, EdgeIndex, validate_adjacency};
use crate::error::LayoutResult;
use crate::node::{Node, NodeBuffers};
use crate::pass::PassReport;
use crate::{attraction, repulsion};

/// Per-frame statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Frame number after this step
    pub frame: u64,
    /// Nodes pulled back by the repulsion stability clamp
    pub clamped: usize,
    /// Nodes whose attraction update was discarded
    pub gated: usize,
    /// Largest distance any node moved in either pass
    pub max_displacement: f32,
}

/// CPU force simulation
pub struct Simulation {
    buffers: NodeBuffers,
    edges: Vec<Edge>,
    config: SimulationConfig,
    frame: u64,
}

impl Simulation {
    /// Create a simulation from nodes and an arbitrary directed edge list
    pub fn new(nodes: Vec<Node>, edges: &[Edge]) -> LayoutResult<Self> {
        Self::with_config(nodes, edges, SimulationConfig::default())
    }

    /// Create a simulation with custom configuration
    pub fn with_config(
        nodes: Vec<Node>,
        edges: &[Edge],
        config: SimulationConfig,
    ) -> LayoutResult<Self> {
        let index = EdgeIndex::build(nodes.len(), edges.iter().copied())?;
        Self::from_index(nodes, index, config)
    }

    /// Create a simulation from a prebuilt edge index
    pub fn from_index(
        mut nodes: Vec<Node>,
        index: EdgeIndex,
        config: SimulationConfig,
    ) -> LayoutResult<Self> {
        config.validate()?;
        index.install(&mut nodes)?;
        let edges = index.into_edges();
        validate_adjacency(&nodes, &edges)?;
        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            "installed graph topology"
        );

        Ok(Self {
            buffers: NodeBuffers::new(nodes),
            edges,
            config,
            frame: 0,
        })
    }

    /// Replace the graph between frames.
    ///
    /// The new topology is validated before anything is swapped in; on error
    /// the previous graph stays installed.
    pub fn set_topology(&mut self, mut nodes: Vec<Node>, index: EdgeIndex) -> LayoutResult<()> {
        index.install(&mut nodes)?;
        let edges = index.into_edges();
        validate_adjacency(&nodes, &edges)?;
        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            "replaced graph topology"
        );

        self.buffers.replace(nodes);
        self.edges = edges;
        Ok(())
    }

    /// Run one frame: repulsion, join, attraction.
    ///
    /// On error the nodes are left as they were before the frame.
    pub fn step(&mut self) -> LayoutResult<FrameStats> {
        self.config.validate()?;
        self.buffers.checkpoint();
        let (repelled, attracted) = match self
            .repulsion_pass()
            .and_then(|repelled| Ok((repelled, self.attraction_pass()?)))
        {
            Ok(reports) => reports,
            Err(err) => {
                self.buffers.rollback();
                return Err(err);
            }
        };
        self.frame += 1;

        let stats = FrameStats {
            frame: self.frame,
            clamped: repelled.adjusted,
            gated: attracted.adjusted,
            max_displacement: repelled.max_displacement.max(attracted.max_displacement),
        };
        debug!(
            frame = stats.frame,
            clamped = stats.clamped,
            gated = stats.gated,
            max_displacement = stats.max_displacement,
            "frame complete"
        );
        Ok(stats)
    }

    /// Run the repulsion pass alone and swap its output in
    pub fn repulsion_pass(&mut self) -> LayoutResult<PassReport> {
        let (input, output) = self.buffers.split();
        let report = repulsion::run(input, output, &self.config)?;
        self.buffers.swap();
        Ok(report)
    }

    /// Run the attraction pass alone and swap its output in
    pub fn attraction_pass(&mut self) -> LayoutResult<PassReport> {
        let (input, output) = self.buffers.split();
        let report = attraction::run(input, &self.edges, output, &self.config)?;
        self.buffers.swap();
        Ok(report)
    }

    /// Run `frames` frames, returning the stats of the last one
    pub fn run(&mut self, frames: usize) -> LayoutResult<FrameStats> {
        let mut last = FrameStats {
            frame: self.frame,
            ..Default::default()
        };
        for _ in 0..frames {
            last = self.step()?;
        }
        Ok(last)
    }

    /// Step until no node moves more than `rest_displacement` in a frame, or
    /// `max_frames` is reached. Returns the number of frames run.
    pub fn run_to_rest(&mut self, max_frames: usize) -> LayoutResult<usize> {
        for ran in 1..=max_frames {
            let stats = self.step()?;
            if stats.max_displacement <= self.config.rest_displacement {
                info!(frames = ran, "layout at rest");
                return Ok(ran);
            }
        }
        Ok(max_frames)
    }

    /// Nodes from the last completed pass
    pub fn nodes(&self) -> &[Node] {
        self.buffers.current()
    }

    /// Positions from the last completed pass
    pub fn positions(&self) -> Vec<Vec3> {
        self.nodes().iter().map(|node| node.position).collect()
    }

    /// Set a node's render flag
    pub fn set_flag(&mut self, node: usize, flag: i32) {
        if let Some(node) = self.buffers.current_mut().get_mut(node) {
            node.flag = flag;
        }
    }

    /// The sorted edge array
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of completed frames
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Current configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Mutable configuration, e.g. to tune coefficients between frames
    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepulsionMode;
    use crate::error::LayoutError;
    use crate::node::EdgeOffset;

    fn triangle() -> Vec<Node> {
        vec![
            Node::new(1.0, 0.0, 0.0),
            Node::new(-1.0, 0.0, 0.0),
            Node::new(0.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn unconnected_nodes_separate_in_one_frame() {
        let config = SimulationConfig::default().with_repulsion(1.0);
        let before = triangle();
        let mut sim = Simulation::with_config(before.clone(), &[], config.clone()).unwrap();

        let stats = sim.step().unwrap();

        let after = sim.nodes();
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!(
                    after[i].position.distance(after[j].position)
                        > before[i].position.distance(before[j].position)
                );
            }
        }
        let bound = config.stability_bound.unwrap();
        assert!(after.iter().all(|n| n.position.length() <= bound));
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.gated, 0);
    }

    #[test]
    fn empty_graph_steps() {
        let mut sim = Simulation::new(vec![], &[]).unwrap();
        let stats = sim.run(3).unwrap();
        assert_eq!(stats.frame, 3);
        assert!(sim.positions().is_empty());
    }

    #[test]
    fn connected_pair_settles_between_forces() {
        let nodes = vec![Node::new(2.0, 0.0, 0.0), Node::new(-2.0, 0.0, 0.0)];
        let index = EdgeIndex::build_undirected(2, [Edge::new(0, 1)]).unwrap();
        let mut sim = Simulation::from_index(nodes, index, SimulationConfig::default()).unwrap();

        sim.run(500).unwrap();

        let distance = sim.positions()[0].distance(sim.positions()[1]);
        assert!(distance.is_finite());
        assert!(distance > 0.01 && distance < 4.0);
    }

    #[test]
    fn run_to_rest_stops_early() {
        let mut sim = Simulation::new(vec![Node::new(0.5, 0.0, 0.0)], &[]).unwrap();
        let frames = sim.run_to_rest(10_000).unwrap();
        assert!(frames < 10_000);
        assert_eq!(sim.frame(), frames as u64);
    }

    #[test]
    fn offsets_are_installed_into_nodes() {
        let sim = Simulation::new(
            vec![Node::default(); 3],
            &[Edge::new(2, 0), Edge::new(0, 1)],
        )
        .unwrap();

        assert_eq!(sim.edges(), &[Edge::new(0, 1), Edge::new(2, 0)]);
        assert_eq!(sim.nodes()[0].first_edge, Some(EdgeOffset(0)));
        assert_eq!(sim.nodes()[1].first_edge, None);
        assert_eq!(sim.nodes()[2].first_edge, Some(EdgeOffset(1)));
    }

    #[test]
    fn bad_topology_is_rejected_and_old_one_kept() {
        let mut sim = Simulation::new(triangle(), &[Edge::new(0, 1)]).unwrap();

        let err = EdgeIndex::build(2, [Edge::new(0, 4)]).unwrap_err();
        assert!(matches!(err, LayoutError::NodeOutOfRange { .. }));

        let index = EdgeIndex::build(4, [Edge::new(0, 3)]).unwrap();
        let err = sim.set_topology(vec![Node::default(); 2], index).unwrap_err();
        assert!(matches!(err, LayoutError::BufferLengthMismatch { .. }));
        assert_eq!(sim.node_count(), 3);
        assert_eq!(sim.edge_count(), 1);
    }

    #[test]
    fn topology_can_change_between_frames() {
        let mut sim = Simulation::new(triangle(), &[]).unwrap();
        sim.step().unwrap();

        let index = EdgeIndex::build_undirected(4, [Edge::new(0, 3)]).unwrap();
        sim.set_topology(vec![Node::new(0.1, 0.2, 0.3); 4], index).unwrap();
        sim.step().unwrap();

        assert_eq!(sim.node_count(), 4);
        assert_eq!(sim.frame(), 2);
    }

    #[test]
    fn failed_frame_rolls_back_to_previous_state() {
        let mut sim = Simulation::new(triangle(), &[Edge::new(0, 1)]).unwrap();
        sim.step().unwrap();
        let before = sim.nodes().to_vec();

        // Corrupt the edge array behind the install-time validation
        sim.edges[0].n1 = 9;
        for _ in 0..2 {
            let err = sim.step().unwrap_err();
            assert!(matches!(err, LayoutError::NodeOutOfRange { node: 9, .. }));
            assert_eq!(sim.nodes(), before.as_slice());
            assert_eq!(sim.frame(), 1);
        }
    }

    #[test]
    fn invalid_config_is_rejected_before_the_frame() {
        let mut sim = Simulation::new(vec![Node::default()], &[]).unwrap();
        sim.config_mut().stability_bound = Some(0.0);

        let err = sim.step().unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfig(_)));
        assert_eq!(sim.nodes()[0].position, Vec3::ZERO);
        assert_eq!(sim.frame(), 0);

        let config = SimulationConfig::default().with_stability_bound(Some(-1.0));
        assert!(Simulation::with_config(vec![Node::default()], &[], config).is_err());
    }

    #[test]
    fn barnes_hut_frames_stay_finite() {
        let config = SimulationConfig::default().with_repulsion_mode(RepulsionMode::barnes_hut());
        let index = EdgeIndex::build_undirected(4, [Edge::new(0, 1), Edge::new(1, 2)]).unwrap();
        let nodes = vec![
            Node::new(0.1, 0.0, 0.0),
            Node::new(-0.1, 0.0, 0.0),
            Node::new(0.0, 0.1, 0.0),
            Node::new(0.0, 0.0, 0.1),
        ];
        let mut sim = Simulation::from_index(nodes, index, config).unwrap();

        sim.run(50).unwrap();
        assert!(sim.positions().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn flags_survive_frames() {
        let mut sim = Simulation::new(triangle(), &[Edge::new(0, 2)]).unwrap();
        sim.set_flag(2, 1);
        sim.run(4).unwrap();
        assert_eq!(sim.nodes()[2].flag, 1);
    }
}
