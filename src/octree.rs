//! Barnes-Hut octree for approximate repulsion
//!
//! Built once per frame from the repulsion input buffer and only read during
//! the pass. Cells live in one flat `Vec`; the eight children of a cell are
//! contiguous and always come after their parent.

use glam::Vec3;

use crate::forces::repel;
use crate::node::Node;

/// Subdivision stops here; deeper inserts merge into the leaf
const MAX_DEPTH: u32 = 32;

/// Smallest half-width of the root cell
const MIN_HALF_WIDTH: f32 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct Bounds {
    center: Vec3,
    half_width: f32,
}

impl Bounds {
    fn contains(&self, point: Vec3) -> bool {
        (point - self.center).abs().max_element() <= self.half_width
    }

    fn octant(&self, point: Vec3) -> usize {
        usize::from(point.x > self.center.x)
            | usize::from(point.y > self.center.y) << 1
            | usize::from(point.z > self.center.z) << 2
    }

    fn child(&self, octant: usize) -> Self {
        let half_width = self.half_width * 0.5;
        let sign = |bit: usize| if octant & bit != 0 { half_width } else { -half_width };
        Self {
            center: self.center + Vec3::new(sign(1), sign(2), sign(4)),
            half_width,
        }
    }
}

#[derive(Debug, Clone)]
struct Cell {
    bounds: Bounds,
    first_child: Option<usize>,
    center_of_mass: Vec3,
    mass: f32,
}

impl Cell {
    fn empty(bounds: Bounds) -> Self {
        Self {
            bounds,
            first_child: None,
            center_of_mass: Vec3::ZERO,
            mass: 0.0,
        }
    }
}

/// Octree of unit-mass node positions
#[derive(Debug, Clone)]
pub struct Octree {
    cells: Vec<Cell>,
}

impl Octree {
    /// Build a tree over every finite node position
    pub fn build(nodes: &[Node]) -> Self {
        let positions = || nodes.iter().map(|node| node.position).filter(|p| p.is_finite());
        let (min, max) = positions()
            .fold((Vec3::INFINITY, Vec3::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)));
        let bounds = if min.cmple(max).all() {
            Bounds {
                center: (min + max) * 0.5,
                half_width: ((max - min).max_element() * 0.5).max(MIN_HALF_WIDTH),
            }
        } else {
            Bounds {
                center: Vec3::ZERO,
                half_width: MIN_HALF_WIDTH,
            }
        };

        let mut tree = Self {
            cells: vec![Cell::empty(bounds)],
        };
        for position in positions() {
            tree.insert(position, 1.0);
        }
        tree.propagate_mass();
        tree
    }

    /// Number of cells, leaves included
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total mass held by the tree
    pub fn total_mass(&self) -> f32 {
        self.cells[0].mass
    }

    fn insert(&mut self, position: Vec3, mass: f32) {
        let mut cell = 0;
        let mut depth = 0;
        loop {
            if let Some(first) = self.cells[cell].first_child {
                cell = first + self.cells[cell].bounds.octant(position);
                depth += 1;
                continue;
            }

            let leaf = &mut self.cells[cell];
            if leaf.mass == 0.0 {
                leaf.mass = mass;
                leaf.center_of_mass = position;
                return;
            }
            if leaf.center_of_mass == position || depth >= MAX_DEPTH {
                let total = leaf.mass + mass;
                leaf.center_of_mass = (leaf.center_of_mass * leaf.mass + position * mass) / total;
                leaf.mass = total;
                return;
            }

            // Push the occupant down one level, then retry from this cell
            let (occupant, occupant_mass) = (leaf.center_of_mass, leaf.mass);
            leaf.mass = 0.0;
            leaf.center_of_mass = Vec3::ZERO;
            let first = self.subdivide(cell);
            let octant = self.cells[cell].bounds.octant(occupant);
            let slot = &mut self.cells[first + octant];
            slot.mass = occupant_mass;
            slot.center_of_mass = occupant;
        }
    }

    fn subdivide(&mut self, cell: usize) -> usize {
        let first = self.cells.len();
        let bounds = self.cells[cell].bounds;
        self.cells.extend((0..8).map(|octant| Cell::empty(bounds.child(octant))));
        self.cells[cell].first_child = Some(first);
        first
    }

    fn propagate_mass(&mut self) {
        for cell in (0..self.cells.len()).rev() {
            let Some(first) = self.cells[cell].first_child else {
                continue;
            };
            let children = &self.cells[first..first + 8];
            let mass: f32 = children.iter().map(|child| child.mass).sum();
            let weighted: Vec3 = children
                .iter()
                .map(|child| child.center_of_mass * child.mass)
                .sum();

            let parent = &mut self.cells[cell];
            parent.mass = mass;
            parent.center_of_mass = if mass > 0.0 { weighted / mass } else { Vec3::ZERO };
        }
    }

    /// Approximate repulsion on a node at `position`.
    ///
    /// A cell is opened when it contains `position` or its width exceeds
    /// `theta` times its distance, so `theta = 0` visits every leaf. The
    /// node's own leaf lies within the repulsion epsilon and adds nothing.
    pub fn repulsion_at(
        &self,
        position: Vec3,
        k: f32,
        scale: f32,
        epsilon: f32,
        theta: f32,
    ) -> Vec3 {
        let mut force = Vec3::ZERO;
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let cell = &self.cells[index];
            if cell.mass == 0.0 {
                continue;
            }
            if let Some(first) = cell.first_child {
                let width = cell.bounds.half_width * 2.0;
                let distance = cell.bounds.center.distance(position);
                if cell.bounds.contains(position) || width > theta * distance {
                    stack.extend(first..first + 8);
                    continue;
                }
            }
            force += repel(position, cell.center_of_mass, k, scale, epsilon) * cell.mass;
        }
        force
    }
}
