//! Shared parallel-for over node slots
//!
//! Every pass is the same shape: one worker per node id, each reading the
//! whole input buffer and writing only its own output slot.

use rayon::prelude::*;

use crate::error::{LayoutError, LayoutResult};
use crate::node::Node;

/// Summary of one pass over the node buffer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassReport {
    /// Nodes whose update was clamped (repulsion) or discarded (attraction)
    pub adjusted: usize,
    /// Largest distance any node moved during the pass
    pub max_displacement: f32,
}

impl PassReport {
    fn merge(self, other: Self) -> Self {
        Self {
            adjusted: self.adjusted + other.adjusted,
            max_displacement: self.max_displacement.max(other.max_displacement),
        }
    }
}

/// Run `update` for every node id in parallel, writing its result to
/// `output[id]`.
///
/// `update` returns the full output record and whether the pass had to adjust
/// it. The first contract violation any worker reports fails the whole pass.
pub(crate) fn for_each_node<F>(
    input: &[Node],
    output: &mut [Node],
    update: F,
) -> LayoutResult<PassReport>
where
    F: Fn(usize, &Node) -> LayoutResult<(Node, bool)> + Sync,
{
    if input.len() != output.len() {
        return Err(LayoutError::BufferLengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }

    output
        .par_iter_mut()
        .enumerate()
        .map(|(id, slot)| -> LayoutResult<PassReport> {
            let before = &input[id];
            let (after, adjusted) = update(id, before)?;
            let report = PassReport {
                adjusted: usize::from(adjusted),
                max_displacement: after.position.distance(before.position),
            };
            *slot = after;
            Ok(report)
        })
        .try_reduce(PassReport::default, |a, b| Ok(a.merge(b)))
}
