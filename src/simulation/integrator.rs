//! The relaxation step
//!
//! One call advances every node once: momentum drift, parallel goal
//! evaluation, weighted aggregation of the proposed moves, optional pointer
//! pull on the grabbed node, then the position/velocity update.

use rayon::prelude::*;

use super::goals::Goal;
use super::params::Parameters;
use super::states::{Node, NVec3};

/// Pointer pull acting on one node for the duration of a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manipulation {
    pub node: usize, // index of the grabbed node
    pub ray_origin: NVec3,
    pub ray_direction: NVec3, // unit length
    pub weight: f32,
}

impl Manipulation {
    /// Move that brings the grabbed node onto the pointer ray: the part of
    /// (position - origin) perpendicular to the ray, negated
    pub fn pull(&self, position: NVec3) -> NVec3 {
        let v = position - self.ray_origin;
        v.dot(&self.ray_direction) * self.ray_direction - v
    }
}

/// Advance `nodes` by one relaxation step.
///
/// Goals only read `nodes` while they compute; the aggregation and the
/// update below are the only writers and run after every goal has finished.
/// Nodes with no contributing goal (weight sum exactly zero) are untouched.
pub fn relaxation_step(
    nodes: &mut [Node],
    goals: &mut [Box<dyn Goal>],
    manipulation: Option<&Manipulation>,
    params: &Parameters,
) {
    // Drift: x += v
    if params.enable_momentum {
        for node in nodes.iter_mut() {
            node.position += node.velocity;
        }
    }

    // Goals are independent of each other, evaluate them in parallel
    {
        let nodes: &[Node] = nodes;
        goals.par_iter_mut().for_each(|goal| goal.compute(nodes));
    }

    // Weighted sums per node, accumulated in goal order
    let n = nodes.len();
    let mut move_sums = vec![NVec3::zeros(); n];
    let mut weight_sums = vec![0.0_f32; n];

    for goal in goals.iter() {
        let data = goal.data();
        debug_assert_eq!(data.node_indices.len(), data.moves.len());
        debug_assert_eq!(data.node_indices.len(), data.weights.len());

        for ((&index, m), &w) in data.node_indices.iter().zip(&data.moves).zip(&data.weights) {
            debug_assert!(index < n, "stale node index {index}");
            move_sums[index] += *m * w;
            weight_sums[index] += w;
        }
    }

    // The grabbed node behaves as if one more goal pulled it onto the ray
    if let Some(m) = manipulation {
        debug_assert!(m.node < n, "stale handle node {}", m.node);
        weight_sums[m.node] += m.weight;
        move_sums[m.node] += m.pull(nodes[m.node].position) * m.weight;
    }

    // Apply the blended move
    for ((node, move_sum), &weight_sum) in nodes.iter_mut().zip(&move_sums).zip(&weight_sums) {
        if weight_sum == 0.0 {
            continue;
        }

        let mv = *move_sum / weight_sum;
        node.last_move = mv;
        node.position += mv;

        if params.enable_momentum {
            // Kick, then damp: v = (v + move) * damping
            node.velocity += mv;
            node.velocity *= params.damping_factor;
        } else {
            node.velocity = NVec3::zeros();
        }
    }
}
