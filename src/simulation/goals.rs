//! Goals: pluggable constraint units for the relaxation solver
//!
//! A goal references a fixed set of nodes and, given the current node
//! positions, proposes a move vector for each of them. The solver blends
//! the proposals of all goals into one move per node using the goal
//! weights, so a goal never writes node state itself.
//!
//! Defines the [`Goal`] trait, its shared [`GoalData`] and a small library
//! of built-in goals (anchor, constant force, length, planarity, merge)

use crate::simulation::binders::Geometry;
use crate::simulation::states::{Node, NVec3};

/// Stable handle for a registered goal, valid until the goal is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoalId(pub(crate) u64);

/// Per-goal bookkeeping shared by every goal implementation.
///
/// `node_indices`, `starting_positions`, `weights` and `moves` always have
/// the same length once the goal is registered. `node_indices` is filled in
/// by the solver on registration unless the caller asks it to keep the
/// indices already present.
#[derive(Debug, Clone)]
pub struct GoalData {
    pub node_indices: Vec<usize>,
    pub starting_positions: Vec<NVec3>,
    pub weights: Vec<f32>,
    pub moves: Vec<NVec3>,
}

impl GoalData {
    /// Same weight on every node
    pub fn new(starting_positions: Vec<NVec3>, weight: f32) -> Self {
        let weights = vec![weight; starting_positions.len()];
        Self::with_weights(starting_positions, weights)
    }

    /// One weight per node
    pub fn with_weights(starting_positions: Vec<NVec3>, weights: Vec<f32>) -> Self {
        debug_assert_eq!(starting_positions.len(), weights.len());
        let n = starting_positions.len();
        Self {
            node_indices: Vec::with_capacity(n),
            starting_positions,
            weights,
            moves: vec![NVec3::zeros(); n],
        }
    }

    /// Use these node indices instead of letting the solver match positions
    pub fn with_node_indices(mut self, node_indices: Vec<usize>) -> Self {
        debug_assert_eq!(node_indices.len(), self.starting_positions.len());
        self.node_indices = node_indices;
        self
    }

    pub fn node_count(&self) -> usize {
        self.starting_positions.len()
    }

    /// Current position of the goal's `slot`-th node
    pub fn position(&self, nodes: &[Node], slot: usize) -> NVec3 {
        let index = self.node_indices[slot];
        debug_assert!(index < nodes.len(), "stale node index {index}");
        nodes[index].position
    }

    /// Set every weight to `weight`
    pub fn set_weight(&mut self, weight: f32) {
        for w in self.weights.iter_mut() {
            *w = weight;
        }
    }
}

/// Value reported by [`Goal::outputs`] for display or inspection
#[derive(Debug, Clone, PartialEq)]
pub enum GoalOutput {
    Scalar(f32),
    Point(NVec3),
    Geometry(Geometry),
}

/// Trait for constraint sources operating on the solver's node array.
///
/// `compute` is called once per iteration, possibly on a worker thread and
/// in parallel with other goals. It may only read `nodes` and must write one
/// move per referenced node into `data_mut().moves`.
pub trait Goal: Send + Sync {
    fn data(&self) -> &GoalData;

    fn data_mut(&mut self) -> &mut GoalData;

    fn node_count(&self) -> usize {
        self.data().node_count()
    }

    fn compute(&mut self, nodes: &[Node]);

    /// Goal specific values derived from the current node positions
    fn outputs(&self, _nodes: &[Node]) -> Vec<GoalOutput> {
        Vec::new()
    }
}

// =========================================================================================
// Built-in goals
// =========================================================================================

/// Pulls a single node to a fixed point
#[derive(Debug, Clone)]
pub struct AnchorGoal {
    data: GoalData,
    pub anchor: NVec3,
}

impl AnchorGoal {
    pub const DEFAULT_WEIGHT: f32 = 1000.0;

    /// Anchor the node found at `position` where it currently is
    pub fn new(position: NVec3) -> Self {
        Self::with_anchor(position, position, Self::DEFAULT_WEIGHT)
    }

    pub fn with_anchor(position: NVec3, anchor: NVec3, weight: f32) -> Self {
        Self {
            data: GoalData::new(vec![position], weight),
            anchor,
        }
    }
}

impl Goal for AnchorGoal {
    fn data(&self) -> &GoalData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut GoalData {
        &mut self.data
    }

    fn compute(&mut self, nodes: &[Node]) {
        let p = self.data.position(nodes, 0);
        self.data.moves[0] = self.anchor - p;
    }

    fn outputs(&self, nodes: &[Node]) -> Vec<GoalOutput> {
        vec![GoalOutput::Point(self.data.position(nodes, 0))]
    }
}

/// Applies the same constant move to every node it holds (gravity, wind, ...)
#[derive(Debug, Clone)]
pub struct ConstantGoal {
    data: GoalData,
    pub constant: NVec3,
}

impl ConstantGoal {
    pub const DEFAULT_WEIGHT: f32 = 1.0;

    pub fn new(positions: Vec<NVec3>, constant: NVec3) -> Self {
        Self::with_weight(positions, constant, Self::DEFAULT_WEIGHT)
    }

    pub fn with_weight(positions: Vec<NVec3>, constant: NVec3, weight: f32) -> Self {
        Self {
            data: GoalData::new(positions, weight),
            constant,
        }
    }
}

impl Goal for ConstantGoal {
    fn data(&self) -> &GoalData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut GoalData {
        &mut self.data
    }

    fn compute(&mut self, _nodes: &[Node]) {
        for m in self.data.moves.iter_mut() {
            *m = self.constant;
        }
    }
}

/// Keeps two nodes at a target distance from each other.
///
/// Both endpoints move symmetrically about their midpoint, so with equal
/// weights the midpoint of the segment never moves because of this goal.
#[derive(Debug, Clone)]
pub struct LengthGoal {
    data: GoalData,
    pub target_length: f32,
}

impl LengthGoal {
    pub const DEFAULT_WEIGHT: f32 = 1.0;

    /// Target length is the initial distance between `start` and `end`
    pub fn new(start: NVec3, end: NVec3) -> Self {
        Self::with_length(start, end, (end - start).norm(), Self::DEFAULT_WEIGHT)
    }

    pub fn with_length(start: NVec3, end: NVec3, target_length: f32, weight: f32) -> Self {
        Self {
            data: GoalData::new(vec![start, end], weight),
            target_length,
        }
    }

    /// Current distance between the two nodes
    pub fn current_length(&self, nodes: &[Node]) -> f32 {
        (self.data.position(nodes, 1) - self.data.position(nodes, 0)).norm()
    }
}

impl Goal for LengthGoal {
    fn data(&self) -> &GoalData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut GoalData {
        &mut self.data
    }

    fn compute(&mut self, nodes: &[Node]) {
        let a = self.data.position(nodes, 0);
        let b = self.data.position(nodes, 1);

        let center = 0.5 * (a + b);
        let d = b - a;
        let len = d.norm();

        // Coincident endpoints have no direction; collapse them onto the center
        let dir = if len > 0.0 { d / len } else { NVec3::zeros() };
        let half = 0.5 * self.target_length * dir;

        self.data.moves[0] = center - half - a;
        self.data.moves[1] = center + half - b;
    }

    fn outputs(&self, nodes: &[Node]) -> Vec<GoalOutput> {
        vec![GoalOutput::Scalar(self.current_length(nodes))]
    }
}

/// Projects nodes onto a fixed plane
#[derive(Debug, Clone)]
pub struct OnPlaneGoal {
    data: GoalData,
    pub origin: NVec3,
    normal: NVec3,
}

impl OnPlaneGoal {
    pub const DEFAULT_WEIGHT: f32 = 1.0;

    /// `normal` does not need to be unit length. A zero normal makes the goal inert.
    pub fn new(positions: Vec<NVec3>, origin: NVec3, normal: NVec3, weight: f32) -> Self {
        Self {
            data: GoalData::new(positions, weight),
            origin,
            normal: normal.try_normalize(0.0).unwrap_or_else(NVec3::zeros),
        }
    }

    pub fn normal(&self) -> NVec3 {
        self.normal
    }
}

impl Goal for OnPlaneGoal {
    fn data(&self) -> &GoalData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut GoalData {
        &mut self.data
    }

    fn compute(&mut self, nodes: &[Node]) {
        for i in 0..self.data.node_count() {
            let p = self.data.position(nodes, i);
            let offset = (p - self.origin).dot(&self.normal);
            self.data.moves[i] = -offset * self.normal;
        }
    }

    fn outputs(&self, nodes: &[Node]) -> Vec<GoalOutput> {
        // Largest distance to the plane
        let deviation = (0..self.data.node_count())
            .map(|i| (self.data.position(nodes, i) - self.origin).dot(&self.normal).abs())
            .fold(0.0_f32, f32::max);
        vec![GoalOutput::Scalar(deviation)]
    }
}

/// Pulls all of its nodes to their common centroid
#[derive(Debug, Clone)]
pub struct MergeGoal {
    data: GoalData,
}

impl MergeGoal {
    pub const DEFAULT_WEIGHT: f32 = 1000.0;

    pub fn new(positions: Vec<NVec3>) -> Self {
        Self {
            data: GoalData::new(positions, Self::DEFAULT_WEIGHT),
        }
    }
}

impl Goal for MergeGoal {
    fn data(&self) -> &GoalData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut GoalData {
        &mut self.data
    }

    fn compute(&mut self, nodes: &[Node]) {
        let n = self.data.node_count();
        if n == 0 {
            return;
        }
        let mut centroid = NVec3::zeros();
        for i in 0..n {
            centroid += self.data.position(nodes, i);
        }
        centroid /= n as f32;

        for i in 0..n {
            self.data.moves[i] = centroid - self.data.position(nodes, i);
        }
    }

    fn outputs(&self, nodes: &[Node]) -> Vec<GoalOutput> {
        (0..self.data.node_count())
            .map(|i| GoalOutput::Point(self.data.position(nodes, i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nodes at `positions` and a goal wired to them in order
    fn wire<G: Goal>(goal: &mut G, positions: &[NVec3]) -> Vec<Node> {
        goal.data_mut().node_indices = (0..positions.len()).collect();
        positions.iter().map(|p| Node::new(*p)).collect()
    }

    #[test]
    fn length_goal_moves_symmetrically() {
        let a = NVec3::new(0.0, 0.0, 0.0);
        let b = NVec3::new(4.0, 0.0, 0.0);
        let mut goal = LengthGoal::with_length(a, b, 2.0, 1.0);
        let nodes = wire(&mut goal, &[a, b]);

        goal.compute(&nodes);

        let m = &goal.data().moves;
        assert!((m[0] - NVec3::new(1.0, 0.0, 0.0)).norm() < 1e-6);
        assert!((m[1] - NVec3::new(-1.0, 0.0, 0.0)).norm() < 1e-6);
        assert_eq!(goal.outputs(&nodes), vec![GoalOutput::Scalar(4.0)]);
    }

    #[test]
    fn length_goal_handles_coincident_nodes() {
        let p = NVec3::new(1.0, 1.0, 1.0);
        let mut goal = LengthGoal::with_length(p, p, 1.0, 1.0);
        let nodes = wire(&mut goal, &[p, p]);

        goal.compute(&nodes);

        assert!(goal.data().moves.iter().all(|m| m.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn anchor_goal_points_back_to_anchor() {
        let p = NVec3::new(1.0, 2.0, 3.0);
        let mut goal = AnchorGoal::new(p);
        let mut nodes = wire(&mut goal, &[p]);
        nodes[0].position = NVec3::new(0.0, 0.0, 0.0);

        goal.compute(&nodes);

        assert_eq!(goal.data().moves[0], p);
        assert_eq!(goal.data().weights[0], AnchorGoal::DEFAULT_WEIGHT);
    }

    #[test]
    fn on_plane_goal_removes_normal_component() {
        let positions = [NVec3::new(1.0, 2.0, 5.0), NVec3::new(-3.0, 0.5, -2.0)];
        let mut goal = OnPlaneGoal::new(
            positions.to_vec(),
            NVec3::zeros(),
            NVec3::new(0.0, 0.0, 10.0),
            1.0,
        );
        let nodes = wire(&mut goal, &positions);

        goal.compute(&nodes);

        assert_eq!(goal.data().moves[0], NVec3::new(0.0, 0.0, -5.0));
        assert_eq!(goal.data().moves[1], NVec3::new(0.0, 0.0, 2.0));
        assert_eq!(goal.outputs(&nodes), vec![GoalOutput::Scalar(5.0)]);
    }

    #[test]
    fn merge_goal_targets_centroid() {
        let positions = [NVec3::new(0.0, 0.0, 0.0), NVec3::new(2.0, 2.0, 0.0)];
        let mut goal = MergeGoal::new(positions.to_vec());
        let nodes = wire(&mut goal, &positions);

        goal.compute(&nodes);

        assert_eq!(goal.data().moves[0], NVec3::new(1.0, 1.0, 0.0));
        assert_eq!(goal.data().moves[1], NVec3::new(-1.0, -1.0, 0.0));
    }

    #[test]
    fn constant_goal_ignores_positions() {
        let positions = [NVec3::new(5.0, 0.0, 0.0), NVec3::new(0.0, 5.0, 0.0)];
        let g = NVec3::new(0.0, 0.0, -0.1);
        let mut goal = ConstantGoal::new(positions.to_vec(), g);
        let nodes = wire(&mut goal, &positions);

        goal.compute(&nodes);

        assert!(goal.data().moves.iter().all(|m| *m == g));
    }
}
