//! Core state types for the relaxation solver.
//!
//! A `Node` is a point mass moved by the solver. Goals and geometry binders
//! refer to nodes by their index into the solver's node array, so a node's
//! index is its identity for as long as the solver lives.

use nalgebra::Vector3;
pub type NVec3 = Vector3<f32>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub position: NVec3, // current position
    pub velocity: NVec3, // carried between iterations when momentum is on
    pub last_move: NVec3, // last applied move, kept for diagnostics
    starting_position: NVec3, // snapshot taken at creation
}

impl Node {
    /// Create a resting node at `position`
    pub fn new(position: NVec3) -> Self {
        Self {
            position,
            velocity: NVec3::zeros(),
            last_move: NVec3::zeros(),
            starting_position: position,
        }
    }

    /// Position the node was created at. Never changes.
    pub fn starting_position(&self) -> NVec3 {
        self.starting_position
    }

    /// Put the node back where it started, at rest
    pub fn reset(&mut self) {
        self.position = self.starting_position;
        self.velocity = NVec3::zeros();
        self.last_move = NVec3::zeros();
    }
}
