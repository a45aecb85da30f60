//! Numerical parameters for the relaxation loop
//!
//! `Parameters` holds the runtime switches read by every iteration:
//! - momentum on/off and the damping applied to velocities,
//! - the batch size used by background execution,
//! - node merge tolerance, pointer pick range and drag weight

use std::time::Duration;

pub const DEFAULT_DAMPING_FACTOR: f32 = 0.98;
pub const DEFAULT_NODE_MERGE_THRESHOLD: f32 = 1e-4;
pub const DEFAULT_MANIPULATION_WEIGHT: f32 = 30.0;
pub const DEFAULT_PICK_RANGE: f32 = 0.03;
pub const DEFAULT_TIME_BOX: Duration = Duration::from_millis(25);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Parameters {
    pub enable_mouse_interaction: bool, // pointer events may grab nodes
    pub enable_momentum: bool, // false = pure relaxation, velocities forced to zero
    pub enable_fast_display: bool, // push positions to the display after every background batch
    pub damping_factor: f32, // velocity multiplier applied after each move
    pub iteration_count: usize, // background batch size, 0 = use `time_box`
    pub node_merge_threshold: f32, // registration dedup tolerance
    pub manipulation_weight: f32, // weight of the pointer pull on the handle node
    pub pick_range: f32, // projected distance within which a node can be picked
    pub time_box: Duration, // background batch length when `iteration_count` is 0
    pub stop_timeout: Duration, // bounded wait used when stopping the worker
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            enable_mouse_interaction: true,
            enable_momentum: true,
            enable_fast_display: true,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            iteration_count: 0,
            node_merge_threshold: DEFAULT_NODE_MERGE_THRESHOLD,
            manipulation_weight: DEFAULT_MANIPULATION_WEIGHT,
            pick_range: DEFAULT_PICK_RANGE,
            time_box: DEFAULT_TIME_BOX,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}
