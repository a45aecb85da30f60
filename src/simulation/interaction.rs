//! Pointer-driven manipulation of nodes
//!
//! The host forwards pointer and camera events as plain method calls with an
//! [`InteractionContext`]; the solver keeps the resulting state:
//! - idle: nothing grabbed, nothing hovered
//! - hover: `nearest_node_index` set, purely informational
//! - dragging: `handle_node_index` set, the node is pulled onto the pointer
//!   ray during every iteration

use super::engine::Solver;
use super::states::{Node, NVec3};

/// Pointer ray and camera orientation at the time of an event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionContext {
    pub ray_origin: NVec3,
    pub ray_direction: NVec3,
    pub camera_look: NVec3,
    pub camera_up: NVec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Hover(usize),
    Dragging(usize),
}

/// Index of the node closest to the pointer ray on screen, within `range`.
///
/// Nodes and the ray direction are expressed in a camera frame built from
/// the look and up directions and divided by their depth, which gives
/// positions on a plane one unit in front of the camera. Ties keep the
/// earliest node. Nodes at or behind the ray origin are skipped.
pub fn find_nearest_node(nodes: &[Node], ctx: &InteractionContext, range: f32) -> Option<usize> {
    let cam_z = ctx.camera_look.normalize();
    let cam_y = ctx.camera_up.normalize();
    let cam_x = cam_y.cross(&cam_z).normalize();

    let to_camera = |v: NVec3| NVec3::new(v.dot(&cam_x), v.dot(&cam_y), v.dot(&cam_z));

    let pointer = to_camera(ctx.ray_direction);
    if !(pointer.z > 0.0) {
        return None;
    }
    let pointer_2d = pointer / pointer.z;

    let mut nearest = None;
    let mut min_dist2 = range * range;

    for (i, node) in nodes.iter().enumerate() {
        let v = to_camera(node.position - ctx.ray_origin);
        if !(v.z > 0.0) {
            continue;
        }
        let dist2 = (pointer_2d - v / v.z).norm_squared();

        if dist2 < min_dist2 {
            min_dist2 = dist2;
            nearest = Some(i);
        }
    }

    nearest
}

impl Solver {
    pub fn handle_node_index(&self) -> Option<usize> {
        self.handle_node_index
    }

    pub fn nearest_node_index(&self) -> Option<usize> {
        self.nearest_node_index
    }

    pub fn interaction_state(&self) -> InteractionState {
        match (self.handle_node_index, self.nearest_node_index) {
            (Some(i), _) => InteractionState::Dragging(i),
            (None, Some(i)) => InteractionState::Hover(i),
            (None, None) => InteractionState::Idle,
        }
    }

    /// Primary button pressed: grab the node under the pointer, if any
    pub fn on_pointer_down(&mut self, ctx: &InteractionContext) -> Option<usize> {
        if !self.params.enable_mouse_interaction {
            return None;
        }
        self.track_pointer(ctx);
        self.handle_node_index = find_nearest_node(self.nodes(), ctx, self.params.pick_range);
        self.handle_node_index
    }

    pub fn on_pointer_up(&mut self) {
        self.handle_node_index = None;
        self.nearest_node_index = None;
    }

    /// Pointer moved. A released button ends any drag; the hover index is
    /// refreshed either way.
    pub fn on_pointer_move(&mut self, ctx: &InteractionContext, button_down: bool) {
        if !self.params.enable_mouse_interaction {
            return;
        }
        self.track_pointer(ctx);
        if !button_down {
            self.handle_node_index = None;
        }
        self.nearest_node_index = find_nearest_node(self.nodes(), ctx, self.params.pick_range);
    }

    pub fn on_camera_changed(&mut self) {
        self.nearest_node_index = None;
    }

    /// The host toggled whether the viewport may be navigated. Either way
    /// the current drag is abandoned.
    pub fn on_navigation_changed(&mut self, _can_navigate: bool) {
        self.handle_node_index = None;
        self.nearest_node_index = None;
    }

    fn track_pointer(&mut self, ctx: &InteractionContext) {
        self.pointer_ray = ctx
            .ray_direction
            .try_normalize(0.0)
            .map(|d| (ctx.ray_origin, d));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_z() -> InteractionContext {
        InteractionContext {
            ray_origin: NVec3::new(0.0, 0.0, -10.0),
            ray_direction: NVec3::new(0.0, 0.0, 1.0),
            camera_look: NVec3::new(0.0, 0.0, 1.0),
            camera_up: NVec3::new(0.0, 1.0, 0.0),
        }
    }

    fn nodes(points: &[[f32; 3]]) -> Vec<Node> {
        points.iter().map(|p| Node::new(NVec3::from(*p))).collect()
    }

    #[test]
    fn picks_node_on_ray() {
        let nodes = nodes(&[[5.0, 5.0, 0.0], [0.01, 0.0, 0.0]]);
        assert_eq!(find_nearest_node(&nodes, &looking_down_z(), 0.03), Some(1));
    }

    #[test]
    fn ignores_nodes_out_of_range() {
        let nodes = nodes(&[[1.0, 0.0, 0.0]]);
        assert_eq!(find_nearest_node(&nodes, &looking_down_z(), 0.03), None);
    }

    #[test]
    fn range_is_measured_after_projection() {
        // 0.2 off-axis at depth 10 projects to 0.02, inside the range
        let nodes = nodes(&[[0.2, 0.0, 0.0]]);
        assert_eq!(find_nearest_node(&nodes, &looking_down_z(), 0.03), Some(0));
    }

    #[test]
    fn ties_keep_first_node() {
        let nodes = nodes(&[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        assert_eq!(find_nearest_node(&nodes, &looking_down_z(), 0.03), Some(0));
    }

    #[test]
    fn skips_nodes_behind_camera() {
        let nodes = nodes(&[[0.0, 0.0, -20.0]]);
        assert_eq!(find_nearest_node(&nodes, &looking_down_z(), 0.03), None);
    }
}
