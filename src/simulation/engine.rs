//! The solver: node storage, goal/binder registration and the iteration loop
//!
//! `Solver` owns the node array and every registered goal and binder.
//! Registration maps each goal's starting points onto nodes, reusing an
//! existing node when one already sits within the merge threshold, so goals
//! that share an endpoint end up sharing a node.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::binders::{Geometry, GeometryBinder};
use super::display::DisplaySink;
use super::goals::{Goal, GoalId, GoalOutput};
use super::integrator::{relaxation_step, Manipulation};
use super::params::{Parameters, DEFAULT_NODE_MERGE_THRESHOLD};
use super::states::{Node, NVec3};

/// How a goal or binder is matched against existing nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterOptions {
    pub node_merge_threshold: f32,
    /// Trust the node indices already stored on the goal/binder
    pub keep_existing_node_indices: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            node_merge_threshold: DEFAULT_NODE_MERGE_THRESHOLD,
            keep_existing_node_indices: false,
        }
    }
}

pub struct Solver {
    pub params: Parameters,
    nodes: Vec<Node>,
    goals: Vec<Box<dyn Goal>>,
    goal_ids: Vec<GoalId>, // parallel to `goals`
    next_goal_id: u64,
    geometry_binders: Vec<Box<dyn GeometryBinder>>,
    current_iteration: usize,
    pub(crate) handle_node_index: Option<usize>,
    pub(crate) nearest_node_index: Option<usize>,
    pub(crate) pointer_ray: Option<(NVec3, NVec3)>, // latest (origin, unit direction)
    display: Option<Arc<dyn DisplaySink>>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("params", &self.params)
            .field("nodes", &self.nodes.len())
            .field("goals", &self.goals.len())
            .field("geometry_binders", &self.geometry_binders.len())
            .field("current_iteration", &self.current_iteration)
            .field("handle_node_index", &self.handle_node_index)
            .finish()
    }
}

impl Solver {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            goals: Vec::new(),
            goal_ids: Vec::new(),
            next_goal_id: 0,
            geometry_binders: Vec::new(),
            current_iteration: 0,
            handle_node_index: None,
            nearest_node_index: None,
            pointer_ray: None,
            display: None,
        }
    }

    /// Registration options derived from the solver's parameters
    pub fn register_options(&self) -> RegisterOptions {
        RegisterOptions {
            node_merge_threshold: self.params.node_merge_threshold,
            keep_existing_node_indices: false,
        }
    }

    // =====================================================================================
    // Registration
    // =====================================================================================

    /// Register a goal with the solver's default options
    pub fn add_goal<G: Goal + 'static>(&mut self, goal: G) -> GoalId {
        let options = self.register_options();
        self.insert_goal(Box::new(goal), options)
    }

    /// Register a goal. `None` is accepted and ignored.
    pub fn register_goal(&mut self, goal: Option<Box<dyn Goal>>, options: RegisterOptions) -> Option<GoalId> {
        goal.map(|g| self.insert_goal(g, options))
    }

    /// Register goals in order, skipping `None` entries
    pub fn register_goals<I>(&mut self, goals: I, options: RegisterOptions) -> Vec<GoalId>
    where
        I: IntoIterator<Item = Option<Box<dyn Goal>>>,
    {
        goals
            .into_iter()
            .filter_map(|g| self.register_goal(g, options))
            .collect()
    }

    fn insert_goal(&mut self, mut goal: Box<dyn Goal>, options: RegisterOptions) -> GoalId {
        if options.keep_existing_node_indices {
            self.debug_check_indices(&goal.data().node_indices, goal.node_count());
        } else {
            let indices = self.match_nodes(&goal.data().starting_positions, options.node_merge_threshold);
            goal.data_mut().node_indices = indices;
        }

        let id = GoalId(self.next_goal_id);
        self.next_goal_id += 1;
        debug!(goal = id.0, node_indices = ?goal.data().node_indices, "registered goal");

        self.goals.push(goal);
        self.goal_ids.push(id);
        id
    }

    /// Register a binder with the solver's default options
    pub fn add_geometry_binder<B: GeometryBinder + 'static>(&mut self, binder: B) {
        let options = self.register_options();
        self.insert_geometry_binder(Box::new(binder), options);
    }

    /// Register a binder. `None` is accepted and ignored.
    pub fn register_geometry_binder(&mut self, binder: Option<Box<dyn GeometryBinder>>, options: RegisterOptions) {
        if let Some(b) = binder {
            self.insert_geometry_binder(b, options);
        }
    }

    pub fn register_geometry_binders<I>(&mut self, binders: I, options: RegisterOptions)
    where
        I: IntoIterator<Item = Option<Box<dyn GeometryBinder>>>,
    {
        for b in binders {
            self.register_geometry_binder(b, options);
        }
    }

    fn insert_geometry_binder(&mut self, mut binder: Box<dyn GeometryBinder>, options: RegisterOptions) {
        if options.keep_existing_node_indices {
            self.debug_check_indices(&binder.data().node_indices, binder.node_count());
        } else {
            let indices = self.match_nodes(&binder.data().starting_positions, options.node_merge_threshold);
            binder.data_mut().node_indices = indices;
        }
        debug!(node_indices = ?binder.data().node_indices, "registered geometry binder");
        self.geometry_binders.push(binder);
    }

    /// Map each starting position to a node index, appending nodes as needed.
    ///
    /// Existing nodes are scanned in insertion order and the first one whose
    /// current position lies within `threshold` wins, even if a later node is
    /// closer.
    fn match_nodes(&mut self, starting_positions: &[NVec3], threshold: f32) -> Vec<usize> {
        let threshold2 = threshold * threshold;

        starting_positions
            .iter()
            .map(|start| {
                let existing = self
                    .nodes
                    .iter()
                    .position(|node| (start - node.position).norm_squared() < threshold2);

                existing.unwrap_or_else(|| {
                    self.nodes.push(Node::new(*start));
                    debug!(index = self.nodes.len() - 1, position = ?start, "created node");
                    self.nodes.len() - 1
                })
            })
            .collect()
    }

    fn debug_check_indices(&self, indices: &[usize], node_count: usize) {
        debug_assert_eq!(indices.len(), node_count, "node index count does not match node count");
        debug_assert!(
            indices.iter().all(|&i| i < self.nodes.len()),
            "node index out of range"
        );
    }

    /// Remove a goal. Its nodes stay in the node array.
    pub fn remove_goal(&mut self, id: GoalId) -> Option<Box<dyn Goal>> {
        let pos = self.goal_ids.iter().position(|g| *g == id)?;
        self.goal_ids.remove(pos);
        Some(self.goals.remove(pos))
    }

    /// Drop every node, goal and binder
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.goals.clear();
        self.goal_ids.clear();
        self.geometry_binders.clear();
        self.current_iteration = 0;
        // indices into the old node array are meaningless now
        self.handle_node_index = None;
        self.nearest_node_index = None;
    }

    /// Move every node back to its starting position, at rest
    pub fn reset(&mut self) {
        self.current_iteration = 0;
        for node in self.nodes.iter_mut() {
            node.reset();
        }
    }

    // =====================================================================================
    // Iteration
    // =====================================================================================

    pub fn iterate(&mut self) {
        self.current_iteration += 1;
        let manipulation = self.manipulation();
        relaxation_step(&mut self.nodes, &mut self.goals, manipulation.as_ref(), &self.params);
    }

    pub fn iterate_n(&mut self, iterations: usize) {
        for _ in 0..iterations {
            self.iterate();
        }
    }

    /// Iterate until `budget` of wall-clock time has elapsed
    pub fn iterate_for(&mut self, budget: Duration) {
        let start = Instant::now();
        while start.elapsed() < budget {
            self.iterate();
        }
    }

    /// Iterate until `current_iteration` reaches `max_iterations` or the
    /// kinetic energy after an iteration drops below `ke_threshold`.
    /// Returns the number of iterations performed by this call.
    pub fn execute(&mut self, max_iterations: usize, ke_threshold: f32) -> usize {
        let first = self.current_iteration;
        while self.current_iteration < max_iterations {
            self.iterate();
            if self.kinetic_energy() < ke_threshold {
                info!(
                    iteration = self.current_iteration,
                    kinetic_energy = self.kinetic_energy(),
                    "kinetic energy below threshold"
                );
                break;
            }
        }
        self.current_iteration - first
    }

    fn manipulation(&self) -> Option<Manipulation> {
        let node = self.handle_node_index?;
        let (ray_origin, ray_direction) = self.pointer_ray?;
        Some(Manipulation {
            node,
            ray_origin,
            ray_direction,
            weight: self.params.manipulation_weight,
        })
    }

    // =====================================================================================
    // Metrics
    // =====================================================================================

    /// Sum of squared node speeds
    pub fn kinetic_energy(&self) -> f32 {
        self.nodes.iter().map(|n| n.velocity.norm_squared()).sum()
    }

    /// Length of the largest move applied in the last iteration
    pub fn largest_move(&self) -> f32 {
        self.nodes
            .iter()
            .map(|n| n.last_move.norm())
            .fold(0.0, f32::max)
    }

    // =====================================================================================
    // Queries
    // =====================================================================================

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn current_iteration(&self) -> usize {
        self.current_iteration
    }

    pub fn goal_count(&self) -> usize {
        self.goals.len()
    }

    pub fn goal_ids(&self) -> &[GoalId] {
        &self.goal_ids
    }

    pub fn goal(&self, id: GoalId) -> Option<&dyn Goal> {
        let pos = self.goal_ids.iter().position(|g| *g == id)?;
        Some(self.goals[pos].as_ref())
    }

    pub fn geometry_binders(&self) -> &[Box<dyn GeometryBinder>] {
        &self.geometry_binders
    }

    pub fn geometry_binders_mut(&mut self) -> &mut [Box<dyn GeometryBinder>] {
        &mut self.geometry_binders
    }

    pub fn node_positions(&self) -> Vec<NVec3> {
        self.nodes.iter().map(|n| n.position).collect()
    }

    pub fn node_velocities(&self) -> Vec<NVec3> {
        self.nodes.iter().map(|n| n.velocity).collect()
    }

    /// Node positions grouped per goal, in each goal's slot order
    pub fn structured_node_positions(&self) -> Vec<Vec<NVec3>> {
        self.goals
            .iter()
            .map(|g| {
                g.data()
                    .node_indices
                    .iter()
                    .map(|&i| self.nodes[i].position)
                    .collect()
            })
            .collect()
    }

    /// Geometry of every visible registered binder
    pub fn geometries(&self) -> Vec<Vec<Geometry>> {
        self.geometries_of(&self.geometry_binders)
    }

    /// Geometry of every visible binder in `binders`, evaluated on this solver's nodes
    pub fn geometries_of(&self, binders: &[Box<dyn GeometryBinder>]) -> Vec<Vec<Geometry>> {
        binders
            .iter()
            .filter(|b| b.show())
            .map(|b| b.create_geometry(&self.nodes))
            .collect()
    }

    /// Geometry of a single binder, visible or not
    pub fn geometry_of(&self, binder: &dyn GeometryBinder) -> Vec<Geometry> {
        binder.create_geometry(&self.nodes)
    }

    pub fn goal_outputs(&self) -> Vec<Vec<GoalOutput>> {
        self.goals.iter().map(|g| g.outputs(&self.nodes)).collect()
    }

    // =====================================================================================
    // Display
    // =====================================================================================

    pub fn attach_display(&mut self, display: Arc<dyn DisplaySink>) {
        self.display = Some(display);
    }

    pub fn detach_display(&mut self) -> Option<Arc<dyn DisplaySink>> {
        self.display.take()
    }

    pub fn display(&self) -> Option<&Arc<dyn DisplaySink>> {
        self.display.as_ref()
    }

    pub fn render(&self) {
        if let Some(d) = &self.display {
            d.render(self, false);
        }
    }

    pub(crate) fn render_fast(&self) {
        if let Some(d) = &self.display {
            d.render(self, true);
        }
    }

    pub fn clear_render(&self) {
        if let Some(d) = &self.display {
            d.clear();
        }
    }

    /// Stop rendering and drop all state
    pub fn dispose(&mut self) {
        self.clear_render();
        self.clear();
        self.pointer_ray = None;
        self.display = None;
    }
}
