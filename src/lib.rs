pub mod simulation;
pub mod configuration;
pub mod benchmark;
pub mod error;
#[cfg(feature = "viewer")]
pub mod visualization;

pub use simulation::states::{Node, NVec3};
pub use simulation::params::Parameters;
pub use simulation::goals::{Goal, GoalData, GoalId, GoalOutput, AnchorGoal, ConstantGoal, LengthGoal, OnPlaneGoal, MergeGoal};
pub use simulation::binders::{Geometry, GeometryBinder, BinderData, PointBinder, LineBinder, PolylineBinder};
pub use simulation::engine::{Solver, RegisterOptions};
pub use simulation::integrator::{relaxation_step, Manipulation};
pub use simulation::interaction::{find_nearest_node, InteractionContext, InteractionState};
pub use simulation::display::DisplaySink;
pub use simulation::background::{BackgroundSolver, StopOutcome};
pub use simulation::scenario::{Scenario, hanging_chain};

pub use configuration::config::{SolverConfig, RunConfig, GoalConfig, BinderConfig, ScenarioConfig, load_scenario};

pub use error::{RelaxError, RelaxResult};

pub use benchmark::benchmark::{bench_iterate, bench_iterate_curve};
