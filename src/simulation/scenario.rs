//! Build fully-initialized solvers from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a `Scenario`
//! containing:
//! - a `Solver` configured from the `solver` section,
//! - every configured goal and binder registered (nodes deduplicated),
//! - the stopping criteria for a one-shot run

use tracing::info;

use crate::configuration::config::{BinderConfig, GoalConfig, RunConfig, ScenarioConfig, SolverConfig};
use crate::simulation::binders::{GeometryBinder, LineBinder, PointBinder, PolylineBinder};
use crate::simulation::engine::Solver;
use crate::simulation::goals::{AnchorGoal, ConstantGoal, Goal, LengthGoal, MergeGoal, OnPlaneGoal};
use crate::simulation::states::NVec3;

pub struct Scenario {
    pub solver: Solver,
    pub run: RunConfig,
}

impl Scenario {
    pub fn build(cfg: ScenarioConfig) -> Self {
        let mut solver = Solver::new(cfg.solver.to_parameters());
        let options = solver.register_options();

        // Goals: map `GoalConfig` -> boxed runtime goal
        solver.register_goals(cfg.goals.iter().map(|g| Some(build_goal(g))), options);

        // Binders: map `BinderConfig` -> boxed runtime binder
        solver.register_geometry_binders(cfg.binders.iter().map(|b| Some(build_binder(b))), options);

        info!(
            nodes = solver.nodes().len(),
            goals = solver.goal_count(),
            binders = solver.geometry_binders().len(),
            "scenario built"
        );

        Self {
            solver,
            run: cfg.run,
        }
    }
}

fn v(p: &[f32; 3]) -> NVec3 {
    NVec3::from(*p)
}

fn vs(ps: &[[f32; 3]]) -> Vec<NVec3> {
    ps.iter().map(v).collect()
}

fn build_goal(cfg: &GoalConfig) -> Box<dyn Goal> {
    match cfg {
        GoalConfig::Anchor { position, anchor, weight } => Box::new(AnchorGoal::with_anchor(
            v(position),
            anchor.as_ref().map_or(v(position), v),
            weight.unwrap_or(AnchorGoal::DEFAULT_WEIGHT),
        )),
        GoalConfig::Constant { positions, constant, weight } => Box::new(ConstantGoal::with_weight(
            vs(positions),
            v(constant),
            weight.unwrap_or(ConstantGoal::DEFAULT_WEIGHT),
        )),
        GoalConfig::Length { start, end, length, weight } => {
            let (a, b) = (v(start), v(end));
            Box::new(LengthGoal::with_length(
                a,
                b,
                length.unwrap_or_else(|| (b - a).norm()),
                weight.unwrap_or(LengthGoal::DEFAULT_WEIGHT),
            ))
        }
        GoalConfig::OnPlane { positions, origin, normal, weight } => Box::new(OnPlaneGoal::new(
            vs(positions),
            v(origin),
            v(normal),
            weight.unwrap_or(OnPlaneGoal::DEFAULT_WEIGHT),
        )),
        GoalConfig::Merge { positions, weight } => {
            let mut goal = MergeGoal::new(vs(positions));
            if let Some(w) = weight {
                goal.data_mut().set_weight(*w);
            }
            Box::new(goal)
        }
    }
}

fn build_binder(cfg: &BinderConfig) -> Box<dyn GeometryBinder> {
    let mut binder: Box<dyn GeometryBinder> = match cfg {
        BinderConfig::Point { positions, .. } => Box::new(PointBinder::new(vs(positions))),
        BinderConfig::Line { start, end, .. } => Box::new(LineBinder::new(v(start), v(end))),
        BinderConfig::Polyline { vertices, closed, .. } => Box::new(PolylineBinder::new(vs(vertices), *closed)),
    };
    binder.data_mut().show = match cfg {
        BinderConfig::Point { show, .. }
        | BinderConfig::Line { show, .. }
        | BinderConfig::Polyline { show, .. } => *show,
    };
    binder
}

/// A chain of `node_count` nodes spaced one unit apart along x, joined by
/// unit length goals, anchored at both ends and pulled by `gravity`.
pub fn hanging_chain(node_count: usize, gravity: [f32; 3], solver: SolverConfig) -> ScenarioConfig {
    let points: Vec<[f32; 3]> = (0..node_count).map(|i| [i as f32, 0.0, 0.0]).collect();

    let mut goals = Vec::with_capacity(node_count + 2);
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        goals.push(GoalConfig::Anchor { position: *first, anchor: None, weight: None });
        goals.push(GoalConfig::Anchor { position: *last, anchor: None, weight: None });
    }
    for pair in points.windows(2) {
        goals.push(GoalConfig::Length {
            start: pair[0],
            end: pair[1],
            length: Some(1.0),
            weight: None,
        });
    }
    goals.push(GoalConfig::Constant {
        positions: points.clone(),
        constant: gravity,
        weight: None,
    });

    ScenarioConfig {
        solver,
        run: RunConfig::default(),
        goals,
        binders: vec![BinderConfig::Polyline {
            vertices: points,
            closed: false,
            show: true,
        }],
    }
}
