//! Configuration types for loading relaxation scenarios from YAML.
//!
//! A scenario consists of:
//!
//! - [`SolverConfig`]  – solver switches (momentum, damping, batch size, ...)
//! - [`RunConfig`]     – stopping criteria for a one-shot `execute`
//! - [`GoalConfig`]    – one entry per goal, tagged by `type`
//! - [`BinderConfig`]  – one entry per geometry binder, tagged by `type`
//! - [`ScenarioConfig`] – top-level wrapper
//!
//! # YAML format
//! A single bar hanging from one anchored end:
//!
//! ```yaml
//! solver:
//!   enable_momentum: true
//!   damping_factor: 0.98     # velocity multiplier per iteration
//!   node_merge_threshold: 1.0e-4
//!
//! run:
//!   max_iterations: 500
//!   ke_threshold: 1.0e-8
//!
//! goals:
//!   - type: anchor
//!     position: [0.0, 0.0, 0.0]
//!   - type: length
//!     start: [0.0, 0.0, 0.0]
//!     end: [1.0, 0.0, 0.0]
//!   - type: constant
//!     positions: [[1.0, 0.0, 0.0]]
//!     constant: [0.0, 0.0, -0.01]
//!
//! binders:
//!   - type: line
//!     start: [0.0, 0.0, 0.0]
//!     end: [1.0, 0.0, 0.0]
//! ```
//!
//! Missing `solver` fields fall back to the engine defaults.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{RelaxError, RelaxResult};
use crate::simulation::params::{
    Parameters, DEFAULT_DAMPING_FACTOR, DEFAULT_MANIPULATION_WEIGHT, DEFAULT_NODE_MERGE_THRESHOLD,
    DEFAULT_PICK_RANGE, DEFAULT_STOP_TIMEOUT, DEFAULT_TIME_BOX,
};

/// Solver switches. Every field is optional in YAML.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub enable_mouse_interaction: bool,
    pub enable_momentum: bool,
    pub enable_fast_display: bool,
    pub damping_factor: f32, // in [0, 1]
    pub iteration_count: usize, // background batch size, 0 = time boxed
    pub node_merge_threshold: f32,
    pub manipulation_weight: f32,
    pub pick_range: f32,
    pub time_box_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for SolverConfig {
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
            time_box_ms: DEFAULT_TIME_BOX.as_millis() as u64,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SolverConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> RelaxResult<()> {
        if !(0.0..=1.0).contains(&self.damping_factor) {
            return Err(RelaxError::Config(format!(
                "damping_factor must be in [0, 1], got {}",
                self.damping_factor
            )));
        }
        if !(self.node_merge_threshold >= 0.0) {
            return Err(RelaxError::Config(format!(
                "node_merge_threshold must be >= 0, got {}",
                self.node_merge_threshold
            )));
        }
        if !(self.manipulation_weight >= 0.0) {
            return Err(RelaxError::Config(format!(
                "manipulation_weight must be >= 0, got {}",
                self.manipulation_weight
            )));
        }
        if !(self.pick_range >= 0.0) {
            return Err(RelaxError::Config(format!(
                "pick_range must be >= 0, got {}",
                self.pick_range
            )));
        }
        if self.iteration_count == 0 && self.time_box_ms == 0 {
            return Err(RelaxError::Config(
                "time_box_ms must be > 0 when iteration_count is 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Runtime parameters for the solver
    pub fn to_parameters(&self) -> Parameters {
        Parameters {
            enable_mouse_interaction: self.enable_mouse_interaction,
            enable_momentum: self.enable_momentum,
            enable_fast_display: self.enable_fast_display,
            damping_factor: self.damping_factor,
            iteration_count: self.iteration_count,
            node_merge_threshold: self.node_merge_threshold,
            manipulation_weight: self.manipulation_weight,
            pick_range: self.pick_range,
            time_box: Duration::from_millis(self.time_box_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

/// Stopping criteria for `Solver::execute`
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub max_iterations: usize,
    pub ke_threshold: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ke_threshold: 1e-10,
        }
    }
}

/// One goal of a scenario. `weight` overrides the goal's default weight.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalConfig {
    Anchor {
        position: [f32; 3],
        anchor: Option<[f32; 3]>, // defaults to `position`
        weight: Option<f32>,
    },
    Constant {
        positions: Vec<[f32; 3]>,
        constant: [f32; 3],
        weight: Option<f32>,
    },
    Length {
        start: [f32; 3],
        end: [f32; 3],
        length: Option<f32>, // defaults to the initial distance
        weight: Option<f32>,
    },
    OnPlane {
        positions: Vec<[f32; 3]>,
        origin: [f32; 3],
        normal: [f32; 3],
        weight: Option<f32>,
    },
    Merge {
        positions: Vec<[f32; 3]>,
        weight: Option<f32>,
    },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BinderConfig {
    Point {
        positions: Vec<[f32; 3]>,
        #[serde(default = "default_show")]
        show: bool,
    },
    Line {
        start: [f32; 3],
        end: [f32; 3],
        #[serde(default = "default_show")]
        show: bool,
    },
    Polyline {
        vertices: Vec<[f32; 3]>,
        #[serde(default)]
        closed: bool,
        #[serde(default = "default_show")]
        show: bool,
    },
}

fn default_show() -> bool {
    true
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub goals: Vec<GoalConfig>,
    #[serde(default)]
    pub binders: Vec<BinderConfig>,
}

impl ScenarioConfig {
    pub fn from_yaml(yaml: &str) -> RelaxResult<Self> {
        let cfg: ScenarioConfig = serde_yaml::from_str(yaml)?;
        cfg.solver.validate()?;
        Ok(cfg)
    }
}

/// Read and validate a scenario file
pub fn load_scenario(path: &Path) -> RelaxResult<ScenarioConfig> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let cfg: ScenarioConfig = serde_yaml::from_reader(reader)?;
    cfg.solver.validate()?;
    debug!(path = %path.display(), goals = cfg.goals.len(), binders = cfg.binders.len(), "loaded scenario");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scenario_uses_defaults() {
        let cfg = ScenarioConfig::from_yaml("{}").unwrap();
        assert_eq!(cfg.solver, SolverConfig::default());
        assert!(cfg.goals.is_empty());

        let params = cfg.solver.to_parameters();
        assert_eq!(params.damping_factor, 0.98);
        assert_eq!(params.time_box, Duration::from_millis(25));
        assert_eq!(params.stop_timeout, Duration::from_millis(300));
    }

    #[test]
    fn parses_tagged_goals_and_binders() {
        let yaml = r#"
solver:
  enable_momentum: false
goals:
  - type: length
    start: [0.0, 0.0, 0.0]
    end: [2.0, 0.0, 0.0]
    length: 0.0
    weight: 1000.0
  - type: on_plane
    positions: [[0.0, 0.0, 1.0]]
    origin: [0.0, 0.0, 0.0]
    normal: [0.0, 0.0, 1.0]
binders:
  - type: polyline
    vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
    show: false
"#;
        let cfg = ScenarioConfig::from_yaml(yaml).unwrap();

        assert!(!cfg.solver.enable_momentum);
        assert_eq!(
            cfg.goals[0],
            GoalConfig::Length {
                start: [0.0, 0.0, 0.0],
                end: [2.0, 0.0, 0.0],
                length: Some(0.0),
                weight: Some(1000.0),
            }
        );
        assert!(matches!(cfg.goals[1], GoalConfig::OnPlane { weight: None, .. }));
        assert!(matches!(cfg.binders[0], BinderConfig::Polyline { closed: false, show: false, .. }));
    }

    #[test]
    fn rejects_damping_out_of_range() {
        let err = ScenarioConfig::from_yaml("solver:\n  damping_factor: 1.5\n").unwrap_err();
        assert!(matches!(err, RelaxError::Config(_)));
    }

    #[test]
    fn rejects_unknown_goal_type() {
        let yaml = "goals:\n  - type: spring\n    start: [0.0, 0.0, 0.0]\n";
        assert!(matches!(ScenarioConfig::from_yaml(yaml), Err(RelaxError::Yaml(_))));
    }
}
