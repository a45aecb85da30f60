use std::time::Instant;

use crate::configuration::config::{GoalConfig, ScenarioConfig, SolverConfig};
use crate::simulation::engine::Solver;
use crate::simulation::scenario::{hanging_chain, Scenario};

const GRAVITY: [f32; 3] = [0.0, 0.0, -0.01];

/// Helper to build a chain solver with `n` nodes
fn make_chain(n: usize) -> Solver {
    Scenario::build(hanging_chain(n, GRAVITY, SolverConfig::default())).solver
}

/// Helper to build an `n` x `n` cable net, anchored at its four corners
fn make_net(n: usize) -> Solver {
    let p = |i: usize, j: usize| [i as f32, j as f32, 0.0];
    let mut goals = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i + 1 < n {
                goals.push(GoalConfig::Length { start: p(i, j), end: p(i + 1, j), length: None, weight: None });
            }
            if j + 1 < n {
                goals.push(GoalConfig::Length { start: p(i, j), end: p(i, j + 1), length: None, weight: None });
            }
        }
    }
    for (i, j) in [(0, 0), (0, n - 1), (n - 1, 0), (n - 1, n - 1)] {
        goals.push(GoalConfig::Anchor { position: p(i, j), anchor: None, weight: None });
    }
    goals.push(GoalConfig::Constant {
        positions: (0..n).flat_map(|i| (0..n).map(move |j| p(i, j))).collect(),
        constant: GRAVITY,
        weight: None,
    });

    let cfg = ScenarioConfig { goals, ..Default::default() };
    Scenario::build(cfg).solver
}

pub fn bench_iterate() {
    // Different net sizes to test
    let ns = [10, 20, 40, 80];
    let steps = 20;

    for n in ns {
        let mut solver = make_net(n);

        // Warm up
        solver.iterate();

        let t0 = Instant::now();
        solver.iterate_n(steps);
        let per_step = t0.elapsed().as_secs_f64() / steps as f64;

        println!(
            "net {n:4} x {n:<4} nodes = {:7}, goals = {:7}, iterate = {:10.6} s",
            solver.nodes().len(),
            solver.goal_count(),
            per_step
        );
    }
}

/// Time one chain iteration for a range of chain lengths
/// Paste output directly into excel to graph
pub fn bench_iterate_curve() {
    println!("nodes,iterate_ms");

    // Registration scans existing nodes, so keep n modest
    for n in (200..=4000).step_by(200) {
        let mut solver = make_chain(n);

        // Small n: average over a few steps to smooth noise
        let steps = if n <= 1000 { 20 } else { 5 };

        let t0 = Instant::now();
        solver.iterate_n(steps);
        let ms = t0.elapsed().as_secs_f64() * 1000.0 / steps as f64;

        println!("{},{:.6}", n, ms);
    }
}
