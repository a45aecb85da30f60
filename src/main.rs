use dynarelax::{load_scenario, BackgroundSolver, Scenario, ScenarioConfig, Solver};
use dynarelax::{bench_iterate, bench_iterate_curve};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Relax a scenario of geometric goals and print the node positions")]
struct Args {
    /// Scenario file, looked up under `scenarios/` unless it is an existing path
    #[arg(short, long = "file", default_value = "hanging_chain.yaml")]
    file_name: String,

    /// Override the scenario's iteration cap
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Override the scenario's kinetic energy threshold
    #[arg(long)]
    ke_threshold: Option<f32>,

    /// Run on the background worker for this many milliseconds instead of `execute`
    #[arg(long)]
    background_ms: Option<u64>,

    /// Run the iteration benchmarks and exit
    #[arg(long)]
    bench: bool,

    /// Open the interactive 3D viewer
    #[cfg(feature = "viewer")]
    #[arg(long)]
    view: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let direct = PathBuf::from(file_name);
    let config_path = if direct.is_file() {
        direct
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
    };

    load_scenario(&config_path).with_context(|| format!("failed to load scenario {}", config_path.display()))
}

fn report(solver: &Solver) {
    println!("iterations:     {}", solver.current_iteration());
    println!("kinetic energy: {:e}", solver.kinetic_energy());
    println!("largest move:   {:e}", solver.largest_move());
    for (i, p) in solver.node_positions().iter().enumerate() {
        println!("node {i:4}: {:10.5} {:10.5} {:10.5}", p.x, p.y, p.z);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.bench {
        bench_iterate();
        bench_iterate_curve();
        return Ok(());
    }

    let scenario = Scenario::build(load_scenario_from_yaml(&args.file_name)?);

    #[cfg(feature = "viewer")]
    if args.view {
        dynarelax::visualization::viewer3d::run_viewer(scenario.solver);
        return Ok(());
    }

    let Scenario { mut solver, run } = scenario;
    let max_iterations = args.max_iterations.unwrap_or(run.max_iterations);
    let ke_threshold = args.ke_threshold.unwrap_or(run.ke_threshold);

    match args.background_ms {
        Some(ms) => {
            let mut runner = BackgroundSolver::new(solver);
            runner.start()?;
            thread::sleep(Duration::from_millis(ms));
            let outcome = runner.stop()?;
            info!(?outcome, "background run finished");
            runner.with_solver(|s| report(s));
        }
        None => {
            let performed = solver.execute(max_iterations, ke_threshold);
            info!(performed, "execute finished");
            report(&solver);
        }
    }

    Ok(())
}
