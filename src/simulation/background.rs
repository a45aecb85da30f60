//! Continuous iteration on a worker thread
//!
//! `BackgroundSolver` shares a [`Solver`] behind a mutex with one worker
//! thread. The worker runs a batch (a fixed iteration count, or a time box
//! when the count is zero), optionally pushes a fast display update, then
//! checks its cancellation flag. The host talks to the solver between
//! batches through [`BackgroundSolver::with_solver`].

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::display::DisplaySink;
use super::engine::Solver;
use crate::error::{RelaxError, RelaxResult};

/// Result of [`BackgroundSolver::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No worker was running
    NotRunning,
    Stopped,
    /// The worker saw the cancellation too late and is still finishing its
    /// batch. It exits on its own; `is_running` reports when it has.
    TimedOut,
}

pub struct BackgroundSolver {
    solver: Arc<Mutex<Solver>>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    // snapshot taken at `start`, so `stop` never waits on the solver lock
    stop_timeout: Duration,
    display: Option<Arc<dyn DisplaySink>>,
}

impl BackgroundSolver {
    pub fn new(solver: Solver) -> Self {
        let stop_timeout = solver.params.stop_timeout;
        let display = solver.display().cloned();
        Self {
            solver: Arc::new(Mutex::new(solver)),
            cancel: Arc::new(AtomicBool::new(false)),
            worker: None,
            stop_timeout,
            display,
        }
    }

    /// Shared handle to the solver, e.g. for a display thread
    pub fn solver(&self) -> Arc<Mutex<Solver>> {
        Arc::clone(&self.solver)
    }

    /// Run `f` with exclusive access to the solver. Blocks while a batch is
    /// in progress.
    pub fn with_solver<R>(&self, f: impl FnOnce(&mut Solver) -> R) -> R {
        let mut solver = lock_solver(&self.solver);
        f(&mut solver)
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Launch the worker. Returns `Ok(false)` if it was already running.
    ///
    /// A previous worker that exited on its own is reaped first. If it
    /// failed, its fault is returned and nothing is started; the next call
    /// starts normally.
    ///
    /// The stop timeout and the attached display are read here; changes
    /// made while the worker runs apply from the next `start`.
    pub fn start(&mut self) -> RelaxResult<bool> {
        if self.is_running() {
            return Ok(false);
        }

        if let Some(previous) = self.worker.take() {
            if let Err(panic) = previous.join() {
                let reason = panic_message(&*panic);
                error!(%reason, "previous background worker had failed");
                return Err(RelaxError::WorkerFault(reason));
            }
        }

        {
            let solver = lock_solver(&self.solver);
            self.stop_timeout = solver.params.stop_timeout;
            self.display = solver.display().cloned();
        }

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Arc::clone(&cancel);
        let solver = Arc::clone(&self.solver);

        let handle = thread::Builder::new()
            .name("dynarelax-worker".to_string())
            .spawn(move || run_batches(&solver, &cancel))
            .map_err(RelaxError::WorkerSpawn)?;

        self.worker = Some(handle);
        info!("background execution started");
        Ok(true)
    }

    /// Signal the worker and wait, bounded by `params.stop_timeout`, for it
    /// to exit and then for the display to flush. Never takes the solver
    /// lock, so a long batch cannot hold it up.
    pub fn stop(&mut self) -> RelaxResult<StopOutcome> {
        let Some(handle) = self.worker.take() else {
            return Ok(StopOutcome::NotRunning);
        };

        self.cancel.store(true, Ordering::SeqCst);

        let timeout = self.stop_timeout;
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        let outcome = if handle.is_finished() {
            match handle.join() {
                Ok(()) => StopOutcome::Stopped,
                Err(panic) => {
                    let reason = panic_message(&*panic);
                    error!(%reason, "background worker failed");
                    return Err(RelaxError::WorkerFault(reason));
                }
            }
        } else {
            warn!(?timeout, "background worker did not stop in time");
            self.worker = Some(handle);
            StopOutcome::TimedOut
        };

        if let Some(display) = &self.display {
            if !display.flush(timeout) {
                warn!(?timeout, "display did not flush in time");
            }
        }

        info!(?outcome, "background execution stopped");
        Ok(outcome)
    }

    /// Stop the worker, clear the solver and detach its display.
    ///
    /// Clearing needs the solver lock, so after a timed out stop this waits
    /// for the cancelled worker to finish its batch.
    pub fn dispose(&mut self) -> RelaxResult<()> {
        let stopped = self.stop();
        self.with_solver(|s| s.dispose());
        self.display = None;
        stopped.map(|_| ())
    }

    /// Host notification that the surrounding document went away
    pub fn on_workspace_cleared(&mut self) -> RelaxResult<()> {
        self.dispose()
    }
}

impl Drop for BackgroundSolver {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

/// Worker body. Cancellation is checked between batches only.
fn run_batches(solver: &Mutex<Solver>, cancel: &AtomicBool) {
    while !cancel.load(Ordering::SeqCst) {
        {
            let mut s = lock_solver(solver);
            let batch = s.params.iteration_count;
            if batch > 0 {
                s.iterate_n(batch);
            } else {
                let time_box = s.params.time_box;
                s.iterate_for(time_box);
            }

            if s.params.enable_fast_display {
                s.render_fast();
            }
        }
        // let the host take the lock between batches
        thread::yield_now();
    }
}

/// A batch that panicked leaves the mutex poisoned; the node state is still
/// usable (at worst one step partially applied), so keep going with it.
fn lock_solver(solver: &Mutex<Solver>) -> MutexGuard<'_, Solver> {
    solver.lock().unwrap_or_else(|poisoned| {
        warn!("solver lock poisoned by a failed batch");
        poisoned.into_inner()
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
