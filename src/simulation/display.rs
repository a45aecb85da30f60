//! Display collaborator interface
//!
//! The solver never draws anything itself. A host that wants to show the
//! nodes attaches a [`DisplaySink`]; the background worker calls it after
//! every batch when fast display is enabled.

use std::time::Duration;

use super::engine::Solver;

pub trait DisplaySink: Send + Sync {
    /// Called with the solver locked, so implementations should copy what
    /// they need and return quickly. `fast` is set for the per-batch push
    /// from the background worker.
    fn render(&self, solver: &Solver, fast: bool);

    fn clear(&self) {}

    /// Wait up to `timeout` for any dispatched frame to be consumed.
    /// Returns `false` if frames were still pending when the wait ended.
    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}
