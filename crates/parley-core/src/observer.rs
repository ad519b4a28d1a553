//! Step observers: the driver's hook for progress reporting.

use crate::bcn::StepReport;
use crate::state::State;

/// Callback invoked after each bargaining step.
///
/// Implementations can use this to print progress, collect statistics,
/// etc. The callback receives the step report and the newly appended state
/// (whose utilities are not yet computed).
pub trait StepObserver: Send {
    /// Called after a step completes successfully.
    fn on_step(&mut self, report: &StepReport, state: &State);
}

/// A no-op step observer.
pub struct NoOpObserver;

impl StepObserver for NoOpObserver {
    fn on_step(&mut self, _report: &StepReport, _state: &State) {}
}
