//! Step observer that logs run progress.

use parley_core::{State, StepObserver, StepReport};
use tracing::debug;

/// Logs each step and remembers how many steps hit degenerate risk.
#[derive(Debug, Default)]
pub struct ProgressObserver {
    degenerate_steps: u32,
}

impl ProgressObserver {
    /// Steps whose risk inference was degenerate.
    pub const fn degenerate_steps(&self) -> u32 {
        self.degenerate_steps
    }
}

impl StepObserver for ProgressObserver {
    fn on_step(&mut self, report: &StepReport, state: &State) {
        if report.degenerate_risk {
            self.degenerate_steps = self.degenerate_steps.saturating_add(1);
        }
        debug!(
            state = state.index(),
            proposals = report.proposals,
            adopted = report.adopted(),
            degenerate_risk = report.degenerate_risk,
            "Progress"
        );
    }
}
