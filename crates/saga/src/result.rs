//! Terminal outcome of a saga run.

use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::state::SagaState;

/// A compensation failure recorded during the compensation sweep.
///
/// Surfaced separately from the original failure: it means a resource
/// is now in an inconsistent state and needs operator attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationError {
    /// The step whose compensation failed.
    pub step: String,
    /// Why the compensation failed.
    pub reason: String,
}

impl std::fmt::Display for CompensationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compensation of '{}' failed: {}", self.step, self.reason)
    }
}

/// Terminal result of one saga run.
///
/// Either full success with the final context, or a compensated
/// failure carrying the originating step and error, the steps that
/// were compensated, and any compensation errors. There is no silent
/// partial-completion outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SagaResult {
    /// All steps completed.
    Completed {
        /// The final context with every effect flag set.
        context: SagaContext,
    },

    /// A step failed (or the run was cancelled) and completed steps
    /// were compensated in reverse order.
    Compensated {
        /// The step that failed, or the step a cancelled run stopped
        /// before.
        failed_step: String,
        /// The original failure description.
        reason: String,
        /// True when the run was cancelled between steps rather than
        /// failed by a step.
        cancelled: bool,
        /// Steps whose compensation was attempted, in the order of the
        /// compensation sweep (reverse completion order).
        compensated: Vec<String>,
        /// Compensation failures, collected without halting the sweep.
        compensation_errors: Vec<CompensationError>,
        /// The context after compensation.
        context: SagaContext,
    },
}

impl SagaResult {
    /// Returns true if every step completed.
    pub fn is_success(&self) -> bool {
        matches!(self, SagaResult::Completed { .. })
    }

    /// The terminal [`SagaState`] the run ended in.
    pub fn state(&self) -> SagaState {
        match self {
            SagaResult::Completed { .. } => SagaState::Completed,
            SagaResult::Compensated { .. } => SagaState::Compensated,
        }
    }

    /// Returns the failing step's name for a compensated run.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            SagaResult::Completed { .. } => None,
            SagaResult::Compensated { failed_step, .. } => Some(failed_step),
        }
    }

    /// Returns true if the run was cancelled between steps.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SagaResult::Compensated { cancelled: true, .. })
    }

    /// Returns the final context.
    pub fn context(&self) -> &SagaContext {
        match self {
            SagaResult::Completed { context } => context,
            SagaResult::Compensated { context, .. } => context,
        }
    }

    /// Returns the compensation errors (empty on success).
    pub fn compensation_errors(&self) -> &[CompensationError] {
        match self {
            SagaResult::Completed { .. } => &[],
            SagaResult::Compensated {
                compensation_errors,
                ..
            } => compensation_errors,
        }
    }

    /// Returns true if a compensated run undid every completed step
    /// without a compensation error. Always false for a success.
    pub fn fully_compensated(&self) -> bool {
        match self {
            SagaResult::Completed { .. } => false,
            SagaResult::Compensated {
                compensation_errors,
                ..
            } => compensation_errors.is_empty(),
        }
    }
}
