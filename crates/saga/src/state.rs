//! Run lifecycle states.

/// Lifecycle of a single saga run.
///
/// A run moves forward from `NotStarted` into exactly one of the two
/// terminal states:
///
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Compensating ──► Compensated
/// ```
///
/// The orchestrator drives its run loop through
/// [`transition`](Self::transition), which rejects any move outside
/// this diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SagaState {
    /// Run has not started yet.
    #[default]
    NotStarted,
    /// Steps are being executed.
    Running,
    /// A step failed and compensating actions are in progress.
    Compensating,
    /// All steps completed successfully (terminal).
    Completed,
    /// Compensation finished after a failure (terminal).
    Compensated,
}

impl SagaState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        use SagaState::*;
        matches!(
            (self, next),
            (NotStarted, Running)
                | (Running, Completed)
                | (Running, Compensating)
                | (Compensating, Compensated)
        )
    }

    /// Advances to `next`. Illegal moves are a logic error in the
    /// caller's run loop.
    pub fn transition(&mut self, next: SagaState) {
        debug_assert!(
            self.can_transition_to(next),
            "illegal saga state transition {self} -> {next}"
        );
        *self = next;
    }

    /// Returns true once the run can no longer progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Compensated)
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SagaState::NotStarted => "NotStarted",
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Compensated => "Compensated",
        };
        f.write_str(name)
    }
}
