//! Central saga orchestrator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::result::{CompensationError, SagaResult};
use crate::state::SagaState;
use crate::step::SagaStep;

/// Cooperative cancellation flag checked between steps.
///
/// A run is never interrupted mid-step: setting the flag makes the
/// orchestrator treat the next step boundary as a failure and
/// compensate everything completed so far.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the run holding this flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Executes an ordered list of [`SagaStep`]s, compensating completed
/// steps in reverse order when one fails.
///
/// Constructed once per saga type and configured with its step
/// sequence up front; [`run`](Self::run) may then be invoked
/// repeatedly with fresh contexts. The orchestrator keeps no run-scoped
/// state of its own, so concurrent runs on one instance are
/// independent.
///
/// The orchestrator never retries a failed step: a failure is
/// definitive for the run and immediately triggers compensation. Retry
/// policy, if wanted, belongs inside a step's `execute`.
#[derive(Default)]
pub struct SagaOrchestrator {
    steps: Vec<Arc<dyn SagaStep>>,
}

impl SagaOrchestrator {
    /// Creates an orchestrator with no steps configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step to the execution order. Configuration-time only.
    pub fn add_step(&mut self, step: Arc<dyn SagaStep>) {
        self.steps.push(step);
    }

    /// Returns the number of configured steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Runs the saga over the given context.
    ///
    /// Returns `Err` only for precondition violations detected before
    /// any step executes (no steps configured, context without items).
    /// Step failures are an expected outcome and produce
    /// `Ok(SagaResult::Compensated { .. })`.
    #[tracing::instrument(skip(self, ctx), fields(run_id = %ctx.run_id()))]
    pub async fn run(&self, ctx: SagaContext) -> Result<SagaResult> {
        self.run_inner(ctx, None).await
    }

    /// Same as [`run`](Self::run), but checks the cancel flag between
    /// steps. A cancelled run compensates every completed step and
    /// reports `cancelled = true` in its result.
    #[tracing::instrument(skip(self, ctx, cancel), fields(run_id = %ctx.run_id()))]
    pub async fn run_cancellable(
        &self,
        ctx: SagaContext,
        cancel: &CancelFlag,
    ) -> Result<SagaResult> {
        self.run_inner(ctx, Some(cancel)).await
    }

    async fn run_inner(
        &self,
        mut ctx: SagaContext,
        cancel: Option<&CancelFlag>,
    ) -> Result<SagaResult> {
        if self.steps.is_empty() {
            return Err(SagaError::NoStepsConfigured);
        }
        if ctx.items().is_empty() {
            return Err(SagaError::InvalidContext("context has no items".to_string()));
        }

        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let mut state = SagaState::NotStarted;
        state.transition(SagaState::Running);

        // Per-run bookkeeping lives on the stack so concurrent runs
        // never share it.
        let mut completed: Vec<usize> = Vec::new();
        let mut failure: Option<(String, String, bool)> = None;

        for (idx, step) in self.steps.iter().enumerate() {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                let reason = SagaError::Cancelled {
                    at_step: step.name().to_string(),
                }
                .to_string();
                tracing::warn!(step = step.name(), "saga run cancelled");
                failure = Some((step.name().to_string(), reason, true));
                break;
            }

            tracing::info!(step = step.name(), "saga step started");
            match step.execute(&mut ctx).await {
                Ok(()) => {
                    completed.push(idx);
                    tracing::info!(step = step.name(), "saga step completed");
                }
                Err(e) => {
                    tracing::warn!(step = step.name(), error = %e, "saga step failed");
                    failure = Some((step.name().to_string(), e.to_string(), false));
                    break;
                }
            }
        }

        let result = match failure {
            None => {
                state.transition(SagaState::Completed);
                metrics::counter!("saga_completed").increment(1);
                SagaResult::Completed { context: ctx }
            }
            Some((failed_step, reason, cancelled)) => {
                state.transition(SagaState::Compensating);
                tracing::info!(state = %state, failed_step = %failed_step, "saga compensating");
                let (compensated, compensation_errors) =
                    self.compensate(&mut ctx, &completed).await;
                state.transition(SagaState::Compensated);
                metrics::counter!("saga_failed").increment(1);
                tracing::warn!(
                    failed_step = %failed_step,
                    compensated = compensated.len(),
                    compensation_errors = compensation_errors.len(),
                    "saga compensated"
                );
                SagaResult::Compensated {
                    failed_step,
                    reason,
                    cancelled,
                    compensated,
                    compensation_errors,
                    context: ctx,
                }
            }
        };

        debug_assert_eq!(state, result.state());
        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        tracing::info!(state = %state, duration, "saga run finished");

        Ok(result)
    }

    /// Compensates the completed steps in reverse insertion order.
    ///
    /// A compensation failure is collected but does not halt the
    /// sweep: every prior step gets its compensation attempt.
    async fn compensate(
        &self,
        ctx: &mut SagaContext,
        completed: &[usize],
    ) -> (Vec<String>, Vec<CompensationError>) {
        let mut compensated = Vec::with_capacity(completed.len());
        let mut errors = Vec::new();

        for &idx in completed.iter().rev() {
            let step = &self.steps[idx];
            match step.compensate(ctx).await {
                Ok(()) => {
                    tracing::info!(step = step.name(), "compensation step completed");
                }
                Err(e) => {
                    tracing::warn!(step = step.name(), error = %e, "compensation step failed");
                    errors.push(CompensationError {
                        step: step.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
            compensated.push(step.name().to_string());
        }

        (compensated, errors)
    }
}
