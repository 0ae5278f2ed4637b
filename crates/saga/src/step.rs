//! The saga step contract.

use async_trait::async_trait;

use crate::context::SagaContext;
use crate::error::Result;

/// One stage of a saga: a forward action and its compensating action.
///
/// Steps are held by the orchestrator in a fixed execution order and
/// consumed polymorphically; a step knows nothing about other steps
/// except through the shared [`SagaContext`].
///
/// Implementations perform their side effect through injected
/// collaborators (stores and gateways); the step itself contains no
/// transport logic, only the call plus context mutation.
#[async_trait]
pub trait SagaStep: Send + Sync {
    /// Human-readable step name, used for error reporting and
    /// compensation bookkeeping.
    fn name(&self) -> &str;

    /// Performs the step's side effect, records the result in the
    /// context and sets the step's effect flag.
    async fn execute(&self, ctx: &mut SagaContext) -> Result<()>;

    /// Reverses the effect performed by `execute` and clears the
    /// effect flag.
    ///
    /// Must be a successful no-op when there is nothing to undo (the
    /// flag is unset), so that it is safe to invoke more than once.
    /// Errors only for real resource failures.
    async fn compensate(&self, ctx: &mut SagaContext) -> Result<()>;
}
