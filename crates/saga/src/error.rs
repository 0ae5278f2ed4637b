//! Saga error types.

use thiserror::Error;

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Run invoked on an orchestrator with no steps configured.
    #[error("No steps configured")]
    NoStepsConfigured,

    /// Context is missing data a step requires.
    #[error("Invalid context: {0}")]
    InvalidContext(String),

    /// A saga step failed.
    #[error("Saga step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// A compensation step failed.
    #[error("Compensation step '{step}' failed: {reason}")]
    CompensationFailed { step: String, reason: String },

    /// Run cancelled between steps.
    #[error("Saga cancelled before step '{at_step}'")]
    Cancelled { at_step: String },

    /// Order store error.
    #[error("Order store error: {0}")]
    OrderStore(String),

    /// Stock service error.
    #[error("Stock service error: {0}")]
    Stock(String),

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    Payment(String),

    /// Shipment service error.
    #[error("Shipment service error: {0}")]
    Shipment(String),

    /// Choreography wiring or dispatch error.
    #[error("Choreography error: {0}")]
    Choreography(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
