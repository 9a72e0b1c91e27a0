use thiserror::Error;

/// Errors raised while building or loading a flow.
///
/// These are caller mistakes and surface immediately; a `Flow` that returned
/// one of them is left exactly as it was before the failing call.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Step with name '{0}' already exists.")]
    DuplicateStep(String),

    #[error("Dependency '{dependency}' not found for step '{step}'.")]
    UnknownDependency { dependency: String, step: String },

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Invalid flow definition: {0}")]
    InvalidDefinition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single step execution.
///
/// Never thrown out of a run: it is recorded on the node, stored in the
/// run's result table and handed to the flow's error callback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Action '{action_type}' is not a function")]
    NotInvocable { action_type: String },

    #[error("Action panicked: {0}")]
    Panicked(String),
}

impl StepError {
    /// Shorthand for [`StepError::ExecutionFailed`].
    pub fn failed(message: impl std::fmt::Display) -> Self {
        StepError::ExecutionFailed(message.to_string())
    }
}
