use crate::{StepAction, StepContext, StepError, Value};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// Result of one step execution
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Success(Value),
    Failure(StepError),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success(_))
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            StepOutcome::Success(value) => Some(value),
            StepOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StepError> {
        match self {
            StepOutcome::Success(_) => None,
            StepOutcome::Failure(err) => Some(err),
        }
    }
}

/// One registered unit of work: its name, action, declared dependencies and
/// the outcome of its latest execution.
pub struct StepNode {
    name: String,
    action: Box<dyn StepAction>,
    dependencies: Vec<String>,
    last_output: Option<Value>,
    last_failure: Option<StepError>,
}

impl StepNode {
    /// Dependencies are not validated here; the owning flow does that.
    pub fn new(
        name: impl Into<String>,
        action: Box<dyn StepAction>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            action,
            dependencies,
            last_output: None,
            last_failure: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action_type(&self) -> &str {
        self.action.action_type()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn set_dependencies(&mut self, dependencies: Vec<String>) {
        self.dependencies = dependencies;
    }

    /// Output of the most recent successful execution
    pub fn last_output(&self) -> Option<&Value> {
        self.last_output.as_ref()
    }

    /// Failure of the most recent failed execution
    pub fn last_failure(&self) -> Option<&StepError> {
        self.last_failure.as_ref()
    }

    /// Invoke the action and record the outcome.
    ///
    /// Errors and panics raised by the action both come back as
    /// [`StepOutcome::Failure`]; nothing propagates to the caller.
    pub async fn execute(&mut self, ctx: StepContext) -> StepOutcome {
        let result = AssertUnwindSafe(self.action.invoke(ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                let message = panic_message(payload);
                tracing::warn!(step = %self.name, %message, "Action panicked");
                Err(StepError::Panicked(message))
            });

        match result {
            Ok(output) => {
                self.last_output = Some(output.clone());
                StepOutcome::Success(output)
            }
            Err(err) => {
                self.last_failure = Some(err.clone());
                StepOutcome::Failure(err)
            }
        }
    }
}

impl std::fmt::Debug for StepNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepNode")
            .field("name", &self.name)
            .field("action_type", &self.action.action_type())
            .field("dependencies", &self.dependencies)
            .field("last_output", &self.last_output)
            .field("last_failure", &self.last_failure)
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
