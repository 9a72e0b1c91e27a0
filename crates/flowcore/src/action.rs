use crate::{events::EventEmitter, RunId, StepError, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;

/// Outputs of a step's dependencies, keyed by dependency name
pub type StepInputs = HashMap<String, Value>;

/// What an action hands back to the runner
pub type StepResult = Result<Value, StepError>;

/// The unit of work behind a step.
///
/// Anything implementing this trait can be registered on a flow. Closures are
/// adapted with [`action_fn`].
#[async_trait]
pub trait StepAction: Send + Sync {
    /// Type identifier (e.g. "value.const", "http.request")
    fn action_type(&self) -> &str;

    /// Run the action against the outputs of the step's dependencies
    async fn invoke(&self, ctx: StepContext) -> StepResult;
}

#[async_trait]
impl StepAction for Box<dyn StepAction> {
    fn action_type(&self) -> &str {
        self.as_ref().action_type()
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        self.as_ref().invoke(ctx).await
    }
}

/// Execution context passed to an action
#[derive(Clone)]
pub struct StepContext {
    /// Run this invocation belongs to (nil when executed outside a flow run)
    pub run_id: RunId,

    /// Name of the step being executed
    pub step: String,

    /// Dependency outputs
    pub inputs: StepInputs,

    /// Event emitter for progress reporting
    pub events: EventEmitter,
}

impl StepContext {
    /// Context detached from any run or event bus.
    pub fn new(step: impl Into<String>, inputs: StepInputs) -> Self {
        let step = step.into();
        Self {
            run_id: RunId::nil(),
            events: EventEmitter::detached(step.clone()),
            step,
            inputs,
        }
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, StepError> {
        self.inputs
            .get(name)
            .ok_or_else(|| StepError::MissingInput(name.to_string()))
    }

    /// The only input, when the step has exactly one dependency
    pub fn single_input(&self) -> Result<&Value, StepError> {
        let mut values = self.inputs.values();
        match (values.next(), values.next()) {
            (Some(value), None) => Ok(value),
            (None, _) => Err(StepError::MissingInput("<any>".to_string())),
            (Some(_), Some(_)) => Err(StepError::Configuration(format!(
                "step '{}' has {} inputs; name the one to read",
                self.step,
                self.inputs.len()
            ))),
        }
    }

    /// The named input, or the only one when no name is given
    pub fn input_or_single(&self, name: Option<&str>) -> Result<&Value, StepError> {
        match name {
            Some(name) => self.require_input(name),
            None => self.single_input(),
        }
    }
}

/// Adapter turning an async closure into a [`StepAction`]
pub struct FnAction<F> {
    func: F,
}

/// Wrap a closure `Fn(StepInputs) -> impl Future<Output = StepResult>` as an action.
pub fn action_fn<F, Fut>(func: F) -> FnAction<F>
where
    F: Fn(StepInputs) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    FnAction { func }
}

#[async_trait]
impl<F, Fut> StepAction for FnAction<F>
where
    F: Fn(StepInputs) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    fn action_type(&self) -> &str {
        "fn"
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        (self.func)(ctx.inputs).await
    }
}

/// Placeholder for an action whose type could not be resolved.
///
/// Registration accepts it; every invocation fails with
/// [`StepError::NotInvocable`].
#[derive(Debug, Clone)]
pub struct UnresolvedAction {
    action_type: String,
}

impl UnresolvedAction {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
        }
    }
}

#[async_trait]
impl StepAction for UnresolvedAction {
    fn action_type(&self) -> &str {
        &self.action_type
    }

    async fn invoke(&self, _ctx: StepContext) -> StepResult {
        Err(StepError::NotInvocable {
            action_type: self.action_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(inputs: &[(&str, Value)]) -> StepContext {
        StepContext::new(
            "probe",
            inputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn require_input_reports_missing_name() {
        let ctx = ctx_with(&[("a", Value::from(1i64))]);
        assert_eq!(ctx.require_input("a").unwrap(), &Value::Number(1.0));
        assert_eq!(
            ctx.require_input("b").unwrap_err(),
            StepError::MissingInput("b".to_string())
        );
    }

    #[test]
    fn single_input_needs_exactly_one_dependency() {
        assert!(ctx_with(&[]).single_input().is_err());
        assert_eq!(
            ctx_with(&[("a", Value::from("x"))]).single_input().unwrap(),
            &Value::from("x")
        );
        let two = ctx_with(&[("a", Value::Null), ("b", Value::Null)]);
        assert!(matches!(two.single_input(), Err(StepError::Configuration(_))));
        assert!(two.input_or_single(Some("b")).is_ok());
    }

    #[tokio::test]
    async fn closure_action_receives_inputs() {
        let action = action_fn(|inputs: StepInputs| async move {
            StepResult::Ok(Value::from(inputs.len() as i64))
        });
        let out = action
            .invoke(ctx_with(&[("a", Value::Null), ("b", Value::Null)]))
            .await
            .unwrap();
        assert_eq!(out, Value::Number(2.0));
        assert_eq!(action.action_type(), "fn");
    }

    #[tokio::test]
    async fn unresolved_action_is_not_invocable() {
        let action = UnresolvedAction::new("no.such");
        let err = action.invoke(ctx_with(&[])).await.unwrap_err();
        assert_eq!(err.to_string(), "Action 'no.such' is not a function");
    }
}
