use async_trait::async_trait;
use flowcore::{StepAction, StepContext, StepError, StepResult, Value};
use flowruntime::{ActionFactory, ActionMetadata, ConfigKey};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Logs its inputs and outputs them as one object
pub struct DebugAction {
    label: Option<String>,
}

#[async_trait]
impl StepAction for DebugAction {
    fn action_type(&self) -> &str {
        "debug.log"
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        let label = self.label.as_deref().unwrap_or(&ctx.step);
        ctx.events.info(format!("DEBUG: {}", label));

        let mut names: Vec<&String> = ctx.inputs.keys().collect();
        names.sort();

        let mut outputs = IndexMap::new();
        for name in names {
            let value = &ctx.inputs[name];
            ctx.events.info(format!("  {}: {}", name, value));
            tracing::debug!(step = %ctx.step, input = %name, %value, "debug.log");
            outputs.insert(name.clone(), value.clone());
        }

        Ok(Value::Object(outputs))
    }
}

pub struct DebugActionFactory;

impl ActionFactory for DebugActionFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError> {
        let label = config
            .get("label")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(Box::new(DebugAction { label }))
    }

    fn action_type(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Logs input values for debugging".to_string(),
            category: "debug".to_string(),
            config: vec![ConfigKey::optional("label", "Heading for the log output")],
        }
    }
}

/// Always fails; exercises error handling in flow documents
pub struct FailAction {
    message: String,
}

#[async_trait]
impl StepAction for FailAction {
    fn action_type(&self) -> &str {
        "debug.fail"
    }

    async fn invoke(&self, _ctx: StepContext) -> StepResult {
        Err(StepError::ExecutionFailed(self.message.clone()))
    }
}

pub struct FailActionFactory;

impl ActionFactory for FailActionFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError> {
        let message = config
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Intentional fail")
            .to_string();
        Ok(Box::new(FailAction { message }))
    }

    fn action_type(&self) -> &str {
        "debug.fail"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Fail with the configured message".to_string(),
            category: "debug".to_string(),
            config: vec![ConfigKey::optional("message", "Failure message")],
        }
    }
}
