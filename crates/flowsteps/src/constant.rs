use async_trait::async_trait;
use flowcore::{StepAction, StepContext, StepError, StepResult, Value};
use flowruntime::{ActionFactory, ActionMetadata, ConfigKey};
use std::collections::HashMap;

/// Emits a fixed value; the usual root of a flow document
pub struct ConstAction {
    value: Value,
}

impl ConstAction {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[async_trait]
impl StepAction for ConstAction {
    fn action_type(&self) -> &str {
        "value.const"
    }

    async fn invoke(&self, _ctx: StepContext) -> StepResult {
        Ok(self.value.clone())
    }
}

pub struct ConstActionFactory;

impl ActionFactory for ConstActionFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError> {
        let value = config
            .get("value")
            .cloned()
            .ok_or_else(|| StepError::Configuration("Missing config: value".to_string()))?;
        Ok(Box::new(ConstAction::new(value)))
    }

    fn action_type(&self) -> &str {
        "value.const"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Emit the configured value".to_string(),
            category: "value".to_string(),
            config: vec![ConfigKey::required("value", "Value to emit")],
        }
    }
}
