use async_trait::async_trait;
use flowcore::{StepAction, StepContext, StepError, StepResult, Value};
use flowruntime::{ActionFactory, ActionMetadata, ConfigKey};
use std::collections::HashMap;

fn input_name(config: &HashMap<String, Value>) -> Option<String> {
    config.get("input").and_then(|v| v.as_str()).map(str::to_string)
}

/// Parse a JSON string produced by a dependency
pub struct JsonParseAction {
    input: Option<String>,
}

#[async_trait]
impl StepAction for JsonParseAction {
    fn action_type(&self) -> &str {
        "transform.json_parse"
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        let field = self.input.as_deref().unwrap_or("<input>");
        let input = ctx.input_or_single(self.input.as_deref())?;
        let text = input.as_str().ok_or_else(|| StepError::InvalidInputType {
            field: field.to_string(),
            expected: "string".to_string(),
            actual: input.type_name().to_string(),
        })?;

        let parsed: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| StepError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(Value::from_json(parsed))
    }
}

pub struct JsonParseActionFactory;

impl ActionFactory for JsonParseActionFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError> {
        Ok(Box::new(JsonParseAction {
            input: input_name(config),
        }))
    }

    fn action_type(&self) -> &str {
        "transform.json_parse"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Parse JSON string".to_string(),
            category: "transform".to_string(),
            config: vec![ConfigKey::optional(
                "input",
                "Dependency to read; defaults to the only one",
            )],
        }
    }
}

/// Render a dependency's output as a JSON string
pub struct JsonStringifyAction {
    input: Option<String>,
    pretty: bool,
}

#[async_trait]
impl StepAction for JsonStringifyAction {
    fn action_type(&self) -> &str {
        "transform.json_stringify"
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        let value = ctx.input_or_single(self.input.as_deref())?.to_json();

        let json_str = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .map_err(|e| StepError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(Value::String(json_str))
    }
}

pub struct JsonStringifyActionFactory;

impl ActionFactory for JsonStringifyActionFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError> {
        Ok(Box::new(JsonStringifyAction {
            input: input_name(config),
            pretty: config.get("pretty").and_then(|v| v.as_bool()).unwrap_or(false),
        }))
    }

    fn action_type(&self) -> &str {
        "transform.json_stringify"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Convert value to JSON string".to_string(),
            category: "transform".to_string(),
            config: vec![
                ConfigKey::optional("input", "Dependency to read; defaults to the only one"),
                ConfigKey::optional("pretty", "Indent the output"),
            ],
        }
    }
}
