use async_trait::async_trait;
use flowcore::{StepAction, StepContext, StepError, StepResult, Value};
use flowruntime::{ActionFactory, ActionMetadata, ConfigKey};
use std::collections::HashMap;
use tokio::time::{sleep, Duration};

/// Sleeps, then passes its inputs through as one object
pub struct DelayAction {
    delay: Duration,
}

impl DelayAction {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl StepAction for DelayAction {
    fn action_type(&self) -> &str {
        "time.delay"
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        ctx.events
            .info(format!("Delaying for {}ms", self.delay.as_millis()));

        sleep(self.delay).await;

        let mut inputs: Vec<(String, Value)> = ctx.inputs.into_iter().collect();
        inputs.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Value::Object(inputs.into_iter().collect()))
    }
}

pub struct DelayActionFactory;

impl ActionFactory for DelayActionFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError> {
        let delay_ms = match config.get("delay_ms") {
            None => 1000.0,
            Some(value) => value
                .as_f64()
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .ok_or_else(|| {
                    StepError::Configuration(format!("delay_ms must be a non-negative number, got {}", value))
                })?,
        };
        Ok(Box::new(DelayAction::new(Duration::from_millis(delay_ms as u64))))
    }

    fn action_type(&self) -> &str {
        "time.delay"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Delay execution for specified milliseconds".to_string(),
            category: "time".to_string(),
            config: vec![ConfigKey::optional("delay_ms", "Milliseconds to wait (default 1000)")],
        }
    }
}
