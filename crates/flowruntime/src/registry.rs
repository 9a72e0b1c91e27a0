use flowcore::{StepAction, StepError, UnresolvedAction, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating action instances from step configuration
pub trait ActionFactory: Send + Sync {
    /// Create a new instance of the action with given configuration
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError>;

    /// Action type identifier
    fn action_type(&self) -> &str;

    /// Optional: description and config keys, for listings
    fn metadata(&self) -> ActionMetadata {
        ActionMetadata::default()
    }
}

/// Metadata about an action type
#[derive(Debug, Clone)]
pub struct ActionMetadata {
    pub description: String,
    pub category: String,
    pub config: Vec<ConfigKey>,
}

impl Default for ActionMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            config: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigKey {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ConfigKey {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }
}

/// Registry of available action types
pub struct ActionRegistry {
    factories: HashMap<String, Arc<dyn ActionFactory>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an action factory, replacing any factory with the same type
    pub fn register(&mut self, factory: Arc<dyn ActionFactory>) {
        let action_type = factory.action_type().to_string();
        tracing::debug!("Registering action type: {}", action_type);
        self.factories.insert(action_type, factory);
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.factories.contains_key(action_type)
    }

    /// Create an action instance.
    ///
    /// An unknown type yields an [`UnresolvedAction`], which fails only when
    /// the step is executed. A factory rejecting its config is an error now.
    pub fn create_action(
        &self,
        action_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Box<dyn StepAction>, StepError> {
        match self.factories.get(action_type) {
            Some(factory) => factory.create(config),
            None => {
                tracing::warn!("Unknown action type '{}', step will not be invocable", action_type);
                Ok(Box::new(UnresolvedAction::new(action_type)))
            }
        }
    }

    /// All registered action types, sorted
    pub fn list_action_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn get_metadata(&self, action_type: &str) -> Option<ActionMetadata> {
        self.factories.get(action_type).map(|f| f.metadata())
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
