use crate::{loader, ActionRegistry, Flow};
use flowcore::{EventBus, FlowDefinition, FlowError, RunEvent};
use std::path::Path;
use std::sync::Arc;

/// Builds flows from definitions against a shared action registry and event bus
pub struct FlowRuntime {
    registry: Arc<ActionRegistry>,
    event_bus: Arc<EventBus>,
    config: RuntimeConfig,
}

impl FlowRuntime {
    /// Create a new runtime with default settings and an empty registry
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(ActionRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<ActionRegistry>, config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            registry,
            event_bus,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Build a flow whose runs publish on this runtime's event bus
    pub fn load(&self, definition: &FlowDefinition) -> Result<Flow, FlowError> {
        loader::load_flow(definition, &self.registry, Some(self.event_bus.clone()))
    }

    /// Read a JSON flow document and build it
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Flow, FlowError> {
        let definition = FlowDefinition::from_file(path)?;
        self.load(&definition)
    }

    /// Subscribe to events of all flows built by this runtime
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of the run event broadcast channel; slow subscribers past
    /// this many events start losing the oldest ones. Zero is treated as one.
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}
