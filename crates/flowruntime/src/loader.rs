use crate::{ActionRegistry, Flow};
use flowcore::{EventBus, FlowDefinition, FlowError};
use std::sync::Arc;

/// Build a [`Flow`] from a definition, resolving actions through `registry`.
///
/// Steps are registered and their dependencies declared in document order, so
/// a step naming a dependency that appears further down the document fails
/// with [`FlowError::UnknownDependency`].
pub fn load_flow(
    definition: &FlowDefinition,
    registry: &ActionRegistry,
    event_bus: Option<Arc<EventBus>>,
) -> Result<Flow, FlowError> {
    let mut flow = Flow::new(definition.name.clone());
    if let Some(bus) = event_bus {
        flow = flow.with_event_bus(bus);
    }

    for spec in &definition.steps {
        let action = registry.create_action(&spec.action, &spec.config).map_err(|e| {
            FlowError::InvalidDefinition(format!(
                "step '{}' ({}): {}",
                spec.name, spec.action, e
            ))
        })?;

        flow.register_step(spec.name.clone(), action)?
            .depends_on(spec.depends_on.iter().cloned())?;
    }

    tracing::info!(flow = %definition.name, steps = flow.len(), "Loaded flow definition");
    Ok(flow)
}
