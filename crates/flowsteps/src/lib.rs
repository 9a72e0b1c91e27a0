//! Standard action library
//!
//! Built-in actions resolvable by type name from flow definitions

mod constant;
mod debug;
mod http;
mod time;
mod transform;

pub use constant::ConstAction;
pub use debug::{DebugAction, FailAction};
pub use http::HttpRequestAction;
pub use time::DelayAction;
pub use transform::{JsonParseAction, JsonStringifyAction};

use flowruntime::ActionRegistry;
use std::sync::Arc;

/// Register all standard actions with a registry
pub fn register_all(registry: &mut ActionRegistry) {
    registry.register(Arc::new(constant::ConstActionFactory));
    registry.register(Arc::new(debug::DebugActionFactory));
    registry.register(Arc::new(debug::FailActionFactory));
    registry.register(Arc::new(http::HttpRequestActionFactory));
    registry.register(Arc::new(transform::JsonParseActionFactory));
    registry.register(Arc::new(transform::JsonStringifyActionFactory));
    registry.register(Arc::new(time::DelayActionFactory));
}

/// Registry pre-loaded with every standard action
pub fn standard_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    register_all(&mut registry);
    registry
}
