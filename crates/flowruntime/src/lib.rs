//! Flow construction and execution
//!
//! [`Flow`] owns the ordered step collection and runs it in a single pass.
//! [`FlowRuntime`] and [`ActionRegistry`] build flows from serialized
//! definitions.

mod analysis;
mod executor;
mod flow;
mod loader;
mod registry;
mod render;
mod results;
mod runtime;

pub use analysis::{FlowAnalysis, OrderingIssue};
pub use flow::{DependencyDeclarator, Flow};
pub use loader::load_flow;
pub use registry::{ActionFactory, ActionMetadata, ActionRegistry, ConfigKey};
pub use results::RunResults;
pub use runtime::{FlowRuntime, RuntimeConfig};
