//! Core abstractions for the step runner
//!
//! Values passed between steps, the action trait, step nodes, run events and
//! the serializable flow document. Scheduling lives in `flowruntime`.

mod action;
mod definition;
mod error;
pub mod events;
mod node;
mod value;

pub use action::{
    action_fn, FnAction, StepAction, StepContext, StepInputs, StepResult, UnresolvedAction,
};
pub use definition::{FlowDefinition, StepSpec};
pub use error::{FlowError, StepError};
pub use events::*;
pub use node::{StepNode, StepOutcome};
pub use value::Value;

/// Result type for flow construction and loading
pub type Result<T> = std::result::Result<T, FlowError>;
