mod base;

pub use base::{EventBus, EventEmitter, RunEvent, RunId, StepEvent};
