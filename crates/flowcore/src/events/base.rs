use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Events emitted while a flow run is in progress
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        flow: String,
        total_steps: usize,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        run_id: RunId,
        step: String,
        action_type: String,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        run_id: RunId,
        step: String,
        output: Value,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StepFailed {
        run_id: RunId,
        step: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    StepEvent {
        run_id: RunId,
        step: String,
        event: StepEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Events an action reports about itself while it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum StepEvent {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
    Data { key: String, value: Value },
}

/// Handle an action uses to publish [`StepEvent`]s.
///
/// A detached emitter (no bus attached to the flow) drops everything it is given.
#[derive(Clone)]
pub struct EventEmitter {
    run_id: RunId,
    step: String,
    sender: Option<broadcast::Sender<RunEvent>>,
}

impl EventEmitter {
    pub fn new(run_id: RunId, step: impl Into<String>, sender: broadcast::Sender<RunEvent>) -> Self {
        Self {
            run_id,
            step: step.into(),
            sender: Some(sender),
        }
    }

    pub fn detached(step: impl Into<String>) -> Self {
        Self {
            run_id: RunId::nil(),
            step: step.into(),
            sender: None,
        }
    }

    pub fn emit(&self, event: StepEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(RunEvent::StepEvent {
                run_id: self.run_id,
                step: self.step.clone(),
                event,
                timestamp: Utc::now(),
            });
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(StepEvent::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(StepEvent::Warning {
            message: message.into(),
        });
    }

    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.emit(StepEvent::Progress { percent, message });
    }

    pub fn data(&self, key: impl Into<String>, value: Value) {
        self.emit(StepEvent::Data {
            key: key.into(),
            value,
        });
    }
}

/// Broadcast bus for run events
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    /// A capacity of zero is raised to one; tokio rejects empty channels.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: RunEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(&self, run_id: RunId, step: &str) -> EventEmitter {
        EventEmitter::new(run_id, step, self.sender.clone())
    }
}
