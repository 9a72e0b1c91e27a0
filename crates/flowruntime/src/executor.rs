use crate::flow::ErrorHandler;
use crate::RunResults;
use chrono::Utc;
use flowcore::{EventBus, RunEvent, RunId, StepContext, StepInputs, StepNode, StepOutcome};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Instant;

/// Runs every step of a flow once, in registration order
pub(crate) struct FlowExecutor {
    event_bus: Option<Arc<EventBus>>,
}

impl FlowExecutor {
    pub(crate) fn new(event_bus: Option<Arc<EventBus>>) -> Self {
        Self { event_bus }
    }

    pub(crate) async fn execute(
        &self,
        flow_name: &str,
        steps: &mut IndexMap<String, StepNode>,
        mut error_handler: Option<&mut ErrorHandler>,
    ) -> RunResults {
        let run_id = RunId::new_v4();
        let start_time = Instant::now();
        let mut results = RunResults::new(run_id, steps.len());

        self.emit(|| RunEvent::RunStarted {
            run_id,
            flow: flow_name.to_string(),
            total_steps: steps.len(),
            timestamp: Utc::now(),
        });

        tracing::info!(flow = %flow_name, %run_id, steps = steps.len(), "Starting flow run");

        for (name, node) in steps.iter_mut() {
            // A missing dependency result means it was skipped, failed, or
            // sits later in registration order. This step does not run in
            // this pass.
            let inputs = match collect_inputs(node, &results) {
                Some(inputs) => inputs,
                None => {
                    tracing::debug!(step = %name, dependencies = ?node.dependencies(), "Dependencies unmet, skipping step");
                    results.record_skipped(name);
                    continue;
                }
            };

            self.emit(|| RunEvent::StepStarted {
                run_id,
                step: name.clone(),
                action_type: node.action_type().to_string(),
                timestamp: Utc::now(),
            });

            let ctx = StepContext {
                run_id,
                step: name.clone(),
                inputs,
                events: self.emitter(run_id, name),
            };

            let step_start = Instant::now();
            let outcome = node.execute(ctx).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match &outcome {
                StepOutcome::Success(output) => {
                    tracing::info!(step = %name, duration_ms, "Step completed");
                    self.emit(|| RunEvent::StepCompleted {
                        run_id,
                        step: name.clone(),
                        output: output.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                }
                StepOutcome::Failure(err) => {
                    tracing::error!(step = %name, error = %err, "Step failed");
                    self.emit(|| RunEvent::StepFailed {
                        run_id,
                        step: name.clone(),
                        error: err.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }

            if let StepOutcome::Failure(err) = &outcome {
                if let Some(handler) = error_handler.as_deref_mut() {
                    handler(name.as_str(), err);
                }
            }

            results.record(name.clone(), outcome);
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        results.set_duration_ms(duration_ms);

        self.emit(|| RunEvent::RunCompleted {
            run_id,
            succeeded: results.succeeded().count(),
            failed: results.failed().count(),
            skipped: results.skipped().len(),
            duration_ms,
            timestamp: Utc::now(),
        });

        tracing::info!(
            flow = %flow_name,
            %run_id,
            executed = results.len(),
            skipped = results.skipped().len(),
            duration_ms,
            "Flow run finished"
        );

        results
    }

    fn emit(&self, event: impl FnOnce() -> RunEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event());
        }
    }

    fn emitter(&self, run_id: RunId, step: &str) -> flowcore::EventEmitter {
        match &self.event_bus {
            Some(bus) => bus.create_emitter(run_id, step),
            None => flowcore::EventEmitter::detached(step),
        }
    }
}

/// Inputs for `node` from this run's results, or `None` if any dependency
/// has no recorded output yet
fn collect_inputs(node: &StepNode, results: &RunResults) -> Option<StepInputs> {
    node.dependencies()
        .iter()
        .map(|dep| results.output(dep).map(|value| (dep.clone(), value.clone())))
        .collect()
}
