use flowcore::{RunId, StepError, StepOutcome, Value};
use indexmap::IndexMap;

/// Result table of one flow run.
///
/// Holds the outcome of every step that executed, in execution order. Steps
/// that were skipped have no entry here and are listed in [`RunResults::skipped`].
#[derive(Debug, Clone)]
pub struct RunResults {
    run_id: RunId,
    outcomes: IndexMap<String, StepOutcome>,
    skipped: Vec<String>,
    total_steps: usize,
    duration_ms: u64,
}

impl RunResults {
    pub(crate) fn new(run_id: RunId, total_steps: usize) -> Self {
        Self {
            run_id,
            outcomes: IndexMap::with_capacity(total_steps),
            skipped: Vec::new(),
            total_steps,
            duration_ms: 0,
        }
    }

    pub(crate) fn record(&mut self, step: String, outcome: StepOutcome) {
        self.outcomes.insert(step, outcome);
    }

    pub(crate) fn record_skipped(&mut self, step: &str) {
        self.skipped.push(step.to_string());
    }

    pub(crate) fn set_duration_ms(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn get(&self, step: &str) -> Option<&StepOutcome> {
        self.outcomes.get(step)
    }

    /// Output of `step`, if it ran and succeeded
    pub fn output(&self, step: &str) -> Option<&Value> {
        self.get(step).and_then(StepOutcome::output)
    }

    /// Failure of `step`, if it ran and failed
    pub fn failure(&self, step: &str) -> Option<&StepError> {
        self.get(step).and_then(StepOutcome::failure)
    }

    pub fn contains(&self, step: &str) -> bool {
        self.outcomes.contains_key(step)
    }

    /// Number of steps that executed
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StepOutcome)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.outcomes.keys().map(String::as_str)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter()
            .filter_map(|(name, outcome)| outcome.output().map(|value| (name, value)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &StepError)> {
        self.iter()
            .filter_map(|(name, outcome)| outcome.failure().map(|err| (name, err)))
    }

    /// Steps not executed because a dependency had no output
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Number of steps registered on the flow when the run started
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.values().all(StepOutcome::is_success)
    }
}
