use crate::analysis::{self, FlowAnalysis};
use crate::executor::FlowExecutor;
use crate::render;
use crate::RunResults;
use flowcore::{EventBus, FlowError, StepAction, StepError, StepNode};
use indexmap::IndexMap;
use std::sync::Arc;

pub(crate) type ErrorHandler = Box<dyn FnMut(&str, &StepError) + Send>;

/// A named, insertion-ordered set of steps and the single-pass runner over them.
///
/// # Ordering constraint
///
/// [`Flow::run`] visits steps once, in registration order. A step runs only if
/// every dependency already has a result from an earlier step in the same
/// pass. Registration order therefore has to be a topological order of the
/// dependency graph: a step whose dependency was registered after it is
/// skipped on every run, without an error. [`Flow::analyze`] reports such
/// edges.
///
/// `run` takes `&mut self`, so two runs of one flow can never overlap.
pub struct Flow {
    name: String,
    steps: IndexMap<String, StepNode>,
    error_handler: Option<ErrorHandler>,
    event_bus: Option<Arc<EventBus>>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: IndexMap::new(),
            error_handler: None,
            event_bus: None,
        }
    }

    /// Publish run events on `bus` during every subsequent run
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains_step(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    pub fn step(&self, name: &str) -> Option<&StepNode> {
        self.steps.get(name)
    }

    /// Steps in registration order
    pub fn steps(&self) -> impl Iterator<Item = &StepNode> {
        self.steps.values()
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Register a step with no dependencies.
    ///
    /// Fails with [`FlowError::DuplicateStep`] if the name is taken; the
    /// existing step is left untouched.
    pub fn register_step<A>(
        &mut self,
        name: impl Into<String>,
        action: A,
    ) -> Result<DependencyDeclarator<'_>, FlowError>
    where
        A: StepAction + 'static,
    {
        let name = name.into();
        if self.steps.contains_key(&name) {
            return Err(FlowError::DuplicateStep(name));
        }

        tracing::debug!(flow = %self.name, step = %name, action = action.action_type(), "registered step");
        let node = StepNode::new(name.clone(), Box::new(action), Vec::new());
        let (index, _) = self.steps.insert_full(name, node);

        Ok(DependencyDeclarator {
            steps: &mut self.steps,
            index,
        })
    }

    /// Declarator for a step registered earlier
    pub fn declarator(&mut self, name: &str) -> Result<DependencyDeclarator<'_>, FlowError> {
        let index = self
            .steps
            .get_index_of(name)
            .ok_or_else(|| FlowError::StepNotFound(name.to_string()))?;

        Ok(DependencyDeclarator {
            steps: &mut self.steps,
            index,
        })
    }

    /// Set the callback invoked once per failed step, replacing any previous one
    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(&str, &StepError) + Send + 'static,
    {
        self.error_handler = Some(Box::new(handler));
    }

    /// Execute one pass over all steps in registration order.
    ///
    /// Step failures never abort the pass; they are reported through the
    /// error callback and recorded in the returned table. Dependents of a
    /// failed or skipped step are skipped.
    pub async fn run(&mut self) -> RunResults {
        let executor = FlowExecutor::new(self.event_bus.clone());
        executor
            .execute(&self.name, &mut self.steps, self.error_handler.as_mut())
            .await
    }

    /// Tabular listing of steps and their dependencies
    pub fn visualize(&self) -> String {
        render::step_table(self.steps.values())
    }

    /// Graphviz DOT description of the dependency graph
    pub fn to_graph_description(&self) -> String {
        render::dot(&self.name, self.steps.values())
    }

    /// Static check of the ordering constraint; never consulted by `run`
    pub fn analyze(&self) -> FlowAnalysis {
        analysis::analyze(&self.steps)
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("steps", &self.steps.values().collect::<Vec<_>>())
            .field("has_error_handler", &self.error_handler.is_some())
            .finish()
    }
}

/// Handle returned by [`Flow::register_step`] for attaching dependency edges
#[derive(Debug)]
pub struct DependencyDeclarator<'a> {
    steps: &'a mut IndexMap<String, StepNode>,
    index: usize,
}

impl DependencyDeclarator<'_> {
    pub fn step_name(&self) -> &str {
        self.steps
            .get_index(self.index)
            .map(|(name, _)| name.as_str())
            .unwrap_or_default()
    }

    /// Replace the step's dependency list.
    ///
    /// Every name must already be registered; otherwise this fails with
    /// [`FlowError::UnknownDependency`] and the previous list stays in place.
    /// Calling it again overwrites the earlier list.
    pub fn depends_on<I, S>(&mut self, dependencies: I) -> Result<(), FlowError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dependencies: Vec<String> = dependencies.into_iter().map(Into::into).collect();

        if let Some(missing) = dependencies
            .iter()
            .find(|dep| !self.steps.contains_key(dep.as_str()))
        {
            return Err(FlowError::UnknownDependency {
                dependency: missing.clone(),
                step: self.step_name().to_string(),
            });
        }

        if let Some((name, node)) = self.steps.get_index_mut(self.index) {
            tracing::debug!(step = %name, ?dependencies, "declared dependencies");
            node.set_dependencies(dependencies);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore::{action_fn, StepInputs, StepResult, Value};

    fn noop() -> impl StepAction + 'static {
        action_fn(|_: StepInputs| async { StepResult::Ok(Value::Null) })
    }

    #[test]
    fn duplicate_registration_keeps_the_first_step() {
        let mut flow = Flow::new("dup");
        flow.register_step("D", noop()).unwrap();

        let err = flow.register_step("D", noop()).unwrap_err();

        assert!(matches!(err, FlowError::DuplicateStep(ref n) if n == "D"));
        assert_eq!(err.to_string(), "Step with name 'D' already exists.");
        assert_eq!(flow.len(), 1);
    }

    #[test]
    fn failed_declaration_keeps_previous_dependencies() {
        let mut flow = Flow::new("deps");
        flow.register_step("A", noop()).unwrap();
        flow.register_step("B", noop()).unwrap().depends_on(["A"]).unwrap();

        let err = flow
            .declarator("B")
            .unwrap()
            .depends_on(["A", "ghost"])
            .unwrap_err();

        assert!(matches!(
            err,
            FlowError::UnknownDependency { ref dependency, ref step } if dependency == "ghost" && step == "B"
        ));
        assert_eq!(flow.step("B").unwrap().dependencies(), ["A".to_string()]);
    }

    #[test]
    fn second_declaration_overwrites_the_first() {
        let mut flow = Flow::new("overwrite");
        flow.register_step("A", noop()).unwrap();
        flow.register_step("B", noop()).unwrap();
        let mut declarator = flow.register_step("C", noop()).unwrap();
        declarator.depends_on(["A"]).unwrap();
        declarator.depends_on(["B"]).unwrap();

        assert_eq!(flow.step("C").unwrap().dependencies(), ["B".to_string()]);
    }

    #[test]
    fn declarator_for_unknown_step_fails() {
        let mut flow = Flow::new("missing");
        assert!(matches!(
            flow.declarator("nope"),
            Err(FlowError::StepNotFound(ref n)) if n == "nope"
        ));
    }

    #[test]
    fn steps_iterate_in_registration_order() {
        let mut flow = Flow::new("order");
        for name in ["z", "a", "m"] {
            flow.register_step(name, noop()).unwrap();
        }
        assert_eq!(flow.step_names().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }
}
