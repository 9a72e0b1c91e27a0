// crates/flowruntime/tests/flow_test.rs

use async_trait::async_trait;
use flowcore::{
    action_fn, FlowError, RunEvent, StepAction, StepContext, StepError, StepInputs, StepResult,
    Value,
};
use flowruntime::Flow;
use std::sync::{Arc, Mutex};

/// Initialize tracing for tests
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

type Calls = Arc<Mutex<Vec<(String, StepError)>>>;

/// Attach an error handler that records every call
fn record_errors(flow: &mut Flow) -> Calls {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    flow.on_error(move |name, err| {
        sink.lock().unwrap().push((name.to_string(), err.clone()));
    });
    calls
}

fn constant(value: impl Into<Value>) -> impl StepAction + 'static {
    let value = value.into();
    action_fn(move |_: StepInputs| {
        let value = value.clone();
        async move { StepResult::Ok(value) }
    })
}

/// Action that stores the inputs it saw and returns `value`
fn capture(seen: Arc<Mutex<Option<StepInputs>>>, value: impl Into<Value>) -> impl StepAction + 'static {
    let value = value.into();
    action_fn(move |inputs: StepInputs| {
        *seen.lock().unwrap() = Some(inputs);
        let value = value.clone();
        async move { StepResult::Ok(value) }
    })
}

fn failing(message: &'static str) -> impl StepAction + 'static {
    action_fn(move |_: StepInputs| async move { StepResult::Err(StepError::failed(message)) })
}

#[tokio::test]
async fn test_steps_without_dependencies_all_run() {
    init_tracing();
    let mut flow = Flow::new("testFlowNoDeps");
    flow.register_step("step1", constant("data1")).unwrap();
    flow.register_step("step2", constant("data2")).unwrap();
    let errors = record_errors(&mut flow);

    let results = flow.run().await;

    assert!(errors.lock().unwrap().is_empty());
    assert_eq!(results.output("step1"), Some(&Value::from("data1")));
    assert_eq!(results.output("step2"), Some(&Value::from("data2")));
    assert!(results.all_succeeded());
}

#[tokio::test]
async fn test_linear_chain_threads_outputs_by_name() {
    init_tracing();
    let seen_b = Arc::new(Mutex::new(None));
    let seen_c = Arc::new(Mutex::new(None));

    let mut flow = Flow::new("testFlowWithDeps");
    flow.register_step("A", constant(123i64)).unwrap();
    flow.register_step("B", capture(seen_b.clone(), Value::from_json(serde_json::json!({"fromB": "hello"}))))
        .unwrap()
        .depends_on(["A"])
        .unwrap();
    flow.register_step("C", capture(seen_c.clone(), "done"))
        .unwrap()
        .depends_on(["B"])
        .unwrap();
    let errors = record_errors(&mut flow);

    let results = flow.run().await;

    assert!(errors.lock().unwrap().is_empty());
    assert_eq!(results.step_names().collect::<Vec<_>>(), vec!["A", "B", "C"]);

    let b_inputs = seen_b.lock().unwrap().clone().unwrap();
    assert_eq!(b_inputs.len(), 1);
    assert_eq!(b_inputs["A"], Value::from(123i64));

    let c_inputs = seen_c.lock().unwrap().clone().unwrap();
    assert_eq!(c_inputs.len(), 1);
    assert_eq!(
        c_inputs["B"].to_json(),
        serde_json::json!({"fromB": "hello"})
    );
    assert_eq!(results.output("C"), Some(&Value::from("done")));
}

#[tokio::test]
async fn test_multiple_dependencies_receive_every_output() {
    let seen = Arc::new(Mutex::new(None));

    let mut flow = Flow::new("testFlowMultiDeps");
    flow.register_step("X", constant("X data")).unwrap();
    flow.register_step("Y", constant(999i64)).unwrap();
    flow.register_step("Z", capture(seen.clone(), "Z done"))
        .unwrap()
        .depends_on(["Y", "X"])
        .unwrap();

    let results = flow.run().await;

    let inputs = seen.lock().unwrap().clone().unwrap();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs["X"], Value::from("X data"));
    assert_eq!(inputs["Y"], Value::from(999i64));
    assert_eq!(results.output("Z"), Some(&Value::from("Z done")));
}

#[tokio::test]
async fn test_failing_step_reports_once_and_skips_dependents() {
    init_tracing();
    let mut flow = Flow::new("testFlowError");
    flow.register_step("failStep", failing("Intentional fail")).unwrap();
    flow.register_step("child", constant("never"))
        .unwrap()
        .depends_on(["failStep"])
        .unwrap();
    flow.register_step("grandchild", constant("never"))
        .unwrap()
        .depends_on(["child"])
        .unwrap();
    flow.register_step("independent", constant("still runs")).unwrap();
    let errors = record_errors(&mut flow);

    let results = flow.run().await;

    let calls = errors.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "failStep");
    assert!(calls[0].1.to_string().contains("Intentional fail"));

    assert_eq!(results.failure("failStep"), Some(&StepError::failed("Intentional fail")));
    assert!(!results.contains("child"));
    assert!(!results.contains("grandchild"));
    assert_eq!(results.skipped(), ["child".to_string(), "grandchild".to_string()]);
    assert_eq!(results.output("independent"), Some(&Value::from("still runs")));
    assert_eq!(
        flow.step("failStep").unwrap().last_failure(),
        Some(&StepError::failed("Intentional fail"))
    );
}

#[tokio::test]
async fn test_failure_without_handler_is_absorbed() {
    let mut flow = Flow::new("quiet");
    flow.register_step("boom", failing("nobody listens")).unwrap();

    let results = flow.run().await;

    assert_eq!(results.failed().count(), 1);
    assert!(flow.step("boom").unwrap().last_failure().is_some());
}

#[tokio::test]
async fn test_panicking_step_is_reported_as_failure() {
    let mut flow = Flow::new("panics");
    flow.register_step(
        "explode",
        action_fn(|_: StepInputs| async {
            if true {
                panic!("kaboom");
            }
            StepResult::Ok(Value::Null)
        }),
    )
    .unwrap();
    flow.register_step("after", constant(1i64)).unwrap();
    let errors = record_errors(&mut flow);

    let results = flow.run().await;

    assert_eq!(errors.lock().unwrap()[0].1, StepError::Panicked("kaboom".to_string()));
    assert_eq!(results.output("after"), Some(&Value::from(1i64)));
}

#[tokio::test]
async fn test_dependency_registered_later_never_runs() {
    let ran = Arc::new(Mutex::new(Vec::<String>::new()));
    let tracker = |name: &'static str, ran: Arc<Mutex<Vec<String>>>| {
        action_fn(move |_: StepInputs| {
            ran.lock().unwrap().push(name.to_string());
            async { StepResult::Ok(Value::Null) }
        })
    };

    let mut flow = Flow::new("outOfOrder");
    flow.register_step("B", tracker("B", ran.clone())).unwrap();
    flow.register_step("A", tracker("A", ran.clone())).unwrap();
    flow.declarator("B").unwrap().depends_on(["A"]).unwrap();
    let errors = record_errors(&mut flow);

    let first = flow.run().await;
    let second = flow.run().await;

    assert_eq!(*ran.lock().unwrap(), vec!["A", "A"]);
    for results in [&first, &second] {
        assert!(!results.contains("B"));
        assert!(results.contains("A"));
    }
    assert!(errors.lock().unwrap().is_empty());
    assert!(flow.step("B").unwrap().last_output().is_none());
}

#[tokio::test]
async fn test_each_run_gets_a_fresh_result_table() {
    let counter = Arc::new(Mutex::new(0i64));
    let ticking = {
        let counter = counter.clone();
        action_fn(move |_: StepInputs| {
            let mut count = counter.lock().unwrap();
            *count += 1;
            let value = Value::from(*count);
            async move { StepResult::Ok(value) }
        })
    };

    let mut flow = Flow::new("rerun");
    flow.register_step("tick", ticking).unwrap();

    let first = flow.run().await;
    let second = flow.run().await;

    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(first.output("tick"), Some(&Value::from(1i64)));
    assert_eq!(second.output("tick"), Some(&Value::from(2i64)));
    assert_eq!(flow.step("tick").unwrap().last_output(), Some(&Value::from(2i64)));
}

#[tokio::test]
async fn test_error_handler_can_be_replaced() {
    let mut flow = Flow::new("handlers");
    flow.register_step("bad", failing("x")).unwrap();
    let first = record_errors(&mut flow);
    let second = record_errors(&mut flow);

    flow.run().await;

    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);
}

#[test]
fn test_duplicate_and_unknown_dependency_errors() {
    let mut flow = Flow::new("testFlowDepError");
    flow.register_step("E", constant("dataE")).unwrap();

    let dup = flow.register_step("E", constant("other")).unwrap_err();
    assert_eq!(dup.to_string(), "Step with name 'E' already exists.");

    let err = flow
        .register_step("F", constant("dataF"))
        .unwrap()
        .depends_on(["G"])
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnknownDependency { ref dependency, ref step } if dependency == "G" && step == "F"
    ));
    assert_eq!(err.to_string(), "Dependency 'G' not found for step 'F'.");
}

/// Action that reports progress through its emitter
struct Reporter;

#[async_trait]
impl StepAction for Reporter {
    fn action_type(&self) -> &str {
        "test.reporter"
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        ctx.events.info(format!("running {}", ctx.step));
        Ok(Value::from(true))
    }
}

#[tokio::test]
async fn test_run_publishes_events_on_the_bus() {
    let bus = Arc::new(flowcore::EventBus::new(64));
    let mut rx = bus.subscribe();

    let mut flow = Flow::new("evented").with_event_bus(bus);
    flow.register_step("report", Reporter).unwrap();
    flow.register_step("bad", failing("nope")).unwrap();
    flow.register_step("skipped", constant(0i64))
        .unwrap()
        .depends_on(["bad"])
        .unwrap();

    let results = flow.run().await;

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        let kind = match event {
            RunEvent::RunStarted { total_steps, .. } => {
                assert_eq!(total_steps, 3);
                "run_started".to_string()
            }
            RunEvent::StepStarted { step, .. } => format!("started:{}", step),
            RunEvent::StepEvent { step, .. } => format!("event:{}", step),
            RunEvent::StepCompleted { step, .. } => format!("completed:{}", step),
            RunEvent::StepFailed { step, .. } => format!("failed:{}", step),
            RunEvent::RunCompleted { run_id, succeeded, failed, skipped, .. } => {
                assert_eq!(run_id, results.run_id());
                assert_eq!((succeeded, failed, skipped), (1, 1, 1));
                "run_completed".to_string()
            }
        };
        kinds.push(kind);
    }

    assert_eq!(
        kinds,
        vec![
            "run_started",
            "started:report",
            "event:report",
            "completed:report",
            "started:bad",
            "failed:bad",
            "run_completed",
        ]
    );
}
