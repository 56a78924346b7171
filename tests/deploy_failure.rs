// tests/deploy_failure.rs

use std::error::Error;

use deploydag::{DeploydagError, Project, RunOptions, StackState};
use deploydag_test_utils::builders::ManifestBuilder;
use deploydag_test_utils::fake_backend::FakeBackend;
use deploydag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn failed_dependency_stops_dependent() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .build();

    let backend = FakeBackend::new();
    backend.fail_stack("A");
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    let err = project
        .deploy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await
        .expect_err("run must fail when a stack fails");

    match err {
        DeploydagError::OrchestrationFailed(failure) => {
            assert_eq!(failure.failed.len(), 1);
            assert_eq!(failure.failed[0].0, "A");
            assert!(failure.failed[0].1.contains("injected failure"));
            assert_eq!(failure.stopped, vec!["B".to_string()]);
            assert!(failure.pending.is_empty());
        }
        other => panic!("expected OrchestrationFailed, got: {other}"),
    }

    // B's operation never started.
    assert_eq!(handle.executed(), vec!["A".to_string()]);

    let states: Vec<(String, StackState)> = project
        .stacks_to_run()
        .iter()
        .map(|e| (e.name().to_string(), e.state()))
        .collect();
    assert!(states.contains(&("A".to_string(), StackState::Failed)));
    assert!(states.contains(&("B".to_string(), StackState::Stopped)));

    Ok(())
}

#[tokio::test]
async fn cascade_stop_is_transitive_and_spares_independent_branches() -> TestResult {
    init_tracing();

    // A -> B -> C plus an unrelated D.
    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .with_stack("C", &["B"])
        .with_stack("D", &[])
        .build();

    let backend = FakeBackend::new();
    backend.fail_stack("A");
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    let err = project
        .deploy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await
        .expect_err("run must fail");

    match err {
        DeploydagError::OrchestrationFailed(failure) => {
            let mut stopped = failure.stopped.clone();
            stopped.sort();
            assert_eq!(stopped, vec!["B".to_string(), "C".to_string()]);
        }
        other => panic!("expected OrchestrationFailed, got: {other}"),
    }

    // The failing branch never blocked the unrelated one.
    let executed = handle.executed();
    assert!(executed.contains(&"A".to_string()));
    assert!(executed.contains(&"D".to_string()));
    assert_eq!(executed.len(), 2);

    for executor in project.stacks_to_run() {
        let expected = match executor.name() {
            "A" => StackState::Failed,
            "D" => StackState::Done,
            _ => StackState::Stopped,
        };
        assert_eq!(executor.state(), expected, "stack {}", executor.name());
    }

    Ok(())
}

#[tokio::test]
async fn failed_stack_error_is_retained_on_its_executor() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new().with_stack("only", &[]).build();

    let backend = FakeBackend::new();
    backend.fail_stack("only");
    let mut project = Project::new(manifest, backend)?;

    let _ = project
        .deploy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await;

    let executor = &project.stacks_to_run()[0];
    let error = executor.error().expect("failure must be recorded");
    assert!(error.contains("injected failure for stack 'only'"));

    Ok(())
}
