// tests/destroy_ordering.rs

use std::error::Error;

use deploydag::{DeploydagError, Method, Project, RunOptions, StackState};
use deploydag_test_utils::builders::ManifestBuilder;
use deploydag_test_utils::fake_backend::FakeBackend;
use deploydag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn dependent_is_destroyed_before_its_dependency() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .build();

    let backend = FakeBackend::new();
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    project
        .destroy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await?;

    assert_eq!(handle.executed(), vec!["B".to_string(), "A".to_string()]);
    for (_, method) in handle.operations() {
        assert_eq!(method, Method::Destroy);
    }

    Ok(())
}

#[tokio::test]
async fn fan_in_destroys_all_dependents_before_shared_dependency() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("base", &[])
        .with_stack("svc1", &["base"])
        .with_stack("svc2", &["base"])
        .build();

    let backend = FakeBackend::new();
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    project
        .destroy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await?;

    let executed = handle.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed[2], "base");
    assert!(executed[..2].contains(&"svc1".to_string()));
    assert!(executed[..2].contains(&"svc2".to_string()));

    Ok(())
}

#[tokio::test]
async fn destroy_failure_stops_downstream_dependencies() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .build();

    let backend = FakeBackend::new();
    backend.fail_stack("B");
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    let err = project
        .destroy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await
        .expect_err("run must fail");

    match err {
        DeploydagError::OrchestrationFailed(failure) => {
            assert_eq!(failure.failed.len(), 1);
            assert_eq!(failure.failed[0].0, "B");
            // A would have been destroyed after B; it is skipped instead.
            assert_eq!(failure.stopped, vec!["A".to_string()]);
        }
        other => panic!("expected OrchestrationFailed, got: {other}"),
    }

    assert_eq!(handle.executed(), vec!["B".to_string()]);

    let states: Vec<(String, StackState)> = project
        .stacks_to_run()
        .iter()
        .map(|e| (e.name().to_string(), e.state()))
        .collect();
    assert!(states.contains(&("A".to_string(), StackState::Stopped)));
    assert!(states.contains(&("B".to_string(), StackState::Failed)));

    Ok(())
}
