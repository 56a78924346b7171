// tests/deploy_ordering.rs

use std::error::Error;

use deploydag::{Project, RunOptions, StackState};
use deploydag_test_utils::builders::ManifestBuilder;
use deploydag_test_utils::fake_backend::FakeBackend;
use deploydag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn shared_dependency_deploys_first() -> TestResult {
    init_tracing();

    // A, then B and C (both depending on A) in either order.
    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .with_stack("C", &["A"])
        .build();

    let backend = FakeBackend::new();
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    project
        .deploy(RunOptions {
            auto_approve: true,
            parallelism: Some(1),
            ..Default::default()
        })
        .await?;

    let executed = handle.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed[0], "A");
    assert!(executed.contains(&"B".to_string()));
    assert!(executed.contains(&"C".to_string()));

    for executor in project.stacks_to_run() {
        assert_eq!(executor.state(), StackState::Done);
    }

    Ok(())
}

#[tokio::test]
async fn chain_deploys_in_dependency_order() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("network", &[])
        .with_stack("database", &["network"])
        .with_stack("app", &["database"])
        .build();

    let backend = FakeBackend::new();
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    // Unbounded parallelism: ordering must come from readiness alone.
    project
        .deploy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await?;

    assert_eq!(
        handle.executed(),
        vec![
            "network".to_string(),
            "database".to_string(),
            "app".to_string()
        ]
    );

    Ok(())
}

#[tokio::test]
async fn ignoring_missing_dependencies_treats_outside_stacks_as_satisfied() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .build();

    let backend = FakeBackend::new();
    let handle = backend.clone();
    let mut project = Project::new(manifest, backend)?;

    // Only B selected; A is assumed to be satisfied externally.
    project
        .deploy(RunOptions {
            stack_names: vec!["B".to_string()],
            ignore_missing_stack_dependencies: true,
            auto_approve: true,
            ..Default::default()
        })
        .await?;

    assert_eq!(handle.executed(), vec!["B".to_string()]);

    Ok(())
}
