// tests/abort_and_approval.rs

use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;

use deploydag::{ApprovalResponse, DeploydagError, Project, RunOptions, StackUpdate};
use deploydag_test_utils::builders::ManifestBuilder;
use deploydag_test_utils::fake_backend::FakeBackend;
use deploydag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

async fn wait_until(mut cond: impl FnMut() -> bool, what: &str) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {what}");
}

#[tokio::test]
async fn hard_abort_prevents_new_launches() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .build();

    let backend = FakeBackend::new();
    backend.gate_stack("A");
    let handle = backend.clone();

    let mut project = Project::new(manifest, backend)?;
    let abort = project.abort_handle();

    let run = tokio::spawn(async move {
        let result = project
            .deploy(RunOptions {
                auto_approve: true,
                ..Default::default()
            })
            .await;
        (project, result)
    });

    wait_until(|| handle.executed().contains(&"A".to_string()), "A started").await;

    // Abort while A is in flight, then let A finish normally.
    abort.abort();
    handle.release("A");

    let (project, result) = run.await?;
    let err = result.expect_err("aborted run must not succeed");

    match err {
        DeploydagError::OrchestrationFailed(failure) => {
            assert!(failure.failed.is_empty());
            assert!(failure.stopped.is_empty());
            assert_eq!(failure.pending, vec!["B".to_string()]);
        }
        other => panic!("expected OrchestrationFailed, got: {other}"),
    }

    // A was already running and completed; B was never launched.
    assert_eq!(handle.executed(), vec!["A".to_string()]);
    assert!(project.stacks_to_run()[0].is_done());

    Ok(())
}

#[tokio::test]
async fn approval_is_requested_and_granted_through_the_channel() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .build();

    let backend = FakeBackend::new();
    let handle = backend.clone();

    let (tx, mut rx) = mpsc::channel::<StackUpdate>(16);
    let approver = tokio::spawn(async move {
        let mut approvals = 0usize;
        while let Some(update) = rx.recv().await {
            if let StackUpdate::ApprovalRequested { responder, .. } = update {
                approvals += 1;
                let _ = responder.send(ApprovalResponse::Approved);
            }
        }
        approvals
    });

    let mut project = Project::new(manifest, backend)?.with_updates(tx);
    project.deploy(RunOptions::default()).await?;
    drop(project); // closes the update channel so the approver finishes

    assert_eq!(handle.executed(), vec!["A".to_string(), "B".to_string()]);
    assert_eq!(approver.await?, 2);

    Ok(())
}

#[tokio::test]
async fn rejected_approval_stops_the_stack_and_its_dependents() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new()
        .with_stack("A", &[])
        .with_stack("B", &["A"])
        .build();

    let backend = FakeBackend::new();
    let handle = backend.clone();

    let (tx, mut rx) = mpsc::channel::<StackUpdate>(16);
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if let StackUpdate::ApprovalRequested { responder, .. } = update {
                let _ = responder.send(ApprovalResponse::Rejected);
            }
        }
    });

    let mut project = Project::new(manifest, backend)?.with_updates(tx);
    let err = project
        .deploy(RunOptions::default())
        .await
        .expect_err("rejected run must not succeed");

    match err {
        DeploydagError::OrchestrationFailed(failure) => {
            let mut stopped = failure.stopped.clone();
            stopped.sort();
            assert_eq!(stopped, vec!["A".to_string(), "B".to_string()]);
            assert!(failure.failed.is_empty());
        }
        other => panic!("expected OrchestrationFailed, got: {other}"),
    }

    // The side effect never ran for either stack.
    assert!(handle.executed().is_empty());

    Ok(())
}

#[tokio::test]
async fn auto_approve_skips_the_handshake_but_still_reports_lifecycle() -> TestResult {
    init_tracing();

    let manifest = ManifestBuilder::new().with_stack("A", &[]).build();

    let backend = FakeBackend::new();

    let (tx, mut rx) = mpsc::channel::<StackUpdate>(16);
    let collector = tokio::spawn(async move {
        let mut saw_started = false;
        let mut saw_finished = false;
        let mut saw_approval_request = false;
        while let Some(update) = rx.recv().await {
            match update {
                StackUpdate::Started { .. } => saw_started = true,
                StackUpdate::Finished { .. } => saw_finished = true,
                StackUpdate::ApprovalRequested { .. } => saw_approval_request = true,
                _ => {}
            }
        }
        (saw_started, saw_finished, saw_approval_request)
    });

    let mut project = Project::new(manifest, backend)?.with_updates(tx);
    project
        .deploy(RunOptions {
            auto_approve: true,
            ..Default::default()
        })
        .await?;
    drop(project);

    let (saw_started, saw_finished, saw_approval_request) = collector.await?;
    assert!(saw_started);
    assert!(saw_finished);
    assert!(!saw_approval_request);

    Ok(())
}
