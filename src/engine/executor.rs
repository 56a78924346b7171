// src/engine/executor.rs

//! Per-stack executor state machine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::engine::{ApprovalResponse, Method, StackUpdate};
use crate::exec::backend::{OperationContext, ProvisionerBackend};
use crate::manifest::StackDescriptor;

/// Run state of a single stack.
///
/// `Pending → Running → {Done | Failed}`; `Stopped` is reached only from
/// `Pending` via an out-of-band cascade signal (or from an approval
/// rejection before the side effect starts). `Done`, `Failed` and `Stopped`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Pending,
    Running,
    Done,
    Failed,
    Stopped,
}

impl StackState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StackState::Done | StackState::Failed | StackState::Stopped)
    }
}

/// What a launched operation reported back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed,
    Failed,
    /// The stack was skipped before its side effect started (approval
    /// rejected). Treated like a failure for cascade purposes.
    Skipped,
}

/// Run-scoped wrapper around one stack.
///
/// Created fresh per run, owned by the scheduler, discarded at run end. The
/// stack descriptor itself is shared and read-only. State lives behind a
/// mutex because the operation future runs on a separate task from the
/// control loop.
#[derive(Debug)]
pub struct StackExecutor<B> {
    stack: Arc<StackDescriptor>,
    backend: Arc<B>,
    state: Mutex<StackState>,
    error: Mutex<Option<String>>,
}

impl<B> StackExecutor<B> {
    pub fn new(stack: Arc<StackDescriptor>, backend: Arc<B>) -> Self {
        Self {
            stack,
            backend,
            state: Mutex::new(StackState::Pending),
            error: Mutex::new(None),
        }
    }

    pub fn stack(&self) -> &StackDescriptor {
        &self.stack
    }

    pub fn name(&self) -> &str {
        &self.stack.name
    }

    pub fn state(&self) -> StackState {
        *lock(&self.state)
    }

    pub fn is_pending(&self) -> bool {
        self.state() == StackState::Pending
    }

    pub fn is_running(&self) -> bool {
        self.state() == StackState::Running
    }

    pub fn is_done(&self) -> bool {
        self.state() == StackState::Done
    }

    /// Error recorded by a failed operation, if any.
    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    /// Out-of-band cascade signal: mark the stack permanently skipped.
    ///
    /// Only a `Pending` executor is stoppable; a terminal state is never
    /// overwritten and an in-flight operation keeps running (it observes the
    /// abort signal on its own). Returns whether the state changed.
    pub fn stop(&self) -> bool {
        let mut state = lock(&self.state);
        if *state == StackState::Pending {
            *state = StackState::Stopped;
            debug!(stack = %self.name(), "stack stopped before running");
            true
        } else {
            false
        }
    }

    /// Claim the executor for launch. Called synchronously by the scheduler
    /// before the operation future is spawned, so the readiness scan never
    /// picks the same executor twice.
    pub(crate) fn mark_running(&self) {
        let mut state = lock(&self.state);
        debug_assert_eq!(*state, StackState::Pending, "launching a non-pending executor");
        *state = StackState::Running;
    }

    fn finish(&self, state: StackState) {
        *lock(&self.state) = state;
    }
}

impl<B: ProvisionerBackend> StackExecutor<B> {
    /// Perform the stack's deploy/destroy operation.
    ///
    /// The scheduler has already moved the state to `Running`; this invokes
    /// the backend exactly once (no retries at this layer), records the
    /// outcome, and reports it back so the scheduler can cascade on failure.
    pub async fn run(&self, method: Method, ctx: OperationContext) -> OperationOutcome {
        debug_assert!(self.is_running(), "executor run() before mark_running()");

        self.send_update(
            &ctx,
            StackUpdate::Started {
                stack: self.name().to_string(),
                method,
            },
        )
        .await;

        if !self.wait_for_approval(&ctx).await {
            info!(stack = %self.name(), "approval rejected; skipping stack");
            self.finish(StackState::Stopped);
            self.send_update(
                &ctx,
                StackUpdate::Stopped {
                    stack: self.name().to_string(),
                },
            )
            .await;
            return OperationOutcome::Skipped;
        }

        info!(stack = %self.name(), method = method.verb(), "running stack operation");

        let result = match method {
            Method::Deploy => self.backend.deploy(self.stack.clone(), ctx.clone()).await,
            Method::Destroy => self.backend.destroy(self.stack.clone(), ctx.clone()).await,
        };

        match result {
            Ok(()) => {
                self.finish(StackState::Done);
                info!(stack = %self.name(), method = method.verb(), "stack operation succeeded");
                self.send_update(
                    &ctx,
                    StackUpdate::Finished {
                        stack: self.name().to_string(),
                    },
                )
                .await;
                OperationOutcome::Completed
            }
            Err(err) => {
                let message = err.to_string();
                *lock(&self.error) = Some(message.clone());
                self.finish(StackState::Failed);
                warn!(
                    stack = %self.name(),
                    method = method.verb(),
                    error = %message,
                    "stack operation failed"
                );
                self.send_update(
                    &ctx,
                    StackUpdate::Failed {
                        stack: self.name().to_string(),
                        error: message,
                    },
                )
                .await;
                OperationOutcome::Failed
            }
        }
    }

    /// Approval handshake. Returns `true` when the operation may proceed.
    ///
    /// The handshake only happens when an update channel is attached and
    /// `auto_approve` is off; with nobody listening there is nobody to
    /// answer, so the operation proceeds directly.
    async fn wait_for_approval(&self, ctx: &OperationContext) -> bool {
        if ctx.auto_approve {
            return true;
        }

        let Some(tx) = &ctx.updates else {
            return true;
        };

        let (resp_tx, resp_rx) = tokio::sync::oneshot::channel();
        let request = StackUpdate::ApprovalRequested {
            stack: self.name().to_string(),
            responder: resp_tx,
        };

        if tx.send(request).await.is_err() {
            // Listener went away; nothing to wait for.
            return true;
        }

        debug!(stack = %self.name(), "waiting for stack approval");

        match resp_rx.await {
            Ok(ApprovalResponse::Approved) => true,
            Ok(ApprovalResponse::Rejected) | Err(_) => false,
        }
    }

    async fn send_update(&self, ctx: &OperationContext, update: StackUpdate) {
        if let Some(tx) = &ctx.updates {
            let _ = tx.send(update).await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
