// src/exec/backend.rs

//! Pluggable provisioner backend abstraction.
//!
//! The scheduler launches stack operations against a `ProvisionerBackend`
//! instead of a concrete process spawner. This keeps the remote provisioning
//! protocol out of the orchestrator and makes it easy to swap in a fake
//! backend in tests while keeping the production implementation in
//! [`command`](super::command).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::engine::StackUpdate;
use crate::errors::Result;
use crate::manifest::StackDescriptor;

/// Everything an operation may consult while it runs.
///
/// Cancellation is cooperative: `abort` flips to `true` on hard abort, and a
/// backend checks it at its own suspension points. In-flight operations are
/// never forcibly killed by the orchestrator itself.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub auto_approve: bool,
    /// Deploy-only: ask the backend for a refresh without changes.
    pub refresh_only: bool,
    /// Run-level abort signal; `true` once `hard_abort` was requested.
    pub abort: watch::Receiver<bool>,
    /// Lifecycle updates back to the caller, if one is listening.
    pub updates: Option<mpsc::Sender<StackUpdate>>,
}

/// Trait abstracting how a single stack is applied or torn down.
///
/// Each call performs the external side effect for exactly one stack and
/// resolves once it has settled. Retries, if any, are the backend's business;
/// the orchestrator invokes each operation at most once per run.
pub trait ProvisionerBackend: Send + Sync + 'static {
    /// Apply the stack's configuration.
    fn deploy(
        &self,
        stack: Arc<StackDescriptor>,
        ctx: OperationContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;

    /// Tear the stack's resources down.
    fn destroy(
        &self,
        stack: Arc<StackDescriptor>,
        ctx: OperationContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}
