// src/project.rs

//! Top-level orchestration session over a synthesized stack set.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::dag::{
    check_all_dependencies_included, check_all_dependents_included, select_stacks, StackGraph,
};
use crate::engine::executor::StackExecutor;
use crate::engine::scheduler::Scheduler;
use crate::engine::{Method, RunOptions, StackUpdate};
use crate::errors::{DeploydagError, Result};
use crate::exec::backend::{OperationContext, ProvisionerBackend};
use crate::manifest::{validate_manifest, Manifest};

/// Cloneable handle that triggers the run-level hard abort.
///
/// Aborting is cooperative: no new stacks are launched and in-flight
/// operations observe the signal at their own suspension points.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// A deployment project: one validated stack set plus a provisioner backend.
///
/// `deploy` and `destroy` each perform a full orchestration run: select the
/// participating stacks, validate the selection, wrap each stack in a fresh
/// executor, and drive the scheduler until everything has settled.
pub struct Project<B> {
    manifest: Manifest,
    graph: StackGraph,
    backend: Arc<B>,
    updates: Option<mpsc::Sender<StackUpdate>>,
    abort: AbortHandle,
    abort_rx: watch::Receiver<bool>,
    stacks_to_run: Vec<Arc<StackExecutor<B>>>,
}

impl<B: ProvisionerBackend> Project<B> {
    /// Create a project from a synthesized manifest.
    ///
    /// The manifest is validated up front: unknown or self dependencies and
    /// cyclic graphs are rejected here, before any run can start.
    pub fn new(manifest: Manifest, backend: B) -> Result<Self> {
        validate_manifest(&manifest)?;
        let graph = StackGraph::from_manifest(&manifest);
        let (abort_tx, abort_rx) = watch::channel(false);

        Ok(Self {
            manifest,
            graph,
            backend: Arc::new(backend),
            updates: None,
            abort: AbortHandle {
                tx: Arc::new(abort_tx),
            },
            abort_rx,
            stacks_to_run: Vec::new(),
        })
    }

    /// Attach a channel receiving lifecycle updates (including approval
    /// requests) for every run of this project.
    pub fn with_updates(mut self, tx: mpsc::Sender<StackUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    /// Request a hard abort of the current run.
    pub fn hard_abort(&self) {
        self.abort.abort();
    }

    /// Handle for aborting from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Executors of the most recent run, for inspecting per-stack outcomes.
    pub fn stacks_to_run(&self) -> &[Arc<StackExecutor<B>>] {
        &self.stacks_to_run
    }

    /// Deploy the selected stacks in dependency order.
    pub async fn deploy(&mut self, opts: RunOptions) -> Result<()> {
        self.execute(Method::Deploy, opts).await
    }

    /// Destroy the selected stacks in reverse dependency order.
    pub async fn destroy(&mut self, opts: RunOptions) -> Result<()> {
        self.execute(Method::Destroy, opts).await
    }

    async fn execute(&mut self, method: Method, opts: RunOptions) -> Result<()> {
        if opts.refresh_only && method != Method::Deploy {
            return Err(DeploydagError::ConfigConflict(
                "refresh_only is only supported on deploy".to_string(),
            ));
        }

        let selected = select_stacks(&self.manifest, &opts.stack_names)?;

        if !opts.ignore_missing_stack_dependencies {
            match method {
                Method::Deploy => check_all_dependencies_included(&selected, &self.graph)?,
                Method::Destroy => check_all_dependents_included(&selected, &self.graph)?,
            }
        }

        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        info!(method = method.verb(), stacks = ?names, "selected stacks for run");

        self.stacks_to_run = selected
            .iter()
            .map(|stack| {
                Arc::new(StackExecutor::new(
                    Arc::new((*stack).clone()),
                    Arc::clone(&self.backend),
                ))
            })
            .collect();

        let ctx = OperationContext {
            auto_approve: opts.auto_approve,
            refresh_only: opts.refresh_only,
            abort: self.abort_rx.clone(),
            updates: self.updates.clone(),
        };

        let scheduler = Scheduler::new(
            &self.stacks_to_run,
            &self.graph,
            method,
            ctx,
            opts.parallelism,
        );

        scheduler.execute().await
    }
}
