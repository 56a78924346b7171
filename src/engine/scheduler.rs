// src/engine/scheduler.rs

//! Control loop for a single deploy/destroy run.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dag::StackGraph;
use crate::engine::cascade::{stop_dependencies, stop_dependents};
use crate::engine::executor::{OperationOutcome, StackExecutor, StackState};
use crate::engine::{Method, StackName, StackUpdate};
use crate::errors::{DeploydagError, Result, RunFailure};
use crate::exec::backend::{OperationContext, ProvisionerBackend};

/// Drives one run over a fixed set of executors.
///
/// The loop repeatedly picks the next ready executor (per the run's method
/// direction), launches its operation, and waits whenever the parallelism
/// bound is reached. A failing stack cascade-stops its transitively affected
/// stacks but never aborts independent work; every launched operation is
/// settled before the aggregate result is reported (fail-together, not
/// fail-fast).
pub struct Scheduler<'a, B> {
    executors: &'a [Arc<StackExecutor<B>>],
    graph: &'a StackGraph,
    method: Method,
    ctx: OperationContext,
    max_parallel: usize,
    by_name: HashMap<&'a str, usize>,
}

impl<'a, B: ProvisionerBackend> Scheduler<'a, B> {
    pub fn new(
        executors: &'a [Arc<StackExecutor<B>>],
        graph: &'a StackGraph,
        method: Method,
        ctx: OperationContext,
        parallelism: Option<usize>,
    ) -> Self {
        let max_parallel = match parallelism {
            Some(n) if n > 0 => n,
            _ => usize::MAX,
        };

        let by_name = executors
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name(), i))
            .collect();

        Self {
            executors,
            graph,
            method,
            ctx,
            max_parallel,
            by_name,
        }
    }

    /// Run the control loop to completion.
    pub async fn execute(self) -> Result<()> {
        info!(
            method = self.method.verb(),
            stacks = self.executors.len(),
            "starting run"
        );

        let mut inflight: JoinSet<(usize, OperationOutcome)> = JoinSet::new();

        loop {
            if !self.executors.iter().any(|e| e.is_pending()) {
                break;
            }

            if *self.ctx.abort.borrow() {
                info!("abort signal received; not launching further stacks");
                break;
            }

            if inflight.len() >= self.max_parallel {
                self.settle_one(&mut inflight).await;
                continue;
            }

            match self.next_ready() {
                Some(idx) => {
                    let executor = Arc::clone(&self.executors[idx]);
                    executor.mark_running();
                    debug!(stack = %executor.name(), "launching stack operation");

                    let method = self.method;
                    let ctx = self.ctx.clone();
                    inflight.spawn(async move { (idx, executor.run(method, ctx).await) });
                }
                None => {
                    if inflight.is_empty() {
                        // Nothing ready and nothing running while stacks are
                        // still pending: the graph is exhausted. Reported as
                        // unprocessed stacks below, not as a crash.
                        warn!("no stack is ready and none is running; stopping the loop");
                        break;
                    }
                    self.settle_one(&mut inflight).await;
                }
            }
        }

        // The loop only launches; failures surface after everything in
        // flight has settled so sibling work is never abandoned.
        while !inflight.is_empty() {
            self.settle_one(&mut inflight).await;
        }

        self.report()
    }

    /// First pending executor (manifest order) whose counterpart stacks are
    /// sufficiently terminal. No ordering promise beyond that determinism.
    fn next_ready(&self) -> Option<usize> {
        self.executors
            .iter()
            .position(|e| e.is_pending() && self.is_ready(e))
    }

    fn is_ready(&self, executor: &StackExecutor<B>) -> bool {
        match self.method {
            // A stack deploys once every dependency in this run is done.
            // Dependencies outside the run were either validated as already
            // satisfied or explicitly ignored by the caller.
            Method::Deploy => self
                .graph
                .dependencies_of(executor.name())
                .iter()
                .all(|dep| match self.executor_by_name(dep) {
                    Some(d) => d.state() == StackState::Done,
                    None => true,
                }),
            // A stack is destroyed once nothing in this run still depends
            // on it: every dependent is destroyed or skipped.
            Method::Destroy => self
                .graph
                .dependents_of(executor.name())
                .iter()
                .all(|dep| match self.executor_by_name(dep) {
                    Some(d) => matches!(d.state(), StackState::Done | StackState::Stopped),
                    None => true,
                }),
        }
    }

    fn executor_by_name(&self, name: &str) -> Option<&StackExecutor<B>> {
        self.by_name.get(name).map(|&i| &*self.executors[i])
    }

    /// Wait for one in-flight operation to settle and propagate cascade-stop
    /// if it did not complete.
    async fn settle_one(&self, inflight: &mut JoinSet<(usize, OperationOutcome)>) {
        let Some(joined) = inflight.join_next().await else {
            return;
        };

        match joined {
            Ok((idx, outcome)) => {
                let executor = &self.executors[idx];
                match outcome {
                    OperationOutcome::Completed => {}
                    OperationOutcome::Failed | OperationOutcome::Skipped => {
                        let stopped = match self.method {
                            Method::Deploy => {
                                stop_dependents(self.executors, self.graph, executor.name())
                            }
                            Method::Destroy => {
                                stop_dependencies(self.executors, self.graph, executor.name())
                            }
                        };
                        if !stopped.is_empty() {
                            warn!(
                                stack = %executor.name(),
                                ?stopped,
                                "stack did not complete; cascade-stopped affected stacks"
                            );
                        }
                        self.notify_stopped(&stopped).await;
                    }
                }
            }
            Err(join_err) => {
                // A panicking backend leaves its executor state as running;
                // the final report accounts for it as unprocessed.
                error!(error = %join_err, "stack operation task aborted unexpectedly");
            }
        }
    }

    async fn notify_stopped(&self, names: &[StackName]) {
        let Some(tx) = &self.ctx.updates else {
            return;
        };
        for name in names {
            let _ = tx
                .send(StackUpdate::Stopped {
                    stack: name.clone(),
                })
                .await;
        }
    }

    /// Aggregate the final result once everything has settled.
    fn report(&self) -> Result<()> {
        let mut failure = RunFailure::default();

        for executor in self.executors {
            let name = executor.name().to_string();
            match executor.state() {
                StackState::Done => {}
                StackState::Failed => {
                    let cause = executor.error().unwrap_or_else(|| "unknown error".to_string());
                    failure.failed.push((name, cause));
                }
                StackState::Stopped => failure.stopped.push(name),
                StackState::Pending | StackState::Running => failure.pending.push(name),
            }
        }

        if failure.is_empty() {
            info!(method = self.method.verb(), "run completed; all stacks done");
            return Ok(());
        }

        let aborted = *self.ctx.abort.borrow();

        // Pending stacks with no failure and no abort anywhere mean the
        // readiness scan starved: nothing was ready yet stacks remained.
        // Validated acyclic input should never get here.
        if !aborted && failure.failed.is_empty() && failure.stopped.is_empty() {
            return Err(DeploydagError::Deadlock(failure.pending));
        }

        warn!(
            method = self.method.verb(),
            failed = failure.failed.len(),
            stopped = failure.stopped.len(),
            unprocessed = failure.pending.len(),
            "run did not complete"
        );

        Err(DeploydagError::OrchestrationFailed(failure))
    }
}
