// src/engine/cascade.rs

//! Cascade-stop propagation.
//!
//! When a stack fails (or is skipped), every stack that transitively
//! requires it can no longer run and is marked stopped so it is never
//! attempted. Deploy walks the dependents direction; destroy walks the
//! dependencies direction, since a destroy processes dependents first.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::dag::StackGraph;
use crate::engine::executor::StackExecutor;
use crate::engine::StackName;

/// Stop every executor that transitively depends on `root` (deploy context).
///
/// Returns the names that were newly stopped. Terminal executors are left
/// alone; only pending ones are stoppable.
pub fn stop_dependents<B>(
    executors: &[Arc<StackExecutor<B>>],
    graph: &StackGraph,
    root: &str,
) -> Vec<StackName> {
    propagate(executors, root, |name| graph.dependents_of(name))
}

/// Stop every executor that `root` transitively depends on (destroy context).
pub fn stop_dependencies<B>(
    executors: &[Arc<StackExecutor<B>>],
    graph: &StackGraph,
    root: &str,
) -> Vec<StackName> {
    propagate(executors, root, |name| graph.dependencies_of(name))
}

/// Worklist traversal with a visited set, so even a malformed cyclic input
/// cannot loop forever here.
fn propagate<'g, B>(
    executors: &[Arc<StackExecutor<B>>],
    root: &str,
    related_of: impl Fn(&str) -> &'g [String],
) -> Vec<StackName> {
    let mut worklist: Vec<StackName> = related_of(root).to_vec();
    let mut visited: HashSet<StackName> = HashSet::new();
    visited.insert(root.to_string());

    let mut newly_stopped = Vec::new();

    while let Some(name) = worklist.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }

        if let Some(executor) = executors.iter().find(|e| e.name() == name) {
            if executor.stop() {
                debug!(stack = %name, origin = %root, "cascade-stopped stack");
                newly_stopped.push(name.clone());
            }
        }

        worklist.extend(related_of(&name).iter().cloned());
    }

    newly_stopped
}
