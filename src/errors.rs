// src/errors.rs

//! Crate-wide error type and helpers.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeploydagError {
    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error(
        "stack '{stack}' requires stacks {missing:?} which are not part of this run \
         (pass all related stacks, or set ignore_missing_stack_dependencies)"
    )]
    IncompleteSelection {
        stack: String,
        missing: Vec<String>,
    },

    #[error("Cycle detected in stack DAG: {0}")]
    CyclicDependency(String),

    #[error("Conflicting run options: {0}")]
    ConfigConflict(String),

    #[error("no stack became ready while {0:?} were still pending")]
    Deadlock(Vec<String>),

    #[error("{0}")]
    OrchestrationFailed(RunFailure),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Per-stack breakdown of a run that did not complete.
///
/// Carried by [`DeploydagError::OrchestrationFailed`] so callers can report
/// exactly which stacks failed (with cause), which were cascade-stopped, and
/// which were never attempted.
#[derive(Debug, Clone, Default)]
pub struct RunFailure {
    /// Stacks whose operation failed, with the recorded error message.
    pub failed: Vec<(String, String)>,
    /// Stacks skipped because an upstream stack failed or was stopped.
    pub stopped: Vec<String>,
    /// Stacks that never left the pending state.
    pub pending: Vec<String>,
}

impl RunFailure {
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty() && self.stopped.is_empty() && self.pending.is_empty()
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "some stacks did not complete")?;
        if !self.failed.is_empty() {
            let names: Vec<String> = self
                .failed
                .iter()
                .map(|(name, err)| format!("{name} ({err})"))
                .collect();
            write!(f, "; failed: {}", names.join(", "))?;
        }
        if !self.stopped.is_empty() {
            write!(f, "; stopped: {}", self.stopped.join(", "))?;
        }
        if !self.pending.is_empty() {
            write!(f, "; unprocessed: {}", self.pending.join(", "))?;
        }
        Ok(())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DeploydagError>;
