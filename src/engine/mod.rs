// src/engine/mod.rs

//! Orchestration engine for deploydag.
//!
//! This module ties together:
//! - the per-stack executor state machine ([`executor`])
//! - the cascade-stop propagator that skips transitively affected stacks
//!   once an ancestor fails ([`cascade`])
//! - the control loop that launches ready stacks under a parallelism bound
//!   and aggregates the final result ([`scheduler`])

use tokio::sync::oneshot;

/// Canonical stack name type used throughout the engine.
pub type StackName = String;

/// Which operation a run performs. Determines the dependency direction used
/// for readiness and cascade-stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Deploy,
    Destroy,
}

impl Method {
    pub fn verb(self) -> &'static str {
        match self {
            Method::Deploy => "deploy",
            Method::Destroy => "destroy",
        }
    }
}

/// Caller-facing run configuration with enumerated, typed fields.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict the run to the named stacks. Empty means all stacks.
    pub stack_names: Vec<StackName>,

    /// Skip the approval handshake and run every stack directly.
    pub auto_approve: bool,

    /// Treat dependencies/dependents outside the selection as already
    /// satisfied instead of failing the completeness check.
    pub ignore_missing_stack_dependencies: bool,

    /// Maximum concurrently running stacks. `None` (or `Some(0)`) means
    /// unbounded.
    pub parallelism: Option<usize>,

    /// Deploy-only; combining it with destroy is a configuration conflict.
    pub refresh_only: bool,
}

/// Answer to an [`StackUpdate::ApprovalRequested`] message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalResponse {
    Approved,
    Rejected,
}

/// Lifecycle updates flowing from a run to the caller.
///
/// Approval is an explicit request/response message: the executor sends
/// `ApprovalRequested` and suspends until the caller answers through the
/// `responder`. Dropping the responder counts as a rejection; holding it
/// without answering leaves the stack waiting indefinitely.
#[derive(Debug)]
pub enum StackUpdate {
    Started {
        stack: StackName,
        method: Method,
    },
    ApprovalRequested {
        stack: StackName,
        responder: oneshot::Sender<ApprovalResponse>,
    },
    Finished {
        stack: StackName,
    },
    Failed {
        stack: StackName,
        error: String,
    },
    Stopped {
        stack: StackName,
    },
}

pub mod cascade;
pub mod executor;
pub mod scheduler;

pub use executor::{OperationOutcome, StackExecutor, StackState};
pub use scheduler::Scheduler;
