// src/lib.rs

//! Orchestrates deploy/destroy runs over a DAG of synthesized
//! infrastructure stacks: dependency-ordered execution with bounded
//! parallelism, partial-failure containment and cascade-stop of
//! transitively affected stacks.
//!
//! The synthesis step that produces the stack manifest and the provisioning
//! tool that applies a single stack are both external collaborators: the
//! former is consumed through [`manifest`], the latter through
//! [`exec::ProvisionerBackend`].

pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod manifest;
pub mod project;

pub use engine::{ApprovalResponse, Method, RunOptions, StackState, StackUpdate};
pub use errors::{DeploydagError, Result, RunFailure};
pub use exec::{CommandBackend, OperationContext, ProvisionerBackend};
pub use manifest::{Manifest, StackDescriptor};
pub use project::{AbortHandle, Project};
