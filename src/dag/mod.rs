// src/dag/mod.rs

//! Stack DAG representation and run selection.
//!
//! - [`graph`] holds the directed acyclic graph of stacks with both
//!   dependency and (inverted) dependent adjacency.
//! - [`select`] picks which stacks participate in a run and validates
//!   that the selection is complete for the requested method.

pub mod graph;
pub mod select;

pub use graph::StackGraph;
pub use select::{
    check_all_dependencies_included, check_all_dependents_included, select_stacks,
};
