// src/dag/select.rs

//! Run selection and completeness validation.

use std::collections::HashSet;

use crate::dag::graph::StackGraph;
use crate::errors::{DeploydagError, Result};
use crate::manifest::{Manifest, StackDescriptor};

/// Select which stacks participate in a run.
///
/// With an empty `requested` list, every stack in the manifest is selected.
/// Otherwise only the named stacks are, in manifest (name) order. Requesting
/// an unknown stack is an error.
///
/// Selection is pure: calling it twice with the same inputs yields the same
/// set, and it never alters the graph links of the selected stacks.
pub fn select_stacks<'a>(
    manifest: &'a Manifest,
    requested: &[String],
) -> Result<Vec<&'a StackDescriptor>> {
    if requested.is_empty() {
        return Ok(manifest.stacks.values().collect());
    }

    for name in requested {
        if !manifest.stacks.contains_key(name) {
            return Err(DeploydagError::StackNotFound(name.clone()));
        }
    }

    let requested: HashSet<&str> = requested.iter().map(|s| s.as_str()).collect();

    Ok(manifest
        .stacks
        .values()
        .filter(|s| requested.contains(s.name.as_str()))
        .collect())
}

/// Deploy-side completeness check: every selected stack's dependencies must
/// also be selected.
///
/// Runs before any operation starts, so an incomplete selection never
/// reaches the backend.
pub fn check_all_dependencies_included(
    selected: &[&StackDescriptor],
    graph: &StackGraph,
) -> Result<()> {
    check_relations_included(selected, |name| graph.dependencies_of(name))
}

/// Destroy-side completeness check: every selected stack's dependents must
/// also be selected.
///
/// The dependents come from the full graph, so a destroy of a subset notices
/// stacks outside the selection that still rely on it.
pub fn check_all_dependents_included(
    selected: &[&StackDescriptor],
    graph: &StackGraph,
) -> Result<()> {
    check_relations_included(selected, |name| graph.dependents_of(name))
}

fn check_relations_included<'g>(
    selected: &[&StackDescriptor],
    relations_of: impl Fn(&str) -> &'g [String],
) -> Result<()> {
    let names: HashSet<&str> = selected.iter().map(|s| s.name.as_str()).collect();

    for stack in selected {
        let missing: Vec<String> = relations_of(&stack.name)
            .iter()
            .filter(|related| !names.contains(related.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(DeploydagError::IncompleteSelection {
                stack: stack.name.clone(),
                missing,
            });
        }
    }

    Ok(())
}
