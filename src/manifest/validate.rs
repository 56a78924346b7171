// src/manifest/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{DeploydagError, Result};
use crate::manifest::model::Manifest;

/// Validate a manifest before a run is allowed to start.
///
/// Structural errors are reported here, fail-fast, so no external operation
/// is ever invoked against a broken stack set.
pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    ensure_has_stacks(manifest)?;
    validate_stack_names(manifest)?;
    validate_dependency_references(manifest)?;
    validate_dag(manifest)?;
    Ok(())
}

fn ensure_has_stacks(manifest: &Manifest) -> Result<()> {
    if manifest.stacks.is_empty() {
        return Err(DeploydagError::ManifestError(
            "manifest contains no stacks; did the synthesis step run?".to_string(),
        ));
    }
    Ok(())
}

fn validate_stack_names(manifest: &Manifest) -> Result<()> {
    for (key, stack) in manifest.stacks.iter() {
        if key != &stack.name {
            return Err(DeploydagError::ManifestError(format!(
                "stack entry '{}' declares mismatching name '{}'",
                key, stack.name
            )));
        }
    }
    Ok(())
}

fn validate_dependency_references(manifest: &Manifest) -> Result<()> {
    for (name, stack) in manifest.stacks.iter() {
        for dep in stack.dependencies.iter() {
            if !manifest.stacks.contains_key(dep) {
                return Err(DeploydagError::ManifestError(format!(
                    "stack '{}' has unknown dependency '{}'",
                    name, dep
                )));
            }
            if dep == name {
                return Err(DeploydagError::ManifestError(format!(
                    "stack '{}' cannot depend on itself",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(manifest: &Manifest) -> Result<()> {
    // Build a petgraph graph from the stacks and their dependencies.
    //
    // Edge direction: dep -> stack. For
    //   "app": { "dependencies": ["network"] }
    // we add edge network -> app.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in manifest.stacks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, stack) in manifest.stacks.iter() {
        for dep in stack.dependencies.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle. A cyclic stack set
    // would otherwise stall the scheduler, so it is rejected up front.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(DeploydagError::CyclicDependency(format!(
                "cycle in stack dependencies involving stack '{}'",
                node
            )))
        }
    }
}
