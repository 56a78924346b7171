// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::manifest::Manifest;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct StackNode {
    /// Direct dependencies: stacks that must be done before this one deploys.
    deps: Vec<String>,
    /// Direct dependents: stacks that depend on this one.
    dependents: Vec<String>,
}

/// In-memory DAG representation keyed by stack name.
///
/// Dependents are computed here by inverting the dependency lists of the
/// *full* manifest; selection for a run never changes this adjacency, so a
/// subset run still sees its links into the whole graph. Acyclicity is
/// validated in `manifest::validate`, so this type only keeps adjacency
/// information for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct StackGraph {
    nodes: BTreeMap<String, StackNode>,
}

impl StackGraph {
    /// Build a graph from a validated [`Manifest`].
    ///
    /// Assumes that:
    /// - all dependency references are valid
    /// - there are no cycles
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut nodes: BTreeMap<String, StackNode> = BTreeMap::new();

        // First pass: create nodes with their dependency lists.
        for (name, stack) in manifest.stacks.iter() {
            nodes.insert(
                name.clone(),
                StackNode {
                    deps: stack.dependencies.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        let stack_names: Vec<String> = nodes.keys().cloned().collect();
        for stack_name in stack_names {
            let deps = nodes
                .get(&stack_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(stack_name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// Return all stack names.
    pub fn stacks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a stack.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a stack (stacks that list this one in their
    /// dependencies).
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
