// src/manifest/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// One synthesized stack as produced by the synthesis step.
///
/// The orchestrator only interprets `name` and `dependencies`;
/// `working_directory` and `content` are opaque payload handed through to
/// the provisioner backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StackDescriptor {
    pub name: String,

    /// Names of stacks that must exist/succeed before this one is deployed.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Directory the provisioner backend runs in for this stack.
    #[serde(rename = "workingDirectory")]
    pub working_directory: PathBuf,

    /// Synthesized configuration, treated as opaque text.
    #[serde(default)]
    pub content: String,
}

/// Top-level manifest written by the synthesis step.
///
/// ```json
/// {
///   "version": "0.1",
///   "stacks": {
///     "network": { "name": "network", "dependencies": [],
///                  "workingDirectory": "stacks/network" },
///     "app":     { "name": "app", "dependencies": ["network"],
///                  "workingDirectory": "stacks/app" }
///   }
/// }
/// ```
///
/// Stacks are keyed by name in a `BTreeMap`, so iteration order (and with it
/// every tie-break in the scheduler) is deterministic for a given input.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub stacks: BTreeMap<String, StackDescriptor>,
}

impl Manifest {
    /// Build a manifest programmatically, e.g. from an in-process synthesis
    /// step or from test builders. Performs no validation; see
    /// [`super::validate::validate_manifest`].
    pub fn from_stacks(stacks: impl IntoIterator<Item = StackDescriptor>) -> Self {
        let stacks = stacks
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect::<BTreeMap<_, _>>();

        Self {
            version: String::new(),
            stacks,
        }
    }

    /// Stack names in deterministic (name) order.
    pub fn stack_names(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(|s| s.as_str())
    }
}
