#![allow(dead_code)]

use std::path::PathBuf;

use deploydag::manifest::{Manifest, StackDescriptor};

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    stacks: Vec<StackDescriptor>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self { stacks: Vec::new() }
    }

    /// Add a stack with the given dependencies and a placeholder working
    /// directory.
    pub fn with_stack(self, name: &str, dependencies: &[&str]) -> Self {
        let dir = PathBuf::from(format!("stacks/{name}"));
        self.with_stack_at(name, dependencies, dir)
    }

    /// Add a stack with an explicit working directory (for tests that spawn
    /// real processes in it).
    pub fn with_stack_at(
        mut self,
        name: &str,
        dependencies: &[&str],
        working_directory: PathBuf,
    ) -> Self {
        self.stacks.push(StackDescriptor {
            name: name.to_string(),
            dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
            working_directory,
            content: String::new(),
        });
        self
    }

    pub fn build(self) -> Manifest {
        Manifest::from_stacks(self.stacks)
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
