// src/manifest/loader.rs

use std::fs;
use std::path::Path;

use crate::errors::Result;
use crate::manifest::model::Manifest;
use crate::manifest::validate::validate_manifest;

/// Read a manifest from a JSON file.
///
/// This only performs deserialization; it does **not** perform semantic
/// validation (dependency references, acyclicity). Use [`load_and_validate`]
/// for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

/// Parse a manifest from a JSON string.
pub fn load_from_str(contents: &str) -> Result<Manifest> {
    let manifest: Manifest = serde_json::from_str(contents)?;
    Ok(manifest)
}

/// Load a manifest from path and run validation.
///
/// This is the recommended entry point when the manifest comes from an
/// external synthesis step:
///
/// - Reads JSON.
/// - Checks for:
///   - unknown `dependencies` references,
///   - self-dependencies,
///   - cycles in the stack DAG.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let manifest = load_from_path(path)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}
