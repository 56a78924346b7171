// src/manifest/mod.rs

//! Input contract from the synthesis step.
//!
//! - [`model`] maps the synthesized stack manifest (JSON) onto Rust types.
//! - [`loader`] reads a manifest from disk or from a string.
//! - [`validate`] checks dependency references and acyclicity before any
//!   run is allowed to start.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{Manifest, StackDescriptor};
pub use validate::validate_manifest;
