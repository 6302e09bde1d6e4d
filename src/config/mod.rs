// src/config/mod.rs

//! Configuration loading and validation for docpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, falling back to defaults (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, DocsSection, PathsSection, RawConfigFile, StylesheetSection, VersionsSection,
    WatchSection,
};
