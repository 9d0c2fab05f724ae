// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate path, server and watch settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    default_bindings, ConfigFile, FontsSection, ImgSection, JsSection, PathsSection,
    RawConfigFile, SassSection, ServerSection, WatchBindingConfig, WatchSection,
};
