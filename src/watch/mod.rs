// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the glob patterns of each watch binding.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Dropping change events whose file content did not actually change.
//!
//! It does **not** know about the task graph; it only turns filesystem
//! changes into requests for `watch:<task>` targets.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::ChangeFilter;
pub use hash::{compute_file_hash, HashStore, MemoryHashStore};
pub use patterns::{build_globset, build_profiles_from_config, build_watch_profiles, WatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
