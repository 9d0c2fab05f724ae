// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::{ConfigFile, WatchBindingConfig};
use crate::types::TaskName;

/// Compiled watch/exclude glob patterns for a single watch binding.
///
/// The patterns are relative to the source root. The watcher passes
/// relative paths (e.g. `"sass/_vars.scss"`) into `matches`.
#[derive(Clone)]
pub struct WatchProfile {
    /// Task named in the binding (`"sass"`).
    task: TaskName,
    /// Composite registered for the binding (`"watch:sass"`).
    target: TaskName,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("task", &self.task)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Target to request from the runtime when this profile matches.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true if this binding is interested in the given path
    /// (relative to the source root).
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile one profile per binding.
pub fn build_watch_profiles(bindings: &[WatchBindingConfig]) -> Result<Vec<WatchProfile>> {
    let mut profiles = Vec::with_capacity(bindings.len());

    for binding in bindings {
        let watch_set = build_globset(&binding.patterns)
            .with_context(|| format!("building watch globset for task {}", binding.task))?;

        let exclude_set = if binding.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&binding.exclude).with_context(|| {
                format!("building exclude globset for task {}", binding.task)
            })?)
        };

        profiles.push(WatchProfile {
            task: binding.task.clone(),
            target: binding.target_name(),
            watch_set,
            exclude_set,
        });
    }

    Ok(profiles)
}

/// Convenience: compile the effective bindings of a loaded `ConfigFile`.
pub fn build_profiles_from_config(cfg: &ConfigFile) -> Result<Vec<WatchProfile>> {
    build_watch_profiles(&cfg.watch_bindings())
}

/// Build a GlobSet from simple string patterns.
///
/// `*` never crosses a `/`; use `**` for recursive matches.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
