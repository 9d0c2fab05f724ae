// src/watch/event_handler.rs

//! Turns changed source paths into run requests.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::fs::{collect_matching_files, FileSystem};
use crate::types::TaskName;
use crate::watch::hash::{compute_file_hash, HashStore, MemoryHashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{build_globset, WatchProfile};

/// Maps filesystem changes under the source root to watch targets.
///
/// With `use_hash` on, a change to a file whose content hash matches the last
/// seen hash is ignored. Deleted files always trigger.
pub struct ChangeFilter {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    profiles: Arc<Vec<WatchProfile>>,
    use_hash: bool,
    hashes: Box<dyn HashStore>,
}

impl std::fmt::Debug for ChangeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFilter")
            .field("root", &self.root)
            .field("profiles", &self.profiles)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl ChangeFilter {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        profiles: Vec<WatchProfile>,
        use_hash: bool,
    ) -> Self {
        Self {
            fs,
            root: root.into(),
            profiles: Arc::new(profiles),
            use_hash,
            hashes: Box::new(MemoryHashStore::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record the current hash of every watched file, so that a save
    /// without content changes does not trigger a rebuild.
    ///
    /// Returns the number of files hashed. A file that cannot be read is
    /// skipped with a warning; its first change event will trigger.
    pub fn seed(&mut self) -> Result<usize> {
        if !self.use_hash {
            return Ok(0);
        }

        let everything = build_globset(&["**".to_string()])?;
        let mut seeded = 0;

        for path in collect_matching_files(self.fs.as_ref(), &self.root, &everything)? {
            let Some(rel) = relative_str(&self.root, &path) else {
                continue;
            };
            if !self.profiles.iter().any(|p| p.matches(&rel)) {
                continue;
            }
            let hash = match compute_file_hash(self.fs.as_ref(), &path) {
                Ok(h) => h,
                Err(err) => {
                    warn!(path = %rel, error = %err, "failed to hash watched file; not seeded");
                    continue;
                }
            };
            self.hashes.save(&rel, &hash);
            seeded += 1;
        }

        debug!(seeded, "seeded watch hashes");
        Ok(seeded)
    }

    /// Targets to request for a batch of changed paths, deduplicated and
    /// sorted.
    pub fn targets_for_paths(&mut self, paths: &[PathBuf]) -> Vec<TaskName> {
        let mut targets = BTreeSet::new();
        for path in paths {
            targets.extend(self.targets_for_change(path));
        }
        targets.into_iter().collect()
    }

    /// Targets to request for a single changed path.
    pub fn targets_for_change(&mut self, path: &Path) -> Vec<TaskName> {
        let rel_str = match relative_str(&self.root, path) {
            Some(s) => s,
            None => {
                warn!(
                    "could not relativize path {:?} against root {:?}",
                    path, self.root
                );
                return Vec::new();
            }
        };

        debug!(?path, rel = %rel_str, "normalized event path");

        let targets: Vec<TaskName> = self
            .profiles
            .iter()
            .filter(|p| p.matches(&rel_str))
            .map(|p| p.target().to_string())
            .collect();

        if targets.is_empty() {
            return targets;
        }

        if self.use_hash && !self.content_changed(path, &rel_str) {
            info!(path = %rel_str, "hash unchanged; skipping trigger");
            return Vec::new();
        }

        debug!(path = %rel_str, ?targets, "watch match -> requesting targets");
        targets
    }

    fn content_changed(&mut self, path: &Path, rel_str: &str) -> bool {
        if !self.fs.is_file(path) {
            self.hashes.forget(rel_str);
            return true;
        }

        let hash = match compute_file_hash(self.fs.as_ref(), path) {
            Ok(h) => h,
            Err(err) => {
                warn!(
                    path = %rel_str,
                    error = %err,
                    "failed to compute file hash; triggering anyway"
                );
                return true;
            }
        };

        if self.hashes.load(rel_str).as_deref() == Some(hash.as_str()) {
            return false;
        }

        self.hashes.save(rel_str, &hash);
        true
    }
}
