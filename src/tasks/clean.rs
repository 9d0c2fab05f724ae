// src/tasks/clean.rs

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::tasks::{StageError, StageResultExt, Task, TaskContext};

const STAGE: &str = "clean";

/// Empties the build tree, keeping the preserved files.
#[derive(Debug, Clone)]
pub struct CleanTask {
    build_root: PathBuf,
    preserve: Vec<PathBuf>,
}

impl CleanTask {
    pub fn new(cfg: &ConfigFile) -> Self {
        let build_root = cfg.build_root();
        let preserve = cfg
            .paths
            .preserve
            .iter()
            .map(|p| build_root.join(p.trim_start_matches('/')))
            .collect();
        Self {
            build_root,
            preserve,
        }
    }

    fn is_preserved(&self, path: &Path) -> bool {
        self.preserve.iter().any(|p| p == path)
    }

    /// A directory holding a preserved file is descended into, not removed.
    fn holds_preserved(&self, dir: &Path) -> bool {
        self.preserve.iter().any(|p| p.starts_with(dir))
    }

    fn clean_dir(&self, fs: &dyn FileSystem, dir: &Path, removed: &mut usize) -> Result<(), StageError> {
        for entry in fs.read_dir(dir).stage(STAGE)? {
            if self.is_preserved(&entry) {
                debug!(path = ?entry, "keeping preserved file");
                continue;
            }
            if fs.is_dir(&entry) {
                if self.holds_preserved(&entry) {
                    self.clean_dir(fs, &entry, removed)?;
                } else {
                    fs.remove_dir_all(&entry).stage(STAGE)?;
                    *removed += 1;
                }
            } else {
                fs.remove_file(&entry).stage(STAGE)?;
                *removed += 1;
            }
        }
        Ok(())
    }
}

impl Task for CleanTask {
    fn name(&self) -> &str {
        "clean"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let fs = ctx.fs.as_ref();
        if !fs.is_dir(&self.build_root) {
            debug!(root = ?self.build_root, "build tree missing; nothing to clean");
            return Ok(());
        }

        let mut removed = 0;
        self.clean_dir(fs, &self.build_root, &mut removed)?;
        info!(root = ?self.build_root, removed, "build tree cleaned");
        Ok(())
    }
}
