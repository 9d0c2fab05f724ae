// src/tasks/img.rs

use std::path::{Path, PathBuf};

use globset::GlobSet;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::fs::{collect_matching_files, FileSystem};
use crate::tasks::{file_name, StageError, StageResultExt, Task, TaskContext};
use crate::watch::build_globset;

const STAGE: &str = "img";

/// Copies top-level images into `<build>/img/`, skipping files whose build
/// copy is at least as recent as the source.
#[derive(Debug, Clone)]
pub struct ImgTask {
    source_root: PathBuf,
    dest_dir: PathBuf,
    images: GlobSet,
}

impl ImgTask {
    pub fn new(cfg: &ConfigFile) -> anyhow::Result<Self> {
        Ok(Self {
            source_root: cfg.source_root(),
            dest_dir: cfg.build_root().join("img"),
            images: build_globset(&[cfg.img.source_glob()])?,
        })
    }
}

/// True when `dest` is missing or older than `src`.
pub fn is_newer(fs: &dyn FileSystem, src: &Path, dest: &Path) -> anyhow::Result<bool> {
    if !fs.exists(dest) {
        return Ok(true);
    }
    Ok(fs.modified(src)? > fs.modified(dest)?)
}

impl Task for ImgTask {
    fn name(&self) -> &str {
        "img"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let fs = ctx.fs.as_ref();
        let images = collect_matching_files(fs, &self.source_root, &self.images).stage(STAGE)?;

        let mut copied = 0;
        for src in images.iter() {
            let dest = self.dest_dir.join(file_name(src));
            if !is_newer(fs, src, &dest).stage(STAGE)? {
                continue;
            }
            fs.copy(src, &dest).stage(STAGE)?;
            debug!(src = ?src, dest = ?dest, "image copied");
            copied += 1;
        }

        info!(copied, unchanged = images.len() - copied, "images synced");
        Ok(())
    }
}
