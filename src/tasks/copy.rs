use std::path::PathBuf;

use globset::GlobSet;
use tracing::info;

use crate::config::ConfigFile;
use crate::fs::collect_matching_files;
use crate::tasks::{rebase, StageError, StageResultExt, Task, TaskContext};
use crate::watch::build_globset;

const STAGE: &str = "copy";

/// Copies font files into the build tree, keeping their layout under `fonts/`.
#[derive(Debug, Clone)]
pub struct CopyTask {
    source_root: PathBuf,
    build_root: PathBuf,
    fonts: GlobSet,
}

impl CopyTask {
    pub fn new(cfg: &ConfigFile) -> anyhow::Result<Self> {
        Ok(Self {
            source_root: cfg.source_root(),
            build_root: cfg.build_root(),
            fonts: build_globset(&[cfg.fonts.source_glob()])?,
        })
    }
}

impl Task for CopyTask {
    fn name(&self) -> &str {
        "copy"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let fs = ctx.fs.as_ref();
        let fonts = collect_matching_files(fs, &self.source_root, &self.fonts).stage(STAGE)?;

        for src in fonts.iter() {
            let dest = rebase(src, &self.source_root, &self.build_root);
            fs.copy(src, &dest).stage(STAGE)?;
        }

        info!(files = fonts.len(), "fonts copied");
        Ok(())
    }
}
