// src/tasks/html.rs

use std::path::PathBuf;
use std::sync::LazyLock;

use globset::GlobSet;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::fs::collect_matching_files;
use crate::tasks::beautify::beautify;
use crate::tasks::include::resolve_includes;
use crate::tasks::{file_name, StageError, StageResultExt, Task, TaskContext};
use crate::watch::build_globset;

const STAGE: &str = "html";

/// Development-only blocks: `<!--DEV ... -->` together with the line break
/// and indentation in front of them.
pub static DEV_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*<!--DEV[\s\S]+?-->").expect("dev block pattern is valid"));

/// Remove every development block from rendered markup.
pub fn strip_dev_blocks(html: &str) -> String {
    DEV_BLOCK_RE.replace_all(html, "").into_owned()
}

/// Assembles top-level pages: includes, re-indentation, dev block removal.
#[derive(Debug, Clone)]
pub struct HtmlTask {
    source_root: PathBuf,
    build_root: PathBuf,
    pages: GlobSet,
}

impl HtmlTask {
    pub fn new(cfg: &ConfigFile) -> anyhow::Result<Self> {
        Ok(Self {
            source_root: cfg.source_root(),
            build_root: cfg.build_root(),
            pages: build_globset(&["*.html".to_string()])?,
        })
    }
}

impl Task for HtmlTask {
    fn name(&self) -> &str {
        "html"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let fs = ctx.fs.as_ref();
        let pages = collect_matching_files(fs, &self.source_root, &self.pages).stage(STAGE)?;

        for page in pages.iter() {
            let raw = fs.read_to_string(page).stage(STAGE)?;
            let assembled = resolve_includes(fs, page, &raw)?;
            let rendered = strip_dev_blocks(&beautify(&assembled));

            let dest = self.build_root.join(file_name(page));
            fs.write(&dest, rendered.as_bytes()).stage(STAGE)?;
            debug!(page = ?page, dest = ?dest, "page written");
        }

        info!(pages = pages.len(), "html assembled");
        Ok(())
    }
}
