// src/tasks/js.rs

use std::path::PathBuf;

use minify_js::{minify, Session, TopLevelMode};
use tracing::info;

use crate::config::ConfigFile;
use crate::tasks::include::resolve_includes;
use crate::tasks::{StageError, StageResultExt, Task, TaskContext};

const STAGE: &str = "js";

/// Bundles the entry script with its includes, then writes a minified copy.
#[derive(Debug, Clone)]
pub struct JsTask {
    entry: PathBuf,
    dest_dir: PathBuf,
    output: String,
    minified: String,
}

impl JsTask {
    pub fn new(cfg: &ConfigFile) -> Self {
        Self {
            entry: cfg.source_root().join(&cfg.js.entry),
            dest_dir: cfg.build_root().join("js"),
            output: cfg.js.output.clone(),
            minified: cfg.js.minified.clone(),
        }
    }
}

/// Minify a script. Syntax errors are content errors.
pub fn minify_script(source: &str) -> Result<String, StageError> {
    let session = Session::new();
    let mut out = Vec::with_capacity(source.len());
    minify(&session, TopLevelMode::Global, source.as_bytes(), &mut out)
        .map_err(|e| StageError::content("uglify", format!("{e:?}")))?;
    String::from_utf8(out).map_err(|e| StageError::infrastructure("uglify", e.to_string()))
}

impl Task for JsTask {
    fn name(&self) -> &str {
        "js"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let fs = ctx.fs.as_ref();

        let raw = fs.read_to_string(&self.entry).stage(STAGE)?;
        let bundle = resolve_includes(fs, &self.entry, &raw)?;

        let bundle_path = self.dest_dir.join(&self.output);
        fs.write(&bundle_path, bundle.as_bytes()).stage(STAGE)?;

        let minified = minify_script(&bundle)?;
        let minified_path = self.dest_dir.join(&self.minified);
        fs.write(&minified_path, minified.as_bytes()).stage(STAGE)?;

        ctx.live.stream(format!("js/{}", self.minified));

        info!(
            bundle = bundle.len(),
            minified = minified.len(),
            "scripts bundled"
        );
        Ok(())
    }
}
