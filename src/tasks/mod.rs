// src/tasks/mod.rs

//! Build pipelines.
//!
//! Every step task reads from the source tree, pushes the content through
//! its transformers and writes into the build tree (`img:opt` writes back
//! into the source tree). Stages report failures as [`StageError`]; what a
//! failure means for the run is decided in `exec::policy`, not here.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::fs::FileSystem;
use crate::notifier::Notifier;
use crate::server::LiveReload;

pub mod beautify;
pub mod clean;
pub mod copy;
pub mod html;
pub mod img;
pub mod img_opt;
pub mod include;
pub mod js;
pub mod reload;
pub mod sass;

pub use clean::CleanTask;
pub use copy::CopyTask;
pub use html::HtmlTask;
pub use img::ImgTask;
pub use img_opt::ImgOptTask;
pub use js::JsTask;
pub use reload::ReloadTask;
pub use sass::SassTask;

/// A named unit of work registered once and run any number of times.
///
/// `run` is synchronous; the executor calls it on the blocking pool.
pub trait Task: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn run(&self, ctx: &TaskContext) -> Result<(), StageError>;
}

/// Shared services handed to every task invocation.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub fs: Arc<dyn FileSystem>,
    pub live: LiveReload,
    pub notifier: Arc<dyn Notifier>,
}

impl TaskContext {
    pub fn new(fs: Arc<dyn FileSystem>, live: LiveReload, notifier: Arc<dyn Notifier>) -> Self {
        Self { fs, live, notifier }
    }
}

/// Error raised by a pipeline stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A source file could not be transformed (syntax error, bad include).
    #[error("{stage}: {message}")]
    Content { stage: String, message: String },

    /// Reading or writing the source or build tree failed.
    #[error("{stage}: I/O error: {message}")]
    Io { stage: String, message: String },

    /// Anything else outside the content's control.
    #[error("{stage}: {message}")]
    Infrastructure { stage: String, message: String },
}

impl StageError {
    pub fn content(stage: &str, message: impl Into<String>) -> Self {
        StageError::Content {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    pub fn io(stage: &str, err: anyhow::Error) -> Self {
        StageError::Io {
            stage: stage.to_string(),
            message: format!("{err:#}"),
        }
    }

    pub fn infrastructure(stage: &str, message: impl Into<String>) -> Self {
        StageError::Infrastructure {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    pub fn stage(&self) -> &str {
        match self {
            StageError::Content { stage, .. }
            | StageError::Io { stage, .. }
            | StageError::Infrastructure { stage, .. } => stage,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StageError::Content { message, .. }
            | StageError::Io { message, .. }
            | StageError::Infrastructure { message, .. } => message,
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, StageError::Content { .. })
    }
}

/// Attach a stage name to filesystem results.
pub(crate) trait StageResultExt<T> {
    fn stage(self, stage: &str) -> Result<T, StageError>;
}

impl<T> StageResultExt<T> for anyhow::Result<T> {
    fn stage(self, stage: &str) -> Result<T, StageError> {
        self.map_err(|e| StageError::io(stage, e))
    }
}

/// File name component of `path` as a string.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `root/<path relative to from>`.
pub(crate) fn rebase(path: &Path, from: &Path, root: &Path) -> PathBuf {
    match path.strip_prefix(from) {
        Ok(rel) => root.join(rel),
        Err(_) => root.join(file_name(path)),
    }
}
