// src/notifier.rs

//! Human-visible error notifications.

use std::sync::Mutex;

use tracing::error;

use crate::tasks::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Content,
    Io,
    Infrastructure,
}

/// One notification about a failed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Task the stage belongs to.
    pub task: String,
    pub stage: String,
    /// `Error in <stage>`.
    pub title: String,
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn from_stage_error(task: &str, err: &StageError) -> Self {
        let kind = match err {
            StageError::Content { .. } => NoticeKind::Content,
            StageError::Io { .. } => NoticeKind::Io,
            StageError::Infrastructure { .. } => NoticeKind::Infrastructure,
        };
        Self {
            task: task.to_string(),
            stage: err.stage().to_string(),
            title: format!("Error in {}", err.stage()),
            message: err.message().to_string(),
            kind,
        }
    }
}

/// Receives a notice for every stage error, whatever the outcome policy.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn notify(&self, notice: &Notice);
}

/// Logs the notice and prints a banner on stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        error!(
            task = %notice.task,
            stage = %notice.stage,
            kind = ?notice.kind,
            "{}",
            notice.message
        );
        eprintln!("\n[assetdag] {}\n  {}\n", notice.title, notice.message);
    }
}

/// Collects notices in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything notified so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice.clone());
        }
    }
}
