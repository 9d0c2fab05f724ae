// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::types::TaskName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step a run and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Steps that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Steps that were newly marked as failed (including the step that
    /// failed and any dependents).
    pub newly_failed: Vec<TaskName>,
    /// Present when this step finished the active run.
    pub finished: Option<RunSummary>,
}

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: u64,
    /// Targets requested for this run, in request order.
    pub targets: Vec<TaskName>,
    pub succeeded: Vec<TaskName>,
    /// Steps whose content error was reported and recovered from.
    pub recovered: Vec<TaskName>,
    /// Steps that failed, plus dependents that never ran because of them.
    pub failed: Vec<TaskName>,
}

impl RunSummary {
    /// Every step completed; content errors count as completion.
    pub fn completed(&self) -> bool {
        self.failed.is_empty()
    }

    /// Every step completed without any reported error.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.recovered.is_empty()
    }

    pub fn includes_target(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t == target)
    }
}
