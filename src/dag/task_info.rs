// src/dag/task_info.rs

//! Step metadata and per-run state.

use crate::types::TaskName;

/// Per-run state of a step (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Step is part of this run but is waiting on dependencies.
    Pending,
    /// Step has been dispatched to the executor and is currently running.
    Running,
    /// Step completed without errors.
    DoneSuccess,
    /// Step hit a content error that was reported; counts as completed.
    DoneRecovered,
    /// Step failed in this run (or was blocked by a failed dependency).
    DoneFailed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }

    /// Whether dependents may start after this state.
    pub fn satisfies_dependents(self) -> bool {
        matches!(self, RunState::DoneSuccess | RunState::DoneRecovered)
    }
}

/// Public, read-only view of a step's per-run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The step is not participating in the active run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneRecovered,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneRecovered) => TaskRunState::DoneRecovered,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// A step participating in the active run.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct dependencies of this step in the run's plan.
    pub deps: Vec<TaskName>,
    pub run_state: RunState,
}

impl TaskInfo {
    pub fn pending(name: TaskName, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            deps,
            run_state: RunState::Pending,
        }
    }
}

/// Description of a step that the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Monotonically increasing run identifier.
    ///
    /// All steps that belong to the same run share the same `run_id`.
    pub run_id: u64,
}
