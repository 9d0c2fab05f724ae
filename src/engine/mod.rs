// src/engine/mod.rs

//! Orchestration engine for assetdag.
//!
//! This module ties together:
//! - the run scheduler
//! - the trigger queue (what happens when a target is requested while its
//!   steps are already running)
//! - the main runtime event loop that reacts to:
//!   - CLI and file-watch run requests
//!   - step completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

pub use crate::types::TaskName;

/// Outcome of one step invocation, as reported to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// A content error was reported; the step counts as completed.
    Recovered,
    Failed,
}

/// Why a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Named on the command line, or the initial build of `serve`.
    Cli,
    /// A watched source file changed.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once no run is active and nothing is queued (run-once mode).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the CLI, the watcher and the
/// executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    RunRequested {
        target: TaskName,
        reason: TriggerReason,
    },
    StepCompleted {
        step: TaskName,
        run_id: u64,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C). In-flight steps are not
    /// interrupted.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::{TargetState, TriggerWhileRunningBehaviour};
pub use runtime::Runtime;
