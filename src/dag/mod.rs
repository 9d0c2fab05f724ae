// src/dag/mod.rs

//! Task compositions, execution plans and run scheduling.
//!
//! - [`composition`] is the `series` / `parallel` ordering expression.
//! - [`graph`] holds the flattened [`Plan`] of one invocation.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which steps are ready to run, and when dependents can be scheduled.
//! - [`task_info`] provides step metadata and scheduled step types.
//! - [`scheduler_step`] defines the result types for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod composition;
pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use composition::Composition;
pub use graph::Plan;
pub use scheduler::Scheduler;
pub use scheduler_step::{RunSummary, SchedulerStep};
pub use task_info::{ScheduledTask, TaskRunState};
