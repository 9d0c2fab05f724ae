// src/dag/state_manager.rs

//! Per-run state transitions for the steps in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::Plan;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::types::TaskName;

/// Manages per-run state transitions for steps.
pub struct StateManager<'a> {
    plan: &'a Plan,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(
        plan: &'a Plan,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        run_id: u64,
    ) -> Self {
        Self {
            plan,
            tasks,
            run_id,
        }
    }

    /// Mark all pending or running dependents (transitively) of a failed step
    /// as `DoneFailed` for this run.
    ///
    /// Returns the newly failed dependents, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self
            .plan
            .dependents_of(failed_task)
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if matches!(info.run_state, RunState::Pending | RunState::Running) {
                    info.run_state = RunState::DoneFailed;
                    debug!(
                        task = %info.name,
                        run_id = self.run_id,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    newly_failed.push(info.name.clone());
                    stack.extend(self.plan.dependents_of(&name).into_iter().map(|s| s.to_string()));
                }
            }
        }

        newly_failed
    }

    /// Collect pending steps whose dependencies are satisfied, mark them
    /// `Running`, and return them in name order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let tasks: &HashMap<TaskName, TaskInfo> = &*self.tasks;
        let mut candidates: Vec<TaskName> = tasks
            .values()
            .filter(|info| info.run_state == RunState::Pending && deps_satisfied(tasks, info))
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info!(
                    task = %info.name,
                    run_id = self.run_id,
                    "dependencies satisfied; scheduling step"
                );
                info.run_state = RunState::Running;
                ready.push(ScheduledTask {
                    name,
                    run_id: self.run_id,
                });
            }
        }

        ready
    }

    /// Check if all steps are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }
}

/// Whether every dependency of `info` completed in this run.
pub fn deps_satisfied(tasks: &HashMap<TaskName, TaskInfo>, info: &TaskInfo) -> bool {
    info.deps.iter().all(|dep_name| match tasks.get(dep_name) {
        Some(dep) => dep.run_state.satisfies_dependents(),
        None => {
            warn!(
                task = %info.name,
                dep = %dep_name,
                "dependency missing from run; treating as unsatisfied"
            );
            false
        }
    })
}
