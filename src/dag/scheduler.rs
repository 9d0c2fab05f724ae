use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::Plan;
use crate::dag::scheduler_step::{RunSummary, SchedulerStep};
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::TaskOutcome;
use crate::types::TaskName;

/// Scheduler holds the plan of the active run plus per-step run state.
///
/// It is responsible for:
/// - starting a run from a flattened [`Plan`]
/// - merging further disjoint plans into the active run
/// - deciding when a step is ready (all of its deps completed)
/// - failing dependents when a step fails
/// - producing a [`RunSummary`] once every step is terminal
#[derive(Debug, Default)]
pub struct Scheduler {
    plan: Plan,
    tasks: HashMap<TaskName, TaskInfo>,
    targets: Vec<TaskName>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Plan of the active run (empty when idle).
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Targets requested for the active run.
    pub fn targets(&self) -> &[TaskName] {
        &self.targets
    }

    /// Read-only view of the given step's run state.
    pub fn run_state_of(&self, step: &str) -> TaskRunState {
        self.tasks.get(step).map(|info| info.run_state).into()
    }

    /// Whether any step of `plan` participates in the active run.
    pub fn overlaps(&self, plan: &Plan) -> bool {
        !self.is_idle() && !self.plan.is_disjoint(plan)
    }

    /// Whether any step of `plan` is still pending or running.
    pub fn is_active(&self, plan: &Plan) -> bool {
        plan.steps().any(|s| {
            self.tasks
                .get(s)
                .map(|info| !info.run_state.is_terminal())
                .unwrap_or(false)
        })
    }

    /// Start a new run over `plan`. An active run is extended instead.
    pub fn start_run(&mut self, targets: Vec<TaskName>, plan: Plan) -> SchedulerStep {
        if !self.is_idle() {
            warn!("start_run called during an active run; merging into it");
            self.targets.extend(targets);
            self.add_steps(&plan);
            return self.schedule_ready();
        }

        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.plan = Plan::new();
        self.tasks.clear();
        self.targets = targets;

        info!(
            run_id = self.run_counter,
            targets = ?self.targets,
            steps = plan.len(),
            "scheduler: starting new run"
        );

        self.add_steps(&plan);
        self.schedule_ready()
    }

    /// Merge a plan into the active run. Steps already in the run are left
    /// alone; callers should only merge plans that are disjoint from it.
    pub fn extend_run(&mut self, target: TaskName, plan: Plan) -> SchedulerStep {
        if self.is_idle() {
            return self.start_run(vec![target], plan);
        }

        debug!(
            run_id = self.current_run_id,
            target = %target,
            "scheduler: merging target into active run"
        );

        self.targets.push(target);
        self.add_steps(&plan);
        self.schedule_ready()
    }

    /// Handle completion of a step with a concrete outcome.
    ///
    /// Completions carrying a `run_id` other than the active one are ignored.
    pub fn handle_completion(
        &mut self,
        step: &str,
        run_id: u64,
        outcome: TaskOutcome,
    ) -> SchedulerStep {
        let current = match self.current_run_id {
            Some(id) if id == run_id => id,
            _ => {
                warn!(
                    task = %step,
                    run_id,
                    current_run_id = self.current_run_id,
                    "completion for inactive run; ignoring"
                );
                return SchedulerStep::default();
            }
        };

        let mut result = SchedulerStep::default();

        match self.tasks.get_mut(step) {
            Some(info) if info.run_state == RunState::Running => match outcome {
                TaskOutcome::Success => {
                    info.run_state = RunState::DoneSuccess;
                    debug!(task = %info.name, run_id = current, "step completed successfully");
                }
                TaskOutcome::Recovered => {
                    info.run_state = RunState::DoneRecovered;
                    debug!(task = %info.name, run_id = current, "step recovered from content error");
                }
                TaskOutcome::Failed => {
                    info.run_state = RunState::DoneFailed;
                    warn!(
                        task = %step,
                        run_id = current,
                        "step failed; failing dependents in this run"
                    );
                    result.newly_failed.push(step.to_string());
                    let mut manager = StateManager::new(&self.plan, &mut self.tasks, current);
                    result.newly_failed.extend(manager.mark_dependents_failed(step));
                }
            },
            Some(info) => {
                warn!(
                    task = %step,
                    state = ?info.run_state,
                    "completion for step that is not running; ignoring"
                );
                return result;
            }
            None => {
                warn!(task = %step, "completion for unknown step; ignoring");
                return result;
            }
        }

        let next = self.schedule_ready();
        result.newly_scheduled = next.newly_scheduled;
        result.finished = next.finished;
        result
    }

    fn add_steps(&mut self, plan: &Plan) {
        for name in plan.steps() {
            if self.tasks.contains_key(name) {
                continue;
            }
            let deps = plan
                .dependencies_of(name)
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            self.tasks
                .insert(name.to_string(), TaskInfo::pending(name.to_string(), deps));
        }
        self.plan.merge(plan);
    }

    fn schedule_ready(&mut self) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            return SchedulerStep::default();
        };

        let mut manager = StateManager::new(&self.plan, &mut self.tasks, run_id);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            finished,
        }
    }

    /// If every step is terminal, close the run and summarize it.
    fn maybe_finish_run(&mut self) -> Option<RunSummary> {
        let run_id = self.current_run_id?;

        let manager = StateManager::new(&self.plan, &mut self.tasks, run_id);
        if !manager.all_tasks_terminal() {
            return None;
        }

        let mut summary = RunSummary {
            run_id,
            targets: std::mem::take(&mut self.targets),
            ..RunSummary::default()
        };
        for info in self.tasks.values() {
            let bucket = match info.run_state {
                RunState::DoneSuccess => &mut summary.succeeded,
                RunState::DoneRecovered => &mut summary.recovered,
                _ => &mut summary.failed,
            };
            bucket.push(info.name.clone());
        }
        summary.succeeded.sort();
        summary.recovered.sort();
        summary.failed.sort();

        info!(
            run_id,
            succeeded = summary.succeeded.len(),
            recovered = summary.recovered.len(),
            failed = summary.failed.len(),
            "scheduler: all steps terminal; run finished"
        );

        self.current_run_id = None;
        self.plan = Plan::new();
        self.tasks.clear();
        Some(summary)
    }
}
