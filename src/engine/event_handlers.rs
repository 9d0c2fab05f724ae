// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, warn};

use crate::dag::{RunSummary, ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};
use crate::registry::TaskRegistry;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Send these steps to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// A run finished; every step is terminal.
    RunFinished(RunSummary),
    /// Request that the process exits (run-once mode, when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Handle a run request.
///
/// - Idle scheduler: start a new run for this target plus anything queued.
/// - Active run, target's steps not part of it: merge the target's plan into
///   the active run right away, so unrelated targets share one run id.
/// - Active run that already includes one of the target's steps: apply the
///   queue behaviour; the target runs again after the active run.
pub fn handle_run_request(
    registry: &TaskRegistry,
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    target: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    let plan = match registry.plan(&target) {
        Ok(plan) => plan,
        Err(e) => {
            warn!(target = %target, error = %e, "ignoring run request");
            return CoreStep {
                commands: Vec::new(),
                keep_running: true,
            };
        }
    };

    let mut commands = Vec::new();

    if scheduler.is_idle() {
        let mut targets = queue.drain_pending();
        if !targets.contains(&target) {
            targets.push(target);
        }
        debug!(?targets, ?reason, "starting run");
        commands.extend(start_run_from_targets(registry, scheduler, queue, targets));
    } else if scheduler.overlaps(&plan) {
        let kept = queue.record_trigger(&target);
        debug!(target = %target, ?reason, kept, "target busy in active run");
    } else {
        debug!(target = %target, ?reason, "merging target into active run");
        let step = scheduler.extend_run(target, plan);
        push_step(&mut commands, step);
    }

    commands.extend(start_queued_runs(registry, scheduler, queue));
    finish(scheduler, queue, options, commands)
}

/// Handle a step completion.
pub fn handle_step_completion(
    registry: &TaskRegistry,
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    step: TaskName,
    run_id: u64,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let result = scheduler.handle_completion(&step, run_id, outcome);
    if !result.newly_failed.is_empty() {
        debug!(run_id, failed = ?result.newly_failed, "steps failed");
    }
    push_step(&mut commands, result);

    commands.extend(start_queued_runs(registry, scheduler, queue));
    finish(scheduler, queue, options, commands)
}

/// Start a run for `targets`. A batch whose merged plan is cyclic runs its
/// first target alone and puts the rest back in the queue.
pub fn start_run_from_targets(
    registry: &TaskRegistry,
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    mut targets: Vec<TaskName>,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();
    if targets.is_empty() {
        return commands;
    }

    let plan = match registry.plan_for(&targets) {
        Ok(plan) => plan,
        Err(e) if targets.len() > 1 => {
            warn!(error = %e, ?targets, "queued targets conflict; running them one at a time");
            let rest = targets.split_off(1);
            queue.requeue(rest);
            match registry.plan_for(&targets) {
                Ok(plan) => plan,
                Err(e) => {
                    warn!(error = %e, ?targets, "cannot plan target; skipping");
                    return commands;
                }
            }
        }
        Err(e) => {
            warn!(error = %e, ?targets, "cannot plan target; skipping");
            return commands;
        }
    };

    let step = scheduler.start_run(targets, plan);
    push_step(&mut commands, step);
    commands
}

/// Start queued runs while the scheduler is idle. Empty plans finish
/// immediately, so this may start more than one.
fn start_queued_runs(
    registry: &TaskRegistry,
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();

    while scheduler.is_idle() && !queue.is_empty() {
        let targets = queue.drain_pending();
        commands.extend(start_run_from_targets(registry, scheduler, queue, targets));
    }

    commands
}

fn push_step(commands: &mut Vec<CoreCommand>, step: SchedulerStep) {
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }
    if let Some(summary) = step.finished {
        commands.push(CoreCommand::RunFinished(summary));
    }
}

/// In run-once mode, exit when idle with nothing queued.
fn finish(
    scheduler: &Scheduler,
    queue: &TriggerQueue,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
