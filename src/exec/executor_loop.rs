// src/exec/executor_loop.rs

//! Main executor loop that runs scheduled steps.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::policy;
use crate::registry::TaskRegistry;
use crate::tasks::{StageError, TaskContext};

/// Spawn the background executor loop.
///
/// The returned sender is what `RealExecutorBackend` forwards scheduled
/// steps to. Each step runs on the blocking pool, and per step name there is
/// never more than one invocation at a time: a second request for a step
/// still running waits for the first to finish.
pub fn spawn_executor(
    registry: Arc<TaskRegistry>,
    ctx: TaskContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<String, JoinHandle<()>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            active.retain(|_, handle| !handle.is_finished());
            let previous = active.remove(&task.name);
            let name = task.name.clone();
            let handle = tokio::spawn(run_step(
                task,
                Arc::clone(&registry),
                ctx.clone(),
                runtime_tx.clone(),
                previous,
            ));
            active.insert(name, handle);
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn run_step(
    task: ScheduledTask,
    registry: Arc<TaskRegistry>,
    ctx: TaskContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        debug!(task = %task.name, "waiting for previous invocation of step");
        let _ = previous.await;
    }

    let outcome = match registry.step(&task.name) {
        Some(step) => {
            info!(task = %task.name, run_id = task.run_id, "starting step");
            let notifier = Arc::clone(&ctx.notifier);
            let result = tokio::task::spawn_blocking(move || step.run(&ctx))
                .await
                .unwrap_or_else(|e| Err(StageError::infrastructure(&task.name, e.to_string())));
            let outcome = policy::apply(&task.name, result, notifier.as_ref());
            info!(task = %task.name, run_id = task.run_id, ?outcome, "step finished");
            outcome
        }
        None => {
            error!(task = %task.name, run_id = task.run_id, "scheduled name is not a step");
            TaskOutcome::Failed
        }
    };

    if let Err(e) = runtime_tx
        .send(RuntimeEvent::StepCompleted {
            step: task.name.clone(),
            run_id: task.run_id,
            outcome,
        })
        .await
    {
        debug!(task = %task.name, error = %e, "runtime gone; completion not delivered");
    }
}
