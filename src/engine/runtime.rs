// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{RunSummary, ScheduledTask};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates step
/// execution to an `ExecutorBackend`.
///
/// All runtime semantics live in `CoreRuntime`; this struct only reads
/// events and carries out the commands the core returns.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    /// Kept only in run-once mode; a watch session just counts its runs.
    finished: Vec<RunSummary>,
    runs: usize,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("runs", &self.runs)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            finished: Vec::new(),
            runs: 0,
        }
    }

    /// Main event loop.
    ///
    /// In run-once mode, returns the summary of every run that finished. A
    /// long-lived session returns an empty list.
    pub async fn run(mut self) -> Result<Vec<RunSummary>> {
        info!("assetdag runtime started");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!(runs = self.runs, "runtime exiting");
        Ok(self.finished)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            CoreCommand::RunFinished(summary) => self.report(summary),
            CoreCommand::RequestExit => debug!("core issued RequestExit command"),
        }
        Ok(())
    }

    fn report(&mut self, summary: RunSummary) {
        if summary.completed() {
            info!(
                run_id = summary.run_id,
                targets = ?summary.targets,
                recovered = ?summary.recovered,
                "run finished"
            );
        } else {
            warn!(
                run_id = summary.run_id,
                targets = ?summary.targets,
                failed = ?summary.failed,
                "run finished with failures"
            );
        }
        self.runs += 1;
        if self.core.exits_when_idle() {
            self.finished.push(summary);
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = tasks[0].run_id, "dispatching ready steps");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
