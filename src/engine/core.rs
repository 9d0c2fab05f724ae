// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) reads events from the
//! channel, hands `ScheduledTask`s to the executor and reports finished
//! runs. The core itself has no channels, no Tokio types and performs no IO.

use std::sync::Arc;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{handle_run_request, handle_step_completion, CoreStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::registry::TaskRegistry;
use crate::types::{TargetState, TriggerWhileRunningBehaviour};

#[derive(Debug)]
pub struct CoreRuntime {
    registry: Arc<TaskRegistry>,
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        registry: Arc<TaskRegistry>,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            registry,
            scheduler: Scheduler::new(),
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Run-once mode: the runtime stops as soon as nothing is left to do.
    pub fn exits_when_idle(&self) -> bool {
        self.options.exit_when_idle
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run state of a target. A queued request wins over an active one.
    pub fn target_state(&self, target: &str) -> TargetState {
        if self.queue.contains(target) {
            return TargetState::Queued;
        }
        match self.registry.plan(target) {
            Ok(plan) if self.scheduler.is_active(&plan) => TargetState::Running,
            _ => TargetState::Idle,
        }
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::RunRequested { target, reason } => handle_run_request(
                &self.registry,
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                target,
                reason,
            ),
            RuntimeEvent::StepCompleted {
                step,
                run_id,
                outcome,
            } => handle_step_completion(
                &self.registry,
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                step,
                run_id,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
