// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::types::{TaskName, TriggerWhileRunningBehaviour};

/// Requests for targets that arrived while their steps were part of the
/// active run.
///
/// Semantics:
/// - Each entry is a *batch* of target names to run together once the
///   active run is over.
/// - `max_runs` (`queue_length`) bounds the number of batches kept. The
///   default is 1: at most one future run is remembered.
/// - `drain_pending()` merges every batch into one list of targets, so
///   repeated requests for the same target coalesce into one re-run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of queued batches.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether `target` waits in any batch.
    pub fn contains(&self, target: &str) -> bool {
        self.runs.iter().any(|batch| batch.contains(target))
    }

    /// Record a request that arrived while `target` was running.
    ///
    /// - `Queue`: merge into the last batch (or open the first one), then
    ///   drop the oldest batches beyond `max_runs`.
    /// - `Cancel`: forget every queued batch and keep only this request.
    /// - `Drop`: discard the request.
    ///
    /// Returns whether the request was kept.
    pub fn record_trigger(&mut self, target: &str) -> bool {
        let name = target.to_string();

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if let Some(last_batch) = self.runs.back_mut() {
                    let inserted = last_batch.insert(name.clone());
                    debug!(target = %name, inserted, "merged request into last queued batch");
                } else {
                    self.runs.push_back(BTreeSet::from([name.clone()]));
                    debug!(target = %name, "created first queued batch");
                }

                if self.runs.len() > self.max_runs {
                    warn!(
                        current_batches = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping oldest queued batches"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
                true
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(target = %name, "replacing queued batches with this request");
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([name]));
                true
            }
            TriggerWhileRunningBehaviour::Drop => {
                debug!(target = %name, "target already running; request dropped");
                false
            }
        }
    }

    /// Put targets back at the front, bypassing the behaviour. Used when a
    /// drained batch cannot run as a single plan.
    pub fn requeue(&mut self, targets: Vec<TaskName>) {
        if targets.is_empty() {
            return;
        }
        self.runs.push_front(targets.into_iter().collect());
    }

    /// Drain every queued batch into one list of targets (sorted, no
    /// duplicates).
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let mut merged: BTreeSet<TaskName> = BTreeSet::new();
        while let Some(batch) = self.runs.pop_front() {
            merged.extend(batch);
        }

        let targets: Vec<TaskName> = merged.into_iter().collect();
        debug!(drained = targets.len(), "drained queued requests into new run");
        targets
    }
}
