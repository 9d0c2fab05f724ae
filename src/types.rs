use serde::Deserialize;

/// Public type alias for task names throughout the crate.
pub type TaskName = String;

/// Behaviour when a run is requested for a target whose steps already
/// participate in the active run.
///
/// - `Queue`: remember the request and start a new run when the current one
///   finishes (default behaviour). Repeated requests coalesce into one batch.
/// - `Cancel`: drop any previously queued request and only keep the latest.
///   Steps already executing are never interrupted.
/// - `Drop`: discard the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    Queue,
    Cancel,
    Drop,
}

impl Default for TriggerWhileRunningBehaviour {
    fn default() -> Self {
        TriggerWhileRunningBehaviour::Queue
    }
}

/// Run state of a watch target as seen by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// None of the target's steps are active and nothing is queued for it.
    Idle,
    /// At least one of the target's steps is pending or running.
    Running,
    /// A request for the target waits in the trigger queue.
    Queued,
}
