// src/exec/policy.rs

//! What a stage error means for the run.
//!
//! - content errors: notify, the step counts as completed (`Recovered`)
//! - I/O and infrastructure errors: notify, the step failed and its
//!   dependents in the same run will not start

use tracing::{debug, warn};

use crate::engine::TaskOutcome;
use crate::notifier::{Notice, Notifier};
use crate::tasks::StageError;

/// Map a step result to its outcome, notifying on any error.
pub fn apply(step: &str, result: Result<(), StageError>, notifier: &dyn Notifier) -> TaskOutcome {
    let err = match result {
        Ok(()) => return TaskOutcome::Success,
        Err(err) => err,
    };

    notifier.notify(&Notice::from_stage_error(step, &err));

    if err.is_content() {
        debug!(task = %step, stage = %err.stage(), "content error reported; continuing");
        TaskOutcome::Recovered
    } else {
        warn!(task = %step, stage = %err.stage(), error = %err, "step failed");
        TaskOutcome::Failed
    }
}
