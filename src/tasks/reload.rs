use tracing::debug;

use crate::tasks::{StageError, Task, TaskContext};

/// Asks every connected browser to reload the page.
#[derive(Debug, Clone, Default)]
pub struct ReloadTask;

impl Task for ReloadTask {
    fn name(&self) -> &str {
        "reload"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let clients = ctx.live.reload();
        debug!(clients, "reload pushed");
        Ok(())
    }
}
