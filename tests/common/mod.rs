#![allow(dead_code)]

pub use assetdag_test_utils::builders;
pub use assetdag_test_utils::fake_executor::FakeExecutor;
pub use assetdag_test_utils::fixtures;
pub use assetdag_test_utils::{init_tracing, with_timeout};

use std::path::Path;
use std::sync::Arc;

use assetdag::fs::mock::MockFileSystem;
use assetdag::notifier::RecordingNotifier;
use assetdag::server::LiveReload;
use assetdag::tasks::TaskContext;

/// Context over an in-memory filesystem, with the notifier handed back for
/// assertions.
pub fn mock_context(fs: &MockFileSystem) -> (TaskContext, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = TaskContext::new(Arc::new(fs.clone()), LiveReload::new(), notifier.clone());
    (ctx, notifier)
}

/// Root that mock-filesystem configs are anchored on.
pub fn site_root() -> &'static Path {
    Path::new("/site")
}
