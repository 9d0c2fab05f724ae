//! Shared helpers for the `assetdag` integration tests.

pub mod builders;
pub mod fake_executor;
pub mod fixtures;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

/// Env var read by the test subscriber; same name the binary uses.
pub const TEST_LOG_ENV: &str = "ASSETDAG_LOG";

/// Upper bound for a single awaited operation in tests. Full builds run
/// real transformers (oxipng, lightningcss), so this is generous.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(20);

static INIT: Once = Once::new();

/// Install a test-captured tracing subscriber once per test binary.
///
/// Output is only shown for failing tests. `ASSETDAG_LOG=debug` raises the
/// level; the default keeps the pipelines quiet.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(TEST_LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("assetdag=warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("operation did not finish within {TEST_TIMEOUT:?}"),
    }
}
