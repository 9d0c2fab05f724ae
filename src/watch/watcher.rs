// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::event_handler::ChangeFilter;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher over the filter's source root and send
/// `RuntimeEvent::RunRequested` for every watch target whose patterns match
/// a changed path.
pub fn spawn_watcher(
    mut filter: ChangeFilter,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root: PathBuf = filter.root().to_path_buf();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetdag: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetdag: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }

            // Hashing reads files; keep it off the async workers.
            let paths = event.paths;
            let joined = tokio::task::spawn_blocking(move || {
                let targets = filter.targets_for_paths(&paths);
                (filter, targets)
            })
            .await;

            let targets = match joined {
                Ok((returned, targets)) => {
                    filter = returned;
                    targets
                }
                Err(err) => {
                    warn!("watch filter panicked: {err}");
                    break;
                }
            };

            for target in targets {
                if let Err(err) = runtime_tx
                    .send(RuntimeEvent::RunRequested {
                        target,
                        reason: TriggerReason::FileWatch,
                    })
                    .await
                {
                    // The runtime is gone; nothing left to notify.
                    debug!("failed to send RuntimeEvent::RunRequested: {err}");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
