//! Optional filesystem watcher for the feeds directory (§4.1).
//!
//! Grounded on the teacher's `folder_watcher.rs` (a `notify` watcher draining
//! events through an mpsc channel), generalized with a per-path debounce map
//! since the spec requires create/modify events to be coalesced by 500ms
//! (the teacher's NZB-drop watcher has no such requirement — NZB files land
//! via a single atomic write, config files may be written incrementally by
//! an editor).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::store::ConfigStore;
use crate::error::Error;

/// Rapid events on the same path within this window collapse into one reload.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches a feeds directory and keeps a [`ConfigStore`] in sync.
pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    store: Arc<ConfigStore>,
    dir: PathBuf,
    last_event: HashMap<PathBuf, Instant>,
}

impl ConfigWatcher {
    /// Creates a watcher over `dir`, backed by `store`.
    pub fn new(store: Arc<ConfigStore>, dir: PathBuf) -> Result<Self, Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                if let Err(e) = tx.send(res) {
                    error!("failed to forward filesystem event: {e}");
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::ConfigWatch(e.to_string()))?;

        Ok(Self {
            watcher,
            rx,
            store,
            dir,
            last_event: HashMap::new(),
        })
    }

    /// Begins watching the configured directory (non-recursive).
    pub fn start(&mut self) -> Result<(), Error> {
        self.watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::ConfigWatch(e.to_string()))?;
        info!(dir = %self.dir.display(), "watching feeds directory for changes");
        Ok(())
    }

    /// Runs the event loop until the channel closes. Intended to be spawned
    /// as a background task.
    pub async fn run(mut self) {
        while let Some(result) = self.rx.recv().await {
            match result {
                Ok(event) => self.handle_event(event).await,
                Err(e) => warn!("filesystem watch error: {e}"),
            }
        }
        info!("config watcher stopped");
    }

    async fn handle_event(&mut self, event: Event) {
        for path in &event.paths {
            if !is_feed_config(path) {
                continue;
            }

            let now = Instant::now();
            if let Some(last) = self.last_event.get(path)
                && now.duration_since(*last) < DEBOUNCE {
                    self.last_event.insert(path.clone(), now);
                    continue;
                }
            self.last_event.insert(path.clone(), now);

            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    if let Err(e) = self.store.reload_file(path).await {
                        warn!(path = %path.display(), error = %e, "failed to reload config");
                    }
                }
                EventKind::Remove(_) => {
                    self.store.remove_file(path).await;
                }
                _ => {}
            }
        }
    }
}

/// Whether `path` looks like a feed config file (`*.yml`).
pub fn is_feed_config(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("yml")
}
