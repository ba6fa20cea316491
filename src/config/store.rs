//! In-memory config cache with reader/writer locking and a handler chain
//! (§4.1). Grounded on the teacher's per-domain cache pattern; the
//! readers-writer lock and copy-on-read snapshot semantics follow the
//! Design Note in spec.md §9 ("no global singletons... immutable value
//! snapshots on read via copy-on-read").

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use super::feed_config::FeedConfig;
use crate::error::Error;

/// Receives notifications whenever a feed's configuration changes.
///
/// Implementors are registered with [`ConfigStore::register_handler`] and
/// invoked synchronously, outside any lock, whenever a file is loaded,
/// reloaded, or removed.
#[async_trait]
pub trait ConfigUpdateHandler: Send + Sync {
    /// Called with the new config (`None` plus `is_delete = true` on removal).
    async fn on_config_update(&self, file: &Path, config: Option<&FeedConfig>, is_delete: bool);
}

/// Thread-safe, hot-reloadable cache mapping config file path → [`FeedConfig`].
pub struct ConfigStore {
    entries: RwLock<HashMap<PathBuf, FeedConfig>>,
    handlers: RwLock<Vec<Arc<dyn ConfigUpdateHandler>>>,
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Loads every `*.yml` file in `dir`. Aborts the whole load if any two
    /// files declare the same `feed.id` (§4.1: "duplicates abort the load
    /// with a diagnostic naming both files").
    pub async fn load_dir(&self, dir: &Path) -> Result<usize, Error> {
        let mut read_dir = tokio::fs::read_dir(dir).await.map_err(Error::Io)?;
        let mut loaded = Vec::new();

        while let Some(entry) = read_dir.next_entry().await.map_err(Error::Io)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yml") {
                continue;
            }
            let yaml = tokio::fs::read_to_string(&path).await.map_err(Error::Io)?;
            let config = FeedConfig::parse(&path.to_string_lossy(), &yaml)?;
            loaded.push((path, config));
        }

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for (path, config) in &loaded {
            if let Some(existing) = seen.insert(config.feed.id.clone(), path.clone()) {
                return Err(Error::Config {
                    file: path.to_string_lossy().into_owned(),
                    message: format!(
                        "duplicate feed.id '{}' also declared in {}",
                        config.feed.id,
                        existing.display()
                    ),
                });
            }
        }

        let count = loaded.len();
        {
            let mut entries = self.entries.write().await;
            entries.clear();
            for (path, config) in &loaded {
                entries.insert(path.clone(), config.clone());
            }
        }

        for (path, config) in &loaded {
            self.notify(path, Some(config), false).await;
        }

        Ok(count)
    }

    /// Reloads a single file. On parse/validation failure, the previous
    /// cached value (if any) is left in place and a warning is logged —
    /// the hot-reload path never replaces a valid entry with a broken one.
    pub async fn reload_file(&self, path: &Path) -> Result<FeedConfig, Error> {
        let yaml = tokio::fs::read_to_string(path).await.map_err(Error::Io)?;
        match FeedConfig::parse(&path.to_string_lossy(), &yaml) {
            Ok(config) => {
                {
                    let mut entries = self.entries.write().await;
                    entries.insert(path.to_path_buf(), config.clone());
                }
                self.notify(path, Some(&config), false).await;
                Ok(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config reload failed, keeping previous value");
                Err(e)
            }
        }
    }

    /// Removes a file from the cache (delete/rename) and notifies handlers
    /// with `is_delete = true`.
    pub async fn remove_file(&self, path: &Path) {
        {
            let mut entries = self.entries.write().await;
            entries.remove(path);
        }
        self.notify(path, None, true).await;
    }

    /// Registers a handler. Handlers are invoked in registration order.
    pub async fn register_handler(&self, handler: Arc<dyn ConfigUpdateHandler>) {
        self.handlers.write().await.push(handler);
    }

    async fn notify(&self, path: &Path, config: Option<&FeedConfig>, is_delete: bool) {
        // Snapshot the handler list so we never hold `handlers` (or `entries`)
        // while calling out, avoiding reentrant deadlock.
        let handlers = self.handlers.read().await.clone();
        for handler in &handlers {
            handler.on_config_update(path, config, is_delete).await;
        }
    }

    /// Looks up a config by its source file path.
    pub async fn get_by_file(&self, path: &Path) -> Option<FeedConfig> {
        self.entries.read().await.get(path).cloned()
    }

    /// Looks up a config by its stable `feed.id`.
    pub async fn get_by_feed_id(&self, feed_id: &str) -> Option<FeedConfig> {
        self.entries
            .read()
            .await
            .values()
            .find(|c| c.feed.id == feed_id)
            .cloned()
    }

    /// Looks up the source file path a `feed.id` was loaded from, for
    /// provenance (`Feed::config_file`).
    pub async fn get_file_for_feed_id(&self, feed_id: &str) -> Option<PathBuf> {
        self.entries
            .read()
            .await
            .iter()
            .find(|(_, c)| c.feed.id == feed_id)
            .map(|(path, _)| path.clone())
    }

    /// Returns copies of every loaded config, regardless of `enabled`.
    pub async fn get_all(&self) -> Vec<FeedConfig> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Returns copies of every loaded config with `settings.enabled == true`.
    pub async fn get_enabled(&self) -> Vec<FeedConfig> {
        self.entries
            .read()
            .await
            .values()
            .filter(|c| c.settings.enabled)
            .cloned()
            .collect()
    }

    /// Number of loaded configs.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store has no loaded configs.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn write_feed_yaml(dir: &Path, name: &str, feed_id: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(
            &path,
            format!(
                "feed:\n  id: {feed_id}\n  url: https://example.com/{feed_id}.xml\n  title: {feed_id}\n"
            ),
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn load_dir_rejects_duplicate_feed_ids() {
        let dir = tempdir().unwrap();
        write_feed_yaml(dir.path(), "a.yml", "dup");
        write_feed_yaml(dir.path(), "b.yml", "dup");

        let store = ConfigStore::new();
        let err = store.load_dir(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn load_dir_populates_cache_by_file_and_feed_id() {
        let dir = tempdir().unwrap();
        let path = write_feed_yaml(dir.path(), "a.yml", "feed-a");

        let store = ConfigStore::new();
        let count = store.load_dir(dir.path()).await.unwrap();
        assert_eq!(count, 1);

        assert!(store.get_by_file(&path).await.is_some());
        assert!(store.get_by_feed_id("feed-a").await.is_some());
        assert!(store.get_by_feed_id("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn reload_file_picks_up_an_on_disk_edit() {
        let dir = tempdir().unwrap();
        let path = write_feed_yaml(dir.path(), "a.yml", "feed-a");

        let store = ConfigStore::new();
        store.load_dir(dir.path()).await.unwrap();
        assert_eq!(store.get_by_feed_id("feed-a").await.unwrap().feed.title, "feed-a");

        std::fs::write(
            &path,
            "feed:\n  id: feed-a\n  url: https://example.com/feed-a.xml\n  title: Edited Title\n",
        )
        .unwrap();
        let resolved_path = store.get_file_for_feed_id("feed-a").await.unwrap();
        assert_eq!(resolved_path, path);
        store.reload_file(&resolved_path).await.unwrap();

        let reloaded = store.get_by_feed_id("feed-a").await.unwrap();
        assert_eq!(reloaded.feed.title, "Edited Title");
    }

    #[tokio::test]
    async fn reload_keeps_previous_value_on_invalid_file() {
        let dir = tempdir().unwrap();
        let path = write_feed_yaml(dir.path(), "a.yml", "feed-a");

        let store = ConfigStore::new();
        store.load_dir(dir.path()).await.unwrap();

        std::fs::write(&path, "feed:\n  id: \"\"\n  url: x\n  title: x\n").unwrap();
        let err = store.reload_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let cached = store.get_by_file(&path).await.unwrap();
        assert_eq!(cached.feed.id, "feed-a");
    }

    struct CountingHandler {
        calls: Mutex<Vec<bool>>,
        count: AtomicUsize,
    }

    #[async_trait]
    impl ConfigUpdateHandler for CountingHandler {
        async fn on_config_update(&self, _file: &Path, _config: Option<&FeedConfig>, is_delete: bool) {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(is_delete);
        }
    }

    #[tokio::test]
    async fn handlers_are_notified_on_load_and_delete() {
        let dir = tempdir().unwrap();
        let path = write_feed_yaml(dir.path(), "a.yml", "feed-a");

        let store = ConfigStore::new();
        let handler = Arc::new(CountingHandler {
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        });
        store.register_handler(handler.clone()).await;

        store.load_dir(dir.path()).await.unwrap();
        assert_eq!(handler.count.load(Ordering::SeqCst), 1);

        store.remove_file(&path).await;
        assert_eq!(handler.count.load(Ordering::SeqCst), 2);
        assert_eq!(*handler.calls.lock().unwrap(), vec![false, true]);
        assert!(store.get_by_file(&path).await.is_none());
    }
}
