//! Shared application state handed to every HTTP handler.

use std::sync::Arc;

use crate::config::ConfigStore;
use crate::db::Repository;
use crate::scheduler::queue::QueueHandles;

/// Everything a handler needs to serve feeds and drive admin actions.
#[derive(Clone)]
pub struct AppState {
    /// Repository handle for feed/item persistence.
    pub repo: Arc<Repository>,
    /// Config cache for feed rule lookup and admin reload.
    pub config_store: Arc<ConfigStore>,
    /// Senders onto the scheduler's priority queues.
    pub queues: QueueHandles,
    /// Required value of `X-API-Key`/bearer token; `None` disables `/api`.
    pub api_access_key: Option<String>,
    /// Local port the server listens on, used to build `atom:link self`.
    pub port: u16,
}
