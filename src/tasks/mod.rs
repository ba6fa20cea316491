//! The four task variants the scheduler dispatches (§4.5, C6).
//!
//! Grounded on the teacher's `scheduler_task.rs` (a common task trait wrapping
//! heterogeneous work, with retry bookkeeping living on the task rather than
//! the queue), adapted from single-download tasks to the four feed-pipeline
//! variants this proxy needs.

mod extract_content;
mod process_feed;
mod refilter_feed;
mod sync_feed_config;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigStore;
use crate::db::Repository;
use crate::error::Result;
use crate::types::{TaskId, TaskKind};

/// Maximum retry attempts before a task's failure is treated as terminal.
pub const MAX_RETRIES: u32 = 3;

/// Shared collaborators every task needs to do its work.
#[derive(Clone)]
pub struct TaskContext {
    /// Repository handle for feed/item persistence.
    pub repo: Arc<Repository>,
    /// Config cache for feed rule lookup.
    pub config_store: Arc<ConfigStore>,
    /// Shared HTTP client for feed and article fetches.
    pub http_client: Client,
    /// `User-Agent` header value sent on upstream requests.
    pub user_agent: String,
    /// Root cancellation token, honored between and within tasks.
    pub cancellation: CancellationToken,
}

/// One unit of scheduled work (§3 Task, §4.5).
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    /// External (config-space) feed identifier this task operates on.
    feed_id: String,
    retry_count: u32,
    max_retries: u32,
    started_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Builds a fresh task with `retry_count = 0`.
    pub fn new(id: TaskId, kind: TaskKind, feed_id: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            feed_id: feed_id.into(),
            retry_count: 0,
            max_retries: MAX_RETRIES,
            started_at: None,
        }
    }

    /// This task's unique id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// This task's variant, which determines its scheduling priority.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// The external feed identifier this task operates on.
    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    /// Number of retries attempted so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Maximum retries before this task's failure is terminal.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Records one more retry attempt.
    pub fn increment_retry_count(&mut self) {
        self.retry_count += 1;
    }

    /// Whether this task may be re-enqueued after another failure.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Runs this task's logic to completion. Per spec.md §7, item-level
    /// failures inside a task are absorbed; only feed-level/upstream/store
    /// failures are surfaced here and subject to scheduler retry.
    pub async fn execute(&mut self, ctx: &TaskContext) -> Result<()> {
        self.started_at = Some(Utc::now());
        let start = Instant::now();

        let result = match self.kind {
            TaskKind::SyncFeedConfig => sync_feed_config::run(ctx, &self.feed_id).await,
            TaskKind::ProcessFeed => process_feed::run(ctx, &self.feed_id).await,
            TaskKind::RefilterFeed => refilter_feed::run(ctx, &self.feed_id).await,
            TaskKind::ExtractContent => extract_content::run(ctx, &self.feed_id).await,
        };

        tracing::debug!(
            task_id = %self.id,
            kind = ?self.kind,
            feed_id = %self.feed_id,
            duration_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "task finished"
        );

        result
    }
}
