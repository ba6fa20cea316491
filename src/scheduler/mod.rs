//! The priority task scheduler (§4.6, C7): worker pool, tick loop, and
//! capped-exponential retry, built over the three priority queues.
//!
//! Grounded on the teacher's `rss_scheduler.rs` tick-loop-plus-worker-pool
//! shape, generalized from its single FIFO queue to the three independently
//! bounded priority queues spec.md's Design Note §9 requires, and on
//! `downloader/queue_processor.rs` for the cancellation-aware worker loop.

pub mod queue;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::db::Repository;
use crate::retry::{backoff_delay, IsRetryable};
use crate::tasks::{Task, TaskContext};
use crate::types::{Priority, TaskId, TaskKind};

use queue::{QueueHandles, QueueReceivers};

/// Per-task hard deadline; `Execute` is aborted if it runs longer than this.
const TASK_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// Owns the worker pool, the three priority queues, and the periodic tick
/// loop that keeps them fed.
pub struct Scheduler {
    queues: QueueHandles,
    receivers: Mutex<Option<QueueReceivers>>,
    ctx: TaskContext,
    worker_count: usize,
    tick_interval: Duration,
    next_task_id: AtomicU64,
    cancellation: CancellationToken,
}

impl Scheduler {
    /// Builds a scheduler and its queue handles. Does not start any
    /// background work until [`Scheduler::spawn`]; the returned
    /// [`QueueHandles`] is safe to clone and hand to admin callers before
    /// `spawn` runs.
    pub fn new(
        repo: Arc<Repository>,
        config_store: Arc<ConfigStore>,
        http_client: reqwest::Client,
        user_agent: String,
        worker_count: usize,
        tick_interval: Duration,
    ) -> (Self, QueueHandles) {
        let cancellation = CancellationToken::new();
        let (queues, receivers) = queue::build();

        let ctx = TaskContext {
            repo,
            config_store,
            http_client,
            user_agent,
            cancellation: cancellation.clone(),
        };

        let scheduler = Self {
            queues: queues.clone(),
            receivers: Mutex::new(Some(receivers)),
            ctx,
            worker_count,
            tick_interval,
            next_task_id: AtomicU64::new(1),
            cancellation,
        };

        (scheduler, queues)
    }

    fn next_id(&self) -> TaskId {
        TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Enqueues a task, logging (not failing) on backpressure per §4.6 step 5.
    fn enqueue(&self, kind: TaskKind, feed_id: impl Into<String>) {
        let feed_id = feed_id.into();
        let task = Task::new(self.next_id(), kind, feed_id.clone());
        if self.queues.try_enqueue(task).is_err() {
            warn!(feed_id, ?kind, "queue full, task dropped this tick");
        }
    }

    /// Signals shutdown; callers should then `.await` the handles returned
    /// by [`Scheduler::spawn`] to observe drain completion.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Spawns the worker pool and the tick loop as background tasks.
    /// Panics if called more than once on the same scheduler.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut guard = match self.receivers.try_lock() {
            Ok(guard) => guard,
            Err(_) => panic!("Scheduler::spawn is not called concurrently with itself"),
        };
        let receivers = match guard.take() {
            Some(receivers) => receivers,
            None => panic!("Scheduler::spawn called more than once"),
        };
        drop(guard);
        let receivers = Arc::new(Mutex::new(receivers));
        let mut handles = Vec::new();

        for worker_id in 0..self.worker_count {
            let scheduler = self.clone();
            let receivers = receivers.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_worker(worker_id, receivers).await;
            }));
        }

        let tick_scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            tick_scheduler.run_tick_loop().await;
        }));

        handles
    }

    async fn run_worker(&self, worker_id: usize, receivers: Arc<Mutex<QueueReceivers>>) {
        loop {
            let task = tokio::select! {
                _ = self.cancellation.cancelled() => None,
                task = async {
                    let mut receivers = receivers.lock().await;
                    receivers.recv().await
                } => task,
            };

            let Some(mut task) = task else {
                debug!(worker_id, "worker exiting");
                return;
            };

            let result = tokio::select! {
                r = tokio::time::timeout(TASK_DEADLINE, task.execute(&self.ctx)) => {
                    r.unwrap_or_else(|_| Err(crate::error::Error::Other("task exceeded its deadline".into())))
                }
                _ = self.cancellation.cancelled() => Err(crate::error::Error::Cancelled),
            };

            if let Err(e) = result {
                self.handle_failure(task, e);
            }
        }
    }

    fn handle_failure(&self, mut task: Task, error: crate::error::Error) {
        if matches!(error, crate::error::Error::Cancelled) {
            return;
        }

        if !error.is_retryable() || !task.can_retry() {
            warn!(
                task_id = %task.id(),
                kind = ?task.kind(),
                feed_id = task.feed_id(),
                retries = task.retry_count(),
                error = %error,
                "task failed terminally"
            );
            return;
        }

        task.increment_retry_count();
        let delay = backoff_delay(task.retry_count());
        let queues = self.queues.clone();
        let cancellation = self.cancellation.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if queues.try_enqueue(task).is_err() {
                        warn!("retry re-enqueue failed: queue full");
                    }
                }
                _ = cancellation.cancelled() => {
                    debug!("abandoning retry timer, scheduler is shutting down");
                }
            }
        });
    }

    async fn run_tick_loop(&self) {
        self.sync_unknown_feeds().await;

        let mut ticker = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    info!("tick loop stopping");
                    return;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn sync_unknown_feeds(&self) {
        let configs = self.ctx.config_store.get_all().await;
        for config in configs {
            match self.ctx.repo.get_feed_by_id(&config.feed.id).await {
                Ok(None) => self.enqueue(TaskKind::SyncFeedConfig, config.feed.id),
                Ok(Some(_)) => {}
                Err(e) => warn!(feed_id = %config.feed.id, error = %e, "failed to check feed existence at startup"),
            }
        }
    }

    async fn tick(&self) {
        let due = match self.ctx.repo.get_feeds_due_for_refresh().await {
            Ok(feeds) => feeds,
            Err(e) => {
                warn!(error = %e, "failed to fetch feeds due for refresh");
                return;
            }
        };

        let enabled_ids: HashSet<String> = self
            .ctx
            .config_store
            .get_enabled()
            .await
            .into_iter()
            .map(|c| c.feed.id)
            .collect();

        for feed in due {
            if !enabled_ids.contains(&feed.feed_id) {
                continue;
            }

            self.enqueue(TaskKind::ProcessFeed, feed.feed_id.clone());

            if let Some(config) = self.ctx.config_store.get_by_feed_id(&feed.feed_id).await
                && config.settings.extract_content {
                    self.enqueue(TaskKind::ExtractContent, feed.feed_id.clone());
                }
        }
    }

    /// Also exposes the priority used by a task kind, mirroring spec.md's
    /// enumerated task→priority mapping (§4.5).
    pub fn priority_of(kind: TaskKind) -> Priority {
        kind.priority()
    }
}
