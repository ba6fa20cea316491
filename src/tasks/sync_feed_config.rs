//! `SyncFeedConfig` (priority Top, §4.5): upserts the feed row from config.

use super::TaskContext;
use crate::error::{Error, Result};

/// Idempotent: upserts the feed row for `feed_id` from the current cached
/// config, sets its enabled state, and — if the URL changed — clears
/// `next_fetch_at` so the next tick reprocesses it immediately.
pub async fn run(ctx: &TaskContext, feed_id: &str) -> Result<()> {
    let config = ctx
        .config_store
        .get_by_feed_id(feed_id)
        .await
        .ok_or_else(|| Error::NotFound(format!("no config loaded for feed '{feed_id}'")))?;

    let config_file = match ctx.config_store.get_file_for_feed_id(feed_id).await {
        Some(path) => path.to_string_lossy().into_owned(),
        None => ctx
            .repo
            .get_feed_by_id(feed_id)
            .await?
            .map(|f| f.config_file)
            .unwrap_or_else(|| format!("{}.yml", config.feed.id)),
    };

    let result = ctx
        .repo
        .upsert_feed_with_change_detection(&config_file, &config.feed.id, &config.feed.url, &config.feed.title)
        .await?;

    ctx.repo.set_feed_enabled(result.db_id, config.settings.enabled).await?;

    if result.url_changed {
        ctx.repo.update_next_fetch(result.db_id, None).await?;
        tracing::info!(feed_id, "feed URL changed, scheduling immediate reprocessing");
    }

    Ok(())
}
