//! Feed CRUD and scheduling queries (§4.2).

use chrono::{DateTime, Utc};

use super::Repository;
use crate::error::{DatabaseError, Error, Result};
use crate::types::{Feed, FeedDbId};

/// Result of [`Repository::upsert_feed_with_change_detection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpsertFeedResult {
    /// Database id of the (possibly newly-created) feed row.
    pub db_id: FeedDbId,
    /// Whether the feed's URL differed from the previously stored value.
    pub url_changed: bool,
}

impl Repository {
    /// Upserts by `feed_id`; reports whether the URL differed from the prior row.
    pub async fn upsert_feed_with_change_detection(
        &self,
        config_file: &str,
        feed_id: &str,
        url: &str,
        title: &str,
    ) -> Result<UpsertFeedResult> {
        let existing = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, feed_url FROM feeds WHERE feed_id = $1",
        )
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("upsert_feed lookup: {e}"))))?;

        if let Some((id, existing_url)) = existing {
            sqlx::query(
                "UPDATE feeds SET config_file = $1, feed_url = $2, title = $3, updated_at = now() WHERE id = $4",
            )
            .bind(config_file)
            .bind(url)
            .bind(title)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("upsert_feed update: {e}"))))?;

            return Ok(UpsertFeedResult {
                db_id: FeedDbId(id),
                url_changed: existing_url != url,
            });
        }

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feeds (feed_id, config_file, feed_url, title, is_enabled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, true, now(), now())
            RETURNING id
            "#,
        )
        .bind(feed_id)
        .bind(config_file)
        .bind(url)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("upsert_feed insert: {e}"))))?;

        Ok(UpsertFeedResult {
            db_id: FeedDbId(row.0),
            url_changed: false,
        })
    }

    /// Updates feed-level metadata after a successful parse; advances `updated_at`.
    pub async fn update_feed_metadata(
        &self,
        db_id: FeedDbId,
        link: Option<&str>,
        image_url: Option<&str>,
        language: Option<&str>,
        feed_published_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds
            SET link = $1, image_url = $2, language = $3, feed_published_at = $4, updated_at = now()
            WHERE id = $5
            "#,
        )
        .bind(link)
        .bind(image_url)
        .bind(language)
        .bind(feed_published_at)
        .bind(db_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("update_feed_metadata: {e}"))))?;

        Ok(())
    }

    /// Sets `next_fetch_at` and `last_fetched_at = now()`, and advances
    /// `updated_at` since this is the only write on the change-detection
    /// short-circuit path (`tasks/process_feed.rs`). Passing `None` means
    /// "fetch immediately on next tick".
    pub async fn update_next_fetch(&self, db_id: FeedDbId, t: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query("UPDATE feeds SET next_fetch_at = $1, last_fetched_at = now(), updated_at = now() WHERE id = $2")
            .bind(t)
            .bind(db_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("update_next_fetch: {e}"))))?;

        Ok(())
    }

    /// Enables/disables scheduling for a feed without destroying its data.
    pub async fn set_feed_enabled(&self, db_id: FeedDbId, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE feeds SET is_enabled = $1, updated_at = now() WHERE id = $2")
            .bind(enabled)
            .bind(db_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("set_feed_enabled: {e}"))))?;

        Ok(())
    }

    /// Looks up a feed by its stable external `feed_id`. `None` conveys "not found".
    pub async fn get_feed_by_id(&self, feed_id: &str) -> Result<Option<Feed>> {
        sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_feed_by_id: {e}"))))
    }

    /// Looks up a feed by its provenance config file path.
    pub async fn get_feed_by_config_file(&self, config_file: &str) -> Result<Option<Feed>> {
        sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE config_file = $1")
            .bind(config_file)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_feed_by_config_file: {e}"))))
    }

    /// Looks up a feed by its upstream URL.
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        sqlx::query_as::<_, Feed>("SELECT * FROM feeds WHERE feed_url = $1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_feed_by_url: {e}"))))
    }

    /// Returns at most 50 enabled feeds due for refresh (`next_fetch_at IS
    /// NULL OR next_fetch_at <= now()`), ordered by due time ascending with
    /// nulls first.
    pub async fn get_feeds_due_for_refresh(&self) -> Result<Vec<Feed>> {
        sqlx::query_as::<_, Feed>(
            r#"
            SELECT * FROM feeds
            WHERE is_enabled = true
              AND (next_fetch_at IS NULL OR next_fetch_at <= now())
            ORDER BY next_fetch_at ASC NULLS FIRST
            LIMIT 50
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_feeds_due_for_refresh: {e}"))))
    }

    /// Total number of feed rows.
    pub async fn get_feed_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_feed_count: {e}"))))?;
        Ok(count)
    }

    /// Number of feed rows with `is_enabled = true`.
    pub async fn get_enabled_feed_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds WHERE is_enabled = true")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_enabled_feed_count: {e}"))))?;
        Ok(count)
    }
}
