//! Item CRUD, dedup, filter-status, and extraction queries (§4.2).

use chrono::{DateTime, Utc};

use super::Repository;
use crate::error::{DatabaseError, Error, Result};
use crate::types::{ContentExtractionStatus, FeedDbId, Item, ItemDbId, ItemStats};

/// Fields needed to upsert one parsed item (§3 Item, §4.5 ProcessFeed step 6).
#[derive(Clone, Debug)]
pub struct NewItem {
    /// GUID from source, falling back to normalized link.
    pub guid: String,
    /// Normalized link.
    pub link: Option<String>,
    /// Item title.
    pub title: String,
    /// Item description.
    pub description: Option<String>,
    /// Item content (`content:encoded`).
    pub content: Option<String>,
    /// Required publish timestamp (current time used as last resort upstream).
    pub published_at: DateTime<Utc>,
    /// Optional "updated" timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered author strings.
    pub authors: Vec<String>,
    /// Ordered categories.
    pub categories: Vec<String>,
    /// `SHA-256(title|normalized_link)`, lowercase hex.
    pub content_hash: String,
    /// Filter outcome computed before persistence.
    pub is_filtered: bool,
    /// Non-empty when `is_filtered`.
    pub filter_reason: Option<String>,
    /// First enclosure's URL.
    pub enclosure_url: Option<String>,
    /// First enclosure's length.
    pub enclosure_length: Option<i64>,
    /// First enclosure's MIME type.
    pub enclosure_type: Option<String>,
}

impl Repository {
    /// Scoped to a single `feed_id`: reports whether an item with this
    /// content hash already exists in this feed, and if so, its id.
    pub async fn check_duplicate(
        &self,
        content_hash: &str,
        feed_id: FeedDbId,
    ) -> Result<(bool, Option<ItemDbId>)> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM feed_items WHERE feed_id = $1 AND content_hash = $2",
        )
        .bind(feed_id)
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("check_duplicate: {e}"))))?;

        Ok(match row {
            Some((id,)) => (true, Some(ItemDbId(id))),
            None => (false, None),
        })
    }

    /// Upserts on (`feed_id`, `guid`); on conflict, updates only the fields
    /// that legitimately mutate across re-ingestion.
    pub async fn store_item(&self, feed_id: FeedDbId, item: &NewItem) -> Result<ItemDbId> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feed_items (
                feed_id, guid, link, title, description, content,
                published_at, updated_at, authors, categories, content_hash,
                is_filtered, filter_reason, enclosure_url, enclosure_length, enclosure_type,
                content_extraction_status, extraction_attempts, created_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16,
                'pending', 0, now()
            )
            ON CONFLICT (feed_id, guid) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content = EXCLUDED.content,
                updated_at = EXCLUDED.updated_at,
                is_filtered = EXCLUDED.is_filtered,
                filter_reason = EXCLUDED.filter_reason,
                content_hash = EXCLUDED.content_hash
            RETURNING id
            "#,
        )
        .bind(feed_id)
        .bind(&item.guid)
        .bind(&item.link)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.content)
        .bind(item.published_at)
        .bind(item.updated_at)
        .bind(&item.authors)
        .bind(&item.categories)
        .bind(&item.content_hash)
        .bind(item.is_filtered)
        .bind(&item.filter_reason)
        .bind(&item.enclosure_url)
        .bind(item.enclosure_length)
        .bind(&item.enclosure_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("store_item: {e}"))))?;

        Ok(ItemDbId(row.0))
    }

    /// Visible items (`is_filtered = false`), ordered by
    /// `COALESCE(published_at, created_at) DESC`, limited.
    pub async fn get_visible_items(&self, feed_id: FeedDbId, limit: i64) -> Result<Vec<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM feed_items
            WHERE feed_id = $1 AND is_filtered = false
            ORDER BY COALESCE(published_at, created_at) DESC
            LIMIT $2
            "#,
        )
        .bind(feed_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_visible_items: {e}"))))
    }

    /// All items for a feed (no filter gating), same ordering. Used by `RefilterFeed`.
    pub async fn get_all_items(&self, feed_id: FeedDbId) -> Result<Vec<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM feed_items
            WHERE feed_id = $1
            ORDER BY COALESCE(published_at, created_at) DESC
            "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_all_items: {e}"))))
    }

    /// Total item count across all feeds.
    pub async fn get_item_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feed_items")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_item_count: {e}"))))?;
        Ok(count)
    }

    /// `(total, visible, filtered)` counts for one feed.
    pub async fn get_item_stats(&self, feed_id: FeedDbId) -> Result<ItemStats> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE is_filtered = false),
                COUNT(*) FILTER (WHERE is_filtered = true)
            FROM feed_items
            WHERE feed_id = $1
            "#,
        )
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_item_stats: {e}"))))?;

        Ok(ItemStats {
            total: row.0,
            visible: row.1,
            filtered: row.2,
        })
    }

    /// Rewrites one item's filter outcome (used by `RefilterFeed` for rows whose outcome changed).
    pub async fn update_item_filter_status(
        &self,
        item_id: ItemDbId,
        is_filtered: bool,
        reason: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE feed_items SET is_filtered = $1, filter_reason = $2 WHERE id = $3")
            .bind(is_filtered)
            .bind(reason)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("update_item_filter_status: {e}"))))?;

        Ok(())
    }

    /// Items still needing extraction (`pending`, oldest first), capped at `limit`.
    pub async fn get_items_for_extraction(&self, feed_id: FeedDbId, limit: i64) -> Result<Vec<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM feed_items
            WHERE feed_id = $1 AND content_extraction_status = 'pending'
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(feed_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("get_items_for_extraction: {e}"))))
    }

    /// Advances the extraction state machine and increments `extraction_attempts`.
    pub async fn update_extraction_status(
        &self,
        item_id: ItemDbId,
        status: ContentExtractionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feed_items
            SET content_extraction_status = $1,
                content_extraction_error = $2,
                content_extracted_at = now(),
                extraction_attempts = extraction_attempts + 1
            WHERE id = $3
            "#,
        )
        .bind(status)
        .bind(error)
        .bind(item_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(DatabaseError::QueryFailed(format!("update_extraction_status: {e}"))))?;

        Ok(())
    }

    /// Stores successfully extracted content and marks the item `success`.
    pub async fn update_extracted_content_and_status(
        &self,
        item_id: ItemDbId,
        content: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feed_items
            SET content = $1,
                content_extraction_status = 'success',
                content_extraction_error = NULL,
                content_extracted_at = now(),
                extraction_attempts = extraction_attempts + 1
            WHERE id = $2
            "#,
        )
        .bind(content)
        .bind(item_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "update_extracted_content_and_status: {e}"
            )))
        })?;

        Ok(())
    }
}
