//! `RefilterFeed` (priority High, §4.5): reruns the filterer against all
//! stored items and rewrites only the rows whose outcome changed.

use super::TaskContext;
use crate::error::{Error, Result};
use crate::filter::filter_item;
use crate::parser::ParsedItem;

pub async fn run(ctx: &TaskContext, feed_id: &str) -> Result<()> {
    let config = ctx
        .config_store
        .get_by_feed_id(feed_id)
        .await
        .ok_or_else(|| Error::NotFound(format!("no config loaded for feed '{feed_id}'")))?;

    let feed = ctx
        .repo
        .get_feed_by_id(feed_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("feed '{feed_id}' not found")))?;

    let items = ctx.repo.get_all_items(feed.id).await?;

    let mut updated = 0u32;
    let mut errors = 0u32;

    for row in items {
        let as_parsed = ParsedItem {
            guid: row.guid.clone(),
            link: row.link.clone(),
            title: row.title.clone(),
            description: row.description.clone(),
            content: row.content.clone(),
            published_at: Some(row.published_at),
            updated_at: row.updated_at,
            authors: row.authors.clone(),
            categories: row.categories.clone(),
            enclosure_url: row.enclosure_url.clone(),
            enclosure_length: row.enclosure_length,
            enclosure_type: row.enclosure_type.clone(),
            content_hash: row.content_hash.clone(),
        };

        let outcome = filter_item(&as_parsed, &config);
        if outcome.is_filtered == row.is_filtered && outcome.reason == row.filter_reason {
            continue;
        }

        match ctx
            .repo
            .update_item_filter_status(row.id, outcome.is_filtered, outcome.reason.as_deref())
            .await
        {
            Ok(()) => updated += 1,
            Err(e) => {
                errors += 1;
                tracing::warn!(feed_id, item_id = %row.id, error = %e, "failed to write back refilter outcome");
            }
        }
    }

    tracing::info!(feed_id, updated, errors, "refiltered feed");

    Ok(())
}
