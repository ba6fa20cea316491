//! `ProcessFeed` (priority High, §4.5 step 2–8): fetch → parse → dedupe →
//! filter → persist, with a change-detection short-circuit.

use chrono::Utc;

use super::TaskContext;
use crate::db::NewItem;
use crate::error::{Error, Result};
use crate::filter::filter_item;
use crate::parser;

const ACCEPT_HEADER: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";

pub async fn run(ctx: &TaskContext, feed_id: &str) -> Result<()> {
    let start = std::time::Instant::now();

    let config = ctx
        .config_store
        .get_by_feed_id(feed_id)
        .await
        .ok_or_else(|| Error::NotFound(format!("no config loaded for feed '{feed_id}'")))?;

    if !config.settings.enabled {
        return Ok(());
    }

    let feed = ctx
        .repo
        .get_feed_by_id(feed_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("feed '{feed_id}' has no repository row; SyncFeedConfig must run first")))?;

    let response = ctx
        .http_client
        .get(&config.feed.url)
        .header("User-Agent", &ctx.user_agent)
        .header("Accept", ACCEPT_HEADER)
        .timeout(config.settings.timeout())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::Upstream(format!(
            "GET {} returned {}",
            config.feed.url,
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.is_empty() && !is_xml_content_type(&content_type) {
        tracing::warn!(feed_id, content_type, "unexpected content type for feed response, continuing");
    }

    let body = response.bytes().await?;
    if body.is_empty() {
        return Err(Error::Upstream(format!("feed '{feed_id}' returned an empty body")));
    }

    let (metadata, items) = parser::parse(&body)?;

    if let (Some(stored), Some(parsed)) = (feed.feed_published_at, metadata.published_at)
        && stored == parsed {
            ctx.repo
                .update_next_fetch(feed.id, Some(Utc::now() + config.settings.refresh_interval()))
                .await?;
            tracing::info!(feed_id, "feed unchanged since last fetch, skipping item processing");
            return Ok(());
        }

    ctx.repo
        .update_feed_metadata(
            feed.id,
            metadata.link.as_deref(),
            metadata.image_url.as_deref(),
            metadata.language.as_deref(),
            metadata.published_at,
        )
        .await?;

    let mut new_count = 0u32;
    let mut duplicate_count = 0u32;
    let mut filtered_count = 0u32;

    for item in items.iter().take(config.settings.max_items as usize) {
        let (exists, _) = ctx.repo.check_duplicate(&item.content_hash, feed.id).await?;
        if exists {
            duplicate_count += 1;
            continue;
        }

        let outcome = filter_item(item, &config);
        if outcome.is_filtered {
            filtered_count += 1;
        }

        let new_item = NewItem {
            guid: if item.guid.is_empty() {
                item.link.clone().unwrap_or_else(|| item.content_hash.clone())
            } else {
                item.guid.clone()
            },
            link: item.link.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            content: item.content.clone(),
            published_at: item.published_at.unwrap_or_else(Utc::now),
            updated_at: item.updated_at,
            authors: item.authors.clone(),
            categories: item.categories.clone(),
            content_hash: item.content_hash.clone(),
            is_filtered: outcome.is_filtered,
            filter_reason: outcome.reason,
            enclosure_url: item.enclosure_url.clone(),
            enclosure_length: item.enclosure_length,
            enclosure_type: item.enclosure_type.clone(),
        };

        ctx.repo.store_item(feed.id, &new_item).await?;
        new_count += 1;
    }

    ctx.repo
        .update_next_fetch(feed.id, Some(Utc::now() + config.settings.refresh_interval()))
        .await?;

    tracing::info!(
        feed_id,
        total = items.len(),
        new = new_count,
        duplicates = duplicate_count,
        filtered = filtered_count,
        duration_ms = start.elapsed().as_millis() as u64,
        "processed feed"
    );

    Ok(())
}

fn is_xml_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("xml") || ct.contains("rss") || ct.contains("atom")
}
