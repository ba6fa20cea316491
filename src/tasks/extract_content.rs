//! `ExtractContent` (priority Normal, §4.5): fetches article bodies for
//! items pending extraction and runs them through the readability extractor.

use super::TaskContext;
use crate::error::{Error, Result};
use crate::extractor;
use crate::types::ContentExtractionStatus;

pub async fn run(ctx: &TaskContext, feed_id: &str) -> Result<()> {
    let config = ctx
        .config_store
        .get_by_feed_id(feed_id)
        .await
        .ok_or_else(|| Error::NotFound(format!("no config loaded for feed '{feed_id}'")))?;

    if !config.settings.extract_content {
        return Ok(());
    }

    let feed = ctx
        .repo
        .get_feed_by_id(feed_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("feed '{feed_id}' not found")))?;

    let items = ctx
        .repo
        .get_items_for_extraction(feed.id, config.settings.max_items as i64)
        .await?;

    for item in items {
        if ctx.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let Some(link) = &item.link else {
            ctx.repo
                .update_extraction_status(item.id, ContentExtractionStatus::Skipped, None)
                .await?;
            continue;
        };

        let outcome = fetch_and_extract(ctx, link, &config).await;
        match outcome {
            Ok(content) => {
                ctx.repo.update_extracted_content_and_status(item.id, &content).await?;
            }
            Err(e) => {
                tracing::warn!(feed_id, item_id = %item.id, error = %e, "content extraction failed");
                ctx.repo
                    .update_extraction_status(item.id, ContentExtractionStatus::Failed, Some(&e.to_string()))
                    .await?;
            }
        }
    }

    Ok(())
}

async fn fetch_and_extract(
    ctx: &TaskContext,
    link: &str,
    config: &crate::config::FeedConfig,
) -> Result<String> {
    let response = ctx
        .http_client
        .get(link)
        .header("User-Agent", &ctx.user_agent)
        .timeout(config.settings.extraction_timeout())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::Upstream(format!("GET {link} returned {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.to_ascii_lowercase().contains("html") {
        return Err(Error::Upstream(format!("'{link}' is not HTML (content-type: {content_type})")));
    }

    let body = response.bytes().await?;
    extractor::extract(&body, link)
}
