//! Regenerates a feed as RSS 2.0 XML from its stored rows (§6).

use chrono::Utc;
use rss::{CategoryBuilder, ChannelBuilder, EnclosureBuilder, GuidBuilder, ImageBuilder, ItemBuilder};

use crate::types::{Feed, Item};

const GENERATOR: &str = concat!("RSS-Comb/", env!("CARGO_PKG_VERSION"));

/// Builds the channel self-link URL for a feed, given a base URL
/// (`{base_url}/feeds/{feed_id}`, falling back to `http://localhost:{port}`).
pub fn self_url(base_url: Option<&str>, port: u16, feed_id: &str) -> String {
    let base = base_url
        .map(str::to_string)
        .unwrap_or_else(|| format!("http://localhost:{port}"));
    format!("{}/feeds/{}", base.trim_end_matches('/'), feed_id)
}

/// Renders a feed + its visible items as an RSS 2.0 document.
///
/// The `rss` crate's builder has no first-class support for an
/// `atom:link rel="self"` element, so it is spliced into the generated
/// `<channel>` as a raw tag after the fact rather than fought through the
/// extension-map API.
pub fn generate(feed: &Feed, items: &[Item], self_link: &str) -> String {
    let title = feed.title.clone().unwrap_or_else(|| feed.feed_id.clone());
    let description = feed
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Processed feed from {}", feed.feed_url));

    let mut channel = ChannelBuilder::default();
    channel
        .title(title)
        .link(feed.link.clone().unwrap_or_else(|| feed.feed_url.clone()))
        .description(description)
        .generator(Some(GENERATOR.to_string()))
        .last_build_date(Some(Utc::now().to_rfc2822()));

    if let Some(language) = &feed.language {
        channel.language(Some(language.clone()));
    }

    if let Some(image_url) = &feed.image_url {
        let image = ImageBuilder::default()
            .url(image_url.clone())
            .title(feed.title.clone().unwrap_or_default())
            .link(feed.link.clone().unwrap_or_else(|| feed.feed_url.clone()))
            .build();
        channel.image(Some(image));
    }

    channel.items(items.iter().map(render_item).collect::<Vec<_>>());

    let built = channel.build();
    let mut xml = built.to_string();
    inject_namespaces_and_self_link(&mut xml, self_link);

    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{xml}")
}

fn inject_namespaces_and_self_link(xml: &mut String, self_link: &str) {
    *xml = xml.replacen(
        "<rss version=\"2.0\">",
        "<rss version=\"2.0\" xmlns:content=\"http://purl.org/rss/1.0/modules/content/\" xmlns:atom=\"http://www.w3.org/2005/Atom\">",
        1,
    );

    let self_tag = format!(
        "<atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>",
        xml_escape(self_link)
    );
    *xml = xml.replacen("<channel>", &format!("<channel>{self_tag}"), 1);
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_item(item: &Item) -> rss::Item {
    let description = item
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "No description available".to_string());

    let is_permalink = item.guid.starts_with("http://") || item.guid.starts_with("https://");
    let guid = GuidBuilder::default()
        .value(item.guid.clone())
        .permalink(is_permalink)
        .build();

    let mut builder = ItemBuilder::default();
    builder
        .title(Some(item.title.clone()))
        .link(item.link.clone())
        .description(Some(description.clone()))
        .guid(Some(guid))
        .pub_date(Some(item.published_at.to_rfc2822()))
        .categories(
            item.categories
                .iter()
                .map(|c| CategoryBuilder::default().name(c.clone()).build())
                .collect::<Vec<_>>(),
        );

    if let Some(author) = item.authors.first() {
        builder.author(Some(author.clone()));
    }

    if let Some(content) = &item.content
        && content != &description {
            builder.content(Some(content.clone()));
        }

    if let (Some(url), Some(mime_type)) = (&item.enclosure_url, &item.enclosure_type) {
        let enclosure = EnclosureBuilder::default()
            .url(url.clone())
            .length(item.enclosure_length.unwrap_or(0).to_string())
            .mime_type(mime_type.clone())
            .build();
        builder.enclosure(Some(enclosure));
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_feed() -> Feed {
        Feed {
            id: crate::types::FeedDbId(1),
            feed_id: "example".into(),
            config_file: "feeds/example.yml".into(),
            feed_url: "https://example.com/feed.xml".into(),
            title: Some("Example Feed".into()),
            link: Some("https://example.com".into()),
            description: None,
            image_url: None,
            language: Some("en-us".into()),
            feed_published_at: None,
            last_fetched_at: None,
            next_fetch_at: None,
            is_enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_item() -> Item {
        Item {
            id: crate::types::ItemDbId(1),
            feed_id: crate::types::FeedDbId(1),
            guid: "https://example.com/a".into(),
            link: Some("https://example.com/a".into()),
            title: "Hello".into(),
            description: None,
            content: None,
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            updated_at: None,
            authors: vec!["author@example.com (Author)".into()],
            categories: vec!["Tech".into()],
            content_hash: "h".into(),
            is_filtered: false,
            filter_reason: None,
            enclosure_url: None,
            enclosure_length: None,
            enclosure_type: None,
            content_extraction_status: crate::types::ContentExtractionStatus::Skipped,
            content_extracted_at: None,
            content_extraction_error: None,
            extraction_attempts: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn generates_self_link_and_fallback_description() {
        let feed = sample_feed();
        let xml = generate(&feed, &[sample_item()], "http://localhost:8080/feeds/example");
        assert!(xml.contains("atom:link"));
        assert!(xml.contains("rel=\"self\""));
        assert!(xml.contains("No description available"));
        assert!(xml.contains("RSS-Comb"));
    }

    #[test]
    fn falls_back_to_processed_feed_description() {
        let mut feed = sample_feed();
        feed.description = None;
        let xml = generate(&feed, &[], "http://localhost:8080/feeds/example");
        assert!(xml.contains("Processed feed from https://example.com/feed.xml"));
    }
}
