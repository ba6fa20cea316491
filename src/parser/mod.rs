//! Raw feed bytes → `(FeedMetadata, Vec<ParsedItem>)` (§4.3).
//!
//! Grounded on the teacher's `rss_manager::parse_as_rss`/`parse_as_atom`
//! dispatch (sniff-then-parse against two crates rather than one generic
//! feed-format union type), generalized from NZB-release metadata to the
//! canonical item model this proxy persists.

mod hash;
mod normalize;

pub use hash::content_hash;
pub use normalize::normalize_link;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Feed-level metadata extracted from the parsed document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedMetadata {
    /// Feed title.
    pub title: Option<String>,
    /// Feed homepage link.
    pub link: Option<String>,
    /// Feed description.
    pub description: Option<String>,
    /// Feed image/icon URL.
    pub image_url: Option<String>,
    /// Feed language code.
    pub language: Option<String>,
    /// Upstream's own `pubDate`/`updated`, used for change detection.
    pub published_at: Option<DateTime<Utc>>,
}

/// One canonical item extracted from either feed format, pre-persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedItem {
    /// GUID from source, falling back to the normalized link.
    pub guid: String,
    /// Item link.
    pub link: Option<String>,
    /// Item title.
    pub title: String,
    /// Item description/summary.
    pub description: Option<String>,
    /// Item body content (`content:encoded` or Atom `content`).
    pub content: Option<String>,
    /// Published timestamp.
    pub published_at: Option<DateTime<Utc>>,
    /// Last-updated timestamp, if present.
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered author strings, `"email (name)"` or whichever half is present.
    pub authors: Vec<String>,
    /// Ordered category list.
    pub categories: Vec<String>,
    /// First enclosure's URL, if any.
    pub enclosure_url: Option<String>,
    /// First enclosure's byte length, if any.
    pub enclosure_length: Option<i64>,
    /// First enclosure's MIME type, if any.
    pub enclosure_type: Option<String>,
    /// `SHA-256(title + "|" + normalized_link)`, lowercase hex.
    pub content_hash: String,
}

/// Parses raw feed bytes, dispatching to RSS or Atom by content sniffing.
/// Fatal parse errors are surfaced as [`Error::Parse`].
pub fn parse(bytes: &[u8]) -> Result<(FeedMetadata, Vec<ParsedItem>)> {
    if bytes.is_empty() {
        return Err(Error::Parse("empty feed body".into()));
    }

    if looks_like_atom(bytes) {
        parse_atom(bytes).or_else(|_| parse_rss(bytes))
    } else {
        parse_rss(bytes).or_else(|_| parse_atom(bytes))
    }
}

fn looks_like_atom(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    head.contains("<feed") && head.contains("www.w3.org/2005/Atom")
}

fn parse_rss(bytes: &[u8]) -> Result<(FeedMetadata, Vec<ParsedItem>)> {
    let channel = rss::Channel::read_from(bytes).map_err(|e| Error::Parse(format!("rss: {e}")))?;

    let metadata = FeedMetadata {
        title: non_empty(channel.title()),
        link: non_empty(channel.link()),
        description: non_empty(channel.description()),
        image_url: channel.image().map(|i| i.url().to_string()),
        language: channel.language().map(str::to_string),
        published_at: channel.pub_date().and_then(parse_rfc2822_or_3339),
    };

    let items = channel
        .items()
        .iter()
        .map(|item| {
            let link = item.link().map(normalize_link);
            let title = html_escape::decode_html_entities(item.title().unwrap_or_default()).into_owned();
            let description = item
                .description()
                .map(|d| html_escape::decode_html_entities(d).into_owned());

            let guid = item
                .guid()
                .map(|g| g.value().to_string())
                .filter(|g| !g.is_empty())
                .or_else(|| link.clone())
                .unwrap_or_default();

            let authors = rss_authors(item);
            let categories = item.categories().iter().map(|c| c.name().to_string()).collect();

            let (enclosure_url, enclosure_length, enclosure_type) = item
                .enclosure()
                .map(|e| {
                    (
                        Some(e.url().to_string()),
                        e.length().parse::<i64>().ok(),
                        Some(e.mime_type().to_string()),
                    )
                })
                .unwrap_or((None, None, None));

            let normalized_link = link.clone().unwrap_or_default();
            let hash = content_hash(&title, &normalized_link);

            ParsedItem {
                guid,
                link,
                title,
                description,
                content: item.content().map(str::to_string),
                published_at: item.pub_date().and_then(parse_rfc2822_or_3339),
                updated_at: None,
                authors,
                categories,
                enclosure_url,
                enclosure_length,
                enclosure_type,
                content_hash: hash,
            }
        })
        .collect();

    Ok((metadata, items))
}

fn rss_authors(item: &rss::Item) -> Vec<String> {
    if let Some(creator) = item
        .dublin_core_ext()
        .and_then(|dc| dc.creators().first())
        .filter(|s| !s.is_empty())
    {
        return vec![creator.clone()];
    }
    item.author()
        .filter(|a| !a.is_empty())
        .map(|a| vec![a.to_string()])
        .unwrap_or_default()
}

fn parse_atom(bytes: &[u8]) -> Result<(FeedMetadata, Vec<ParsedItem>)> {
    let feed = atom_syndication::Feed::read_from(bytes).map_err(|e| Error::Parse(format!("atom: {e}")))?;

    let metadata = FeedMetadata {
        title: non_empty(feed.title().as_str()),
        link: feed.links().iter().find(|l| is_alternate(l)).map(|l| l.href().to_string()),
        description: feed.subtitle().map(|s| s.as_str().to_string()),
        image_url: feed.logo().map(str::to_string),
        language: None,
        published_at: Some(*feed.updated()).map(|dt| dt.with_timezone(&Utc)),
    };

    let items = feed
        .entries()
        .iter()
        .map(|entry| {
            let link = entry
                .links()
                .iter()
                .find(|l| is_alternate(l))
                .or_else(|| entry.links().first())
                .map(|l| normalize_link(l.href()));

            let title = html_escape::decode_html_entities(entry.title().as_str()).into_owned();
            let description = entry
                .summary()
                .map(|s| html_escape::decode_html_entities(s.as_str()).into_owned());
            let content = entry.content().and_then(|c| c.value().map(str::to_string));

            let guid = {
                let id = entry.id();
                if !id.is_empty() {
                    id.to_string()
                } else {
                    link.clone().unwrap_or_default()
                }
            };

            let authors: Vec<String> = entry
                .authors()
                .iter()
                .filter_map(author_string)
                .collect();

            let categories = entry.categories().iter().map(|c| c.term().to_string()).collect();

            let normalized_link = link.clone().unwrap_or_default();
            let hash = content_hash(&title, &normalized_link);

            ParsedItem {
                guid,
                link,
                title,
                description,
                content,
                published_at: entry.published().map(|dt| dt.with_timezone(&Utc)),
                updated_at: Some(entry.updated().with_timezone(&Utc)),
                authors,
                categories,
                enclosure_url: None,
                enclosure_length: None,
                enclosure_type: None,
                content_hash: hash,
            }
        })
        .collect();

    Ok((metadata, items))
}

fn is_alternate(link: &atom_syndication::Link) -> bool {
    link.rel() == "alternate" || link.rel().is_empty()
}

/// `"email (name)"` if both present, else the non-empty one; `None` if neither.
fn author_string(person: &atom_syndication::Person) -> Option<String> {
    let name = person.name.trim();
    let email = person.email.as_deref().unwrap_or("").trim();

    match (name.is_empty(), email.is_empty()) {
        (false, false) => Some(format!("{email} ({name})")),
        (false, true) => Some(name.to_string()),
        (true, false) => Some(email.to_string()),
        (true, true) => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_rfc2822_or_3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <link>https://example.com</link>
    <description>An example</description>
    <item>
      <title>Hello &amp; World</title>
      <link>https://example.com/article?utm_source=twitter&amp;utm_medium=social&amp;fbclid=IwAR123</link>
      <guid>https://example.com/article?utm_source=twitter</guid>
      <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
      <category>Technology</category>
      <category>Programming</category>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_rss_and_strips_tracking_params() {
        let (meta, items) = parse(RSS_SAMPLE.as_bytes()).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Example Feed"));
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.link.as_deref(), Some("https://example.com/article"));
        assert_eq!(item.title, "Hello & World");
        assert_eq!(item.categories, vec!["Technology", "Programming"]);
    }

    #[test]
    fn rejects_empty_body() {
        assert!(parse(b"").is_err());
    }

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <id>urn:uuid:1</id>
  <updated>2024-01-01T12:00:00Z</updated>
  <entry>
    <title>An Entry</title>
    <id>urn:uuid:entry-1</id>
    <link href="https://example.com/entry"/>
    <updated>2024-01-01T12:00:00Z</updated>
    <summary>Summary text</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_atom() {
        let (meta, items) = parse(ATOM_SAMPLE.as_bytes()).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Atom Feed"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "An Entry");
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/entry"));
    }
}
