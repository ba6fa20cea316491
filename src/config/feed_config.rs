//! Per-feed YAML configuration: parsing, defaults, and validation (§3, §4.1).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Error;

fn default_refresh_interval_s() -> u64 {
    3600
}

fn default_max_items() -> u32 {
    100
}

fn default_timeout_s() -> u64 {
    30
}

fn default_extraction_timeout_s() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// `feed:` block of a per-feed YAML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedIdentity {
    /// Stable external identifier, unique across all loaded configs.
    pub id: String,
    /// Upstream feed URL.
    pub url: String,
    /// Display title (overridable by parsed feed metadata downstream).
    pub title: String,
}

/// `settings:` block of a per-feed YAML file, with spec-mandated defaults
/// applied whenever a field is zero/absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Scheduling gate; mirrors the persisted `Feed.is_enabled` column.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between scheduled fetches. Default 3600.
    #[serde(default = "default_refresh_interval_s", rename = "refresh_interval")]
    pub refresh_interval_s: u64,
    /// Cap on items considered per fetch/extraction batch. Default 100.
    #[serde(default = "default_max_items")]
    pub max_items: u32,
    /// Per-fetch HTTP timeout, in seconds. Default 30.
    #[serde(default = "default_timeout_s", rename = "timeout")]
    pub timeout_s: u64,
    /// Whether `ExtractContent` tasks should run for this feed.
    #[serde(default)]
    pub extract_content: bool,
    /// Per-article extraction HTTP timeout, in seconds. Default 10.
    #[serde(default = "default_extraction_timeout_s", rename = "extraction_timeout")]
    pub extraction_timeout_s: u64,
}

impl FeedSettings {
    /// Fetch timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }

    /// Extraction timeout as a [`Duration`].
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_s)
    }

    /// Refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_s)
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_s: default_refresh_interval_s(),
            max_items: default_max_items(),
            timeout_s: default_timeout_s(),
            extract_content: false,
            extraction_timeout_s: default_extraction_timeout_s(),
        }
    }
}

/// Fields a [`FilterRule`] may be applied to (§3 FeedConfig, §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    /// Item title.
    Title,
    /// Item description.
    Description,
    /// Item content.
    Content,
    /// Item authors (element-wise match).
    Authors,
    /// Item link.
    Link,
    /// Item categories (element-wise match).
    Categories,
}

impl FilterField {
    /// Lowercase name, as it appears in filter-rejection reason strings.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::Title => "title",
            FilterField::Description => "description",
            FilterField::Content => "content",
            FilterField::Authors => "authors",
            FilterField::Link => "link",
            FilterField::Categories => "categories",
        }
    }
}

/// One `filters:` entry. Must have at least one include or exclude pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Field this rule inspects.
    pub field: FilterField,
    /// Patterns: an item must match at least one to pass (if any are given).
    #[serde(default)]
    pub includes: Vec<String>,
    /// Patterns: a match on any of these filters the item out, overriding includes.
    #[serde(default)]
    pub excludes: Vec<String>,
}

/// A fully parsed and validated per-feed configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// `feed:` block.
    pub feed: FeedIdentity,
    /// `settings:` block.
    #[serde(default)]
    pub settings: FeedSettings,
    /// `filters:` list, applied in order.
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl FeedConfig {
    /// Parses a single YAML document into a `FeedConfig` and validates it.
    ///
    /// `path` is used only to attribute validation errors to a file, per
    /// spec.md §4.1 ("failures produce a descriptive error pinning file and
    /// offending field/index").
    pub fn parse(path: &str, yaml: &str) -> Result<Self, Error> {
        let config: FeedConfig = serde_yaml::from_str(yaml).map_err(|e| Error::Config {
            file: path.to_string(),
            message: format!("failed to parse YAML: {e}"),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &str) -> Result<(), Error> {
        let err = |message: String| {
            Err(Error::Config {
                file: path.to_string(),
                message,
            })
        };

        if self.feed.id.trim().is_empty() {
            return err("feed.id must not be empty".into());
        }
        if self.feed.url.trim().is_empty() {
            return err("feed.url must not be empty".into());
        }
        if self.feed.title.trim().is_empty() {
            return err("feed.title must not be empty".into());
        }

        // refresh_interval_s, max_items, timeout_s, extraction_timeout_s are
        // all unsigned already, so "non-negative" is a type-level guarantee;
        // nothing further to check there.

        for (idx, filter) in self.filters.iter().enumerate() {
            if filter.includes.is_empty() && filter.excludes.is_empty() {
                return err(format!(
                    "filters[{idx}] must specify at least one include or exclude pattern"
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
feed:
  id: example
  url: https://example.com/feed.xml
  title: Example Feed
settings:
  enabled: true
  refresh_interval: 1800
filters:
  - field: title
    includes: ["rust"]
"#
    }

    #[test]
    fn rejects_empty_feed_id() {
        let yaml = r#"
feed:
  id: ""
  url: https://example.com/feed.xml
  title: Example
"#;
        let err = FeedConfig::parse("feeds/a.yml", yaml).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn rejects_filter_with_no_patterns() {
        let yaml = r#"
feed:
  id: example
  url: https://example.com/feed.xml
  title: Example
filters:
  - field: title
"#;
        let err = FeedConfig::parse("feeds/a.yml", yaml).unwrap_err();
        match err {
            Error::Config { message, .. } => assert!(message.contains("filters[0]")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn applies_defaults_when_settings_omitted() {
        let yaml = r#"
feed:
  id: example
  url: https://example.com/feed.xml
  title: Example
"#;
        let config = FeedConfig::parse("feeds/a.yml", yaml).unwrap();
        assert_eq!(config.settings.refresh_interval_s, 3600);
        assert_eq!(config.settings.max_items, 100);
        assert_eq!(config.settings.timeout_s, 30);
        assert_eq!(config.settings.extraction_timeout_s, 10);
        assert!(config.settings.enabled);
    }

    #[test]
    fn parses_valid_config() {
        let config = FeedConfig::parse("feeds/example.yml", sample_yaml()).unwrap();
        assert_eq!(config.feed.id, "example");
        assert_eq!(config.settings.refresh_interval_s, 1800);
        assert_eq!(config.filters.len(), 1);
    }
}
