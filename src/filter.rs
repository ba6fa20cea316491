//! Pure include/exclude filtering over parsed items (§4.4).

use crate::config::{FeedConfig, FilterField, FilterRule};
use crate::parser::ParsedItem;

/// Outcome of running the filterer over one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Whether the item was excluded by any configured filter rule.
    pub is_filtered: bool,
    /// Human-readable reason, non-empty iff `is_filtered`.
    pub reason: Option<String>,
}

fn field_value<'a>(item: &'a ParsedItem, field: FilterField) -> FieldValue<'a> {
    match field {
        FilterField::Title => FieldValue::Single(&item.title),
        FilterField::Description => FieldValue::Single(item.description.as_deref().unwrap_or("")),
        FilterField::Content => FieldValue::Single(item.content.as_deref().unwrap_or("")),
        FilterField::Link => FieldValue::Single(item.link.as_deref().unwrap_or("")),
        FilterField::Authors => FieldValue::Many(&item.authors),
        FilterField::Categories => FieldValue::Many(&item.categories),
    }
}

enum FieldValue<'a> {
    Single(&'a str),
    Many(&'a [String]),
}

impl FieldValue<'_> {
    fn matches(&self, pattern: &str) -> bool {
        let pattern = pattern.to_ascii_lowercase();
        match self {
            FieldValue::Single(s) => s.to_ascii_lowercase().contains(&pattern),
            FieldValue::Many(items) => items.iter().any(|s| s.to_ascii_lowercase().contains(&pattern)),
        }
    }
}

/// Evaluates a single filter rule against a single item.
fn apply_rule(item: &ParsedItem, rule: &FilterRule) -> Option<String> {
    let value = field_value(item, rule.field);

    if let Some(pattern) = rule.excludes.iter().find(|p| value.matches(p)) {
        return Some(format!(
            "Excluded by {} filter: contains '{}'",
            rule.field.as_str(),
            pattern
        ));
    }

    if !rule.includes.is_empty() && !rule.includes.iter().any(|p| value.matches(p)) {
        return Some(format!(
            "Excluded by {} filter: does not contain any of [{}]",
            rule.field.as_str(),
            rule.includes.join(", ")
        ));
    }

    None
}

/// Runs every configured filter against one item. Filters are AND-composed:
/// the first filter to reject the item determines the reason.
pub fn filter_item(item: &ParsedItem, config: &FeedConfig) -> FilterOutcome {
    for rule in &config.filters {
        if let Some(reason) = apply_rule(item, rule) {
            return FilterOutcome {
                is_filtered: true,
                reason: Some(reason),
            };
        }
    }

    FilterOutcome {
        is_filtered: false,
        reason: None,
    }
}

/// Runs the filterer over a batch, in place order preserved.
pub fn filter_items(items: &[ParsedItem], config: &FeedConfig) -> Vec<FilterOutcome> {
    items.iter().map(|item| filter_item(item, config)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedIdentity, FeedSettings};

    fn item(title: &str, categories: Vec<&str>) -> ParsedItem {
        ParsedItem {
            guid: "g".into(),
            link: None,
            title: title.into(),
            description: None,
            content: None,
            published_at: None,
            updated_at: None,
            authors: vec![],
            categories: categories.into_iter().map(String::from).collect(),
            enclosure_url: None,
            enclosure_length: None,
            enclosure_type: None,
            content_hash: "h".into(),
        }
    }

    fn config_with(filters: Vec<FilterRule>) -> FeedConfig {
        FeedConfig {
            feed: FeedIdentity {
                id: "f".into(),
                url: "https://example.com/feed".into(),
                title: "F".into(),
            },
            settings: FeedSettings::default(),
            filters,
        }
    }

    #[test]
    fn category_include_matches_element_wise() {
        let it = item("x", vec!["Technology", "Programming", "c++", "1c"]);
        let cfg = config_with(vec![FilterRule {
            field: FilterField::Categories,
            includes: vec!["c++".into()],
            excludes: vec![],
        }]);
        let outcome = filter_item(&it, &cfg);
        assert!(!outcome.is_filtered);
    }

    #[test]
    fn include_pattern_must_match_whole_joined_attempt_fails() {
        let it = item("x", vec!["Tech News", "Breaking"]);
        let cfg = config_with(vec![FilterRule {
            field: FilterField::Categories,
            includes: vec!["News Breaking".into()],
            excludes: vec![],
        }]);
        let outcome = filter_item(&it, &cfg);
        assert!(outcome.is_filtered);
        assert!(outcome.reason.unwrap().contains("categories"));
    }

    #[test]
    fn exclude_dominates_include() {
        let mut it = item("Technology News: Latest Updates", vec![]);
        it.title = "Technology News: Latest Updates".into();
        let cfg = config_with(vec![FilterRule {
            field: FilterField::Title,
            includes: vec!["technology".into()],
            excludes: vec!["news".into()],
        }]);
        let outcome = filter_item(&it, &cfg);
        assert!(outcome.is_filtered);
        assert!(outcome.reason.unwrap().contains("contains 'news'"));
    }

    #[test]
    fn no_filters_means_unfiltered() {
        let it = item("anything", vec![]);
        let cfg = config_with(vec![]);
        assert!(!filter_item(&it, &cfg).is_filtered);
    }

    #[test]
    fn multiple_filters_are_and_composed() {
        let it = item("Rust Release Notes", vec!["Programming"]);
        let cfg = config_with(vec![
            FilterRule {
                field: FilterField::Title,
                includes: vec!["rust".into()],
                excludes: vec![],
            },
            FilterRule {
                field: FilterField::Categories,
                includes: vec!["gaming".into()],
                excludes: vec![],
            },
        ]);
        let outcome = filter_item(&it, &cfg);
        assert!(outcome.is_filtered);
    }
}
