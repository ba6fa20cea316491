//! Link normalization: strips tracking query parameters (§4.3).

use url::Url;

/// Query parameter names (or prefixes) stripped from links before hashing/storage.
const TRACKING_PREFIXES: &[&str] = &["utm_"];
const TRACKING_EXACT: &[&str] = &["fbclid", "gclid", "ref"];

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    TRACKING_EXACT.contains(&lower.as_str())
        || TRACKING_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Strips tracking query parameters from `link`, preserving all others and
/// their original order. Invalid or empty URLs pass through unchanged.
pub fn normalize_link(link: &str) -> String {
    if link.trim().is_empty() {
        return link.to_string();
    }

    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }

    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_utm_and_fbclid() {
        let link = "https://example.com/article?utm_source=twitter&utm_medium=social&fbclid=IwAR123";
        assert_eq!(normalize_link(link), "https://example.com/article");
    }

    #[test]
    fn preserves_non_tracking_params() {
        let link = "https://example.com/article?id=42&utm_source=twitter";
        assert_eq!(normalize_link(link), "https://example.com/article?id=42");
    }

    #[test]
    fn passes_through_invalid_urls() {
        let link = "not a url";
        assert_eq!(normalize_link(link), "not a url");
    }

    #[test]
    fn passes_through_empty() {
        assert_eq!(normalize_link(""), "");
    }

    #[test]
    fn strips_gclid_and_ref() {
        let link = "https://example.com/x?gclid=abc&ref=homepage&keep=1";
        assert_eq!(normalize_link(link), "https://example.com/x?keep=1");
    }
}
