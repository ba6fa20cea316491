//! Article content extraction: HTML bytes → extracted article HTML (C5).
//!
//! A pure function per spec.md §1/§4.5 ("the upstream HTML-readability
//! content extractor... is out of scope, specified only at its interface").
//! Grounded on `readability`+`scraper`, sourced from the
//! `leolaporte-beatcheck` manifest in the example pack since the teacher has
//! no HTML-extraction need of its own.

use readability::extractor;
use scraper::Html;
use std::io::Cursor;
use url::Url;

use crate::error::{Error, Result};

/// Extracts readable article HTML from a page's raw bytes. `url` is used
/// only to resolve relative links within the document; no network access
/// happens here — fetching is the caller's responsibility.
pub fn extract(html: &[u8], url: &str) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| Error::Parse(format!("invalid article URL '{url}': {e}")))?;
    let mut cursor = Cursor::new(html);
    let product = extractor::extract(&mut cursor, &parsed_url)
        .map_err(|e| Error::Parse(format!("content extraction failed: {e}")))?;

    if extracted_text_is_empty(&product.content) {
        return Err(Error::Parse("content extraction produced empty output".into()));
    }

    Ok(product.content)
}

/// `readability` always wraps its output in an `<html><body>` shell, so a
/// plain tag-emptiness check on the HTML string never catches "nothing was
/// extracted" — check the document's actual text content instead.
fn extracted_text_is_empty(html: &str) -> bool {
    Html::parse_fragment(html).root_element().text().all(|t| t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_main_content() {
        let html = br#"<html><body>
            <nav>menu</nav>
            <article><h1>Title</h1><p>This is the article body with enough text to be recognized as the main content block by the readability heuristics that look at text density across sibling nodes.</p></article>
            <footer>copyright</footer>
        </body></html>"#;
        let result = extract(html, "https://example.com/article");
        assert!(result.is_ok());
        assert!(result.unwrap().contains("article body"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(extract(b"", "https://example.com").is_err());
    }
}
