//! Content hashing for intra-feed dedup (§4.3, §GLOSSARY).

use sha2::{Digest, Sha256};

/// `SHA-256(title + "|" + normalized_link)`, lowercase hex. Intentionally
/// coarse: a later edit to the body does not change this hash, so an item
/// whose body is corrected upstream is still recognized as the same item.
pub fn content_hash(title: &str, normalized_link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(normalized_link.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_hash() {
        let a = content_hash("Hello", "https://example.com/a");
        let b = content_hash("Hello", "https://example.com/a");
        assert_eq!(a, b);
    }

    #[test]
    fn different_link_different_hash() {
        let a = content_hash("Hello", "https://example.com/a");
        let b = content_hash("Hello", "https://example.com/b");
        assert_ne!(a, b);
    }

    #[test]
    fn is_lowercase_hex() {
        let h = content_hash("t", "l");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
