//! Query fingerprints used as result cache keys.

use sha2::{Digest, Sha256};

use ragline_core::defaults::CACHE_KEY_HASH_LEN;

/// Normalize query text for fingerprinting: trim, lowercase, and collapse
/// runs of whitespace to a single space.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic cache key for a (query, top_k) pair.
///
/// `top_k` is hashed after a NUL separator, so distinct `top_k` values for
/// the same query never collide.
pub fn fingerprint(prefix: &str, query: &str, top_k: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hasher.update([0u8]);
    hasher.update(top_k.to_string().as_bytes());

    let hash = hex::encode(hasher.finalize());
    format!("{}{}", prefix, &hash[..CACHE_KEY_HASH_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "ragline:search:";

    #[test]
    fn test_same_inputs_same_key() {
        assert_eq!(
            fingerprint(PREFIX, "hybrid retrieval", 5),
            fingerprint(PREFIX, "hybrid retrieval", 5)
        );
    }

    #[test]
    fn test_top_k_changes_key() {
        let keys: Vec<String> = (1..=20).map(|k| fingerprint(PREFIX, "x", k)).collect();
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_query_and_top_k_digits_do_not_alias() {
        // "x1" with top_k 1 must not equal "x" with top_k 11.
        assert_ne!(fingerprint(PREFIX, "x1", 1), fingerprint(PREFIX, "x", 11));
    }

    #[test]
    fn test_normalization_case_and_whitespace() {
        assert_eq!(
            fingerprint(PREFIX, "  Hybrid   Retrieval ", 5),
            fingerprint(PREFIX, "hybrid retrieval", 5)
        );
    }

    #[test]
    fn test_different_queries_differ() {
        assert_ne!(
            fingerprint(PREFIX, "vector search", 5),
            fingerprint(PREFIX, "keyword search", 5)
        );
    }

    #[test]
    fn test_key_shape() {
        let key = fingerprint(PREFIX, "test", 3);
        assert!(key.starts_with(PREFIX));
        let hash = &key[PREFIX.len()..];
        assert_eq!(hash.len(), CACHE_KEY_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  A\tB\nc  "), "a b c");
        assert_eq!(normalize_query(""), "");
    }
}
