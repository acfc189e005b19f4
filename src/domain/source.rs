use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A configured feed endpoint. Persisted as a flat list and mutated only
/// through explicit user edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    pub logo_url: String,
    pub color_hex: String,
    pub is_enabled: bool,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: Self::derive_id(&url),
            name: name.into(),
            url,
            logo_url: String::new(),
            color_hex: String::new(),
            is_enabled: true,
        }
    }

    /// Derive a stable identifier from the fetch URL.
    pub fn derive_id(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..12].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_stable() {
        let a = Source::new("Example", "https://example.com/feed.xml");
        let b = Source::new("Renamed", "https://example.com/feed.xml");
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_id_differs_per_url() {
        let a = Source::new("A", "https://example.com/a.xml");
        let b = Source::new("B", "https://example.com/b.xml");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_source_is_enabled() {
        let source = Source::new("Example", "https://example.com/feed.xml");
        assert!(source.is_enabled);
    }
}
