use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 digest used as a dedup cache key for URLs and content bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn of_url(url: &str) -> Self {
        Self::of_bytes(url.as_bytes())
    }

    pub fn of_content(content: &str) -> Self {
        Self::of_bytes(content.as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_fingerprint() {
        assert_eq!(Fingerprint::of_url("http://a"), Fingerprint::of_url("http://a"));
        assert_ne!(Fingerprint::of_url("http://a"), Fingerprint::of_url("http://b"));
    }

    #[test]
    fn renders_as_lowercase_hex() {
        let fp = Fingerprint::of_content("");
        assert_eq!(
            fp.to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
