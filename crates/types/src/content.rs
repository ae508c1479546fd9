//! Content identifiers handed to the registry by the content-addressed store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on the length of a content identifier.
pub const MAX_CONTENT_HASH_LEN: usize = 128;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContentHashError {
    #[error("content hash is empty")]
    Empty,
    #[error("content hash is {actual} characters, max {max}")]
    TooLong { max: usize, actual: usize },
    #[error("content hash contains whitespace or control characters")]
    InvalidCharacter,
}

/// Opaque identifier of file content, e.g. an IPFS CID or a hex digest.
///
/// The registry never inspects the bytes it names; it only compares
/// identifiers for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an identifier without validating it. See [`ContentHash::validate`].
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// BLAKE3 digest of `data`, hex encoded.
    pub fn from_data(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), ContentHashError> {
        if self.is_blank() {
            return Err(ContentHashError::Empty);
        }
        if self.0.len() > MAX_CONTENT_HASH_LEN {
            return Err(ContentHashError::TooLong {
                max: MAX_CONTENT_HASH_LEN,
                actual: self.0.len(),
            });
        }
        if self
            .0
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ContentHashError::InvalidCharacter);
        }
        Ok(())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = ContentHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hash = ContentHash::new(s.trim());
        hash.validate()?;
        Ok(hash)
    }
}

impl From<&str> for ContentHash {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContentHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}
