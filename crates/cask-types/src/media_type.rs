use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied classification for a blob's content.
///
/// Set once at commit time and immutable thereafter. The store never
/// interprets the value; it is carried through to descriptors verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaType(String);

impl MediaType {
    /// Create a media type from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The generic fallback type for unclassified content.
    pub fn octet_stream() -> Self {
        Self::new("application/octet-stream")
    }

    /// The media type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        Self(value)
    }
}
