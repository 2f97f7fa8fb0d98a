use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use crate::error::TypeError;

/// Hash algorithm behind a [`Digest`].
///
/// Both supported algorithms produce 32-byte hashes, so digests of different
/// kinds share a representation but never compare equal (the kind is part of
/// the identity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashKind {
    /// BLAKE3 (the default for new writers).
    Blake3,
    /// SHA-256.
    Sha256,
}

impl HashKind {
    /// Canonical lowercase name, used as the digest string prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blake3" => Ok(Self::Blake3),
            "sha256" => Ok(Self::Sha256),
            other => Err(TypeError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Content-addressed identifier for a stored blob.
///
/// A `Digest` is the hash of a blob's content, tagged with the algorithm that
/// produced it. Identical content hashed with the same algorithm always
/// produces the same `Digest`, making blobs deduplicatable and verifiable.
///
/// The canonical string form is `<algorithm>:<hex>`, e.g.
/// `blake3:af1349b9...`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest {
    kind: HashKind,
    bytes: [u8; 32],
}

impl Digest {
    /// Hash `data` with the given algorithm.
    pub fn compute(kind: HashKind, data: &[u8]) -> Self {
        let mut state = DigestState::new(kind);
        state.update(data);
        state.finalize()
    }

    /// Build a digest from a pre-computed hash.
    pub const fn from_parts(kind: HashKind, bytes: [u8; 32]) -> Self {
        Self { kind, bytes }
    }

    /// The algorithm that produced this digest.
    pub fn kind(&self) -> HashKind {
        self.kind
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex-encoded hash, without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Short hex form (first 8 characters), for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.bytes[..4])
    }

    /// Parse the canonical `<algorithm>:<hex>` form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (kind, hex_part) = s
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedDigest(s.to_string()))?;
        let kind = kind.parse::<HashKind>()?;
        let bytes = hex::decode(hex_part).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self { kind, bytes: arr })
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{})", self.kind, self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Incremental digest computation for streaming writes.
///
/// Feed bytes with [`update`]; [`current`] answers "the digest of everything
/// written so far" without ending the stream, and [`finalize`] consumes the
/// state to produce the final digest.
///
/// [`update`]: DigestState::update
/// [`current`]: DigestState::current
/// [`finalize`]: DigestState::finalize
pub enum DigestState {
    Blake3(blake3::Hasher),
    Sha256(sha2::Sha256),
}

impl DigestState {
    /// Start a fresh hash computation for the given algorithm.
    pub fn new(kind: HashKind) -> Self {
        match kind {
            HashKind::Blake3 => Self::Blake3(blake3::Hasher::new()),
            HashKind::Sha256 => Self::Sha256(sha2::Sha256::new()),
        }
    }

    /// The algorithm this state computes.
    pub fn kind(&self) -> HashKind {
        match self {
            Self::Blake3(_) => HashKind::Blake3,
            Self::Sha256(_) => HashKind::Sha256,
        }
    }

    /// Absorb more input.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
        }
    }

    /// Digest of the input absorbed so far. The state remains usable.
    pub fn current(&self) -> Digest {
        match self {
            Self::Blake3(h) => Digest::from_parts(HashKind::Blake3, *h.finalize().as_bytes()),
            Self::Sha256(h) => {
                Digest::from_parts(HashKind::Sha256, h.clone().finalize().into())
            }
        }
    }

    /// Consume the state and produce the final digest.
    pub fn finalize(self) -> Digest {
        match self {
            Self::Blake3(h) => Digest::from_parts(HashKind::Blake3, *h.finalize().as_bytes()),
            Self::Sha256(h) => Digest::from_parts(HashKind::Sha256, h.finalize().into()),
        }
    }
}

impl fmt::Debug for DigestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestState")
            .field("kind", &self.kind())
            .finish()
    }
}
