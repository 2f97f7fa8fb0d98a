//! Foundation types for the cask blob store.
//!
//! This crate provides the identity and classification types shared by the
//! storage engine and its persistence backends. Every other cask crate
//! depends on `cask-types`.
//!
//! # Key Types
//!
//! - [`Digest`] — Content-addressed identifier (algorithm-tagged 32-byte hash)
//! - [`HashKind`] — Selector for the hash algorithm behind a digest
//! - [`DigestState`] — Incremental hasher for streaming writes
//! - [`MediaType`] — Caller-supplied content classification

pub mod digest;
pub mod error;
pub mod media_type;

pub use digest::{Digest, DigestState, HashKind};
pub use error::TypeError;
pub use media_type::MediaType;
