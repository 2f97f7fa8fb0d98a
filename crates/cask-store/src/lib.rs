//! Content-addressed blob storage with reference counting.
//!
//! This crate implements the cask lifecycle engine: immutable byte payloads
//! keyed by their content digest, deduplicated on commit, owned through
//! explicit reference counts, and connected by a directed link graph so that
//! releasing the last owner of a blob transitively releases everything it
//! depends on.
//!
//! # Components
//!
//! - [`BlobStore`] — the store surface: `get`, `list`, `new_writer`,
//!   `retain`, `release`, `link`, `unlink`
//! - [`BlobWriter`] — streams bytes into a private staging area while
//!   computing the content digest incrementally
//! - [`Backend`] — the persistence collaborator trait; [`MemoryBackend`]
//!   and [`FsBackend`] are the provided implementations
//! - [`Descriptor`] / [`Blob`] — read-only projections handed to callers
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once committed; identical content is stored once.
//! 2. A blob's durable storage exists exactly as long as its record does;
//!    the two are created and removed together.
//! 3. Every mutating operation serializes on a single store-wide lock, so
//!    reference counts never race and cascades observe a consistent graph.
//! 4. Reference counts clamp at zero; a release of an already-released
//!    blob never underflows.
//! 5. The link graph may contain cycles; the engine performs no cycle
//!    collection (pure reference counting, documented limitation).

pub mod descriptor;
pub mod error;
pub mod fs;
pub mod memory;
pub mod record;
pub mod store;
pub mod traits;
pub mod writer;

// Re-export primary types at crate root for ergonomic imports.
pub use descriptor::{Blob, Descriptor};
pub use error::{StoreError, StoreResult};
pub use fs::{Durability, FsBackend};
pub use memory::MemoryBackend;
pub use record::BlobRecord;
pub use store::BlobStore;
pub use traits::{Backend, Staging};
pub use writer::BlobWriter;
