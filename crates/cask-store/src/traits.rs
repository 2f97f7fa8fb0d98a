//! The [`Backend`] trait defining the persistence contract.
//!
//! The engine never assumes a particular encoding or physical layout; any
//! collaborator (in-memory, filesystem, database) implements this trait to
//! hold records and content for a [`BlobStore`].
//!
//! [`BlobStore`]: crate::store::BlobStore

use std::io::{Read, Write};

use cask_types::Digest;

use crate::error::StoreResult;
use crate::record::BlobRecord;

/// Persistence collaborator for the blob store.
///
/// Implementations must be thread-safe (`Send + Sync`). The engine provides
/// all higher-level guarantees itself: backends are never asked to reason
/// about reference counts or links, only to durably keep records and bytes.
///
/// Mutual exclusion between mutating calls is the *store's* job (a single
/// store-wide lock); backends only need to keep individual calls atomic and
/// concurrent reads safe.
pub trait Backend: Send + Sync {
    /// Load the record for `digest`.
    ///
    /// Returns `Ok(None)` if no record exists. Returns `Err` only for real
    /// persistence failures.
    fn load_record(&self, digest: &Digest) -> StoreResult<Option<BlobRecord>>;

    /// Create or replace the record keyed by `record.digest`.
    fn save_record(&self, record: &BlobRecord) -> StoreResult<()>;

    /// Delete a blob's durable content *and* its record as one step.
    ///
    /// The two are only ever removed together, inside the same critical
    /// section. Removing a digest with no blob is a no-op, which keeps a
    /// retried removal idempotent.
    fn remove_blob(&self, digest: &Digest) -> StoreResult<()>;

    /// Digests of all blobs with a current record, in no particular order.
    fn list_digests(&self) -> StoreResult<Vec<Digest>>;

    /// Allocate a private staging area for one in-flight write.
    ///
    /// Staging areas are independent of each other and invisible to readers
    /// until promoted.
    fn begin_staging(&self) -> StoreResult<Box<dyn Staging>>;

    /// Open a blob's content for reading.
    ///
    /// Fails with `NotExists` if the content is not durable (never written,
    /// or already removed by a racing release).
    fn open_content(&self, digest: &Digest) -> StoreResult<Box<dyn Read + Send>>;
}

/// Private scratch space for one in-flight write.
///
/// Bytes stream in through the [`Write`] impl without any store-level
/// locking. Exactly one of [`promote`] or [`discard`] ends the staging
/// area's life; dropping an unfinished staging area releases its resources
/// as if discarded, so abandonment on any exit path cannot leak.
///
/// [`promote`]: Staging::promote
/// [`discard`]: Staging::discard
pub trait Staging: Write + Send {
    /// Move the staged bytes into durable storage under `digest`.
    ///
    /// Only called while the store lock is held and no record exists for
    /// `digest` yet.
    fn promote(self: Box<Self>, digest: &Digest) -> StoreResult<()>;

    /// Abandon the staged bytes and free any temporary resources.
    fn discard(self: Box<Self>) -> StoreResult<()>;
}
