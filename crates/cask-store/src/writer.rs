use std::io::{self, Write};

use cask_types::{Digest, DigestState, HashKind, MediaType};

use crate::descriptor::Descriptor;
use crate::error::StoreResult;
use crate::store::BlobStore;
use crate::traits::Staging;

/// Streams a new blob into the store.
///
/// Bytes written through the [`Write`] impl land in a private staging area
/// and feed the incremental digest; nothing is visible in the store until
/// [`commit`]. Multiple writers may stream concurrently — only the commit
/// finalization step takes the store lock.
///
/// Exactly one of [`commit`] or [`cancel`] consumes the writer. A writer
/// dropped without either discards its staging area, so early returns and
/// error paths cannot leak staged bytes. Because both consume `self`,
/// cancel-after-commit does not exist at the type level.
///
/// [`commit`]: BlobWriter::commit
/// [`cancel`]: BlobWriter::cancel
pub struct BlobWriter<'store> {
    store: &'store BlobStore,
    staging: Option<Box<dyn Staging>>,
    digest: DigestState,
    size: u64,
}

impl<'store> BlobWriter<'store> {
    pub(crate) fn new(
        store: &'store BlobStore,
        staging: Box<dyn Staging>,
        kind: HashKind,
    ) -> Self {
        Self {
            store,
            staging: Some(staging),
            digest: DigestState::new(kind),
            size: 0,
        }
    }

    /// Digest of everything written so far (not yet final).
    pub fn digest(&self) -> Digest {
        self.digest.current()
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Finalize the write into a durable blob.
    ///
    /// If a blob with the same digest already exists, the staged bytes are
    /// discarded and the existing blob gains one reference (the committer's);
    /// otherwise the staged content becomes a new blob with a reference
    /// count of 1, the given `media_type`, and the measured size.
    pub fn commit(mut self, media_type: MediaType) -> StoreResult<Descriptor> {
        let staging = self.staging.take().expect("writer already consumed");
        let digest = self.digest.current();
        self.store
            .commit_staged(staging, digest, media_type, self.size)
    }

    /// Abandon the write and release the staging area.
    pub fn cancel(mut self) -> StoreResult<()> {
        match self.staging.take() {
            Some(staging) => staging.discard(),
            None => Ok(()),
        }
    }
}

impl Write for BlobWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let staging = self
            .staging
            .as_mut()
            .expect("writer already consumed");
        let written = staging.write(buf)?;
        self.digest.update(&buf[..written]);
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.staging.as_mut() {
            Some(staging) => staging.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for BlobWriter<'_> {
    fn drop(&mut self) {
        // Abandonment path: free staging resources, ignore cleanup errors.
        if let Some(staging) = self.staging.take() {
            let _ = staging.discard();
        }
    }
}
