use std::fmt;
use std::io::Read;
use std::sync::Arc;

use cask_types::{Digest, MediaType};

use crate::error::StoreResult;
use crate::record::BlobRecord;
use crate::traits::Backend;

/// Read-only projection of a blob's metadata, handed back to callers.
///
/// A descriptor is a snapshot taken while the store lock was held; it is
/// never mutated in place and does not track later changes to the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    digest: Digest,
    media_type: MediaType,
    size: u64,
    ref_count: u64,
    links_to: Vec<Digest>,
}

impl Descriptor {
    /// Content-derived identity of the blob.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Caller-supplied classification, fixed at commit time.
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Byte length of the content.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of logical owners at snapshot time.
    pub fn ref_count(&self) -> u64 {
        self.ref_count
    }

    /// Outgoing edges at snapshot time.
    pub fn links_to(&self) -> &[Digest] {
        &self.links_to
    }
}

impl From<&BlobRecord> for Descriptor {
    fn from(record: &BlobRecord) -> Self {
        Self {
            digest: record.digest,
            media_type: record.media_type.clone(),
            size: record.size,
            ref_count: record.ref_count,
            links_to: record.links_to.clone(),
        }
    }
}

/// A stored blob: its [`Descriptor`] plus access to the content bytes.
pub struct Blob {
    descriptor: Descriptor,
    backend: Arc<dyn Backend>,
}

impl Blob {
    pub(crate) fn new(descriptor: Descriptor, backend: Arc<dyn Backend>) -> Self {
        Self {
            descriptor,
            backend,
        }
    }

    /// The blob's metadata snapshot.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Open the content for reading.
    ///
    /// A reader obtained without the store lock can observe the blob
    /// disappearing under a concurrent release; callers tolerate
    /// [`StoreError::NotExists`] here.
    ///
    /// [`StoreError::NotExists`]: crate::error::StoreError::NotExists
    pub fn open(&self) -> StoreResult<Box<dyn Read + Send>> {
        self.backend.open_content(&self.descriptor.digest)
    }

    /// Convenience: read the full content into memory.
    pub fn read_to_end(&self) -> StoreResult<Vec<u8>> {
        let mut reader = self.open()?;
        let mut buf = Vec::with_capacity(self.descriptor.size as usize);
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
