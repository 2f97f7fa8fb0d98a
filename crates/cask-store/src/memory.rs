//! In-memory backend for tests and ephemeral use.
//!
//! [`MemoryBackend`] keeps records and content in `HashMap`s behind a single
//! `RwLock`. Data is lost when the last handle is dropped.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, RwLock};

use cask_types::Digest;

use crate::error::StoreResult;
use crate::record::BlobRecord;
use crate::traits::{Backend, Staging};

#[derive(Default)]
struct Shared {
    records: HashMap<Digest, BlobRecord>,
    contents: HashMap<Digest, Vec<u8>>,
}

/// An in-memory implementation of [`Backend`].
///
/// Records and content live in `HashMap`s behind one `RwLock`; staging
/// areas buffer in a plain `Vec` and insert on promote. Cloning the backend
/// shares the underlying maps.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<RwLock<Shared>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn record_count(&self) -> usize {
        self.shared.read().expect("lock poisoned").records.len()
    }

    /// Number of content payloads currently stored.
    pub fn content_count(&self) -> usize {
        self.shared.read().expect("lock poisoned").contents.len()
    }

    /// Returns `true` if the backend holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Total bytes across all stored payloads.
    pub fn total_bytes(&self) -> u64 {
        self.shared
            .read()
            .expect("lock poisoned")
            .contents
            .values()
            .map(|c| c.len() as u64)
            .sum()
    }
}

impl Backend for MemoryBackend {
    fn load_record(&self, digest: &Digest) -> StoreResult<Option<BlobRecord>> {
        let shared = self.shared.read().expect("lock poisoned");
        Ok(shared.records.get(digest).cloned())
    }

    fn save_record(&self, record: &BlobRecord) -> StoreResult<()> {
        let mut shared = self.shared.write().expect("lock poisoned");
        shared.records.insert(record.digest, record.clone());
        Ok(())
    }

    fn remove_blob(&self, digest: &Digest) -> StoreResult<()> {
        let mut shared = self.shared.write().expect("lock poisoned");
        shared.records.remove(digest);
        shared.contents.remove(digest);
        Ok(())
    }

    fn list_digests(&self) -> StoreResult<Vec<Digest>> {
        let shared = self.shared.read().expect("lock poisoned");
        Ok(shared.records.keys().copied().collect())
    }

    fn begin_staging(&self) -> StoreResult<Box<dyn Staging>> {
        Ok(Box::new(MemoryStaging {
            shared: Arc::clone(&self.shared),
            buf: Vec::new(),
        }))
    }

    fn open_content(&self, digest: &Digest) -> StoreResult<Box<dyn Read + Send>> {
        let shared = self.shared.read().expect("lock poisoned");
        match shared.contents.get(digest) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(crate::error::StoreError::NotExists(*digest)),
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("record_count", &self.record_count())
            .finish()
    }
}

struct MemoryStaging {
    shared: Arc<RwLock<Shared>>,
    buf: Vec<u8>,
}

impl Write for MemoryStaging {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Staging for MemoryStaging {
    fn promote(self: Box<Self>, digest: &Digest) -> StoreResult<()> {
        let mut shared = self.shared.write().expect("lock poisoned");
        shared.contents.insert(*digest, self.buf);
        Ok(())
    }

    fn discard(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
