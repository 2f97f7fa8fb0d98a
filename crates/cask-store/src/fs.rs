//! Filesystem backend.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/
//! ├── blobs/
//! │   └── blake3/
//! │       └── af/
//! │           └── af1349b9...89d2/
//! │               ├── content
//! │               └── record.json
//! └── staging/
//!     └── 4217.3.tmp
//! ```
//!
//! Content files are keyed by algorithm and full hex digest with a two-char
//! fan-out level, and land via temp-file-plus-rename so a blob is never
//! visible half-written. The record lives beside its content in the same
//! directory, so removing that directory removes both together.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use cask_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::record::BlobRecord;
use crate::traits::{Backend, Staging};

const BLOBS_DIR: &str = "blobs";
const STAGING_DIR: &str = "staging";
const CONTENT_FILE: &str = "content";
const RECORD_FILE: &str = "record.json";

/// Process-wide sequence for unique temp file names.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// How eagerly file contents reach stable storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Durability {
    /// Leave flushing to the operating system.
    Buffered,
    /// Sync files before they are renamed into place.
    #[default]
    Fsync,
}

/// A filesystem implementation of [`Backend`].
#[derive(Debug)]
pub struct FsBackend {
    root: PathBuf,
    durability: Durability,
}

impl FsBackend {
    /// Open (creating if needed) a store rooted at `root`, with the default
    /// durability.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::with_durability(root, Durability::default())
    }

    /// Open a store rooted at `root` with an explicit durability level.
    pub fn with_durability(root: impl AsRef<Path>, durability: Durability) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(BLOBS_DIR))?;
        fs::create_dir_all(root.join(STAGING_DIR))?;
        Ok(Self { root, durability })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_dir(&self, digest: &Digest) -> PathBuf {
        blob_dir(&self.root.join(BLOBS_DIR), digest)
    }
}

/// Directory holding one blob's content and record:
/// `<blobs>/<algorithm>/<first two hex chars>/<full hex>/`.
fn blob_dir(blobs: &Path, digest: &Digest) -> PathBuf {
    let hex = digest.to_hex();
    blobs.join(digest.kind().as_str()).join(&hex[..2]).join(hex)
}

fn persistence(err: io::Error) -> StoreError {
    StoreError::Persistence(err.to_string())
}

impl Backend for FsBackend {
    fn load_record(&self, digest: &Digest) -> StoreResult<Option<BlobRecord>> {
        let path = self.blob_dir(digest).join(RECORD_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Persistence(format!("decode record for {digest}: {e}")))
    }

    fn save_record(&self, record: &BlobRecord) -> StoreResult<()> {
        let dir = self.blob_dir(&record.digest);
        fs::create_dir_all(&dir).map_err(persistence)?;

        let bytes = serde_json::to_vec(record)
            .map_err(|e| StoreError::Persistence(format!("encode record for {}: {e}", record.digest)))?;

        // Temp file + rename keeps the record readable at every instant.
        let tmp = dir.join(format!(
            "{RECORD_FILE}.{}.{}.tmp",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let result = (|| {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            if self.durability == Durability::Fsync {
                file.sync_all()?;
            }
            drop(file);
            fs::rename(&tmp, dir.join(RECORD_FILE))
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(persistence(e));
        }
        Ok(())
    }

    fn remove_blob(&self, digest: &Digest) -> StoreResult<()> {
        match fs::remove_dir_all(self.blob_dir(digest)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::StorageRemoval {
                digest: *digest,
                reason: e.to_string(),
            }),
        }
    }

    fn list_digests(&self) -> StoreResult<Vec<Digest>> {
        let mut digests = Vec::new();
        let blobs = self.root.join(BLOBS_DIR);

        for kind_entry in fs::read_dir(&blobs).map_err(persistence)? {
            let kind_entry = kind_entry.map_err(persistence)?;
            if !kind_entry.file_type().map_err(persistence)?.is_dir() {
                continue;
            }
            let kind_name = kind_entry.file_name();
            let Some(kind_name) = kind_name.to_str() else {
                continue;
            };
            for fan_entry in fs::read_dir(kind_entry.path()).map_err(persistence)? {
                let fan_entry = fan_entry.map_err(persistence)?;
                if !fan_entry.file_type().map_err(persistence)?.is_dir() {
                    continue;
                }
                for blob_entry in fs::read_dir(fan_entry.path()).map_err(persistence)? {
                    let blob_entry = blob_entry.map_err(persistence)?;
                    let name = blob_entry.file_name();
                    let Some(hex) = name.to_str() else {
                        continue;
                    };
                    let Ok(digest) = Digest::parse(&format!("{kind_name}:{hex}")) else {
                        continue;
                    };
                    // A blob exists iff its record does.
                    if blob_entry.path().join(RECORD_FILE).exists() {
                        digests.push(digest);
                    }
                }
            }
        }

        Ok(digests)
    }

    fn begin_staging(&self) -> StoreResult<Box<dyn Staging>> {
        let path = self.root.join(STAGING_DIR).join(format!(
            "{}.{}.tmp",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let file = File::create(&path)?;
        Ok(Box::new(FsStaging {
            file: Some(file),
            path,
            blobs: self.root.join(BLOBS_DIR),
            durability: self.durability,
            finished: false,
        }))
    }

    fn open_content(&self, digest: &Digest) -> StoreResult<Box<dyn Read + Send>> {
        match File::open(self.blob_dir(digest).join(CONTENT_FILE)) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotExists(*digest))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// One in-flight write: a uniquely named temp file under `staging/`.
struct FsStaging {
    file: Option<File>,
    path: PathBuf,
    blobs: PathBuf,
    durability: Durability,
    finished: bool,
}

impl Write for FsStaging {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.as_mut().expect("staging file open").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.as_mut().expect("staging file open").flush()
    }
}

impl Staging for FsStaging {
    fn promote(mut self: Box<Self>, digest: &Digest) -> StoreResult<()> {
        let file = self.file.take().expect("staging file open");
        if self.durability == Durability::Fsync {
            file.sync_all()?;
        }
        drop(file);

        let dir = blob_dir(&self.blobs, digest);
        fs::create_dir_all(&dir)?;
        fs::rename(&self.path, dir.join(CONTENT_FILE))?;
        self.finished = true;
        Ok(())
    }

    fn discard(mut self: Box<Self>) -> StoreResult<()> {
        self.file.take();
        self.finished = true;
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

impl Drop for FsStaging {
    fn drop(&mut self) {
        if !self.finished {
            self.file.take();
            let _ = fs::remove_file(&self.path);
        }
    }
}
