use cask_types::Digest;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The operation referenced a digest with no current record.
    #[error("blob does not exist: {0}")]
    NotExists(Digest),

    /// Deleting durable content failed after the reference count reached
    /// zero. The record may be left behind with a zero count; releasing the
    /// digest again retries the removal.
    #[error("failed to remove storage for {digest}: {reason}")]
    StorageRemoval { digest: Digest, reason: String },

    /// The underlying record read or write failed.
    #[error("metadata persistence failed: {0}")]
    Persistence(String),

    /// Content I/O failed (staging writes, promotion, or opening a blob).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for the [`NotExists`] discriminant.
    ///
    /// The cascading release swallows exactly this case; everything else
    /// aborts the operation.
    ///
    /// [`NotExists`]: StoreError::NotExists
    pub fn is_not_exists(&self) -> bool {
        matches!(self, Self::NotExists(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
