//! The store surface and its concurrency-controlled lifecycle engine.
//!
//! All mutating operations — retain, release (with its whole cascade), link,
//! unlink, and commit finalization — serialize on one store-wide lock. The
//! cascade touches an unbounded set of records reachable through the link
//! graph; partial overlap between two concurrent cascades, or a cascade and
//! a concurrent retain, would otherwise race on shared counters. Read-only
//! operations (`get`, `list`) skip the lock and tolerate blobs disappearing
//! under them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use cask_types::{Digest, HashKind, MediaType};

use crate::descriptor::{Blob, Descriptor};
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryBackend;
use crate::record::BlobRecord;
use crate::traits::{Backend, Staging};
use crate::writer::BlobWriter;

/// A local, content-addressable blob store.
///
/// Blobs are immutable byte payloads keyed by their content digest. Each
/// blob carries a reference count; a directed link graph models one blob's
/// implicit ownership of another, and releasing the last owner of a blob
/// transitively releases everything it depends on.
pub struct BlobStore {
    backend: Arc<dyn Backend>,
    /// Store-wide mutual exclusion for every mutating operation. The unit
    /// payload is deliberate: the lock guards the backend's *logical* state,
    /// not any in-process data.
    mutation: Mutex<()>,
}

impl BlobStore {
    /// Create a store over the given persistence collaborator.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            mutation: Mutex::new(()),
        }
    }

    /// Create a store over a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    // ---------------------------------------------------------------
    // Read-only surface (no store lock)
    // ---------------------------------------------------------------

    /// Fetch the blob with the given digest.
    pub fn get(&self, digest: &Digest) -> StoreResult<Blob> {
        let record = self
            .backend
            .load_record(digest)?
            .ok_or(StoreError::NotExists(*digest))?;
        Ok(Blob::new(
            Descriptor::from(&record),
            Arc::clone(&self.backend),
        ))
    }

    /// Whether a blob with the given digest currently exists.
    pub fn contains(&self, digest: &Digest) -> StoreResult<bool> {
        Ok(self.backend.load_record(digest)?.is_some())
    }

    /// Digests of every blob in the store, in no particular order.
    pub fn list(&self) -> StoreResult<Vec<Digest>> {
        self.backend.list_digests()
    }

    /// Begin writing a new blob, hashing with the given algorithm.
    ///
    /// Streaming into the writer is not serialized by the store lock; only
    /// the commit finalization step takes it.
    pub fn new_writer(&self, kind: HashKind) -> StoreResult<BlobWriter<'_>> {
        let staging = self.backend.begin_staging()?;
        Ok(BlobWriter::new(self, staging, kind))
    }

    // ---------------------------------------------------------------
    // Reference counting
    // ---------------------------------------------------------------

    /// Acquire one more reference on a blob.
    pub fn retain(&self, digest: &Digest) -> StoreResult<Descriptor> {
        let _guard = self.mutation.lock().expect("store lock poisoned");

        let mut record = self
            .backend
            .load_record(digest)?
            .ok_or(StoreError::NotExists(*digest))?;
        record.ref_count += 1;
        self.backend.save_record(&record)?;

        debug!(
            digest = %digest.short_hex(),
            ref_count = record.ref_count,
            "retained blob"
        );
        Ok(Descriptor::from(&record))
    }

    /// Drop one reference on a blob.
    ///
    /// When the count reaches zero the blob is removed — content and record
    /// together — and every blob it links to is released in turn (§cascade).
    pub fn release(&self, digest: &Digest) -> StoreResult<()> {
        let _guard = self.mutation.lock().expect("store lock poisoned");

        let record = self
            .backend
            .load_record(digest)?
            .ok_or(StoreError::NotExists(*digest))?;
        self.release_under_lock(record)
    }

    // ---------------------------------------------------------------
    // Link graph
    // ---------------------------------------------------------------

    /// Record that `from` implicitly owns `to`.
    ///
    /// The edge attaches one of `to`'s existing references — taken by the
    /// caller beforehand — to `from`'s lifetime; `to`'s count is not
    /// touched here.
    ///
    /// Caution: this operation is **not** idempotent. If the edge already
    /// exists, the call instead decrements `to`'s reference count (clamped
    /// at zero) and leaves the edge in place, compensating one prior
    /// retain. Callers re-linking an existing pair get that compensating
    /// behavior, not a repeat insertion.
    pub fn link(&self, to: &Digest, from: &Digest) -> StoreResult<()> {
        let _guard = self.mutation.lock().expect("store lock poisoned");

        let mut from_record = self
            .backend
            .load_record(from)?
            .ok_or(StoreError::NotExists(*from))?;
        let mut to_record = self
            .backend
            .load_record(to)?
            .ok_or(StoreError::NotExists(*to))?;

        if from_record.has_link(to) {
            // Compensating path: give back one of the caller's references
            // on `to`. No persist when the count is already zero.
            if to_record.ref_count > 0 {
                to_record.ref_count -= 1;
                self.backend.save_record(&to_record)?;
            }
            debug!(
                to = %to.short_hex(),
                from = %from.short_hex(),
                ref_count = to_record.ref_count,
                "edge already present; compensated one reference"
            );
            return Ok(());
        }

        from_record.add_link(*to);
        self.backend.save_record(&from_record)?;

        debug!(to = %to.short_hex(), from = %from.short_hex(), "linked blobs");
        Ok(())
    }

    /// Remove the edge `from -> to` and release the reference it carried.
    ///
    /// Removing an edge that does not exist is a no-op; `to` keeps all of
    /// its references. Both endpoints must exist.
    pub fn unlink(&self, to: &Digest, from: &Digest) -> StoreResult<()> {
        let _guard = self.mutation.lock().expect("store lock poisoned");

        let mut from_record = self
            .backend
            .load_record(from)?
            .ok_or(StoreError::NotExists(*from))?;
        if self.backend.load_record(to)?.is_none() {
            return Err(StoreError::NotExists(*to));
        }

        if !from_record.remove_link(to) {
            return Ok(());
        }
        self.backend.save_record(&from_record)?;
        debug!(to = %to.short_hex(), from = %from.short_hex(), "unlinked blobs");

        // The removed edge carried one reference on `to`; release it.
        // Reload rather than reuse the copy from the existence check: when
        // `to == from`, the saved record no longer holds the edge.
        match self.backend.load_record(to)? {
            Some(record) => self.release_under_lock(record),
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------
    // Commit finalization
    // ---------------------------------------------------------------

    /// Finalize a staged write under the store lock: dedup lookup, then
    /// either promote the staged content or credit the existing blob.
    pub(crate) fn commit_staged(
        &self,
        staging: Box<dyn Staging>,
        digest: Digest,
        media_type: MediaType,
        size: u64,
    ) -> StoreResult<Descriptor> {
        let _guard = self.mutation.lock().expect("store lock poisoned");

        if let Some(mut record) = self.backend.load_record(&digest)? {
            // Identical content is already durable: drop the staged copy
            // and credit the committer with one reference. The original
            // media type wins.
            staging.discard()?;
            record.ref_count += 1;
            self.backend.save_record(&record)?;
            debug!(
                digest = %digest.short_hex(),
                ref_count = record.ref_count,
                "deduplicated commit"
            );
            return Ok(Descriptor::from(&record));
        }

        staging.promote(&digest)?;
        let record = BlobRecord::new(digest, media_type, size);
        self.backend.save_record(&record)?;
        debug!(digest = %digest.short_hex(), size, "committed new blob");
        Ok(Descriptor::from(&record))
    }

    // ---------------------------------------------------------------
    // Cascading release
    // ---------------------------------------------------------------

    /// Release one reference on `record` and cascade through the link
    /// graph. Caller holds the store lock.
    ///
    /// The cascade is an explicit work-list, not recursion: each entry is
    /// one owed release, and a blob whose count reaches zero is removed
    /// *before* its outgoing edges are queued (the parent is always gone
    /// by the time a child is touched). Entries for blobs already removed
    /// in this cascade, or missing from the backend, are treated as
    /// released — that forgiveness is what lets a cascade entering a cycle
    /// terminate instead of spinning. Any other error aborts the whole
    /// operation.
    ///
    /// A cycle whose counts never reach zero is simply left in place;
    /// there is no tracing collector.
    fn release_under_lock(&self, record: BlobRecord) -> StoreResult<()> {
        let mut pending: Vec<Digest> = Vec::new();
        let mut removed: HashSet<Digest> = HashSet::new();

        self.release_one(record, &mut pending, &mut removed)?;

        while let Some(digest) = pending.pop() {
            if removed.contains(&digest) {
                continue;
            }
            // Already released by an earlier branch of this cascade or a
            // prior partial cascade: skip, as with the removed set.
            let Some(record) = self.backend.load_record(&digest)? else {
                continue;
            };
            self.release_one(record, &mut pending, &mut removed)?;
        }
        Ok(())
    }

    /// Apply a single owed release to `record`.
    fn release_one(
        &self,
        mut record: BlobRecord,
        pending: &mut Vec<Digest>,
        removed: &mut HashSet<Digest>,
    ) -> StoreResult<()> {
        if record.ref_count == 0 {
            // Only reachable when a failed storage removal left a
            // zero-count record behind; retry the removal.
            warn!(
                digest = %record.digest.short_hex(),
                "blob already at zero references; retrying removal"
            );
        }
        record.ref_count = record.ref_count.saturating_sub(1);

        if record.ref_count > 0 {
            self.backend.save_record(&record)?;
            debug!(
                digest = %record.digest.short_hex(),
                ref_count = record.ref_count,
                "released blob"
            );
            return Ok(());
        }

        self.backend.remove_blob(&record.digest)?;
        removed.insert(record.digest);
        debug!(
            digest = %record.digest.short_hex(),
            links = record.links_to.len(),
            "removed unreferenced blob"
        );
        pending.append(&mut record.links_to);
        Ok(())
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::RngCore;
    use std::io::Write as _;

    fn test_store() -> (BlobStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store = BlobStore::new(Arc::new(backend.clone()));
        (store, backend)
    }

    fn commit(store: &BlobStore, data: &[u8]) -> Descriptor {
        let mut writer = store.new_writer(HashKind::Blake3).unwrap();
        writer.write_all(data).unwrap();
        writer.commit(MediaType::octet_stream()).unwrap()
    }

    fn ref_count(store: &BlobStore, digest: &Digest) -> u64 {
        store.get(digest).unwrap().descriptor().ref_count()
    }

    fn random_digest() -> Digest {
        let mut data = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut data);
        Digest::compute(HashKind::Blake3, &data)
    }

    // -----------------------------------------------------------------------
    // Missing digests
    // -----------------------------------------------------------------------

    #[test]
    fn retain_missing_blob_fails() {
        let (store, _) = test_store();
        let err = store.retain(&random_digest()).unwrap_err();
        assert!(err.is_not_exists());
    }

    #[test]
    fn release_missing_blob_fails() {
        let (store, _) = test_store();
        let err = store.release(&random_digest()).unwrap_err();
        assert!(err.is_not_exists());
    }

    #[test]
    fn get_missing_blob_fails() {
        let (store, _) = test_store();
        let err = store.get(&random_digest()).unwrap_err();
        assert!(err.is_not_exists());
    }

    #[test]
    fn link_requires_both_endpoints() {
        let (store, _) = test_store();
        let a = commit(&store, b"present");

        assert!(store
            .link(a.digest(), &random_digest())
            .unwrap_err()
            .is_not_exists());
        assert!(store
            .link(&random_digest(), a.digest())
            .unwrap_err()
            .is_not_exists());
    }

    #[test]
    fn unlink_requires_both_endpoints() {
        let (store, _) = test_store();
        let a = commit(&store, b"present");

        assert!(store
            .unlink(a.digest(), &random_digest())
            .unwrap_err()
            .is_not_exists());
        assert!(store
            .unlink(&random_digest(), a.digest())
            .unwrap_err()
            .is_not_exists());
    }

    // -----------------------------------------------------------------------
    // Commit, dedup, and content fidelity
    // -----------------------------------------------------------------------

    #[test]
    fn committed_content_reads_back_byte_identical() {
        let (store, _) = test_store();
        let mut data = vec![0u8; 20480];
        rand::thread_rng().fill_bytes(&mut data);

        let desc = commit(&store, &data);
        let blob = store.get(desc.digest()).unwrap();
        assert_eq!(blob.read_to_end().unwrap(), data);
    }

    #[test]
    fn duplicate_commit_reuses_the_existing_blob() {
        let (store, backend) = test_store();
        let first = commit(&store, b"identical content");
        let second = commit(&store, b"identical content");

        assert_eq!(first.digest(), second.digest());
        assert_eq!(second.ref_count(), 2);
        // No duplicate storage: one record, one payload.
        assert_eq!(backend.record_count(), 1);
        assert_eq!(backend.content_count(), 1);
    }

    #[test]
    fn duplicate_commit_keeps_the_original_media_type() {
        let (store, _) = test_store();
        let mut writer = store.new_writer(HashKind::Blake3).unwrap();
        writer.write_all(b"typed content").unwrap();
        writer.commit(MediaType::new("text/plain")).unwrap();

        let mut writer = store.new_writer(HashKind::Blake3).unwrap();
        writer.write_all(b"typed content").unwrap();
        let second = writer.commit(MediaType::new("image/png")).unwrap();
        assert_eq!(second.media_type().as_str(), "text/plain");
    }

    #[test]
    fn list_covers_committed_blobs() {
        let (store, _) = test_store();
        let a = commit(&store, b"list a");
        let b = commit(&store, b"list b");

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(a.digest()));
        assert!(listed.contains(b.digest()));
    }

    // -----------------------------------------------------------------------
    // Retain / release lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn retain_five_then_release_six_removes_the_blob() {
        let (store, _) = test_store();
        let mut data = vec![0u8; 20480];
        rand::thread_rng().fill_bytes(&mut data);

        let desc = commit(&store, &data);
        assert_eq!(desc.ref_count(), 1);
        let digest = *desc.digest();

        for expected in 2u64..=6 {
            let d = store.retain(&digest).unwrap();
            assert_eq!(d.ref_count(), expected);
        }

        for remaining in (0u64..6).rev() {
            store.release(&digest).unwrap();
            if remaining > 0 {
                assert_eq!(ref_count(&store, &digest), remaining);
            }
        }

        assert!(store.get(&digest).unwrap_err().is_not_exists());
    }

    #[test]
    fn release_removes_storage_with_the_record() {
        let (store, backend) = test_store();
        let desc = commit(&store, b"short-lived");

        store.release(desc.digest()).unwrap();
        assert_eq!(backend.record_count(), 0);
        assert_eq!(backend.content_count(), 0);
    }

    #[test]
    fn release_of_zero_count_record_retries_removal() {
        let (store, backend) = test_store();
        // Simulate the aftermath of a failed storage removal: a record
        // left behind with zero references.
        let digest = Digest::compute(HashKind::Blake3, b"leftover");
        let mut record = BlobRecord::new(digest, MediaType::octet_stream(), 8);
        record.ref_count = 0;
        backend.save_record(&record).unwrap();

        store.release(&digest).unwrap();
        assert!(backend.load_record(&digest).unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Link graph
    // -----------------------------------------------------------------------

    #[test]
    fn link_records_the_edge_without_touching_the_target() {
        let (store, _) = test_store();
        let a = commit(&store, b"parent a");
        let b = commit(&store, b"child b");
        store.retain(b.digest()).unwrap(); // the reference the edge attaches

        store.link(b.digest(), a.digest()).unwrap();

        let a_now = store.get(a.digest()).unwrap();
        assert_eq!(a_now.descriptor().links_to(), &[*b.digest()]);
        assert_eq!(ref_count(&store, b.digest()), 2);
    }

    #[test]
    fn releasing_the_parent_cascades_one_release_to_the_child() {
        let (store, backend) = test_store();
        let a = commit(&store, b"parent a");
        let b = commit(&store, b"child b");
        store.retain(b.digest()).unwrap();
        store.link(b.digest(), a.digest()).unwrap();

        store.release(a.digest()).unwrap();

        // A is fully gone; B lost exactly the edge's reference.
        assert!(store.get(a.digest()).unwrap_err().is_not_exists());
        assert_eq!(ref_count(&store, b.digest()), 1);
        assert_eq!(backend.content_count(), 1);
    }

    #[test]
    fn repeated_link_compensates_instead_of_duplicating() {
        let (store, _) = test_store();
        let a = commit(&store, b"parent a");
        let b = commit(&store, b"child b");
        store.retain(b.digest()).unwrap(); // count 2
        store.link(b.digest(), a.digest()).unwrap();

        // Second link on the same pair: count drops, edge set unchanged.
        store.link(b.digest(), a.digest()).unwrap();
        assert_eq!(ref_count(&store, b.digest()), 1);
        assert_eq!(store.get(a.digest()).unwrap().descriptor().links_to().len(), 1);
    }

    #[test]
    fn link_compensation_clamps_at_zero() {
        let (store, _) = test_store();
        let a = commit(&store, b"parent a");
        let b = commit(&store, b"child b");
        store.link(b.digest(), a.digest()).unwrap();

        // Drive B's count to zero through the compensating path, then keep
        // going: the count clamps, the blob is not removed.
        store.link(b.digest(), a.digest()).unwrap();
        assert_eq!(ref_count(&store, b.digest()), 0);
        store.link(b.digest(), a.digest()).unwrap();
        assert_eq!(ref_count(&store, b.digest()), 0);
    }

    #[test]
    fn unlink_removes_the_edge_and_releases_the_target() {
        let (store, _) = test_store();
        let a = commit(&store, b"parent a");
        let b = commit(&store, b"child b");
        store.retain(b.digest()).unwrap(); // count 2
        store.link(b.digest(), a.digest()).unwrap();

        store.unlink(b.digest(), a.digest()).unwrap();

        let a_now = store.get(a.digest()).unwrap();
        assert!(a_now.descriptor().links_to().is_empty());
        assert_eq!(ref_count(&store, b.digest()), 1);
    }

    #[test]
    fn unlink_cascade_can_remove_the_target() {
        let (store, _) = test_store();
        let a = commit(&store, b"parent a");
        let b = commit(&store, b"child b"); // count 1, owned by the edge
        store.link(b.digest(), a.digest()).unwrap();

        store.unlink(b.digest(), a.digest()).unwrap();
        assert!(store.get(b.digest()).unwrap_err().is_not_exists());
        assert!(store.get(a.digest()).is_ok());
    }

    #[test]
    fn unlink_without_an_edge_is_a_noop() {
        let (store, _) = test_store();
        let a = commit(&store, b"parent a");
        let b = commit(&store, b"child b");
        store.retain(b.digest()).unwrap();

        store.unlink(b.digest(), a.digest()).unwrap();
        assert_eq!(ref_count(&store, b.digest()), 2);
    }

    // -----------------------------------------------------------------------
    // Cascades over deeper graphs
    // -----------------------------------------------------------------------

    #[test]
    fn chain_cascade_releases_transitively() {
        let (store, backend) = test_store();
        let a = commit(&store, b"chain a");
        let b = commit(&store, b"chain b");
        let c = commit(&store, b"chain c");
        store.link(b.digest(), a.digest()).unwrap();
        store.link(c.digest(), b.digest()).unwrap();

        store.release(a.digest()).unwrap();
        assert_eq!(backend.record_count(), 0);
        assert_eq!(backend.content_count(), 0);
    }

    #[test]
    fn diamond_cascade_applies_one_release_per_edge() {
        let (store, backend) = test_store();
        let a = commit(&store, b"diamond a");
        let b = commit(&store, b"diamond b");
        let c = commit(&store, b"diamond c");
        let d = commit(&store, b"diamond d");
        store.retain(d.digest()).unwrap(); // count 2: one per incoming edge

        store.link(b.digest(), a.digest()).unwrap();
        store.link(c.digest(), a.digest()).unwrap();
        store.link(d.digest(), b.digest()).unwrap();
        store.link(d.digest(), c.digest()).unwrap();

        // D must be released twice (once per incoming edge), so the whole
        // diamond collapses.
        store.release(a.digest()).unwrap();
        assert_eq!(backend.record_count(), 0);
        assert_eq!(backend.content_count(), 0);
    }

    #[test]
    fn partial_diamond_keeps_the_shared_child() {
        let (store, _) = test_store();
        let a = commit(&store, b"partial a");
        let b = commit(&store, b"partial b");
        let d = commit(&store, b"partial d");
        store.retain(d.digest()).unwrap(); // one external, one for the edge

        store.link(d.digest(), b.digest()).unwrap();
        store.link(b.digest(), a.digest()).unwrap();

        store.release(a.digest()).unwrap();
        // A and B collapse; D keeps its external reference.
        assert!(store.get(a.digest()).unwrap_err().is_not_exists());
        assert!(store.get(b.digest()).unwrap_err().is_not_exists());
        assert_eq!(ref_count(&store, d.digest()), 1);
    }

    #[test]
    fn self_link_release_terminates() {
        let (store, backend) = test_store();
        let a = commit(&store, b"ouroboros");
        store.link(a.digest(), a.digest()).unwrap();

        store.release(a.digest()).unwrap();
        assert_eq!(backend.record_count(), 0);
    }

    #[test]
    fn cycle_with_external_owners_is_not_collected() {
        let (store, _) = test_store();
        let a = commit(&store, b"cycle a");
        let b = commit(&store, b"cycle b");
        store.retain(a.digest()).unwrap(); // external + edge reference
        store.retain(b.digest()).unwrap();
        store.link(b.digest(), a.digest()).unwrap();
        store.link(a.digest(), b.digest()).unwrap();

        // Drop both external owners. Each blob still holds the other's
        // edge reference: pure refcounting leaves the cycle in place.
        store.release(a.digest()).unwrap();
        store.release(b.digest()).unwrap();
        assert_eq!(ref_count(&store, a.digest()), 1);
        assert_eq!(ref_count(&store, b.digest()), 1);
    }

    #[test]
    fn cascade_entering_a_cycle_terminates() {
        let (store, backend) = test_store();
        let a = commit(&store, b"cycle a");
        let b = commit(&store, b"cycle b");
        store.link(b.digest(), a.digest()).unwrap();
        store.link(a.digest(), b.digest()).unwrap();

        // A's only reference is external; B's only reference is A's edge.
        // The cascade walks A -> B -> A and must stop at the already
        // removed A rather than spinning.
        store.release(a.digest()).unwrap();
        assert_eq!(backend.record_count(), 0);
        assert_eq!(backend.content_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_retains_and_releases_lose_no_updates() {
        use std::thread;

        let store = Arc::new(BlobStore::in_memory());
        let mut writer = store.new_writer(HashKind::Blake3).unwrap();
        writer.write_all(b"contended blob").unwrap();
        let desc = writer.commit(MediaType::octet_stream()).unwrap();
        let digest = *desc.digest();

        // Seed enough references that no interleaving of the release
        // threads can drive the count to zero mid-test.
        for _ in 0..40 {
            store.retain(&digest).unwrap();
        }

        // 8 threads retain 10 times each, 8 threads release 5 times each:
        // net +40 on top of the seeded 41.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    store.retain(&digest).unwrap();
                }
            }));
        }
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..5 {
                    store.release(&digest).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().expect("thread should not panic");
        }

        assert_eq!(ref_count(&store, &digest), 81);
    }

    // -----------------------------------------------------------------------
    // Operation-sequence property
    // -----------------------------------------------------------------------

    proptest! {
        /// Any interleaving of retains and releases agrees with a simple
        /// counter model: the count tracks the net of all calls, removal
        /// happens exactly when it reaches zero, and afterwards every
        /// operation reports `NotExists`.
        #[test]
        fn retain_release_sequences_match_the_counter_model(
            ops in proptest::collection::vec(any::<bool>(), 1..64)
        ) {
            let (store, _) = test_store();
            let desc = commit(&store, b"modelled blob");
            let digest = *desc.digest();
            let mut model: u64 = 1;

            for retain in ops {
                if model == 0 {
                    prop_assert!(store.retain(&digest).unwrap_err().is_not_exists());
                    prop_assert!(store.release(&digest).unwrap_err().is_not_exists());
                    continue;
                }
                if retain {
                    model += 1;
                    let d = store.retain(&digest).unwrap();
                    prop_assert_eq!(d.ref_count(), model);
                } else {
                    model -= 1;
                    store.release(&digest).unwrap();
                }
            }

            if model > 0 {
                prop_assert_eq!(ref_count(&store, &digest), model);
            } else {
                prop_assert!(store.get(&digest).unwrap_err().is_not_exists());
            }
        }
    }
}
