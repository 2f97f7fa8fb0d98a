use serde::{Deserialize, Serialize};

use cask_types::{Digest, MediaType};

/// Durable metadata for one stored blob.
///
/// A record is created by commit, mutated by retain/release (`ref_count`)
/// and link/unlink (`links_to`, and indirectly `ref_count` through the
/// cascade), and destroyed together with the blob's content when the count
/// reaches zero. `digest`, `media_type`, and `size` are immutable once set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    /// Content-derived identity.
    pub digest: Digest,
    /// Caller-supplied classification, fixed at commit time.
    pub media_type: MediaType,
    /// Byte length of the content.
    pub size: u64,
    /// Number of logical owners. Mutated only under the store lock.
    pub ref_count: u64,
    /// Outgoing edges: digests this blob holds one implicit reference on
    /// each. Unordered; removal may reorder the collection.
    pub links_to: Vec<Digest>,
}

impl BlobRecord {
    /// A fresh record for newly committed content: one owner, no edges.
    pub fn new(digest: Digest, media_type: MediaType, size: u64) -> Self {
        Self {
            digest,
            media_type,
            size,
            ref_count: 1,
            links_to: Vec::new(),
        }
    }

    /// Whether an edge to `to` is present.
    pub fn has_link(&self, to: &Digest) -> bool {
        self.links_to.contains(to)
    }

    /// Record an edge to `to`. Callers check [`has_link`] first; the edge
    /// set never holds duplicates.
    ///
    /// [`has_link`]: BlobRecord::has_link
    pub fn add_link(&mut self, to: Digest) {
        self.links_to.push(to);
    }

    /// Remove the edge to `to`, if present. Returns whether an edge was
    /// removed. Swaps with the last element, so link order is not preserved.
    pub fn remove_link(&mut self, to: &Digest) -> bool {
        match self.links_to.iter().position(|d| d == to) {
            Some(idx) => {
                self.links_to.swap_remove(idx);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_types::HashKind;

    fn digest(data: &[u8]) -> Digest {
        Digest::compute(HashKind::Blake3, data)
    }

    fn record(data: &[u8]) -> BlobRecord {
        BlobRecord::new(digest(data), MediaType::octet_stream(), data.len() as u64)
    }

    #[test]
    fn new_record_has_one_owner_and_no_edges() {
        let rec = record(b"payload");
        assert_eq!(rec.ref_count, 1);
        assert!(rec.links_to.is_empty());
        assert_eq!(rec.size, 7);
    }

    #[test]
    fn add_and_query_links() {
        let mut rec = record(b"parent");
        let child = digest(b"child");
        assert!(!rec.has_link(&child));

        rec.add_link(child);
        assert!(rec.has_link(&child));
        assert_eq!(rec.links_to.len(), 1);
    }

    #[test]
    fn remove_link_swaps_from_the_end() {
        let mut rec = record(b"parent");
        let a = digest(b"a");
        let b = digest(b"b");
        let c = digest(b"c");
        rec.add_link(a);
        rec.add_link(b);
        rec.add_link(c);

        assert!(rec.remove_link(&a));
        assert_eq!(rec.links_to.len(), 2);
        assert!(!rec.has_link(&a));
        assert!(rec.has_link(&b));
        assert!(rec.has_link(&c));
    }

    #[test]
    fn remove_missing_link_reports_false() {
        let mut rec = record(b"parent");
        assert!(!rec.remove_link(&digest(b"never-linked")));
    }

    #[test]
    fn serde_roundtrip() {
        let mut rec = record(b"roundtrip");
        rec.add_link(digest(b"dep"));
        let json = serde_json::to_vec(&rec).unwrap();
        let parsed: BlobRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(rec, parsed);
    }
}
