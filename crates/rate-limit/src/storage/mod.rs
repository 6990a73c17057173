//! Storage backends for token buckets.

pub mod memory;

pub use memory::InMemoryStorage;

use crate::bucket::Bucket;

/// Owner of the token buckets.
///
/// Implementations must give `update` exclusive access to the bucket of a key
/// for the whole call, so that refill, compare, and decrement form a single
/// step per key. Different keys need no coordination.
pub trait BucketStore: Send + Sync {
    /// Runs `update` on the bucket for `key`, creating it with `init` first if absent.
    fn update<R>(&self, key: &str, init: impl FnOnce() -> Bucket, update: impl FnOnce(&mut Bucket) -> R) -> R;

    /// Snapshot of the stored bucket for `key`.
    fn get(&self, key: &str) -> Option<Bucket>;

    /// Removes every bucket for which `keep` returns false, returning how many were removed.
    fn retain(&self, keep: impl FnMut(&str, &Bucket) -> bool) -> usize;

    /// Number of stored buckets.
    fn len(&self) -> usize;

    /// Whether no bucket is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
