//! In-memory bucket storage on a sharded concurrent map.

use dashmap::DashMap;

use super::BucketStore;
use crate::bucket::Bucket;

/// In-memory bucket storage.
///
/// Updates hold the shard write lock of the key for their whole duration,
/// which serializes concurrent decisions on the same key.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    buckets: DashMap<String, Bucket>,
}

impl InMemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BucketStore for InMemoryStorage {
    fn update<R>(&self, key: &str, init: impl FnOnce() -> Bucket, update: impl FnOnce(&mut Bucket) -> R) -> R {
        // Avoid allocating the key on the hot path when the bucket already exists.
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return update(&mut *bucket);
        }

        let mut bucket = self.buckets.entry(key.to_owned()).or_insert_with(init);
        update(&mut *bucket)
    }

    fn get(&self, key: &str) -> Option<Bucket> {
        self.buckets.get(key).map(|bucket| *bucket)
    }

    fn retain(&self, mut keep: impl FnMut(&str, &Bucket) -> bool) -> usize {
        let mut removed = 0;

        self.buckets.retain(|key, bucket| {
            let kept = keep(key.as_str(), &*bucket);

            if !kept {
                removed += 1;
            }

            kept
        });

        removed
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}
