//! Keyspace implementation
//!
//! Sharded `HashMap`s behind `parking_lot` locks.

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::seq::SliceRandom;

use super::Entity;

/// Number of shards per keyspace
pub const SHARD_COUNT: usize = 32;

type Shard = RwLock<HashMap<String, Entity>>;

/// Concurrent key → entity map for one logical database
///
/// Every operation takes `&self`; callers never lock externally.
pub struct Keyspace {
    shards: RwLock<Arc<Vec<Shard>>>,
}

impl Keyspace {
    /// Create a new empty keyspace
    pub fn new() -> Self {
        Self {
            shards: RwLock::new(Arc::new(new_shards())),
        }
    }

    /// Run `f` against the shard owning `key`
    ///
    /// The outer read guard is held for the duration so a concurrent `clear`
    /// cannot swap the shard set out from under a write.
    fn with_shard<T>(&self, key: &str, f: impl FnOnce(&Shard) -> T) -> T {
        let shards = self.shards.read();
        f(&shards[shard_index(key)])
    }

    /// Current shard set, detached from later clears
    fn snapshot(&self) -> Arc<Vec<Shard>> {
        Arc::clone(&self.shards.read())
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<Entity> {
        self.with_shard(key, |shard| shard.read().get(key).cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.with_shard(key, |shard| shard.read().contains_key(key))
    }

    /// Store `entity` under `key`
    ///
    /// Returns 1 if the key was newly inserted, 0 if an existing value was
    /// replaced.
    pub fn put(&self, key: impl Into<String>, entity: Entity) -> usize {
        let key = key.into();
        self.with_shard(&key, |shard| match shard.write().insert(key.clone(), entity) {
            Some(_) => 0,
            None => 1,
        })
    }

    /// Store only if `key` is absent; returns 1 if stored
    pub fn put_if_absent(&self, key: impl Into<String>, entity: Entity) -> usize {
        let key = key.into();
        self.with_shard(&key, |shard| match shard.write().entry(key.clone()) {
            Entry::Occupied(_) => 0,
            Entry::Vacant(slot) => {
                slot.insert(entity);
                1
            }
        })
    }

    /// Store only if `key` exists; returns 1 if stored
    pub fn put_if_exists(&self, key: &str, entity: Entity) -> usize {
        self.with_shard(key, |shard| match shard.write().get_mut(key) {
            Some(slot) => {
                *slot = entity;
                1
            }
            None => 0,
        })
    }

    /// Store `entity` and hand back whatever was there before
    pub fn replace(&self, key: impl Into<String>, entity: Entity) -> Option<Entity> {
        let key = key.into();
        self.with_shard(&key, |shard| shard.write().insert(key.clone(), entity))
    }

    /// Remove a key; returns 1 if it was present
    pub fn remove(&self, key: &str) -> usize {
        self.take(key).map_or(0, |_| 1)
    }

    /// Remove a key and return its entity
    pub fn take(&self, key: &str) -> Option<Entity> {
        self.with_shard(key, |shard| shard.write().remove(key))
    }

    /// Remove every listed key that is present; returns how many were removed
    pub fn remove_all<K: AsRef<str>>(&self, keys: &[K]) -> usize {
        keys.iter().map(|key| self.remove(key.as_ref())).sum()
    }

    // =========================================================================
    // Whole-Map Operations
    // =========================================================================

    /// Visit entries in unspecified order until `visitor` returns false
    ///
    /// No isolation: mutations racing with the walk may or may not be seen.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &Entity) -> bool,
    {
        let shards = self.snapshot();
        for shard in shards.iter() {
            let shard = shard.read();
            for (key, entity) in shard.iter() {
                if !visitor(key, entity) {
                    return;
                }
            }
        }
    }

    /// All keys currently present
    pub fn keys(&self) -> HashSet<String> {
        let mut keys = HashSet::with_capacity(self.len());
        self.for_each(|key, _| {
            keys.insert(key.to_string());
            true
        });
        keys
    }

    /// `limit` keys sampled with replacement (empty when the keyspace is)
    pub fn random_keys(&self, limit: usize) -> Vec<String> {
        let keys: Vec<String> = self.keys().into_iter().collect();
        if keys.is_empty() {
            return Vec::new();
        }
        let mut rng = rand::thread_rng();
        (0..limit)
            .filter_map(|_| keys.choose(&mut rng).cloned())
            .collect()
    }

    /// Up to `limit` distinct keys; `limit` is clamped to the keyspace size
    pub fn random_distinct_keys(&self, limit: usize) -> Vec<String> {
        let keys: Vec<String> = self.keys().into_iter().collect();
        let mut rng = rand::thread_rng();
        keys.choose_multiple(&mut rng, limit.min(keys.len()))
            .cloned()
            .collect()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.snapshot().iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swap in a fresh, empty shard set
    pub fn clear(&self) {
        *self.shards.write() = Arc::new(new_shards());
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

fn new_shards() -> Vec<Shard> {
    (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect()
}

fn shard_index(key: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % SHARD_COUNT
}
