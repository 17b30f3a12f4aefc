// Wed Oct 14 2026 - Alex

use ahash::AHashMap;
use parking_lot::Mutex;
use std::hash::Hash;

/// Explicit teardown for values evicted from a [`ShortLivedCache`].
pub trait Release {
    fn release(&mut self) {}
}

struct Entry<V> {
    value: V,
    ttl: u32,
}

/// Memoized map whose entries expire after `ttl` calls to [`ShortLivedCache::tick`]
/// without an intervening hit.
///
/// Ticking is driven by the caller (typically once per frame); there is no timer thread.
pub struct ShortLivedCache<K, V: Release> {
    entries: Mutex<AHashMap<K, Entry<V>>>,
    ttl: u32,
}

impl<K: Eq + Hash + Clone, V: Release + Clone> ShortLivedCache<K, V> {
    pub fn new(ttl: u32) -> Self {
        Self {
            entries: Mutex::new(AHashMap::new()),
            ttl: ttl.max(1),
        }
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;
        entry.ttl = self.ttl;
        Some(entry.value.clone())
    }

    /// Replaces any previous value, releasing it.
    pub fn insert(&self, key: K, value: V) {
        let previous = self.entries.lock().insert(key, Entry { value, ttl: self.ttl });
        if let Some(mut previous) = previous {
            previous.value.release();
        }
    }

    /// `create` runs without the lock held; when two callers race on the same key
    /// the first stored value wins and the other is released.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&self, key: &K, create: F) -> V {
        self.get_or_insert_if(key, create, || true)
    }

    /// As [`get_or_insert_with`](Self::get_or_insert_with), but the created value is only
    /// stored if `keep` still holds once the lock is taken.
    pub fn get_or_insert_if<F, P>(&self, key: &K, create: F, keep: P) -> V
    where
        F: FnOnce() -> V,
        P: FnOnce() -> bool,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        let mut created = create();
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get_mut(key) {
            existing.ttl = self.ttl;
            let value = existing.value.clone();
            drop(entries);
            created.release();
            return value;
        }
        if !keep() {
            return created;
        }

        entries.insert(
            key.clone(),
            Entry {
                value: created.clone(),
                ttl: self.ttl,
            },
        );
        created
    }

    pub fn remove(&self, key: &K) -> bool {
        let removed = self.entries.lock().remove(key);
        match removed {
            Some(mut entry) => {
                entry.value.release();
                true
            }
            None => false,
        }
    }

    /// Ages every entry by one tick and evicts the ones that expired. Returns the eviction count.
    pub fn tick(&self) -> usize {
        let expired: Vec<Entry<V>> = {
            let mut entries = self.entries.lock();
            let keys: Vec<K> = entries
                .iter_mut()
                .filter_map(|(key, entry)| {
                    entry.ttl -= 1;
                    (entry.ttl == 0).then(|| key.clone())
                })
                .collect();
            keys.iter().filter_map(|key| entries.remove(key)).collect()
        };

        let count = expired.len();
        for mut entry in expired {
            entry.value.release();
        }
        count
    }

    pub fn clear(&self) {
        let drained: Vec<Entry<V>> = self.entries.lock().drain().map(|(_, e)| e).collect();
        for mut entry in drained {
            entry.value.release();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
