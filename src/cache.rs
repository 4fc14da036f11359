use std::cell::Cell;

use crate::reference::Ref;
use crate::utils::{pairing2, MyHash};

struct Entry<K, V> {
    key: K,
    value: V,
}

/// Direct-mapped computed table.
///
/// A slot keeps the last key hashed to it, so a lookup either finds the exact key or misses.
pub struct Cache<K, V> {
    data: Vec<Option<Entry<K, V>>>,
    bitmask: u64,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<K, V> Cache<K, V> {
    /// Create a new table of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");

        let size = 1 << bits;
        let bitmask = (size - 1) as u64;

        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Reset the cache.
    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
    }

    fn index(&self, hash: u64) -> usize {
        (hash & self.bitmask) as usize
    }
}

impl<K, V> Cache<K, V>
where
    K: MyHash + Eq,
{
    /// Get the cached result.
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.index(key.hash());
        match &self.data[index] {
            Some(entry) if &entry.key == key => {
                self.hits.set(self.hits.get() + 1);
                Some(&entry.value)
            }
            _ => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Insert a result into the cache, evicting whatever occupied the slot.
    pub fn insert(&mut self, key: K, value: V) {
        let index = self.index(key.hash());
        self.data[index] = Some(Entry { key, value });
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        self.raw() as u64
    }
}

impl MyHash for (Ref, Ref) {
    fn hash(&self) -> u64 {
        pairing2(self.0.raw() as u64, self.1.raw() as u64)
    }
}
