use std::cell::Cell;
use std::marker::PhantomData;

use crate::utils::MyHash;

struct Entry<V> {
    key: u64,
    value: V,
}

/// Direct-mapped computed table.
///
/// A colliding insert silently evicts the previous entry; the cache only
/// ever trades recomputation for memory, never correctness.
pub struct Cache<K, V> {
    data: Vec<Option<Entry<V>>>,
    bitmask: u64,
    hits: Cell<usize>,
    misses: Cell<usize>,
    _phantom: PhantomData<K>,
}

impl<K, V> Cache<K, V> {
    /// Create a cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits should be in the range 0..=31");

        let size = 1 << bits;
        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask: (size - 1) as u64,
            hits: Cell::new(0),
            misses: Cell::new(0),
            _phantom: PhantomData,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
    }

    fn slot(&self, key: u64) -> usize {
        (key & self.bitmask) as usize
    }
}

impl<K, V> Cache<K, V>
where
    K: MyHash,
{
    pub fn get(&self, key: &K) -> Option<&V> {
        let key = key.hash();
        match &self.data[self.slot(key)] {
            Some(entry) if entry.key == key => {
                self.hits.set(self.hits.get() + 1);
                Some(&entry.value)
            }
            _ => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    pub fn insert(&mut self, key: &K, value: V) {
        let key = key.hash();
        let slot = self.slot(key);
        self.data[slot] = Some(Entry { key, value });
    }
}
