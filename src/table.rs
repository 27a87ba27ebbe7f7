use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    /// Index of the next entry in the same bucket chain (0 = end).
    next: usize,
}

/// Bucketed unique table backed by a flat arena.
///
/// Entries are addressed by index; index 0 is a sentry and is never
/// handed out. Chaining goes through the entries themselves (`next`
/// links), so a lookup walks a single bucket chain.
pub struct Table<T> {
    data: Vec<Entry<T>>,
    buckets: Vec<usize>,
    bitmask: u64,
    capacity: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with capacity `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data: Vec<Entry<T>> = Vec::with_capacity(min(capacity, 1 << 16));
        // Sentry at index 0.
        data.push(Entry {
            value: T::default(),
            next: 0,
        });

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self {
            data,
            buckets,
            bitmask,
            capacity,
        }
    }
}

impl<T> Table<T> {
    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of allocated entries (excluding the sentry).
    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    fn add(&mut self, value: T) -> usize {
        let index = self.data.len();
        if index >= self.capacity {
            panic!("Unique table is full ({} entries)", self.capacity);
        }
        self.data.push(Entry { value, next: 0 });
        index
    }

    /// Allocate an entry outside any bucket chain (used for terminals).
    pub(crate) fn alloc(&mut self, value: T) -> usize {
        self.add(value)
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Find `value` in the table, or insert it. Returns its index.
    pub fn put(&mut self, value: T) -> usize {
        let bucket = self.bucket_index(&value);
        let mut index = self.buckets[bucket];

        if index == 0 {
            let i = self.add(value);
            self.buckets[bucket] = i;
            return i;
        }

        loop {
            debug_assert!(index > 0);

            if &value == self.value(index) {
                return index;
            }

            let next = self.data[index].next;
            if next == 0 {
                let i = self.add(value);
                self.data[index].next = i;
                return i;
            }
            index = next;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
