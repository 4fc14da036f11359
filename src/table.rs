use std::cmp::min;
use std::ops::{Index, IndexMut};

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
    occupied: bool,
}

impl<T> Entry<T> {
    /// Create a new cell with the given value.
    pub fn new(value: T) -> Self {
        Self {
            value,
            next: 0,
            occupied: false,
        }
    }
}

impl<T> Default for Entry<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Hash-consing table: every distinct value is stored once, in a slot addressed by index.
///
/// Slots are chained per bucket through `next`. Slot 0 is a sentry and is never handed out.
/// The slot vector grows on demand up to `2^bits` cells.
pub struct Table<T> {
    data: Vec<Entry<T>>,
    max_capacity: usize,

    buckets: Vec<usize>,
    bitmask: u64,

    /// Index of the first *possibly* free (non-occupied) cell.
    min_free: usize,
    /// Index of the last occupied cell.
    last_index: usize,
    /// Number of occupied cells.
    real_size: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table holding at most `2^bits` cells.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let max_capacity = 1 << bits;
        let mut data: Vec<Entry<T>> = Vec::with_capacity(min(max_capacity, 1 << 10));
        data.push(Entry::default());
        data[0].occupied = true; // Set 0th cell as occupied (sentry).

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self {
            data,
            max_capacity,
            buckets,
            bitmask,
            min_free: 1,
            last_index: 0,
            real_size: 0,
        }
    }

    /// Allocate a new cell in the table and return its index.
    pub(crate) fn alloc(&mut self) -> usize {
        let index = (self.min_free..=self.last_index)
            .find(|&i| !self.data[i].occupied)
            .unwrap_or_else(|| {
                self.last_index += 1;
                self.last_index
            });

        if index >= self.max_capacity {
            panic!("Storage is full");
        }
        if index >= self.data.len() {
            self.data.push(Entry::default());
        }

        self.data[index].occupied = true;
        self.min_free = index + 1;
        self.real_size += 1;

        index
    }

    /// Add a new value to the table and return its index.
    pub fn add(&mut self, value: T) -> usize {
        let index = self.alloc();

        self.data[index].value = value;
        self.data[index].next = 0;

        index
    }
}

impl<T> Table<T> {
    /// Get the maximal number of cells.
    pub fn capacity(&self) -> usize {
        self.max_capacity
    }
    /// Get the index of the last occupied.
    pub fn size(&self) -> usize {
        self.last_index
    }
    /// Get the number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }
    /// Get the number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }
    /// Get the mutable reference to the value at the given index.
    pub fn value_mut(&mut self, index: usize) -> &mut T {
        assert_ne!(index, 0, "Index is 0");
        &mut self.data[index].value
    }

    /// Check if the cell at the given index is occupied.
    pub fn is_occupied(&self, index: usize) -> bool {
        assert_ne!(index, 0, "Index is 0");
        index < self.data.len() && self.data[index].occupied
    }
    /// Get the index of the next cell.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }
    /// Set the index of the next cell.
    pub fn set_next(&mut self, index: usize, next: usize) {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next = next;
    }

    /// Drop the value at the given index.
    pub fn drop(&mut self, index: usize) {
        assert_ne!(index, 0, "Index is 0");
        assert!(self.data[index].occupied, "Index {} is not occupied", index);

        self.data[index].occupied = false;
        self.min_free = min(self.min_free, index);
        self.real_size -= 1;
    }

    /// Drop every chained cell for which `keep` returns false, relinking the buckets.
    ///
    /// Cells allocated outside of any bucket (see [`Table::add`]) are never visited.
    /// Returns the number of dropped cells.
    pub fn retain(&mut self, mut keep: impl FnMut(usize) -> bool) -> usize {
        let mut dropped = 0;

        for bucket in 0..self.buckets.len() {
            let mut kept = Vec::new();
            let mut index = self.buckets[bucket];
            while index != 0 {
                let next = self.next(index);
                if keep(index) {
                    kept.push(index);
                } else {
                    self.drop(index);
                    dropped += 1;
                }
                index = next;
            }

            self.buckets[bucket] = kept.first().copied().unwrap_or(0);
            for pair in kept.windows(2) {
                self.set_next(pair[0], pair[1]);
            }
            if let Some(&last) = kept.last() {
                self.set_next(last, 0);
            }
        }

        dropped
    }
}

impl<T> Table<T>
where
    T: MyHash + Default,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a new value into the table and return its index.
    ///
    /// If an equal value is already stored, its index is returned instead.
    pub fn put(&mut self, value: T) -> usize
    where
        T: Eq,
    {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // Create new node and put it into the bucket.
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            assert!(index > 0);

            if &value == self.value(index) {
                // The node already exists.
                return index;
            }

            let next = self.next(index);

            if next == 0 {
                // Create new node and append it to the bucket.
                let i = self.add(value);
                self.set_next(index, i);
                return i;
            } else {
                // Go to the next node in the bucket.
                index = next;
            }
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

impl<T> IndexMut<usize> for Table<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.value_mut(index)
    }
}
