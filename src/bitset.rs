//! Growable bit set for letters, alphabets and acceptance marks.
//!
//! A *letter* is the set of propositions that are true; an *alphabet* is a set of proposition
//! indices; acceptance marks are small integers. All three share this representation.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A simple bit set backed by a vector of u64 words.
///
/// Equality and hashing depend only on the set bits, never on the allocated capacity.
#[derive(Clone)]
pub struct BitSet {
    /// Storage: each u64 holds 64 bits
    words: Vec<u64>,
    /// Number of set bits (cached for O(1) len())
    count: usize,
}

impl BitSet {
    /// Number of bits per word.
    const BITS_PER_WORD: usize = 64;

    /// Creates a new empty bit set with the given capacity (in bits).
    pub fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
            count: 0,
        }
    }

    /// Creates an empty bit set with no pre-allocated capacity.
    pub fn empty() -> Self {
        Self {
            words: Vec::new(),
            count: 0,
        }
    }

    /// Creates the set `{0, 1, ..., n-1}`.
    pub fn full(n: usize) -> Self {
        let mut bs = Self::new(n);
        bs.extend(0..n);
        bs
    }

    /// Returns the number of set bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no bits are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Gets the word index and bit position for a given bit index.
    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        let word = index / Self::BITS_PER_WORD;
        let bit = index % Self::BITS_PER_WORD;
        (word, bit)
    }

    /// Returns true if the bit at the given index is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        if word_idx >= self.words.len() {
            return false;
        }
        let mask = 1u64 << bit_idx;
        (self.words[word_idx] & mask) != 0
    }

    /// Sets the bit at the given index. Returns true if the bit was not previously set.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);

        // Grow if necessary
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }

        let mask = 1u64 << bit_idx;
        let was_clear = (self.words[word_idx] & mask) == 0;

        if was_clear {
            self.words[word_idx] |= mask;
            self.count += 1;
        }

        was_clear
    }

    /// Clears the bit at the given index. Returns true if the bit was previously set.
    #[inline]
    pub fn remove(&mut self, index: usize) -> bool {
        let (word_idx, bit_idx) = Self::word_and_bit(index);

        if word_idx >= self.words.len() {
            return false;
        }

        let mask = 1u64 << bit_idx;
        let was_set = (self.words[word_idx] & mask) != 0;

        if was_set {
            self.words[word_idx] &= !mask;
            self.count -= 1;
        }

        was_set
    }

    /// Sets the bit at `index` to `value`.
    pub fn set(&mut self, index: usize, value: bool) {
        if value {
            self.insert(index);
        } else {
            self.remove(index);
        }
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        self.words.fill(0);
        self.count = 0;
    }

    /// Extends the bit set by setting all bits from an iterator.
    pub fn extend(&mut self, iter: impl IntoIterator<Item = usize>) {
        for index in iter {
            self.insert(index);
        }
    }

    /// Returns true if every bit of `self` is also set in `other`.
    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.words.iter().enumerate().all(|(i, &w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// Returns an iterator over all set bit indices, in increasing order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            bitset: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Words without trailing zero words.
    fn significant_words(&self) -> &[u64] {
        let end = self
            .words
            .iter()
            .rposition(|&w| w != 0)
            .map_or(0, |i| i + 1);
        &self.words[..end]
    }
}

impl Default for BitSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant_words() == other.significant_words()
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_words().hash(state);
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bs = BitSet::empty();
        bs.extend(iter);
        bs
    }
}

impl<const N: usize> From<[usize; N]> for BitSet {
    fn from(indices: [usize; N]) -> Self {
        indices.into_iter().collect()
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, index) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "}}")
    }
}

/// Iterator over set bits in a BitSet.
pub struct BitSetIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_idx = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1; // Clear lowest set bit
                return Some(self.word_idx * BitSet::BITS_PER_WORD + bit_idx);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bitset.words.len() {
                return None;
            }
            self.current_word = self.bitset.words[self.word_idx];
        }
    }
}

/// Lazy enumeration of every subset of a base set.
///
/// Subsets are produced in binary-counter order over the base indices (lowest index toggles
/// fastest), starting with the empty set; `2^n` subsets in total for a base of size `n`.
pub struct PowerSet {
    base: Vec<usize>,
    current: Option<BitSet>,
}

impl PowerSet {
    pub fn new(base: &BitSet) -> Self {
        Self {
            base: base.iter().collect(),
            current: Some(BitSet::empty()),
        }
    }

    /// Every subset of `{0, ..., n-1}`.
    pub fn of_size(n: usize) -> Self {
        Self::new(&BitSet::full(n))
    }
}

impl Iterator for PowerSet {
    type Item = BitSet;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current.take()?;

        // Binary increment over the base indices.
        let mut next = result.clone();
        let mut carry = true;
        for &index in &self.base {
            if next.contains(index) {
                next.remove(index);
            } else {
                next.insert(index);
                carry = false;
                break;
            }
        }
        if !carry {
            self.current = Some(next);
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let bs = BitSet::empty();
        assert!(bs.is_empty());
        assert_eq!(bs.len(), 0);
        assert!(!bs.contains(0));
        assert!(!bs.contains(100));
    }

    #[test]
    fn test_insert_contains() {
        let mut bs = BitSet::new(100);
        assert!(!bs.contains(42));
        assert!(bs.insert(42));
        assert!(bs.contains(42));
        assert!(!bs.insert(42)); // Already set
        assert_eq!(bs.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut bs = BitSet::new(100);
        bs.insert(42);
        assert!(bs.remove(42));
        assert!(!bs.contains(42));
        assert!(!bs.remove(42)); // Already cleared
        assert_eq!(bs.len(), 0);
    }

    #[test]
    fn test_auto_grow() {
        let mut bs = BitSet::empty();
        bs.insert(1000);
        assert!(bs.contains(1000));
        assert_eq!(bs.len(), 1);
    }

    #[test]
    fn test_iter() {
        let bs = BitSet::from([5, 10, 3, 64, 65]);
        let indices: Vec<_> = bs.iter().collect();
        assert_eq!(indices, vec![3, 5, 10, 64, 65]);
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let mut a = BitSet::new(1000);
        a.insert(3);
        let b = BitSet::from([3]);
        assert_eq!(a, b);

        let mut c = BitSet::from([3, 200]);
        c.remove(200);
        assert_eq!(a, c);

        use std::collections::hash_map::DefaultHasher;
        let hash = |bs: &BitSet| {
            let mut h = DefaultHasher::new();
            bs.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&a), hash(&c));
    }

    #[test]
    fn test_subset() {
        let a = BitSet::from([1, 2]);
        let b = BitSet::from([1, 2, 70]);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(BitSet::empty().is_subset(&a));
    }

    #[test]
    fn test_display() {
        assert_eq!(BitSet::from([2, 0]).to_string(), "{0, 2}");
        assert_eq!(BitSet::empty().to_string(), "{}");
    }

    #[test]
    fn test_power_set() {
        let base = BitSet::from([1, 4]);
        let subsets: Vec<_> = PowerSet::new(&base).collect();
        assert_eq!(
            subsets,
            vec![
                BitSet::empty(),
                BitSet::from([1]),
                BitSet::from([4]),
                BitSet::from([1, 4]),
            ]
        );

        assert_eq!(PowerSet::of_size(0).count(), 1);
        assert_eq!(PowerSet::of_size(5).count(), 32);
    }
}
