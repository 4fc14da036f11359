use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::bitset::BitSet;
use crate::valuation::{ValuationSet, ValuationSetFactory};

/// A set of transitions, stored per source state as the letters it covers.
///
/// Used as the `Fin`/`Inf` component of acceptance conditions. Its acceptance number is tied
/// to the object, not to its content.
#[derive(Clone)]
pub struct TranSet<S> {
    factory: ValuationSetFactory,
    map: IndexMap<S, ValuationSet>,
}

impl<S> TranSet<S>
where
    S: Eq + Hash,
{
    pub fn new(factory: &ValuationSetFactory) -> Self {
        Self {
            factory: factory.clone(),
            map: IndexMap::new(),
        }
    }

    pub fn factory(&self) -> &ValuationSetFactory {
        &self.factory
    }

    /// Add the transitions leaving `state` on `label`, merging with those already present.
    pub fn insert(&mut self, state: S, label: ValuationSet) {
        if let Some(existing) = self.map.get_mut(&state) {
            existing.add_all_with(label);
        } else {
            self.map.insert(state, label);
        }
    }

    /// Add every transition leaving `state`.
    pub fn insert_all(&mut self, state: S) {
        let universe = self.factory.universe();
        self.insert(state, universe);
    }

    /// Letters of `state` in the set, if any were added.
    pub fn get(&self, state: &S) -> Option<&ValuationSet> {
        self.map.get(state)
    }

    pub fn contains(&self, state: &S, letter: &BitSet) -> bool {
        self.map
            .get(state)
            .is_some_and(|label| label.contains(letter))
    }

    /// Whether every transition of `label` leaving `state` is in the set.
    pub fn contains_all_at(&self, state: &S, label: &ValuationSet) -> bool {
        match self.map.get(state) {
            Some(own) => own.contains_all(label),
            None => label.is_empty(),
        }
    }

    /// Whether every transition of `other` is in the set.
    pub fn contains_all(&self, other: &TranSet<S>) -> bool {
        other
            .map
            .iter()
            .all(|(state, label)| self.contains_all_at(state, label))
    }

    pub fn is_empty(&self) -> bool {
        self.map.values().all(|label| label.is_empty())
    }

    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.map.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &ValuationSet)> {
        self.map.iter()
    }
}

impl<S: fmt::Display> fmt::Display for TranSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (state, label)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", state, label)?;
        }
        write!(f, "}}")
    }
}

impl<S: fmt::Debug> fmt::Debug for TranSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_insert_merges() {
        let factory = ValuationSetFactory::new(2);
        let mut set = TranSet::new(&factory);
        set.insert("q", factory.proposition(0));
        set.insert("q", factory.proposition(1));

        let label = set.get(&"q").unwrap();
        assert_eq!(label, &factory.proposition(0).union(&factory.proposition(1)));
        assert!(set.contains(&"q", &BitSet::from([1])));
        assert!(!set.contains(&"q", &BitSet::empty()));
        assert!(!set.contains(&"r", &BitSet::from([1])));
    }

    #[test]
    fn test_containment() {
        let factory = ValuationSetFactory::new(2);
        let mut big = TranSet::new(&factory);
        big.insert_all(1);
        big.insert(2, factory.proposition(0));

        let mut small = TranSet::new(&factory);
        small.insert(1, factory.proposition(1));
        small.insert(3, factory.empty());

        assert!(big.contains_all(&small));
        assert!(!small.contains_all(&big));
        assert!(big.contains_all(&big));

        small.insert(2, factory.proposition(1));
        assert!(!big.contains_all(&small));
    }

    #[test]
    fn test_display() {
        let factory = ValuationSetFactory::new(1);
        let mut set = TranSet::new(&factory);
        assert!(set.is_empty());
        set.insert(0, factory.proposition(0));
        assert!(!set.is_empty());
        assert_eq!(set.to_string(), "{0: 0}");
    }
}
