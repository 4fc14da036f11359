use std::fmt;

use crate::bitset::BitSet;

/// One class of outgoing transitions: a successor state and the acceptance marks it carries.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Edge<S> {
    successor: S,
    acceptance: BitSet,
}

impl<S> Edge<S> {
    pub fn new(successor: S, acceptance: BitSet) -> Self {
        Self {
            successor,
            acceptance,
        }
    }

    /// An edge without acceptance marks.
    pub fn of(successor: S) -> Self {
        Self::new(successor, BitSet::empty())
    }

    /// An edge carrying the single mark `set`.
    pub fn marked(successor: S, set: usize) -> Self {
        Self::new(successor, BitSet::from([set]))
    }

    pub fn successor(&self) -> &S {
        &self.successor
    }

    pub fn acceptance(&self) -> &BitSet {
        &self.acceptance
    }

    pub fn in_set(&self, set: usize) -> bool {
        self.acceptance.contains(set)
    }

    pub fn into_successor(self) -> S {
        self.successor
    }

    /// The same marks, leading to `successor`.
    pub fn with_successor<T>(&self, successor: T) -> Edge<T> {
        Edge::new(successor, self.acceptance.clone())
    }
}

impl<S: fmt::Display> fmt::Display for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.acceptance.is_empty() {
            write!(f, "{}", self.successor)
        } else {
            write!(f, "{} {}", self.successor, self.acceptance)
        }
    }
}
