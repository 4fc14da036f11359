//! The capability an automaton state type provides, and the default successor grouping.

use std::hash::Hash;

use indexmap::map::Entry;
use indexmap::IndexMap;
use log::trace;

use crate::bitset::{BitSet, PowerSet};
use crate::edge::Edge;
use crate::valuation::{ValuationSet, ValuationSetFactory};

/// Outgoing transitions of one state: each distinct edge with the letters that take it.
pub type Row<S> = IndexMap<Edge<S>, ValuationSet>;

pub trait AutomatonState: Clone + Eq + Hash {
    /// Propositions the transition function actually reads. `None` means all of them.
    fn sensitive_alphabet(&self) -> Option<BitSet> {
        None
    }

    /// The edge taken on `letter`, or `None` for the implicit rejecting sink.
    fn successor(&self, letter: &BitSet) -> Option<Edge<Self>>;

    /// All outgoing edges, grouped by edge.
    fn successors(&self, factory: &ValuationSetFactory) -> Row<Self> {
        group_successors(self, factory)
    }
}

/// Evaluate `state` once per letter over its sensitive alphabet and merge letters with equal
/// edges. Labels in the resulting row are pairwise disjoint; with a total transition function
/// they cover the whole alphabet.
pub fn group_successors<S: AutomatonState>(state: &S, factory: &ValuationSetFactory) -> Row<S> {
    let k = factory.alphabet_size();
    let sensitive: BitSet = match state.sensitive_alphabet() {
        Some(alphabet) => alphabet.iter().filter(|&p| p < k).collect(),
        None => BitSet::full(k),
    };

    let mut row = Row::new();
    for letter in PowerSet::new(&sensitive) {
        let Some(edge) = state.successor(&letter) else {
            trace!("group_successors: no edge on {}", letter);
            continue;
        };
        let label = factory.restricted(&letter, &sensitive);
        match row.entry(edge) {
            Entry::Occupied(mut e) => e.get_mut().add_all_with(label),
            Entry::Vacant(e) => {
                e.insert(label);
            }
        }
    }
    row
}
