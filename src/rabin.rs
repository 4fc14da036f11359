//! Generalized Rabin acceptance over named transition sets.
//!
//! A run is accepting iff for some pair it eventually avoids `fin` forever and visits every
//! set of `infs` infinitely often.
//!
//! Acceptance-set ids belong to [`TranSet`] *objects*: a set shared (by `Rc`) between two
//! pairs gets one id, while two equal but distinct sets get two. Ids are assigned in order of
//! first reference while building [`boolean_expression`][OmegaAcceptance::boolean_expression],
//! which restarts the numbering, so they are stable for one export pass.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::acceptance::OmegaAcceptance;
use crate::bitset::BitSet;
use crate::edge::Edge;
use crate::expr::{AtomAcceptance, BooleanExpr};
use crate::transition_set::TranSet;
use crate::valuation::ValuationSet;

pub struct RabinPair<S> {
    pub fin: Rc<TranSet<S>>,
    pub infs: Vec<Rc<TranSet<S>>>,
}

impl<S> RabinPair<S> {
    pub fn new(fin: TranSet<S>, infs: Vec<TranSet<S>>) -> Self {
        Self {
            fin: Rc::new(fin),
            infs: infs.into_iter().map(Rc::new).collect(),
        }
    }

    /// A pair built from sets that may also appear in other pairs.
    pub fn shared(fin: Rc<TranSet<S>>, infs: Vec<Rc<TranSet<S>>>) -> Self {
        Self { fin, infs }
    }
}

impl<S> Clone for RabinPair<S> {
    fn clone(&self) -> Self {
        Self {
            fin: Rc::clone(&self.fin),
            infs: self.infs.iter().map(Rc::clone).collect(),
        }
    }
}

type Numbering<S> = IndexMap<*const TranSet<S>, Rc<TranSet<S>>>;

pub struct GeneralizedRabinAcceptance<S> {
    pairs: Vec<RabinPair<S>>,
    // Keyed by address; the stored `Rc` keeps the address from being reused.
    numbers: RefCell<Numbering<S>>,
}

impl<S> GeneralizedRabinAcceptance<S> {
    pub fn new(pairs: Vec<RabinPair<S>>) -> Self {
        Self {
            pairs,
            numbers: RefCell::new(IndexMap::new()),
        }
    }

    pub fn pairs(&self) -> &[RabinPair<S>] {
        &self.pairs
    }

    /// Append a pair. Equal pairs are not merged.
    pub fn add_pair(&mut self, pair: RabinPair<S>) {
        self.pairs.push(pair);
    }

    pub fn add_each(&mut self, pairs: impl IntoIterator<Item = RabinPair<S>>) {
        self.pairs.extend(pairs);
    }

    /// Remove every pair.
    pub fn remove_each(&mut self) {
        self.pairs.clear();
    }

    /// Remove the pairs at the given positions; out-of-range positions are ignored.
    pub fn remove_indices(&mut self, indices: impl IntoIterator<Item = usize>) {
        let indices: BTreeSet<usize> = indices.into_iter().collect();
        for index in indices.into_iter().rev() {
            if index < self.pairs.len() {
                self.pairs.remove(index);
            }
        }
    }

    fn tran_set_id(&self, set: &Rc<TranSet<S>>) -> usize {
        let mut numbers = self.numbers.borrow_mut();
        let entry = numbers.entry(Rc::as_ptr(set));
        let id = entry.index();
        entry.or_insert_with(|| Rc::clone(set));
        id
    }

    /// Numbered sets in id order.
    fn numbered(&self) -> Vec<Rc<TranSet<S>>> {
        self.numbers.borrow().values().cloned().collect()
    }
}

impl<S> GeneralizedRabinAcceptance<S>
where
    S: Eq + Hash,
{
    /// Whether pair `premise` implies pair `conclusion`: its `fin` covers the other's, and each
    /// `inf` of the conclusion covers some `inf` of the premise.
    pub fn implies(&self, premise: usize, conclusion: usize) -> bool {
        let premise = &self.pairs[premise];
        let conclusion = &self.pairs[conclusion];
        premise.fin.contains_all(&conclusion.fin)
            && conclusion
                .infs
                .iter()
                .all(|inf2| premise.infs.iter().any(|inf1| inf2.contains_all(inf1)))
    }

    /// Coarsest split of `label` at `state` on which every numbered set is homogeneous.
    pub fn maximally_merged_edges_of_edge(&self, state: &S, label: &ValuationSet) -> Vec<ValuationSet> {
        let mut pieces = vec![label.clone()];

        for set in self.numbered() {
            let Some(condition) = set.get(state) else {
                continue;
            };
            pieces = pieces
                .into_iter()
                .flat_map(|piece| {
                    if condition.intersects(&piece) && !condition.contains_all(&piece) {
                        vec![piece.intersection(condition), piece.difference(condition)]
                    } else {
                        vec![piece]
                    }
                })
                .collect();
        }

        pieces
    }

    /// Ids of the numbered sets containing every transition of `label` at `state`.
    pub fn involved_acceptance_numbers(&self, state: &S, label: &ValuationSet) -> BitSet {
        self.numbers
            .borrow()
            .values()
            .enumerate()
            .filter(|(_, set)| set.contains_all_at(state, label))
            .map(|(id, _)| id)
            .collect()
    }
}

impl<S> OmegaAcceptance<S> for GeneralizedRabinAcceptance<S>
where
    S: Eq + Hash,
{
    fn name(&self) -> String {
        "generalized-Rabin".to_string()
    }

    fn name_extra(&self) -> Vec<usize> {
        let mut extra = Vec::with_capacity(self.pairs.len() + 1);
        extra.push(self.pairs.len());
        extra.extend(self.pairs.iter().map(|pair| pair.infs.len()));
        extra
    }

    fn acceptance_sets(&self) -> usize {
        self.pairs.iter().map(|pair| 1 + pair.infs.len()).sum()
    }

    fn boolean_expression(&self) -> BooleanExpr<AtomAcceptance> {
        self.numbers.borrow_mut().clear();

        let expr = BooleanExpr::or_all(self.pairs.iter().map(|pair| {
            let fin = BooleanExpr::term(AtomAcceptance::Fin(self.tran_set_id(&pair.fin)));
            let infs = pair
                .infs
                .iter()
                .map(|inf| BooleanExpr::term(AtomAcceptance::Inf(self.tran_set_id(inf))));
            BooleanExpr::and_all(std::iter::once(fin).chain(infs))
        }));
        debug!(
            "generalized Rabin: {} pairs, {} distinct sets",
            self.pairs.len(),
            self.numbers.borrow().len()
        );
        expr
    }

    fn split_edge(&self, state: &S, _edge: &Edge<S>, label: &ValuationSet) -> Vec<(ValuationSet, BitSet)> {
        self.maximally_merged_edges_of_edge(state, label)
            .into_iter()
            .map(|piece| {
                let marks = self.involved_acceptance_numbers(state, &piece);
                (piece, marks)
            })
            .collect()
    }
}

impl<S: fmt::Display> fmt::Display for GeneralizedRabinAcceptance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeneralizedRabinAcceptance")?;
        for (i, pair) in self.pairs.iter().enumerate() {
            write!(f, "\nPair {}\n\tFin: {}", i, pair.fin)?;
            for (j, inf) in pair.infs.iter().enumerate() {
                write!(f, "\n\tInf {}: {}", j, inf)?;
            }
        }
        Ok(())
    }
}
