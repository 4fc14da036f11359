//! Symbolic sets of letters backed by one shared [`Bdd`].
//!
//! A [`ValuationSetFactory`] fixes an alphabet of `k` atomic propositions; proposition `p` is
//! decision variable `p + 1`. Every [`ValuationSet`] it produces owns one root in the shared
//! manager and gives it back when dropped, so the live-root multiset is exact at every
//! operation boundary. Garbage collection runs at those boundaries only.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use log::{debug, trace};
use num_bigint::BigUint;

use crate::bdd::{Bdd, BddConfig};
use crate::bitset::{BitSet, PowerSet};
use crate::expr::{AtomLabel, BooleanExpr};
use crate::reference::Ref;

struct Shared {
    bdd: Bdd,
    alphabet_size: usize,
    roots: RefCell<HashMap<Ref, usize>>,
    live: Cell<usize>,
}

impl Shared {
    fn retain(&self, node: Ref) {
        *self.roots.borrow_mut().entry(node).or_insert(0) += 1;
    }

    fn forget(&self, node: Ref) {
        let mut roots = self.roots.borrow_mut();
        let count = roots
            .get_mut(&node)
            .unwrap_or_else(|| panic!("Root {} is not held by any valuation set", node));
        *count -= 1;
        if *count == 0 {
            roots.remove(&node);
        }
    }

    /// Safe point: every node still needed is reachable from a live root.
    fn maybe_collect(&self) {
        if self.bdd.needs_collection() {
            self.collect();
        }
    }

    fn collect(&self) -> usize {
        let roots: Vec<Ref> = self.roots.borrow().keys().copied().collect();
        let dropped = self.bdd.collect_garbage(roots);
        debug!(
            "valuation sets: collected {} nodes, {} remain, {} live sets",
            dropped,
            self.bdd.num_nodes(),
            self.live.get()
        );
        dropped
    }

    /// Cube fixing every proposition of `alphabet` to its value in `letter`.
    fn cube(&self, letter: &BitSet, alphabet: impl Iterator<Item = usize>) -> Ref {
        let literals = alphabet.filter(|&p| p < self.alphabet_size).map(|p| {
            let v = (p + 1) as i32;
            if letter.contains(p) {
                v
            } else {
                -v
            }
        });
        self.bdd.mk_cube(literals)
    }
}

/// Handle to a shared symbolic-set engine for a fixed alphabet size.
///
/// Cloning the handle is cheap; all clones produce sets that can be freely combined.
/// The factory is confined to one thread.
#[derive(Clone)]
pub struct ValuationSetFactory {
    shared: Rc<Shared>,
}

impl ValuationSetFactory {
    /// Factory for `alphabet_size` propositions, with a manager sized for that alphabet.
    pub fn new(alphabet_size: usize) -> Self {
        Self::with_config(alphabet_size, BddConfig::for_alphabet(alphabet_size))
    }

    pub fn with_config(alphabet_size: usize, config: BddConfig) -> Self {
        debug!(
            "ValuationSetFactory::with_config(alphabet_size = {}, config = {:?})",
            alphabet_size, config
        );
        let shared = Shared {
            bdd: Bdd::new(config),
            alphabet_size,
            roots: RefCell::new(HashMap::new()),
            live: Cell::new(0),
        };
        Self {
            shared: Rc::new(shared),
        }
    }

    pub fn alphabet_size(&self) -> usize {
        self.shared.alphabet_size
    }

    /// Number of sets produced by this factory and not yet released.
    pub fn live_sets(&self) -> usize {
        self.shared.live.get()
    }

    /// Number of decision nodes currently stored by the shared manager.
    pub fn num_nodes(&self) -> usize {
        self.shared.bdd.num_nodes()
    }

    /// Drop every decision node not reachable from a live set. Returns the number dropped.
    pub fn collect_garbage(&self) -> usize {
        self.shared.collect()
    }

    pub fn same_factory(&self, other: &ValuationSetFactory) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    fn acquire(&self, node: Ref) -> ValuationSet {
        ValuationSet::acquire(&self.shared, node)
    }

    pub fn empty(&self) -> ValuationSet {
        self.acquire(Ref::ZERO)
    }

    pub fn universe(&self) -> ValuationSet {
        self.acquire(Ref::ONE)
    }

    /// The set holding exactly `letter`.
    pub fn singleton(&self, letter: &BitSet) -> ValuationSet {
        self.shared.maybe_collect();
        let node = self.shared.cube(letter, 0..self.alphabet_size());
        self.acquire(node)
    }

    /// Letters agreeing with `letter` on `alphabet`, unconstrained elsewhere.
    pub fn restricted(&self, letter: &BitSet, alphabet: &BitSet) -> ValuationSet {
        self.shared.maybe_collect();
        let node = self.shared.cube(letter, alphabet.iter());
        self.acquire(node)
    }

    /// Letters in which proposition `p` holds.
    pub fn proposition(&self, p: usize) -> ValuationSet {
        assert!(
            p < self.alphabet_size(),
            "Proposition {} is outside the alphabet of size {}",
            p,
            self.alphabet_size()
        );
        self.shared.maybe_collect();
        let node = self.shared.bdd.mk_var((p + 1) as u32);
        self.acquire(node)
    }

    /// Union of the singletons of `letters`.
    pub fn of_letters<'a>(&self, letters: impl IntoIterator<Item = &'a BitSet>) -> ValuationSet {
        self.shared.maybe_collect();
        let cubes: Vec<Ref> = letters
            .into_iter()
            .map(|letter| self.shared.cube(letter, 0..self.alphabet_size()))
            .collect();
        let node = self.shared.bdd.apply_or_many(cubes);
        self.acquire(node)
    }
}

impl PartialEq for ValuationSetFactory {
    fn eq(&self, other: &Self) -> bool {
        self.same_factory(other)
    }
}

impl Eq for ValuationSetFactory {}

impl fmt::Debug for ValuationSetFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuationSetFactory")
            .field("alphabet_size", &self.shared.alphabet_size)
            .field("live_sets", &self.shared.live.get())
            .field("bdd", &self.shared.bdd)
            .finish()
    }
}

/// A set of letters over the factory's alphabet.
///
/// Owns one root in the shared manager; dropping the set (or calling [`release`][Self::release])
/// gives it back exactly once. `Clone` is an independent copy.
pub struct ValuationSet {
    shared: Rc<Shared>,
    node: Ref,
}

impl ValuationSet {
    fn acquire(shared: &Rc<Shared>, node: Ref) -> Self {
        shared.retain(node);
        shared.live.set(shared.live.get() + 1);
        Self {
            shared: Rc::clone(shared),
            node,
        }
    }

    fn bdd(&self) -> &Bdd {
        &self.shared.bdd
    }

    fn check(&self, other: &ValuationSet) {
        assert!(
            Rc::ptr_eq(&self.shared, &other.shared),
            "Valuation sets from different factories cannot be combined"
        );
    }

    fn replace(&mut self, node: Ref) {
        if node != self.node {
            self.shared.retain(node);
            self.shared.forget(self.node);
            self.node = node;
        }
    }

    pub fn factory(&self) -> ValuationSetFactory {
        ValuationSetFactory {
            shared: Rc::clone(&self.shared),
        }
    }

    pub fn alphabet_size(&self) -> usize {
        self.shared.alphabet_size
    }

    /// Release the set. Equivalent to dropping it.
    pub fn release(self) {}

    pub fn add(&mut self, letter: &BitSet) {
        self.shared.maybe_collect();
        let cube = self.shared.cube(letter, 0..self.alphabet_size());
        let node = self.bdd().apply_or(self.node, cube);
        self.replace(node);
    }

    pub fn add_all(&mut self, other: &ValuationSet) {
        self.check(other);
        self.shared.maybe_collect();
        let node = self.bdd().apply_or(self.node, other.node);
        self.replace(node);
    }

    /// Union with `other`, which is released afterwards.
    pub fn add_all_with(&mut self, other: ValuationSet) {
        self.add_all(&other);
    }

    pub fn remove_all(&mut self, other: &ValuationSet) {
        self.check(other);
        self.shared.maybe_collect();
        let node = self.bdd().apply_diff(self.node, other.node);
        self.replace(node);
    }

    pub fn retain_all(&mut self, other: &ValuationSet) {
        self.check(other);
        self.shared.maybe_collect();
        let node = self.bdd().apply_and(self.node, other.node);
        self.replace(node);
    }

    /// The letters not in `self`, as a new set.
    pub fn complement(&self) -> ValuationSet {
        ValuationSet::acquire(&self.shared, self.shared.bdd.apply_not(self.node))
    }

    pub fn intersection(&self, other: &ValuationSet) -> ValuationSet {
        let mut result = self.clone();
        result.retain_all(other);
        result
    }

    pub fn difference(&self, other: &ValuationSet) -> ValuationSet {
        let mut result = self.clone();
        result.remove_all(other);
        result
    }

    pub fn union(&self, other: &ValuationSet) -> ValuationSet {
        let mut result = self.clone();
        result.add_all(other);
        result
    }

    pub fn intersects(&self, other: &ValuationSet) -> bool {
        self.check(other);
        self.shared.maybe_collect();
        !self.bdd().is_disjoint(self.node, other.node)
    }

    pub fn contains_all(&self, other: &ValuationSet) -> bool {
        self.check(other);
        self.shared.maybe_collect();
        self.bdd().is_implies(other.node, self.node)
    }

    pub fn contains(&self, letter: &BitSet) -> bool {
        self.bdd()
            .evaluate(self.node, |v| letter.contains(v as usize - 1))
    }

    pub fn is_empty(&self) -> bool {
        self.node == Ref::ZERO
    }

    pub fn is_universe(&self) -> bool {
        self.node == Ref::ONE
    }

    /// Exact number of letters in the set.
    pub fn size(&self) -> BigUint {
        self.bdd().sat_count(self.node, self.alphabet_size())
    }

    /// Enumerate the letters of the set, in binary-counter order over the alphabet.
    ///
    /// Walks all `2^k` letters; meant for diagnostics and small alphabets.
    pub fn iter(&self) -> Letters<'_> {
        Letters {
            set: self,
            letters: PowerSet::of_size(self.alphabet_size()),
        }
    }

    /// Label expression over proposition indices.
    pub fn to_expression(&self) -> BooleanExpr<AtomLabel> {
        self.to_expression_with(&AtomLabel::Ap)
    }

    /// Label expression, naming proposition `p` by `atom(p)`.
    pub fn to_expression_with(&self, atom: &impl Fn(usize) -> AtomLabel) -> BooleanExpr<AtomLabel> {
        let mut cache = HashMap::new();
        self.shannon(self.node, atom, &mut cache)
    }

    fn shannon(
        &self,
        node: Ref,
        atom: &impl Fn(usize) -> AtomLabel,
        cache: &mut HashMap<Ref, BooleanExpr<AtomLabel>>,
    ) -> BooleanExpr<AtomLabel> {
        let bdd = self.bdd();
        if bdd.is_one(node) {
            return BooleanExpr::True;
        }
        if bdd.is_zero(node) {
            return BooleanExpr::False;
        }
        if let Some(e) = cache.get(&node) {
            return e.clone();
        }

        let v = bdd.variable(node.index());
        let high = bdd.high_node(node);
        let low = bdd.low_node(node);
        let var = BooleanExpr::term(atom(v as usize - 1));

        let e = if bdd.is_one(high) && bdd.is_zero(low) {
            var
        } else if bdd.is_zero(high) && bdd.is_one(low) {
            BooleanExpr::not(var)
        } else {
            let hi = BooleanExpr::and(var.clone(), self.shannon(high, atom, cache));
            let lo = BooleanExpr::and(BooleanExpr::not(var), self.shannon(low, atom, cache));
            BooleanExpr::or(hi, lo)
        };
        trace!("shannon({}) = {}", node, e);
        cache.insert(node, e.clone());
        e
    }
}

impl Clone for ValuationSet {
    fn clone(&self) -> Self {
        ValuationSet::acquire(&self.shared, self.node)
    }
}

impl Drop for ValuationSet {
    fn drop(&mut self) {
        self.shared.forget(self.node);
        self.shared.live.set(self.shared.live.get() - 1);
    }
}

impl PartialEq for ValuationSet {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared) && self.node == other.node
    }
}

impl Eq for ValuationSet {}

impl Hash for ValuationSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

impl fmt::Display for ValuationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_expression())
    }
}

impl fmt::Debug for ValuationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValuationSet({})", self.to_expression())
    }
}

/// Letters of a [`ValuationSet`]; see [`ValuationSet::iter`].
pub struct Letters<'a> {
    set: &'a ValuationSet,
    letters: PowerSet,
}

impl Iterator for Letters<'_> {
    type Item = BitSet;

    fn next(&mut self) -> Option<Self::Item> {
        let set = self.set;
        self.letters.by_ref().find(|letter| set.contains(letter))
    }
}

impl<'a> IntoIterator for &'a ValuationSet {
    type Item = BitSet;
    type IntoIter = Letters<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn letter<const N: usize>(props: [usize; N]) -> BitSet {
        BitSet::from(props)
    }

    #[test]
    fn test_empty_and_universe() {
        let factory = ValuationSetFactory::new(3);
        let empty = factory.empty();
        let universe = factory.universe();

        assert!(empty.is_empty());
        assert!(universe.is_universe());
        assert_eq!(empty.size(), BigUint::from(0u32));
        assert_eq!(universe.size(), BigUint::from(8u32));
        assert_eq!(empty.complement(), universe);
        assert_eq!(factory.live_sets(), 2);
    }

    #[test]
    fn test_singleton() {
        let factory = ValuationSetFactory::new(3);
        let s = factory.singleton(&letter([0, 2]));

        assert!(s.contains(&letter([0, 2])));
        assert!(!s.contains(&letter([0])));
        assert!(!s.contains(&letter([0, 1, 2])));
        assert_eq!(s.size(), BigUint::from(1u32));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![letter([0, 2])]);
    }

    #[test]
    fn test_restricted() {
        let factory = ValuationSetFactory::new(3);
        let s = factory.restricted(&letter([1]), &letter([0, 1]));

        // !0 & 1, free on 2
        assert_eq!(s.size(), BigUint::from(2u32));
        assert!(s.contains(&letter([1])));
        assert!(s.contains(&letter([1, 2])));
        assert!(!s.contains(&letter([0, 1])));

        let free = factory.restricted(&letter([]), &BitSet::empty());
        assert!(free.is_universe());
    }

    #[test]
    fn test_algebra() {
        let factory = ValuationSetFactory::new(2);
        let a = factory.of_letters(&[letter([]), letter([0])]);
        let b = factory.of_letters(&[letter([0]), letter([1])]);

        assert!(a.intersects(&b));
        assert_eq!(a.intersection(&b), factory.singleton(&letter([0])));
        assert_eq!(a.difference(&b), factory.singleton(&letter([])));
        assert_eq!(a.union(&b).size(), BigUint::from(3u32));
        assert!(a.union(&b).contains_all(&a));
        assert!(!a.contains_all(&b));

        let mut c = a.clone();
        c.add_all_with(b.clone());
        assert_eq!(c, a.union(&b));
        c.retain_all(&b);
        assert_eq!(c, b);
        c.remove_all(&b);
        assert!(c.is_empty());
    }

    #[test]
    fn test_set_against_itself() {
        let factory = ValuationSetFactory::new(2);
        let p = factory.proposition(0);

        assert!(p.contains_all(&p.clone()));
        assert!(p.difference(&p).is_empty());
        assert_eq!(p.intersection(&p), p);

        let mut q = p.clone();
        q.remove_all(&p);
        assert!(q.is_empty());
        assert_eq!(p.size(), BigUint::from(2u32));
    }

    #[test]
    fn test_equality_is_by_content() {
        let factory = ValuationSetFactory::new(3);
        let p0 = factory.proposition(0);
        let mut built = factory.empty();
        for l in PowerSet::of_size(3) {
            if l.contains(0) {
                built.add(&l);
            }
        }
        assert_eq!(built, p0);

        use std::collections::HashSet;
        let set: HashSet<ValuationSet> = [p0.clone(), built].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_complement_round_trip() {
        let factory = ValuationSetFactory::new(3);
        for bits in 0u32..(1 << 8) {
            let letters: Vec<BitSet> = PowerSet::of_size(3)
                .enumerate()
                .filter(|(i, _)| bits & (1 << i) != 0)
                .map(|(_, l)| l)
                .collect();
            let v = factory.of_letters(&letters);
            let c = v.complement();
            assert_eq!(c.complement(), v);
            assert!(v.intersection(&c).is_empty());
            assert!(v.union(&c).is_universe());
            assert_eq!(v.iter().collect::<Vec<_>>(), letters);
        }
    }

    #[test]
    fn test_release_and_leaks() {
        let factory = ValuationSetFactory::new(2);
        {
            let a = factory.proposition(0);
            let b = factory.proposition(1);
            let mut c = a.clone();
            c.add_all_with(b);
            assert_eq!(factory.live_sets(), 2);
            a.release();
            assert_eq!(factory.live_sets(), 1);
        }
        assert_eq!(factory.live_sets(), 0);
    }

    #[test]
    fn test_garbage_collection_keeps_live_sets() {
        let config = BddConfig::with_storage_bits(10).with_gc_threshold(8);
        let factory = ValuationSetFactory::with_config(6, config);

        let keep = factory.singleton(&letter([0, 3, 5]));
        for i in 0..6 {
            let mut scratch = factory.proposition(i);
            scratch.add(&letter([1, 2]));
            assert!(scratch.contains(&letter([1, 2])));
        }
        factory.collect_garbage();

        assert_eq!(keep.size(), BigUint::from(1u32));
        assert!(keep.contains(&letter([0, 3, 5])));
        assert_eq!(keep, factory.singleton(&letter([0, 3, 5])));
    }

    #[test]
    fn test_expression() {
        let factory = ValuationSetFactory::new(2);
        assert_eq!(factory.universe().to_expression().to_string(), "t");
        assert_eq!(factory.empty().to_expression().to_string(), "f");
        assert_eq!(factory.proposition(1).to_expression().to_string(), "1");
        assert_eq!(
            factory.singleton(&letter([1])).to_expression().to_string(),
            "!0 & 1"
        );

        let named = factory
            .proposition(0)
            .to_expression_with(&|p| AtomLabel::Alias(format!("p{}", p)));
        assert_eq!(named.to_string(), "@p0");
    }

    #[test]
    fn test_large_alphabet_size() {
        let factory = ValuationSetFactory::new(100);
        let s = factory.proposition(42);
        assert_eq!(s.size(), BigUint::from(1u32) << 99);
    }

    #[test]
    #[should_panic(expected = "different factories")]
    fn test_mixing_factories_panics() {
        let f1 = ValuationSetFactory::new(2);
        let f2 = ValuationSetFactory::new(2);
        let mut a = f1.universe();
        a.add_all(&f2.universe());
    }
}
