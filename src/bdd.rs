//! The BDD manager.
//!
//! All nodes live in a single hash-consed [`Table`], so every boolean function has exactly one
//! [`Ref`] for a fixed variable order (variable 1 on top). Negation is a flag on the reference
//! (complement edges); to keep the form canonical, the high child of a stored node is never
//! negated.
//!
//! The manager uses interior mutability: every operation takes `&self`.

use std::cell::{Cell, RefCell};
use std::cmp::min;
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;

use log::{debug, trace};

use crate::cache::Cache;
use crate::node::Node;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

type Storage = Table<Node>;

impl Storage {
    pub fn variable(&self, index: usize) -> u32 {
        self.value(index).variable
    }
    pub fn low(&self, index: usize) -> Ref {
        self.value(index).low
    }
    pub fn high(&self, index: usize) -> Ref {
        self.value(index).high
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(self.0.raw() as u64, self.1.raw() as u64, self.2.raw() as u64)
    }
}

/// Sizing and collection parameters of a [`Bdd`] manager.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BddConfig {
    /// The unique table holds at most `2^storage_bits` nodes.
    pub storage_bits: usize,
    /// The computed table has `2^cache_bits` slots.
    pub cache_bits: usize,
    /// Number of live nodes above which a collection is attempted at the next safe point.
    pub gc_threshold: usize,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self::with_storage_bits(20)
    }
}

impl BddConfig {
    /// Configuration for a unique table of `2^storage_bits` nodes, collecting at 3/4 load.
    pub fn with_storage_bits(storage_bits: usize) -> Self {
        let storage_bits = min(storage_bits, 31);
        let capacity = 1usize << storage_bits;
        Self {
            storage_bits,
            cache_bits: min(storage_bits, 16),
            gc_threshold: capacity / 4 * 3,
        }
    }

    /// Configuration sized for an alphabet of `num_vars` propositions.
    ///
    /// Reserves roughly `1024 * n^2 + 256` nodes, clamped to `2^14..=2^24`.
    pub fn for_alphabet(num_vars: usize) -> Self {
        let wanted = 1024 * num_vars * num_vars + 256;
        let bits = (usize::BITS - wanted.leading_zeros()) as usize;
        Self::with_storage_bits(bits.clamp(14, 24))
    }

    pub fn with_cache_bits(mut self, cache_bits: usize) -> Self {
        self.cache_bits = cache_bits;
        self
    }

    pub fn with_gc_threshold(mut self, gc_threshold: usize) -> Self {
        self.gc_threshold = gc_threshold;
        self
    }
}

pub struct Bdd {
    storage: RefCell<Storage>,
    cache: RefCell<Cache<IteKey, Ref>>,
    config: BddConfig,
    gc_threshold: Cell<usize>,
}

impl Bdd {
    pub fn new(config: BddConfig) -> Self {
        assert!(
            config.storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let mut storage = Storage::new(config.storage_bits);

        // Allocate the terminal node:
        let one = storage.alloc();
        assert_eq!(one, 1); // Make sure the terminal node is (1).

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(config.cache_bits)),
            config,
            gc_threshold: Cell::new(config.gc_threshold),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .field("real_size", &storage.real_size())
            .finish()
    }
}

impl Bdd {
    pub fn config(&self) -> &BddConfig {
        &self.config
    }

    pub fn cache(&self) -> std::cell::Ref<'_, Cache<IteKey, Ref>> {
        self.cache.borrow()
    }

    /// Number of nodes currently stored, terminal included.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().real_size()
    }

    pub fn one(&self) -> Ref {
        Ref::ONE
    }
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }

    pub fn variable(&self, index: usize) -> u32 {
        self.storage.borrow().variable(index)
    }
    pub fn low(&self, index: usize) -> Ref {
        self.storage.borrow().low(index)
    }
    pub fn high(&self, index: usize) -> Ref {
        self.storage.borrow().high(index)
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        self.is_zero(node) || self.is_one(node)
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        trace!("mk(v = {}, low = {}, high = {})", v, low, high);

        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    /// Conjunction of signed literals (`3` is `x3`, `-3` is `¬x3`).
    pub fn mk_cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| v.abs());
        trace!("cube(literals = {:?})", literals);
        literals.reverse();
        let mut current = Ref::ONE;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(lit.unsigned_abs(), current, Ref::ZERO)
            } else {
                self.mk_node(lit as u32, Ref::ZERO, current)
            };
        }
        current
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        let i = node.index();
        if self.is_terminal(node) || v < self.variable(i) {
            return (node, node);
        }
        assert_eq!(v, self.variable(i));
        if node.is_negated() {
            (-self.low(i), -self.high(i))
        } else {
            (self.low(i), self.high(i))
        }
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use omega_automata::bdd::Bdd;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(1);
    /// let y = bdd.mk_var(2);
    /// let z = bdd.mk_var(3);
    /// let f = bdd.apply_ite(x, y, z);
    /// let x_and_y = bdd.apply_and(x, y);
    /// let not_x_and_z = bdd.apply_and(-x, z);
    /// assert_eq!(f, bdd.apply_or(x_and_y, not_x_and_z));
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        trace!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // From now on, F is known not to be a constant
        assert!(!self.is_terminal(f));

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        //   ite(F,1,~F) => 1
        //   ite(F,F,1) => 1
        //   ite(F,~F,0) => 0
        //   ite(F,0,F) => 0
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }
        if self.is_one(g) && h == -f {
            return Ref::ONE;
        }
        if g == f && self.is_one(h) {
            return Ref::ONE;
        }
        if g == -f && self.is_zero(h) {
            return Ref::ZERO;
        }
        if self.is_zero(g) && h == f {
            return Ref::ZERO;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, Ref::ONE, h);
        }
        if h == f {
            return self.apply_ite(f, g, Ref::ZERO);
        }
        if g == -f {
            return self.apply_ite(f, Ref::ZERO, h);
        }
        if h == -f {
            return self.apply_ite(f, g, Ref::ONE);
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        assert_ne!(i, 0);

        // Equivalent pairs (choose the one with the lowest top variable):
        //   ite(F,1,H) == ite(H,1,F) == F ∨ H
        //   ite(F,G,0) == ite(G,F,0) == F ∧ G
        //   ite(F,G,1) == ite(~G,~F,1) == F -> G
        //   ite(F,0,H) == ite(~H,0,~F) == ~F ∧ H
        if self.is_one(g) && k != 0 && k < i {
            return self.apply_ite(h, Ref::ONE, f);
        }
        if self.is_zero(h) && j != 0 && j < i {
            return self.apply_ite(g, f, Ref::ZERO);
        }
        if self.is_one(h) && j != 0 && j < i {
            return self.apply_ite(-g, -f, Ref::ONE);
        }
        if self.is_zero(g) && k != 0 && k < i {
            return self.apply_ite(-h, Ref::ZERO, -f);
        }

        // Make sure the first two pointers (f and g) are regular (not negated)
        let (mut f, mut g, mut h) = (f, g, h);

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = IteKey(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            trace!("cache: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
            return if n { -res } else { res };
        }

        // Determine the top variable:
        let mut m = i;
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }
        assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        trace!("computed: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, Ref::ONE, v)
    }

    /// Set difference: `u ∧ ¬v`.
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(v, Ref::ZERO, u)
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ZERO;
        for node in nodes {
            res = self.apply_or(res, node);
        }
        res
    }

    /// Check whether `f → g` is valid, i.e. every model of `f` is a model of `g`.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_diff(f, g))
    }

    /// Check whether `f ∧ g` is unsatisfiable.
    pub fn is_disjoint(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_and(f, g))
    }

    /// Evaluate `f` under a full assignment given as a predicate over variables.
    pub fn evaluate(&self, f: Ref, assignment: impl Fn(u32) -> bool) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let v = self.variable(current.index());
            current = if assignment(v) {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }

    /// Indices of all nodes reachable from `nodes`, terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<usize> {
        let mut visited = HashSet::new();
        visited.insert(Ref::ONE.index());
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) {
                queue.push_back(self.low(i));
                queue.push_back(self.high(i));
            }
        }

        visited
    }

    /// Number of distinct nodes in `f`, terminal included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    /// Node count above which the next safe point collects.
    ///
    /// Starts at the configured threshold and grows to twice the survivors of a collection,
    /// so a large live set does not trigger a sweep on every operation.
    pub fn gc_threshold(&self) -> usize {
        self.gc_threshold.get()
    }

    /// Whether the live node count exceeds the current collection threshold.
    pub fn needs_collection(&self) -> bool {
        self.num_nodes() > self.gc_threshold.get()
    }

    /// Drop every node not reachable from `roots`. Returns the number of dropped nodes.
    ///
    /// Any [`Ref`] not reachable from `roots` is dangling afterwards.
    pub fn collect_garbage(&self, roots: impl IntoIterator<Item = Ref>) -> usize {
        self.cache.borrow_mut().clear();

        let alive = self.descendants(roots);
        let dropped = self
            .storage
            .borrow_mut()
            .retain(|index| alive.contains(&index));
        let capacity = self.storage.borrow().capacity();
        let threshold = (2 * alive.len())
            .min(capacity / 8 * 7)
            .max(self.config.gc_threshold);
        self.gc_threshold.set(threshold);
        debug!(
            "collect_garbage: {} alive, {} dropped, next at {}",
            alive.len(),
            dropped,
            threshold
        );
        dropped
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);

        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());
    }

    #[test]
    fn test_not_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let not_x = -x;

        assert_eq!(bdd.variable(not_x.index()), 1);
        assert_eq!(bdd.high_node(not_x), bdd.zero());
        assert_eq!(bdd.low_node(not_x), bdd.one());
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();

        assert!(bdd.is_terminal(bdd.zero()));
        assert!(bdd.is_zero(bdd.zero()));
        assert!(!bdd.is_one(bdd.zero()));

        assert!(bdd.is_terminal(bdd.one()));
        assert!(!bdd.is_zero(bdd.one()));
        assert!(bdd.is_one(bdd.one()));

        assert_eq!(bdd.variable(bdd.one().index()), 0);
    }

    #[test]
    fn test_cube() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(bdd.apply_and(x1, x2), x3);
        assert_eq!(f, bdd.mk_cube([1, 2, 3]));

        let f = bdd.apply_and(bdd.apply_and(x1, -x2), -x3);
        assert_eq!(f, bdd.mk_cube([1, -2, -3]));
        assert_eq!(f, bdd.mk_cube([-3, 1, -2]));
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        assert_eq!(-bdd.apply_and(x, y), bdd.apply_or(-x, -y));
        assert_eq!(-bdd.apply_or(x, y), bdd.apply_and(-x, -y));
    }

    #[test]
    fn test_diff_of_equal_functions() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_or(x, bdd.apply_and(-x, y));

        assert_eq!(bdd.apply_ite(f, bdd.zero(), f), bdd.zero());
        assert_eq!(bdd.apply_diff(f, f), bdd.zero());
        assert_eq!(bdd.apply_diff(x, x), bdd.zero());
        assert_eq!(bdd.apply_diff(-f, -f), bdd.zero());
        assert!(bdd.is_implies(f, f));
        assert!(bdd.is_implies(-y, -y));
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        // Terminal cases
        let g = bdd.mk_var(2);
        let h = bdd.mk_var(3);
        assert_eq!(bdd.apply_ite(bdd.one(), g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero(), g, h), h);

        // Functions
        let f = bdd.mk_node(1, bdd.one(), h);
        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, -g, bdd.one()), -bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, bdd.zero(), -h), -bdd.apply_or(f, h));

        // Constants
        let f = bdd.mk_var(5);
        assert_eq!(bdd.apply_ite(f, g, g), g);
        assert_eq!(bdd.apply_ite(f, bdd.one(), bdd.zero()), f);
        assert_eq!(bdd.apply_ite(f, bdd.zero(), bdd.one()), -f);

        // General case
        let f = bdd.mk_var(6);
        let g = bdd.mk_var(7);
        let h = bdd.mk_var(8);
        let result = bdd.mk_node(bdd.variable(f.index()), -g, -h);
        assert_eq!(bdd.apply_ite(-f, -g, -h), result);
    }

    #[test]
    fn test_diff_and_implication() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, x2);

        assert_eq!(bdd.apply_diff(x1, x2), bdd.apply_and(x1, -x2));
        assert!(bdd.is_implies(f, x1));
        assert!(bdd.is_implies(f, x2));
        assert!(!bdd.is_implies(f, -x1));
        assert!(bdd.is_implies(f, bdd.apply_or(x1, x2)));
        assert!(bdd.is_implies(bdd.zero(), x1));
        assert!(bdd.is_implies(x1, bdd.one()));
        assert!(!bdd.is_implies(x1, x2));

        assert!(bdd.is_disjoint(x1, -x1));
        assert!(!bdd.is_disjoint(x1, x2));
    }

    #[test]
    fn test_evaluate() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_or(bdd.apply_diff(x1, x2), bdd.apply_diff(x2, x1));

        assert!(bdd.evaluate(f, |v| v == 1));
        assert!(bdd.evaluate(f, |v| v == 2));
        assert!(!bdd.evaluate(f, |_| true));
        assert!(!bdd.evaluate(f, |_| false));
        assert!(bdd.evaluate(bdd.one(), |_| false));
        assert!(!bdd.evaluate(bdd.zero(), |_| true));
    }

    #[test]
    fn test_collect_garbage() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);
        let keep = bdd.apply_and(x1, x2);
        let _drop = bdd.apply_or(bdd.apply_and(x1, x3), x2);

        let before = bdd.num_nodes();
        let dropped = bdd.collect_garbage([keep]);
        assert!(dropped > 0);
        assert_eq!(bdd.num_nodes(), before - dropped);
        assert_eq!(bdd.num_nodes(), bdd.size(keep));

        // Rebuilding gives the same canonical reference.
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        assert_eq!(bdd.apply_and(x1, x2), keep);
    }

    #[test]
    fn test_config_for_alphabet() {
        let small = BddConfig::for_alphabet(1);
        assert_eq!(small.storage_bits, 14);
        let large = BddConfig::for_alphabet(1000);
        assert_eq!(large.storage_bits, 24);
        assert!(small.gc_threshold < 1 << small.storage_bits);
    }

    #[test]
    fn test_gc_threshold_grows_with_survivors() {
        let bdd = Bdd::new(BddConfig::with_storage_bits(10).with_gc_threshold(4));
        assert_eq!(bdd.gc_threshold(), 4);

        let keep = bdd.mk_cube([1, -2, 3, -4, 5, 6]);
        let _scratch = bdd.apply_or(bdd.mk_var(7), bdd.mk_var(8));
        assert!(bdd.needs_collection());

        bdd.collect_garbage([keep]);
        assert_eq!(bdd.num_nodes(), 7);
        assert_eq!(bdd.gc_threshold(), 14);
        assert!(!bdd.needs_collection());

        bdd.collect_garbage(Vec::<Ref>::new());
        assert_eq!(bdd.num_nodes(), 1);
        assert_eq!(bdd.gc_threshold(), 4);
    }
}
