//! # omega-automata: on-the-fly omega-automata over symbolic alphabets
//!
//! **`omega-automata`** represents automata over infinite words, as produced when translating
//! temporal-logic formulas, and builds them lazily: a state's outgoing transitions are computed
//! from the state itself the first time they are needed, and memoized.
//!
//! ## Key Features
//!
//! - **Symbolic alphabets**: edge labels are [`ValuationSet`][crate::valuation::ValuationSet]s,
//!   sets of letters over `k` propositions backed by a shared BDD manager
//!   ([`Bdd`][crate::bdd::Bdd]) with complement edges. Equality is by content, and sizes are
//!   exact ([`BigUint`][num_bigint::BigUint]) even for large alphabets.
//! - **Scope-bound ownership**: every set gives its decision-diagram root back when dropped;
//!   [`ValuationSetFactory::live_sets`][crate::valuation::ValuationSetFactory::live_sets]
//!   reports leaks.
//! - **Lazy exploration**: [`Automaton`][crate::automaton::Automaton] memoizes rows, explores
//!   by worklist, answers structural queries (sink, transient, determinism, bottom SCC) and
//!   prunes states.
//! - **Generalized Rabin acceptance** with identity-numbered transition sets and maximally
//!   merged edge splitting.
//! - **HOA export** through [`HoaWriter`][crate::hoa::HoaWriter].
//!
//! ## Basic Usage
//!
//! ```rust
//! use omega_automata::acceptance::BuchiAcceptance;
//! use omega_automata::automaton::Automaton;
//! use omega_automata::bitset::BitSet;
//! use omega_automata::edge::Edge;
//! use omega_automata::state::AutomatonState;
//! use omega_automata::valuation::ValuationSetFactory;
//!
//! // "Infinitely often p0": remember whether the last letter had p0.
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! struct Seen(bool);
//!
//! impl std::fmt::Display for Seen {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{}", self.0)
//!     }
//! }
//!
//! impl AutomatonState for Seen {
//!     fn sensitive_alphabet(&self) -> Option<BitSet> {
//!         Some(BitSet::from([0]))
//!     }
//!
//!     fn successor(&self, letter: &BitSet) -> Option<Edge<Self>> {
//!         if letter.contains(0) {
//!             Some(Edge::marked(Seen(true), 0))
//!         } else {
//!             Some(Edge::of(Seen(false)))
//!         }
//!     }
//! }
//!
//! let factory = ValuationSetFactory::new(3);
//! let mut automaton = Automaton::new(&factory, BuchiAcceptance, || Some(Seen(false)));
//! automaton.generate();
//!
//! assert_eq!(automaton.size(), 2);
//! assert!(automaton.is_deterministic());
//! assert!(automaton.to_hoa(None).contains("acc-name: Buchi"));
//!
//! automaton.free();
//! assert_eq!(factory.live_sets(), 0);
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the decision-diagram manager behind every valuation set.
//! - **[`valuation`]**: valuation sets and their factory.
//! - **[`state`]**: the state capability and default successor grouping.
//! - **[`automaton`]**: the exploration engine.
//! - **[`acceptance`]**, **[`rabin`]**: acceptance conditions.
//! - **[`hoa`]**: HOA export.

pub mod acceptance;
pub mod automaton;
pub mod bdd;
pub mod bitset;
pub mod cache;
pub mod edge;
pub mod expr;
pub mod hoa;
pub mod node;
pub mod rabin;
pub mod reference;
pub mod sat;
pub mod state;
pub mod table;
pub mod transition_set;
pub mod utils;
pub mod valuation;
