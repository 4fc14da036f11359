//! On-the-fly automaton: rows are computed from the states on first access and memoized.
//!
//! A state without a memoized row is *unexplored*. Structural queries never explore; for them,
//! an unexplored state has no outgoing edges.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use crate::bitset::BitSet;
use crate::edge::Edge;
use crate::state::{AutomatonState, Row};
use crate::valuation::ValuationSetFactory;

enum InitialState<S> {
    Pending(Box<dyn FnOnce() -> Option<S>>),
    Resolved(Option<S>),
}

pub struct Automaton<S, A> {
    factory: ValuationSetFactory,
    initial: InitialState<S>,
    transitions: IndexMap<S, Row<S>>,
    acceptance: A,
}

impl<S, A> Automaton<S, A>
where
    S: AutomatonState,
{
    /// An automaton whose initial state is built by `initial` on first request.
    pub fn new(
        factory: &ValuationSetFactory,
        acceptance: A,
        initial: impl FnOnce() -> Option<S> + 'static,
    ) -> Self {
        Self {
            factory: factory.clone(),
            initial: InitialState::Pending(Box::new(initial)),
            transitions: IndexMap::new(),
            acceptance,
        }
    }

    pub fn with_initial_state(factory: &ValuationSetFactory, acceptance: A, initial: Option<S>) -> Self {
        Self {
            factory: factory.clone(),
            initial: InitialState::Resolved(initial),
            transitions: IndexMap::new(),
            acceptance,
        }
    }

    /// The automaton without initial state, accepting nothing.
    pub fn empty(factory: &ValuationSetFactory, acceptance: A) -> Self {
        Self::with_initial_state(factory, acceptance, None)
    }

    pub fn factory(&self) -> &ValuationSetFactory {
        &self.factory
    }

    pub fn acceptance(&self) -> &A {
        &self.acceptance
    }

    pub fn acceptance_mut(&mut self) -> &mut A {
        &mut self.acceptance
    }

    /// The initial state, building it on the first call.
    pub fn initial_state(&mut self) -> Option<&S> {
        if matches!(self.initial, InitialState::Pending(_)) {
            let initial = match std::mem::replace(&mut self.initial, InitialState::Resolved(None)) {
                InitialState::Pending(make) => make(),
                InitialState::Resolved(state) => state,
            };
            debug!("initial state resolved (present: {})", initial.is_some());
            self.initial = InitialState::Resolved(initial);
        }
        self.resolved_initial_state()
    }

    /// The initial state if it has been built already.
    pub fn resolved_initial_state(&self) -> Option<&S> {
        match &self.initial {
            InitialState::Resolved(state) => state.as_ref(),
            InitialState::Pending(_) => None,
        }
    }

    /// Number of explored states.
    pub fn size(&self) -> usize {
        self.transitions.len()
    }

    /// Explored states, in discovery order.
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.transitions.keys()
    }

    pub fn is_explored(&self, state: &S) -> bool {
        self.transitions.contains_key(state)
    }

    /// The memoized row of `state`, without exploring.
    pub fn row(&self, state: &S) -> Option<&Row<S>> {
        self.transitions.get(state)
    }

    /// The row of `state`, computing and memoizing it on first access.
    pub fn successors(&mut self, state: &S) -> &Row<S> {
        if !self.transitions.contains_key(state) {
            let row = state.successors(&self.factory);
            trace!("explored a state with {} edges", row.len());
            self.transitions.insert(state.clone(), row);
        }
        &self.transitions[state]
    }

    pub fn has_successors(&mut self, state: &S) -> bool {
        !self.successors(state).is_empty()
    }

    /// The edge taken from `state` on `letter`.
    pub fn successor(&mut self, state: &S, letter: &BitSet) -> Option<&Edge<S>> {
        self.successors(state)
            .iter()
            .find(|(_, label)| label.contains(letter))
            .map(|(edge, _)| edge)
    }

    /// Every state reached from `state` on `letter`.
    pub fn successors_on(&mut self, state: &S, letter: &BitSet) -> IndexSet<S> {
        self.successors(state)
            .iter()
            .filter(|(_, label)| label.contains(letter))
            .map(|(edge, _)| edge.successor().clone())
            .collect()
    }

    /// Explore everything reachable from the initial state.
    pub fn generate(&mut self) {
        let initial = self.initial_state().cloned();
        self.generate_from(initial);
    }

    /// Explore everything reachable from `seed`.
    pub fn generate_from(&mut self, seed: Option<S>) {
        let Some(seed) = seed else {
            return;
        };
        if self.is_explored(&seed) {
            return;
        }

        let before = self.size();
        let mut work = VecDeque::from([seed]);
        while let Some(state) = work.pop_front() {
            if self.is_explored(&state) {
                continue;
            }
            let next: Vec<S> = self
                .successors(&state)
                .keys()
                .map(|edge| edge.successor().clone())
                .collect();
            work.extend(next.into_iter().filter(|s| !self.is_explored(s)));
        }
        debug!("generate: explored {} new states, {} in total", self.size() - before, self.size());
    }

    /// Closure of `seeds` under successors, exploring as needed.
    pub fn reachable_states(&mut self, seeds: impl IntoIterator<Item = S>) -> IndexSet<S> {
        let mut reached: IndexSet<S> = seeds.into_iter().collect();
        let mut work: VecDeque<S> = reached.iter().cloned().collect();

        while let Some(state) = work.pop_front() {
            let next: Vec<S> = self
                .successors(&state)
                .keys()
                .map(|edge| edge.successor().clone())
                .collect();
            for s in next {
                if reached.insert(s.clone()) {
                    work.push_back(s);
                }
            }
        }

        reached
    }

    /// Drop every state not reachable from the initial state.
    pub fn remove_unreachable_states(&mut self) {
        let seeds: Vec<S> = self.initial_state().cloned().into_iter().collect();
        self.remove_unreachable_states_from(seeds);
    }

    /// Drop every state not reachable from `seeds`, with the edges leading to them.
    pub fn remove_unreachable_states_from(&mut self, seeds: impl IntoIterator<Item = S>) {
        let reached = self.reachable_states(seeds);
        self.remove_states_if(|s| !reached.contains(s));
    }

    /// Drop `states` with the edges leading to them.
    ///
    /// If the initial state is among them, the whole automaton collapses to the empty one.
    /// Only an already resolved initial state is checked: while the constructor is pending it is
    /// not run, and a state it returns later is kept as the initial state.
    pub fn remove_states(&mut self, states: &HashSet<S>) {
        let hits_initial = self
            .resolved_initial_state()
            .is_some_and(|initial| states.contains(initial));
        if hits_initial {
            debug!("remove_states: initial state removed, dropping {} states", self.size());
            self.initial = InitialState::Resolved(None);
            self.transitions.clear();
        } else {
            self.remove_states_if(|s| states.contains(s));
        }
    }

    /// Drop every state matching `predicate`, with the edges leading to them.
    pub fn remove_states_if(&mut self, predicate: impl Fn(&S) -> bool) {
        let before = self.size();
        self.transitions.retain(|state, _| !predicate(state));
        for row in self.transitions.values_mut() {
            row.retain(|edge, _| !predicate(edge.successor()));
        }
        if self.resolved_initial_state().is_some_and(&predicate) {
            self.initial = InitialState::Resolved(None);
        }
        debug!("remove_states_if: removed {} states", before - self.size());
    }

    /// Whether every outgoing transition of `state` is a self-loop.
    pub fn is_sink(&self, state: &S) -> bool {
        self.row(state).map_or(true, |row| {
            row.iter()
                .all(|(edge, label)| edge.successor() == state || label.is_empty())
        })
    }

    /// Whether `state` has no self-loop. Not the negation of [`is_sink`][Self::is_sink].
    pub fn is_transient(&self, state: &S) -> bool {
        self.row(state).map_or(true, |row| {
            row.iter()
                .all(|(edge, label)| edge.successor() != state || label.is_empty())
        })
    }

    /// Whether the labels leaving `state` are pairwise disjoint.
    pub fn is_deterministic_at(&self, state: &S) -> bool {
        let Some(row) = self.row(state) else {
            return true;
        };
        let mut seen = self.factory.empty();
        for label in row.values() {
            if seen.intersects(label) {
                return false;
            }
            seen.add_all(label);
        }
        true
    }

    /// Whether every explored state is deterministic.
    pub fn is_deterministic(&self) -> bool {
        self.states().all(|state| self.is_deterministic_at(state))
    }

    /// Whether no edge leaves `states`.
    pub fn is_bscc(&self, states: &HashSet<S>) -> bool {
        states.iter().all(|state| {
            self.row(state).map_or(true, |row| {
                row.keys().all(|edge| states.contains(edge.successor()))
            })
        })
    }

    /// Release every label and drop the automaton. Returns the number of labels released.
    pub fn free(self) -> usize {
        let released = self.transitions.values().map(|row| row.len()).sum();
        debug!("free: releasing {} labels of {} states", released, self.size());
        released
    }
}

impl<S, A> fmt::Debug for Automaton<S, A>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let initial = match &self.initial {
            InitialState::Pending(_) => "pending".to_string(),
            InitialState::Resolved(state) => format!("{:?}", state),
        };
        f.debug_struct("Automaton")
            .field("initial", &initial)
            .field("size", &self.transitions.len())
            .field("factory", &self.factory)
            .finish()
    }
}
