//! Acceptance conditions as seen by the exporter.

use crate::bitset::BitSet;
use crate::edge::Edge;
use crate::expr::{AtomAcceptance, BooleanExpr};
use crate::valuation::ValuationSet;

pub trait OmegaAcceptance<S> {
    /// Symbolic name (`acc-name:`), e.g. `Buchi` or `generalized-Rabin`.
    fn name(&self) -> String;

    /// Parameters following the name.
    fn name_extra(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Number of acceptance sets declared.
    fn acceptance_sets(&self) -> usize;

    /// The condition over acceptance-set ids.
    fn boolean_expression(&self) -> BooleanExpr<AtomAcceptance>;

    /// Extra `key: values...` header entries for information the format has no slot for.
    fn misc_annotations(&self) -> Vec<(String, Vec<String>)> {
        Vec::new()
    }

    /// Pieces of `label` to emit for `edge` leaving `state`, each with its acceptance marks.
    ///
    /// Must be called after [`boolean_expression`][Self::boolean_expression] in the same
    /// emission pass, since set ids may be assigned there.
    fn split_edge(&self, _state: &S, edge: &Edge<S>, label: &ValuationSet) -> Vec<(ValuationSet, BitSet)> {
        vec![(label.clone(), edge.acceptance().clone())]
    }
}

/// Every run is accepting.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct AllAcceptance;

impl<S> OmegaAcceptance<S> for AllAcceptance {
    fn name(&self) -> String {
        "all".to_string()
    }

    fn acceptance_sets(&self) -> usize {
        0
    }

    fn boolean_expression(&self) -> BooleanExpr<AtomAcceptance> {
        BooleanExpr::True
    }
}

/// No run is accepting.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct NoneAcceptance;

impl<S> OmegaAcceptance<S> for NoneAcceptance {
    fn name(&self) -> String {
        "none".to_string()
    }

    fn acceptance_sets(&self) -> usize {
        0
    }

    fn boolean_expression(&self) -> BooleanExpr<AtomAcceptance> {
        BooleanExpr::False
    }
}

/// A run is accepting iff it visits edges marked `0` infinitely often.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct BuchiAcceptance;

impl<S> OmegaAcceptance<S> for BuchiAcceptance {
    fn name(&self) -> String {
        "Buchi".to_string()
    }

    fn acceptance_sets(&self) -> usize {
        1
    }

    fn boolean_expression(&self) -> BooleanExpr<AtomAcceptance> {
        BooleanExpr::term(AtomAcceptance::Inf(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::ValuationSetFactory;

    #[test]
    fn test_trivial_conditions() {
        assert_eq!(OmegaAcceptance::<u8>::boolean_expression(&AllAcceptance).to_string(), "t");
        assert_eq!(OmegaAcceptance::<u8>::boolean_expression(&NoneAcceptance).to_string(), "f");
        assert_eq!(OmegaAcceptance::<u8>::acceptance_sets(&NoneAcceptance), 0);
        assert_eq!(OmegaAcceptance::<u8>::name(&AllAcceptance), "all");
    }

    #[test]
    fn test_buchi() {
        let acc = BuchiAcceptance;
        assert_eq!(OmegaAcceptance::<u8>::name(&acc), "Buchi");
        assert_eq!(OmegaAcceptance::<u8>::acceptance_sets(&acc), 1);
        assert_eq!(OmegaAcceptance::<u8>::boolean_expression(&acc).to_string(), "Inf(0)");
        assert!(OmegaAcceptance::<u8>::name_extra(&acc).is_empty());
    }

    #[test]
    fn test_default_split_keeps_edge_marks() {
        let factory = ValuationSetFactory::new(2);
        let label = factory.proposition(0);
        let edge = Edge::marked(1u8, 0);

        let pieces = BuchiAcceptance.split_edge(&0u8, &edge, &label);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].0, label);
        assert_eq!(pieces[0].1, BitSet::from([0]));
    }
}
