//! Boolean expressions over atoms, printed in HOA syntax.
//!
//! The same tree type carries edge labels (atoms are propositions or aliases) and acceptance
//! conditions (atoms are `Fin(i)` / `Inf(i)`).

use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum BooleanExpr<T> {
    True,
    False,
    Term(T),
    Not(Box<BooleanExpr<T>>),
    And(Box<BooleanExpr<T>>, Box<BooleanExpr<T>>),
    Or(Box<BooleanExpr<T>>, Box<BooleanExpr<T>>),
}

impl<T> BooleanExpr<T> {
    pub fn term(value: T) -> Self {
        BooleanExpr::Term(value)
    }

    pub fn constant(value: bool) -> Self {
        if value {
            BooleanExpr::True
        } else {
            BooleanExpr::False
        }
    }

    pub fn not(value: Self) -> Self {
        match value {
            BooleanExpr::True => BooleanExpr::False,
            BooleanExpr::False => BooleanExpr::True,
            BooleanExpr::Not(inner) => *inner,
            _ => BooleanExpr::Not(Box::new(value)),
        }
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        match (lhs, rhs) {
            (BooleanExpr::False, _) | (_, BooleanExpr::False) => BooleanExpr::False,
            (BooleanExpr::True, e) | (e, BooleanExpr::True) => e,
            (lhs, rhs) => BooleanExpr::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        match (lhs, rhs) {
            (BooleanExpr::True, _) | (_, BooleanExpr::True) => BooleanExpr::True,
            (BooleanExpr::False, e) | (e, BooleanExpr::False) => e,
            (lhs, rhs) => BooleanExpr::Or(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Left-folded conjunction; `True` for an empty iterator.
    pub fn and_all(exprs: impl IntoIterator<Item = Self>) -> Self {
        exprs.into_iter().fold(BooleanExpr::True, BooleanExpr::and)
    }

    /// Left-folded disjunction; `False` for an empty iterator.
    pub fn or_all(exprs: impl IntoIterator<Item = Self>) -> Self {
        exprs.into_iter().fold(BooleanExpr::False, BooleanExpr::or)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, BooleanExpr::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, BooleanExpr::False)
    }

    pub fn evaluate(&self, valuation: &impl Fn(&T) -> bool) -> bool {
        match self {
            BooleanExpr::True => true,
            BooleanExpr::False => false,
            BooleanExpr::Term(t) => valuation(t),
            BooleanExpr::Not(a) => !a.evaluate(valuation),
            BooleanExpr::And(a, b) => a.evaluate(valuation) && b.evaluate(valuation),
            BooleanExpr::Or(a, b) => a.evaluate(valuation) || b.evaluate(valuation),
        }
    }

    /// Every atom, left to right.
    pub fn atoms(&self) -> Vec<&T> {
        let mut result = Vec::new();
        self.collect_atoms(&mut result);
        result
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            BooleanExpr::True | BooleanExpr::False => {}
            BooleanExpr::Term(t) => out.push(t),
            BooleanExpr::Not(a) => a.collect_atoms(out),
            BooleanExpr::And(a, b) | BooleanExpr::Or(a, b) => {
                a.collect_atoms(out);
                b.collect_atoms(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BooleanExpr::Or(..) => 1,
            BooleanExpr::And(..) => 2,
            _ => 3,
        }
    }
}

impl<T: fmt::Display> BooleanExpr<T> {
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl<T: fmt::Display> fmt::Display for BooleanExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanExpr::True => write!(f, "t"),
            BooleanExpr::False => write!(f, "f"),
            BooleanExpr::Term(t) => write!(f, "{}", t),
            BooleanExpr::Not(a) => {
                write!(f, "!")?;
                a.fmt_operand(f, 3)
            }
            BooleanExpr::And(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, " & ")?;
                b.fmt_operand(f, 2)
            }
            BooleanExpr::Or(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " | ")?;
                b.fmt_operand(f, 1)
            }
        }
    }
}

/// Atom of an edge label: a proposition index, or an alias name (printed as `@name`).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum AtomLabel {
    Ap(usize),
    Alias(String),
}

impl fmt::Display for AtomLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomLabel::Ap(index) => write!(f, "{}", index),
            AtomLabel::Alias(name) => write!(f, "@{}", name),
        }
    }
}

/// Atom of an acceptance condition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AtomAcceptance {
    Fin(usize),
    Inf(usize),
}

impl AtomAcceptance {
    pub fn set(&self) -> usize {
        match *self {
            AtomAcceptance::Fin(i) | AtomAcceptance::Inf(i) => i,
        }
    }
}

impl fmt::Display for AtomAcceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomAcceptance::Fin(i) => write!(f, "Fin({})", i),
            AtomAcceptance::Inf(i) => write!(f, "Inf({})", i),
        }
    }
}
