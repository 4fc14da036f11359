use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// A reference to a BDD node, potentially negated.
///
/// Uses a 32-bit representation where the least significant bit indicates negation
/// and the remaining bits store the index of the node in the unique table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct Ref(u32);

impl Ref {
    /// The constant true function: the terminal node (index 1), non-negated.
    pub const ONE: Self = Self(1 << 1);
    /// The constant false function: the negated terminal node.
    pub const ZERO: Self = Self((1 << 1) | 1);

    /// Sentinel value representing an invalid/uninitialized reference.
    pub const INVALID: Self = Self(0xFFFF_FFFF);

    /// Creates a new reference to the node at `index` with the given negation flag.
    pub const fn new(index: u32, negated: bool) -> Self {
        assert!(index < 0x7FFF_FFFF, "Node index out of range");
        Self((index << 1) | (negated as u32))
    }

    /// Creates a positive (non-negated) reference.
    pub const fn positive(index: u32) -> Self {
        Self::new(index, false)
    }

    /// Creates a negative (negated) reference.
    pub const fn negative(index: u32) -> Self {
        Self::new(index, true)
    }

    /// Returns the index of the referenced node.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 >> 1) as usize
    }

    /// Returns true if this reference is negated.
    #[inline]
    pub const fn is_negated(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Returns the same reference without the negation flag.
    #[inline]
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }

    /// Returns the raw underlying value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Default for Ref {
    fn default() -> Self {
        Self::INVALID
    }
}

// -Ref
impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Self::ONE {
            write!(f, "⊤")
        } else if *self == Self::ZERO {
            write!(f, "⊥")
        } else if self.is_negated() {
            write!(f, "~@{}", self.index())
        } else {
            write!(f, "@{}", self.index())
        }
    }
}
