use crate::reference::Ref;
use crate::utils::{pairing3, MyHash};

/// A decision node: `variable ? high : low`.
///
/// The terminal node has variable 0. The high child of a stored node is never negated.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Node {
    pub variable: u32,
    pub low: Ref,
    pub high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::INVALID,
            high: Ref::INVALID,
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.variable as u64,
            self.low.raw() as u64,
            self.high.raw() as u64,
        )
    }
}
