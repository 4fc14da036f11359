use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Exact number of satisfying assignments over variables `1..=num_vars`.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(1u32) << num_vars;
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let low = self.low(node.index());
        let high = self.high(node.index());

        let count_low = self.sat_count_(low, max, cache);
        let count_high = self.sat_count_(high, max, cache);

        // Each child count ranges over all assignments; the decision halves both.
        let count: BigUint = (count_low + count_high) >> 1;
        let count = if node.is_negated() { max - count } else { count };

        cache.insert(node, count.clone());
        count
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_sat_count_terminal() {
        let bdd = Bdd::default();

        assert_eq!(bdd.sat_count(bdd.zero(), 3), BigUint::from(0u32));
        assert_eq!(bdd.sat_count(bdd.one(), 1), BigUint::from(2u32));
        assert_eq!(bdd.sat_count(bdd.one(), 3), BigUint::from(8u32));
    }

    #[test]
    fn test_sat_count_var() {
        let bdd = Bdd::default();

        let x2 = bdd.mk_var(2);
        assert_eq!(bdd.sat_count(x2, 2), BigUint::from(2u32));
        assert_eq!(bdd.sat_count(x2, 3), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(-x2, 3), BigUint::from(4u32));
    }

    #[test]
    fn test_sat_count_cube_and_negation() {
        let bdd = Bdd::default();

        let f = bdd.mk_cube([1, 2]);
        assert_eq!(bdd.sat_count(f, 2), BigUint::from(1u32));
        assert_eq!(bdd.sat_count(f, 4), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(-f, 2), BigUint::from(3u32));
        assert_eq!(bdd.sat_count(-f, 4), BigUint::from(12u32));
    }

    #[test]
    fn test_sat_count_large_alphabet() {
        let bdd = Bdd::default();

        let f = bdd.mk_var(1);
        let expected = BigUint::from(1u32) << 99;
        assert_eq!(bdd.sat_count(f, 100), expected);
    }
}
