//! Satisfying-assignment queries: `one_sat` and exact model counting.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// One satisfying assignment of `f`, as a list of literals (negative
    /// for a falsified variable). Variables not on the extracted path are
    /// unconstrained and do not appear. Returns `None` iff `f` is FALSE.
    pub fn one_sat(&self, f: Ref) -> Option<Vec<i32>> {
        if self.is_zero(f) {
            return None;
        }

        let mut literals = Vec::new();
        let mut node = f;
        while !self.is_terminal(node) {
            let v = self.variable(node.index()) as i32;
            let high = self.high_node(node);
            if self.is_zero(high) {
                literals.push(-v);
                node = self.low_node(node);
            } else {
                literals.push(v);
                node = high;
            }
        }
        debug_assert!(self.is_one(node));
        Some(literals)
    }

    /// Exact number of satisfying assignments of `f` over `num_vars`
    /// variables (indices `1..=num_vars`).
    ///
    /// Counts are taken over the full variable set, so skipped levels
    /// are accounted for: the count of a node is the mean of its
    /// children's counts, and the terminal contributes `2^num_vars`.
    pub fn sat_count(&self, f: Ref, num_vars: u32) -> BigUint {
        let max = BigUint::one() << num_vars;
        let mut memo = HashMap::new();
        self.sat_count_rec(f, &max, &mut memo)
    }

    fn sat_count_rec(&self, f: Ref, max: &BigUint, memo: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_one(f) {
            return max.clone();
        }
        if self.is_zero(f) {
            return BigUint::zero();
        }

        if let Some(res) = memo.get(&f) {
            return res.clone();
        }

        let low = self.sat_count_rec(self.low_node(f), max, memo);
        let high = self.sat_count_rec(self.high_node(f), max, memo);
        // Both children are independent of this node's variable, so both
        // counts are even and the halving is exact.
        let res = (low + high) >> 1u32;
        memo.insert(f, res.clone());
        res
    }
}
