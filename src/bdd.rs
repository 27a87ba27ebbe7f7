//! The BDD manager: hash-consed, reduced, ordered decision diagrams with
//! attributed (complement) edges.
//!
//! All operations go through a [`Bdd`] instance. Nodes are stored in a
//! unique table keyed by the `(variable, low, high)` triple, so two
//! structurally equal functions are always represented by the same
//! [`Ref`] and equality of references is equality of functions.
//!
//! Variable indices are 1-based; the index doubles as the position in
//! the (fixed) variable ordering, with smaller indices closer to the
//! root. Children of a node always carry strictly larger variable
//! indices than the node itself.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::new(0),
            high: Ref::new(0),
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.variable as u64,
            self.low.unsigned() as u64,
            self.high.unsigned() as u64,
        )
    }
}

#[derive(Debug, Eq, PartialEq)]
struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(
            self.0.unsigned() as u64,
            self.1.unsigned() as u64,
            self.2.unsigned() as u64,
        )
    }
}

/// The BDD manager.
///
/// Owns the unique table (node identity) and the computed table (operation
/// cache) for one model-checking run. Interior mutability keeps the public
/// API `&self`, since every operation may allocate nodes.
pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    /// Create a manager with a unique table of capacity `2^storage_bits`.
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let cache_bits = storage_bits.min(16);
        let mut storage = Table::new(storage_bits);

        // The terminal node occupies index 1; FALSE is its complement.
        let one = storage.alloc(Node::default());
        assert_eq!(one, 1);
        let one = Ref::positive(one as u32);
        let zero = -one;

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(cache_bits)),
            zero,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(20)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("capacity", &storage.capacity())
            .field("nodes", &storage.len())
            .finish()
    }
}

impl Bdd {
    /// Number of nodes in the unique table (excluding the terminal).
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().len() - 1
    }

    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    /// Low child with the complement attribute of `node` pushed through.
    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    /// High child with the complement attribute of `node` pushed through.
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == self.one.index()
    }

    /// The canonicalizing node constructor.
    ///
    /// Collapses equal children (reduced property), keeps the high edge
    /// regular (complement-edge canonicity), and interns the node in the
    /// unique table.
    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        debug_assert_ne!(v, 0, "Variable index should not be zero");

        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }
        if low == high {
            return low;
        }

        debug_assert!(
            self.is_terminal(low) || self.variable(low.index()) > v,
            "children must lie below their parent in the ordering"
        );
        debug_assert!(
            self.is_terminal(high) || self.variable(high.index()) > v,
            "children must lie below their parent in the ordering"
        );

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }

    /// The diagram for "variable `v` is true".
    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    /// Conjunction of literals. Negative integers denote negated variables.
    pub fn cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| v.abs());
        let mut current = self.one;
        for lit in literals.into_iter().rev() {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(-lit as u32, current, self.zero)
            } else {
                self.mk_node(lit as u32, self.zero, current)
            };
        }
        current
    }

    /// Disjunction of literals.
    pub fn clause(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        -self.cube(literals.into_iter().map(|lit| -lit))
    }

    /// Cofactors of `node` with respect to variable `v`, where `v` is no
    /// later than the node's own variable in the ordering.
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        debug_assert_ne!(v, 0);

        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        debug_assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation: `ITE(f, g, h) = (f ∧ g) ∨ (¬f ∧ h)`.
    ///
    /// Every binary connective is a special case of ITE, so this is the
    /// single recursive apply of the engine. Recursion expands on the
    /// earliest variable among the three operands and reconstructs via
    /// [`Bdd::mk_node`], which keeps results canonical.
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Terminal cases.
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples: rewrite g/h occurrences of f to constants.
        let (f, mut g, mut h) = (f, g, h);
        if g == f {
            g = self.one;
        } else if g == -f {
            g = self.zero;
        }
        if h == f {
            h = self.zero;
        } else if h == -f {
            h = self.one;
        }
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Normalize for the cache: f regular, then g regular.
        let (mut f, mut g, mut h) = (f, g, h);
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }
        let negate_result = g.is_negated();
        if negate_result {
            g = -g;
            h = -h;
        }

        let key = IteKey(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return if negate_result { -res } else { res };
        }

        // Top variable among the operands.
        let mut m = self.variable(f.index());
        if !self.is_terminal(g) {
            m = m.min(self.variable(g.index()));
        }
        if !self.is_terminal(h) {
            m = m.min(self.variable(h.index()));
        }
        debug_assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let low = self.apply_ite(f0, g0, h0);
        let high = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, low, high);

        self.cache.borrow_mut().insert(&key, res);
        if negate_result {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes {
            res = self.apply_and(res, node);
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes {
            res = self.apply_or(res, node);
        }
        res
    }

    /// `f ⊨ g`: every satisfying assignment of `f` satisfies `g`.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.apply_imply(f, g) == self.one
    }

    /// Restriction `f[v := b]`.
    pub fn substitute(&self, f: Ref, v: u32, b: bool) -> Ref {
        let mut memo = HashMap::new();
        self.substitute_rec(f, v, b, &mut memo)
    }

    fn substitute_rec(&self, f: Ref, v: u32, b: bool, memo: &mut HashMap<Ref, Ref>) -> Ref {
        debug_assert_ne!(v, 0);

        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f.index());
        if v < i {
            // `f` does not depend on `v`.
            return f;
        }
        if v == i {
            return if b { self.high_node(f) } else { self.low_node(f) };
        }

        if let Some(&res) = memo.get(&f) {
            return res;
        }

        let low = self.substitute_rec(self.low_node(f), v, b, memo);
        let high = self.substitute_rec(self.high_node(f), v, b, memo);
        let res = self.mk_node(i, low, high);
        memo.insert(f, res);
        res
    }

    /// Existential abstraction: `∃v. f = f[v := 0] ∨ f[v := 1]`,
    /// applied to each variable in the given order.
    pub fn exists(&self, f: Ref, vars: impl IntoIterator<Item = u32>) -> Ref {
        let mut res = f;
        for v in vars {
            let low = self.substitute(res, v, false);
            let high = self.substitute(res, v, true);
            res = self.apply_or(low, high);
        }
        res
    }

    /// Functional composition `f[v := g]`.
    pub fn compose(&self, f: Ref, v: u32, g: Ref) -> Ref {
        let mut memo = HashMap::new();
        self.compose_rec(f, v, g, &mut memo)
    }

    fn compose_rec(&self, f: Ref, v: u32, g: Ref, memo: &mut HashMap<(Ref, Ref), Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        let i = self.variable(f.index());
        if v < i {
            // `f` does not depend on `v`.
            return f;
        }

        let key = (f, g);
        if let Some(&res) = memo.get(&key) {
            return res;
        }

        let res = if v == i {
            let index = f.index();
            let res = self.apply_ite(g, self.high(index), self.low(index));
            if f.is_negated() {
                -res
            } else {
                res
            }
        } else {
            let m = if self.is_terminal(g) {
                i
            } else {
                i.min(self.variable(g.index()))
            };
            let (f0, f1) = self.top_cofactors(f, m);
            let (g0, g1) = self.top_cofactors(g, m);
            let low = self.compose_rec(f0, v, g0, memo);
            let high = self.compose_rec(f1, v, g1, memo);
            self.mk_node(m, low, high)
        };
        memo.insert(key, res);
        res
    }

    /// Rename variables: each `from[i]` is replaced by `to[i]`.
    ///
    /// The target variables must not occur in `f` (the current/next
    /// variable swap used by image computations satisfies this), so the
    /// sequential composition below is a simultaneous substitution.
    pub fn rename(&self, f: Ref, from: &[u32], to: &[u32]) -> Ref {
        assert_eq!(from.len(), to.len());
        let mut res = f;
        for (&v, &w) in from.iter().zip(to.iter()) {
            if v != w {
                let w_node = self.mk_var(w);
                res = self.compose(res, v, w_node);
            }
        }
        res
    }

    /// Indices of all nodes reachable from `nodes` (the terminal included).
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(self.one.index());
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

    /// Number of distinct nodes in the diagram rooted at `f`.
    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }

    /// Render `f` as a nested `node:(var, high, low)` string, for tests
    /// and debugging.
    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        }
        if self.is_one(node) {
            return "(1)".to_string();
        }

        format!(
            "{}:(x{}, {}, {})",
            node,
            self.variable(node.index()),
            self.to_bracket_string(self.high_node(node)),
            self.to_bracket_string(self.low_node(node))
        )
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
        assert_eq!(bdd.high_node(x), bdd.one);
        assert_eq!(bdd.low_node(x), bdd.zero);

        let not_x = -x;
        assert_eq!(bdd.high_node(not_x), bdd.zero);
        assert_eq!(bdd.low_node(not_x), bdd.one);
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();

        assert!(bdd.is_terminal(bdd.zero));
        assert!(bdd.is_terminal(bdd.one));
        assert!(bdd.is_zero(bdd.zero));
        assert!(bdd.is_one(bdd.one));
        assert!(!bdd.is_zero(bdd.one));
        assert_eq!(bdd.zero, -bdd.one);
    }

    #[test]
    fn test_reduced_property() {
        let bdd = Bdd::default();

        // Equal children collapse to the child.
        let x = bdd.mk_var(2);
        let n = bdd.mk_node(1, x, x);
        assert_eq!(n, x);
    }

    #[test]
    fn test_hash_consing() {
        let bdd = Bdd::default();

        let a = bdd.mk_node(1, bdd.zero, bdd.one);
        let b = bdd.mk_node(1, bdd.zero, bdd.one);
        assert_eq!(a, b);

        // Semantically equal formulas built differently share the node.
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);
        let g = -bdd.apply_or(-x, -y);
        assert_eq!(f, g);
    }

    /// Truth-table check: every binary connective against all four
    /// assignments of (x, y), for each of the five connectives.
    #[test]
    fn test_apply_truth_tables() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        let eval = |f: Ref, a: bool, b: bool| -> bool {
            let f = bdd.substitute(f, 1, a);
            let f = bdd.substitute(f, 2, b);
            assert!(bdd.is_terminal(f));
            bdd.is_one(f)
        };

        type Op = (Ref, fn(bool, bool) -> bool);
        let cases: Vec<Op> = vec![
            (bdd.apply_and(x, y), |a, b| a && b),
            (bdd.apply_or(x, y), |a, b| a || b),
            (bdd.apply_xor(x, y), |a, b| a != b),
            (bdd.apply_imply(x, y), |a, b| !a || b),
            (bdd.apply_eq(x, y), |a, b| a == b),
        ];

        for (f, op) in cases {
            for a in [false, true] {
                for b in [false, true] {
                    assert_eq!(eval(f, a, b), op(a, b));
                }
            }
        }
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
    fn test_xor_self_and_complement() {
        let bdd = Bdd::default();
        let f = bdd.apply_and(bdd.mk_var(1), bdd.mk_var(2));

        assert_eq!(bdd.apply_xor(f, f), bdd.zero);
        assert_eq!(bdd.apply_xor(f, -f), bdd.one);
    }

    #[test]
    fn test_cube() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(bdd.apply_and(x1, x2), x3);
        assert_eq!(f, bdd.cube([1, 2, 3]));

        let f = bdd.apply_and(bdd.apply_and(x1, -x2), -x3);
        assert_eq!(f, bdd.cube([1, -2, -3]));
    }

    #[test]
    fn test_clause() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        assert_eq!(bdd.clause([1, -2]), bdd.apply_or(x1, -x2));
        assert_eq!(bdd.clause([-1]), -x1);
    }

    #[test]
    fn test_ordered_invariant() {
        let bdd = Bdd::default();

        // Build something non-trivial and walk every node.
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);
        let f = bdd.apply_or(bdd.apply_and(x1, x2), bdd.apply_xor(x2, x3));

        for i in bdd.descendants([f]) {
            if i == bdd.one.index() {
                continue;
            }
            let v = bdd.variable(i);
            let low = bdd.low(i);
            let high = bdd.high(i);
            assert_ne!(low, high, "node {} is not reduced", i);
            for child in [low, high] {
                if !bdd.is_terminal(child) {
                    assert!(
                        bdd.variable(child.index()) > v,
                        "node {} violates the ordering",
                        i
                    );
                }
            }
        }
    }

    #[test]
    fn test_substitute() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // f = (x1 <-> x2) | x3; f[x2 := 0] = !x1 | x3
        let f = bdd.apply_or(bdd.apply_eq(x1, x2), x3);
        let g = bdd.substitute(f, 2, false);
        assert_eq!(g, bdd.apply_or(-x1, x3));
    }

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        // ∃x1. (x1 ∧ x2) = x2
        let f = bdd.apply_and(x1, x2);
        assert_eq!(bdd.exists(f, [1]), x2);

        // ∃x1 x2. (x1 ∧ x2) = TRUE
        assert_eq!(bdd.exists(f, [1, 2]), bdd.one);

        // ∃x2. (x1 ∧ ¬x1) = FALSE
        assert_eq!(bdd.exists(bdd.zero, [2]), bdd.zero);
    }

    #[test]
    fn test_compose() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // f = (x1 <-> x2) & x3, substitute x3 := !(x1 <-> x2) -> unsat
        let f = bdd.apply_and(bdd.apply_eq(x1, x2), x3);
        let g = -bdd.apply_eq(x1, x2);
        let h = bdd.compose(f, 3, g);
        assert!(bdd.is_zero(h));
    }

    #[test]
    fn test_rename() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x3 = bdd.mk_var(3);

        // Rename {1 -> 2, 3 -> 4} in x1 & !x3.
        let f = bdd.apply_and(x1, -x3);
        let g = bdd.rename(f, &[1, 3], &[2, 4]);
        assert_eq!(g, bdd.cube([2, -4]));
    }

    #[test]
    fn test_is_implies() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, x2);

        assert!(bdd.is_implies(f, x1));
        assert!(bdd.is_implies(f, x2));
        assert!(!bdd.is_implies(x1, f));
        assert!(bdd.is_implies(bdd.zero, f));
        assert!(bdd.is_implies(f, bdd.one));
    }

    #[test]
    fn test_size() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        // Terminal plus one decision node.
        assert_eq!(bdd.size(x1), 2);
        // x1 & x2: terminal plus two decision nodes.
        assert_eq!(bdd.size(bdd.apply_and(x1, x2)), 3);
    }
}
