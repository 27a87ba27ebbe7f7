//! Propositional formulas as immutable expression trees.
//!
//! [`Formula`] is generic over the atom type: the grounder produces
//! formulas over plain variable names, the relation translator retags
//! them with a time step, and compilation maps atoms to BDD variable
//! indices. Implication and equivalence are reduced to the primitive
//! connectives at construction time.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::bdd::Bdd;
use crate::reference::Ref;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Formula<A> {
    True,
    False,
    Atom(A),
    Not(Box<Formula<A>>),
    And(Vec<Formula<A>>),
    Or(Vec<Formula<A>>),
}

impl<A> Formula<A> {
    pub fn atom(a: A) -> Self {
        Formula::Atom(a)
    }

    pub fn not(f: Self) -> Self {
        Formula::Not(Box::new(f))
    }

    pub fn and(fs: impl IntoIterator<Item = Self>) -> Self {
        Formula::And(fs.into_iter().collect())
    }

    pub fn or(fs: impl IntoIterator<Item = Self>) -> Self {
        Formula::Or(fs.into_iter().collect())
    }

    /// `f → g`, reduced to `¬f ∨ g`.
    pub fn imply(f: Self, g: Self) -> Self {
        Formula::or([Formula::not(f), g])
    }

    /// `f ↔ g`, reduced to `(f → g) ∧ (g → f)`.
    pub fn iff(f: Self, g: Self) -> Self
    where
        A: Clone,
    {
        Formula::and([
            Formula::imply(f.clone(), g.clone()),
            Formula::imply(g, f),
        ])
    }

    /// Rebuild the tree with every atom replaced by `m(atom)`.
    pub fn map_atoms<B>(&self, m: &impl Fn(&A) -> B) -> Formula<B> {
        match self {
            Formula::True => Formula::True,
            Formula::False => Formula::False,
            Formula::Atom(a) => Formula::Atom(m(a)),
            Formula::Not(f) => Formula::Not(Box::new(f.map_atoms(m))),
            Formula::And(fs) => Formula::And(fs.iter().map(|f| f.map_atoms(m)).collect()),
            Formula::Or(fs) => Formula::Or(fs.iter().map(|f| f.map_atoms(m)).collect()),
        }
    }

    /// The set of atoms occurring in the formula.
    pub fn atoms(&self) -> BTreeSet<A>
    where
        A: Clone + Ord,
    {
        let mut out = BTreeSet::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms(&self, out: &mut BTreeSet<A>)
    where
        A: Clone + Ord,
    {
        match self {
            Formula::True | Formula::False => {}
            Formula::Atom(a) => {
                out.insert(a.clone());
            }
            Formula::Not(f) => f.collect_atoms(out),
            Formula::And(fs) | Formula::Or(fs) => {
                for f in fs {
                    f.collect_atoms(out);
                }
            }
        }
    }

    /// Compile to a diagram, mapping each atom to its BDD variable index
    /// via `var`.
    pub fn compile(&self, bdd: &Bdd, var: &impl Fn(&A) -> u32) -> Ref {
        match self {
            Formula::True => bdd.one,
            Formula::False => bdd.zero,
            Formula::Atom(a) => bdd.mk_var(var(a)),
            Formula::Not(f) => -f.compile(bdd, var),
            Formula::And(fs) => bdd.apply_and_many(fs.iter().map(|f| f.compile(bdd, var))),
            Formula::Or(fs) => bdd.apply_or_many(fs.iter().map(|f| f.compile(bdd, var))),
        }
    }
}

impl<A: Display> Display for Formula<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Formula::True => write!(f, "TRUE"),
            Formula::False => write!(f, "FALSE"),
            Formula::Atom(a) => write!(f, "{}", a),
            Formula::Not(g) => write!(f, "(not {})", g),
            Formula::And(fs) => write_nary(f, "and", fs),
            Formula::Or(fs) => write_nary(f, "or", fs),
        }
    }
}

fn write_nary<A: Display>(
    f: &mut Formatter<'_>,
    op: &str,
    fs: &[Formula<A>],
) -> std::fmt::Result {
    if let [lhs, rhs] = fs {
        write!(f, "({} {} {})", lhs, op, rhs)
    } else {
        write!(f, "({}", op)?;
        for g in fs {
            write!(f, " {}", g)?;
        }
        write!(f, ")")
    }
}
