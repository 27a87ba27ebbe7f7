//! CTL model checking over a compiled transition system.
//!
//! The primitive temporal operators are EX, EG and EU; everything else
//! (EF, AX, AG, AF, AU) is a fixed macro-expansion over those three and
//! is rewritten at construction time, never evaluated independently.
//! Checking a formula yields the diagram of the set of states satisfying
//! it; the verdict for a model is whether that set intersects the initial
//! states.

use std::fmt::{Display, Formatter};

use log::debug;

use crate::reference::Ref;
use crate::relation::TransitionSystem;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CtlFormula {
    True,
    False,
    Atom(String),
    Not(Box<CtlFormula>),
    And(Vec<CtlFormula>),
    Or(Vec<CtlFormula>),
    /// Some successor satisfies the subformula.
    Ex(Box<CtlFormula>),
    /// Some path satisfies the subformula globally.
    Eg(Box<CtlFormula>),
    /// Some path satisfies the first subformula until the second holds.
    Eu(Box<CtlFormula>, Box<CtlFormula>),
}

impl CtlFormula {
    pub fn atom(name: impl Into<String>) -> Self {
        CtlFormula::Atom(name.into())
    }

    pub fn not(f: Self) -> Self {
        CtlFormula::Not(Box::new(f))
    }

    pub fn and(fs: impl IntoIterator<Item = Self>) -> Self {
        CtlFormula::And(fs.into_iter().collect())
    }

    pub fn or(fs: impl IntoIterator<Item = Self>) -> Self {
        CtlFormula::Or(fs.into_iter().collect())
    }

    pub fn imply(f: Self, g: Self) -> Self {
        CtlFormula::or([CtlFormula::not(f), g])
    }

    pub fn ex(f: Self) -> Self {
        CtlFormula::Ex(Box::new(f))
    }

    pub fn eg(f: Self) -> Self {
        CtlFormula::Eg(Box::new(f))
    }

    pub fn eu(f: Self, g: Self) -> Self {
        CtlFormula::Eu(Box::new(f), Box::new(g))
    }

    /// `EF φ ≡ E [TRUE U φ]`.
    pub fn ef(f: Self) -> Self {
        CtlFormula::eu(CtlFormula::True, f)
    }

    /// `AX φ ≡ ¬EX ¬φ`.
    pub fn ax(f: Self) -> Self {
        CtlFormula::not(CtlFormula::ex(CtlFormula::not(f)))
    }

    /// `AG φ ≡ ¬E [TRUE U ¬φ]`.
    pub fn ag(f: Self) -> Self {
        CtlFormula::not(CtlFormula::eu(CtlFormula::True, CtlFormula::not(f)))
    }

    /// `AF φ ≡ ¬EG ¬φ`.
    pub fn af(f: Self) -> Self {
        CtlFormula::not(CtlFormula::eg(CtlFormula::not(f)))
    }

    /// `A [φ U ψ] ≡ ¬E [¬ψ U (¬φ ∧ ¬ψ)] ∧ ¬EG ¬ψ`.
    pub fn au(f: Self, g: Self) -> Self {
        let nf = CtlFormula::not(f);
        let ng = CtlFormula::not(g);
        CtlFormula::and([
            CtlFormula::not(CtlFormula::eu(
                ng.clone(),
                CtlFormula::and([nf, ng.clone()]),
            )),
            CtlFormula::not(CtlFormula::eg(ng)),
        ])
    }

    /// The set of state variables mentioned in the formula.
    pub fn atoms(&self) -> std::collections::BTreeSet<String> {
        let mut out = std::collections::BTreeSet::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            CtlFormula::True | CtlFormula::False => {}
            CtlFormula::Atom(a) => {
                out.insert(a.clone());
            }
            CtlFormula::Not(f) | CtlFormula::Ex(f) | CtlFormula::Eg(f) => f.collect_atoms(out),
            CtlFormula::And(fs) | CtlFormula::Or(fs) => {
                for f in fs {
                    f.collect_atoms(out);
                }
            }
            CtlFormula::Eu(f, g) => {
                f.collect_atoms(out);
                g.collect_atoms(out);
            }
        }
    }
}

impl Display for CtlFormula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CtlFormula::True => write!(f, "TRUE"),
            CtlFormula::False => write!(f, "FALSE"),
            CtlFormula::Atom(a) => write!(f, "{}", a),
            CtlFormula::Not(g) => write!(f, "(not {})", g),
            CtlFormula::And(fs) => write_nary(f, "and", fs),
            CtlFormula::Or(fs) => write_nary(f, "or", fs),
            CtlFormula::Ex(g) => write!(f, "(EX {})", g),
            CtlFormula::Eg(g) => write!(f, "(EG {})", g),
            CtlFormula::Eu(g, h) => write!(f, "(E [ {} U {} ])", g, h),
        }
    }
}

fn write_nary(f: &mut Formatter<'_>, op: &str, fs: &[CtlFormula]) -> std::fmt::Result {
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

/// Evaluates CTL formulas to state-set diagrams over one transition
/// system.
pub struct CtlChecker<'a> {
    system: &'a TransitionSystem<'a>,
}

impl<'a> CtlChecker<'a> {
    pub fn new(system: &'a TransitionSystem<'a>) -> Self {
        Self { system }
    }

    /// The set of states satisfying `formula`.
    pub fn check(&self, formula: &CtlFormula) -> Ref {
        let bdd = self.system.bdd();
        match formula {
            CtlFormula::True => bdd.one,
            CtlFormula::False => bdd.zero,
            CtlFormula::Atom(name) => bdd.mk_var(self.system.vars().current(name)),
            CtlFormula::Not(f) => -self.check(f),
            CtlFormula::And(fs) => bdd.apply_and_many(fs.iter().map(|f| self.check(f))),
            CtlFormula::Or(fs) => bdd.apply_or_many(fs.iter().map(|f| self.check(f))),
            CtlFormula::Ex(f) => self.system.preimage(self.check(f)),
            CtlFormula::Eg(f) => self.check_eg(f),
            CtlFormula::Eu(f, g) => self.check_eu(f, g),
        }
    }

    /// Greatest fixpoint: `S[0] = SAT(φ)`, `S[i+1] = S[0] ∧ EX S[i]`.
    fn check_eg(&self, f: &CtlFormula) -> Ref {
        let bdd = self.system.bdd();
        let phi = self.check(f);

        let mut current = phi;
        let mut i = 0;
        loop {
            let next = bdd.apply_and(phi, self.system.preimage(current));
            i += 1;
            if next == current {
                debug!("EG fixpoint at iteration {} for {}", i, f);
                return next;
            }
            current = next;
        }
    }

    /// Least fixpoint: `S[0] = SAT(ψ)`, `S[i+1] = S[i] ∨ (SAT(φ) ∧ EX S[i])`.
    fn check_eu(&self, f: &CtlFormula, g: &CtlFormula) -> Ref {
        let bdd = self.system.bdd();
        let phi = self.check(f);
        let psi = self.check(g);

        let mut current = psi;
        let mut i = 0;
        loop {
            let next = bdd.apply_or(
                current,
                bdd.apply_and(phi, self.system.preimage(current)),
            );
            i += 1;
            if next == current {
                debug!("EU fixpoint at iteration {} for (E [ {} U {} ])", i, f, g);
                return next;
            }
            current = next;
        }
    }

    /// Does some state satisfying `initial` satisfy `formula`? Prints the
    /// verdict to stdout.
    pub fn holds_initially(&self, initial: Ref, formula: &CtlFormula) -> bool {
        let bdd = self.system.bdd();
        let sat = self.check(formula);
        let holds = !bdd.is_zero(bdd.apply_and(initial, sat));
        if holds {
            println!("At least one initial state satisfies {}", formula);
        } else {
            println!("No initial state satisfies {}", formula);
        }
        holds
    }
}
