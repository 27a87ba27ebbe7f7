//! Translation of ground transitions into a transition-relation formula
//! over current/next copies of the state variables.
//!
//! For each transition and each state variable `x` the change axiom is
//! `next(x) ⟺ (makesTrue(x)@now ∨ (x@now ∧ ¬makesFalse(x)@now))`, with
//! `makesTrue`/`makesFalse` taken from the effect preconditions
//! ([`GroundEffect::epc`]). A variable no active effect assigns keeps its
//! value, which is the frame-axiom construction. The whole-model relation
//! is the disjunction over all ground transitions: exactly one fires per
//! step, nondeterministically among the enabled ones.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use log::debug;

use crate::bdd::Bdd;
use crate::formula::Formula;
use crate::ground::{GroundEffect, GroundTransition};
use crate::reference::Ref;

/// Which copy of a state variable a timed atom refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Step {
    Now,
    Next,
}

/// A state variable tagged with a time step.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timed {
    pub name: String,
    pub step: Step,
}

impl Timed {
    pub fn now(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step: Step::Now,
        }
    }

    pub fn next(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step: Step::Next,
        }
    }
}

impl Display for Timed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let t = match self.step {
            Step::Now => 0,
            Step::Next => 1,
        };
        write!(f, "{}@{}", self.name, t)
    }
}

/// The state-variable universe with its BDD variable numbering.
///
/// Each state variable gets an interleaved (current, next) index pair:
/// current at `2i + 1`, next at `2i + 2`. Interleaving keeps each
/// variable adjacent to its next-state copy, which is what keeps the
/// transition-relation diagrams small; putting all current variables
/// before all next variables risks exponential blow-up.
#[derive(Debug)]
pub struct StateVars {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl StateVars {
    /// Build the numbering from the (sorted, deduplicated) universe.
    pub fn new(universe: BTreeSet<String>) -> Self {
        let names: Vec<String> = universe.into_iter().collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Collect the universe of a grounded model: every variable in the
    /// transitions plus those of the given formulas.
    pub fn of_model<'a>(
        transitions: &[GroundTransition],
        formulas: impl IntoIterator<Item = &'a Formula<String>>,
    ) -> Self {
        let mut universe = BTreeSet::new();
        for t in transitions {
            universe.extend(t.state_vars());
        }
        for f in formulas {
            universe.extend(f.atoms());
        }
        Self::new(universe)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn position(&self, name: &str) -> usize {
        match self.index.get(name) {
            Some(&i) => i,
            None => panic!("unknown state variable '{}'", name),
        }
    }

    /// BDD variable index for `name` in the current state.
    pub fn current(&self, name: &str) -> u32 {
        2 * self.position(name) as u32 + 1
    }

    /// BDD variable index for `name` in the next state.
    pub fn next(&self, name: &str) -> u32 {
        2 * self.position(name) as u32 + 2
    }

    pub fn current_vars(&self) -> Vec<u32> {
        (0..self.len() as u32).map(|i| 2 * i + 1).collect()
    }

    pub fn next_vars(&self) -> Vec<u32> {
        (0..self.len() as u32).map(|i| 2 * i + 2).collect()
    }

    /// Total number of BDD variables (current and next copies).
    pub fn num_bdd_vars(&self) -> u32 {
        2 * self.len() as u32
    }

    pub fn timed(&self, atom: &Timed) -> u32 {
        match atom.step {
            Step::Now => self.current(&atom.name),
            Step::Next => self.next(&atom.name),
        }
    }

    /// Compile a formula over untimed atoms, read at the current step.
    pub fn compile_now(&self, f: &Formula<String>, bdd: &Bdd) -> Ref {
        f.compile(bdd, &|name| self.current(name))
    }

    /// Compile a formula over timed atoms.
    pub fn compile_timed(&self, f: &Formula<Timed>, bdd: &Bdd) -> Ref {
        f.compile(bdd, &|atom| self.timed(atom))
    }
}

fn at_now(name: &str) -> Formula<Timed> {
    Formula::atom(Timed::now(name))
}

fn tag_now(f: &Formula<String>) -> Formula<Timed> {
    f.map_atoms(&|name| Timed::now(name.clone()))
}

/// The change axiom for one state variable under one effect.
fn change_axiom(x: &str, effect: &GroundEffect) -> Formula<Timed> {
    let makes_true = tag_now(&effect.epc(x, true));
    let makes_false = tag_now(&effect.epc(x, false));
    Formula::iff(
        Formula::atom(Timed::next(x)),
        Formula::or([
            makes_true,
            Formula::and([at_now(x), Formula::not(makes_false)]),
        ]),
    )
}

/// The formula for one ground transition: its guard read at the current
/// step, conjoined with a change axiom for every state variable.
pub fn transition_to_logic(t: &GroundTransition, vars: &StateVars) -> Formula<Timed> {
    let mut conjuncts = vec![tag_now(&t.guard)];
    for x in vars.names() {
        conjuncts.push(change_axiom(x, &t.effect));
    }
    Formula::And(conjuncts)
}

/// The whole-model transition relation: the disjunction over all ground
/// transitions.
pub fn model_to_logic(transitions: &[GroundTransition], vars: &StateVars) -> Formula<Timed> {
    Formula::Or(
        transitions
            .iter()
            .map(|t| transition_to_logic(t, vars))
            .collect(),
    )
}

/// A grounded model compiled to diagrams: the global transition relation
/// plus the per-transition relations (kept, with their names, for witness
/// extraction in grounding order).
pub struct TransitionSystem<'a> {
    bdd: &'a Bdd,
    vars: &'a StateVars,
    relation: Ref,
    transitions: Vec<(String, Ref)>,
}

impl<'a> TransitionSystem<'a> {
    pub fn compile(bdd: &'a Bdd, vars: &'a StateVars, ground: &[GroundTransition]) -> Self {
        let transitions: Vec<(String, Ref)> = ground
            .iter()
            .map(|t| {
                let f = transition_to_logic(t, vars);
                (t.name.clone(), vars.compile_timed(&f, bdd))
            })
            .collect();
        let relation = bdd.apply_or_many(transitions.iter().map(|(_, r)| *r));
        debug!(
            "transition relation compiled: {} transitions, size {}",
            transitions.len(),
            bdd.size(relation)
        );
        Self {
            bdd,
            vars,
            relation,
            transitions,
        }
    }

    pub fn bdd(&self) -> &'a Bdd {
        self.bdd
    }

    pub fn vars(&self) -> &'a StateVars {
        self.vars
    }

    pub fn relation(&self) -> Ref {
        self.relation
    }

    /// Per-transition relation diagrams, in grounding order.
    pub fn transitions(&self) -> &[(String, Ref)] {
        &self.transitions
    }

    /// States reachable from `states` in exactly one step:
    /// `∃current. (T ∧ states)`, renamed back onto the current variables.
    pub fn image(&self, states: Ref) -> Ref {
        let step = self.bdd.apply_and(self.relation, states);
        let step = self.bdd.exists(step, self.vars.current_vars());
        self.bdd
            .rename(step, &self.vars.next_vars(), &self.vars.current_vars())
    }

    /// States with at least one successor in `states`:
    /// `∃next. (T ∧ rename(states, current → next))`.
    pub fn preimage(&self, states: Ref) -> Ref {
        let primed = self
            .bdd
            .rename(states, &self.vars.current_vars(), &self.vars.next_vars());
        let step = self.bdd.apply_and(self.relation, primed);
        self.bdd.exists(step, self.vars.next_vars())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::formula::Formula;
    use crate::ground::GroundEffect;

    fn universe(names: &[&str]) -> StateVars {
        StateVars::new(names.iter().map(|s| s.to_string()).collect())
    }

    fn set_true(x: &str) -> GroundEffect {
        GroundEffect::SetTrue(x.to_string())
    }

    #[test]
    fn test_interleaved_numbering() {
        let vars = universe(&["a", "b"]);

        assert_eq!(vars.current("a"), 1);
        assert_eq!(vars.next("a"), 2);
        assert_eq!(vars.current("b"), 3);
        assert_eq!(vars.next("b"), 4);
        assert_eq!(vars.current_vars(), vec![1, 3]);
        assert_eq!(vars.next_vars(), vec![2, 4]);
        assert_eq!(vars.num_bdd_vars(), 4);
    }

    #[test]
    fn test_change_axiom_assignment() {
        // Effect a := 1, universe {a}: the relation forces next(a).
        let bdd = Bdd::default();
        let vars = universe(&["a"]);

        let t = GroundTransition {
            name: "set".to_string(),
            guard: Formula::True,
            effect: set_true("a"),
        };
        let rel = vars.compile_timed(&transition_to_logic(&t, &vars), &bdd);
        assert_eq!(rel, bdd.mk_var(vars.next("a")));
    }

    #[test]
    fn test_change_axiom_frame() {
        // Effect touches only a; b must keep its value.
        let bdd = Bdd::default();
        let vars = universe(&["a", "b"]);

        let t = GroundTransition {
            name: "set".to_string(),
            guard: Formula::True,
            effect: set_true("a"),
        };
        let rel = vars.compile_timed(&transition_to_logic(&t, &vars), &bdd);

        let expected = bdd.apply_and(
            bdd.mk_var(vars.next("a")),
            bdd.apply_eq(bdd.mk_var(vars.current("b")), bdd.mk_var(vars.next("b"))),
        );
        assert_eq!(rel, expected);
    }

    #[test]
    fn test_guarded_effect() {
        // when(c) a := 1 over universe {a, c}: a becomes true iff c held,
        // otherwise keeps its value; c itself is framed.
        let bdd = Bdd::default();
        let vars = universe(&["a", "c"]);

        let t = GroundTransition {
            name: "maybe".to_string(),
            guard: Formula::True,
            effect: GroundEffect::When(
                Formula::atom("c".to_string()),
                Box::new(set_true("a")),
            ),
        };
        let rel = vars.compile_timed(&transition_to_logic(&t, &vars), &bdd);

        let a = bdd.mk_var(vars.current("a"));
        let a1 = bdd.mk_var(vars.next("a"));
        let c = bdd.mk_var(vars.current("c"));
        let c1 = bdd.mk_var(vars.next("c"));
        let expected = bdd.apply_and(
            bdd.apply_eq(a1, bdd.apply_or(c, a)),
            bdd.apply_eq(c1, c),
        );
        assert_eq!(rel, expected);
    }

    #[test]
    fn test_guard_restricts_relation() {
        let bdd = Bdd::default();
        let vars = universe(&["a"]);

        let t = GroundTransition {
            name: "fire".to_string(),
            guard: Formula::not(Formula::atom("a".to_string())),
            effect: set_true("a"),
        };
        let rel = vars.compile_timed(&transition_to_logic(&t, &vars), &bdd);

        // Only the pair (a=0, a'=1) is in the relation.
        assert_eq!(
            rel,
            bdd.cube([-(vars.current("a") as i32), vars.next("a") as i32])
        );
    }

    #[test]
    fn test_model_relation_is_disjunction() {
        let bdd = Bdd::default();
        let vars = universe(&["a"]);

        let up = GroundTransition {
            name: "up".to_string(),
            guard: Formula::not(Formula::atom("a".to_string())),
            effect: set_true("a"),
        };
        let down = GroundTransition {
            name: "down".to_string(),
            guard: Formula::atom("a".to_string()),
            effect: GroundEffect::SetFalse("a".to_string()),
        };
        let transitions = vec![up.clone(), down.clone()];

        let rel = vars.compile_timed(&model_to_logic(&transitions, &vars), &bdd);
        let expected = bdd.apply_or(
            vars.compile_timed(&transition_to_logic(&up, &vars), &bdd),
            vars.compile_timed(&transition_to_logic(&down, &vars), &bdd),
        );
        assert_eq!(rel, expected);
    }

    #[test]
    fn test_image_and_preimage() {
        // Toggle system on one variable: up flips 0 -> 1, down flips 1 -> 0.
        let bdd = Bdd::default();
        let vars = universe(&["a"]);

        let up = GroundTransition {
            name: "up".to_string(),
            guard: Formula::not(Formula::atom("a".to_string())),
            effect: set_true("a"),
        };
        let down = GroundTransition {
            name: "down".to_string(),
            guard: Formula::atom("a".to_string()),
            effect: GroundEffect::SetFalse("a".to_string()),
        };
        let system = TransitionSystem::compile(&bdd, &vars, &[up, down]);

        let a = bdd.mk_var(vars.current("a"));

        // From a=0 the only successor is a=1, and vice versa.
        assert_eq!(system.image(-a), a);
        assert_eq!(system.image(a), -a);
        assert_eq!(system.preimage(a), -a);
        assert_eq!(system.preimage(-a), a);

        // Image of everything is everything (the system never deadlocks).
        assert_eq!(system.image(bdd.one), bdd.one);
    }

    #[test]
    fn test_universe_of_model() {
        let t = GroundTransition {
            name: "t".to_string(),
            guard: Formula::atom("b".to_string()),
            effect: set_true("a"),
        };
        let target = Formula::atom("c".to_string());
        let vars = StateVars::of_model(&[t], [&target]);
        assert_eq!(vars.names(), &["a", "b", "c"]);
    }
}
