//! The verification driver: the boundary the grounded model crosses into
//! the engine.
//!
//! A [`GroundModel`] is an immutable value produced upstream (by the
//! grounder, or by a front-end feeding grounded structures directly); the
//! engine holds no state besides the per-run BDD manager created here.
//! A model without a query is rejected before any diagram is built.

use std::collections::BTreeSet;

use log::debug;
use thiserror::Error;

use crate::bdd::Bdd;
use crate::ctl::{CtlChecker, CtlFormula};
use crate::formula::Formula;
use crate::ground::GroundTransition;
use crate::reach::{reachability, Outcome};
use crate::reference::Ref;
use crate::relation::{StateVars, TransitionSystem};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum VerifyError {
    #[error("model has no target or ctltarget query")]
    MissingQuery,
}

/// The initial-state description.
#[derive(Debug, Clone)]
pub enum Source {
    /// The listed variables are initially true, every other state
    /// variable false: a single initial state.
    TrueAtoms(Vec<String>),
    /// All states satisfying the formula are initial.
    Formula(Formula<String>),
}

/// What to check.
#[derive(Debug, Clone)]
pub enum Query {
    /// Reachability of states satisfying the formula.
    Reach(Formula<String>),
    /// CTL model checking against the initial states.
    Ctl(CtlFormula),
}

/// A fully grounded model: the engine's entire input.
#[derive(Debug, Clone)]
pub struct GroundModel {
    pub source: Source,
    pub query: Option<Query>,
    pub transitions: Vec<GroundTransition>,
}

impl GroundModel {
    /// The state-variable universe: everything mentioned by the
    /// transitions, the source, and the query.
    pub fn state_variables(&self) -> BTreeSet<String> {
        let mut universe = BTreeSet::new();
        for t in &self.transitions {
            universe.extend(t.state_vars());
        }
        match &self.source {
            Source::TrueAtoms(atoms) => universe.extend(atoms.iter().cloned()),
            Source::Formula(f) => universe.extend(f.atoms()),
        }
        match &self.query {
            Some(Query::Reach(f)) => universe.extend(f.atoms()),
            Some(Query::Ctl(f)) => universe.extend(f.atoms()),
            None => {}
        }
        universe
    }
}

/// The result of a verification run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Verdict {
    Reach(Outcome),
    Ctl { holds: bool },
}

fn initial_states(bdd: &Bdd, vars: &StateVars, source: &Source) -> Ref {
    match source {
        Source::TrueAtoms(atoms) => bdd.cube(vars.names().iter().map(|v| {
            let idx = vars.current(v) as i32;
            if atoms.iter().any(|a| a == v) {
                idx
            } else {
                -idx
            }
        })),
        Source::Formula(f) => vars.compile_now(f, bdd),
    }
}

/// Check the model's query, printing progress and the verdict to stdout.
///
/// The BDD manager lives for exactly this run; its unique table owns
/// every node produced until the function returns.
pub fn verify(model: &GroundModel) -> Result<Verdict, VerifyError> {
    verify_with(model, Bdd::default())
}

/// As [`verify`], with a caller-sized manager (storage bits are the only
/// configuration lever the engine has).
pub fn verify_with(model: &GroundModel, bdd: Bdd) -> Result<Verdict, VerifyError> {
    // Reject a query-less model before any diagram work.
    let query = model.query.as_ref().ok_or(VerifyError::MissingQuery)?;

    let vars = StateVars::new(model.state_variables());
    debug!(
        "verifying model: {} transitions, {} state variables",
        model.transitions.len(),
        vars.len()
    );

    let system = TransitionSystem::compile(&bdd, &vars, &model.transitions);
    let initial = initial_states(&bdd, &vars, &model.source);

    match query {
        Query::Reach(f) => {
            let target = vars.compile_now(f, &bdd);
            Ok(Verdict::Reach(reachability(&system, initial, target)))
        }
        Query::Ctl(f) => {
            let checker = CtlChecker::new(&system);
            let holds = checker.holds_initially(initial, f);
            Ok(Verdict::Ctl { holds })
        }
    }
}
