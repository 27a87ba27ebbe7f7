//! Grounding of parameterized transition systems.
//!
//! A transition template carries parameters over finite domains. Grounding
//! expands the cartesian product of the domains: each combination yields
//! one ground transition whose name is the base name suffixed with the
//! bound values, and whose guard and effects have every parameter
//! occurrence substituted. Arithmetic over parameters is evaluated during
//! substitution, so the term `i + 1` with `i = 3` grounds to the symbol
//! fragment `4`.
//!
//! Expansion order is stable: parameters in declaration order, domain
//! values in listed order. Trace names therefore reproduce across runs.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use thiserror::Error;

use crate::formula::Formula;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum GroundError {
    #[error("unbound parameter '{0}' in arithmetic term")]
    UnboundParameter(String),
    #[error("parameter '{param}' is bound to symbolic value '{value}' inside an arithmetic term")]
    NonNumericValue { param: String, value: String },
    #[error("empty domain for parameter '{0}'")]
    EmptyDomain(String),
}

/// A value a parameter can be bound to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    Sym(String),
    Int(i64),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Sym(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
        }
    }
}

/// A finite parameter domain.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Domain {
    /// Explicit enumeration, in listed order.
    Enum(Vec<Value>),
    /// Inclusive integer interval `lo..=hi`.
    Interval(i64, i64),
}

impl Domain {
    fn values(&self) -> Vec<Value> {
        match self {
            Domain::Enum(vs) => vs.clone(),
            Domain::Interval(lo, hi) => (*lo..=*hi).map(Value::Int).collect(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Param {
    pub name: String,
    pub domain: Domain,
}

impl Param {
    pub fn new(name: impl Into<String>, domain: Domain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }
}

/// A term in an atom's argument position: a constant symbol, a parameter
/// reference (indistinguishable from a constant until binding), an
/// integer, or arithmetic over these.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Term {
    Sym(String),
    Int(i64),
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
    Mul(Box<Term>, Box<Term>),
}

impl Term {
    pub fn sym(s: impl Into<String>) -> Self {
        Term::Sym(s.into())
    }

    pub fn add(a: Term, b: Term) -> Self {
        Term::Add(Box::new(a), Box::new(b))
    }
    pub fn sub(a: Term, b: Term) -> Self {
        Term::Sub(Box::new(a), Box::new(b))
    }
    pub fn mul(a: Term, b: Term) -> Self {
        Term::Mul(Box::new(a), Box::new(b))
    }

    /// Ground the term to a name fragment under the given bindings.
    ///
    /// A bare symbol not present in the bindings is a constant and
    /// grounds to itself; inside arithmetic every symbol must be a
    /// parameter bound to an integer.
    fn instantiate(&self, bindings: &[(String, Value)]) -> Result<String, GroundError> {
        match self {
            Term::Sym(s) => Ok(match lookup(bindings, s) {
                Some(v) => v.to_string(),
                None => s.clone(),
            }),
            Term::Int(i) => Ok(i.to_string()),
            _ => Ok(self.eval(bindings)?.to_string()),
        }
    }

    /// Evaluate an arithmetic term to an integer.
    fn eval(&self, bindings: &[(String, Value)]) -> Result<i64, GroundError> {
        match self {
            Term::Sym(s) => match lookup(bindings, s) {
                Some(Value::Int(i)) => Ok(*i),
                Some(Value::Sym(v)) => Err(GroundError::NonNumericValue {
                    param: s.clone(),
                    value: v.clone(),
                }),
                None => Err(GroundError::UnboundParameter(s.clone())),
            },
            Term::Int(i) => Ok(*i),
            Term::Add(a, b) => Ok(a.eval(bindings)? + b.eval(bindings)?),
            Term::Sub(a, b) => Ok(a.eval(bindings)? - b.eval(bindings)?),
            Term::Mul(a, b) => Ok(a.eval(bindings)? * b.eval(bindings)?),
        }
    }
}

fn lookup<'a>(bindings: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    bindings.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

/// A parameterized atom `pred(t1, …, tn)`. Grounds to the variable name
/// `pred_v1_…_vn` (or bare `pred` when there are no arguments).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Atom {
    pub pred: String,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(pred: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            pred: pred.into(),
            args,
        }
    }

    pub fn prop(pred: impl Into<String>) -> Self {
        Self::new(pred, vec![])
    }

    pub fn instantiate(&self, bindings: &[(String, Value)]) -> Result<String, GroundError> {
        if self.args.is_empty() {
            return Ok(self.pred.clone());
        }
        let fragments: Vec<String> = self
            .args
            .iter()
            .map(|t| t.instantiate(bindings))
            .collect::<Result<_, _>>()?;
        Ok(format!("{}_{}", self.pred, fragments.join("_")))
    }
}

/// An effect of a transition, before grounding.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Effect {
    SetTrue(Atom),
    SetFalse(Atom),
    /// Guarded effect: the sub-effect applies only when the condition
    /// holds in the pre-state.
    When(Formula<Atom>, Box<Effect>),
    /// Parallel composition.
    All(Vec<Effect>),
}

impl Effect {
    pub fn when(condition: Formula<Atom>, effect: Effect) -> Self {
        Effect::When(condition, Box::new(effect))
    }

    fn instantiate(&self, bindings: &[(String, Value)]) -> Result<GroundEffect, GroundError> {
        Ok(match self {
            Effect::SetTrue(a) => GroundEffect::SetTrue(a.instantiate(bindings)?),
            Effect::SetFalse(a) => GroundEffect::SetFalse(a.instantiate(bindings)?),
            Effect::When(c, e) => GroundEffect::When(
                instantiate_formula(c, bindings)?,
                Box::new(e.instantiate(bindings)?),
            ),
            Effect::All(es) => GroundEffect::All(
                es.iter()
                    .map(|e| e.instantiate(bindings))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

/// A grounded, parameter-free effect over state-variable names.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GroundEffect {
    SetTrue(String),
    SetFalse(String),
    When(Formula<String>, Box<GroundEffect>),
    All(Vec<GroundEffect>),
}

impl GroundEffect {
    /// Effect precondition: the condition under which this effect makes
    /// variable `x` take the given value. An unconditional assignment
    /// contributes TRUE, a guarded effect contributes its condition
    /// conjoined with the sub-effect's contribution, and a parallel
    /// composition contributes the disjunction of its parts.
    pub fn epc(&self, x: &str, value: bool) -> Formula<String> {
        match self {
            GroundEffect::SetTrue(y) => constant(value && y == x),
            GroundEffect::SetFalse(y) => constant(!value && y == x),
            GroundEffect::When(c, e) => match e.epc(x, value) {
                Formula::False => Formula::False,
                Formula::True => c.clone(),
                sub => Formula::and([c.clone(), sub]),
            },
            GroundEffect::All(es) => {
                let mut parts = Vec::new();
                for e in es {
                    match e.epc(x, value) {
                        Formula::False => {}
                        Formula::True => return Formula::True,
                        sub => parts.push(sub),
                    }
                }
                match parts.len() {
                    0 => Formula::False,
                    1 => parts.pop().unwrap_or(Formula::False),
                    _ => Formula::Or(parts),
                }
            }
        }
    }

    /// Collect every state variable this effect can touch or test.
    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            GroundEffect::SetTrue(x) | GroundEffect::SetFalse(x) => {
                out.insert(x.clone());
            }
            GroundEffect::When(c, e) => {
                out.extend(c.atoms());
                e.collect_vars(out);
            }
            GroundEffect::All(es) => {
                for e in es {
                    e.collect_vars(out);
                }
            }
        }
    }
}

impl Display for GroundEffect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GroundEffect::SetTrue(x) => write!(f, "{} := 1", x),
            GroundEffect::SetFalse(x) => write!(f, "{} := 0", x),
            GroundEffect::When(c, e) => write!(f, "(when {} {})", c, e),
            GroundEffect::All(es) => {
                write!(f, "[")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn constant(b: bool) -> Formula<String> {
    if b {
        Formula::True
    } else {
        Formula::False
    }
}

fn instantiate_formula(
    f: &Formula<Atom>,
    bindings: &[(String, Value)],
) -> Result<Formula<String>, GroundError> {
    Ok(match f {
        Formula::True => Formula::True,
        Formula::False => Formula::False,
        Formula::Atom(a) => Formula::Atom(a.instantiate(bindings)?),
        Formula::Not(g) => Formula::Not(Box::new(instantiate_formula(g, bindings)?)),
        Formula::And(fs) => Formula::And(
            fs.iter()
                .map(|g| instantiate_formula(g, bindings))
                .collect::<Result<_, _>>()?,
        ),
        Formula::Or(fs) => Formula::Or(
            fs.iter()
                .map(|g| instantiate_formula(g, bindings))
                .collect::<Result<_, _>>()?,
        ),
    })
}

/// A parameterized transition template.
#[derive(Debug, Clone)]
pub struct Transition {
    pub name: String,
    pub params: Vec<Param>,
    pub guard: Formula<Atom>,
    pub effect: Effect,
}

/// One grounded transition: a name for traces, a guard over pre-state
/// variables, and a parameter-free effect.
#[derive(Debug, Clone)]
pub struct GroundTransition {
    pub name: String,
    pub guard: Formula<String>,
    pub effect: GroundEffect,
}

impl GroundTransition {
    /// State variables occurring in the guard or the effect.
    pub fn state_vars(&self) -> BTreeSet<String> {
        let mut out = self.guard.atoms();
        self.effect.collect_vars(&mut out);
        out
    }
}

impl Display for GroundTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} => {}", self.name, self.guard, self.effect)
    }
}

/// Ground one transition template: the cartesian product of its
/// parameter domains, in stable declaration/listing order.
pub fn ground_transition(t: &Transition) -> Result<Vec<GroundTransition>, GroundError> {
    for p in &t.params {
        if p.domain.values().is_empty() {
            return Err(GroundError::EmptyDomain(p.name.clone()));
        }
    }

    let domains: Vec<Vec<Value>> = t.params.iter().map(|p| p.domain.values()).collect();

    let mut out = Vec::new();
    for combo in domains.into_iter().multi_cartesian_product() {
        let bindings: Vec<(String, Value)> = t
            .params
            .iter()
            .map(|p| p.name.clone())
            .zip(combo)
            .collect();
        out.push(GroundTransition {
            name: ground_name(&t.name, &bindings),
            guard: instantiate_formula(&t.guard, &bindings)?,
            effect: t.effect.instantiate(&bindings)?,
        });
    }

    // A parameterless template still yields exactly one ground transition:
    // multi_cartesian_product over zero domains produces one empty combo
    // only in the other convention, so handle it explicitly.
    if t.params.is_empty() && out.is_empty() {
        out.push(GroundTransition {
            name: t.name.clone(),
            guard: instantiate_formula(&t.guard, &[])?,
            effect: t.effect.instantiate(&[])?,
        });
    }

    Ok(out)
}

fn ground_name(base: &str, bindings: &[(String, Value)]) -> String {
    if bindings.is_empty() {
        return base.to_string();
    }
    let values: Vec<String> = bindings.iter().map(|(_, v)| v.to_string()).collect();
    format!("{}_{}", base, values.join("_"))
}

/// Ground a list of transition templates, preserving input order.
pub fn ground_transitions(ts: &[Transition]) -> Result<Vec<GroundTransition>, GroundError> {
    let mut out = Vec::new();
    for t in ts {
        out.extend(ground_transition(t)?);
    }
    Ok(out)
}

/// Ground a formula that should already be parameter-free (source or
/// target descriptions).
pub fn ground_formula(f: &Formula<Atom>) -> Result<Formula<String>, GroundError> {
    instantiate_formula(f, &[])
}
