//! # bdd-mc: symbolic model checking with Binary Decision Diagrams
//!
//! **`bdd-mc`** is a manager-centric library for checking reachability and
//! CTL properties of finite transition systems, using **Binary Decision
//! Diagrams (BDDs)** as the symbolic state-set representation.
//!
//! ## What is in the box?
//!
//! The engine is layered leaf to root:
//!
//! - an OBDD engine with hash consing and complement edges: diagrams are
//!   canonical, so equivalence checks (and fixpoint termination tests)
//!   are a single reference comparison;
//! - a grounder expanding parameterized transition templates into finite
//!   ground transitions;
//! - a translator building the transition-relation formula over
//!   current/next state-variable copies, frame axioms included;
//! - breadth-first symbolic reachability with witness-trace extraction;
//! - a CTL model checker with primitive EX/EG/EU and macro-expanded
//!   derived operators.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bdd_mc::formula::Formula;
//! use bdd_mc::ground::{Atom, Effect, Transition, ground_transitions};
//! use bdd_mc::verify::{verify, GroundModel, Query, Source, Verdict};
//!
//! // One transition: when a and not b, set both a and b.
//! let templates = vec![Transition {
//!     name: "step".to_string(),
//!     params: vec![],
//!     guard: Formula::and([
//!         Formula::atom(Atom::prop("a")),
//!         Formula::not(Formula::atom(Atom::prop("b"))),
//!     ]),
//!     effect: Effect::All(vec![
//!         Effect::SetTrue(Atom::prop("a")),
//!         Effect::SetTrue(Atom::prop("b")),
//!     ]),
//! }];
//!
//! let model = GroundModel {
//!     source: Source::Formula(Formula::and([
//!         Formula::atom("a".to_string()),
//!         Formula::not(Formula::atom("b".to_string())),
//!     ])),
//!     query: Some(Query::Reach(Formula::and([
//!         Formula::atom("a".to_string()),
//!         Formula::atom("b".to_string()),
//!     ]))),
//!     transitions: ground_transitions(&templates).unwrap(),
//! };
//!
//! match verify(&model).unwrap() {
//!     Verdict::Reach(outcome) => println!("{:?}", outcome),
//!     Verdict::Ctl { holds } => println!("{}", holds),
//! }
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the [`Bdd`][crate::bdd::Bdd] manager and core
//!   diagram algorithms.
//! - **[`ground`]**: parameterized transitions and their expansion.
//! - **[`relation`]**: frame axioms and the compiled transition relation.
//! - **[`reach`]**: breadth-first reachability and witness traces.
//! - **[`ctl`]**: the CTL formula type and fixpoint checker.
//! - **[`verify`]**: the driver tying a grounded model to a verdict.

pub mod bdd;
pub mod cache;
pub mod ctl;
pub mod dot;
pub mod formula;
pub mod ground;
pub mod reach;
pub mod reference;
pub mod relation;
pub mod sat;
pub mod table;
pub mod utils;
pub mod verify;
