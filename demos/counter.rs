//! A token walking along a chain of cells, built from one parameterized
//! transition template.
//!
//! Run with `cargo run --example counter`; raise the logger level below
//! to watch the engine work.

use bdd_mc::ctl::CtlFormula;
use bdd_mc::formula::Formula;
use bdd_mc::ground::{ground_transitions, Atom, Domain, Effect, Param, Term, Transition};
use bdd_mc::verify::{verify, GroundModel, Query, Source};

const CELLS: i64 = 8;

fn templates() -> Vec<Transition> {
    // inc(i): at(i) => at(i) := 0, at(i+1) := 1
    vec![Transition {
        name: "inc".to_string(),
        params: vec![Param::new("i", Domain::Interval(0, CELLS - 1))],
        guard: Formula::atom(Atom::new("at", vec![Term::sym("i")])),
        effect: Effect::All(vec![
            Effect::SetFalse(Atom::new("at", vec![Term::sym("i")])),
            Effect::SetTrue(Atom::new(
                "at",
                vec![Term::add(Term::sym("i"), Term::Int(1))],
            )),
        ]),
    }]
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    simplelog::SimpleLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
    )?;

    let transitions = ground_transitions(&templates())?;
    println!("Grounded transitions:");
    for t in &transitions {
        println!("  {}", t);
    }

    let source = Source::TrueAtoms(vec!["at_0".to_string()]);
    let target = Formula::atom(format!("at_{}", CELLS));

    println!("\n=== Reachability ===");
    let model = GroundModel {
        source: source.clone(),
        query: Some(Query::Reach(target)),
        transitions: transitions.clone(),
    };
    verify(&model)?;

    println!("\n=== CTL ===");
    let model = GroundModel {
        source,
        query: Some(Query::Ctl(CtlFormula::af(CtlFormula::atom(format!(
            "at_{}",
            CELLS
        ))))),
        transitions,
    };
    verify(&model)?;

    Ok(())
}
