//! Breadth-first symbolic reachability with witness-trace extraction.
//!
//! The search keeps the full sequence of reachable-set layers
//! `S[0], S[1], …` with `S[k+1] = S[k] ∪ image(S[k])`. It stops when a
//! layer intersects the target (success) or when a layer equals its
//! predecessor (fixpoint: the target is formally unreachable). Termination
//! is guaranteed because the state universe is finite and the sequence is
//! monotone under set inclusion.
//!
//! On success the witness trace is reconstructed backward over the
//! per-transition diagrams. Ties among several connecting transitions are
//! broken by grounding order (first match); this is not canonical, just
//! deterministic.

use log::debug;
use num_bigint::BigUint;

use crate::reference::Ref;
use crate::relation::TransitionSystem;

/// Terminal outcome of a reachability run. "Not reachable" is a normal
/// result, not an error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The target was reached after `steps` transitions; `trace` lists
    /// the ground transition names in execution order.
    Reached { steps: usize, trace: Vec<String> },
    /// The fixpoint was reached without meeting the target.
    Unreachable,
}

/// Number of states a layer represents. Layers only constrain the
/// current-state variables, so the unconstrained next-state copies are
/// divided back out of the raw model count.
fn count_states(system: &TransitionSystem, states: Ref) -> BigUint {
    let vars = system.vars();
    system.bdd().sat_count(states, vars.num_bdd_vars()) >> vars.len()
}

/// Run the breadth-first search from `source` and report progress and the
/// verdict on stdout. `source` and `target` are diagrams over the
/// current-state variables.
pub fn reachability(system: &TransitionSystem, source: Ref, target: Ref) -> Outcome {
    let bdd = system.bdd();

    let mut layers = vec![source];
    let mut previous = bdd.zero;
    let mut i = 0;

    while layers[i] != previous && bdd.is_zero(bdd.apply_and(target, layers[i])) {
        let new_states = system.image(layers[i]);
        let next = bdd.apply_or(layers[i], new_states);
        debug_assert!(bdd.is_implies(layers[i], next));

        println!(
            "Reachability by {} transitions: {} states with BDD size {}",
            i + 1,
            count_states(system, next),
            bdd.size(next)
        );

        previous = layers[i];
        layers.push(next);
        i += 1;
    }

    if layers[i] == previous {
        println!("Target states not reachable");
        return Outcome::Unreachable;
    }

    println!("Target states reached by {} steps:", i);
    let trace = extract_trace(system, &layers, target, i);
    for name in &trace {
        println!("{}", name);
    }
    Outcome::Reached { steps: i, trace }
}

/// Walk backward from the target-intersected final layer, picking at each
/// step the first transition (in grounding order) that connects the
/// previous layer to the current constraint.
fn extract_trace(
    system: &TransitionSystem,
    layers: &[Ref],
    target: Ref,
    mut i: usize,
) -> Vec<String> {
    let bdd = system.bdd();
    let vars = system.vars();
    let current = vars.current_vars();
    let next = vars.next_vars();

    // The constraint travels on the next-state variables, so it can be
    // conjoined directly with the transition relations.
    let mut constraint = bdd.rename(bdd.apply_and(layers[i], target), &current, &next);
    let mut trace = Vec::new();

    while i > 0 {
        let mut found = None;
        for (name, t) in system.transitions() {
            let step = bdd.apply_and(bdd.apply_and(constraint, *t), layers[i - 1]);
            if !bdd.is_zero(step) {
                found = Some((name.clone(), step));
                break;
            }
        }
        let (name, step) = match found {
            Some(f) => f,
            // Every state in the constraint was produced by some
            // transition from the previous layer; failing to find one
            // means the layer bookkeeping is broken.
            None => panic!("no transition connects layer {} to the witness constraint", i),
        };
        debug!("witness step {}: {}", i, name);
        trace.push(name);

        let predecessors = bdd.exists(step, next.iter().copied());
        constraint = bdd.rename(predecessors, &current, &next);
        i -= 1;
    }

    trace.reverse();
    trace
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bdd::Bdd;
    use crate::formula::Formula;
    use crate::ground::{GroundEffect, GroundTransition};
    use crate::relation::StateVars;

    fn chain_transition(from: u32, to: u32) -> GroundTransition {
        GroundTransition {
            name: format!("go_{}_{}", from, to),
            guard: Formula::atom(format!("at_{}", from)),
            effect: GroundEffect::All(vec![
                GroundEffect::SetFalse(format!("at_{}", from)),
                GroundEffect::SetTrue(format!("at_{}", to)),
            ]),
        }
    }

    /// Chain 0 -> 1 -> 2 -> 3, start at 0, target at 3.
    fn chain() -> Vec<GroundTransition> {
        (0..3).map(|i| chain_transition(i, i + 1)).collect()
    }

    #[test]
    fn test_chain_reached() {
        let bdd = Bdd::default();
        let ground = chain();
        let vars = StateVars::of_model(&ground, []);
        let system = TransitionSystem::compile(&bdd, &vars, &ground);

        // Start: exactly at_0, everything else false.
        let source = bdd.cube(vars.names().iter().map(|v| {
            let idx = vars.current(v) as i32;
            if v == "at_0" {
                idx
            } else {
                -idx
            }
        }));
        let target = bdd.mk_var(vars.current("at_3"));

        let outcome = reachability(&system, source, target);
        assert_eq!(
            outcome,
            Outcome::Reached {
                steps: 3,
                trace: vec![
                    "go_0_1".to_string(),
                    "go_1_2".to_string(),
                    "go_2_3".to_string(),
                ],
            }
        );
    }

    #[test]
    fn test_target_in_source() {
        let bdd = Bdd::default();
        let ground = chain();
        let vars = StateVars::of_model(&ground, []);
        let system = TransitionSystem::compile(&bdd, &vars, &ground);

        let source = bdd.mk_var(vars.current("at_1"));
        let target = bdd.mk_var(vars.current("at_1"));

        let outcome = reachability(&system, source, target);
        assert_eq!(
            outcome,
            Outcome::Reached {
                steps: 0,
                trace: vec![],
            }
        );
    }

    #[test]
    fn test_unreachable_backward() {
        // The chain only runs forward; at_0 is unreachable from at_1.
        let bdd = Bdd::default();
        let ground = chain();
        let vars = StateVars::of_model(&ground, []);
        let system = TransitionSystem::compile(&bdd, &vars, &ground);

        let source = bdd.cube(vars.names().iter().map(|v| {
            let idx = vars.current(v) as i32;
            if v == "at_1" {
                idx
            } else {
                -idx
            }
        }));
        let target = bdd.apply_and(
            bdd.mk_var(vars.current("at_0")),
            -bdd.mk_var(vars.current("at_1")),
        );

        assert_eq!(reachability(&system, source, target), Outcome::Unreachable);
    }

    /// Replay a trace forward and check guards plus final target.
    #[test]
    fn test_witness_is_valid() {
        let bdd = Bdd::default();
        let ground = chain();
        let vars = StateVars::of_model(&ground, []);
        let system = TransitionSystem::compile(&bdd, &vars, &ground);

        let source = bdd.cube(vars.names().iter().map(|v| {
            let idx = vars.current(v) as i32;
            if v == "at_0" {
                idx
            } else {
                -idx
            }
        }));
        let target = bdd.mk_var(vars.current("at_3"));

        let trace = match reachability(&system, source, target) {
            Outcome::Reached { trace, .. } => trace,
            outcome => panic!("expected a witness, got {:?}", outcome),
        };

        let by_name: std::collections::HashMap<_, _> = system
            .transitions()
            .iter()
            .map(|(n, r)| (n.clone(), *r))
            .collect();
        let gindex: std::collections::HashMap<_, _> =
            ground.iter().map(|t| (t.name.clone(), t)).collect();

        let mut states = source;
        for name in &trace {
            // The guard must hold somewhere in the current state set.
            let t = gindex[name.as_str()];
            let guard = vars.compile_now(&t.guard, &bdd);
            assert!(!bdd.is_zero(bdd.apply_and(states, guard)), "guard of {} fails", name);

            // Step forward through exactly this transition.
            let rel = by_name[name.as_str()];
            let step = bdd.apply_and(rel, states);
            let step = bdd.exists(step, vars.current_vars());
            states = bdd.rename(step, &vars.next_vars(), &vars.current_vars());
            assert!(!bdd.is_zero(states));
        }

        assert!(!bdd.is_zero(bdd.apply_and(states, target)));
    }

    #[test]
    fn test_layer_monotonicity_and_convergence() {
        // Run the fixpoint by hand and check S[k] ⊆ S[k+1] and convergence.
        let bdd = Bdd::default();
        let ground = chain();
        let vars = StateVars::of_model(&ground, []);
        let system = TransitionSystem::compile(&bdd, &vars, &ground);

        let mut s = bdd.cube(vars.names().iter().map(|v| {
            let idx = vars.current(v) as i32;
            if v == "at_0" {
                idx
            } else {
                -idx
            }
        }));

        let mut steps = 0;
        loop {
            let next = bdd.apply_or(s, system.image(s));
            assert!(bdd.is_implies(s, next));
            if next == s {
                break;
            }
            s = next;
            steps += 1;
            assert!(steps <= 16, "fixpoint did not converge");
        }
        // The chain has length 3, so 3 growing steps.
        assert_eq!(steps, 3);
    }
}
