//! Result reporting: proof extraction, human and terse (spider) modes.

use crate::env::Env;
use crate::fol::Rule;
use crate::saturation::ClauseStore;
use crate::statistics::TerminationReason;
use std::collections::HashSet;
use std::io::Write;

/// One numbered step of an extracted proof.
#[derive(Debug, Clone)]
pub struct ProofStep {
    pub clause: usize,
    pub rule: Rule,
    pub premises: Vec<usize>,
}

/// Extract a proof by backward traversal from `refutation`, returning the
/// steps in derivation order.
pub fn extract_proof(store: &ClauseStore, refutation: usize) -> Vec<ProofStep> {
    let mut needed = Vec::new();
    let mut visited = HashSet::new();
    let mut to_visit = vec![refutation];
    while let Some(idx) = to_visit.pop() {
        if !visited.insert(idx) {
            continue;
        }
        needed.push(idx);
        to_visit.extend(store.get(idx).derivation.premises.iter().copied());
    }
    needed.sort_unstable();

    needed
        .into_iter()
        .map(|idx| {
            let derivation = &store.get(idx).derivation;
            ProofStep {
                clause: idx,
                rule: derivation.rule,
                premises: derivation.premises.clone(),
            }
        })
        .collect()
}

/// Print a proof as numbered text lines.
pub fn print_proof(
    out: &mut impl Write,
    store: &ClauseStore,
    env: &Env,
    refutation: usize,
) -> std::io::Result<()> {
    for step in extract_proof(store, refutation) {
        let clause = store.get(step.clause);
        write!(out, "{}. {}", step.clause, clause.display(&env.interner))?;
        if step.premises.is_empty() {
            writeln!(out, " [{}]", step.rule)?;
        } else {
            let premises: Vec<String> = step.premises.iter().map(|p| p.to_string()).collect();
            writeln!(out, " [{} {}]", step.rule, premises.join(","))?;
        }
    }
    Ok(())
}

/// Print a proof as TPTP cnf annotated formulas.
pub fn print_proof_tptp(
    out: &mut impl Write,
    store: &ClauseStore,
    env: &Env,
    refutation: usize,
) -> std::io::Result<()> {
    for step in extract_proof(store, refutation) {
        let clause = store.get(step.clause);
        let body = if clause.is_empty() {
            "$false".to_string()
        } else {
            let literals: Vec<String> = clause
                .literals
                .iter()
                .map(|l| l.display(&env.interner).to_string())
                .collect();
            format!("( {} )", literals.join(" | "))
        };
        if step.rule == Rule::Input {
            writeln!(out, "cnf(u{}, axiom, {}).", step.clause, body)?;
        } else {
            let premises: Vec<String> =
                step.premises.iter().map(|p| format!("u{}", p)).collect();
            writeln!(
                out,
                "cnf(u{}, plain, {}, inference({}, [], [{}])).",
                step.clause,
                body,
                step.rule,
                premises.join(",")
            )?;
        }
    }
    Ok(())
}

/// Proof output selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofMode {
    Off,
    On,
    Tptp,
}

/// Human-readable report: one result line, the proof if requested, then
/// the statistics block.
pub fn report_human(
    out: &mut impl Write,
    store: &ClauseStore,
    env: &Env,
    proof_mode: ProofMode,
) -> std::io::Result<()> {
    match env.statistics.termination_reason {
        TerminationReason::Refutation => {
            writeln!(out, "Refutation found.")?;
            if let Some(refutation) = env.statistics.refutation {
                match proof_mode {
                    ProofMode::Off => {}
                    ProofMode::On => print_proof(out, store, env, refutation)?,
                    ProofMode::Tptp => print_proof_tptp(out, store, env, refutation)?,
                }
            }
        }
        TerminationReason::TimeLimit => writeln!(out, "Time limit reached!")?,
        TerminationReason::MemoryLimit => writeln!(out, "Memory limit exceeded!")?,
        TerminationReason::Satisfiable | TerminationReason::Unknown => {
            writeln!(out, "Refutation not found!")?
        }
    }
    env.statistics.print(out)
}

/// Terse one-line report:
/// `<status> <problem> <deciseconds> <test_id> <bdd_time_ms>`.
pub fn report_spider(
    out: &mut impl Write,
    env: &Env,
    problem: &str,
    test_id: &str,
) -> std::io::Result<()> {
    let status = match env.statistics.termination_reason {
        TerminationReason::Refutation => "+",
        TerminationReason::TimeLimit | TerminationReason::MemoryLimit => "?",
        TerminationReason::Satisfiable | TerminationReason::Unknown => "-",
    };
    writeln!(
        out,
        "{} {} {} {} {}",
        status,
        problem,
        env.limits.elapsed_deciseconds(),
        test_id,
        env.statistics.bdd_time_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Limits;
    use crate::fol::{Clause, Derivation, Interner, Literal, PredicateSymbol, SplitSet};

    fn tiny_proof() -> (ClauseStore, Env) {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("p"), 0);
        let mut store = ClauseStore::new();
        let c0 = store.register(Clause::new(vec![Literal::positive(p, vec![])]));
        let c1 = store.register(Clause::new(vec![Literal::negative(p, vec![])]));
        let empty = store.register(Clause::derived(
            vec![],
            1,
            SplitSet::empty(),
            Derivation::new(Rule::Resolution, vec![c0, c1]),
        ));

        let mut env = Env::new(interner, Limits::none(), 1);
        env.statistics.termination_reason = TerminationReason::Refutation;
        env.statistics.refutation = Some(empty);
        (store, env)
    }

    #[test]
    fn proof_steps_are_in_derivation_order() {
        let (store, env) = tiny_proof();
        let steps = extract_proof(&store, env.statistics.refutation.unwrap());
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].clause, 0);
        assert_eq!(steps[2].rule, Rule::Resolution);
        assert_eq!(steps[2].premises, vec![0, 1]);
    }

    #[test]
    fn human_report_mentions_refutation() {
        let (store, env) = tiny_proof();
        let mut buf = Vec::new();
        report_human(&mut buf, &store, &env, ProofMode::On).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Refutation found."));
        assert!(text.contains("[resolution 0,1]"));
    }

    #[test]
    fn tptp_proof_is_well_formed() {
        let (store, env) = tiny_proof();
        let mut buf = Vec::new();
        print_proof_tptp(&mut buf, &store, &env, env.statistics.refutation.unwrap()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("cnf(u0, axiom, ( p )."));
        assert!(text.contains("cnf(u2, plain, $false, inference(resolution, [], [u0,u1]))."));
    }

    #[test]
    fn spider_line_format() {
        let (_, env) = tiny_proof();
        let mut buf = Vec::new();
        report_spider(&mut buf, &env, "PUZ001-1", "job42").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("+ PUZ001-1 "));
        assert!(text.trim_end().ends_with(" job42 0"));
    }
}
