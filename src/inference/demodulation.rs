//! Demodulation: rewriting with oriented unit equalities.
//!
//! Forward demodulation rewrites a fresh clause with the unit equalities
//! already active; backward demodulation uses a newly activated unit
//! equality to rewrite older clauses. A rewrite `l -> r` applies at a
//! subterm `t` when `l` matches `t` with substitution `sigma` and
//! `l sigma` is strictly greater than `r sigma` under the ordering.

use super::{
    BackwardSimplification, Engine, ForwardSimplifier, BackwardSimplifier, SimplifyOutcome, View,
};
use crate::env::ProverResult;
use crate::fol::{Clause, Literal, Rule, Term, TermOrdering};
use crate::index::{Binding, IndexManager, IndexType, QueryMode};
use crate::unification::match_term;

/// Demodulation in both directions.
pub struct Demodulation;

impl Demodulation {
    pub fn new() -> Self {
        Demodulation
    }
}

impl Default for Demodulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Demodulation {
    fn name(&self) -> &'static str {
        "demodulation"
    }

    fn attach(&mut self, indices: &mut IndexManager) {
        indices.request(IndexType::DemodulationLhs);
        indices.request(IndexType::DemodulationSubterm);
    }

    fn detach(&mut self, indices: &mut IndexManager) -> ProverResult<()> {
        indices.release(IndexType::DemodulationLhs)?;
        indices.release(IndexType::DemodulationSubterm)
    }
}

/// Try to rewrite `sub` with the rule `lhs = rhs`. Returns the replacement
/// for `sub` when the ordering constraint holds.
fn try_rewrite(
    lhs: &Term,
    rhs: &Term,
    sub: &Term,
    kbo: &crate::fol::Kbo,
) -> Option<Term> {
    let subst = match_term(lhs, sub).ok()?;
    let lhs_sigma = lhs.apply_substitution(&subst);
    let rhs_sigma = rhs.apply_substitution(&subst);
    debug_assert_eq!(&lhs_sigma, sub);
    if kbo.compare(&lhs_sigma, &rhs_sigma) != TermOrdering::Greater {
        return None;
    }
    Some(rhs_sigma)
}

/// Replace the subterm of `lit` at `path` with `replacement`.
fn rewrite_literal_at(lit: &Literal, path: &[usize], replacement: &Term) -> Literal {
    let mut out = lit.clone();
    let (first, rest) = path.split_first().expect("subterm path is non-empty");
    out.args[*first] = out.args[*first].replace_at(rest, replacement);
    out
}

/// Enumerate `(literal, path, subterm)` for every non-variable subterm.
fn subterm_positions(clause: &Clause) -> Vec<(usize, Vec<usize>, Term)> {
    let mut out = Vec::new();
    for (li, lit) in clause.literals.iter().enumerate() {
        for (ai, arg) in lit.args.iter().enumerate() {
            let mut path = vec![ai];
            collect(li, arg, &mut path, &mut out);
            path.pop();
        }
    }
    return out;

    fn collect(li: usize, term: &Term, path: &mut Vec<usize>, out: &mut Vec<(usize, Vec<usize>, Term)>) {
        if matches!(term, Term::Variable(_)) {
            return;
        }
        out.push((li, path.clone(), term.clone()));
        if let Term::Function(_, args) = term {
            for (i, arg) in args.iter().enumerate() {
                path.push(i);
                collect(li, arg, path, out);
                path.pop();
            }
        }
    }
}

impl ForwardSimplifier for Demodulation {
    fn simplify(&self, view: &mut View<'_>, clause: &Clause) -> SimplifyOutcome {
        let Some(lhs_index) = view.indices.get(IndexType::DemodulationLhs) else {
            return SimplifyOutcome::Keep;
        };

        for (li, path, sub) in subterm_positions(clause) {
            let candidates: Vec<Binding> = lhs_index
                .tree()
                .query_term(&sub, QueryMode::Generalization)
                .cloned()
                .collect();
            for binding in candidates {
                let unit = view.clauses.get(binding.clause);
                let eq_lit = &unit.literals[binding.literal];
                let side = binding.path[0];
                let lhs = &eq_lit.args[side];
                let rhs = &eq_lit.args[1 - side];

                if let Some(replacement) = try_rewrite(lhs, rhs, &sub, &view.env.kbo) {
                    let mut literals = clause.literals.clone();
                    literals[li] = rewrite_literal_at(&literals[li], &path, &replacement);
                    view.env.statistics.forward_demodulations += 1;
                    return SimplifyOutcome::Replace {
                        literals,
                        rule: Rule::Demodulation,
                        premises: vec![binding.clause],
                    };
                }
            }
        }
        SimplifyOutcome::Keep
    }
}

impl BackwardSimplifier for Demodulation {
    fn perform(&self, view: &mut View<'_>, premise: usize) -> Vec<BackwardSimplification> {
        let mut results = Vec::new();
        let unit = view.clauses.get(premise);
        if unit.literals.len() != 1
            || !unit.literals[0].polarity
            || !unit.literals[0].is_equality(&view.env.interner)
        {
            return results;
        }
        let Some(subterm_index) = view.indices.get(IndexType::DemodulationSubterm) else {
            return results;
        };

        let eq_lit = &unit.literals[0];
        let mut rewritten: std::collections::HashSet<usize> = std::collections::HashSet::new();

        for side in [0usize, 1] {
            let lhs = &eq_lit.args[side];
            let rhs = &eq_lit.args[1 - side];
            if matches!(lhs, Term::Variable(_)) {
                continue;
            }
            if matches!(
                view.env.kbo.compare(lhs, rhs),
                TermOrdering::Less | TermOrdering::Equal
            ) {
                continue;
            }

            let candidates: Vec<Binding> = subterm_index
                .tree()
                .query_term(lhs, QueryMode::Instance)
                .cloned()
                .collect();
            for binding in candidates {
                if binding.clause == premise || rewritten.contains(&binding.clause) {
                    continue;
                }
                let victim = view.clauses.get(binding.clause);
                let (first, rest) = binding.path.split_first().expect("subterm path");
                let Some(sub) = victim.literals[binding.literal].args[*first].subterm_at(rest)
                else {
                    continue;
                };
                if let Some(replacement) = try_rewrite(lhs, rhs, sub, &view.env.kbo) {
                    let mut literals = victim.literals.clone();
                    literals[binding.literal] =
                        rewrite_literal_at(&literals[binding.literal], &binding.path, &replacement);
                    rewritten.insert(binding.clause);
                    view.env.statistics.backward_demodulations += 1;
                    results.push(BackwardSimplification {
                        victim: binding.clause,
                        replacement: Some((literals, Rule::Demodulation)),
                    });
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, Limits};
    use crate::fol::{Constant, FunctionSymbol, Interner, PredicateSymbol};
    use crate::saturation::ClauseStore;

    #[test]
    fn forward_rewrite_with_unit_equality() {
        let mut interner = Interner::new();
        let eq = PredicateSymbol::new(interner.intern_predicate("="), 2);
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let b = Term::Constant(Constant::new(interner.intern_constant("b")));
        let f = FunctionSymbol::new(interner.intern_function("f"), 1);
        let fa = Term::Function(f, vec![a.clone()]);

        let mut env = Env::new(interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // f(a) = b
        let unit = store.register(Clause::new(vec![Literal::positive(
            eq,
            vec![fa.clone(), b.clone()],
        )]));
        let mut indices = IndexManager::new();
        indices.request(IndexType::DemodulationLhs);
        indices.request(IndexType::DemodulationSubterm);
        indices.on_active_added(unit, store.get(unit), &[], &env.interner, &env.kbo);

        // Target: P(f(a))
        let target = Clause::new(vec![Literal::positive(p, vec![fa.clone()])]);
        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        match Demodulation::new().simplify(&mut view, &target) {
            SimplifyOutcome::Replace {
                literals, premises, ..
            } => {
                assert_eq!(literals.len(), 1);
                assert_eq!(literals[0].args[0], b);
                assert_eq!(premises, vec![unit]);
            }
            other => panic!("expected rewrite, got {:?}", other),
        }
    }

    #[test]
    fn no_rewrite_against_the_ordering() {
        let mut interner = Interner::new();
        let eq = PredicateSymbol::new(interner.intern_predicate("="), 2);
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let f = FunctionSymbol::new(interner.intern_function("f"), 1);
        let fa = Term::Function(f, vec![a.clone()]);

        let mut env = Env::new(interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // f(a) = a rewrites f(a) -> a, never a -> f(a)
        let unit = store.register(Clause::new(vec![Literal::positive(
            eq,
            vec![fa.clone(), a.clone()],
        )]));
        let mut indices = IndexManager::new();
        indices.request(IndexType::DemodulationLhs);
        indices.request(IndexType::DemodulationSubterm);
        indices.on_active_added(unit, store.get(unit), &[], &env.interner, &env.kbo);

        // Target: P(a) contains no instance of f(X) other than via a -> f(a)
        let target = Clause::new(vec![Literal::positive(p, vec![a.clone()])]);
        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        assert!(matches!(
            Demodulation::new().simplify(&mut view, &target),
            SimplifyOutcome::Keep
        ));
    }

    #[test]
    fn backward_rewrites_active_clause() {
        let mut interner = Interner::new();
        let eq = PredicateSymbol::new(interner.intern_predicate("="), 2);
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let b = Term::Constant(Constant::new(interner.intern_constant("b")));
        let f = FunctionSymbol::new(interner.intern_function("f"), 1);
        let fa = Term::Function(f, vec![a.clone()]);

        let mut env = Env::new(interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // Active: P(f(a))
        let victim = store.register(Clause::new(vec![Literal::positive(p, vec![fa.clone()])]));
        // New unit: f(a) = b
        let unit = store.register(Clause::new(vec![Literal::positive(
            eq,
            vec![fa.clone(), b.clone()],
        )]));

        let mut indices = IndexManager::new();
        indices.request(IndexType::DemodulationLhs);
        indices.request(IndexType::DemodulationSubterm);
        indices.on_active_added(victim, store.get(victim), &[0], &env.interner, &env.kbo);

        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        let results = Demodulation::new().perform(&mut view, unit);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].victim, victim);
        let (literals, rule) = results[0].replacement.clone().unwrap();
        assert_eq!(rule, Rule::Demodulation);
        assert_eq!(literals[0].args[0], b);
    }
}
