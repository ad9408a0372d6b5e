//! Subsumption and subsumption resolution.
//!
//! Clause `C` subsumes `D` when some substitution maps `C` onto a
//! sub-multiset of `D`. Forward subsumption deletes a fresh clause that an
//! active clause subsumes; backward subsumption deletes active clauses the
//! newly activated clause subsumes. Subsumption resolution removes one
//! literal of the target when the subsumer matches with exactly that
//! literal complemented.

use super::{
    BackwardSimplification, BackwardSimplifier, Engine, ForwardSimplifier, SimplifyOutcome, View,
};
use crate::env::ProverResult;
use crate::fol::{Clause, Literal, Rule, Substitution};
use crate::index::{IndexManager, IndexType, QueryMode};
use crate::unification::match_args;
use std::collections::BTreeSet;

/// Forward/backward subsumption and forward subsumption resolution.
pub struct Subsumption;

impl Subsumption {
    pub fn new() -> Self {
        Subsumption
    }
}

impl Default for Subsumption {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Subsumption {
    fn name(&self) -> &'static str {
        "subsumption"
    }

    fn attach(&mut self, indices: &mut IndexManager) {
        indices.request(IndexType::SimplifyingLiteral);
    }

    fn detach(&mut self, indices: &mut IndexManager) -> ProverResult<()> {
        indices.release(IndexType::SimplifyingLiteral)
    }
}

/// Multiset subsumption: find a substitution mapping every literal of
/// `subsumer` onto a distinct literal of `target`.
pub fn subsumes(subsumer: &[Literal], target: &[Literal]) -> bool {
    if subsumer.len() > target.len() {
        return false;
    }
    let mut used = vec![false; target.len()];
    match_rest(subsumer, target, 0, &mut used, &Substitution::new(), None).is_some()
}

/// Subsumption with one complemented target literal: every literal of
/// `subsumer` maps onto a distinct literal of `target`, except that
/// literals may instead map onto the complement of `target[res_idx]`.
/// Returns true only when the complemented literal was actually used.
fn subsumes_with_resolution(subsumer: &[Literal], target: &[Literal], res_idx: usize) -> bool {
    if subsumer.len() > target.len() {
        return false;
    }
    let mut used = vec![false; target.len()];
    matches!(
        match_rest(
            subsumer,
            target,
            0,
            &mut used,
            &Substitution::new(),
            Some(res_idx),
        ),
        Some(true)
    )
}

/// Backtracking matcher. Returns `Some(used_complement)` on success.
fn match_rest(
    subsumer: &[Literal],
    target: &[Literal],
    next: usize,
    used: &mut Vec<bool>,
    subst: &Substitution,
    res_idx: Option<usize>,
) -> Option<bool> {
    let Some(lit) = subsumer.get(next) else {
        // All literals matched; with a resolution literal the complement
        // must have been used, which the caller checks via the flag.
        return Some(false);
    };

    for (j, tlit) in target.iter().enumerate() {
        if used[j] {
            continue;
        }
        let complemented = res_idx == Some(j);
        let polarity_ok = if complemented {
            lit.polarity != tlit.polarity
        } else {
            lit.polarity == tlit.polarity
        };
        if !polarity_ok || lit.predicate != tlit.predicate {
            continue;
        }
        let mut trial = subst.clone();
        if match_args(&lit.args, &tlit.args, &mut trial).is_err() {
            continue;
        }
        used[j] = true;
        if let Some(deeper_used) = match_rest(subsumer, target, next + 1, used, &trial, res_idx) {
            used[j] = false;
            return Some(deeper_used || complemented);
        }
        used[j] = false;
    }
    None
}

/// Candidate subsumer clauses: active clauses with a literal generalizing
/// some literal of `clause`.
fn forward_candidates(view: &View<'_>, clause: &Clause) -> BTreeSet<usize> {
    let mut candidates = BTreeSet::new();
    let Some(index) = view.indices.get(IndexType::SimplifyingLiteral) else {
        return candidates;
    };
    for lit in &clause.literals {
        for binding in index.tree().query_literal(lit, QueryMode::Generalization) {
            candidates.insert(binding.clause);
        }
        // Subsumption resolution also matches against the complement
        for binding in index
            .tree()
            .query_literal(&lit.complement(), QueryMode::Generalization)
        {
            candidates.insert(binding.clause);
        }
    }
    candidates
}

impl ForwardSimplifier for Subsumption {
    fn simplify(&self, view: &mut View<'_>, clause: &Clause) -> SimplifyOutcome {
        let candidates = forward_candidates(view, clause);

        // Plain subsumption first: the whole clause is redundant.
        for &cand in &candidates {
            if Some(cand) == clause.id {
                continue;
            }
            let subsumer = view.clauses.get(cand);
            if subsumer.literals.len() <= clause.literals.len()
                && subsumes(&subsumer.literals, &clause.literals)
            {
                view.env.statistics.forward_subsumed += 1;
                return SimplifyOutcome::Delete {
                    premises: vec![cand],
                };
            }
        }

        // Subsumption resolution: cut one literal.
        for res_idx in 0..clause.literals.len() {
            for &cand in &candidates {
                if Some(cand) == clause.id {
                    continue;
                }
                let subsumer = view.clauses.get(cand);
                if subsumer.literals.len() > clause.literals.len() {
                    continue;
                }
                if subsumes_with_resolution(&subsumer.literals, &clause.literals, res_idx) {
                    let literals: Vec<Literal> = clause
                        .literals
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != res_idx)
                        .map(|(_, l)| l.clone())
                        .collect();
                    view.env.statistics.forward_subsumption_resolutions += 1;
                    return SimplifyOutcome::Replace {
                        literals,
                        rule: Rule::SubsumptionResolution,
                        premises: vec![cand],
                    };
                }
            }
        }

        SimplifyOutcome::Keep
    }
}

impl BackwardSimplifier for Subsumption {
    fn perform(&self, view: &mut View<'_>, premise: usize) -> Vec<BackwardSimplification> {
        let mut results = Vec::new();
        let Some(index) = view.indices.get(IndexType::SimplifyingLiteral) else {
            return results;
        };
        let subsumer = view.clauses.get(premise);
        if subsumer.literals.is_empty() {
            return results;
        }

        // Victims must contain an instance of the subsumer's first literal.
        let mut victims = BTreeSet::new();
        for binding in index
            .tree()
            .query_literal(&subsumer.literals[0], QueryMode::Instance)
        {
            victims.insert(binding.clause);
        }

        for victim_idx in victims {
            if victim_idx == premise {
                continue;
            }
            let victim = view.clauses.get(victim_idx);
            if subsumer.literals.len() <= victim.literals.len()
                && subsumes(&subsumer.literals, &victim.literals)
            {
                view.env.statistics.backward_subsumed += 1;
                results.push(BackwardSimplification {
                    victim: victim_idx,
                    replacement: None,
                });
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, Limits};
    use crate::fol::{Constant, Interner, PredicateSymbol, Term, Variable};
    use crate::saturation::ClauseStore;

    struct Ctx {
        interner: Interner,
    }

    impl Ctx {
        fn new() -> Self {
            Ctx {
                interner: Interner::new(),
            }
        }

        fn const_(&mut self, name: &str) -> Term {
            Term::Constant(Constant::new(self.interner.intern_constant(name)))
        }

        fn var(&mut self, name: &str) -> Term {
            Term::Variable(Variable::new(self.interner.intern_variable(name)))
        }

        fn pred(&mut self, name: &str, arity: u8) -> PredicateSymbol {
            PredicateSymbol::new(self.interner.intern_predicate(name), arity)
        }
    }

    #[test]
    fn general_clause_subsumes_instance() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let q = ctx.pred("q", 1);
        let x = ctx.var("X");
        let a = ctx.const_("a");

        // p(X) subsumes p(a) | q(a)
        let subsumer = vec![Literal::positive(p, vec![x.clone()])];
        let target = vec![
            Literal::positive(p, vec![a.clone()]),
            Literal::positive(q, vec![a.clone()]),
        ];
        assert!(subsumes(&subsumer, &target));
        assert!(!subsumes(&target, &subsumer));
    }

    #[test]
    fn subsumption_is_reflexive() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let x = ctx.var("X");
        let lits = vec![Literal::positive(p, vec![x])];
        assert!(subsumes(&lits, &lits));
    }

    #[test]
    fn multiset_matching_requires_distinct_targets() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 2);
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let a = ctx.const_("a");

        // p(X, X) | p(Y, Y) cannot map both literals onto the single p(a, a)
        let subsumer = vec![
            Literal::positive(p, vec![x.clone(), x.clone()]),
            Literal::positive(p, vec![y.clone(), y.clone()]),
        ];
        let target = vec![Literal::positive(p, vec![a.clone(), a.clone()])];
        assert!(!subsumes(&subsumer, &target));
    }

    #[test]
    fn forward_subsumption_deletes_with_premise() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let q = ctx.pred("q", 1);
        let x = ctx.var("X");
        let a = ctx.const_("a");

        let mut env = Env::new(ctx.interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        let general = store.register(Clause::new(vec![Literal::positive(p, vec![x.clone()])]));

        let mut indices = IndexManager::new();
        indices.request(IndexType::SimplifyingLiteral);
        indices.on_active_added(general, store.get(general), &[0], &env.interner, &env.kbo);

        let fresh = Clause::new(vec![
            Literal::positive(p, vec![a.clone()]),
            Literal::positive(q, vec![a.clone()]),
        ]);
        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        match Subsumption::new().simplify(&mut view, &fresh) {
            SimplifyOutcome::Delete { premises } => assert_eq!(premises, vec![general]),
            other => panic!("expected deletion, got {:?}", other),
        }
    }

    #[test]
    fn identical_clause_is_not_its_own_premise() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let a = ctx.const_("a");

        let mut env = Env::new(ctx.interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        let idx = store.register(Clause::new(vec![Literal::positive(p, vec![a.clone()])]));

        let mut indices = IndexManager::new();
        indices.request(IndexType::SimplifyingLiteral);
        indices.on_active_added(idx, store.get(idx), &[0], &env.interner, &env.kbo);

        // Simplifying the stored clause itself must not delete it
        let stored = store.get(idx).clone();
        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        assert!(matches!(
            Subsumption::new().simplify(&mut view, &stored),
            SimplifyOutcome::Keep
        ));
    }

    #[test]
    fn subsumption_resolution_cuts_literal() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let q = ctx.pred("q", 1);
        let a = ctx.const_("a");

        let mut env = Env::new(ctx.interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // Active: p(a)
        let unit = store.register(Clause::new(vec![Literal::positive(p, vec![a.clone()])]));

        let mut indices = IndexManager::new();
        indices.request(IndexType::SimplifyingLiteral);
        indices.on_active_added(unit, store.get(unit), &[0], &env.interner, &env.kbo);

        // Fresh: ~p(a) | q(a) resolves to q(a)
        let fresh = Clause::new(vec![
            Literal::negative(p, vec![a.clone()]),
            Literal::positive(q, vec![a.clone()]),
        ]);
        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        match Subsumption::new().simplify(&mut view, &fresh) {
            SimplifyOutcome::Replace {
                literals,
                rule,
                premises,
            } => {
                assert_eq!(rule, Rule::SubsumptionResolution);
                assert_eq!(premises, vec![unit]);
                assert_eq!(literals.len(), 1);
                assert_eq!(literals[0].predicate, q);
            }
            other => panic!("expected subsumption resolution, got {:?}", other),
        }
    }

    #[test]
    fn backward_subsumption_finds_instances() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let q = ctx.pred("q", 1);
        let x = ctx.var("X");
        let a = ctx.const_("a");

        let mut env = Env::new(ctx.interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // Active instance: p(a) | q(a)
        let victim = store.register(Clause::new(vec![
            Literal::positive(p, vec![a.clone()]),
            Literal::positive(q, vec![a.clone()]),
        ]));
        // Newly activated generalization: p(X)
        let general = store.register(Clause::new(vec![Literal::positive(p, vec![x.clone()])]));

        let mut indices = IndexManager::new();
        indices.request(IndexType::SimplifyingLiteral);
        indices.on_active_added(victim, store.get(victim), &[0, 1], &env.interner, &env.kbo);

        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        let results = Subsumption::new().perform(&mut view, general);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].victim, victim);
        assert!(results[0].replacement.is_none());
    }
}
