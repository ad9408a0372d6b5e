//! Binary resolution.

use super::{collect_except, dedup_literals, rename_apart, Engine, GeneratingRule, NewClause, View};
use crate::env::ProverResult;
use crate::fol::Rule;
use crate::index::{Binding, IndexManager, IndexType, QueryMode};
use crate::unification::unify_literals;

/// Binary resolution between selected literals of the given clause and
/// selected literals of active clauses, found through the generating
/// literal index.
pub struct BinaryResolution;

impl BinaryResolution {
    pub fn new() -> Self {
        BinaryResolution
    }
}

impl Default for BinaryResolution {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for BinaryResolution {
    fn name(&self) -> &'static str {
        "binary_resolution"
    }

    fn attach(&mut self, indices: &mut IndexManager) {
        indices.request(IndexType::GeneratingLiteral);
    }

    fn detach(&mut self, indices: &mut IndexManager) -> ProverResult<()> {
        indices.release(IndexType::GeneratingLiteral)
    }
}

impl GeneratingRule for BinaryResolution {
    fn generate(&self, view: &mut View<'_>, given: usize, selected: &[usize]) -> Vec<NewClause> {
        let mut children = Vec::new();
        let Some(index) = view.indices.get(IndexType::GeneratingLiteral) else {
            return children;
        };

        let given_clause = view.clauses.get(given);
        for &i in selected {
            let lit = &given_clause.literals[i];
            let query = lit.complement();
            let candidates: Vec<Binding> = index
                .tree()
                .query_literal(&query, QueryMode::Unification)
                .cloned()
                .collect();

            for binding in candidates {
                let partner = view.clauses.get(binding.clause);
                let partner_lits = rename_apart(&partner.literals, view.env);
                let partner_lit = &partner_lits[binding.literal];

                debug_assert_eq!(partner_lit.polarity, !lit.polarity);
                let Ok(mgu) = unify_literals(lit, &partner_lit.complement()) else {
                    continue;
                };

                let mut literals = collect_except(&given_clause.literals, &[i], &mgu);
                literals.extend(collect_except(&partner_lits, &[binding.literal], &mgu));
                let literals = dedup_literals(literals);

                view.env.statistics.resolutions += 1;
                children.push(NewClause {
                    literals,
                    rule: Rule::Resolution,
                    premises: vec![given, binding.clause],
                });
            }
        }
        children
    }
}

// Convenience used by unit tests of the rule
#[cfg(test)]
pub fn resolve_pair(
    view: &mut View<'_>,
    c1: usize,
    sel1: &[usize],
) -> Vec<NewClause> {
    BinaryResolution::new().generate(view, c1, sel1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, Limits};
    use crate::fol::{Clause, Constant, Interner, Literal, PredicateSymbol, Term, Variable};
    use crate::saturation::ClauseStore;

    #[test]
    fn ground_resolution_derives_empty_clause() {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("p"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));

        let mut env = Env::new(interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        let pos = store.register(Clause::new(vec![Literal::positive(p, vec![a.clone()])]));
        let neg = store.register(Clause::new(vec![Literal::negative(p, vec![a.clone()])]));

        let mut indices = IndexManager::new();
        indices.request(IndexType::GeneratingLiteral);
        indices.on_active_added(neg, store.get(neg), &[0], &env.interner, &env.kbo);

        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        let children = resolve_pair(&mut view, pos, &[0]);
        assert_eq!(children.len(), 1);
        assert!(children[0].literals.is_empty());
        assert_eq!(children[0].premises, vec![pos, neg]);
    }

    #[test]
    fn resolution_instantiates_variables() {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("p"), 1);
        let q = PredicateSymbol::new(interner.intern_predicate("q"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));

        let mut env = Env::new(interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // p(X)
        let px = store.register(Clause::new(vec![Literal::positive(p, vec![x.clone()])]));
        // ~p(a) | q(a)
        let partner = store.register(Clause::new(vec![
            Literal::negative(p, vec![a.clone()]),
            Literal::positive(q, vec![a.clone()]),
        ]));

        let mut indices = IndexManager::new();
        indices.request(IndexType::GeneratingLiteral);
        indices.on_active_added(partner, store.get(partner), &[0, 1], &env.interner, &env.kbo);

        let mut view = View {
            clauses: &store,
            indices: &indices,
            env: &mut env,
        };
        let children = resolve_pair(&mut view, px, &[0]);
        assert_eq!(children.len(), 1);
        // Resolvent is q(a)
        assert_eq!(children[0].literals.len(), 1);
        assert_eq!(children[0].literals[0].predicate, q);
        assert_eq!(children[0].literals[0].args[0], a);
    }
}
