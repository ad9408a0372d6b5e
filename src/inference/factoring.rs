//! Factoring and equality resolution.

use super::{collect_except, dedup_literals, Engine, GeneratingRule, NewClause, View};
use crate::env::ProverResult;
use crate::fol::Rule;
use crate::index::IndexManager;
use crate::unification::{unify_args, unify_literals};

/// Factoring: unify two selected literals of the same polarity within the
/// given clause and keep one copy.
pub struct Factoring;

impl Factoring {
    pub fn new() -> Self {
        Factoring
    }
}

impl Default for Factoring {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Factoring {
    fn name(&self) -> &'static str {
        "factoring"
    }

    fn attach(&mut self, _indices: &mut IndexManager) {}

    fn detach(&mut self, _indices: &mut IndexManager) -> ProverResult<()> {
        Ok(())
    }
}

impl GeneratingRule for Factoring {
    fn generate(&self, view: &mut View<'_>, given: usize, selected: &[usize]) -> Vec<NewClause> {
        let mut children = Vec::new();
        let clause = view.clauses.get(given);

        for (si, &i) in selected.iter().enumerate() {
            for &j in &selected[si + 1..] {
                let l1 = &clause.literals[i];
                let l2 = &clause.literals[j];
                if l1.polarity != l2.polarity || l1.predicate != l2.predicate {
                    continue;
                }
                let Ok(mgu) = unify_literals(l1, l2) else {
                    continue;
                };
                let literals = dedup_literals(collect_except(&clause.literals, &[j], &mgu));
                view.env.statistics.factorings += 1;
                children.push(NewClause {
                    literals,
                    rule: Rule::Factoring,
                    premises: vec![given],
                });
            }
        }
        children
    }
}

/// Equality resolution: from `s != t | C` with unifiable `s, t` derive
/// `C * mgu(s, t)`.
pub struct EqualityResolution;

impl EqualityResolution {
    pub fn new() -> Self {
        EqualityResolution
    }
}

impl Default for EqualityResolution {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for EqualityResolution {
    fn name(&self) -> &'static str {
        "equality_resolution"
    }

    fn attach(&mut self, _indices: &mut IndexManager) {}

    fn detach(&mut self, _indices: &mut IndexManager) -> ProverResult<()> {
        Ok(())
    }
}

impl GeneratingRule for EqualityResolution {
    fn generate(&self, view: &mut View<'_>, given: usize, selected: &[usize]) -> Vec<NewClause> {
        let mut children = Vec::new();
        let clause = view.clauses.get(given);

        for &i in selected {
            let lit = &clause.literals[i];
            if lit.polarity || !lit.is_equality(&view.env.interner) {
                continue;
            }
            let Ok(mgu) = unify_args(&lit.args[..1], &lit.args[1..]) else {
                continue;
            };
            let literals = dedup_literals(collect_except(&clause.literals, &[i], &mgu));
            view.env.statistics.equality_resolutions += 1;
            children.push(NewClause {
                literals,
                rule: Rule::EqualityResolution,
                premises: vec![given],
            });
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, Limits};
    use crate::fol::{Clause, Constant, Interner, Literal, PredicateSymbol, Term, Variable};
    use crate::saturation::ClauseStore;

    fn make_view<'a>(
        store: &'a ClauseStore,
        indices: &'a IndexManager,
        env: &'a mut Env,
    ) -> View<'a> {
        View {
            clauses: store,
            indices,
            env,
        }
    }

    #[test]
    fn factoring_merges_unifiable_literals() {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("p"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));

        let mut env = Env::new(interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // p(X) | p(a)
        let idx = store.register(Clause::new(vec![
            Literal::positive(p, vec![x]),
            Literal::positive(p, vec![a.clone()]),
        ]));

        let indices = IndexManager::new();
        let mut view = make_view(&store, &indices, &mut env);
        let children = Factoring::new().generate(&mut view, idx, &[0, 1]);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].literals.len(), 1);
        assert_eq!(children[0].literals[0].args[0], a);
    }

    #[test]
    fn equality_resolution_removes_trivializable_disequality() {
        let mut interner = Interner::new();
        let eq = PredicateSymbol::new(interner.intern_predicate("="), 2);
        let q = PredicateSymbol::new(interner.intern_predicate("q"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));

        let mut env = Env::new(interner, Limits::none(), 1);
        let mut store = ClauseStore::new();
        // X != a | q(X)
        let idx = store.register(Clause::new(vec![
            Literal::negative(eq, vec![x.clone(), a.clone()]),
            Literal::positive(q, vec![x.clone()]),
        ]));

        let indices = IndexManager::new();
        let mut view = make_view(&store, &indices, &mut env);
        let children = EqualityResolution::new().generate(&mut view, idx, &[0]);
        assert_eq!(children.len(), 1);
        // q(a)
        assert_eq!(children[0].literals.len(), 1);
        assert_eq!(children[0].literals[0].predicate, q);
        assert_eq!(children[0].literals[0].args[0], a);
    }
}
