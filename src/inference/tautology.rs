//! Intrinsic clause simplifications: tautology deletion, duplicate-literal
//! removal, and trivial-inequality removal. These need no indices.

use super::{Engine, ForwardSimplifier, SimplifyOutcome, View};
use crate::env::ProverResult;
use crate::fol::{Clause, Rule};
use crate::index::IndexManager;

pub struct TautologyDeletion;

impl TautologyDeletion {
    pub fn new() -> Self {
        TautologyDeletion
    }
}

impl Default for TautologyDeletion {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TautologyDeletion {
    fn name(&self) -> &'static str {
        "tautology_deletion"
    }

    fn attach(&mut self, _indices: &mut IndexManager) {}

    fn detach(&mut self, _indices: &mut IndexManager) -> ProverResult<()> {
        Ok(())
    }
}

impl ForwardSimplifier for TautologyDeletion {
    fn simplify(&self, view: &mut View<'_>, clause: &Clause) -> SimplifyOutcome {
        let interner = &view.env.interner;

        // Propositional tautology: complementary literals
        for i in 0..clause.literals.len() {
            for j in (i + 1)..clause.literals.len() {
                let (a, b) = (&clause.literals[i], &clause.literals[j]);
                if a.polarity != b.polarity && a.predicate == b.predicate && a.args == b.args {
                    view.env.statistics.simple_tautologies += 1;
                    return SimplifyOutcome::Delete { premises: vec![] };
                }
            }
        }

        // Equational tautology: s = s
        if clause
            .literals
            .iter()
            .any(|lit| lit.polarity && lit.is_equality(interner) && lit.args[0] == lit.args[1])
        {
            view.env.statistics.equational_tautologies += 1;
            return SimplifyOutcome::Delete { premises: vec![] };
        }

        // Duplicate literals
        let mut seen = std::collections::HashSet::new();
        let deduped: Vec<_> = clause
            .literals
            .iter()
            .filter(|lit| seen.insert((*lit).clone()))
            .cloned()
            .collect();
        if deduped.len() < clause.literals.len() {
            view.env.statistics.duplicate_literals += clause.literals.len() - deduped.len();
            return SimplifyOutcome::Replace {
                literals: deduped,
                rule: Rule::DuplicateLiteralRemoval,
                premises: vec![],
            };
        }

        // Trivial inequalities: s != s
        let kept: Vec<_> = clause
            .literals
            .iter()
            .filter(|lit| {
                !(!lit.polarity && lit.is_equality(interner) && lit.args[0] == lit.args[1])
            })
            .cloned()
            .collect();
        if kept.len() < clause.literals.len() {
            view.env.statistics.trivial_inequalities += clause.literals.len() - kept.len();
            return SimplifyOutcome::Replace {
                literals: kept,
                rule: Rule::TrivialInequalityRemoval,
                premises: vec![],
            };
        }

        SimplifyOutcome::Keep
    }
}
