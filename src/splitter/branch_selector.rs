//! Branch selection over component names.
//!
//! Component names map to SAT variables: level `2k` is the positive
//! literal of variable `k`, level `2k+1` the negative one. Splitting
//! clauses feed two reasoners: an incremental conjunction of BDDs that
//! cheaply detects propositional unsatisfiability of the accumulated
//! clauses, and a DPLL solver that produces the branch model. After each
//! batch the selector recomputes the model, runs the congruence-closure
//! check on the ground (in)equality components the model selects, feeds
//! conflicts back as learned clauses, and reports the levels that changed
//! activation.

use super::congruence::{CcStatus, CongruenceClosure};
use super::sat::{SatClause, SatLiteral, SatSolver, SolverStatus};
use crate::bdd::{Bdd, BddConjunction, NodeId};
use crate::env::{Env, Limits, ProverResult};
use crate::fol::{Literal, SplitLevel};
use std::collections::BTreeSet;

/// SAT literal naming a split level.
pub fn literal_for_level(level: SplitLevel) -> SatLiteral {
    SatLiteral::new(level / 2, level % 2 == 0)
}

/// Split level named by a SAT literal.
pub fn level_for_literal(lit: SatLiteral) -> SplitLevel {
    lit.var * 2 + if lit.positive { 0 } else { 1 }
}

/// Result of recomputing the model.
#[derive(Debug, Default, Clone)]
pub struct ModelDiff {
    pub activated: Vec<SplitLevel>,
    pub deactivated: Vec<SplitLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStatus {
    /// A model was found; the diff applies
    Model,
    /// The splitting clauses are propositionally unsatisfiable: refutation
    Refutation,
}

/// Decides which component names are currently selected.
pub struct BranchSelector {
    solver: SatSolver,
    bdd: Bdd,
    /// Conjunction of all splitting clauses as BDDs
    prop: BddConjunction,
    selected: BTreeSet<SplitLevel>,
    /// Levels that actually name components (odd partners may be unused)
    used_levels: BTreeSet<SplitLevel>,
    dp: CongruenceClosure,
    dp_model: CongruenceClosure,
    congruence_closure: bool,
    congruence_model: bool,
}

impl BranchSelector {
    pub fn new(congruence_closure: bool, congruence_model: bool) -> Self {
        BranchSelector {
            solver: SatSolver::new(),
            bdd: Bdd::new(),
            prop: BddConjunction::new(),
            selected: BTreeSet::new(),
            used_levels: BTreeSet::new(),
            dp: CongruenceClosure::new(),
            dp_model: CongruenceClosure::new(),
            congruence_closure,
            congruence_model,
        }
    }

    /// Register a level that names a component.
    pub fn register_level(&mut self, level: SplitLevel) {
        self.used_levels.insert(level);
        self.solver.ensure_var(level / 2);
    }

    pub fn is_selected(&self, level: SplitLevel) -> bool {
        self.selected.contains(&level)
    }

    /// Milliseconds spent in the BDD engine
    pub fn bdd_time_ms(&self) -> u64 {
        self.bdd.time_spent_ms()
    }

    fn clause_to_bdd(&mut self, clause: &SatClause, limits: &Limits) -> ProverResult<NodeId> {
        let mut node = Bdd::FALSE;
        for lit in &clause.literals {
            let atom = self.bdd.atomic(lit.var, lit.positive);
            node = self.bdd.disjunction(node, atom, limits)?;
        }
        Ok(node)
    }

    /// Add a splitting clause to both reasoners.
    pub fn add_splitting_clause(
        &mut self,
        clause: SatClause,
        limits: &Limits,
    ) -> ProverResult<()> {
        let node = self.clause_to_bdd(&clause, limits)?;
        self.prop.add_node(&self.bdd, node);
        self.solver.add_clause(clause);
        Ok(())
    }

    /// Recompute the model.
    ///
    /// `eq_components` lists the ground unit (in)equality components as
    /// `(level, literal)`, consulted by the congruence check.
    pub fn recompute_model(
        &mut self,
        eq_components: &[(SplitLevel, Literal)],
        env: &Env,
    ) -> ProverResult<(BranchStatus, ModelDiff)> {
        loop {
            // The BDD conjunction latches as soon as the splitting clauses
            // become propositionally unsatisfiable.
            if self.prop.is_unsat() {
                return Ok((BranchStatus::Refutation, ModelDiff::default()));
            }
            if self.solver.solve() == SolverStatus::Unsatisfiable {
                return Ok((BranchStatus::Refutation, ModelDiff::default()));
            }

            if !self.congruence_closure {
                break;
            }

            // Assert the selected ground (in)equalities and look for a
            // semantic conflict.
            self.dp.reset();
            let mut asserted = false;
            for (level, lit) in eq_components {
                if !self.level_in_model(*level) || !lit.is_equality(&env.interner) {
                    continue;
                }
                asserted = true;
                if lit.polarity {
                    self.dp.assert_equality(&lit.args[0], &lit.args[1], *level);
                } else {
                    self.dp.assert_disequality(&lit.args[0], &lit.args[1], *level);
                }
            }
            if !asserted {
                break;
            }
            match self.dp.check() {
                CcStatus::Consistent => break,
                CcStatus::Conflict(levels) => {
                    // Learn the negation of the conflicting selection
                    let literals = levels
                        .into_iter()
                        .map(|l| literal_for_level(l).negated())
                        .collect();
                    self.add_splitting_clause(SatClause::new(literals), &env.limits)?;
                }
            }
        }

        if self.congruence_model {
            self.refresh_polarity_advice(eq_components, env);
        }

        let mut now_selected = BTreeSet::new();
        for &level in &self.used_levels {
            if self.level_in_model(level) {
                now_selected.insert(level);
            }
        }

        let diff = ModelDiff {
            activated: now_selected.difference(&self.selected).copied().collect(),
            deactivated: self.selected.difference(&now_selected).copied().collect(),
        };
        self.selected = now_selected;
        Ok((BranchStatus::Model, diff))
    }

    fn level_in_model(&self, level: SplitLevel) -> bool {
        let value = self.solver.model_value(level / 2);
        if level % 2 == 0 {
            value
        } else {
            !value
        }
    }

    /// Feed positive equalities into the model-mode closure and advise the
    /// solver to prefer assignments it already entails.
    fn refresh_polarity_advice(&mut self, eq_components: &[(SplitLevel, Literal)], env: &Env) {
        self.dp_model.reset();
        for (level, lit) in eq_components {
            if lit.polarity && lit.is_equality(&env.interner) && self.level_in_model(*level) {
                self.dp_model
                    .assert_equality(&lit.args[0], &lit.args[1], *level);
            }
        }
        let _ = self.dp_model.check();
        for (level, lit) in eq_components {
            if !lit.is_equality(&env.interner) {
                continue;
            }
            if self.dp_model.are_equal(&lit.args[0], &lit.args[1]) {
                // Prefer the polarity that agrees with the entailed equality
                let prefer_even = lit.polarity;
                self.solver
                    .suggest_polarity(level / 2, prefer_even == (level % 2 == 0));
            }
        }
    }
}
