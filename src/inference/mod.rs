//! Inference engines.
//!
//! Engines come in three capabilities: generating rules produce new clauses
//! from the given clause and the active set; forward simplifiers reduce a
//! fresh clause against the active set; backward simplifiers use a newly
//! activated clause to reduce older ones. Every engine follows the
//! attach/detach lifecycle: it requests the indices it needs from the
//! manager during attach and releases them during detach, and the
//! saturation algorithm guarantees detach on every exit path.

pub mod demodulation;
pub mod factoring;
pub mod resolution;
pub mod subsumption;
pub mod superposition;
pub mod tautology;

pub use demodulation::Demodulation;
pub use factoring::{EqualityResolution, Factoring};
pub use resolution::BinaryResolution;
pub use subsumption::Subsumption;
pub use superposition::Superposition;
pub use tautology::TautologyDeletion;

use crate::env::{Env, ProverResult};
use crate::fol::{Clause, Literal, Rule, Substitution, Variable};
use crate::index::IndexManager;
use crate::saturation::ClauseStore;

/// Read-view of the proof state handed to engines at call time.
pub struct View<'a> {
    pub clauses: &'a ClauseStore,
    pub indices: &'a IndexManager,
    pub env: &'a mut Env,
}

/// A freshly derived clause before registration: the algorithm assigns its
/// age, unions the premise split sets, and orients its equalities.
#[derive(Debug, Clone)]
pub struct NewClause {
    pub literals: Vec<Literal>,
    pub rule: Rule,
    pub premises: Vec<usize>,
}

/// Outcome of forward simplification.
#[derive(Debug, Clone)]
pub enum SimplifyOutcome {
    /// The clause survives unchanged
    Keep,
    /// The clause is redundant; `premises` are the clauses that justify
    /// deletion (empty for intrinsic redundancy such as tautologies)
    Delete { premises: Vec<usize> },
    /// The clause is replaced by a simpler one
    Replace {
        literals: Vec<Literal>,
        rule: Rule,
        premises: Vec<usize>,
    },
}

/// One backward-simplification result: `victim` must leave its container;
/// the replacement (if any) is re-enqueued.
#[derive(Debug, Clone)]
pub struct BackwardSimplification {
    pub victim: usize,
    pub replacement: Option<(Vec<Literal>, Rule)>,
}

/// Common lifecycle of all engines.
pub trait Engine {
    fn name(&self) -> &'static str;

    /// Request required indices from the manager.
    fn attach(&mut self, indices: &mut IndexManager);

    /// Release requested indices.
    fn detach(&mut self, indices: &mut IndexManager) -> ProverResult<()>;
}

/// A generating inference rule.
pub trait GeneratingRule: Engine {
    /// Derive children from the given clause with the selected literals.
    fn generate(&self, view: &mut View<'_>, given: usize, selected: &[usize]) -> Vec<NewClause>;
}

/// A forward simplifier.
pub trait ForwardSimplifier: Engine {
    /// Try to delete or replace `clause` using active clauses.
    fn simplify(&self, view: &mut View<'_>, clause: &Clause) -> SimplifyOutcome;
}

/// A backward simplifier.
pub trait BackwardSimplifier: Engine {
    /// Reduce active/passive clauses using the newly activated `premise`.
    fn perform(&self, view: &mut View<'_>, premise: usize) -> Vec<BackwardSimplification>;
}

/// Rename all variables of the literals apart from every other clause in
/// the system, using a globally fresh suffix.
pub fn rename_apart(literals: &[Literal], env: &mut Env) -> Vec<Literal> {
    let tag = env.fresh_rename_tag();
    let mut mapping = Substitution::new();
    let mut renamed = Vec::with_capacity(literals.len());
    for lit in literals {
        let mut vars = std::collections::HashSet::new();
        lit.collect_variables(&mut vars);
        for var in vars {
            if mapping.get(var).is_none() {
                let fresh_name = format!("{}~{}", env.interner.resolve_variable(var), tag);
                let fresh = env.interner.intern_variable(&fresh_name);
                mapping.insert(
                    Variable::new(var),
                    crate::fol::Term::Variable(Variable::new(fresh)),
                );
            }
        }
        renamed.push(lit.apply_substitution(&mapping));
    }
    renamed
}

/// Collect the literals of `literals` except the listed indices, with the
/// substitution applied.
pub fn collect_except(literals: &[Literal], exclude: &[usize], subst: &Substitution) -> Vec<Literal> {
    literals
        .iter()
        .enumerate()
        .filter(|(i, _)| !exclude.contains(i))
        .map(|(_, lit)| lit.apply_substitution(subst))
        .collect()
}

/// Drop duplicate literals, keeping first occurrences.
pub fn dedup_literals(literals: Vec<Literal>) -> Vec<Literal> {
    let mut seen = std::collections::HashSet::new();
    literals
        .into_iter()
        .filter(|lit| seen.insert(lit.clone()))
        .collect()
}
