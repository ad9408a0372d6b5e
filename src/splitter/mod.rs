//! AVATAR-style clause splitting.
//!
//! Each newly simplified clause is decomposed into variable-disjoint
//! components. Components are named by split levels: a component index
//! (modulo variable renaming) reuses names, new components allocate a
//! level pair `(2k, 2k+1)` where the even level names the component and
//! the odd level the negation of a ground unit component. The splitter
//! emits `~dep1 | ... | name(C1) | name(C2) | ...` to the branch selector;
//! model changes activate or deactivate component clauses, discard
//! dependent children, and replay conditional reductions.

pub mod branch_selector;
pub mod congruence;
pub mod sat;

pub use branch_selector::{BranchSelector, BranchStatus, ModelDiff};
pub use sat::{SatClause, SatLiteral};

use crate::env::{Env, ProverResult};
use crate::fol::{
    Clause, Derivation, Literal, Rule, SplitLevel, SplitSet, Substitution, Term, Variable,
};
use crate::saturation::ClauseStore;
use branch_selector::literal_for_level;
use std::collections::HashMap;

/// A conditional reduction: `clause` was reduced while the recording level
/// was active and must be restored if it deactivates.
#[derive(Debug, Clone, Copy)]
pub struct ReductionRecord {
    pub clause: usize,
    pub timestamp: u64,
}

/// Per-level bookkeeping.
#[derive(Debug)]
pub struct SplitRecord {
    /// Clause id of the component clause introduced on activation
    pub component: usize,
    /// Clauses depending on this level, discarded on deactivation
    pub children: Vec<usize>,
    /// Conditional reductions to replay on deactivation
    pub reduced: Vec<ReductionRecord>,
    pub active: bool,
}

/// What `on_all_processed` decided.
#[derive(Debug)]
pub enum SplitterOutcome {
    /// No model change was needed
    Quiet,
    /// The splitting clauses are unsatisfiable: refutation
    Refutation,
    /// The model changed
    Changed {
        /// Component clause ids to introduce into the clause stream
        activate: Vec<usize>,
        /// Clause ids to remove from every container
        remove: Vec<usize>,
        /// Conditional reductions to replay, newest first
        thaw: Vec<ReductionRecord>,
        /// Parked clauses to offer for splitting again
        reconsider: Vec<usize>,
    },
}

pub struct Splitter {
    /// Split records indexed by level; None for unused odd partners
    db: Vec<Option<SplitRecord>>,
    /// Canonical component form -> even level of its positive form
    component_names: HashMap<Vec<Literal>, SplitLevel>,
    selector: BranchSelector,
    /// Ground unit (in)equality components, consulted by the CC check
    eq_components: Vec<(SplitLevel, Literal)>,
    clauses_added: bool,
    have_branch_refutation: bool,
    fast_restart: bool,
    /// Clauses parked while a branch refutation is pending
    fast_clauses: Vec<usize>,
    reduction_counter: u64,
}

impl Splitter {
    pub fn new(fast_restart: bool, congruence_closure: bool, congruence_model: bool) -> Self {
        Splitter {
            db: Vec::new(),
            component_names: HashMap::new(),
            selector: BranchSelector::new(congruence_closure, congruence_model),
            eq_components: Vec::new(),
            clauses_added: false,
            have_branch_refutation: false,
            fast_restart,
            fast_clauses: Vec::new(),
            reduction_counter: 0,
        }
    }

    /// Is every level of the set currently selected?
    pub fn all_active(&self, splits: &SplitSet) -> bool {
        splits.all(|level| self.selector.is_selected(level))
    }

    /// Levels currently selected (for invariant checking).
    pub fn active_levels(&self) -> Vec<SplitLevel> {
        (0..self.db.len() as SplitLevel)
            .filter(|&l| self.selector.is_selected(l) && self.db[l as usize].is_some())
            .collect()
    }

    /// Component clause id for a level, if the level is in use.
    pub fn component_clause(&self, level: SplitLevel) -> Option<usize> {
        self.db.get(level as usize)?.as_ref().map(|r| r.component)
    }

    /// Milliseconds the branch selector spent in the BDD engine.
    pub fn bdd_time_ms(&self) -> u64 {
        self.selector.bdd_time_ms()
    }

    /// Try to split a freshly simplified clause.
    ///
    /// Returns true when the clause was absorbed into the splitter: its
    /// components were named and a splitting clause was handed to the
    /// branch selector. A non-splittable clause returns false and stays in
    /// the ordinary pipeline.
    pub fn split(
        &mut self,
        clause_idx: usize,
        store: &mut ClauseStore,
        env: &mut Env,
    ) -> ProverResult<bool> {
        let clause = store.get(clause_idx);
        if clause.is_empty() || clause.derivation.rule == Rule::SplitComponent {
            return Ok(false);
        }

        if self.have_branch_refutation && self.fast_restart {
            self.fast_clauses.push(clause_idx);
            return Ok(true);
        }

        let components = partition_components(clause);
        if components.len() == 1 {
            // Non-splittable. Ground unit clauses are still named so the
            // branch selector and the congruence check see them.
            if !(clause.literals.len() == 1 && clause.literals[0].is_ground()) {
                return Ok(false);
            }
        }

        let dep_splits = clause.split_set.clone();
        let component_literals: Vec<Vec<Literal>> = components
            .iter()
            .map(|idxs| idxs.iter().map(|&i| clause.literals[i].clone()).collect())
            .collect();

        let mut sat_literals: Vec<SatLiteral> = dep_splits
            .iter()
            .map(|level| literal_for_level(level).negated())
            .collect();
        for literals in component_literals {
            let level = self.name_component(literals, clause_idx, store, env);
            sat_literals.push(literal_for_level(level));
        }

        self.selector
            .add_splitting_clause(SatClause::new(sat_literals), &env.limits)?;
        self.clauses_added = true;
        env.statistics.split_clauses += 1;
        Ok(true)
    }

    /// Name a component, reusing the component index when possible.
    fn name_component(
        &mut self,
        literals: Vec<Literal>,
        orig: usize,
        store: &mut ClauseStore,
        env: &mut Env,
    ) -> SplitLevel {
        // Ground unit components are keyed by their positive form; the
        // negative form lives at the odd partner level.
        let ground_negative =
            literals.len() == 1 && literals[0].is_ground() && !literals[0].polarity;
        let key_literals = if ground_negative {
            vec![literals[0].complement()]
        } else {
            literals.clone()
        };
        let key = canonical_form(&key_literals, env);

        let even = match self.component_names.get(&key) {
            Some(&level) => level,
            None => {
                let level = (self.db.len() as SplitLevel).div_ceil(2) * 2;
                self.component_names.insert(key, level);
                level
            }
        };
        let level = if ground_negative { even + 1 } else { even };

        if self.record(level).is_none() {
            self.install_record(level, literals, orig, store, env);
        }
        level
    }

    fn record(&self, level: SplitLevel) -> Option<&SplitRecord> {
        self.db.get(level as usize).and_then(|r| r.as_ref())
    }

    fn record_mut(&mut self, level: SplitLevel) -> Option<&mut SplitRecord> {
        self.db.get_mut(level as usize).and_then(|r| r.as_mut())
    }

    fn install_record(
        &mut self,
        level: SplitLevel,
        literals: Vec<Literal>,
        orig: usize,
        store: &mut ClauseStore,
        env: &mut Env,
    ) {
        let component = Clause::derived(
            literals.clone(),
            store.get(orig).age,
            SplitSet::singleton(level),
            Derivation::new(Rule::SplitComponent, vec![orig]),
        );
        let component_idx = store.register(component);

        if self.db.len() <= level as usize {
            self.db.resize_with(level as usize + 2, || None);
        }
        self.db[level as usize] = Some(SplitRecord {
            component: component_idx,
            children: Vec::new(),
            reduced: Vec::new(),
            active: false,
        });
        self.selector.register_level(level);
        env.statistics.split_components += 1;

        if literals.len() == 1 && literals[0].is_ground() && literals[0].is_equality(&env.interner)
        {
            self.eq_components.push((level, literals[0].clone()));
        }
    }

    /// Track a clause that depends on split levels: it becomes a child of
    /// every level it depends on.
    pub fn on_clause_registered(&mut self, idx: usize, splits: &SplitSet) {
        for level in splits.iter() {
            if let Some(record) = self.record_mut(level) {
                if record.component != idx {
                    record.children.push(idx);
                }
            }
        }
    }

    /// Record a conditional reduction of `victim` justified by clauses
    /// depending on `levels`. Returns the reduction timestamp.
    pub fn record_reduction(&mut self, victim: usize, levels: &SplitSet) -> u64 {
        self.reduction_counter += 1;
        let timestamp = self.reduction_counter;
        for level in levels.iter() {
            if let Some(record) = self.record_mut(level) {
                record.reduced.push(ReductionRecord {
                    clause: victim,
                    timestamp,
                });
            }
        }
        timestamp
    }

    /// An empty clause with a non-empty split set: a branch conflict. The
    /// negation of its dependencies becomes a splitting clause.
    pub fn handle_empty_clause(&mut self, splits: &SplitSet, env: &mut Env) -> ProverResult<()> {
        debug_assert!(!splits.is_empty());
        let literals: Vec<SatLiteral> = splits
            .iter()
            .map(|level| literal_for_level(level).negated())
            .collect();
        self.selector
            .add_splitting_clause(SatClause::new(literals), &env.limits)?;
        self.clauses_added = true;
        self.have_branch_refutation = true;
        env.statistics.split_clauses += 1;
        Ok(())
    }

    /// Recompute the model after a round of saturation if splitting
    /// clauses were added, and report the resulting changes.
    pub fn on_all_processed(&mut self, env: &mut Env) -> ProverResult<SplitterOutcome> {
        if !self.clauses_added {
            return Ok(SplitterOutcome::Quiet);
        }
        self.clauses_added = false;
        self.have_branch_refutation = false;

        env.statistics.sat_recomputations += 1;
        let (status, diff) = self.selector.recompute_model(&self.eq_components, env)?;
        if status == BranchStatus::Refutation {
            return Ok(SplitterOutcome::Refutation);
        }

        let mut remove = Vec::new();
        let mut thaw = Vec::new();
        for &level in &diff.deactivated {
            if let Some(record) = self.record_mut(level) {
                record.active = false;
                remove.push(record.component);
                remove.append(&mut record.children);
                thaw.append(&mut record.reduced);
            }
        }
        // Replay reductions newest first
        thaw.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut activate = Vec::new();
        for &level in &diff.activated {
            if let Some(record) = self.record_mut(level) {
                record.active = true;
                activate.push(record.component);
            }
        }

        let reconsider = std::mem::take(&mut self.fast_clauses);

        if remove.is_empty() && thaw.is_empty() && activate.is_empty() && reconsider.is_empty() {
            return Ok(SplitterOutcome::Quiet);
        }
        Ok(SplitterOutcome::Changed {
            activate,
            remove,
            thaw,
            reconsider,
        })
    }
}

/// Partition the clause's literal indices into maximal variable-disjoint
/// groups. Ground literals form singleton components.
fn partition_components(clause: &Clause) -> Vec<Vec<usize>> {
    let n = clause.literals.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut Vec<usize>, mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut var_owner: HashMap<crate::fol::VariableId, usize> = HashMap::new();
    for (i, lit) in clause.literals.iter().enumerate() {
        let mut vars = std::collections::HashSet::new();
        lit.collect_variables(&mut vars);
        for var in vars {
            match var_owner.get(&var) {
                Some(&j) => {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[ri] = rj;
                    }
                }
                None => {
                    var_owner.insert(var, i);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }
    let mut components: Vec<Vec<usize>> = groups.into_values().collect();
    components.sort_by_key(|g| g[0]);
    components
}

/// Canonical form of a component: literals sorted by a variable-blind
/// structural key, variables renamed in order of first occurrence.
fn canonical_form(literals: &[Literal], env: &mut Env) -> Vec<Literal> {
    let mut sorted: Vec<&Literal> = literals.iter().collect();
    sorted.sort_by_key(|lit| structural_key(lit));

    let mut mapping = Substitution::new();
    let mut next = 0usize;
    let mut out = Vec::with_capacity(sorted.len());
    for lit in sorted {
        let mut canonical = lit.clone();
        for arg in &mut canonical.args {
            *arg = canonicalize_term(arg, &mut mapping, &mut next, env);
        }
        out.push(canonical);
    }
    out
}

fn canonicalize_term(
    term: &Term,
    mapping: &mut Substitution,
    next: &mut usize,
    env: &mut Env,
) -> Term {
    match term {
        Term::Variable(v) => {
            if let Some(bound) = mapping.get(v.id) {
                return bound.clone();
            }
            let name = format!("K{}", next);
            *next += 1;
            let fresh = Term::Variable(Variable::new(env.interner.intern_variable(&name)));
            mapping.insert(*v, fresh.clone());
            fresh
        }
        Term::Constant(_) => term.clone(),
        Term::Function(f, args) => Term::Function(
            *f,
            args.iter()
                .map(|arg| canonicalize_term(arg, mapping, next, env))
                .collect(),
        ),
    }
}

/// Structural key ignoring variable identity.
fn structural_key(lit: &Literal) -> (u32, bool, String) {
    let mut repr = String::new();
    for arg in &lit.args {
        term_key(arg, &mut repr);
    }
    (lit.predicate.id.as_u32(), !lit.polarity, repr)
}

fn term_key(term: &Term, out: &mut String) {
    use std::fmt::Write;
    match term {
        Term::Variable(_) => out.push('*'),
        Term::Constant(c) => {
            let _ = write!(out, "c{}", c.id.as_u32());
        }
        Term::Function(f, args) => {
            let _ = write!(out, "f{}(", f.id.as_u32());
            for arg in args {
                term_key(arg, out);
            }
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Limits;
    use crate::fol::{Constant, Interner, PredicateSymbol, Term, Variable};

    struct Ctx {
        env: Env,
        store: ClauseStore,
    }

    impl Ctx {
        fn new() -> Self {
            Ctx {
                env: Env::new(Interner::new(), Limits::none(), 1),
                store: ClauseStore::new(),
            }
        }

        fn const_(&mut self, name: &str) -> Term {
            Term::Constant(Constant::new(self.env.interner.intern_constant(name)))
        }

        fn var(&mut self, name: &str) -> Term {
            Term::Variable(Variable::new(self.env.interner.intern_variable(name)))
        }

        fn pred(&mut self, name: &str, arity: u8) -> PredicateSymbol {
            PredicateSymbol::new(self.env.interner.intern_predicate(name), arity)
        }
    }

    #[test]
    fn ground_literals_are_separate_components() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let q = ctx.pred("q", 1);
        let a = ctx.const_("a");
        let clause = Clause::new(vec![
            Literal::positive(p, vec![a.clone()]),
            Literal::positive(q, vec![a.clone()]),
        ]);
        let components = partition_components(&clause);
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn shared_variables_join_components() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 2);
        let q = ctx.pred("q", 1);
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let clause = Clause::new(vec![
            Literal::positive(p, vec![x.clone(), y.clone()]),
            Literal::positive(q, vec![y.clone()]),
            Literal::positive(q, vec![x.clone()]),
        ]);
        let components = partition_components(&clause);
        assert_eq!(components.len(), 1);
    }

    #[test]
    fn component_index_reuses_names_modulo_renaming() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let x = ctx.var("X");
        let y = ctx.var("Y");

        let c1 = vec![Literal::positive(p, vec![x.clone()])];
        let c2 = vec![Literal::positive(p, vec![y.clone()])];
        assert_eq!(canonical_form(&c1, &mut ctx.env), canonical_form(&c2, &mut ctx.env));
    }

    #[test]
    fn splitting_a_two_component_clause() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let q = ctx.pred("q", 1);
        let x = ctx.var("X");
        let y = ctx.var("Y");
        // p(X) | q(Y) splits into two non-ground components
        let idx = ctx.store.register(Clause::new(vec![
            Literal::positive(p, vec![x]),
            Literal::positive(q, vec![y]),
        ]));

        let mut splitter = Splitter::new(false, false, false);
        assert!(splitter.split(idx, &mut ctx.store, &mut ctx.env).unwrap());
        assert_eq!(ctx.env.statistics.split_components, 2);

        match splitter.on_all_processed(&mut ctx.env).unwrap() {
            SplitterOutcome::Changed { activate, .. } => {
                // At least one component is activated by the model
                assert!(!activate.is_empty());
                for idx in activate {
                    let component = ctx.store.get(idx);
                    assert_eq!(component.derivation.rule, Rule::SplitComponent);
                    assert_eq!(component.split_set.len(), 1);
                }
            }
            other => panic!("expected model change, got {:?}", other),
        }
    }

    #[test]
    fn non_splittable_clause_flows_through() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 2);
        let x = ctx.var("X");
        let idx = ctx
            .store
            .register(Clause::new(vec![Literal::positive(p, vec![x.clone(), x])]));

        let mut splitter = Splitter::new(false, false, false);
        assert!(!splitter.split(idx, &mut ctx.store, &mut ctx.env).unwrap());
    }

    #[test]
    fn ground_unit_is_named_and_activated() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let a = ctx.const_("a");
        let idx = ctx
            .store
            .register(Clause::new(vec![Literal::positive(p, vec![a])]));

        let mut splitter = Splitter::new(false, false, false);
        assert!(splitter.split(idx, &mut ctx.store, &mut ctx.env).unwrap());

        match splitter.on_all_processed(&mut ctx.env).unwrap() {
            SplitterOutcome::Changed { activate, .. } => {
                assert_eq!(activate.len(), 1);
                assert!(splitter.all_active(&ctx.store.get(activate[0]).split_set));
            }
            other => panic!("expected activation, got {:?}", other),
        }
    }

    #[test]
    fn branch_conflict_deactivates_level() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("p", 1);
        let a = ctx.const_("a");
        let idx = ctx
            .store
            .register(Clause::new(vec![Literal::positive(p, vec![a])]));

        let mut splitter = Splitter::new(false, false, false);
        assert!(splitter.split(idx, &mut ctx.store, &mut ctx.env).unwrap());
        let level = match splitter.on_all_processed(&mut ctx.env).unwrap() {
            SplitterOutcome::Changed { activate, .. } => {
                ctx.store.get(activate[0]).split_set.iter().next().unwrap()
            }
            other => panic!("expected activation, got {:?}", other),
        };

        // A conflict depending only on this level refutes the branch;
        // since the level was introduced by a unit splitting clause, the
        // whole problem becomes unsatisfiable.
        splitter.handle_empty_clause(&SplitSet::singleton(level), &mut ctx.env).unwrap();
        assert!(matches!(
            splitter.on_all_processed(&mut ctx.env).unwrap(),
            SplitterOutcome::Refutation
        ));
    }
}
