//! The given-clause main loop.
//!
//! Each round drains the unprocessed queue (forward-simplifying every
//! fresh clause and offering survivors to the splitter), lets the splitter
//! recompute its model, then selects the next given clause from passive,
//! re-simplifies it, activates it, generates inferences around it, and
//! backward-simplifies the rest of the system with it. Only the two budget
//! errors are caught at this boundary; everything else unwinds.

use super::containers::{ActiveSet, PassiveQueue, UnprocessedQueue};
use super::ClauseStore;
use crate::env::{Env, ProverError, ProverResult};
use crate::fol::{orient_clause_equalities, Clause, Derivation, Rule, SplitSet};
use crate::index::IndexManager;
use crate::inference::{
    BackwardSimplification, BackwardSimplifier, BinaryResolution, Demodulation, EqualityResolution,
    Factoring, ForwardSimplifier, GeneratingRule, NewClause, SimplifyOutcome, Subsumption,
    Superposition, TautologyDeletion, View,
};
use crate::selection::{LiteralSelector, SelectUniqueMaximal};
use crate::splitter::{Splitter, SplitterOutcome};
use crate::statistics::TerminationReason;
use std::collections::{HashMap, HashSet};

/// Where a clause currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Nowhere,
    Unprocessed,
    Passive,
    Active,
    /// Conditionally reduced, retained for thawing
    Frozen,
    /// Permanently gone
    Dead,
}

/// Configuration of one saturation run.
pub struct SaturationOptions {
    pub splitting: bool,
    pub fast_restart: bool,
    pub congruence_closure: bool,
    pub congruence_model: bool,
    pub weight_factor: u64,
    pub age_factor: u64,
    pub simplification_includes_passive: bool,
    pub selector: Box<dyn LiteralSelector>,
}

impl Default for SaturationOptions {
    fn default() -> Self {
        SaturationOptions {
            splitting: true,
            fast_restart: false,
            congruence_closure: true,
            congruence_model: false,
            weight_factor: 4,
            age_factor: 1,
            simplification_includes_passive: false,
            selector: Box::new(SelectUniqueMaximal),
        }
    }
}

enum SplitterRound {
    Quiet,
    Changed,
    Refuted,
}

/// The saturation engine. Owns the containers, the index manager, the
/// engines, and (optionally) the splitter.
pub struct Saturation {
    pub store: ClauseStore,
    pub env: Env,
    unprocessed: UnprocessedQueue,
    passive: PassiveQueue,
    active: ActiveSet,
    indices: IndexManager,
    generators: Vec<Box<dyn GeneratingRule>>,
    forward: Vec<Box<dyn ForwardSimplifier>>,
    backward: Vec<Box<dyn BackwardSimplifier>>,
    splitter: Option<Splitter>,
    selector: Box<dyn LiteralSelector>,
    location: HashMap<usize, Location>,
    selection: HashMap<usize, Vec<usize>>,
    frozen: HashMap<usize, u64>,
    thaw_pending: HashSet<usize>,
    inputs: Vec<Clause>,
    iteration: usize,
}

impl Saturation {
    pub fn new(inputs: Vec<Clause>, env: Env, options: SaturationOptions) -> Self {
        let mut indices = IndexManager::new();
        indices.simplification_includes_passive = options.simplification_includes_passive;

        let mut generators: Vec<Box<dyn GeneratingRule>> = vec![
            Box::new(Factoring::new()),
            Box::new(EqualityResolution::new()),
            Box::new(BinaryResolution::new()),
            Box::new(Superposition::new()),
        ];
        let mut forward: Vec<Box<dyn ForwardSimplifier>> = vec![
            Box::new(TautologyDeletion::new()),
            Box::new(Demodulation::new()),
            Box::new(Subsumption::new()),
        ];
        let mut backward: Vec<Box<dyn BackwardSimplifier>> = vec![
            Box::new(Demodulation::new()),
            Box::new(Subsumption::new()),
        ];

        for engine in generators.iter_mut() {
            engine.attach(&mut indices);
        }
        for engine in forward.iter_mut() {
            engine.attach(&mut indices);
        }
        for engine in backward.iter_mut() {
            engine.attach(&mut indices);
        }

        let splitter = options.splitting.then(|| {
            Splitter::new(
                options.fast_restart,
                options.congruence_closure,
                options.congruence_model,
            )
        });

        Saturation {
            store: ClauseStore::new(),
            env,
            unprocessed: UnprocessedQueue::new(),
            passive: PassiveQueue::new(options.weight_factor, options.age_factor),
            active: ActiveSet::new(),
            indices,
            generators,
            forward,
            backward,
            splitter,
            selector: options.selector,
            location: HashMap::new(),
            selection: HashMap::new(),
            frozen: HashMap::new(),
            thaw_pending: HashSet::new(),
            inputs,
            iteration: 0,
        }
    }

    /// Run saturation to completion. Budget errors become termination
    /// reasons; all other errors surface.
    pub fn run(&mut self) -> ProverResult<TerminationReason> {
        let outcome = self.saturate();
        self.teardown()?;
        if let Some(splitter) = self.splitter.as_ref() {
            self.env.statistics.bdd_time_ms = splitter.bdd_time_ms();
        }

        let reason = match outcome {
            Ok(reason) => reason,
            Err(ProverError::TimeLimitExceeded) => TerminationReason::TimeLimit,
            Err(ProverError::MemoryLimitExceeded) => {
                // Leave headroom so reporting itself can allocate
                self.env.limits.raise_memory_limit(1);
                TerminationReason::MemoryLimit
            }
            Err(other) => return Err(other),
        };
        self.env.statistics.termination_reason = reason;
        Ok(reason)
    }

    /// Detach every engine, releasing all indices.
    fn teardown(&mut self) -> ProverResult<()> {
        for engine in self.generators.iter_mut() {
            engine.detach(&mut self.indices)?;
        }
        for engine in self.forward.iter_mut() {
            engine.detach(&mut self.indices)?;
        }
        for engine in self.backward.iter_mut() {
            engine.detach(&mut self.indices)?;
        }
        Ok(())
    }

    fn saturate(&mut self) -> ProverResult<TerminationReason> {
        self.init();

        loop {
            self.env.limits.check_time()?;
            self.env.limits.check_memory()?;

            if let Some(refutation) = self.drain_unprocessed()? {
                return Ok(self.conclude_refutation(refutation));
            }

            match self.splitter_round()? {
                SplitterRound::Refuted => {
                    let idx = self.store.register(Clause::derived(
                        Vec::new(),
                        self.iteration,
                        SplitSet::empty(),
                        Derivation::new(Rule::SplitConflict, Vec::new()),
                    ));
                    return Ok(self.conclude_refutation(idx));
                }
                SplitterRound::Changed => continue,
                SplitterRound::Quiet => {}
            }

            if self.passive.is_empty() {
                if !self.unprocessed.is_empty() {
                    continue;
                }
                let reason = if self.selector.is_complete() {
                    TerminationReason::Satisfiable
                } else {
                    TerminationReason::Unknown
                };
                return Ok(reason);
            }

            let Some(popped) = self.passive.select_next() else {
                continue;
            };
            let clause = self.store.get(popped);
            self.indices
                .on_passive_removed(popped, clause, &self.env.interner, &self.env.kbo);
            self.location.insert(popped, Location::Nowhere);

            // The given clause is forward-simplified once more against the
            // clauses that became active since it was enqueued.
            let Some(given) = self.forward_simplify(popped)? else {
                continue;
            };

            let clause = self.store.get(given);
            if clause.is_empty() {
                let splits = clause.split_set.clone();
                if splits.is_empty() {
                    return Ok(self.conclude_refutation(given));
                }
                self.location.insert(given, Location::Dead);
                if let Some(splitter) = self.splitter.as_mut() {
                    splitter.handle_empty_clause(&splits, &mut self.env)?;
                }
                continue;
            }

            self.activate(given);

            // Generating inferences around the given clause
            let selected = self.selection[&given].clone();
            let mut children = Vec::new();
            {
                let mut view = View {
                    clauses: &self.store,
                    indices: &self.indices,
                    env: &mut self.env,
                };
                for rule in &self.generators {
                    children.extend(rule.generate(&mut view, given, &selected));
                }
            }
            for child in children {
                self.register_child(child);
            }

            // Backward simplification with the new active clause
            let mut reductions: Vec<BackwardSimplification> = Vec::new();
            {
                let mut view = View {
                    clauses: &self.store,
                    indices: &self.indices,
                    env: &mut self.env,
                };
                for rule in &self.backward {
                    reductions.extend(rule.perform(&mut view, given));
                }
            }
            for reduction in reductions {
                self.apply_backward(given, reduction);
            }
        }
    }

    fn init(&mut self) {
        let inputs = std::mem::take(&mut self.inputs);
        self.env.statistics.input_clauses = inputs.len();
        for mut clause in inputs {
            orient_clause_equalities(&mut clause, &self.env.kbo, &self.env.interner);
            let idx = self.store.register(clause);
            self.location.insert(idx, Location::Unprocessed);
            self.unprocessed.push(idx);
        }
    }

    fn conclude_refutation(&mut self, refutation: usize) -> TerminationReason {
        self.env.statistics.refutation = Some(refutation);
        TerminationReason::Refutation
    }

    /// Forward-simplify every fresh clause and route the survivors.
    /// Returns a clause id on refutation.
    fn drain_unprocessed(&mut self) -> ProverResult<Option<usize>> {
        while let Some(idx) = self.unprocessed.pop() {
            self.env.limits.check_time()?;
            self.location.insert(idx, Location::Nowhere);

            let Some(survivor) = self.forward_simplify(idx)? else {
                continue;
            };

            let clause = self.store.get(survivor);
            if clause.is_empty() {
                let splits = clause.split_set.clone();
                if splits.is_empty() {
                    return Ok(Some(survivor));
                }
                self.location.insert(survivor, Location::Dead);
                if let Some(splitter) = self.splitter.as_mut() {
                    splitter.handle_empty_clause(&splits, &mut self.env)?;
                }
                continue;
            }

            if let Some(splitter) = self.splitter.as_mut() {
                if splitter.split(survivor, &mut self.store, &mut self.env)? {
                    self.location.insert(survivor, Location::Dead);
                    continue;
                }
            }

            self.insert_passive(survivor);
        }
        Ok(None)
    }

    /// Run the forward simplifiers to a fixpoint. Returns the id of the
    /// surviving (possibly replaced) clause, or None if it was deleted.
    fn forward_simplify(&mut self, idx: usize) -> ProverResult<Option<usize>> {
        let mut current = idx;
        'restart: loop {
            for i in 0..self.forward.len() {
                let outcome = {
                    let clause = self.store.get(current);
                    let mut view = View {
                        clauses: &self.store,
                        indices: &self.indices,
                        env: &mut self.env,
                    };
                    self.forward[i].simplify(&mut view, clause)
                };
                match outcome {
                    SimplifyOutcome::Keep => {}
                    SimplifyOutcome::Delete { premises } => {
                        self.reduce_away(current, &premises);
                        return Ok(None);
                    }
                    SimplifyOutcome::Replace {
                        literals,
                        rule,
                        premises,
                    } => {
                        let replacement = self.build_replacement(current, literals, rule, &premises);
                        self.reduce_away(current, &premises);
                        current = replacement;
                        continue 'restart;
                    }
                }
            }
            return Ok(Some(current));
        }
    }

    /// Build the replacement clause of a simplification step.
    fn build_replacement(
        &mut self,
        victim: usize,
        literals: Vec<crate::fol::Literal>,
        rule: Rule,
        premises: &[usize],
    ) -> usize {
        let mut splits = self.store.get(victim).split_set.clone();
        for &p in premises {
            splits = splits.union(&self.store.get(p).split_set);
        }
        let mut derivation_premises = vec![victim];
        derivation_premises.extend_from_slice(premises);

        let mut clause = Clause::derived(
            literals,
            self.store.get(victim).age,
            splits,
            Derivation::new(rule, derivation_premises),
        );
        orient_clause_equalities(&mut clause, &self.env.kbo, &self.env.interner);
        self.register_clause(clause)
    }

    /// Remove a reduced clause. When the justifying premises carry split
    /// dependencies the reduction is conditional: the clause is frozen and
    /// a reduction record is written so deactivation can thaw it.
    fn reduce_away(&mut self, victim: usize, premises: &[usize]) {
        let mut condition = SplitSet::empty();
        for &p in premises {
            condition = condition.union(&self.store.get(p).split_set);
        }
        if condition.is_empty() || self.splitter.is_none() {
            self.location.insert(victim, Location::Dead);
            return;
        }
        let splitter = self.splitter.as_mut().expect("checked above");
        let timestamp = splitter.record_reduction(victim, &condition);
        self.frozen.insert(victim, timestamp);
        self.location.insert(victim, Location::Frozen);
    }

    fn register_clause(&mut self, clause: Clause) -> usize {
        let splits = clause.split_set.clone();
        let idx = self.store.register(clause);
        if let Some(splitter) = self.splitter.as_mut() {
            splitter.on_clause_registered(idx, &splits);
        }
        idx
    }

    /// Register a generated clause and enqueue it as unprocessed.
    fn register_child(&mut self, child: NewClause) {
        let mut splits = SplitSet::empty();
        for &p in &child.premises {
            splits = splits.union(&self.store.get(p).split_set);
        }
        let mut clause = Clause::derived(
            child.literals,
            self.iteration,
            splits,
            Derivation::new(child.rule, child.premises),
        );
        orient_clause_equalities(&mut clause, &self.env.kbo, &self.env.interner);
        let idx = self.register_clause(clause);
        self.env.statistics.generated_clauses += 1;
        self.location.insert(idx, Location::Unprocessed);
        self.unprocessed.push(idx);
    }

    fn insert_passive(&mut self, idx: usize) {
        let clause = self.store.get(idx);
        self.passive.insert(idx, clause.weight, clause.age);
        self.indices
            .on_passive_added(idx, clause, &self.env.interner, &self.env.kbo);
        self.location.insert(idx, Location::Passive);
        self.env.statistics.passive_clauses += 1;
    }

    fn activate(&mut self, idx: usize) {
        let clause = self.store.get(idx);
        let selected = self.selector.select(clause, &self.env.kbo);
        self.indices
            .on_active_added(idx, clause, &selected, &self.env.interner, &self.env.kbo);
        self.selection.insert(idx, selected);
        self.active.insert(idx);
        self.location.insert(idx, Location::Active);
        self.env.statistics.active_clauses += 1;
        self.iteration += 1;
    }

    /// Remove a clause from whichever container holds it.
    fn remove_from_containers(&mut self, idx: usize) {
        match self.location.get(&idx).copied().unwrap_or(Location::Nowhere) {
            Location::Unprocessed => self.unprocessed.remove(idx),
            Location::Passive => {
                self.passive.remove(idx);
                let clause = self.store.get(idx);
                self.indices
                    .on_passive_removed(idx, clause, &self.env.interner, &self.env.kbo);
            }
            Location::Active => {
                self.active.remove(idx);
                let clause = self.store.get(idx);
                let selected = self.selection.remove(&idx).unwrap_or_default();
                self.indices.on_active_removed(
                    idx,
                    clause,
                    &selected,
                    &self.env.interner,
                    &self.env.kbo,
                );
            }
            _ => {}
        }
        self.location.insert(idx, Location::Nowhere);
    }

    /// Apply one backward-simplification result.
    fn apply_backward(&mut self, premise: usize, reduction: BackwardSimplification) {
        let victim = reduction.victim;
        match self.location.get(&victim).copied() {
            Some(Location::Active) | Some(Location::Passive) | Some(Location::Unprocessed) => {}
            _ => return, // already reduced by an earlier result
        }
        self.remove_from_containers(victim);

        if let Some((literals, rule)) = reduction.replacement {
            let replacement = self.build_replacement(victim, literals, rule, &[premise]);
            self.location.insert(replacement, Location::Unprocessed);
            self.unprocessed.push(replacement);
        }
        self.reduce_away(victim, &[premise]);
    }

    /// Let the splitter recompute its model and apply the changes.
    fn splitter_round(&mut self) -> ProverResult<SplitterRound> {
        let Some(mut splitter) = self.splitter.take() else {
            return Ok(SplitterRound::Quiet);
        };
        let outcome = match splitter.on_all_processed(&mut self.env) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.splitter = Some(splitter);
                return Err(e);
            }
        };
        let result = match outcome {
            SplitterOutcome::Quiet => SplitterRound::Quiet,
            SplitterOutcome::Refutation => SplitterRound::Refuted,
            SplitterOutcome::Changed {
                activate,
                remove,
                thaw,
                reconsider,
            } => {
                for victim in remove {
                    self.remove_from_containers(victim);
                    self.frozen.remove(&victim);
                    self.thaw_pending.remove(&victim);
                    self.location.insert(victim, Location::Dead);
                }

                for record in thaw {
                    if self.frozen.get(&record.clause) != Some(&record.timestamp) {
                        continue;
                    }
                    self.frozen.remove(&record.clause);
                    let splits = self.store.get(record.clause).split_set.clone();
                    if splitter.all_active(&splits) {
                        self.insert_passive(record.clause);
                    } else {
                        self.location.insert(record.clause, Location::Frozen);
                        self.thaw_pending.insert(record.clause);
                    }
                }

                for component in activate {
                    match self.location.get(&component).copied() {
                        Some(Location::Unprocessed)
                        | Some(Location::Passive)
                        | Some(Location::Active) => {}
                        _ => {
                            self.location.insert(component, Location::Unprocessed);
                            self.unprocessed.push(component);
                        }
                    }
                }

                // Frozen clauses whose levels all came back
                let pending: Vec<usize> = self.thaw_pending.iter().copied().collect();
                for idx in pending {
                    let splits = self.store.get(idx).split_set.clone();
                    if splitter.all_active(&splits) {
                        self.thaw_pending.remove(&idx);
                        self.insert_passive(idx);
                    }
                }

                // Parked clauses get another chance to split
                for idx in reconsider {
                    let absorbed = match splitter.split(idx, &mut self.store, &mut self.env) {
                        Ok(absorbed) => absorbed,
                        Err(e) => {
                            self.splitter = Some(splitter);
                            return Err(e);
                        }
                    };
                    if !absorbed {
                        self.location.insert(idx, Location::Unprocessed);
                        self.unprocessed.push(idx);
                    }
                }

                SplitterRound::Changed
            }
        };
        self.splitter = Some(splitter);
        Ok(result)
    }

    // ========================================================================
    // Accessors for reporting and tests
    // ========================================================================

    /// Ids of clauses currently in some container.
    pub fn live_clauses(&self) -> Vec<usize> {
        self.location
            .iter()
            .filter(|(_, loc)| {
                matches!(
                    loc,
                    Location::Unprocessed | Location::Passive | Location::Active
                )
            })
            .map(|(&idx, _)| idx)
            .collect()
    }

    /// Does every live clause depend only on active split levels?
    pub fn splits_consistent(&self) -> bool {
        let Some(splitter) = self.splitter.as_ref() else {
            return true;
        };
        self.live_clauses()
            .iter()
            .all(|&idx| splitter.all_active(&self.store.get(idx).split_set))
    }

    pub fn splitter(&self) -> Option<&Splitter> {
        self.splitter.as_ref()
    }
}
