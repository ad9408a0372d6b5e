//! Reference-counted index management.
//!
//! Inference engines request the indices they need by `IndexType` during
//! attach and release them on detach; the manager creates each index on
//! first request and destroys it when the last user releases it. Indices
//! are attached to one of two clause streams: generation indices track the
//! active set, simplification indices track the active set and, per
//! configuration, the passive set. The saturation algorithm routes clause
//! add/remove events from the containers to the manager, which keeps every
//! live index current.

use super::substitution_tree::{Binding, SubstitutionTree};
use crate::fol::{Clause, Interner, Kbo, Term, TermOrdering};
use crate::env::{ProverError, ProverResult};
use std::collections::HashMap;

/// Purpose tags of the indices the manager can build. The factory is a
/// closed switch: adding a tag means adding a maintenance case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// Selected literals of active clauses (resolution partners)
    GeneratingLiteral,
    /// All literals of simplification-stream clauses (subsumption)
    SimplifyingLiteral,
    /// Literals of unit clauses in the simplification stream
    SimplifyingAtomicClause,
    /// Non-variable subterms of selected literals (superposition into)
    SuperpositionSubterm,
    /// Maximal sides of selected positive equalities (superposition from)
    SuperpositionLhs,
    /// Non-variable subterms of all literals (backward demodulation)
    DemodulationSubterm,
    /// Rewriting sides of unit equalities (forward demodulation)
    DemodulationLhs,
}

/// Which clause stream feeds an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Generation,
    Simplification,
}

impl IndexType {
    pub fn stream(self) -> Stream {
        match self {
            IndexType::GeneratingLiteral
            | IndexType::SuperpositionSubterm
            | IndexType::SuperpositionLhs => Stream::Generation,
            IndexType::SimplifyingLiteral
            | IndexType::SimplifyingAtomicClause
            | IndexType::DemodulationSubterm
            | IndexType::DemodulationLhs => Stream::Simplification,
        }
    }
}

/// A substitution tree plus the key-maintenance policy of its type.
#[derive(Debug)]
pub struct TypedIndex {
    typ: IndexType,
    tree: SubstitutionTree,
}

impl TypedIndex {
    fn new(typ: IndexType) -> Self {
        TypedIndex {
            typ,
            tree: SubstitutionTree::new(),
        }
    }

    pub fn tree(&self) -> &SubstitutionTree {
        &self.tree
    }

    /// Apply this index's key-extraction policy to a clause.
    fn update(
        &mut self,
        idx: usize,
        clause: &Clause,
        selected: &[usize],
        interner: &Interner,
        kbo: &Kbo,
        insert: bool,
    ) {
        match self.typ {
            IndexType::GeneratingLiteral => {
                for &i in selected {
                    self.apply_literal(idx, i, clause, insert);
                }
            }
            IndexType::SimplifyingLiteral => {
                for i in 0..clause.literals.len() {
                    self.apply_literal(idx, i, clause, insert);
                }
            }
            IndexType::SimplifyingAtomicClause => {
                if clause.literals.len() == 1 {
                    self.apply_literal(idx, 0, clause, insert);
                }
            }
            IndexType::SuperpositionSubterm => {
                for &i in selected {
                    self.apply_subterms(idx, i, clause, insert);
                }
            }
            IndexType::SuperpositionLhs => {
                for &i in selected {
                    self.apply_equality_sides(idx, i, clause, interner, kbo, false, insert);
                }
            }
            IndexType::DemodulationSubterm => {
                for i in 0..clause.literals.len() {
                    self.apply_subterms(idx, i, clause, insert);
                }
            }
            IndexType::DemodulationLhs => {
                if clause.literals.len() == 1 && clause.literals[0].polarity {
                    self.apply_equality_sides(idx, 0, clause, interner, kbo, true, insert);
                }
            }
        }
    }

    fn apply_literal(&mut self, idx: usize, lit_idx: usize, clause: &Clause, insert: bool) {
        let lit = &clause.literals[lit_idx];
        let binding = Binding::literal(idx, lit_idx);
        if insert {
            self.tree.insert_literal(lit, binding);
        } else {
            self.tree.remove_literal(lit, &binding);
        }
    }

    /// Index every non-variable subterm of the literal's arguments.
    fn apply_subterms(&mut self, idx: usize, lit_idx: usize, clause: &Clause, insert: bool) {
        let lit = &clause.literals[lit_idx];
        let mut path = Vec::new();
        for (arg_idx, arg) in lit.args.iter().enumerate() {
            path.push(arg_idx);
            self.apply_subterms_rec(idx, lit_idx, arg, &mut path, insert);
            path.pop();
        }
    }

    fn apply_subterms_rec(
        &mut self,
        idx: usize,
        lit_idx: usize,
        term: &Term,
        path: &mut Vec<usize>,
        insert: bool,
    ) {
        if matches!(term, Term::Variable(_)) {
            return;
        }
        let binding = Binding::subterm(idx, lit_idx, path.clone());
        if insert {
            self.tree.insert_term(term, binding);
        } else {
            self.tree.remove_term(term, &binding);
        }
        if let Term::Function(_, args) = term {
            for (arg_idx, arg) in args.iter().enumerate() {
                path.push(arg_idx);
                self.apply_subterms_rec(idx, lit_idx, arg, path, insert);
                path.pop();
            }
        }
    }

    /// Index the rewriting sides of an equality literal. With
    /// `strict_only`, a side is indexed only when it is strictly greater or
    /// incomparable (demodulation); otherwise any side not strictly smaller
    /// is indexed (superposition).
    fn apply_equality_sides(
        &mut self,
        idx: usize,
        lit_idx: usize,
        clause: &Clause,
        interner: &Interner,
        kbo: &Kbo,
        strict_only: bool,
        insert: bool,
    ) {
        let lit = &clause.literals[lit_idx];
        if !lit.polarity || !lit.is_equality(interner) {
            return;
        }
        let sides = [(0usize, &lit.args[0], &lit.args[1]), (1, &lit.args[1], &lit.args[0])];
        for (side_idx, side, other) in sides {
            if matches!(side, Term::Variable(_)) {
                continue;
            }
            let cmp = kbo.compare(side, other);
            let eligible = if strict_only {
                matches!(cmp, TermOrdering::Greater | TermOrdering::Incomparable)
            } else {
                !matches!(cmp, TermOrdering::Less)
            };
            if !eligible {
                continue;
            }
            let binding = Binding::subterm(idx, lit_idx, vec![side_idx]);
            if insert {
                self.tree.insert_term(side, binding);
            } else {
                self.tree.remove_term(side, &binding);
            }
        }
    }
}

struct Entry {
    index: TypedIndex,
    refs: u32,
}

/// Reference-counted cache of typed indices.
pub struct IndexManager {
    entries: HashMap<IndexType, Entry>,
    /// When set, simplification indices also see the passive set
    pub simplification_includes_passive: bool,
}

impl IndexManager {
    pub fn new() -> Self {
        IndexManager {
            entries: HashMap::new(),
            simplification_includes_passive: false,
        }
    }

    /// Request the index of type `t`, creating it on first request.
    pub fn request(&mut self, t: IndexType) {
        let entry = self.entries.entry(t).or_insert_with(|| Entry {
            index: TypedIndex::new(t),
            refs: 0,
        });
        entry.refs += 1;
    }

    /// Release one reference; the index is destroyed at zero.
    pub fn release(&mut self, t: IndexType) -> ProverResult<()> {
        let entry = self.entries.get_mut(&t).ok_or_else(|| {
            ProverError::InvalidOperation(format!("release of unrequested index {:?}", t))
        })?;
        entry.refs -= 1;
        if entry.refs == 0 {
            self.entries.remove(&t);
        }
        Ok(())
    }

    /// Whether an index of type `t` currently exists.
    pub fn contains(&self, t: IndexType) -> bool {
        self.entries.contains_key(&t)
    }

    /// Get a live index for querying.
    pub fn get(&self, t: IndexType) -> Option<&TypedIndex> {
        self.entries.get(&t).map(|e| &e.index)
    }

    /// A clause entered the active set.
    pub fn on_active_added(
        &mut self,
        idx: usize,
        clause: &Clause,
        selected: &[usize],
        interner: &Interner,
        kbo: &Kbo,
    ) {
        for entry in self.entries.values_mut() {
            entry
                .index
                .update(idx, clause, selected, interner, kbo, true);
        }
    }

    /// A clause left the active set.
    pub fn on_active_removed(
        &mut self,
        idx: usize,
        clause: &Clause,
        selected: &[usize],
        interner: &Interner,
        kbo: &Kbo,
    ) {
        for entry in self.entries.values_mut() {
            entry
                .index
                .update(idx, clause, selected, interner, kbo, false);
        }
    }

    /// A clause entered the passive set. Only simplification indices see
    /// passive clauses, and only when configured to.
    pub fn on_passive_added(
        &mut self,
        idx: usize,
        clause: &Clause,
        interner: &Interner,
        kbo: &Kbo,
    ) {
        if !self.simplification_includes_passive {
            return;
        }
        for entry in self.entries.values_mut() {
            if entry.index.typ.stream() == Stream::Simplification {
                entry.index.update(idx, clause, &[], interner, kbo, true);
            }
        }
    }

    /// A clause left the passive set.
    pub fn on_passive_removed(
        &mut self,
        idx: usize,
        clause: &Clause,
        interner: &Interner,
        kbo: &Kbo,
    ) {
        if !self.simplification_includes_passive {
            return;
        }
        for entry in self.entries.values_mut() {
            if entry.index.typ.stream() == Stream::Simplification {
                entry.index.update(idx, clause, &[], interner, kbo, false);
            }
        }
    }
}

impl Default for IndexManager {
    fn default() -> Self {
        IndexManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, Literal, PredicateSymbol, Term, Variable};
    use crate::index::substitution_tree::QueryMode;

    fn setup() -> (Interner, Kbo, Clause) {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let clause = Clause::new(vec![Literal::positive(p, vec![a])]);
        (interner, Kbo::default(), clause)
    }

    #[test]
    fn request_release_lifecycle() {
        let mut mgr = IndexManager::new();
        mgr.request(IndexType::GeneratingLiteral);
        mgr.request(IndexType::GeneratingLiteral);
        assert!(mgr.contains(IndexType::GeneratingLiteral));

        mgr.release(IndexType::GeneratingLiteral).unwrap();
        assert!(mgr.contains(IndexType::GeneratingLiteral));
        mgr.release(IndexType::GeneratingLiteral).unwrap();
        assert!(!mgr.contains(IndexType::GeneratingLiteral));
    }

    #[test]
    fn release_without_request_is_invalid() {
        let mut mgr = IndexManager::new();
        assert!(matches!(
            mgr.release(IndexType::DemodulationLhs),
            Err(ProverError::InvalidOperation(_))
        ));
    }

    #[test]
    fn active_events_maintain_indices() {
        let (interner, kbo, clause) = setup();
        let mut mgr = IndexManager::new();
        mgr.request(IndexType::GeneratingLiteral);

        mgr.on_active_added(0, &clause, &[0], &interner, &kbo);
        let tree = mgr.get(IndexType::GeneratingLiteral).unwrap().tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.query_literal(&clause.literals[0], QueryMode::Unification)
                .count(),
            1
        );

        mgr.on_active_removed(0, &clause, &[0], &interner, &kbo);
        assert!(mgr.get(IndexType::GeneratingLiteral).unwrap().tree().is_empty());
    }

    #[test]
    fn unit_equality_feeds_demodulation_lhs() {
        let mut interner = Interner::new();
        let eq = PredicateSymbol::new(interner.intern_predicate("="), 2);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));
        let f = crate::fol::FunctionSymbol::new(interner.intern_function("f"), 1);
        let fx = Term::Function(f, vec![x]);
        // f(X) = a, oriented
        let clause = Clause::new(vec![Literal::positive(eq, vec![fx.clone(), a.clone()])]);
        let kbo = Kbo::default();

        let mut mgr = IndexManager::new();
        mgr.request(IndexType::DemodulationLhs);
        mgr.on_active_added(0, &clause, &[], &interner, &kbo);

        let tree = mgr.get(IndexType::DemodulationLhs).unwrap().tree();
        // Only the greater side f(X) is indexed
        assert_eq!(tree.len(), 1);
        let fa = Term::Function(f, vec![a.clone()]);
        assert_eq!(tree.query_term(&fa, QueryMode::Generalization).count(), 1);
    }
}
