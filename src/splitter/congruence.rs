//! Ground congruence closure.
//!
//! Decides conjunctions of ground equalities and disequalities between
//! selected components, catching semantic conflicts the propositional
//! solver cannot see. A second instance is run in model mode, fed only
//! positive equalities, to answer `are_equal` queries for polarity advice.

use crate::fol::{SplitLevel, Term};
use std::collections::HashMap;

/// Outcome of a consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CcStatus {
    Consistent,
    /// The asserted levels jointly responsible for the conflict
    Conflict(Vec<SplitLevel>),
}

#[derive(Debug, Clone)]
struct Assertion {
    lhs: usize,
    rhs: usize,
    positive: bool,
    source: SplitLevel,
}

/// Union-find based congruence closure over registered ground terms.
#[derive(Debug, Default)]
pub struct CongruenceClosure {
    ids: HashMap<Term, usize>,
    terms: Vec<Term>,
    parent: Vec<usize>,
    assertions: Vec<Assertion>,
}

impl CongruenceClosure {
    pub fn new() -> Self {
        CongruenceClosure::default()
    }

    pub fn reset(&mut self) {
        self.ids.clear();
        self.terms.clear();
        self.parent.clear();
        self.assertions.clear();
    }

    /// Register a ground term and its subterms.
    fn register(&mut self, term: &Term) -> usize {
        debug_assert!(term.is_ground());
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        if let Term::Function(_, args) = term {
            for arg in args {
                self.register(arg);
            }
        }
        let id = self.terms.len();
        self.ids.insert(term.clone(), id);
        self.terms.push(term.clone());
        self.parent.push(id);
        id
    }

    pub fn assert_equality(&mut self, lhs: &Term, rhs: &Term, source: SplitLevel) {
        let lhs = self.register(lhs);
        let rhs = self.register(rhs);
        self.assertions.push(Assertion {
            lhs,
            rhs,
            positive: true,
            source,
        });
    }

    pub fn assert_disequality(&mut self, lhs: &Term, rhs: &Term, source: SplitLevel) {
        let lhs = self.register(lhs);
        let rhs = self.register(rhs);
        self.assertions.push(Assertion {
            lhs,
            rhs,
            positive: false,
            source,
        });
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }

    /// Recompute the closure and check every disequality.
    ///
    /// The conflict set is coarse: the sources of all positive assertions
    /// plus the violated disequality. A minimal core would need proof
    /// forests; the coarse set is still a sound learned clause.
    pub fn check(&mut self) -> CcStatus {
        for i in 0..self.parent.len() {
            self.parent[i] = i;
        }

        let positives: Vec<(usize, usize)> = self
            .assertions
            .iter()
            .filter(|a| a.positive)
            .map(|a| (a.lhs, a.rhs))
            .collect();
        for (l, r) in positives {
            self.union(l, r);
        }

        // Congruence propagation to fixpoint
        loop {
            let mut merged = false;
            for i in 0..self.terms.len() {
                for j in (i + 1)..self.terms.len() {
                    if self.find(i) == self.find(j) {
                        continue;
                    }
                    if self.congruent(i, j) {
                        self.union(i, j);
                        merged = true;
                    }
                }
            }
            if !merged {
                break;
            }
        }

        let assertions = self.assertions.clone();
        for assertion in &assertions {
            if !assertion.positive && self.find(assertion.lhs) == self.find(assertion.rhs) {
                let mut sources: Vec<SplitLevel> = assertions
                    .iter()
                    .filter(|a| a.positive)
                    .map(|a| a.source)
                    .collect();
                sources.push(assertion.source);
                sources.sort_unstable();
                sources.dedup();
                return CcStatus::Conflict(sources);
            }
        }
        CcStatus::Consistent
    }

    fn congruent(&mut self, i: usize, j: usize) -> bool {
        let (fi, ai) = match &self.terms[i] {
            Term::Function(f, args) => (f.id, args.clone()),
            _ => return false,
        };
        let (fj, aj) = match &self.terms[j] {
            Term::Function(f, args) => (f.id, args.clone()),
            _ => return false,
        };
        if fi != fj || ai.len() != aj.len() {
            return false;
        }
        ai.iter().zip(aj.iter()).all(|(x, y)| {
            let xi = self.ids[x];
            let yi = self.ids[y];
            self.find(xi) == self.find(yi)
        })
    }

    /// Model-mode query: are the two terms equal under the closure of the
    /// positive assertions? `check` must have run since the last change.
    pub fn are_equal(&mut self, lhs: &Term, rhs: &Term) -> bool {
        let (Some(&l), Some(&r)) = (self.ids.get(lhs), self.ids.get(rhs)) else {
            return lhs == rhs;
        };
        self.find(l) == self.find(r)
    }
}
