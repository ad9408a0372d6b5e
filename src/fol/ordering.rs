//! Knuth-Bendix term ordering and equality orientation.
//!
//! The ordering is total on ground terms; on non-ground terms the variable
//! condition can make terms incomparable.

use super::clause::Clause;
use super::interner::{ConstantId, FunctionId, VariableId};
use super::literal::Literal;
use super::term::Term;
use super::Interner;
use std::collections::HashMap;

/// Result of comparing two terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOrdering {
    Greater,
    Less,
    Equal,
    Incomparable,
}

/// Configuration for the Knuth-Bendix ordering
#[derive(Debug, Clone)]
pub struct KboConfig {
    /// Per-symbol weights (default 1)
    pub function_weights: HashMap<FunctionId, usize>,
    pub constant_weights: HashMap<ConstantId, usize>,
    /// Precedence (higher value wins ties; default 0, then ID order)
    pub function_precedence: HashMap<FunctionId, usize>,
    pub constant_precedence: HashMap<ConstantId, usize>,
    /// Weight of variables (must be positive)
    pub variable_weight: usize,
}

impl Default for KboConfig {
    fn default() -> Self {
        KboConfig {
            function_weights: HashMap::new(),
            constant_weights: HashMap::new(),
            function_precedence: HashMap::new(),
            constant_precedence: HashMap::new(),
            variable_weight: 1,
        }
    }
}

/// Knuth-Bendix ordering
#[derive(Debug, Clone, Default)]
pub struct Kbo {
    config: KboConfig,
}

impl Kbo {
    pub fn new(config: KboConfig) -> Self {
        Kbo { config }
    }

    fn function_weight(&self, id: FunctionId) -> usize {
        self.config.function_weights.get(&id).copied().unwrap_or(1)
    }

    fn constant_weight(&self, id: ConstantId) -> usize {
        self.config.constant_weights.get(&id).copied().unwrap_or(1)
    }

    fn function_precedence(&self, id: FunctionId) -> usize {
        self.config
            .function_precedence
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    fn constant_precedence(&self, id: ConstantId) -> usize {
        self.config
            .constant_precedence
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Weight of a term under this configuration
    pub fn term_weight(&self, term: &Term) -> usize {
        match term {
            Term::Variable(_) => self.config.variable_weight,
            Term::Constant(c) => self.constant_weight(c.id),
            Term::Function(f, args) => {
                self.function_weight(f.id)
                    + args.iter().map(|t| self.term_weight(t)).sum::<usize>()
            }
        }
    }

    fn count_variables(term: &Term, counts: &mut HashMap<VariableId, usize>) {
        match term {
            Term::Variable(v) => *counts.entry(v.id).or_insert(0) += 1,
            Term::Constant(_) => {}
            Term::Function(_, args) => {
                for arg in args {
                    Self::count_variables(arg, counts);
                }
            }
        }
    }

    /// Compare two terms. `Greater` means `s` is strictly larger than `t`.
    pub fn compare(&self, s: &Term, t: &Term) -> TermOrdering {
        if s == t {
            return TermOrdering::Equal;
        }

        let mut vars_s = HashMap::new();
        let mut vars_t = HashMap::new();
        Self::count_variables(s, &mut vars_s);
        Self::count_variables(t, &mut vars_t);

        // s > t requires #(x, s) >= #(x, t) for every variable x, and dually
        let s_dominates = vars_t
            .iter()
            .all(|(v, n)| vars_s.get(v).copied().unwrap_or(0) >= *n);
        let t_dominates = vars_s
            .iter()
            .all(|(v, n)| vars_t.get(v).copied().unwrap_or(0) >= *n);

        let weight_s = self.term_weight(s);
        let weight_t = self.term_weight(t);

        if weight_s > weight_t {
            if s_dominates {
                return TermOrdering::Greater;
            }
            return TermOrdering::Incomparable;
        }
        if weight_t > weight_s {
            if t_dominates {
                return TermOrdering::Less;
            }
            return TermOrdering::Incomparable;
        }

        // Equal weights: fall back to precedence / lexicographic comparison,
        // constrained by whichever variable conditions hold.
        let lex = self.compare_lex(s, t);
        match lex {
            TermOrdering::Greater if s_dominates => TermOrdering::Greater,
            TermOrdering::Less if t_dominates => TermOrdering::Less,
            TermOrdering::Equal => TermOrdering::Equal,
            _ => TermOrdering::Incomparable,
        }
    }

    fn compare_lex(&self, s: &Term, t: &Term) -> TermOrdering {
        match (s, t) {
            (Term::Variable(v1), Term::Variable(v2)) => {
                if v1 == v2 {
                    TermOrdering::Equal
                } else if v1.id > v2.id {
                    TermOrdering::Greater
                } else {
                    TermOrdering::Less
                }
            }
            (Term::Variable(_), _) => TermOrdering::Less,
            (_, Term::Variable(_)) => TermOrdering::Greater,
            (Term::Constant(c1), Term::Constant(c2)) => {
                if c1.id == c2.id {
                    TermOrdering::Equal
                } else {
                    let p1 = self.constant_precedence(c1.id);
                    let p2 = self.constant_precedence(c2.id);
                    if (p1, c1.id) > (p2, c2.id) {
                        TermOrdering::Greater
                    } else {
                        TermOrdering::Less
                    }
                }
            }
            (Term::Function(f1, args1), Term::Function(f2, args2)) => {
                if f1.id != f2.id {
                    let p1 = self.function_precedence(f1.id);
                    let p2 = self.function_precedence(f2.id);
                    if (p1, f1.id) > (p2, f2.id) {
                        TermOrdering::Greater
                    } else {
                        TermOrdering::Less
                    }
                } else {
                    for (a1, a2) in args1.iter().zip(args2.iter()) {
                        match self.compare(a1, a2) {
                            TermOrdering::Equal => continue,
                            other => return other,
                        }
                    }
                    TermOrdering::Equal
                }
            }
            (Term::Function(_, _), Term::Constant(_)) => TermOrdering::Greater,
            (Term::Constant(_), Term::Function(_, _)) => TermOrdering::Less,
        }
    }
}

/// Orient every equality literal of the clause so that the KBO-larger side
/// comes first. Incomparable sides are left in place. Keeps equality storage
/// canonical for index matching.
pub fn orient_clause_equalities(clause: &mut Clause, kbo: &Kbo, interner: &Interner) {
    for lit in &mut clause.literals {
        orient_equality(lit, kbo, interner);
    }
}

fn orient_equality(lit: &mut Literal, kbo: &Kbo, interner: &Interner) {
    if !lit.is_equality(interner) {
        return;
    }
    if kbo.compare(&lit.args[0], &lit.args[1]) == TermOrdering::Less {
        lit.args.swap(0, 1);
    }
}
