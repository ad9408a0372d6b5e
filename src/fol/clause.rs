//! Clauses and clause-level derivation records

use super::interner::Interner;
use super::literal::Literal;
use super::split_set::SplitSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Role of a clause in the problem (from TPTP or derived)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClauseRole {
    /// Axiom from the problem
    #[default]
    Axiom,
    /// Hypothesis
    Hypothesis,
    /// Negated conjecture (goal)
    NegatedConjecture,
    /// Derived clause (from inference)
    Derived,
}

impl ClauseRole {
    /// Convert from a TPTP role string
    pub fn from_tptp_role(role: &str) -> Self {
        match role {
            "hypothesis" => ClauseRole::Hypothesis,
            "negated_conjecture" => ClauseRole::NegatedConjecture,
            _ => ClauseRole::Axiom,
        }
    }
}

/// Inference rule names recorded on derived clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    Input,
    Resolution,
    Factoring,
    EqualityResolution,
    Superposition,
    Demodulation,
    SubsumptionResolution,
    DuplicateLiteralRemoval,
    TrivialInequalityRemoval,
    SplitComponent,
    SplitConflict,
}

impl Rule {
    pub fn name(self) -> &'static str {
        match self {
            Rule::Input => "input",
            Rule::Resolution => "resolution",
            Rule::Factoring => "factoring",
            Rule::EqualityResolution => "equality_resolution",
            Rule::Superposition => "superposition",
            Rule::Demodulation => "demodulation",
            Rule::SubsumptionResolution => "subsumption_resolution",
            Rule::DuplicateLiteralRemoval => "duplicate_literal_removal",
            Rule::TrivialInequalityRemoval => "trivial_inequality_removal",
            Rule::SplitComponent => "split_component",
            Rule::SplitConflict => "split_conflict",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Record of how a clause came to exist: the rule and its premises
/// (clause IDs in the store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    pub rule: Rule,
    pub premises: Vec<usize>,
}

impl Derivation {
    pub fn input() -> Self {
        Derivation {
            rule: Rule::Input,
            premises: Vec::new(),
        }
    }

    pub fn new(rule: Rule, premises: Vec<usize>) -> Self {
        Derivation { rule, premises }
    }
}

/// A clause: a disjunction of literals.
///
/// Carries the bookkeeping the saturation loop and the splitter need:
/// insertion age, cached weight (symbol count), the split set recording
/// which component names the clause depends on, and its derivation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub literals: Vec<Literal>,
    /// Index in the clause store; None until registered
    pub id: Option<usize>,
    pub role: ClauseRole,
    /// Generation at which the clause was created (0 for input clauses)
    pub age: usize,
    /// Cached symbol count
    pub weight: usize,
    /// Split levels this clause depends on
    pub split_set: SplitSet,
    /// How the clause was derived
    pub derivation: Derivation,
}

/// A set of input clauses (conjunction)
#[derive(Debug, Clone)]
pub struct ClauseSet {
    pub clauses: Vec<Clause>,
}

impl Clause {
    /// Create an input clause
    pub fn new(literals: Vec<Literal>) -> Self {
        let weight = Self::compute_weight(&literals);
        Clause {
            literals,
            id: None,
            role: ClauseRole::default(),
            age: 0,
            weight,
            split_set: SplitSet::empty(),
            derivation: Derivation::input(),
        }
    }

    /// Create a derived clause with age, split set and derivation record
    pub fn derived(
        literals: Vec<Literal>,
        age: usize,
        split_set: SplitSet,
        derivation: Derivation,
    ) -> Self {
        let weight = Self::compute_weight(&literals);
        Clause {
            literals,
            id: None,
            role: ClauseRole::Derived,
            age,
            weight,
            split_set,
            derivation,
        }
    }

    fn compute_weight(literals: &[Literal]) -> usize {
        literals.iter().map(Literal::symbol_count).sum()
    }

    /// Check if this clause is empty (a contradiction under its split set)
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Check whether the clause contains no variables
    pub fn is_ground(&self) -> bool {
        self.literals.iter().all(Literal::is_ground)
    }

    /// Collect all variable IDs occurring in the clause
    pub fn variables(&self) -> HashSet<super::interner::VariableId> {
        let mut vars = HashSet::new();
        for lit in &self.literals {
            lit.collect_variables(&mut vars);
        }
        vars
    }

    /// Check if this clause is a tautology: complementary literals or a
    /// reflexive positive equality.
    pub fn is_tautology(&self, interner: &Interner) -> bool {
        for i in 0..self.literals.len() {
            for j in (i + 1)..self.literals.len() {
                if self.literals[i].polarity != self.literals[j].polarity
                    && self.literals[i].predicate == self.literals[j].predicate
                    && self.literals[i].args == self.literals[j].args
                {
                    return true;
                }
            }
        }
        for lit in &self.literals {
            if lit.polarity && lit.is_equality(interner) && lit.args[0] == lit.args[1] {
                return true;
            }
        }
        false
    }

    /// Format this clause with an interner for name resolution
    pub fn display<'a>(&'a self, interner: &'a Interner) -> ClauseDisplay<'a> {
        ClauseDisplay {
            clause: self,
            interner,
        }
    }
}

/// Display wrapper for Clause that includes an interner for name resolution
pub struct ClauseDisplay<'a> {
    clause: &'a Clause,
    interner: &'a Interner,
}

impl fmt::Display for ClauseDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clause.is_empty() {
            write!(f, "$false")?;
        } else {
            for (i, lit) in self.clause.literals.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{}", lit.display(self.interner))?;
            }
        }
        if !self.clause.split_set.is_empty() {
            write!(f, " {}", self.clause.split_set)?;
        }
        Ok(())
    }
}
