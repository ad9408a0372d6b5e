//! Minimal propositional layer for the branch selector.
//!
//! Clauses range over the variables that name clause components. The
//! solver is a plain DPLL with unit propagation and polarity advice; the
//! splitting workload keeps these problems small.

use std::fmt;

/// A propositional literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SatLiteral {
    pub var: u32,
    pub positive: bool,
}

impl SatLiteral {
    pub fn new(var: u32, positive: bool) -> Self {
        SatLiteral { var, positive }
    }

    pub fn negated(self) -> Self {
        SatLiteral {
            var: self.var,
            positive: !self.positive,
        }
    }
}

impl fmt::Display for SatLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            write!(f, "~")?;
        }
        write!(f, "v{}", self.var)
    }
}

/// A propositional clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatClause {
    pub literals: Vec<SatLiteral>,
}

impl SatClause {
    pub fn new(literals: Vec<SatLiteral>) -> Self {
        SatClause { literals }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl fmt::Display for SatClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literals.is_empty() {
            return write!(f, "#");
        }
        for (i, lit) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", lit)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Satisfiable,
    Unsatisfiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseState {
    Satisfied,
    Conflict,
    Unit(SatLiteral),
    Unresolved,
}

/// DPLL solver with a persistent clause set and a model kept from the last
/// `solve` call.
#[derive(Debug, Default)]
pub struct SatSolver {
    clauses: Vec<SatClause>,
    var_count: u32,
    model: Vec<Option<bool>>,
    /// Preferred branch polarity per variable
    advice: Vec<bool>,
}

impl SatSolver {
    pub fn new() -> Self {
        SatSolver::default()
    }

    pub fn ensure_var(&mut self, var: u32) {
        if var >= self.var_count {
            self.var_count = var + 1;
            self.advice.resize(self.var_count as usize, true);
        }
    }

    pub fn add_clause(&mut self, clause: SatClause) {
        for lit in &clause.literals {
            self.ensure_var(lit.var);
        }
        self.clauses.push(clause);
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Prefer `value` when branching on `var`.
    pub fn suggest_polarity(&mut self, var: u32, value: bool) {
        self.ensure_var(var);
        self.advice[var as usize] = value;
    }

    /// Value of `var` in the model of the last successful `solve`.
    /// Variables in no clause default to false.
    pub fn model_value(&self, var: u32) -> bool {
        self.model
            .get(var as usize)
            .copied()
            .flatten()
            .unwrap_or(false)
    }

    pub fn solve(&mut self) -> SolverStatus {
        let mut assignment: Vec<Option<bool>> = vec![None; self.var_count as usize];
        if self.dpll(&mut assignment) {
            self.model = assignment;
            SolverStatus::Satisfiable
        } else {
            self.model.clear();
            SolverStatus::Unsatisfiable
        }
    }

    fn clause_state(clause: &SatClause, assignment: &[Option<bool>]) -> ClauseState {
        let mut unassigned = None;
        let mut unassigned_count = 0;
        for lit in &clause.literals {
            match assignment[lit.var as usize] {
                Some(value) if value == lit.positive => return ClauseState::Satisfied,
                Some(_) => {}
                None => {
                    unassigned = Some(*lit);
                    unassigned_count += 1;
                }
            }
        }
        match unassigned_count {
            0 => ClauseState::Conflict,
            1 => ClauseState::Unit(unassigned.expect("counted one unassigned literal")),
            _ => ClauseState::Unresolved,
        }
    }

    fn dpll(&self, assignment: &mut Vec<Option<bool>>) -> bool {
        // Unit propagation to fixpoint
        loop {
            let mut unit = None;
            for clause in &self.clauses {
                match Self::clause_state(clause, assignment) {
                    ClauseState::Conflict => return false,
                    ClauseState::Unit(lit) => {
                        unit = Some(lit);
                        break;
                    }
                    _ => {}
                }
            }
            match unit {
                Some(lit) => assignment[lit.var as usize] = Some(lit.positive),
                None => break,
            }
        }

        // Branch on a variable of some unresolved clause
        let mut branch_var = None;
        for clause in &self.clauses {
            if Self::clause_state(clause, assignment) == ClauseState::Unresolved {
                branch_var = clause
                    .literals
                    .iter()
                    .find(|lit| assignment[lit.var as usize].is_none())
                    .map(|lit| lit.var);
                if branch_var.is_some() {
                    break;
                }
            }
        }
        let Some(var) = branch_var else {
            return true;
        };

        let preferred = self.advice[var as usize];
        for value in [preferred, !preferred] {
            let mut trial = assignment.clone();
            trial[var as usize] = Some(value);
            if self.dpll(&mut trial) {
                *assignment = trial;
                return true;
            }
        }
        false
    }
}
