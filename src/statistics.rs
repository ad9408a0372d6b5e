//! Proof-search statistics.

use serde::Serialize;
use std::io::Write;

/// Why the saturation loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    /// Refutation found (empty clause with empty split set)
    Refutation,
    /// Saturated with a complete strategy
    Satisfiable,
    /// Saturated, but the strategy was incomplete
    Unknown,
    /// Time limit reached
    TimeLimit,
    /// Memory limit reached
    MemoryLimit,
}

/// Counters accumulated during a run. Printed after the result in human
/// mode; serializable for machine consumption.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    /// Number of input clauses
    pub input_clauses: usize,

    // Generating inferences
    pub resolutions: usize,
    pub factorings: usize,
    pub equality_resolutions: usize,
    pub forward_superpositions: usize,
    pub backward_superpositions: usize,

    // Simplifying inferences
    pub duplicate_literals: usize,
    pub trivial_inequalities: usize,
    pub forward_demodulations: usize,
    pub backward_demodulations: usize,
    pub forward_subsumption_resolutions: usize,

    // Deletions
    pub simple_tautologies: usize,
    pub equational_tautologies: usize,
    pub forward_subsumed: usize,
    pub backward_subsumed: usize,

    // Saturation
    /// All clauses that ever entered the unprocessed queue
    pub generated_clauses: usize,
    /// All clauses that ever entered passive
    pub passive_clauses: usize,
    /// All clauses that ever became active
    pub active_clauses: usize,

    // Splitting
    pub split_clauses: usize,
    pub split_components: usize,
    pub sat_recomputations: usize,

    /// Milliseconds spent inside BDD operations
    pub bdd_time_ms: u64,

    pub termination_reason: TerminationReason,
    /// Clause ID of the refutation, if one was found
    pub refutation: Option<usize>,
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics {
            input_clauses: 0,
            resolutions: 0,
            factorings: 0,
            equality_resolutions: 0,
            forward_superpositions: 0,
            backward_superpositions: 0,
            duplicate_literals: 0,
            trivial_inequalities: 0,
            forward_demodulations: 0,
            backward_demodulations: 0,
            forward_subsumption_resolutions: 0,
            simple_tautologies: 0,
            equational_tautologies: 0,
            forward_subsumed: 0,
            backward_subsumed: 0,
            generated_clauses: 0,
            passive_clauses: 0,
            active_clauses: 0,
            split_clauses: 0,
            split_components: 0,
            sat_recomputations: 0,
            bdd_time_ms: 0,
            termination_reason: TerminationReason::Unknown,
            refutation: None,
        }
    }
}

impl Statistics {
    /// Print the non-zero counters, one per line.
    pub fn print(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "------------------------------")?;
        writeln!(out, "Input clauses: {}", self.input_clauses)?;
        writeln!(out, "Generated clauses: {}", self.generated_clauses)?;
        writeln!(out, "Active clauses: {}", self.active_clauses)?;
        writeln!(out, "Passive clauses: {}", self.passive_clauses)?;

        let rules: [(&str, usize); 14] = [
            ("Binary resolutions", self.resolutions),
            ("Factorings", self.factorings),
            ("Equality resolutions", self.equality_resolutions),
            ("Forward superpositions", self.forward_superpositions),
            ("Backward superpositions", self.backward_superpositions),
            ("Duplicate literals removed", self.duplicate_literals),
            ("Trivial inequalities removed", self.trivial_inequalities),
            ("Forward demodulations", self.forward_demodulations),
            ("Backward demodulations", self.backward_demodulations),
            ("Simple tautologies", self.simple_tautologies),
            ("Equational tautologies", self.equational_tautologies),
            ("Forward subsumed", self.forward_subsumed),
            ("Backward subsumed", self.backward_subsumed),
            (
                "Forward subsumption resolutions",
                self.forward_subsumption_resolutions,
            ),
        ];
        for (label, value) in rules {
            if value > 0 {
                writeln!(out, "{}: {}", label, value)?;
            }
        }

        if self.split_clauses > 0 || self.split_components > 0 {
            writeln!(out, "Split clauses: {}", self.split_clauses)?;
            writeln!(out, "Split components: {}", self.split_components)?;
            writeln!(out, "SAT model recomputations: {}", self.sat_recomputations)?;
        }
        writeln!(out, "Time spent on BDDs: {} ms", self.bdd_time_ms)?;
        writeln!(out, "------------------------------")?;
        Ok(())
    }
}
