//! Incremental satisfiability of a conjunction of BDDs.
//!
//! The aggregator keeps the list of added BDDs together with one candidate
//! assignment over the variables `[0 .. max_var]`. Adding a node tries to
//! extend the assignment to satisfy it while preserving every BDD added
//! earlier; when that fails the aggregator latches unsatisfiable and must
//! not be used further.
//!
//! The search walks each BDD under the current assignment, remembering the
//! decision points where a false branch was taken. On reaching FALSE it
//! flips the deepest decision variable to true, zeroes all lower variables
//! and retries; when the local decision stack is exhausted it restarts from
//! the root using the set of decision variables remembered from earlier
//! satisfying walks. Nodes whose verification changed the assignment move
//! to the head of the list, so the most recently violated constraint is
//! revisited first.

use super::{Bdd, NodeId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
    /// Node satisfied without touching the assignment
    Unchanged,
    /// Node satisfied after changing the assignment
    Changed,
    /// No extension satisfies the node
    Unsat,
}

/// Stateful conjunction-of-BDDs satisfiability checker.
#[derive(Debug, Default)]
pub struct BddConjunction {
    /// Added non-constant BDDs; head holds the most recently violated
    nodes: Vec<NodeId>,
    /// Candidate assignment, indexed by variable number
    assignment: Vec<bool>,
    max_var: i32,
    /// Decision variables remembered from satisfying walks
    decision_points: BTreeSet<i32>,
    unsat: bool,
}

impl BddConjunction {
    pub fn new() -> Self {
        BddConjunction::default()
    }

    /// True once the conjunction has been found unsatisfiable.
    pub fn is_unsat(&self) -> bool {
        self.unsat
    }

    /// Truth value of a variable in the current candidate assignment.
    pub fn assigned(&self, var: u32) -> bool {
        self.assignment.get(var as usize).copied().unwrap_or(false)
    }

    /// Add a BDD to the conjunction.
    ///
    /// A latched aggregator ignores further additions.
    pub fn add_node(&mut self, bdd: &Bdd, n: NodeId) {
        if self.unsat {
            return;
        }
        if bdd.is_constant(n) {
            if bdd.is_false(n) {
                self.unsat = true;
            }
            return;
        }

        let var = bdd.var_of(n);
        if var > self.max_var {
            self.max_var = var;
        }
        if self.assignment.len() <= self.max_var as usize {
            self.assignment.resize(self.max_var as usize + 1, false);
        }

        self.nodes.insert(0, n);

        match self.seek_assignment(bdd, n) {
            Seek::Unsat => {
                self.unsat = true;
                return;
            }
            Seek::Unchanged => return,
            Seek::Changed => {}
        }

        // The assignment moved: re-verify all previously added nodes. A
        // node that forces another change moves to the head and the pass
        // restarts behind it.
        let mut i = 1;
        while i < self.nodes.len() {
            match self.seek_assignment(bdd, self.nodes[i]) {
                Seek::Unsat => {
                    self.unsat = true;
                    return;
                }
                Seek::Unchanged => i += 1,
                Seek::Changed => {
                    let moved = self.nodes.remove(i);
                    self.nodes.insert(0, moved);
                    self.decision_points.clear();
                    i = 1;
                }
            }
        }
    }

    /// Extend the current assignment to satisfy `n0`.
    fn seek_assignment(&mut self, bdd: &Bdd, n0: NodeId) -> Seek {
        debug_assert!(!bdd.is_constant(n0));
        let mut changed = false;
        let mut dec_stack: Vec<NodeId> = Vec::new();
        // The restart step can fire at most once per seek; a second
        // exhaustion means no extension exists.
        let mut restarted = false;

        let mut n = n0;
        loop {
            // Walk under the current assignment, pushing false-branch
            // decision points.
            while !bdd.is_constant(n) {
                if self.assignment[bdd.var_of(n) as usize] {
                    n = bdd.pos_of(n);
                } else {
                    dec_stack.push(n);
                    n = bdd.neg_of(n);
                }
            }

            if bdd.is_true(n) {
                // Remember the decision variables of the satisfying walk
                // for future restarts.
                let mut m = n0;
                while !bdd.is_constant(m) {
                    if self.assignment[bdd.var_of(m) as usize] {
                        m = bdd.pos_of(m);
                    } else {
                        self.decision_points.insert(bdd.var_of(m));
                        m = bdd.neg_of(m);
                    }
                }
                debug_assert!(bdd.is_true(m));
                return if changed { Seek::Changed } else { Seek::Unchanged };
            }

            changed = true;

            let flip_var;
            if let Some(dec) = dec_stack.pop() {
                flip_var = bdd.var_of(dec);
                n = bdd.pos_of(dec);
            } else {
                if restarted {
                    return Seek::Unsat;
                }
                restarted = true;
                // Restart: flip the least remembered decision variable
                // above this BDD's root.
                let root_var = bdd.var_of(n0);
                match self.decision_points.range(root_var + 1..).next() {
                    Some(&v) => flip_var = v,
                    None => return Seek::Unsat,
                }
                dec_stack.clear();
                n = n0;
            }

            debug_assert!(!self.assignment[flip_var as usize]);
            self.assignment[flip_var as usize] = true;
            for lower in 0..flip_var {
                self.assignment[lower as usize] = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Limits;

    #[test]
    fn tautology_is_noop() {
        let bdd = Bdd::new();
        let mut agg = BddConjunction::new();
        agg.add_node(&bdd, Bdd::TRUE);
        assert!(!agg.is_unsat());
    }

    #[test]
    fn false_latches_unsat() {
        let bdd = Bdd::new();
        let mut agg = BddConjunction::new();
        agg.add_node(&bdd, Bdd::FALSE);
        assert!(agg.is_unsat());
    }

    #[test]
    fn contradictory_atomics_latch_unsat() {
        let mut bdd = Bdd::new();
        let x = bdd.atomic(0, true);
        let nx = bdd.atomic(0, false);

        let mut agg = BddConjunction::new();
        agg.add_node(&bdd, x);
        assert!(!agg.is_unsat());
        agg.add_node(&bdd, nx);
        assert!(agg.is_unsat());
    }

    #[test]
    fn assignment_satisfies_all_added_nodes() {
        let mut bdd = Bdd::new();
        let l = Limits::none();
        let x0 = bdd.atomic(0, true);
        let nx1 = bdd.atomic(1, false);
        let x1 = bdd.atomic(1, true);
        let or = bdd.disjunction(nx1, x0, &l).unwrap();

        let mut agg = BddConjunction::new();
        agg.add_node(&bdd, or);
        agg.add_node(&bdd, x1);
        assert!(!agg.is_unsat());
        // x1 and (x0 | !x1) force x1 = true; x0 must then be true as well
        assert!(agg.assigned(1));
        assert!(agg.assigned(0));
    }

    #[test]
    fn backtracking_finds_second_branch() {
        let mut bdd = Bdd::new();
        let l = Limits::none();
        // (x0 | x1) & !x0 is satisfiable only with x1 = true
        let x0 = bdd.atomic(0, true);
        let x1 = bdd.atomic(1, true);
        let nx0 = bdd.atomic(0, false);
        let or = bdd.disjunction(x0, x1, &l).unwrap();

        let mut agg = BddConjunction::new();
        agg.add_node(&bdd, or);
        agg.add_node(&bdd, nx0);
        assert!(!agg.is_unsat());
        assert!(agg.assigned(1));
        assert!(!agg.assigned(0));
    }

    #[test]
    fn three_way_conflict() {
        let mut bdd = Bdd::new();
        let l = Limits::none();
        // (x0 | x1) & !x0 & !x1 is unsatisfiable
        let x0 = bdd.atomic(0, true);
        let x1 = bdd.atomic(1, true);
        let nx0 = bdd.atomic(0, false);
        let nx1 = bdd.atomic(1, false);
        let or = bdd.disjunction(x0, x1, &l).unwrap();

        let mut agg = BddConjunction::new();
        agg.add_node(&bdd, or);
        agg.add_node(&bdd, nx0);
        agg.add_node(&bdd, nx1);
        assert!(agg.is_unsat());
    }
}
