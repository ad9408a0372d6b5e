//! Literal selection strategies.
//!
//! A selector picks the non-empty subset of a clause's literals that drive
//! resolution and superposition. Selection is a pure function of the
//! literal list and the term ordering, so re-selecting the same clause
//! always yields the same literals.

use crate::fol::{Clause, Kbo, Literal, Term, TermOrdering, VariableId};
use std::collections::HashMap;

/// A literal selection strategy.
pub trait LiteralSelector {
    /// Indices of the selected literals, in ascending order. Non-empty for
    /// non-empty clauses.
    fn select(&self, clause: &Clause, kbo: &Kbo) -> Vec<usize>;

    /// Strategy name (for reporting)
    fn name(&self) -> &'static str;

    /// Whether the strategy preserves refutational completeness
    fn is_complete(&self) -> bool {
        true
    }
}

fn literal_weight(lit: &Literal) -> usize {
    lit.symbol_count()
}

fn count_literal_variables(lit: &Literal) -> HashMap<VariableId, usize> {
    let mut counts = HashMap::new();
    for arg in &lit.args {
        count_term_variables(arg, &mut counts);
    }
    counts
}

fn count_term_variables(term: &Term, counts: &mut HashMap<VariableId, usize>) {
    match term {
        Term::Variable(v) => *counts.entry(v.id).or_insert(0) += 1,
        Term::Constant(_) => {}
        Term::Function(_, args) => {
            for arg in args {
                count_term_variables(arg, counts);
            }
        }
    }
}

/// KBO extended to atoms: variable condition, then weight, then predicate
/// precedence (by ID), then lexicographic argument comparison.
fn literal_greater(lit1: &Literal, lit2: &Literal, kbo: &Kbo) -> bool {
    let vars1 = count_literal_variables(lit1);
    let vars2 = count_literal_variables(lit2);
    let var_cond = vars2
        .iter()
        .all(|(v, n)| vars1.get(v).copied().unwrap_or(0) >= *n);
    if !var_cond {
        return false;
    }

    let w1 = literal_weight(lit1);
    let w2 = literal_weight(lit2);
    if w1 != w2 {
        return w1 > w2;
    }

    if lit1.predicate.id != lit2.predicate.id {
        return lit1.predicate.id > lit2.predicate.id;
    }

    for (a1, a2) in lit1.args.iter().zip(lit2.args.iter()) {
        match kbo.compare(a1, a2) {
            TermOrdering::Greater => return true,
            TermOrdering::Less => return false,
            TermOrdering::Equal | TermOrdering::Incomparable => continue,
        }
    }
    false
}

fn maximal_literals(clause: &Clause, kbo: &Kbo) -> Vec<usize> {
    (0..clause.literals.len())
        .filter(|&i| {
            !(0..clause.literals.len()).any(|j| {
                i != j && literal_greater(&clause.literals[j], &clause.literals[i], kbo)
            })
        })
        .collect()
}

fn max_weight_negative(clause: &Clause) -> Option<usize> {
    clause
        .literals
        .iter()
        .enumerate()
        .filter(|(_, lit)| !lit.polarity)
        .max_by_key(|&(i, lit)| (literal_weight(lit), usize::MAX - i))
        .map(|(i, _)| i)
}

/// Select every literal (no selection).
pub struct SelectAll;

impl LiteralSelector for SelectAll {
    fn select(&self, clause: &Clause, _kbo: &Kbo) -> Vec<usize> {
        (0..clause.literals.len()).collect()
    }

    fn name(&self) -> &'static str {
        "all"
    }
}

/// Select all maximal literals under the ordering.
pub struct SelectMaximal;

impl LiteralSelector for SelectMaximal {
    fn select(&self, clause: &Clause, kbo: &Kbo) -> Vec<usize> {
        maximal_literals(clause, kbo)
    }

    fn name(&self) -> &'static str {
        "maximal"
    }
}

/// Select the unique maximal literal if there is one, else a max-weight
/// negative literal, else all maximal literals.
pub struct SelectUniqueMaximal;

impl LiteralSelector for SelectUniqueMaximal {
    fn select(&self, clause: &Clause, kbo: &Kbo) -> Vec<usize> {
        let maximal = maximal_literals(clause, kbo);
        if maximal.len() == 1 {
            return maximal;
        }
        if let Some(neg) = max_weight_negative(clause) {
            return vec![neg];
        }
        maximal
    }

    fn name(&self) -> &'static str {
        "unique_maximal"
    }
}

/// Select a max-weight negative literal if any, else all maximal literals.
pub struct SelectNegativeMaxWeight;

impl LiteralSelector for SelectNegativeMaxWeight {
    fn select(&self, clause: &Clause, kbo: &Kbo) -> Vec<usize> {
        if let Some(neg) = max_weight_negative(clause) {
            return vec![neg];
        }
        maximal_literals(clause, kbo)
    }

    fn name(&self) -> &'static str {
        "negative_max_weight"
    }
}

/// Build a selector by strategy name.
pub fn selector_from_name(name: &str) -> Option<Box<dyn LiteralSelector>> {
    match name {
        "all" => Some(Box::new(SelectAll)),
        "maximal" => Some(Box::new(SelectMaximal)),
        "unique_maximal" => Some(Box::new(SelectUniqueMaximal)),
        "negative_max_weight" => Some(Box::new(SelectNegativeMaxWeight)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, FunctionSymbol, Interner, PredicateSymbol, Variable};

    struct Ctx {
        interner: Interner,
    }

    impl Ctx {
        fn new() -> Self {
            Ctx {
                interner: Interner::new(),
            }
        }

        fn const_(&mut self, name: &str) -> Term {
            Term::Constant(Constant::new(self.interner.intern_constant(name)))
        }

        fn var(&mut self, name: &str) -> Term {
            Term::Variable(Variable::new(self.interner.intern_variable(name)))
        }

        fn func(&mut self, name: &str, args: Vec<Term>) -> Term {
            let id = self.interner.intern_function(name);
            Term::Function(FunctionSymbol::new(id, args.len() as u8), args)
        }

        fn pred(&mut self, name: &str, arity: u8) -> PredicateSymbol {
            PredicateSymbol::new(self.interner.intern_predicate(name), arity)
        }
    }

    #[test]
    fn select_all_selects_everything() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("P", 1);
        let a = ctx.const_("a");
        let clause = Clause::new(vec![
            Literal::positive(p, vec![a.clone()]),
            Literal::negative(p, vec![a]),
        ]);
        assert_eq!(SelectAll.select(&clause, &Kbo::default()), vec![0, 1]);
    }

    #[test]
    fn heavier_literal_is_maximal() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("P", 1);
        let a = ctx.const_("a");
        let fa = ctx.func("f", vec![a.clone()]);
        let ffa = ctx.func("f", vec![fa]);
        let clause = Clause::new(vec![
            Literal::positive(p, vec![a]),
            Literal::positive(p, vec![ffa]),
        ]);
        assert_eq!(SelectMaximal.select(&clause, &Kbo::default()), vec![1]);
    }

    #[test]
    fn negative_preferred_when_no_unique_maximal() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("P", 1);
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let clause = Clause::new(vec![
            Literal::positive(p, vec![x]),
            Literal::negative(p, vec![y]),
        ]);
        // Two incomparable literals; the negative one is selected
        assert_eq!(
            SelectUniqueMaximal.select(&clause, &Kbo::default()),
            vec![1]
        );
    }

    #[test]
    fn selection_is_stable() {
        let mut ctx = Ctx::new();
        let p = ctx.pred("P", 2);
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let clause = Clause::new(vec![
            Literal::positive(p, vec![x.clone(), a.clone()]),
            Literal::negative(p, vec![a, x]),
        ]);
        let kbo = Kbo::default();
        let first = SelectUniqueMaximal.select(&clause, &kbo);
        for _ in 0..5 {
            assert_eq!(SelectUniqueMaximal.select(&clause, &kbo), first);
        }
        assert!(!first.is_empty());
    }
}
