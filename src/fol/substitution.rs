//! Variable substitutions

use super::clause::Clause;
use super::interner::VariableId;
use super::literal::Literal;
use super::term::{Term, Variable};
use std::collections::HashMap;

/// A substitution mapping variable IDs to terms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    pub map: HashMap<VariableId, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution {
            map: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Add a variable -> term mapping
    pub fn insert(&mut self, var: Variable, term: Term) {
        self.map.insert(var.id, term);
    }

    /// Add a mapping with eager propagation: the inserted term is first
    /// normalized under the current substitution, then the new binding is
    /// pushed through all existing bindings. Keeps every binding fully
    /// substituted, so application never needs a fixpoint loop.
    pub fn bind(&mut self, var: Variable, term: Term) {
        let normalized = term.apply_substitution(self);
        self.map.insert(var.id, normalized.clone());

        let single = Substitution {
            map: HashMap::from([(var.id, normalized)]),
        };
        for (&id, bound) in self.map.clone().iter() {
            if id != var.id {
                self.map.insert(id, bound.apply_substitution(&single));
            }
        }
    }

    /// Get the term for a variable ID, if bound
    pub fn get(&self, var_id: VariableId) -> Option<&Term> {
        self.map.get(&var_id)
    }
}

impl Term {
    /// Apply a substitution to this term
    pub fn apply_substitution(&self, subst: &Substitution) -> Term {
        match self {
            Term::Variable(v) => subst
                .map
                .get(&v.id)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Term::Constant(_) => self.clone(),
            Term::Function(f, args) => Term::Function(
                *f,
                args.iter()
                    .map(|arg| arg.apply_substitution(subst))
                    .collect(),
            ),
        }
    }
}

impl Literal {
    /// Apply a substitution to this literal
    pub fn apply_substitution(&self, subst: &Substitution) -> Literal {
        Literal {
            predicate: self.predicate,
            args: self
                .args
                .iter()
                .map(|arg| arg.apply_substitution(subst))
                .collect(),
            polarity: self.polarity,
        }
    }
}

impl Clause {
    /// Apply a substitution to every literal of this clause
    pub fn apply_substitution(&self, subst: &Substitution) -> Vec<Literal> {
        self.literals
            .iter()
            .map(|lit| lit.apply_substitution(subst))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, FunctionSymbol, Interner};

    #[test]
    fn apply_binds_variable() {
        let mut interner = Interner::new();
        let x = Variable::new(interner.intern_variable("X"));
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));

        let mut subst = Substitution::new();
        subst.insert(x, a.clone());
        assert_eq!(Term::Variable(x).apply_substitution(&subst), a);
    }

    #[test]
    fn bind_propagates_through_existing_bindings() {
        let mut interner = Interner::new();
        let x = Variable::new(interner.intern_variable("X"));
        let y = Variable::new(interner.intern_variable("Y"));
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let f = FunctionSymbol::new(interner.intern_function("f"), 1);

        // X -> f(Y), then Y -> a must rewrite the first binding
        let mut subst = Substitution::new();
        subst.bind(x, Term::Function(f, vec![Term::Variable(y)]));
        subst.bind(y, a.clone());

        let expected = Term::Function(f, vec![a]);
        assert_eq!(subst.get(x.id), Some(&expected));
    }
}
