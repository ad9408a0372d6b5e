//! Terms in first-order logic

use super::interner::{ConstantId, FunctionId, Interner, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A variable in first-order logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
}

impl Variable {
    pub fn new(id: VariableId) -> Self {
        Variable { id }
    }

    /// Get the name of this variable from the interner
    pub fn name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve_variable(self.id)
    }
}

/// A constant symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constant {
    pub id: ConstantId,
}

impl Constant {
    pub fn new(id: ConstantId) -> Self {
        Constant { id }
    }

    /// Get the name of this constant from the interner
    pub fn name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve_constant(self.id)
    }
}

/// A function symbol with arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSymbol {
    pub id: FunctionId,
    pub arity: u8,
}

impl FunctionSymbol {
    pub fn new(id: FunctionId, arity: u8) -> Self {
        FunctionSymbol { id, arity }
    }

    /// Get the name of this function symbol from the interner
    pub fn name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve_function(self.id)
    }
}

/// A term in first-order logic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Variable(Variable),
    Constant(Constant),
    Function(FunctionSymbol, Vec<Term>),
}

impl Term {
    /// Check whether this term contains no variables
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Constant(_) => true,
            Term::Function(_, args) => args.iter().all(Term::is_ground),
        }
    }

    /// Collect all variable IDs in this term
    pub fn collect_variables(&self, vars: &mut HashSet<VariableId>) {
        match self {
            Term::Variable(v) => {
                vars.insert(v.id);
            }
            Term::Constant(_) => {}
            Term::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }

    /// Number of symbol occurrences (variables, constants, functions)
    pub fn symbol_count(&self) -> usize {
        match self {
            Term::Variable(_) | Term::Constant(_) => 1,
            Term::Function(_, args) => 1 + args.iter().map(Term::symbol_count).sum::<usize>(),
        }
    }

    /// Return the subterm at `path`, where each path element is an argument
    /// index. An empty path is the term itself.
    pub fn subterm_at(&self, path: &[usize]) -> Option<&Term> {
        let mut current = self;
        for &i in path {
            match current {
                Term::Function(_, args) => current = args.get(i)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Replace the subterm at `path` with `replacement`
    pub fn replace_at(&self, path: &[usize], replacement: &Term) -> Term {
        if path.is_empty() {
            return replacement.clone();
        }
        match self {
            Term::Variable(_) | Term::Constant(_) => self.clone(),
            Term::Function(f, args) => {
                let mut new_args = args.clone();
                new_args[path[0]] = new_args[path[0]].replace_at(&path[1..], replacement);
                Term::Function(*f, new_args)
            }
        }
    }

    /// Format this term with an interner for name resolution
    pub fn display<'a>(&'a self, interner: &'a Interner) -> TermDisplay<'a> {
        TermDisplay {
            term: self,
            interner,
        }
    }
}

/// Display wrapper for Term that includes an interner for name resolution
pub struct TermDisplay<'a> {
    term: &'a Term,
    interner: &'a Interner,
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Term::Variable(v) => write!(f, "{}", self.interner.resolve_variable(v.id)),
            Term::Constant(c) => write!(f, "{}", self.interner.resolve_constant(c.id)),
            Term::Function(func, args) => {
                write!(f, "{}", self.interner.resolve_function(func.id))?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{}", arg.display(self.interner))?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

// Display implementations that show raw IDs (for debugging without interner)

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{}", v.id),
            Term::Constant(c) => write!(f, "{}", c.id),
            Term::Function(func, args) => {
                write!(f, "{}(", func.id)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(interner: &mut Interner) -> Term {
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));
        let f = FunctionSymbol::new(interner.intern_function("f"), 2);
        Term::Function(f, vec![a, x])
    }

    #[test]
    fn ground_and_symbol_count() {
        let mut interner = Interner::new();
        let t = sample(&mut interner);
        assert!(!t.is_ground());
        assert_eq!(t.symbol_count(), 3);
    }

    #[test]
    fn subterm_navigation() {
        let mut interner = Interner::new();
        let t = sample(&mut interner);
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        assert_eq!(t.subterm_at(&[0]), Some(&a));
        assert_eq!(t.subterm_at(&[]), Some(&t));
        assert_eq!(t.subterm_at(&[0, 0]), None);

        let b = Term::Constant(Constant::new(interner.intern_constant("b")));
        let replaced = t.replace_at(&[1], &b);
        assert_eq!(replaced.subterm_at(&[1]), Some(&b));
        assert!(replaced.is_ground());
    }
}
