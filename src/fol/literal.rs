//! Literals in first-order logic

use super::interner::{Interner, PredicateId, VariableId};
use super::term::Term;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A predicate symbol with arity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateSymbol {
    pub id: PredicateId,
    pub arity: u8,
}

impl PredicateSymbol {
    pub fn new(id: PredicateId, arity: u8) -> Self {
        PredicateSymbol { id, arity }
    }

    /// Get the name of this predicate symbol from the interner
    pub fn name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve_predicate(self.id)
    }
}

/// A literal: a predicate applied to terms, with a polarity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub predicate: PredicateSymbol,
    pub args: Vec<Term>,
    pub polarity: bool,
}

impl Literal {
    pub fn positive(predicate: PredicateSymbol, args: Vec<Term>) -> Self {
        Literal {
            predicate,
            args,
            polarity: true,
        }
    }

    pub fn negative(predicate: PredicateSymbol, args: Vec<Term>) -> Self {
        Literal {
            predicate,
            args,
            polarity: false,
        }
    }

    /// The same atom with flipped polarity
    pub fn complement(&self) -> Literal {
        Literal {
            predicate: self.predicate,
            args: self.args.clone(),
            polarity: !self.polarity,
        }
    }

    /// Check if this literal is an equality atom
    pub fn is_equality(&self, interner: &Interner) -> bool {
        self.predicate.arity == 2 && Some(self.predicate.id) == interner.get_predicate("=")
    }

    /// Check whether the literal contains no variables
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }

    /// Collect all variable IDs occurring in this literal
    pub fn collect_variables(&self, vars: &mut HashSet<VariableId>) {
        for arg in &self.args {
            arg.collect_variables(vars);
        }
    }

    /// Number of symbol occurrences, counting the predicate symbol
    pub fn symbol_count(&self) -> usize {
        1 + self.args.iter().map(Term::symbol_count).sum::<usize>()
    }

    /// Format this literal with an interner for name resolution
    pub fn display<'a>(&'a self, interner: &'a Interner) -> LiteralDisplay<'a> {
        LiteralDisplay {
            literal: self,
            interner,
        }
    }
}

/// Display wrapper for Literal that includes an interner for name resolution
pub struct LiteralDisplay<'a> {
    literal: &'a Literal,
    interner: &'a Interner,
}

impl fmt::Display for LiteralDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lit = self.literal;
        if lit.is_equality(self.interner) {
            let op = if lit.polarity { "=" } else { "!=" };
            return write!(
                f,
                "{} {} {}",
                lit.args[0].display(self.interner),
                op,
                lit.args[1].display(self.interner)
            );
        }
        if !lit.polarity {
            write!(f, "~")?;
        }
        write!(f, "{}", self.interner.resolve_predicate(lit.predicate.id))?;
        if !lit.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in lit.args.iter().enumerate() {
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

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.polarity {
            write!(f, "~")?;
        }
        write!(f, "{}(", self.predicate.id)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}
