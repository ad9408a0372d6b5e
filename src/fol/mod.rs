//! First-order logic data structures: terms, literals, clauses, split sets,
//! substitutions and the term ordering.

pub mod clause;
pub mod interner;
pub mod literal;
pub mod ordering;
pub mod split_set;
pub mod substitution;
pub mod term;

pub use clause::{Clause, ClauseRole, ClauseSet, Derivation, Rule};
pub use interner::{ConstantId, FunctionId, Interner, PredicateId, VariableId};
pub use literal::{Literal, PredicateSymbol};
pub use ordering::{orient_clause_equalities, Kbo, KboConfig, TermOrdering};
pub use split_set::{SplitLevel, SplitSet};
pub use substitution::Substitution;
pub use term::{Constant, FunctionSymbol, Term, Variable};
