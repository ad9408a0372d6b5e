//! Indexing substrate: substitution trees and the typed, reference-counted
//! index manager that keeps them synchronized with the clause containers.

pub mod manager;
pub mod substitution_tree;

pub use manager::{IndexManager, IndexType, Stream, TypedIndex};
pub use substitution_tree::{Binding, QueryIter, QueryMode, SubstitutionTree};
