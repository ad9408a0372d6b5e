//! TPTP input reader.

pub mod tptp;

pub use tptp::{parse_problem, parse_problem_file, ParsedProblem};
