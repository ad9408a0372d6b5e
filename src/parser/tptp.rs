//! Parser for TPTP cnf problems.
//!
//! The prover consumes problems at the clause level: `cnf(...)` annotated
//! formulas plus `include(...)` directives. Clausification of full
//! first-order formulas is the preprocessor's job, so a `fof` unit is
//! reported as a user error rather than silently ignored.

use crate::env::{ProverError, ProverResult};
use crate::fol::{
    Clause, ClauseRole, ClauseSet, Constant, FunctionSymbol, Interner, Literal, PredicateSymbol,
    Term, Variable,
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, multispace1},
    combinator::{map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, tuple},
    IResult,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Result of reading a problem: the clause list and the interner that
/// names its symbols.
#[derive(Debug)]
pub struct ParsedProblem {
    pub clauses: ClauseSet,
    pub interner: Interner,
}

/// One raw literal before interning
#[derive(Debug, Clone)]
struct RawLiteral {
    polarity: bool,
    predicate: String,
    args: Vec<RawTerm>,
}

#[derive(Debug, Clone)]
enum RawTerm {
    Variable(String),
    /// Constant or function application
    Applied(String, Vec<RawTerm>),
}

#[derive(Debug)]
enum Unit {
    Clause {
        role: String,
        literals: Vec<RawLiteral>,
    },
    Include(String),
}

fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), tuple((char('%'), take_until("\n"), char('\n')))),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

fn token<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    preceded(ws, inner)
}

fn lower_word(input: &str) -> IResult<&str, &str> {
    let (input, word) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    if word.starts_with(|c: char| c.is_lowercase() || c.is_ascii_digit()) {
        Ok((input, word))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )))
    }
}

fn upper_word(input: &str) -> IResult<&str, &str> {
    let (input, word) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    if word.starts_with(char::is_uppercase) {
        Ok((input, word))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )))
    }
}

fn term(input: &str) -> IResult<&str, RawTerm> {
    alt((
        map(token(upper_word), |name| RawTerm::Variable(name.to_string())),
        map(
            tuple((
                token(lower_word),
                opt(delimited(
                    token(char('(')),
                    separated_list1(token(char(',')), term),
                    token(char(')')),
                )),
            )),
            |(name, args)| RawTerm::Applied(name.to_string(), args.unwrap_or_default()),
        ),
    ))(input)
}

/// An atom or an (in)equality written infix.
fn literal(input: &str) -> IResult<&str, RawLiteral> {
    // ~atom
    if let Ok((rest, _)) = token(char('~'))(input) {
        let (rest, mut lit) = literal(rest)?;
        lit.polarity = !lit.polarity;
        return Ok((rest, lit));
    }

    let (rest, lhs) = term(input)?;
    // Infix equality / disequality
    if let Ok((rest2, op)) = token::<&str>(alt((tag("!="), tag("="))))(rest) {
        let (rest3, rhs) = term(rest2)?;
        return Ok((
            rest3,
            RawLiteral {
                polarity: op == "=",
                predicate: "=".to_string(),
                args: vec![lhs, rhs],
            },
        ));
    }

    // A plain atom: reinterpret the parsed term
    match lhs {
        RawTerm::Applied(name, args) => Ok((
            rest,
            RawLiteral {
                polarity: true,
                predicate: name,
                args,
            },
        )),
        RawTerm::Variable(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn disjunction(input: &str) -> IResult<&str, Vec<RawLiteral>> {
    alt((
        delimited(
            token(char('(')),
            separated_list1(token(char('|')), literal),
            token(char(')')),
        ),
        separated_list1(token(char('|')), literal),
    ))(input)
}

fn cnf_unit(input: &str) -> IResult<&str, Unit> {
    let (input, _) = token(tag("cnf"))(input)?;
    let (input, _) = token(char('('))(input)?;
    let (input, _name) = token(take_while1(|c: char| {
        c.is_alphanumeric() || c == '_' || c == '\''
    }))(input)?;
    let (input, _) = token(char(','))(input)?;
    let (input, role) = token(lower_word)(input)?;
    let (input, _) = token(char(','))(input)?;
    let (input, literals) = disjunction(input)?;
    let (input, _) = token(char(')'))(input)?;
    let (input, _) = token(char('.'))(input)?;
    Ok((
        input,
        Unit::Clause {
            role: role.to_string(),
            literals,
        },
    ))
}

fn include_unit(input: &str) -> IResult<&str, Unit> {
    let (input, _) = token(tag("include"))(input)?;
    let (input, _) = token(char('('))(input)?;
    let (input, _) = token(char('\''))(input)?;
    let (input, path) = take_until("'")(input)?;
    let (input, _) = char('\'')(input)?;
    let (input, _) = token(char(')'))(input)?;
    let (input, _) = token(char('.'))(input)?;
    Ok((input, Unit::Include(path.to_string())))
}

fn units(input: &str) -> IResult<&str, Vec<Unit>> {
    let (input, parsed) = many0(alt((cnf_unit, include_unit)))(input)?;
    let (input, _) = ws(input)?;
    Ok((input, parsed))
}

fn intern_term(raw: &RawTerm, interner: &mut Interner) -> Term {
    match raw {
        RawTerm::Variable(name) => Term::Variable(Variable::new(interner.intern_variable(name))),
        RawTerm::Applied(name, args) if args.is_empty() => {
            Term::Constant(Constant::new(interner.intern_constant(name)))
        }
        RawTerm::Applied(name, args) => {
            let symbol = FunctionSymbol::new(interner.intern_function(name), args.len() as u8);
            Term::Function(
                symbol,
                args.iter().map(|a| intern_term(a, interner)).collect(),
            )
        }
    }
}

fn intern_literal(raw: &RawLiteral, interner: &mut Interner) -> Literal {
    let predicate =
        PredicateSymbol::new(interner.intern_predicate(&raw.predicate), raw.args.len() as u8);
    let args = raw.args.iter().map(|a| intern_term(a, interner)).collect();
    Literal {
        predicate,
        args,
        polarity: raw.polarity,
    }
}

/// Parse TPTP content into a clause list.
pub fn parse_problem(content: &str, include_dirs: &[&str]) -> ProverResult<ParsedProblem> {
    let mut interner = Interner::new();
    let mut clauses = Vec::new();
    let mut visited = HashSet::new();
    parse_content(
        content,
        include_dirs,
        Path::new("."),
        &mut interner,
        &mut clauses,
        &mut visited,
    )?;
    Ok(ParsedProblem {
        clauses: ClauseSet { clauses },
        interner,
    })
}

/// Parse a TPTP problem file, resolving includes against the file's
/// directory and the given include directories.
pub fn parse_problem_file(path: &str, include_dirs: &[&str]) -> ProverResult<ParsedProblem> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ProverError::UserError(format!("cannot read {}: {}", path, e)))?;
    let base = Path::new(path).parent().unwrap_or(Path::new("."));

    let mut interner = Interner::new();
    let mut clauses = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(PathBuf::from(path));
    parse_content(
        &content,
        include_dirs,
        base,
        &mut interner,
        &mut clauses,
        &mut visited,
    )?;
    Ok(ParsedProblem {
        clauses: ClauseSet { clauses },
        interner,
    })
}

fn parse_content(
    content: &str,
    include_dirs: &[&str],
    base: &Path,
    interner: &mut Interner,
    clauses: &mut Vec<Clause>,
    visited: &mut HashSet<PathBuf>,
) -> ProverResult<()> {
    let (rest, parsed) =
        units(content).map_err(|e| ProverError::UserError(format!("parse error: {}", e)))?;
    if !rest.trim().is_empty() {
        let snippet: String = rest.trim().chars().take(40).collect();
        if snippet.starts_with("fof") || snippet.starts_with("tff") {
            return Err(ProverError::UserError(
                "formula units are not supported; run the clausifier first".to_string(),
            ));
        }
        return Err(ProverError::UserError(format!(
            "unparsed input near '{}'",
            snippet
        )));
    }

    for unit in parsed {
        match unit {
            Unit::Clause { role, literals } => {
                let literals = literals
                    .iter()
                    .map(|raw| intern_literal(raw, interner))
                    .collect();
                let mut clause = Clause::new(literals);
                clause.role = ClauseRole::from_tptp_role(&role);
                clauses.push(clause);
            }
            Unit::Include(path) => {
                let resolved = resolve_include(&path, base, include_dirs).ok_or_else(|| {
                    ProverError::UserError(format!("cannot resolve include '{}'", path))
                })?;
                if !visited.insert(resolved.clone()) {
                    continue;
                }
                let included = std::fs::read_to_string(&resolved).map_err(|e| {
                    ProverError::UserError(format!("cannot read {}: {}", resolved.display(), e))
                })?;
                parse_content(&included, include_dirs, base, interner, clauses, visited)?;
            }
        }
    }
    Ok(())
}

fn resolve_include(path: &str, base: &Path, include_dirs: &[&str]) -> Option<PathBuf> {
    let direct = base.join(path);
    if direct.exists() {
        return Some(direct);
    }
    for dir in include_dirs {
        let candidate = Path::new(dir).join(path);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
