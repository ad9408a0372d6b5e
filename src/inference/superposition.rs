//! Superposition.
//!
//! From `l = r | C` and `L[l'] | D` with `sigma = mgu(l, l')` derive
//! `(L[r] | C | D) sigma`, provided `l' ` is not a variable, `l sigma` is
//! not smaller than `r sigma`, and a rewritten equality side is not smaller
//! than its partner side. The forward direction treats the given clause as
//! the equality premise and finds rewrite positions through the
//! superposition subterm index; the backward direction rewrites inside the
//! given clause with equalities from the superposition LHS index.

use super::{collect_except, dedup_literals, rename_apart, Engine, GeneratingRule, NewClause, View};
use crate::env::ProverResult;
use crate::fol::{Kbo, Literal, Rule, Substitution, Term, TermOrdering};
use crate::index::{Binding, IndexManager, IndexType, QueryMode};
use crate::unification::unify;

/// Superposition in both directions around the given clause.
pub struct Superposition;

impl Superposition {
    pub fn new() -> Self {
        Superposition
    }
}

impl Default for Superposition {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Superposition {
    fn name(&self) -> &'static str {
        "superposition"
    }

    fn attach(&mut self, indices: &mut IndexManager) {
        indices.request(IndexType::SuperpositionSubterm);
        indices.request(IndexType::SuperpositionLhs);
    }

    fn detach(&mut self, indices: &mut IndexManager) -> ProverResult<()> {
        indices.release(IndexType::SuperpositionSubterm)?;
        indices.release(IndexType::SuperpositionLhs)
    }
}

fn not_smaller(kbo: &Kbo, a: &Term, b: &Term) -> bool {
    !matches!(kbo.compare(a, b), TermOrdering::Less | TermOrdering::Equal)
}

/// The rewritten side of an equality literal must not be smaller than the
/// other side after applying the unifier.
fn equality_side_eligible(
    lit: &Literal,
    path: &[usize],
    subst: &Substitution,
    kbo: &Kbo,
    is_equality: bool,
) -> bool {
    if !is_equality || path.is_empty() {
        return true;
    }
    let rewritten = lit.args[path[0]].apply_substitution(subst);
    let other = lit.args[1 - path[0]].apply_substitution(subst);
    !matches!(kbo.compare(&rewritten, &other), TermOrdering::Less)
}

/// Build the conclusion of one superposition step.
///
/// `eq_lits`/`eq_idx` name the equality premise and its rewriting literal;
/// `target_lits`/`binding` name the clause being rewritten and the position
/// of `l'` inside it. Both literal lists must already be variable-disjoint.
#[allow(clippy::too_many_arguments)]
fn superpose(
    eq_lits: &[Literal],
    eq_idx: usize,
    lhs_side: usize,
    target_lits: &[Literal],
    target_lit: usize,
    path: &[usize],
    view: &mut View<'_>,
) -> Option<Vec<Literal>> {
    let eq_lit = &eq_lits[eq_idx];
    let lhs = &eq_lit.args[lhs_side];
    let rhs = &eq_lit.args[1 - lhs_side];

    let target = &target_lits[target_lit];
    let (first, rest) = path.split_first()?;
    let sub = target.args[*first].subterm_at(rest)?;

    // Superposition only rewrites non-variable positions
    if matches!(sub, Term::Variable(_)) {
        return None;
    }

    let mgu = unify(lhs, sub).ok()?;

    let kbo = &view.env.kbo;
    let lhs_sigma = lhs.apply_substitution(&mgu);
    let rhs_sigma = rhs.apply_substitution(&mgu);
    if !not_smaller(kbo, &lhs_sigma, &rhs_sigma) {
        return None;
    }

    let target_is_eq = target.is_equality(&view.env.interner);
    if !equality_side_eligible(target, path, &mgu, kbo, target_is_eq) {
        return None;
    }

    // Rewrite the target literal, then instantiate everything
    let mut rewritten = target.clone();
    rewritten.args[*first] = rewritten.args[*first].replace_at(rest, rhs);
    let rewritten = rewritten.apply_substitution(&mgu);

    let mut literals = collect_except(eq_lits, &[eq_idx], &mgu);
    literals.push(rewritten);
    literals.extend(collect_except(target_lits, &[target_lit], &mgu));
    Some(dedup_literals(literals))
}

/// Enumerate the non-variable argument positions of a literal.
fn rewrite_positions(lit: &Literal) -> Vec<Vec<usize>> {
    let mut positions = Vec::new();
    for (i, arg) in lit.args.iter().enumerate() {
        let mut path = vec![i];
        collect_positions(arg, &mut path, &mut positions);
        path.pop();
    }
    positions
}

fn collect_positions(term: &Term, path: &mut Vec<usize>, positions: &mut Vec<Vec<usize>>) {
    if matches!(term, Term::Variable(_)) {
        return;
    }
    positions.push(path.clone());
    if let Term::Function(_, args) = term {
        for (i, arg) in args.iter().enumerate() {
            path.push(i);
            collect_positions(arg, path, positions);
            path.pop();
        }
    }
}

impl GeneratingRule for Superposition {
    fn generate(&self, view: &mut View<'_>, given: usize, selected: &[usize]) -> Vec<NewClause> {
        let mut children = Vec::new();

        // Forward: the given clause rewrites active clauses.
        if let Some(subterms) = view.indices.get(IndexType::SuperpositionSubterm) {
            let given_clause = view.clauses.get(given);
            for &i in selected {
                let lit = &given_clause.literals[i];
                if !lit.polarity || !lit.is_equality(&view.env.interner) {
                    continue;
                }
                for side in [0usize, 1] {
                    let lhs = &lit.args[side];
                    if matches!(lhs, Term::Variable(_)) {
                        continue;
                    }
                    if matches!(
                        view.env.kbo.compare(lhs, &lit.args[1 - side]),
                        TermOrdering::Less
                    ) {
                        continue;
                    }
                    let candidates: Vec<Binding> = subterms
                        .tree()
                        .query_term(lhs, QueryMode::Unification)
                        .cloned()
                        .collect();
                    for binding in candidates {
                        let partner = view.clauses.get(binding.clause);
                        let partner_lits = rename_apart(&partner.literals, view.env);
                        if let Some(literals) = superpose(
                            &given_clause.literals,
                            i,
                            side,
                            &partner_lits,
                            binding.literal,
                            &binding.path,
                            view,
                        ) {
                            view.env.statistics.forward_superpositions += 1;
                            children.push(NewClause {
                                literals,
                                rule: Rule::Superposition,
                                premises: vec![given, binding.clause],
                            });
                        }
                    }
                }
            }
        }

        // Backward: active equalities rewrite inside the given clause.
        if let Some(lhss) = view.indices.get(IndexType::SuperpositionLhs) {
            let given_clause = view.clauses.get(given);
            for &i in selected {
                let lit = &given_clause.literals[i];
                for path in rewrite_positions(lit) {
                    let (first, rest) = path.split_first().expect("non-empty path");
                    let sub = lit.args[*first]
                        .subterm_at(rest)
                        .expect("enumerated position exists");
                    let candidates: Vec<Binding> = lhss
                        .tree()
                        .query_term(sub, QueryMode::Unification)
                        .cloned()
                        .collect();
                    for binding in candidates {
                        // The given-given pair is covered by the forward pass
                        if binding.clause == given {
                            continue;
                        }
                        let eq_clause = view.clauses.get(binding.clause);
                        let eq_lits = rename_apart(&eq_clause.literals, view.env);
                        let side = binding.path[0];
                        if let Some(literals) = superpose(
                            &eq_lits,
                            binding.literal,
                            side,
                            &given_clause.literals,
                            i,
                            &path,
                            view,
                        ) {
                            view.env.statistics.backward_superpositions += 1;
                            children.push(NewClause {
                                literals,
                                rule: Rule::Superposition,
                                premises: vec![binding.clause, given],
                            });
                        }
                    }
                }
            }
        }

        children
    }
}
