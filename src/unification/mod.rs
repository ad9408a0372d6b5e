//! Unification and one-way matching.
//!
//! `unify` computes a most general unifier with occurs check; `match_term`
//! performs one-way matching (only pattern variables may be bound), used by
//! demodulation and subsumption.

use crate::fol::{Literal, Substitution, Term, Variable};

/// Errors that can occur during unification or matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnificationError {
    /// Variable occurs in the term it would be bound to
    OccursCheck,
    /// Top symbols or arities differ
    Clash,
    /// A query-side variable would need to be bound during matching
    NotAnInstance,
}

pub type UnificationResult = Result<Substitution, UnificationError>;

/// Unify two terms, returning a most general unifier if one exists
pub fn unify(t1: &Term, t2: &Term) -> UnificationResult {
    let mut subst = Substitution::new();
    unify_into(t1, t2, &mut subst)?;
    Ok(subst)
}

/// Unify two argument lists pairwise under one growing substitution
pub fn unify_args(args1: &[Term], args2: &[Term]) -> UnificationResult {
    if args1.len() != args2.len() {
        return Err(UnificationError::Clash);
    }
    let mut subst = Substitution::new();
    for (a1, a2) in args1.iter().zip(args2.iter()) {
        unify_into(a1, a2, &mut subst)?;
    }
    Ok(subst)
}

/// Unify the atoms of two literals (predicates must already agree)
pub fn unify_literals(l1: &Literal, l2: &Literal) -> UnificationResult {
    if l1.predicate != l2.predicate {
        return Err(UnificationError::Clash);
    }
    unify_args(&l1.args, &l2.args)
}

fn unify_into(t1: &Term, t2: &Term, subst: &mut Substitution) -> Result<(), UnificationError> {
    let t1 = t1.apply_substitution(subst);
    let t2 = t2.apply_substitution(subst);

    match (&t1, &t2) {
        _ if t1 == t2 => Ok(()),
        (Term::Variable(v), t) | (t, Term::Variable(v)) => {
            if occurs(*v, t) {
                Err(UnificationError::OccursCheck)
            } else {
                subst.bind(*v, t.clone());
                Ok(())
            }
        }
        (Term::Function(f1, args1), Term::Function(f2, args2)) => {
            if f1.id != f2.id || args1.len() != args2.len() {
                return Err(UnificationError::Clash);
            }
            for (a1, a2) in args1.iter().zip(args2.iter()) {
                unify_into(a1, a2, subst)?;
            }
            Ok(())
        }
        _ => Err(UnificationError::Clash),
    }
}

fn occurs(var: Variable, term: &Term) -> bool {
    match term {
        Term::Variable(v) => v.id == var.id,
        Term::Constant(_) => false,
        Term::Function(_, args) => args.iter().any(|arg| occurs(var, arg)),
    }
}

/// One-way matching: find a substitution binding only variables of
/// `pattern` such that `pattern * subst == target`.
pub fn match_term(pattern: &Term, target: &Term) -> UnificationResult {
    let mut subst = Substitution::new();
    match_into(pattern, target, &mut subst)?;
    Ok(subst)
}

/// Match argument lists pairwise under one growing substitution
pub fn match_args(
    pattern: &[Term],
    target: &[Term],
    subst: &mut Substitution,
) -> Result<(), UnificationError> {
    if pattern.len() != target.len() {
        return Err(UnificationError::Clash);
    }
    for (p, t) in pattern.iter().zip(target.iter()) {
        match_into(p, t, subst)?;
    }
    Ok(())
}

fn match_into(pattern: &Term, target: &Term, subst: &mut Substitution) -> Result<(), UnificationError> {
    match pattern {
        Term::Variable(v) => match subst.get(v.id) {
            Some(bound) if bound == target => Ok(()),
            Some(_) => Err(UnificationError::NotAnInstance),
            None => {
                subst.insert(*v, target.clone());
                Ok(())
            }
        },
        Term::Constant(c1) => match target {
            Term::Constant(c2) if c1.id == c2.id => Ok(()),
            _ => Err(UnificationError::Clash),
        },
        Term::Function(f1, args1) => match target {
            Term::Function(f2, args2) if f1.id == f2.id && args1.len() == args2.len() => {
                for (p, t) in args1.iter().zip(args2.iter()) {
                    match_into(p, t, subst)?;
                }
                Ok(())
            }
            _ => Err(UnificationError::Clash),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, FunctionSymbol, Interner};

    struct Ctx {
        interner: Interner,
    }

    impl Ctx {
        fn new() -> Self {
            Ctx {
                interner: Interner::new(),
            }
        }

        fn var(&mut self, name: &str) -> Term {
            Term::Variable(Variable::new(self.interner.intern_variable(name)))
        }

        fn const_(&mut self, name: &str) -> Term {
            Term::Constant(Constant::new(self.interner.intern_constant(name)))
        }

        fn func(&mut self, name: &str, args: Vec<Term>) -> Term {
            let id = self.interner.intern_function(name);
            Term::Function(FunctionSymbol::new(id, args.len() as u8), args)
        }
    }

    #[test]
    fn unify_variable_with_constant() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let mgu = unify(&x, &a).unwrap();
        assert_eq!(x.apply_substitution(&mgu), a);
    }

    #[test]
    fn unify_nested_functions() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let a = ctx.const_("a");
        let gy = ctx.func("g", vec![y.clone()]);
        let t1 = ctx.func("f", vec![x.clone(), gy]);
        let ga = ctx.func("g", vec![a.clone()]);
        let t2 = ctx.func("f", vec![a.clone(), ga]);

        let mgu = unify(&t1, &t2).unwrap();
        assert_eq!(t1.apply_substitution(&mgu), t2.apply_substitution(&mgu));
    }

    #[test]
    fn occurs_check_fails() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let fx = ctx.func("f", vec![x.clone()]);
        assert_eq!(unify(&x, &fx), Err(UnificationError::OccursCheck));
    }

    #[test]
    fn clash_on_different_heads() {
        let mut ctx = Ctx::new();
        let a = ctx.const_("a");
        let b = ctx.const_("b");
        assert_eq!(unify(&a, &b), Err(UnificationError::Clash));
    }

    #[test]
    fn matching_is_one_way() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let fx = ctx.func("f", vec![x.clone()]);
        let fa = ctx.func("f", vec![a.clone()]);

        // f(X) matches f(a)
        let subst = match_term(&fx, &fa).unwrap();
        assert_eq!(fx.apply_substitution(&subst), fa);

        // but f(a) does not match f(X): target variables stay fixed
        assert!(match_term(&fa, &fx).is_err());
    }

    #[test]
    fn matching_respects_earlier_bindings() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let b = ctx.const_("b");
        let fxx = ctx.func("f", vec![x.clone(), x.clone()]);
        let fab = ctx.func("f", vec![a.clone(), b.clone()]);
        let faa = ctx.func("f", vec![a.clone(), a.clone()]);

        assert!(match_term(&fxx, &fab).is_err());
        assert!(match_term(&fxx, &faa).is_ok());
    }
}
