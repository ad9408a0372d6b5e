//! Substitution-tree retrieval of literals and terms.
//!
//! Keys are flattened preorder traversals; every variable position is a
//! wildcard branch. Each inner node maps a symbol to its child, leaves hold
//! `(clause, literal, path)` bindings. The tree answers three queries:
//!
//! - generalizations: stored keys of which the query is an instance;
//! - instances: stored keys that are instances of the query;
//! - unification candidates: stored keys that may unify with the query.
//!
//! Wildcards erase variable identity, so retrieval is a pre-filter: callers
//! confirm candidates with `unify`/`match_term`, which also produces the
//! substitution for the match. Iterators are lazy and keep their resumption
//! state in an explicit stack; the borrow they hold prevents mutation of
//! the tree while they are live.

use crate::fol::{ConstantId, FunctionId, Literal, PredicateId, Term};
use std::collections::HashMap;

/// One stored binding: a clause, a literal index within it, and a path to a
/// subterm (`[arg_idx, ...]`; empty for whole-literal entries).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub clause: usize,
    pub literal: usize,
    pub path: Vec<usize>,
}

impl Binding {
    pub fn literal(clause: usize, literal: usize) -> Self {
        Binding {
            clause,
            literal,
            path: Vec::new(),
        }
    }

    pub fn subterm(clause: usize, literal: usize, path: Vec<usize>) -> Self {
        Binding {
            clause,
            literal,
            path,
        }
    }
}

/// One element of a flattened key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FlatKey {
    /// Predicate head with polarity (literal keys only)
    Pred(PredicateId, bool, u8),
    Func(FunctionId, u8),
    Const(ConstantId),
    /// A variable position
    Star,
}

impl FlatKey {
    /// Number of argument subterms following this key
    fn arity(self) -> u8 {
        match self {
            FlatKey::Pred(_, _, a) | FlatKey::Func(_, a) => a,
            FlatKey::Const(_) | FlatKey::Star => 0,
        }
    }
}

fn flatten_term(term: &Term, keys: &mut Vec<FlatKey>) {
    match term {
        Term::Variable(_) => keys.push(FlatKey::Star),
        Term::Constant(c) => keys.push(FlatKey::Const(c.id)),
        Term::Function(f, args) => {
            keys.push(FlatKey::Func(f.id, f.arity));
            for arg in args {
                flatten_term(arg, keys);
            }
        }
    }
}

fn flatten_literal(lit: &Literal) -> Vec<FlatKey> {
    let mut keys = vec![FlatKey::Pred(
        lit.predicate.id,
        lit.polarity,
        lit.args.len() as u8,
    )];
    for arg in &lit.args {
        flatten_term(arg, &mut keys);
    }
    keys
}

/// Length of the flattened subterm starting at `pos`
fn subterm_len(keys: &[FlatKey], pos: usize) -> usize {
    let mut len = 1;
    for _ in 0..keys[pos].arity() {
        len += subterm_len(keys, pos + len);
    }
    len
}

#[derive(Debug, Default)]
struct TreeNode {
    children: HashMap<FlatKey, TreeNode>,
    bindings: Vec<Binding>,
}

impl TreeNode {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.bindings.is_empty()
    }
}

/// Retrieval mode of a tree query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Stored keys the query is an instance of
    Generalization,
    /// Stored keys that are instances of the query
    Instance,
    /// Stored keys that may unify with the query
    Unification,
}

/// Substitution tree over literal or term keys.
#[derive(Debug, Default)]
pub struct SubstitutionTree {
    root: TreeNode,
    size: usize,
}

impl SubstitutionTree {
    pub fn new() -> Self {
        SubstitutionTree::default()
    }

    /// Number of stored bindings
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Insert a binding keyed by a whole literal.
    pub fn insert_literal(&mut self, lit: &Literal, binding: Binding) {
        self.insert(flatten_literal(lit), binding);
    }

    /// Insert a binding keyed by a term.
    pub fn insert_term(&mut self, term: &Term, binding: Binding) {
        let mut keys = Vec::new();
        flatten_term(term, &mut keys);
        self.insert(keys, binding);
    }

    fn insert(&mut self, keys: Vec<FlatKey>, binding: Binding) {
        let mut node = &mut self.root;
        for key in keys {
            node = node.children.entry(key).or_default();
        }
        node.bindings.push(binding);
        self.size += 1;
    }

    /// Remove a binding previously stored under a literal key.
    pub fn remove_literal(&mut self, lit: &Literal, binding: &Binding) {
        self.remove(&flatten_literal(lit), binding);
    }

    /// Remove a binding previously stored under a term key.
    pub fn remove_term(&mut self, term: &Term, binding: &Binding) {
        let mut keys = Vec::new();
        flatten_term(term, &mut keys);
        self.remove(&keys, binding);
    }

    fn remove(&mut self, keys: &[FlatKey], binding: &Binding) {
        if Self::remove_rec(&mut self.root, keys, binding) {
            self.size -= 1;
        }
    }

    /// Remove along the key path, pruning empty nodes on unwind.
    /// Returns true if the binding was found.
    fn remove_rec(node: &mut TreeNode, keys: &[FlatKey], binding: &Binding) -> bool {
        match keys.split_first() {
            None => {
                if let Some(pos) = node.bindings.iter().position(|b| b == binding) {
                    node.bindings.swap_remove(pos);
                    true
                } else {
                    false
                }
            }
            Some((key, rest)) => {
                let Some(child) = node.children.get_mut(key) else {
                    return false;
                };
                let removed = Self::remove_rec(child, rest, binding);
                if removed && child.is_empty() {
                    node.children.remove(key);
                }
                removed
            }
        }
    }

    /// Query with a literal key.
    pub fn query_literal<'a>(&'a self, lit: &Literal, mode: QueryMode) -> QueryIter<'a> {
        QueryIter::new(&self.root, flatten_literal(lit), mode)
    }

    /// Query with a term key.
    pub fn query_term<'a>(&'a self, term: &Term, mode: QueryMode) -> QueryIter<'a> {
        let mut keys = Vec::new();
        flatten_term(term, &mut keys);
        QueryIter::new(&self.root, keys, mode)
    }
}

/// DFS state: a tree node together with the query position reached and the
/// number of stored subterms still being skipped under a query wildcard.
struct Frame<'a> {
    node: &'a TreeNode,
    qpos: usize,
    skip: usize,
}

/// Lazy candidate iterator over the tree.
///
/// Each matching binding is yielded at most once: every trie node is
/// reachable by exactly one key path, and the alignment between stored and
/// query keys along a path is unique because both sides are well-formed
/// preorder traversals.
pub struct QueryIter<'a> {
    query: Vec<FlatKey>,
    mode: QueryMode,
    stack: Vec<Frame<'a>>,
    pending: std::slice::Iter<'a, Binding>,
}

impl<'a> QueryIter<'a> {
    fn new(root: &'a TreeNode, query: Vec<FlatKey>, mode: QueryMode) -> Self {
        QueryIter {
            query,
            mode,
            stack: vec![Frame {
                node: root,
                qpos: 0,
                skip: 0,
            }],
            pending: [].iter(),
        }
    }

    fn expand(&mut self, frame: Frame<'a>) {
        let Frame { node, qpos, skip } = frame;

        if skip > 0 {
            // Consuming a stored subterm under a query wildcard
            for (key, child) in &node.children {
                self.stack.push(Frame {
                    node: child,
                    qpos,
                    skip: skip - 1 + key.arity() as usize,
                });
            }
            return;
        }

        if qpos == self.query.len() {
            self.pending = node.bindings.iter();
            return;
        }

        let qk = self.query[qpos];
        let tree_star_matches_query = matches!(
            self.mode,
            QueryMode::Generalization | QueryMode::Unification
        );
        let query_star_matches_tree =
            matches!(self.mode, QueryMode::Instance | QueryMode::Unification);

        if qk == FlatKey::Star {
            if query_star_matches_tree {
                // A query variable absorbs one whole stored subterm
                for (key, child) in &node.children {
                    self.stack.push(Frame {
                        node: child,
                        qpos: qpos + 1,
                        skip: key.arity() as usize,
                    });
                }
            } else if let Some(child) = node.children.get(&FlatKey::Star) {
                // Only a stored variable can generalize a query variable
                self.stack.push(Frame {
                    node: child,
                    qpos: qpos + 1,
                    skip: 0,
                });
            }
            return;
        }

        if let Some(child) = node.children.get(&qk) {
            self.stack.push(Frame {
                node: child,
                qpos: qpos + 1,
                skip: 0,
            });
        }
        if tree_star_matches_query {
            if let Some(child) = node.children.get(&FlatKey::Star) {
                // A stored variable absorbs one whole query subterm
                self.stack.push(Frame {
                    node: child,
                    qpos: qpos + subterm_len(&self.query, qpos),
                    skip: 0,
                });
            }
        }
    }
}

impl<'a> Iterator for QueryIter<'a> {
    type Item = &'a Binding;

    fn next(&mut self) -> Option<&'a Binding> {
        loop {
            if let Some(binding) = self.pending.next() {
                return Some(binding);
            }
            let frame = self.stack.pop()?;
            self.expand(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, FunctionSymbol, Interner, PredicateSymbol, Variable};
    use crate::unification::{match_term, unify};

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

        fn pred(&mut self, name: &str, arity: u8) -> PredicateSymbol {
            PredicateSymbol::new(self.interner.intern_predicate(name), arity)
        }
    }

    fn collect(iter: QueryIter<'_>) -> Vec<Binding> {
        iter.cloned().collect()
    }

    #[test]
    fn insert_then_remove_round_trip() {
        let mut ctx = Ctx::new();
        let a = ctx.const_("a");
        let fa = ctx.func("f", vec![a.clone()]);
        let binding = Binding::subterm(0, 0, vec![0]);

        let mut tree = SubstitutionTree::new();
        tree.insert_term(&fa, binding.clone());
        assert_eq!(tree.len(), 1);
        assert_eq!(
            collect(tree.query_term(&fa, QueryMode::Unification)),
            vec![binding.clone()]
        );

        tree.remove_term(&fa, &binding);
        assert!(tree.is_empty());
        assert!(collect(tree.query_term(&fa, QueryMode::Unification)).is_empty());
        assert!(collect(tree.query_term(&fa, QueryMode::Generalization)).is_empty());
        assert!(collect(tree.query_term(&fa, QueryMode::Instance)).is_empty());
    }

    #[test]
    fn identical_key_unifies_with_identity() {
        let mut ctx = Ctx::new();
        let a = ctx.const_("a");
        let fa = ctx.func("f", vec![a.clone()]);
        let binding = Binding::literal(3, 1);

        let mut tree = SubstitutionTree::new();
        tree.insert_term(&fa, binding.clone());

        let found = collect(tree.query_term(&fa, QueryMode::Unification));
        assert_eq!(found, vec![binding]);
        let subst = unify(&fa, &fa).unwrap();
        assert!(subst.is_empty());
    }

    #[test]
    fn generalization_query() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let b = ctx.const_("b");
        let fx = ctx.func("f", vec![x.clone()]);
        let fa = ctx.func("f", vec![a.clone()]);
        let fb = ctx.func("f", vec![b.clone()]);

        let mut tree = SubstitutionTree::new();
        tree.insert_term(&fx, Binding::literal(0, 0));
        tree.insert_term(&fa, Binding::literal(1, 0));
        tree.insert_term(&fb, Binding::literal(2, 0));

        // Generalizations of f(a): f(X) and f(a), not f(b)
        let found = collect(tree.query_term(&fa, QueryMode::Generalization));
        let clauses: Vec<usize> = found.iter().map(|b| b.clause).collect();
        assert!(clauses.contains(&0));
        assert!(clauses.contains(&1));
        assert!(!clauses.contains(&2));

        // Every candidate really matches
        for b in &found {
            let stored = if b.clause == 0 { &fx } else { &fa };
            assert!(match_term(stored, &fa).is_ok());
        }
    }

    #[test]
    fn instance_query() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let ga = ctx.func("g", vec![a.clone()]);
        let fx = ctx.func("f", vec![x.clone()]);
        let fa = ctx.func("f", vec![a.clone()]);
        let fga = ctx.func("f", vec![ga.clone()]);

        let mut tree = SubstitutionTree::new();
        tree.insert_term(&fa, Binding::literal(0, 0));
        tree.insert_term(&fga, Binding::literal(1, 0));
        tree.insert_term(&fx, Binding::literal(2, 0));

        // Instances of f(X): all three
        let found = collect(tree.query_term(&fx, QueryMode::Instance));
        assert_eq!(found.len(), 3);

        // Instances of f(a): only f(a)
        let found = collect(tree.query_term(&fa, QueryMode::Instance));
        let clauses: Vec<usize> = found.iter().map(|b| b.clause).collect();
        assert_eq!(clauses, vec![0]);
    }

    #[test]
    fn unification_candidates_both_directions() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let a = ctx.const_("a");
        let b = ctx.const_("b");
        let fxb = ctx.func("f", vec![x.clone(), b.clone()]);
        let fay = ctx.func("f", vec![a.clone(), y.clone()]);
        let fbb = ctx.func("f", vec![b.clone(), b.clone()]);

        let mut tree = SubstitutionTree::new();
        tree.insert_term(&fxb, Binding::literal(0, 0));
        tree.insert_term(&fbb, Binding::literal(1, 0));

        // f(a, Y) unifies with f(X, b) but not with f(b, b)
        let found = collect(tree.query_term(&fay, QueryMode::Unification));
        let clauses: Vec<usize> = found.iter().map(|b| b.clause).collect();
        assert!(clauses.contains(&0));
        assert!(!clauses.contains(&1));
        assert!(unify(&fay, &fxb).is_ok());
    }

    #[test]
    fn literal_keys_distinguish_polarity() {
        let mut ctx = Ctx::new();
        let a = ctx.const_("a");
        let p = ctx.pred("P", 1);
        let pos = Literal::positive(p, vec![a.clone()]);
        let neg = Literal::negative(p, vec![a.clone()]);

        let mut tree = SubstitutionTree::new();
        tree.insert_literal(&pos, Binding::literal(0, 0));

        assert_eq!(
            collect(tree.query_literal(&pos, QueryMode::Unification)).len(),
            1
        );
        assert!(collect(tree.query_literal(&neg, QueryMode::Unification)).is_empty());
    }

    #[test]
    fn each_binding_yielded_once() {
        let mut ctx = Ctx::new();
        let x = ctx.var("X");
        let y = ctx.var("Y");
        let fxy = ctx.func("f", vec![x.clone(), y.clone()]);

        let mut tree = SubstitutionTree::new();
        tree.insert_term(&fxy, Binding::literal(0, 0));

        // A query that exercises both wildcard rules at once
        let q = ctx.func("f", vec![y.clone(), x.clone()]);
        let found = collect(tree.query_term(&q, QueryMode::Unification));
        assert_eq!(found.len(), 1);
    }
}
