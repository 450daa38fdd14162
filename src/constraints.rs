//! Constraint sets and cardinality combinators.

use log::debug;

use crate::term::{Term, TermPool};

/// Ordered list of boolean terms to be asserted together.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    terms: Vec<Term>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, term: Term) {
        self.terms.push(term);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Extend<Term> for ConstraintSet {
    fn extend<I: IntoIterator<Item = Term>>(&mut self, iter: I) {
        self.terms.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

/// Emits `t_1 ∨ ... ∨ t_n`.
pub fn at_least_one(pool: &TermPool, terms: &[Term], out: &mut ConstraintSet) {
    out.push(pool.mk_or(terms.iter().copied()));
}

/// Emits, for every `t_i`, the implication `t_i → ∧_{j≠i} ¬t_j`.
pub fn at_most_one(pool: &TermPool, terms: &[Term], out: &mut ConstraintSet) {
    for (i, &t) in terms.iter().enumerate() {
        let others = terms
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &u)| pool.mk_not(u))
            .collect::<Vec<_>>();
        out.push(pool.mk_implies(t, pool.mk_and(others)));
    }
}

pub fn exactly_one(pool: &TermPool, terms: &[Term], out: &mut ConstraintSet) {
    debug!("exactly_one over {} terms", terms.len());
    at_least_one(pool, terms, out);
    at_most_one(pool, terms, out);
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use test_log::test;

    use super::*;
    use crate::model::{Model, Value};
    use crate::oracle::{Oracle, Status};
    use crate::term::Sort;

    /// Oracle enumerating every assignment of the boolean constants.
    #[derive(Default)]
    pub(crate) struct BruteForce {
        assertions: Vec<Term>,
        scopes: Vec<usize>,
        model: Option<Model>,
    }

    impl Oracle for BruteForce {
        fn assert(&mut self, _pool: &TermPool, term: Term) {
            self.assertions.push(term);
        }

        fn push(&mut self) {
            self.scopes.push(self.assertions.len());
        }

        fn pop(&mut self) {
            let len = self.scopes.pop().expect("pop without push");
            self.assertions.truncate(len);
        }

        fn check(&mut self, pool: &TermPool, _timeout: Option<Duration>) -> Status {
            self.model = None;
            let vars = pool.constants(&self.assertions);
            assert!(vars.iter().all(|&v| pool.sort(v) == Sort::Bool));
            assert!(vars.len() < 20);
            for bits in 0u32..(1 << vars.len()) {
                let mut model = Model::new(8);
                for (k, &v) in vars.iter().enumerate() {
                    model.insert(v, Value::Bool(bits >> k & 1 == 1));
                }
                let ok = self
                    .assertions
                    .iter()
                    .all(|&t| model.eval_bool(pool, t).unwrap());
                if ok {
                    self.model = Some(model);
                    return Status::Satisfiable;
                }
            }
            Status::Unsatisfiable
        }

        fn model(&self) -> Option<&Model> {
            self.model.as_ref()
        }
    }

    fn count_models(pool: &TermPool, set: &ConstraintSet, vars: &[Term]) -> HashMap<usize, usize> {
        // number of models, grouped by how many vars are true
        let mut histogram = HashMap::new();
        for bits in 0u32..(1 << vars.len()) {
            let mut model = Model::new(8);
            for (k, &v) in vars.iter().enumerate() {
                model.insert(v, Value::Bool(bits >> k & 1 == 1));
            }
            if set.iter().all(|&t| model.eval_bool(pool, t).unwrap()) {
                *histogram.entry(bits.count_ones() as usize).or_default() += 1;
            }
        }
        histogram
    }

    #[test]
    fn test_exactly_one_models() {
        let pool = TermPool::new();
        let vars: Vec<Term> = (0..4).map(|i| pool.bool_const(&format!("x{}", i))).collect();
        let mut set = ConstraintSet::new();
        exactly_one(&pool, &vars, &mut set);
        let histogram = count_models(&pool, &set, &vars);
        assert_eq!(histogram, HashMap::from([(1, 4)]));
    }

    #[test]
    fn test_at_most_one_models() {
        let pool = TermPool::new();
        let vars: Vec<Term> = (0..3).map(|i| pool.bool_const(&format!("y{}", i))).collect();
        let mut set = ConstraintSet::new();
        at_most_one(&pool, &vars, &mut set);
        let histogram = count_models(&pool, &set, &vars);
        assert_eq!(histogram, HashMap::from([(0, 1), (1, 3)]));
    }

    #[test]
    fn test_exactly_one_rejects_two() {
        let pool = TermPool::new();
        let vars: Vec<Term> = (0..5).map(|i| pool.bool_const(&format!("z{}", i))).collect();
        let mut set = ConstraintSet::new();
        exactly_one(&pool, &vars, &mut set);

        let mut oracle = BruteForce::default();
        oracle.assert_all(&pool, &set);
        assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
        let model = oracle.model().unwrap();
        let trues = vars
            .iter()
            .filter(|&&v| model.eval_bool(&pool, v).unwrap())
            .count();
        assert_eq!(trues, 1);

        oracle.push();
        oracle.assert(&pool, vars[1]);
        oracle.assert(&pool, vars[3]);
        assert_eq!(oracle.check(&pool, None), Status::Unsatisfiable);
        oracle.pop();
        assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
    }

    #[test]
    fn test_single_term() {
        let pool = TermPool::new();
        let x = pool.bool_const("x");
        let mut set = ConstraintSet::new();
        exactly_one(&pool, &[x], &mut set);
        let mut oracle = BruteForce::default();
        oracle.assert_all(&pool, &set);
        assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
        assert!(oracle.model().unwrap().eval_bool(&pool, x).unwrap());
    }
}
