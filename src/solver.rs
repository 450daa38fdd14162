//! Oracles backed by the bit-blaster and the CDCL solver.

use std::time::{Duration, Instant};

use log::debug;

use crate::blast::Blaster;
use crate::model::Model;
use crate::oracle::{Backend, Optimizer, Oracle, Status};
use crate::sat::{Budget, SolveResult};
use crate::term::{Term, TermPool};
use crate::types::Lit;

/// Parameters shared by every session of a [`SatBackend`].
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Word size at which integer terms are decided.
    pub int_width: u32,
    /// Default per-check timeout, overridden by an explicit one.
    pub timeout: Option<Duration>,
    pub conflict_limit: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            int_width: 32,
            timeout: None,
            conflict_limit: None,
        }
    }
}

impl SolverConfig {
    fn budget(&self, timeout: Option<Duration>) -> Budget {
        Budget {
            deadline: timeout.or(self.timeout).map(|t| Instant::now() + t),
            conflicts: self.conflict_limit,
        }
    }
}

fn status(result: SolveResult) -> Status {
    match result {
        SolveResult::Sat => Status::Satisfiable,
        SolveResult::Unsat => Status::Unsatisfiable,
        SolveResult::Unknown => Status::Unknown,
    }
}

/// Incremental oracle.
///
/// Each open scope owns a selector literal. Clauses asserted inside a scope are
/// guarded by its selector, which is assumed false while the scope is open and
/// fixed true when the scope is popped, disabling those clauses for good.
pub struct SatOracle {
    blaster: Blaster,
    scopes: Vec<Lit>,
    model: Option<Model>,
    config: SolverConfig,
}

impl SatOracle {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            blaster: Blaster::new(config.int_width),
            scopes: Vec::new(),
            model: None,
            config,
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for SatOracle {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl Oracle for SatOracle {
    fn assert(&mut self, pool: &TermPool, term: Term) {
        let lit = self.blaster.lit(pool, term);
        match self.scopes.last() {
            Some(&selector) => self.blaster.add_clause(&[lit, selector]),
            None => self.blaster.add_clause(&[lit]),
        };
    }

    fn push(&mut self) {
        let selector = self.blaster.fresh();
        self.scopes.push(selector);
    }

    fn pop(&mut self) {
        let Some(selector) = self.scopes.pop() else {
            panic!("pop without a matching push");
        };
        self.blaster.add_clause(&[selector]);
    }

    fn check(&mut self, pool: &TermPool, timeout: Option<Duration>) -> Status {
        let assumptions: Vec<Lit> = self.scopes.iter().map(|&s| -s).collect();
        let start = Instant::now();
        let result = self.blaster.solve(&assumptions, &self.config.budget(timeout));
        self.model = match result {
            SolveResult::Sat => Some(self.blaster.read_model(pool)),
            _ => None,
        };
        debug!(
            "check at depth {}: {:?} in {:.3} s",
            self.scopes.len(),
            result,
            start.elapsed().as_secs_f64()
        );
        status(result)
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }
}

/// Minimising oracle.
///
/// After a first model is found, the objective (read as unsigned) is bounded by
/// binary search: each round assumes `objective <= mid` and either improves the
/// best model or raises the lower bound.
pub struct SatOptimizer {
    blaster: Blaster,
    objective: Option<Vec<Lit>>,
    model: Option<Model>,
    best: Option<u64>,
    config: SolverConfig,
}

impl SatOptimizer {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            blaster: Blaster::new(config.int_width),
            objective: None,
            model: None,
            best: None,
            config,
        }
    }
}

impl Optimizer for SatOptimizer {
    fn assert(&mut self, pool: &TermPool, term: Term) {
        let lit = self.blaster.lit(pool, term);
        self.blaster.add_clause(&[lit]);
    }

    fn minimize(&mut self, pool: &TermPool, criterion: Term) {
        self.objective = Some(self.blaster.word(pool, criterion));
    }

    fn check(&mut self, pool: &TermPool, timeout: Option<Duration>) -> Status {
        self.model = None;
        self.best = None;
        let budget = self.config.budget(timeout);

        let first = self.blaster.solve(&[], &budget);
        if first != SolveResult::Sat {
            return status(first);
        }
        let mut model = self.blaster.read_model(pool);
        let Some(objective) = self.objective.clone() else {
            self.model = Some(model);
            return Status::Satisfiable;
        };

        let mut best = self.blaster.word_value(&objective);
        let mut lo = 0;
        while lo < best {
            let mid = lo + (best - lo) / 2;
            let bound = self.blaster.ule_const(&objective, mid);
            match self.blaster.solve(&[bound], &budget) {
                SolveResult::Sat => {
                    best = self.blaster.word_value(&objective);
                    model = self.blaster.read_model(pool);
                }
                SolveResult::Unsat => lo = mid + 1,
                SolveResult::Unknown => return Status::Unknown,
            }
        }
        debug!("optimum: {}", best);
        self.model = Some(model);
        self.best = Some(best);
        Status::Satisfiable
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn objective(&self) -> Option<u64> {
        self.best
    }
}

/// Creates [`SatOracle`] and [`SatOptimizer`] sessions with a shared configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SatBackend {
    pub config: SolverConfig,
}

impl SatBackend {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Backend for SatBackend {
    type Oracle = SatOracle;
    type Optimizer = SatOptimizer;

    fn oracle(&self) -> SatOracle {
        SatOracle::new(self.config)
    }

    fn optimizer(&self) -> SatOptimizer {
        SatOptimizer::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_scopes() {
        let pool = TermPool::new();
        let x = pool.int_const("x");
        let mut oracle = SatOracle::new(SolverConfig {
            int_width: 8,
            ..Default::default()
        });
        oracle.assert(&pool, pool.mk_lt(pool.mk_int(10), x));

        oracle.push();
        oracle.assert(&pool, pool.mk_lt(x, pool.mk_int(5)));
        assert_eq!(oracle.check(&pool, None), Status::Unsatisfiable);
        assert!(oracle.model().is_none());
        oracle.pop();

        oracle.push();
        oracle.assert(&pool, pool.mk_eq(x, pool.mk_int(42)));
        assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
        assert_eq!(oracle.model().unwrap().eval_i64(&pool, x).unwrap(), 42);
        oracle.pop();

        assert_eq!(oracle.depth(), 0);
        assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
        assert!(oracle.model().unwrap().eval_i64(&pool, x).unwrap() > 10);
    }

    #[test]
    fn test_nested_scopes() {
        let pool = TermPool::new();
        let p = pool.bool_const("p");
        let q = pool.bool_const("q");
        let mut oracle = SatOracle::default();
        oracle.push();
        oracle.assert(&pool, p);
        oracle.push();
        oracle.assert(&pool, pool.mk_not(p));
        assert_eq!(oracle.check(&pool, None), Status::Unsatisfiable);
        oracle.pop();
        oracle.assert(&pool, q);
        assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
        oracle.pop();
        oracle.assert(&pool, pool.mk_not(q));
        assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
    }

    #[test]
    #[should_panic(expected = "pop without a matching push")]
    fn test_unbalanced_pop() {
        let mut oracle = SatOracle::default();
        oracle.pop();
    }

    #[test]
    fn test_minimize() {
        let pool = TermPool::new();
        let x = pool.bv_const("x", 8);
        let y = pool.bv_const("y", 8);
        let mut opt = SatOptimizer::new(SolverConfig::default());
        // x + y == 30, x >= 12, y >= 7: minimise x
        opt.assert(&pool, pool.mk_eq(pool.mk_add(x, y), pool.mk_bv(30, 8)));
        opt.assert(&pool, pool.mk_le(pool.mk_bv(12, 8), x));
        opt.assert(&pool, pool.mk_le(pool.mk_bv(7, 8), y));
        opt.assert(&pool, pool.mk_le(x, pool.mk_bv(100, 8)));
        opt.assert(&pool, pool.mk_le(y, pool.mk_bv(100, 8)));
        opt.minimize(&pool, x);
        assert_eq!(opt.check(&pool, None), Status::Satisfiable);
        assert_eq!(opt.objective(), Some(12));
        let model = opt.model().unwrap();
        assert_eq!(model.eval_i64(&pool, y).unwrap(), 18);
    }

    #[test]
    fn test_minimize_unsat() {
        let pool = TermPool::new();
        let x = pool.bv_const("x", 4);
        let mut opt = SatOptimizer::new(SolverConfig::default());
        opt.assert(&pool, pool.mk_lt(x, x));
        opt.minimize(&pool, x);
        assert_eq!(opt.check(&pool, None), Status::Unsatisfiable);
        assert!(opt.model().is_none());
        assert_eq!(opt.objective(), None);
    }
}
