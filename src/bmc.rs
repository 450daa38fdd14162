//! Bounded search over a transition system.
//!
//! [`solve_exact`] unrolls the transition relation in one incremental session and
//! checks the goal after each step inside a scope, so the first satisfiable check
//! is a shortest solution. When every bound is unsatisfiable, [`solve_approx`]
//! re-poses each bound to a fresh optimizer, minimising a distance to the goal
//! under a relaxed final condition.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

use crate::constraints::ConstraintSet;
use crate::diagnostics::Diagnostics;
use crate::model::Model;
use crate::oracle::{Backend, Optimizer, Oracle, Status};
use crate::term::{Term, TermPool};

/// A system whose states are indexed by step.
///
/// `transition(s)` relates the state at step `s` to the state at step `s + 1`.
pub trait TransitionSystem {
    fn pool(&self) -> &TermPool;

    /// Largest number of transitions worth unrolling.
    fn max_steps(&self) -> usize;

    fn initial(&self) -> ConstraintSet;

    fn transition(&self, step: usize) -> ConstraintSet;

    /// Goal reached at state `step`.
    fn goal(&self, step: usize) -> Term;

    /// Final condition used when the goal is out of reach.
    fn relaxed_goal(&self, step: usize) -> Term;

    /// Non-negative distance between state `step` and the goal, as a bit-vector.
    fn distance(&self, step: usize) -> Term;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SearchMode {
    Exact,
    Approximate,
}

impl Display for SearchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Exact => write!(f, "exact"),
            SearchMode::Approximate => write!(f, "approximate"),
        }
    }
}

/// Result of a bounded search.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: Status,
    pub mode: SearchMode,
    /// Number of transitions of the reported model, or the last bound tried.
    pub steps: usize,
    pub model: Option<Model>,
    /// Distance to the goal of the reported model (zero for exact solutions).
    pub distance: Option<u64>,
}

impl Outcome {
    fn without_model(status: Status, mode: SearchMode, steps: usize) -> Self {
        Self {
            status,
            mode,
            steps,
            model: None,
            distance: None,
        }
    }
}

/// Incremental exact search. Stops at the first bound where the goal is reachable.
pub fn solve_exact<S, B>(system: &S, backend: &B, timeout: Option<Duration>, diagnostics: &Diagnostics) -> Outcome
where
    S: TransitionSystem,
    B: Backend,
{
    let pool = system.pool();
    let mut oracle = backend.oracle();
    oracle.assert_all(pool, &system.initial());

    for step in 0..system.max_steps() {
        oracle.assert_all(pool, &system.transition(step));
        oracle.push();
        oracle.assert(pool, system.goal(step + 1));
        let start = Instant::now();
        let status = oracle.check(pool, timeout);
        diagnostics.info(format_args!(
            "exact: {} after {} steps ({} ms)",
            status,
            step + 1,
            start.elapsed().as_millis()
        ));
        let model = oracle.model().cloned();
        oracle.pop();
        match status {
            Status::Satisfiable => {
                return Outcome {
                    status,
                    mode: SearchMode::Exact,
                    steps: step + 1,
                    model,
                    distance: Some(0),
                };
            }
            Status::Unsatisfiable => {}
            Status::Unknown => {
                diagnostics.warn(format_args!("exact search aborted at step {}", step + 1));
                return Outcome::without_model(status, SearchMode::Exact, step + 1);
            }
        }
    }
    Outcome::without_model(Status::Unsatisfiable, SearchMode::Exact, system.max_steps())
}

/// Approximate search: minimises the distance to the goal at every bound, each in
/// a fresh optimizer, and keeps the closest model (fewer steps on ties).
pub fn solve_approx<S, B>(system: &S, backend: &B, timeout: Option<Duration>, diagnostics: &Diagnostics) -> Outcome
where
    S: TransitionSystem,
    B: Backend,
{
    let pool = system.pool();
    let mut best: Option<(u64, usize, Model)> = None;

    for step in 0..system.max_steps() {
        let mut optimizer = backend.optimizer();
        optimizer.assert_all(pool, &system.initial());
        for s in 0..=step {
            optimizer.assert_all(pool, &system.transition(s));
        }
        optimizer.assert(pool, system.relaxed_goal(step + 1));
        optimizer.minimize(pool, system.distance(step + 1));

        let start = Instant::now();
        let status = optimizer.check(pool, timeout);
        diagnostics.info(format_args!(
            "approx: {} after {} steps ({} ms)",
            status,
            step + 1,
            start.elapsed().as_millis()
        ));
        match status {
            Status::Satisfiable => {
                let (Some(distance), Some(model)) = (optimizer.objective(), optimizer.model()) else {
                    continue;
                };
                diagnostics.info(format_args!("approx: distance {} after {} steps", distance, step + 1));
                if best.as_ref().map_or(true, |(d, _, _)| distance < *d) {
                    best = Some((distance, step + 1, model.clone()));
                }
            }
            Status::Unsatisfiable => {}
            Status::Unknown => {
                diagnostics.warn(format_args!("approximate search aborted at step {}", step + 1));
                return Outcome::without_model(status, SearchMode::Approximate, step + 1);
            }
        }
    }

    match best {
        Some((distance, steps, model)) => Outcome {
            status: Status::Satisfiable,
            mode: SearchMode::Approximate,
            steps,
            model: Some(model),
            distance: Some(distance),
        },
        None => Outcome::without_model(Status::Unsatisfiable, SearchMode::Approximate, system.max_steps()),
    }
}

/// Exact search, falling back to approximate search when no bound reaches the goal.
pub fn solve<S, B>(system: &S, backend: &B, timeout: Option<Duration>, diagnostics: &Diagnostics) -> Outcome
where
    S: TransitionSystem,
    B: Backend,
{
    let exact = solve_exact(system, backend, timeout, diagnostics);
    if !exact.status.is_unsat() {
        return exact;
    }
    diagnostics.info(format_args!("goal unreachable in {} steps, minimising distance", system.max_steps()));
    solve_approx(system, backend, timeout, diagnostics)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::solver::{SatBackend, SolverConfig};

    /// A counter starting at 0 that adds 3 or 5 per step.
    struct Counter {
        pool: TermPool,
        target: i64,
        steps: usize,
    }

    impl Counter {
        fn value(&self, step: usize) -> Term {
            self.pool.bv_const(&format!("c@{}", step), 8)
        }
    }

    impl TransitionSystem for Counter {
        fn pool(&self) -> &TermPool {
            &self.pool
        }

        fn max_steps(&self) -> usize {
            self.steps
        }

        fn initial(&self) -> ConstraintSet {
            let mut set = ConstraintSet::new();
            set.push(self.pool.mk_eq(self.value(0), self.pool.mk_bv(0, 8)));
            set
        }

        fn transition(&self, step: usize) -> ConstraintSet {
            let p = &self.pool;
            let cur = self.value(step);
            let next = self.value(step + 1);
            let mut set = ConstraintSet::new();
            set.push(p.mk_or([
                p.mk_eq(next, p.mk_add(cur, p.mk_bv(3, 8))),
                p.mk_eq(next, p.mk_add(cur, p.mk_bv(5, 8))),
            ]));
            set
        }

        fn goal(&self, step: usize) -> Term {
            self.pool.mk_eq(self.value(step), self.pool.mk_bv(self.target, 8))
        }

        fn relaxed_goal(&self, step: usize) -> Term {
            self.pool.mk_not(self.goal(step))
        }

        fn distance(&self, step: usize) -> Term {
            let p = &self.pool;
            p.mk_abs(p.mk_sub(p.mk_bv(self.target, 8), self.value(step)))
        }
    }

    fn backend() -> SatBackend {
        SatBackend::new(SolverConfig {
            int_width: 8,
            ..Default::default()
        })
    }

    #[test]
    fn test_exact_shortest() {
        let counter = Counter {
            pool: TermPool::new(),
            target: 13,
            steps: 5,
        };
        let outcome = solve(&counter, &backend(), None, &Diagnostics::default());
        assert_eq!(outcome.status, Status::Satisfiable);
        assert_eq!(outcome.mode, SearchMode::Exact);
        // 13 = 5 + 5 + 3
        assert_eq!(outcome.steps, 3);
        let model = outcome.model.unwrap();
        assert_eq!(model.eval_i64(&counter.pool, counter.value(3)).unwrap(), 13);
    }

    #[test]
    fn test_approximate_fallback() {
        let counter = Counter {
            pool: TermPool::new(),
            target: 4,
            steps: 2,
        };
        let outcome = solve(&counter, &backend(), None, &Diagnostics::default());
        assert_eq!(outcome.status, Status::Satisfiable);
        assert_eq!(outcome.mode, SearchMode::Approximate);
        // 3 and 5 are both at distance 1, the one-step solution wins
        assert_eq!(outcome.distance, Some(1));
        assert_eq!(outcome.steps, 1);
    }

    #[test]
    fn test_conflict_limit_is_unknown() {
        let counter = Counter {
            pool: TermPool::new(),
            target: 13,
            steps: 5,
        };
        let backend = SatBackend::new(SolverConfig {
            int_width: 8,
            timeout: None,
            conflict_limit: Some(0),
        });
        let outcome = solve(&counter, &backend, None, &Diagnostics::default());
        assert_eq!(outcome.status, Status::Unknown);
        assert_eq!(outcome.mode, SearchMode::Exact);
        assert!(outcome.model.is_none());
    }
}
