//! Sorting an array with a fixed number of swaps.
//!
//! Arrays `array_step_0 ..= array_step_3` hold the state before and after each
//! of three swaps. At every step exactly one trigger `s_swap_i_j` holds (`i == j`
//! is a no-op), and the last array must be non-decreasing.

use std::fmt::{self, Display, Formatter};

use crate::constraints::{exactly_one, ConstraintSet};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::oracle::{Oracle, Status};
use crate::solver::{SatOracle, SolverConfig};
use crate::term::{Sort, Term, TermPool};

/// Number of swaps.
pub const HORIZON: usize = 3;

/// How the effect of a swap is stated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SwapStrategy {
    /// `next = store(store(cur, i, cur[j]), j, cur[i])`.
    #[default]
    Store,
    /// One equality per position.
    Pointwise,
}

#[derive(Debug, Clone)]
pub struct SwapsConfig {
    pub strategy: SwapStrategy,
    /// Width of the signed array elements.
    pub element_width: u32,
    pub verbose: bool,
}

impl Default for SwapsConfig {
    fn default() -> Self {
        Self {
            strategy: SwapStrategy::Store,
            element_width: 16,
            verbose: false,
        }
    }
}

/// Arrays after every step and the swap chosen at each step.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SwapSolution {
    pub arrays: Vec<Vec<i64>>,
    pub decisions: Vec<(usize, usize)>,
}

impl SwapSolution {
    pub fn is_sorted(&self) -> bool {
        self.arrays
            .last()
            .is_some_and(|a| a.windows(2).all(|w| w[0] <= w[1]))
    }
}

impl Display for SwapSolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (s, array) in self.arrays.iter().enumerate() {
            let items: Vec<String> = array.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}. array: [ {} ]", s, items.join(", "))?;
            if let Some((i, j)) = self.decisions.get(s) {
                writeln!(f, "   decision: {}", swap_name(s, *i, *j))?;
            }
        }
        Ok(())
    }
}

fn swap_name(step: usize, i: usize, j: usize) -> String {
    format!("{}_swap_{}_{}", step, i, j)
}

pub struct Swaps<O: Oracle = SatOracle> {
    values: Vec<i64>,
    pool: TermPool,
    oracle: O,
    arrays: Vec<Term>,
    /// `actions[s][i * len + j]` swaps `i` and `j` at step `s`.
    actions: Vec<Vec<Term>>,
    diagnostics: Diagnostics,
}

impl Swaps<SatOracle> {
    pub fn new(values: &[i64], config: SwapsConfig) -> Result<Self> {
        let oracle = SatOracle::new(SolverConfig {
            int_width: (usize::BITS - values.len().leading_zeros() + 2).max(4),
            ..Default::default()
        });
        Self::with_oracle(values, config, oracle)
    }
}

impl<O: Oracle> Swaps<O> {
    pub fn with_oracle(values: &[i64], config: SwapsConfig, oracle: O) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::Config("the array must not be empty".to_string()));
        }
        let width = config.element_width;
        if !(2..=64).contains(&width) {
            return Err(Error::Config(format!("element width {} is not in 2..=64", width)));
        }
        let (min, max) = (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1);
        if let Some(&value) = values.iter().find(|&&v| !(min..=max).contains(&(v as i128))) {
            return Err(Error::Range { value, bits: width });
        }

        let len = values.len();
        let pool = TermPool::new();
        let sort = Sort::Array {
            len: len as u32,
            width,
        };
        let arrays = (0..=HORIZON)
            .map(|s| pool.get_or_create(&format!("array_step_{}", s), sort))
            .collect();
        let actions = (0..HORIZON)
            .map(|s| {
                (0..len * len)
                    .map(|k| pool.bool_const(&swap_name(s, k / len, k % len)))
                    .collect()
            })
            .collect();

        let mut swaps = Self {
            values: values.to_vec(),
            pool,
            oracle,
            arrays,
            actions,
            diagnostics: Diagnostics::new("swaps", config.verbose),
        };
        let mut set = swaps.initial_constraints(width);
        for s in 0..HORIZON {
            swaps.step_constraints(s, config.strategy, &mut set);
        }
        swaps.sorted_constraints(&mut set);
        swaps
            .diagnostics
            .info(format_args!("{} constraints over {} elements", set.len(), len));
        if swaps.diagnostics.is_verbose() {
            for &t in &set {
                swaps.diagnostics.fine(format_args!("adding {}", swaps.pool.to_sexpr(t)));
            }
        }
        swaps.oracle.assert_all(&swaps.pool, &set);
        Ok(swaps)
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn element(&self, step: usize, k: usize) -> Term {
        self.pool.mk_select(self.arrays[step], self.pool.mk_int(k as i64))
    }

    fn initial_constraints(&self, width: u32) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        for (k, &v) in self.values.iter().enumerate() {
            set.push(self.pool.mk_eq(self.element(0, k), self.pool.mk_bv(v, width)));
        }
        set
    }

    fn step_constraints(&self, step: usize, strategy: SwapStrategy, set: &mut ConstraintSet) {
        let p = &self.pool;
        let len = self.len();
        let (cur, next) = (self.arrays[step], self.arrays[step + 1]);
        for i in 0..len {
            for j in 0..len {
                let effect = match strategy {
                    SwapStrategy::Store => {
                        let (ii, jj) = (p.mk_int(i as i64), p.mk_int(j as i64));
                        let swapped = p.mk_store(p.mk_store(cur, ii, self.element(step, j)), jj, self.element(step, i));
                        p.mk_eq(next, swapped)
                    }
                    SwapStrategy::Pointwise => p.mk_and((0..len).map(|k| {
                        let source = if k == i {
                            j
                        } else if k == j {
                            i
                        } else {
                            k
                        };
                        p.mk_eq(self.element(step + 1, k), self.element(step, source))
                    })),
                };
                set.push(p.mk_implies(self.actions[step][i * len + j], effect));
            }
        }
        exactly_one(p, &self.actions[step], set);
    }

    fn sorted_constraints(&self, set: &mut ConstraintSet) {
        for k in 0..self.len().saturating_sub(1) {
            set.push(self.pool.mk_le(self.element(HORIZON, k), self.element(HORIZON, k + 1)));
        }
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn solve(&mut self) -> Status {
        let status = self.oracle.check(&self.pool, None);
        self.diagnostics.info(format_args!("{}", status));
        status
    }

    fn array(&self, model: &Model, step: usize) -> Result<Vec<i64>> {
        (0..self.len())
            .map(|k| model.eval_i64(&self.pool, self.element(step, k)))
            .collect()
    }

    fn decision(&self, model: &Model, step: usize) -> Result<(usize, usize)> {
        let len = self.len();
        let mut chosen: Option<(usize, usize)> = None;
        for (k, &trigger) in self.actions[step].iter().enumerate() {
            if !model.eval_bool(&self.pool, trigger)? {
                continue;
            }
            let (i, j) = (k / len, k % len);
            if let Some((fi, fj)) = chosen {
                return Err(Error::ExactlyOneViolated {
                    step,
                    first: swap_name(step, fi, fj),
                    second: swap_name(step, i, j),
                });
            }
            chosen = Some((i, j));
        }
        chosen.ok_or_else(|| Error::MissingInterpretation(format!("{}_swap", step)))
    }

    /// Reads the arrays and decisions of the last satisfiable [`Swaps::solve`].
    pub fn solution(&self) -> Result<SwapSolution> {
        let model = self.oracle.model().ok_or(Error::NoModel)?;
        let arrays = (0..=HORIZON)
            .map(|s| self.array(model, s))
            .collect::<Result<Vec<_>>>()?;
        let decisions = (0..HORIZON)
            .map(|s| self.decision(model, s))
            .collect::<Result<Vec<_>>>()?;
        Ok(SwapSolution { arrays, decisions })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_log::test;

    use super::*;
    use crate::model::Value;

    fn solve(values: &[i64], strategy: SwapStrategy) -> (Status, Option<SwapSolution>) {
        let config = SwapsConfig {
            strategy,
            element_width: 8,
            verbose: false,
        };
        let mut swaps = Swaps::new(values, config).unwrap();
        let status = swaps.solve();
        (status, swaps.solution().ok())
    }

    /// Delegates to a [`SatOracle`] and turns the named triggers on in every model.
    struct ForcedTriggers {
        inner: SatOracle,
        names: Vec<&'static str>,
        model: Option<Model>,
    }

    impl Oracle for ForcedTriggers {
        fn assert(&mut self, pool: &TermPool, term: Term) {
            self.inner.assert(pool, term);
        }

        fn push(&mut self) {
            self.inner.push();
        }

        fn pop(&mut self) {
            self.inner.pop();
        }

        fn check(&mut self, pool: &TermPool, timeout: Option<Duration>) -> Status {
            let status = self.inner.check(pool, timeout);
            self.model = self.inner.model().cloned().map(|mut model| {
                for name in &self.names {
                    let trigger = pool.lookup(name).unwrap();
                    model.insert(trigger, Value::Bool(true));
                }
                model
            });
            status
        }

        fn model(&self) -> Option<&Model> {
            self.model.as_ref()
        }
    }

    fn apply(values: &[i64], decisions: &[(usize, usize)]) -> Vec<i64> {
        let mut a = values.to_vec();
        for &(i, j) in decisions {
            a.swap(i, j);
        }
        a
    }

    #[test]
    fn test_sorts_default_input() {
        for strategy in [SwapStrategy::Store, SwapStrategy::Pointwise] {
            let (status, solution) = solve(&[1, 4, 2, 3, 5], strategy);
            assert_eq!(status, Status::Satisfiable);
            let solution = solution.unwrap();
            assert!(solution.is_sorted());
            assert_eq!(solution.arrays[0], vec![1, 4, 2, 3, 5]);
            assert_eq!(solution.arrays[3], vec![1, 2, 3, 4, 5]);
            assert_eq!(solution.decisions.len(), HORIZON);
            assert_eq!(apply(&[1, 4, 2, 3, 5], &solution.decisions), vec![1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn test_two_decisions_in_one_step() {
        let oracle = ForcedTriggers {
            inner: SatOracle::new(SolverConfig {
                int_width: 8,
                ..Default::default()
            }),
            names: vec!["0_swap_0_0", "0_swap_0_1"],
            model: None,
        };
        let config = SwapsConfig {
            element_width: 8,
            ..Default::default()
        };
        let mut swaps = Swaps::with_oracle(&[1, 4, 2, 3, 5], config, oracle).unwrap();
        assert_eq!(swaps.solve(), Status::Satisfiable);
        let result = swaps.solution();
        assert!(matches!(result, Err(Error::ExactlyOneViolated { step: 0, .. })));
        if let Err(Error::ExactlyOneViolated { first, second, .. }) = result {
            assert_eq!(first, "0_swap_0_0");
            assert_eq!(second, "0_swap_0_1");
        }
    }

    #[test]
    fn test_needs_more_than_three_swaps() {
        // reversing five elements takes two swaps, a 6-cycle takes five
        let (status, _) = solve(&[5, 4, 3, 2, 1], SwapStrategy::Store);
        assert_eq!(status, Status::Satisfiable);
        let (status, solution) = solve(&[2, 3, 4, 5, 6, 1], SwapStrategy::Pointwise);
        assert_eq!(status, Status::Unsatisfiable);
        assert!(solution.is_none());
    }

    #[test]
    fn test_rendering() {
        let solution = SwapSolution {
            arrays: vec![vec![2, 1], vec![1, 2], vec![1, 2], vec![1, 2]],
            decisions: vec![(0, 1), (0, 0), (1, 1)],
        };
        let text = solution.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0. array: [ 2, 1 ]");
        assert_eq!(lines[1], "   decision: 0_swap_0_1");
        assert_eq!(lines[6], "3. array: [ 1, 2 ]");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(Swaps::new(&[], SwapsConfig::default()), Err(Error::Config(_))));
        let narrow = SwapsConfig {
            element_width: 4,
            ..Default::default()
        };
        assert!(matches!(Swaps::new(&[1, 9], narrow), Err(Error::Range { value: 9, bits: 4 })));
    }

    #[test]
    fn test_negative_values() {
        let (status, solution) = solve(&[3, -1, 0], SwapStrategy::Store);
        assert_eq!(status, Status::Satisfiable);
        assert_eq!(solution.unwrap().arrays[3], vec![-1, 0, 3]);
    }
}
