//! The "reach the target" stack calculator.
//!
//! Given literals `nums`, a target and a bit width, the machine pushes literals
//! (each at most once) and combines the two topmost stack values with `+`, `-`,
//! `*` or `/` until a single value remains. Every step `s` has a stack array
//! `stack@s`, a top index `idx@s` and one trigger per [`Action`], exactly one of
//! which holds.
//!
//! For a binary action the operands are `v1 = stack[idx - 1]` (the top) and
//! `v2 = stack[idx - 2]`; the result `v1 op v2` replaces `v2`.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::bmc::{self, Outcome, TransitionSystem};
use crate::constraints::{exactly_one, ConstraintSet};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::solver::{SatBackend, SolverConfig};
use crate::term::{ArithOp, Sort, Term, TermPool};

#[derive(Debug, Clone)]
pub struct StackMachineConfig {
    pub nums: Vec<i64>,
    pub target: i64,
    /// Width of the signed stack values.
    pub bv_bits: u32,
    /// Forbid signed overflow in every arithmetic step.
    pub no_overflows: bool,
}

impl Default for StackMachineConfig {
    fn default() -> Self {
        Self {
            nums: Vec::new(),
            target: 0,
            bv_bits: 32,
            no_overflows: false,
        }
    }
}

/// One step of the machine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Action {
    /// Push literal number `slot` of the input, whose value is `value`.
    Push { slot: usize, value: i64 },
    Add,
    Sub,
    Mul,
    Div,
}

impl Action {
    fn op(self) -> Option<ArithOp> {
        match self {
            Action::Push { .. } => None,
            Action::Add => Some(ArithOp::Add),
            Action::Sub => Some(ArithOp::Sub),
            Action::Mul => Some(ArithOp::Mul),
            Action::Div => Some(ArithOp::Div),
        }
    }

    /// Name of the trigger of this action at `step`.
    pub fn trigger_name(self, step: usize) -> String {
        match self {
            Action::Push { slot, value } => format!("push_{}_{}@{}", slot, value, step),
            _ => format!("{}@{}", self, step),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Action::Push { value, .. } => write!(f, "push {}", value),
            Action::Add => write!(f, "add"),
            Action::Sub => write!(f, "sub"),
            Action::Mul => write!(f, "mul"),
            Action::Div => write!(f, "div"),
        }
    }
}

fn signed_range(bits: u32) -> (i64, i64) {
    let max = (1i64 << (bits - 1)) - 1;
    (-max - 1, max)
}

pub struct StackMachine {
    config: StackMachineConfig,
    pool: TermPool,
    actions: Vec<Action>,
    max_steps: usize,
    capacity: usize,
    int_width: u32,
    diagnostics: Diagnostics,
}

impl StackMachine {
    pub fn new(config: StackMachineConfig) -> Result<Self> {
        if config.nums.is_empty() {
            return Err(Error::Config("at least one number is required".to_string()));
        }
        if !(2..=63).contains(&config.bv_bits) {
            return Err(Error::Config(format!("bit width {} is not in 2..=63", config.bv_bits)));
        }
        if config.no_overflows {
            let (min, max) = signed_range(config.bv_bits);
            for &value in config.nums.iter().chain(std::iter::once(&config.target)) {
                if value < min || value > max {
                    return Err(Error::Range {
                        value,
                        bits: config.bv_bits,
                    });
                }
            }
        }

        let max_steps = 2 * config.nums.len() - 1;
        let capacity = max_steps + 1;
        let mut actions: Vec<Action> = config
            .nums
            .iter()
            .enumerate()
            .map(|(slot, &value)| Action::Push { slot, value })
            .collect();
        actions.extend([Action::Add, Action::Sub, Action::Mul, Action::Div]);
        let int_width = (usize::BITS - capacity.leading_zeros() + 2).max(4);

        Ok(Self {
            config,
            pool: TermPool::new(),
            actions,
            max_steps,
            capacity,
            int_width,
            diagnostics: Diagnostics::quiet("chiffres"),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &StackMachineConfig {
        &self.config
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of stack slots rendered by [`StackMachine::trace`].
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Backend sized for the stack indices of this machine.
    pub fn backend(&self, timeout: Option<Duration>) -> SatBackend {
        SatBackend::new(SolverConfig {
            int_width: self.int_width,
            timeout,
            conflict_limit: None,
        })
    }

    fn bv(&self, value: i64) -> Term {
        self.pool.mk_bv(value, self.config.bv_bits)
    }

    pub fn trigger(&self, action: Action, step: usize) -> Term {
        self.pool.bool_const(&action.trigger_name(step))
    }

    pub fn stack(&self, step: usize) -> Term {
        self.pool.get_or_create(
            &format!("stack@{}", step),
            Sort::Array {
                len: self.capacity as u32,
                width: self.config.bv_bits,
            },
        )
    }

    pub fn idx(&self, step: usize) -> Term {
        self.pool.int_const(&format!("idx@{}", step))
    }

    /// Effect of `action` between `step` and `step + 1`, guarded by its trigger.
    fn action_formula(&self, action: Action, step: usize) -> Term {
        let p = &self.pool;
        let stack = self.stack(step);
        let idx = self.idx(step);
        let next_stack = self.stack(step + 1);
        let next_idx = self.idx(step + 1);

        let effect = match (action, action.op()) {
            (Action::Push { value, .. }, _) => {
                let earlier: Vec<Term> = (0..step).map(|s| self.trigger(action, s)).collect();
                p.mk_and([
                    p.mk_eq(next_idx, p.mk_add(idx, p.mk_int(1))),
                    p.mk_eq(next_stack, p.mk_store(stack, idx, self.bv(value))),
                    p.mk_not(p.mk_or(earlier)),
                ])
            }
            (_, Some(op)) => {
                let v1 = p.mk_select(stack, p.mk_sub(idx, p.mk_int(1)));
                let v2 = p.mk_select(stack, p.mk_sub(idx, p.mk_int(2)));
                let mut conjuncts = vec![p.mk_ge(idx, p.mk_int(2))];
                if op == ArithOp::Div {
                    conjuncts.push(p.mk_not(p.mk_eq(v2, self.bv(0))));
                }
                if self.config.no_overflows {
                    conjuncts.push(p.mk_no_overflow(op, v1, v2));
                }
                let result = p.mk_arith(op, v1, v2);
                conjuncts.push(p.mk_eq(next_stack, p.mk_store(stack, p.mk_sub(idx, p.mk_int(2)), result)));
                conjuncts.push(p.mk_eq(next_idx, p.mk_sub(idx, p.mk_int(1))));
                p.mk_and(conjuncts)
            }
            (_, None) => unreachable!("only pushes have no operator"),
        };
        p.mk_implies(self.trigger(action, step), effect)
    }

    /// Logs the parameters of the puzzle.
    pub fn log_parameters(&self) {
        let d = &self.diagnostics;
        d.info(format_args!("Parameters:"));
        d.info(format_args!("- bvBits     : {}", self.config.bv_bits));
        d.info(format_args!("- noOverflows: {}", self.config.no_overflows));
        d.info(format_args!("- nums       : {:?}", self.config.nums));
        d.info(format_args!("- target     : {}", self.config.target));
    }

    /// Exact search, then approximate search if the target is unreachable.
    pub fn solve(&self, timeout: Option<Duration>) -> Outcome {
        self.log_parameters();
        bmc::solve(self, &self.backend(timeout), timeout, &self.diagnostics)
    }

    pub fn solve_exact(&self, timeout: Option<Duration>) -> Outcome {
        bmc::solve_exact(self, &self.backend(timeout), timeout, &self.diagnostics)
    }

    pub fn solve_approx(&self, timeout: Option<Duration>) -> Outcome {
        bmc::solve_approx(self, &self.backend(timeout), timeout, &self.diagnostics)
    }

    /// The action chosen at each of the first `steps` steps of `model`.
    pub fn actions_taken(&self, model: &Model, steps: usize) -> Result<Vec<Action>> {
        let mut taken = Vec::with_capacity(steps);
        for step in 0..steps {
            let mut chosen: Option<Action> = None;
            for &action in &self.actions {
                if !model.eval_bool(&self.pool, self.trigger(action, step))? {
                    continue;
                }
                if let Some(first) = chosen {
                    return Err(Error::ExactlyOneViolated {
                        step,
                        first: first.trigger_name(step),
                        second: action.trigger_name(step),
                    });
                }
                chosen = Some(action);
            }
            let action = chosen.ok_or_else(|| Error::MissingInterpretation(format!("action@{}", step)))?;
            taken.push(action);
        }
        Ok(taken)
    }

    /// Bottom stack value at `step`.
    pub fn result(&self, model: &Model, step: usize) -> Result<i64> {
        let bottom = self.pool.mk_select(self.stack(step), self.pool.mk_int(0));
        model.eval_i64(&self.pool, bottom)
    }

    /// Stack contents at `step`, marking the top index with `<|`.
    pub fn render_stack(&self, model: &Model, step: usize) -> Result<String> {
        let top = model.eval_i64(&self.pool, self.idx(step))?;
        let mut line = String::new();
        for slot in 0..self.capacity {
            let cell = self.pool.mk_select(self.stack(step), self.pool.mk_int(slot as i64));
            let value = model.eval_i64(&self.pool, cell)?;
            line.push_str(if top == slot as i64 { " <| " } else { " | " });
            line.push_str(&value.to_string());
        }
        Ok(line)
    }

    /// One line for the initial state and one per step: action, then stack.
    pub fn trace(&self, model: &Model, steps: usize) -> Result<Vec<String>> {
        let mut lines = vec![format!("init ~>{}", self.render_stack(model, 0)?)];
        for (step, action) in self.actions_taken(model, steps)?.into_iter().enumerate() {
            lines.push(format!("{} ~>{}", action, self.render_stack(model, step + 1)?));
        }
        Ok(lines)
    }
}

impl TransitionSystem for StackMachine {
    fn pool(&self) -> &TermPool {
        &self.pool
    }

    fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn initial(&self) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        set.push(self.pool.mk_eq(self.idx(0), self.pool.mk_int(0)));
        set
    }

    fn transition(&self, step: usize) -> ConstraintSet {
        let triggers: Vec<Term> = self.actions.iter().map(|&a| self.trigger(a, step)).collect();
        let mut set = ConstraintSet::new();
        exactly_one(&self.pool, &triggers, &mut set);
        for &action in &self.actions {
            set.push(self.action_formula(action, step));
        }
        set
    }

    fn goal(&self, step: usize) -> Term {
        let p = &self.pool;
        p.mk_and([
            p.mk_eq(self.idx(step), p.mk_int(1)),
            p.mk_eq(p.mk_select(self.stack(step), p.mk_int(0)), self.bv(self.config.target)),
        ])
    }

    fn relaxed_goal(&self, step: usize) -> Term {
        let p = &self.pool;
        p.mk_and([
            p.mk_eq(self.idx(step), p.mk_int(1)),
            p.mk_not(p.mk_eq(p.mk_select(self.stack(step), p.mk_int(0)), self.bv(self.config.target))),
        ])
    }

    /// `|target - stack[0]|`, one bit wider than the stack values.
    fn distance(&self, step: usize) -> Term {
        let p = &self.pool;
        let bits = self.config.bv_bits + 1;
        let top = p.mk_sign_extend(p.mk_select(self.stack(step), p.mk_int(0)), 1);
        let target = p.mk_sign_extend(self.bv(self.config.target), 1);
        debug_assert_eq!(p.sort(top), Sort::BitVec(bits));
        p.mk_abs(p.mk_sub(target, top))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::model::Value;
    use crate::oracle::Status;

    fn machine(nums: &[i64], target: i64, bv_bits: u32) -> StackMachine {
        StackMachine::new(StackMachineConfig {
            nums: nums.to_vec(),
            target,
            bv_bits,
            no_overflows: false,
        })
        .unwrap()
    }

    #[test]
    fn test_step_bound() {
        assert_eq!(machine(&[1, 2], 3, 8).max_steps(), 3);
        assert_eq!(machine(&[1, 2, 3], 3, 8).max_steps(), 5);
        assert_eq!(machine(&[1, 2, 3], 3, 8).capacity(), 6);
    }

    #[test]
    fn test_config_errors() {
        let config = |nums: Vec<i64>, target, bv_bits, no_overflows| StackMachineConfig {
            nums,
            target,
            bv_bits,
            no_overflows,
        };
        assert!(matches!(StackMachine::new(config(vec![], 1, 8, false)), Err(Error::Config(_))));
        assert!(matches!(StackMachine::new(config(vec![1], 1, 1, false)), Err(Error::Config(_))));
        assert!(matches!(
            StackMachine::new(config(vec![1, 200], 1, 8, true)),
            Err(Error::Range { value: 200, bits: 8 })
        ));
        assert!(matches!(
            StackMachine::new(config(vec![1, 2], -129, 8, true)),
            Err(Error::Range { value: -129, .. })
        ));
        assert!(StackMachine::new(config(vec![1, 200], 1, 8, false)).is_ok());
    }

    #[test]
    fn test_trigger_names() {
        assert_eq!(Action::Push { slot: 1, value: 7 }.trigger_name(3), "push_1_7@3");
        assert_eq!(Action::Div.trigger_name(0), "div@0");
        assert_eq!(Action::Push { slot: 0, value: -2 }.to_string(), "push -2");
    }

    #[test]
    fn test_exact_sum() {
        let m = machine(&[2, 3], 5, 8);
        let outcome = m.solve(None);
        assert_eq!(outcome.status, Status::Satisfiable);
        assert_eq!(outcome.mode, bmc::SearchMode::Exact);
        assert_eq!(outcome.steps, 3);
        let model = outcome.model.unwrap();
        let taken = m.actions_taken(&model, 3).unwrap();
        assert_eq!(taken.iter().filter(|a| matches!(a, Action::Push { .. })).count(), 2);
        assert_eq!(taken[2], Action::Add);
        assert_eq!(m.result(&model, 3).unwrap(), 5);
        let trace = m.trace(&model, 3).unwrap();
        assert_eq!(trace.len(), 4);
        assert!(trace[0].starts_with("init ~> <| "));
        assert!(trace[3].starts_with("add ~> | 5 <| "));
    }

    #[test]
    fn test_two_actions_in_one_step() {
        let m = machine(&[2, 3], 5, 8);
        let mut model = m.solve(None).model.unwrap();
        // step 0 is a push in every solution; turning div on as well breaks exactly-one
        model.insert(m.trigger(Action::Div, 0), Value::Bool(true));
        let result = m.actions_taken(&model, 3);
        assert!(matches!(result, Err(Error::ExactlyOneViolated { step: 0, .. })));
        if let Err(Error::ExactlyOneViolated { first, second, .. }) = result {
            assert!(first.starts_with("push_"));
            assert_eq!(second, "div@0");
        }
    }

    #[test]
    fn test_single_number() {
        let m = machine(&[7], 7, 8);
        let outcome = m.solve(None);
        assert_eq!(outcome.status, Status::Satisfiable);
        assert_eq!(outcome.steps, 1);
    }

    #[test]
    fn test_division_truncates() {
        // 7 / 2 is only reachable as v1 / v2 with 7 on top
        let m = machine(&[2, 7], 3, 8);
        let outcome = m.solve_exact(None);
        assert_eq!(outcome.status, Status::Satisfiable);
        let model = outcome.model.unwrap();
        let taken = m.actions_taken(&model, outcome.steps).unwrap();
        assert_eq!(taken.last(), Some(&Action::Div));
        assert_eq!(taken[0], Action::Push { slot: 0, value: 2 });
    }

    #[test]
    fn test_approximation() {
        let m = machine(&[2, 2], 100, 8);
        assert_eq!(m.solve_exact(None).status, Status::Unsatisfiable);
        let outcome = m.solve(None);
        assert_eq!(outcome.status, Status::Satisfiable);
        assert_eq!(outcome.mode, bmc::SearchMode::Approximate);
        assert_eq!(outcome.distance, Some(96));
        assert_eq!(outcome.steps, 3);
        let model = outcome.model.unwrap();
        assert_eq!(m.result(&model, 3).unwrap(), 4);
    }

    #[test]
    fn test_no_overflows() {
        // 100 * 2 overflows 8 bits, so 200 would only be reachable by wrapping to -56
        let wrapping = machine(&[100, 2], -56, 8);
        assert_eq!(wrapping.solve_exact(None).status, Status::Satisfiable);
        let strict = StackMachine::new(StackMachineConfig {
            nums: vec![100, 2],
            target: -56,
            bv_bits: 8,
            no_overflows: true,
        })
        .unwrap();
        assert_eq!(strict.solve_exact(None).status, Status::Unsatisfiable);
    }
}
