//! Incremental CDCL SAT solver.
//!
//! A compact conflict-driven clause-learning engine: two watched literals, VSIDS
//! branching with phase saving, first-UIP learning, Luby restarts and MiniSat-style
//! assumptions. Learnt clauses are never deleted, which keeps the solver simple and
//! is fine for the puzzle-sized instances the bit-blaster produces.
//!
//! The solver is incremental: clauses may be added between calls to
//! [`Solver::solve`], and assumptions only hold for a single call.

use std::time::Instant;

use log::debug;

use crate::types::{Lit, Var};

/// Outcome of [`Solver::solve`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SolveResult {
    Sat,
    Unsat,
    /// The budget ran out before an answer was found.
    Unknown,
}

/// Resource limits for one call to [`Solver::solve`].
#[derive(Debug, Copy, Clone, Default)]
pub struct Budget {
    pub deadline: Option<Instant>,
    pub conflicts: Option<u64>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }
}

type ClauseRef = usize;

#[derive(Debug)]
struct Clause {
    lits: Vec<Lit>,
    learnt: bool,
}

const RESTART_UNIT: f64 = 100.0;
const VAR_DECAY: f64 = 0.95;
/// Deadline checks happen on conflicts, restarts and every this many decisions.
const DECISIONS_PER_BUDGET_CHECK: u64 = 1024;

#[derive(Debug, Default)]
pub struct Solver {
    clauses: Vec<Clause>,
    /// `watches[l]` holds the clauses watching literal `l`.
    watches: Vec<Vec<ClauseRef>>,
    assigns: Vec<Option<bool>>,
    level: Vec<usize>,
    reason: Vec<Option<ClauseRef>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    activity: Vec<f64>,
    var_inc: f64,
    order: VarHeap,
    polarity: Vec<bool>,
    seen: Vec<bool>,
    ok: bool,
    model: Vec<bool>,
    num_conflicts: u64,
    num_decisions: u64,
    num_propagations: u64,
}

impl Solver {
    pub fn new() -> Self {
        Self {
            var_inc: 1.0,
            ok: true,
            ..Default::default()
        }
    }

    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.iter().filter(|c| !c.learnt).count()
    }

    pub fn num_learnts(&self) -> usize {
        self.clauses.iter().filter(|c| c.learnt).count()
    }

    pub fn num_conflicts(&self) -> u64 {
        self.num_conflicts
    }

    /// Whether the clause database is still consistent at level 0.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn new_var(&mut self) -> Var {
        let var = Var::new(self.assigns.len() as u32);
        self.assigns.push(None);
        self.level.push(0);
        self.reason.push(None);
        self.activity.push(0.0);
        self.polarity.push(false);
        self.seen.push(false);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        self.order.grow(self.assigns.len());
        self.order.insert(var, &self.activity);
        var
    }

    fn value(&self, lit: Lit) -> Option<bool> {
        lit_value(&self.assigns, lit)
    }

    fn decision_level(&self) -> usize {
        self.trail_lim.len()
    }

    /// Adds a clause at the root level.
    ///
    /// Returns `false` if the database became inconsistent.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        assert_eq!(self.decision_level(), 0);
        if !self.ok {
            return false;
        }
        let mut lits = lits.to_vec();
        lits.sort();
        lits.dedup();
        let mut simplified = Vec::with_capacity(lits.len());
        for (i, &lit) in lits.iter().enumerate() {
            if i + 1 < lits.len() && lits[i + 1] == -lit {
                // tautology
                return true;
            }
            match self.value(lit) {
                Some(true) => return true,
                Some(false) => {}
                None => simplified.push(lit),
            }
        }
        match simplified.len() {
            0 => {
                self.ok = false;
            }
            1 => {
                self.enqueue(simplified[0], None);
                if self.propagate().is_some() {
                    self.ok = false;
                }
            }
            _ => {
                self.attach(simplified, false);
            }
        }
        self.ok
    }

    fn attach(&mut self, lits: Vec<Lit>, learnt: bool) -> ClauseRef {
        let cr = self.clauses.len();
        self.watches[lits[0].code()].push(cr);
        self.watches[lits[1].code()].push(cr);
        self.clauses.push(Clause { lits, learnt });
        cr
    }

    fn enqueue(&mut self, lit: Lit, reason: Option<ClauseRef>) {
        let v = lit.var().index();
        debug_assert!(self.assigns[v].is_none());
        self.assigns[v] = Some(!lit.is_negated());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    /// Unit propagation. Returns the conflicting clause, if any.
    fn propagate(&mut self) -> Option<ClauseRef> {
        let mut conflict = None;
        while self.qhead < self.trail.len() && conflict.is_none() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            self.num_propagations += 1;
            let false_lit = -p;
            let mut ws = std::mem::take(&mut self.watches[false_lit.code()]);
            let mut i = 0;
            let mut j = 0;
            while i < ws.len() {
                let cr = ws[i];
                i += 1;
                let lits = &mut self.clauses[cr].lits;
                if lits[0] == false_lit {
                    lits.swap(0, 1);
                }
                let first = lits[0];
                if lit_value(&self.assigns, first) == Some(true) {
                    ws[j] = cr;
                    j += 1;
                    continue;
                }
                let mut moved = false;
                for k in 2..lits.len() {
                    if lit_value(&self.assigns, lits[k]) != Some(false) {
                        lits.swap(1, k);
                        self.watches[lits[1].code()].push(cr);
                        moved = true;
                        break;
                    }
                }
                if moved {
                    continue;
                }
                ws[j] = cr;
                j += 1;
                if lit_value(&self.assigns, first) == Some(false) {
                    conflict = Some(cr);
                    while i < ws.len() {
                        ws[j] = ws[i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.enqueue(first, Some(cr));
                }
            }
            ws.truncate(j);
            self.watches[false_lit.code()] = ws;
        }
        if conflict.is_some() {
            self.qhead = self.trail.len();
        }
        conflict
    }

    /// First-UIP conflict analysis. Returns the learnt clause (asserting literal
    /// first, highest remaining level second) and the backjump level.
    fn analyze(&mut self, conflict: ClauseRef) -> (Vec<Lit>, usize) {
        let mut learnt: Vec<Lit> = Vec::new();
        let mut pending = 0usize;
        let mut index = self.trail.len();
        let mut clause = conflict;
        let mut uip: Option<Lit> = None;

        loop {
            let start = if uip.is_some() { 1 } else { 0 };
            for k in start..self.clauses[clause].lits.len() {
                let q = self.clauses[clause].lits[k];
                let v = q.var().index();
                if !self.seen[v] && self.level[v] > 0 {
                    self.seen[v] = true;
                    self.bump(q.var());
                    if self.level[v] >= self.decision_level() {
                        pending += 1;
                    } else {
                        learnt.push(q);
                    }
                }
            }
            let p = loop {
                index -= 1;
                let p = self.trail[index];
                if self.seen[p.var().index()] {
                    break p;
                }
            };
            let v = p.var().index();
            self.seen[v] = false;
            pending -= 1;
            uip = Some(p);
            if pending == 0 {
                break;
            }
            match self.reason[v] {
                Some(r) => clause = r,
                None => unreachable!("implied literal {} without reason", p),
            }
        }

        for q in &learnt {
            self.seen[q.var().index()] = false;
        }
        let asserting = match uip {
            Some(p) => -p,
            None => unreachable!("conflict analysis found no UIP"),
        };
        learnt.insert(0, asserting);

        let mut backjump = 0;
        if learnt.len() > 1 {
            let mut max_k = 1;
            for k in 2..learnt.len() {
                if self.level[learnt[k].var().index()] > self.level[learnt[max_k].var().index()] {
                    max_k = k;
                }
            }
            learnt.swap(1, max_k);
            backjump = self.level[learnt[1].var().index()];
        }
        (learnt, backjump)
    }

    fn bump(&mut self, var: Var) {
        let v = var.index();
        self.activity[v] += self.var_inc;
        if self.activity[v] > 1e100 {
            for a in self.activity.iter_mut() {
                *a *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }
        self.order.update(var, &self.activity);
    }

    fn cancel_until(&mut self, level: usize) {
        if self.decision_level() <= level {
            return;
        }
        let lim = self.trail_lim[level];
        for k in (lim..self.trail.len()).rev() {
            let lit = self.trail[k];
            let v = lit.var().index();
            self.polarity[v] = !lit.is_negated();
            self.assigns[v] = None;
            self.reason[v] = None;
            self.order.insert(lit.var(), &self.activity);
        }
        self.trail.truncate(lim);
        self.trail_lim.truncate(level);
        self.qhead = lim;
    }

    fn pick_branch(&mut self) -> Option<Lit> {
        while let Some(var) = self.order.pop(&self.activity) {
            if self.assigns[var.index()].is_none() {
                return Some(Lit::new(var, !self.polarity[var.index()]));
            }
        }
        None
    }

    fn out_of_budget(&self, budget: &Budget, start_conflicts: u64) -> bool {
        if let Some(limit) = budget.conflicts {
            if self.num_conflicts - start_conflicts >= limit {
                return true;
            }
        }
        matches!(budget.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Decides the clause database under `assumptions`.
    ///
    /// After [`SolveResult::Sat`], [`Solver::model_value`] reads the model.
    pub fn solve(&mut self, assumptions: &[Lit], budget: &Budget) -> SolveResult {
        self.model.clear();
        if !self.ok {
            return SolveResult::Unsat;
        }
        let start_conflicts = self.num_conflicts;
        let mut restarts = 0;
        let result = loop {
            if self.out_of_budget(budget, start_conflicts) {
                break SolveResult::Unknown;
            }
            let limit = (luby(2.0, restarts) * RESTART_UNIT) as u64;
            if let Some(result) = self.search(limit, assumptions, budget, start_conflicts) {
                break result;
            }
            restarts += 1;
        };
        self.cancel_until(0);
        debug!(
            "solve: {:?} (vars={}, clauses={}, learnts={}, conflicts={}, decisions={}, propagations={}, restarts={})",
            result,
            self.num_vars(),
            self.num_clauses(),
            self.num_learnts(),
            self.num_conflicts - start_conflicts,
            self.num_decisions,
            self.num_propagations,
            restarts
        );
        result
    }

    fn search(&mut self, nof_conflicts: u64, assumptions: &[Lit], budget: &Budget, start_conflicts: u64) -> Option<SolveResult> {
        let mut conflicts = 0;
        loop {
            if let Some(conflict) = self.propagate() {
                self.num_conflicts += 1;
                conflicts += 1;
                if self.decision_level() == 0 {
                    self.ok = false;
                    return Some(SolveResult::Unsat);
                }
                let (learnt, backjump) = self.analyze(conflict);
                self.cancel_until(backjump);
                let asserting = learnt[0];
                if learnt.len() == 1 {
                    self.enqueue(asserting, None);
                } else {
                    let cr = self.attach(learnt, true);
                    self.enqueue(asserting, Some(cr));
                }
                self.var_inc /= VAR_DECAY;
                if self.out_of_budget(budget, start_conflicts) {
                    return Some(SolveResult::Unknown);
                }
            } else {
                if conflicts >= nof_conflicts {
                    self.cancel_until(0);
                    return None;
                }
                let mut next = None;
                while self.decision_level() < assumptions.len() {
                    let p = assumptions[self.decision_level()];
                    match self.value(p) {
                        Some(true) => self.trail_lim.push(self.trail.len()),
                        Some(false) => return Some(SolveResult::Unsat),
                        None => {
                            next = Some(p);
                            break;
                        }
                    }
                }
                let next = match next {
                    Some(p) => p,
                    None => match self.pick_branch() {
                        Some(p) => {
                            self.num_decisions += 1;
                            if self.num_decisions % DECISIONS_PER_BUDGET_CHECK == 0
                                && self.out_of_budget(budget, start_conflicts)
                            {
                                return Some(SolveResult::Unknown);
                            }
                            p
                        }
                        None => {
                            self.model = self.assigns.iter().map(|a| a.unwrap_or(false)).collect();
                            return Some(SolveResult::Sat);
                        }
                    },
                };
                self.trail_lim.push(self.trail.len());
                self.enqueue(next, None);
            }
        }
    }

    /// Value of `lit` in the last model, if the last call returned [`SolveResult::Sat`].
    pub fn model_value(&self, lit: Lit) -> Option<bool> {
        self.model.get(lit.var().index()).map(|&b| b != lit.is_negated())
    }
}

fn lit_value(assigns: &[Option<bool>], lit: Lit) -> Option<bool> {
    assigns[lit.var().index()].map(|b| b != lit.is_negated())
}

/// Element `x` (0-based) of the Luby sequence scaled by powers of `y`.
fn luby(y: f64, mut x: u32) -> f64 {
    let mut size = 1u32;
    let mut seq = 0i32;
    while size < x + 1 {
        seq += 1;
        size = 2 * size + 1;
    }
    while size - 1 != x {
        size = (size - 1) >> 1;
        seq -= 1;
        x %= size;
    }
    y.powi(seq)
}

/// Binary max-heap of variables ordered by activity.
#[derive(Debug, Default)]
struct VarHeap {
    heap: Vec<Var>,
    position: Vec<Option<usize>>,
}

impl VarHeap {
    fn grow(&mut self, num_vars: usize) {
        self.position.resize(num_vars, None);
    }

    fn insert(&mut self, var: Var, activity: &[f64]) {
        if self.position[var.index()].is_some() {
            return;
        }
        self.position[var.index()] = Some(self.heap.len());
        self.heap.push(var);
        self.sift_up(self.heap.len() - 1, activity);
    }

    fn update(&mut self, var: Var, activity: &[f64]) {
        if let Some(i) = self.position[var.index()] {
            self.sift_up(i, activity);
        }
    }

    fn pop(&mut self, activity: &[f64]) -> Option<Var> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        self.position[top.index()] = None;
        if !self.heap.is_empty() {
            self.position[self.heap[0].index()] = Some(0);
            self.sift_down(0, activity);
        }
        Some(top)
    }

    fn sift_up(&mut self, mut i: usize, activity: &[f64]) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if activity[self.heap[i].index()] > activity[self.heap[parent].index()] {
                self.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize, activity: &[f64]) {
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut best = i;
            if left < self.heap.len() && activity[self.heap[left].index()] > activity[self.heap[best].index()] {
                best = left;
            }
            if right < self.heap.len() && activity[self.heap[right].index()] > activity[self.heap[best].index()] {
                best = right;
            }
            if best == i {
                break;
            }
            self.swap(i, best);
            i = best;
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.position[self.heap[i].index()] = Some(i);
        self.position[self.heap[j].index()] = Some(j);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn lits(solver: &mut Solver, n: usize) -> Vec<Var> {
        (0..n).map(|_| solver.new_var()).collect()
    }

    #[test]
    fn test_luby() {
        let seq: Vec<u32> = (0..15).map(|i| luby(2.0, i) as u32).collect();
        assert_eq!(seq, vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]);
    }

    #[test]
    fn test_simple_sat() {
        let mut s = Solver::new();
        let v = lits(&mut s, 3);
        assert!(s.add_clause(&[v[0].pos(), v[1].pos()]));
        assert!(s.add_clause(&[v[0].neg(), v[2].pos()]));
        assert!(s.add_clause(&[v[1].neg(), v[2].pos()]));
        assert!(s.add_clause(&[v[2].neg(), v[0].neg()]));
        assert_eq!(s.solve(&[], &Budget::unlimited()), SolveResult::Sat);
        assert_eq!(s.model_value(v[0].pos()), Some(false));
        assert_eq!(s.model_value(v[1].pos()), Some(true));
        assert_eq!(s.model_value(v[2].pos()), Some(true));
    }

    #[test]
    fn test_empty_clause() {
        let mut s = Solver::new();
        let x = s.new_var();
        assert!(s.add_clause(&[x.pos()]));
        assert!(!s.add_clause(&[x.neg()]));
        assert_eq!(s.solve(&[], &Budget::unlimited()), SolveResult::Unsat);
    }

    #[test]
    fn test_assumptions() {
        let mut s = Solver::new();
        let v = lits(&mut s, 2);
        s.add_clause(&[v[0].pos(), v[1].pos()]);
        assert_eq!(s.solve(&[v[0].neg(), v[1].neg()], &Budget::unlimited()), SolveResult::Unsat);
        assert_eq!(s.solve(&[v[0].neg()], &Budget::unlimited()), SolveResult::Sat);
        assert_eq!(s.model_value(v[1].pos()), Some(true));
        // assumptions do not persist
        assert_eq!(s.solve(&[v[1].neg()], &Budget::unlimited()), SolveResult::Sat);
        assert_eq!(s.model_value(v[0].pos()), Some(true));
    }

    /// Pigeons `p` into holes `p - 1`.
    fn pigeonhole(s: &mut Solver, pigeons: usize) {
        let holes = pigeons - 1;
        let x: Vec<Vec<Var>> = (0..pigeons).map(|_| lits(s, holes)).collect();
        for row in &x {
            s.add_clause(&row.iter().map(|v| v.pos()).collect::<Vec<_>>());
        }
        for h in 0..holes {
            for i in 0..pigeons {
                for j in i + 1..pigeons {
                    s.add_clause(&[x[i][h].neg(), x[j][h].neg()]);
                }
            }
        }
    }

    #[test]
    fn test_pigeonhole_unsat() {
        let mut s = Solver::new();
        pigeonhole(&mut s, 6);
        assert_eq!(s.solve(&[], &Budget::unlimited()), SolveResult::Unsat);
    }

    #[test]
    fn test_conflict_budget() {
        let mut s = Solver::new();
        pigeonhole(&mut s, 9);
        let budget = Budget {
            deadline: None,
            conflicts: Some(10),
        };
        assert_eq!(s.solve(&[], &budget), SolveResult::Unknown);
    }

    #[test]
    fn test_expired_deadline() {
        let mut s = Solver::new();
        let v = lits(&mut s, 8);
        s.add_clause(&v.iter().map(|x| x.pos()).collect::<Vec<_>>());
        let budget = Budget {
            deadline: Some(Instant::now()),
            conflicts: None,
        };
        assert_eq!(s.solve(&[], &budget), SolveResult::Unknown);
        assert_eq!(s.model_value(v[0].pos()), None);
        // the instance itself is untouched
        assert_eq!(s.solve(&[], &Budget::unlimited()), SolveResult::Sat);
    }

    #[test]
    fn test_zero_conflict_budget() {
        let mut s = Solver::new();
        let v = lits(&mut s, 2);
        s.add_clause(&[v[0].pos(), v[1].pos()]);
        let budget = Budget {
            deadline: None,
            conflicts: Some(0),
        };
        assert_eq!(s.solve(&[], &budget), SolveResult::Unknown);
    }

    #[test]
    fn test_incremental() {
        let mut s = Solver::new();
        let v = lits(&mut s, 4);
        s.add_clause(&[v[0].pos(), v[1].pos(), v[2].pos(), v[3].pos()]);
        let mut found = 0;
        while s.solve(&[], &Budget::unlimited()) == SolveResult::Sat {
            found += 1;
            let block: Vec<Lit> = v
                .iter()
                .map(|&x| if s.model_value(x.pos()) == Some(true) { x.neg() } else { x.pos() })
                .collect();
            s.add_clause(&block);
        }
        assert_eq!(found, 15);
    }
}
