//! Bit-blasting of terms into CNF.
//!
//! Every boolean term becomes a literal, every word (integer or bit-vector) a
//! little-endian vector of literals, and every array a vector of words. Gates are
//! Tseitin-encoded into the underlying [`Solver`] and hash-consed, so a gate over
//! the same inputs is only ever encoded once. Integers are blasted as signed
//! words of `int_width` bits.

use std::collections::HashMap;

use log::debug;

use crate::model::{to_signed, Model, Value};
use crate::sat::{Budget, SolveResult, Solver};
use crate::term::{mask, ArithOp, Node, Sort, Term, TermPool};
use crate::types::Lit;

/// Blasted form of a term.
#[derive(Debug, Clone)]
pub enum Bits {
    Bool(Lit),
    Word(Vec<Lit>),
    Array(Vec<Vec<Lit>>),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
enum Gate {
    And(Vec<Lit>),
    Xor(Lit, Lit),
    Ite(Lit, Lit, Lit),
}

pub struct Blaster {
    sat: Solver,
    int_width: u32,
    tru: Lit,
    cache: HashMap<Term, Bits>,
    gates: HashMap<Gate, Lit>,
    consts: Vec<Term>,
}

impl Blaster {
    pub fn new(int_width: u32) -> Self {
        assert!((2..=64).contains(&int_width), "integer width must be in 2..=64");
        let mut sat = Solver::new();
        let tru = sat.new_var().pos();
        sat.add_clause(&[tru]);
        Self {
            sat,
            int_width,
            tru,
            cache: HashMap::new(),
            gates: HashMap::new(),
            consts: Vec::new(),
        }
    }

    pub fn int_width(&self) -> u32 {
        self.int_width
    }

    pub fn solver(&self) -> &Solver {
        &self.sat
    }

    pub fn fresh(&mut self) -> Lit {
        self.sat.new_var().pos()
    }

    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        self.sat.add_clause(lits)
    }

    pub fn solve(&mut self, assumptions: &[Lit], budget: &Budget) -> SolveResult {
        self.sat.solve(assumptions, budget)
    }

    fn fls(&self) -> Lit {
        -self.tru
    }

    fn width(&self, sort: Sort) -> u32 {
        match sort {
            Sort::Int => self.int_width,
            Sort::BitVec(w) => w,
            _ => panic!("sort {} has no word width", sort),
        }
    }

    /// Literal of a boolean term.
    pub fn lit(&mut self, pool: &TermPool, term: Term) -> Lit {
        match self.blast(pool, term) {
            Bits::Bool(l) => l,
            other => panic!("expected a boolean term, got {:?}", other),
        }
    }

    /// Bits of a word term, least significant first.
    pub fn word(&mut self, pool: &TermPool, term: Term) -> Vec<Lit> {
        match self.blast(pool, term) {
            Bits::Word(w) => w,
            other => panic!("expected a word term, got {:?}", other),
        }
    }

    fn blast(&mut self, pool: &TermPool, term: Term) -> Bits {
        if let Some(bits) = self.cache.get(&term) {
            return bits.clone();
        }
        let sort = pool.sort(term);
        let bits = match pool.node(term) {
            Node::Bool(b) => Bits::Bool(if b { self.tru } else { self.fls() }),
            Node::Int(v) => Bits::Word(self.const_word(v as u64, self.int_width)),
            Node::BitVec { width, bits } => Bits::Word(self.const_word(bits, width)),
            Node::Const(name) => {
                self.consts.push(term);
                let bits = match sort {
                    Sort::Bool => Bits::Bool(self.fresh()),
                    Sort::Int | Sort::BitVec(_) => Bits::Word(self.fresh_word(self.width(sort))),
                    Sort::Array { len, width } => {
                        Bits::Array((0..len).map(|_| self.fresh_word(width)).collect())
                    }
                };
                debug!("blasted constant {} : {}", name, sort);
                bits
            }
            Node::Not(a) => Bits::Bool(-self.lit(pool, a)),
            Node::And(xs) => {
                let lits: Vec<Lit> = xs.into_iter().map(|x| self.lit(pool, x)).collect();
                Bits::Bool(self.and(&lits))
            }
            Node::Or(xs) => {
                let lits: Vec<Lit> = xs.into_iter().map(|x| self.lit(pool, x)).collect();
                Bits::Bool(self.or(&lits))
            }
            Node::Ite(c, t, e) => {
                let c = self.lit(pool, c);
                let t = self.blast(pool, t);
                let e = self.blast(pool, e);
                self.ite_bits(c, t, e)
            }
            Node::Eq(a, b) => {
                let a = self.blast(pool, a);
                let b = self.blast(pool, b);
                Bits::Bool(self.eq_bits(&a, &b))
            }
            Node::Arith(op, a, b) => {
                let a = self.word(pool, a);
                let b = self.word(pool, b);
                Bits::Word(match op {
                    ArithOp::Add => self.add(&a, &b),
                    ArithOp::Sub => self.sub(&a, &b),
                    ArithOp::Mul => self.mul(&a, &b),
                    ArithOp::Div => self.sdiv(&a, &b),
                })
            }
            Node::Neg(a) => {
                let a = self.word(pool, a);
                Bits::Word(self.neg(&a))
            }
            Node::Le(a, b) => {
                let a = self.word(pool, a);
                let b = self.word(pool, b);
                Bits::Bool(-self.slt(&b, &a))
            }
            Node::Lt(a, b) => {
                let a = self.word(pool, a);
                let b = self.word(pool, b);
                Bits::Bool(self.slt(&a, &b))
            }
            Node::SignExtend(a, extra) => {
                let a = self.word(pool, a);
                Bits::Word(sign_extend(&a, extra as usize))
            }
            Node::NoOverflow(op, a, b) => {
                let a = self.word(pool, a);
                let b = self.word(pool, b);
                Bits::Bool(self.no_overflow(op, &a, &b))
            }
            Node::Select(array, index) => {
                let Bits::Array(items) = self.blast(pool, array) else {
                    panic!("select from a non-array term");
                };
                let width = self.width(sort) as usize;
                match pool.as_int(index) {
                    Some(k) => Bits::Word(
                        usize::try_from(k)
                            .ok()
                            .and_then(|k| items.get(k).cloned())
                            .unwrap_or_else(|| vec![self.fls(); width]),
                    ),
                    None => {
                        let index = self.word(pool, index);
                        let mut result = vec![self.fls(); width];
                        for (k, item) in items.iter().enumerate().rev() {
                            let hit = self.eq_const(&index, k as u64);
                            result = self.ite_word(hit, item, &result);
                        }
                        Bits::Word(result)
                    }
                }
            }
            Node::Store(array, index, value) => {
                let Bits::Array(items) = self.blast(pool, array) else {
                    panic!("store into a non-array term");
                };
                let value = self.word(pool, value);
                match pool.as_int(index) {
                    Some(k) => {
                        let mut items = items;
                        if let Some(slot) = usize::try_from(k).ok().and_then(|k| items.get_mut(k)) {
                            *slot = value;
                        }
                        Bits::Array(items)
                    }
                    None => {
                        let index = self.word(pool, index);
                        let mut result = Vec::with_capacity(items.len());
                        for (k, item) in items.iter().enumerate() {
                            let hit = self.eq_const(&index, k as u64);
                            result.push(self.ite_word(hit, &value, item));
                        }
                        Bits::Array(result)
                    }
                }
            }
        };
        self.cache.insert(term, bits.clone());
        bits
    }

    /// Reads the values of every constant blasted so far from the last SAT model.
    pub fn read_model(&self, pool: &TermPool) -> Model {
        let mut model = Model::new(self.int_width);
        for &term in &self.consts {
            let value = match (&self.cache[&term], pool.sort(term)) {
                (Bits::Bool(l), _) => Value::Bool(self.value(*l)),
                (Bits::Word(w), Sort::Int) => Value::Int(to_signed(self.word_value(w), self.int_width)),
                (Bits::Word(w), _) => Value::BitVec {
                    width: w.len() as u32,
                    bits: self.word_value(w),
                },
                (Bits::Array(items), _) => Value::Array(
                    items
                        .iter()
                        .map(|w| Value::BitVec {
                            width: w.len() as u32,
                            bits: self.word_value(w),
                        })
                        .collect(),
                ),
            };
            model.insert(term, value);
        }
        model
    }

    pub fn value(&self, lit: Lit) -> bool {
        self.sat.model_value(lit).unwrap_or(false)
    }

    pub fn word_value(&self, word: &[Lit]) -> u64 {
        word.iter()
            .enumerate()
            .fold(0u64, |acc, (i, &l)| if self.value(l) { acc | (1 << i) } else { acc })
    }
}

// Gates
impl Blaster {
    pub fn and(&mut self, lits: &[Lit]) -> Lit {
        let (tru, fls) = (self.tru, self.fls());
        let mut inputs: Vec<Lit> = Vec::with_capacity(lits.len());
        for &l in lits {
            if l == fls {
                return fls;
            }
            if l != tru {
                inputs.push(l);
            }
        }
        inputs.sort();
        inputs.dedup();
        if inputs.windows(2).any(|w| w[0] == -w[1]) {
            return fls;
        }
        match inputs.len() {
            0 => return tru,
            1 => return inputs[0],
            _ => {}
        }
        let key = Gate::And(inputs);
        if let Some(&g) = self.gates.get(&key) {
            return g;
        }
        let Gate::And(inputs) = &key else { unreachable!() };
        let g = self.fresh();
        let mut long = Vec::with_capacity(inputs.len() + 1);
        long.push(g);
        for &l in inputs {
            self.sat.add_clause(&[-g, l]);
            long.push(-l);
        }
        self.sat.add_clause(&long);
        self.gates.insert(key, g);
        g
    }

    pub fn or(&mut self, lits: &[Lit]) -> Lit {
        let negated: Vec<Lit> = lits.iter().map(|&l| -l).collect();
        -self.and(&negated)
    }

    pub fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        let (tru, fls) = (self.tru, self.fls());
        if a == fls {
            return b;
        }
        if b == fls {
            return a;
        }
        if a == tru {
            return -b;
        }
        if b == tru {
            return -a;
        }
        if a == b {
            return fls;
        }
        if a == -b {
            return tru;
        }
        let flip = a.is_negated() ^ b.is_negated();
        let (a, b) = (a.var().pos(), b.var().pos());
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        let g = match self.gates.get(&Gate::Xor(a, b)) {
            Some(&g) => g,
            None => {
                let g = self.fresh();
                self.sat.add_clause(&[-g, a, b]);
                self.sat.add_clause(&[-g, -a, -b]);
                self.sat.add_clause(&[g, -a, b]);
                self.sat.add_clause(&[g, a, -b]);
                self.gates.insert(Gate::Xor(a, b), g);
                g
            }
        };
        if flip {
            -g
        } else {
            g
        }
    }

    pub fn iff(&mut self, a: Lit, b: Lit) -> Lit {
        -self.xor(a, b)
    }

    pub fn ite(&mut self, c: Lit, t: Lit, e: Lit) -> Lit {
        let (tru, fls) = (self.tru, self.fls());
        if c == tru || t == e {
            return t;
        }
        if c == fls {
            return e;
        }
        if t == tru {
            return self.or(&[c, e]);
        }
        if t == fls {
            return self.and(&[-c, e]);
        }
        if e == tru {
            return self.or(&[-c, t]);
        }
        if e == fls {
            return self.and(&[c, t]);
        }
        if t == -e {
            return self.iff(c, t);
        }
        if let Some(&g) = self.gates.get(&Gate::Ite(c, t, e)) {
            return g;
        }
        let g = self.fresh();
        self.sat.add_clause(&[-c, -t, g]);
        self.sat.add_clause(&[-c, t, -g]);
        self.sat.add_clause(&[c, -e, g]);
        self.sat.add_clause(&[c, e, -g]);
        self.sat.add_clause(&[-t, -e, g]);
        self.sat.add_clause(&[t, e, -g]);
        self.gates.insert(Gate::Ite(c, t, e), g);
        g
    }
}

fn sign_extend(a: &[Lit], extra: usize) -> Vec<Lit> {
    let msb = a[a.len() - 1];
    let mut r = a.to_vec();
    r.extend(std::iter::repeat(msb).take(extra));
    r
}

// Words
impl Blaster {
    fn const_word(&self, value: u64, width: u32) -> Vec<Lit> {
        let value = value & mask(width);
        (0..width)
            .map(|i| if value >> i & 1 == 1 { self.tru } else { self.fls() })
            .collect()
    }

    fn fresh_word(&mut self, width: u32) -> Vec<Lit> {
        (0..width).map(|_| self.fresh()).collect()
    }

    fn ite_word(&mut self, c: Lit, t: &[Lit], e: &[Lit]) -> Vec<Lit> {
        t.iter().zip(e).map(|(&t, &e)| self.ite(c, t, e)).collect()
    }

    fn ite_bits(&mut self, c: Lit, t: Bits, e: Bits) -> Bits {
        match (t, e) {
            (Bits::Bool(t), Bits::Bool(e)) => Bits::Bool(self.ite(c, t, e)),
            (Bits::Word(t), Bits::Word(e)) => Bits::Word(self.ite_word(c, &t, &e)),
            (Bits::Array(t), Bits::Array(e)) => {
                Bits::Array(t.iter().zip(&e).map(|(t, e)| self.ite_word(c, t, e)).collect())
            }
            (t, e) => panic!("ite over mismatched branches {:?} and {:?}", t, e),
        }
    }

    fn eq_word(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        assert_eq!(a.len(), b.len());
        let bits: Vec<Lit> = a.iter().zip(b).map(|(&x, &y)| self.iff(x, y)).collect();
        self.and(&bits)
    }

    fn eq_const(&mut self, a: &[Lit], k: u64) -> Lit {
        if a.len() < 64 && k >> a.len() != 0 {
            return self.fls();
        }
        let k = self.const_word(k, a.len() as u32);
        self.eq_word(a, &k)
    }

    fn eq_bits(&mut self, a: &Bits, b: &Bits) -> Lit {
        match (a, b) {
            (Bits::Bool(a), Bits::Bool(b)) => self.iff(*a, *b),
            (Bits::Word(a), Bits::Word(b)) => self.eq_word(a, b),
            (Bits::Array(a), Bits::Array(b)) => {
                let eqs: Vec<Lit> = a.iter().zip(b).map(|(x, y)| self.eq_word(x, y)).collect();
                self.and(&eqs)
            }
            (a, b) => panic!("equality over mismatched terms {:?} and {:?}", a, b),
        }
    }

    /// Ripple-carry addition; returns the sum and the carry out.
    fn add_carry(&mut self, a: &[Lit], b: &[Lit], carry_in: Lit) -> (Vec<Lit>, Lit) {
        assert_eq!(a.len(), b.len());
        let mut carry = carry_in;
        let mut sum = Vec::with_capacity(a.len());
        for (&x, &y) in a.iter().zip(b) {
            let t = self.xor(x, y);
            sum.push(self.xor(t, carry));
            let both = self.and(&[x, y]);
            let propagate = self.and(&[t, carry]);
            carry = self.or(&[both, propagate]);
        }
        (sum, carry)
    }

    fn add(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        let fls = self.fls();
        self.add_carry(a, b, fls).0
    }

    fn sub(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        let nb: Vec<Lit> = b.iter().map(|&l| -l).collect();
        let tru = self.tru;
        self.add_carry(a, &nb, tru).0
    }

    fn neg(&mut self, a: &[Lit]) -> Vec<Lit> {
        let zero = self.const_word(0, a.len() as u32);
        self.sub(&zero, a)
    }

    /// Shift-and-add multiplication, truncated to the operand width.
    fn mul(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        let w = a.len();
        let fls = self.fls();
        let mut acc = vec![fls; w];
        for i in 0..w {
            if b[i] == fls {
                continue;
            }
            let partial: Vec<Lit> = (0..w)
                .map(|j| if j < i { fls } else { self.and(&[b[i], a[j - i]]) })
                .collect();
            acc = self.add(&acc, &partial);
        }
        acc
    }

    fn ult(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        let nb: Vec<Lit> = b.iter().map(|&l| -l).collect();
        let tru = self.tru;
        let (_, carry) = self.add_carry(a, &nb, tru);
        -carry
    }

    fn slt(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        let mut a = a.to_vec();
        let mut b = b.to_vec();
        let msb = a.len() - 1;
        a[msb] = -a[msb];
        b[msb] = -b[msb];
        self.ult(&a, &b)
    }

    /// Unsigned `word <= k`.
    pub fn ule_const(&mut self, word: &[Lit], k: u64) -> Lit {
        if word.len() < 64 && k >= mask(word.len() as u32) {
            return self.tru;
        }
        let k = self.const_word(k, word.len() as u32);
        -self.ult(&k, word)
    }

    /// Restoring division; a zero divisor yields an all-ones quotient and the
    /// dividend as remainder.
    fn udiv_urem(&mut self, a: &[Lit], b: &[Lit]) -> (Vec<Lit>, Vec<Lit>) {
        let w = a.len();
        let fls = self.fls();
        let nb: Vec<Lit> = b.iter().map(|&l| -l).collect();
        let b_is_zero = self.and(&nb);
        let mut b_wide = b.to_vec();
        b_wide.push(fls);

        let mut r = vec![fls; w];
        let mut q = vec![fls; w];
        for i in (0..w).rev() {
            let mut shifted = Vec::with_capacity(w + 1);
            shifted.push(a[i]);
            shifted.extend_from_slice(&r);
            let lt = self.ult(&shifted, &b_wide);
            let diff = self.sub(&shifted, &b_wide);
            let ge = -lt;
            r = self.ite_word(ge, &diff[..w], &shifted[..w]);
            q[i] = ge;
        }

        let tru = self.tru;
        let q = q.iter().map(|&qi| self.ite(b_is_zero, tru, qi)).collect();
        let r = self.ite_word(b_is_zero, a, &r);
        (q, r)
    }

    fn abs(&mut self, a: &[Lit]) -> Vec<Lit> {
        let negated = self.neg(a);
        self.ite_word(a[a.len() - 1], &negated, a)
    }

    /// Signed division truncating toward zero.
    fn sdiv(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        let sa = a[a.len() - 1];
        let sb = b[b.len() - 1];
        let ua = self.abs(a);
        let ub = self.abs(b);
        let (q, _) = self.udiv_urem(&ua, &ub);
        let negated = self.neg(&q);
        let flip = self.xor(sa, sb);
        self.ite_word(flip, &negated, &q)
    }

    fn no_overflow(&mut self, op: ArithOp, a: &[Lit], b: &[Lit]) -> Lit {
        let w = a.len();
        let sa = a[w - 1];
        let sb = b[w - 1];
        match op {
            ArithOp::Add => {
                let s = self.add(a, b);
                let same = self.iff(sa, sb);
                let flipped = self.xor(s[w - 1], sa);
                -self.and(&[same, flipped])
            }
            ArithOp::Sub => {
                let d = self.sub(a, b);
                let differ = self.xor(sa, sb);
                let flipped = self.xor(d[w - 1], sa);
                -self.and(&[differ, flipped])
            }
            ArithOp::Mul => {
                let wa = sign_extend(a, w);
                let wb = sign_extend(b, w);
                let product = self.mul(&wa, &wb);
                let top = product[w - 1];
                let agree: Vec<Lit> = product[w..].iter().map(|&l| self.iff(l, top)).collect();
                self.and(&agree)
            }
            ArithOp::Div => {
                let min = self.eq_const(a, 1 << (w - 1));
                let minus_one = self.eq_const(b, mask(w as u32));
                -self.and(&[min, minus_one])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn solve_for(pool: &TermPool, blaster: &mut Blaster, goal: Term) -> Option<Model> {
        let l = blaster.lit(pool, goal);
        match blaster.solve(&[l], &Budget::unlimited()) {
            SolveResult::Sat => Some(blaster.read_model(pool)),
            _ => None,
        }
    }

    #[test]
    fn test_gate_folding() {
        let mut b = Blaster::new(8);
        let x = b.fresh();
        let y = b.fresh();
        let tru = b.tru;
        assert_eq!(b.and(&[x, tru]), x);
        assert_eq!(b.and(&[x, -x]), -tru);
        assert_eq!(b.or(&[x, -tru]), x);
        assert_eq!(b.xor(x, x), -tru);
        assert_eq!(b.xor(-x, y), -b.xor(x, y));
        assert_eq!(b.ite(tru, x, y), x);
        let g = b.and(&[x, y]);
        assert_eq!(b.and(&[y, x]), g);
    }

    #[test]
    fn test_word_arithmetic_matches_evaluator() {
        let pool = TermPool::new();
        let x = pool.bv_const("x", 6);
        let y = pool.bv_const("y", 6);
        let ops = [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div];
        for (vx, vy) in [(13, 5), (-7, 2), (-32, -1), (9, 0), (-9, 0), (31, 31), (-20, 3)] {
            let mut blaster = Blaster::new(8);
            let pin = pool.mk_and([pool.mk_eq(x, pool.mk_bv(vx, 6)), pool.mk_eq(y, pool.mk_bv(vy, 6))]);
            let model = solve_for(&pool, &mut blaster, pin).unwrap();
            for op in ops {
                let t = pool.mk_arith(op, x, y);
                let fits = pool.mk_no_overflow(op, x, y);
                let r = blaster.word(&pool, t);
                let n = blaster.lit(&pool, fits);
                let pinned = pool.mk_and([pin, pool.mk_eq(t, pool.mk_bv(model.eval_i64(&pool, t).unwrap(), 6))]);
                let l = blaster.lit(&pool, pinned);
                assert_eq!(blaster.solve(&[l], &Budget::unlimited()), SolveResult::Sat, "{:?} {} {}", op, vx, vy);
                assert_eq!(to_signed(blaster.word_value(&r), 6), model.eval_i64(&pool, t).unwrap());
                assert_eq!(blaster.value(n), model.eval_bool(&pool, fits).unwrap(), "{:?} {} {}", op, vx, vy);
            }
        }
    }

    #[test]
    fn test_solving_for_operands() {
        let pool = TermPool::new();
        let x = pool.int_const("x");
        let y = pool.int_const("y");
        let mut blaster = Blaster::new(8);
        // 3 is invertible mod 256; 100 / y truncates toward zero
        let goal = pool.mk_and([
            pool.mk_eq(pool.mk_mul(x, pool.mk_int(3)), pool.mk_int(21)),
            pool.mk_eq(pool.mk_div(pool.mk_int(100), y), pool.mk_int(-20)),
        ]);
        let model = solve_for(&pool, &mut blaster, goal).unwrap();
        assert_eq!(model.eval_i64(&pool, x).unwrap(), 7);
        assert_eq!(model.eval_i64(&pool, y).unwrap(), -5);
    }

    #[test]
    fn test_signed_comparison() {
        let pool = TermPool::new();
        let x = pool.int_const("x");
        let mut blaster = Blaster::new(8);
        // x < -100 and x > 100 is infeasible; x <= -128 pins x to the minimum
        let both = pool.mk_and([pool.mk_lt(x, pool.mk_int(-100)), pool.mk_gt(x, pool.mk_int(100))]);
        assert!(solve_for(&pool, &mut blaster, both).is_none());
        let min = pool.mk_le(x, pool.mk_int(-128));
        let model = solve_for(&pool, &mut blaster, min).unwrap();
        assert_eq!(model.eval_i64(&pool, x).unwrap(), -128);
    }

    #[test]
    fn test_arrays() {
        let pool = TermPool::new();
        let a = pool.array_const("a", 4, 8);
        let i = pool.int_const("i");
        let j = pool.int_const("j");
        let b = pool.mk_store(a, i, pool.mk_bv(42, 8));
        let goal = pool.mk_and([
            pool.mk_eq(pool.mk_select(b, j), pool.mk_bv(42, 8)),
            pool.mk_eq(pool.mk_select(a, j), pool.mk_bv(7, 8)),
            pool.mk_le(pool.mk_int(0), j),
            pool.mk_lt(j, pool.mk_int(4)),
        ]);
        let mut blaster = Blaster::new(8);
        let model = solve_for(&pool, &mut blaster, goal).unwrap();
        assert_eq!(model.eval_i64(&pool, i).unwrap(), model.eval_i64(&pool, j).unwrap());
        assert!(model.eval_bool(&pool, goal).unwrap());
    }

    #[test]
    fn test_ule_const() {
        let pool = TermPool::new();
        let x = pool.bv_const("x", 4);
        let mut blaster = Blaster::new(8);
        let w = blaster.word(&pool, x);
        let le = blaster.ule_const(&w, 3);
        let ge = pool.mk_eq(x, pool.mk_bv(12, 4));
        let g = blaster.lit(&pool, ge);
        assert_eq!(blaster.solve(&[le, g], &Budget::unlimited()), SolveResult::Unsat);
        let tru = blaster.tru;
        assert_eq!(blaster.ule_const(&w, 15), tru);
    }
}
