//! Models and concrete evaluation.
//!
//! A [`Model`] assigns a [`Value`] to every declared constant the oracle saw,
//! and evaluates any other term of the same pool from those values. Integers are
//! evaluated as two's-complement words of the model's `int_width`, matching how
//! the bit-blasting backend decides them.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use crate::error::{Error, Result};
use crate::term::{mask, ArithOp, Node, Sort, Term, TermPool};

/// Concrete value of a term.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Value {
    Bool(bool),
    Int(i64),
    BitVec { width: u32, bits: u64 },
    Array(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view: integers as-is, bit-vectors as signed two's complement.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::BitVec { width, bits } => Some(to_signed(*bits, *width)),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Builds a bit-vector value from a signed integer, truncating to `width`.
    pub fn bitvec(value: i64, width: u32) -> Self {
        Value::BitVec {
            width,
            bits: (value as u64) & mask(width),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::BitVec { width, bits } => write!(f, "{}", to_signed(*bits, *width)),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Signed reading of the low `width` bits of `bits`.
pub(crate) fn to_signed(bits: u64, width: u32) -> i64 {
    if width >= 64 {
        bits as i64
    } else {
        let shift = 64 - width;
        ((bits << shift) as i64) >> shift
    }
}

/// Wraps an exact result into a signed `width`-bit word.
fn wrap(value: i128, width: u32) -> i64 {
    to_signed((value as u64) & mask(width), width)
}

fn fits(value: i128, width: u32) -> bool {
    let max = (1i128 << (width - 1)) - 1;
    let min = -(1i128 << (width - 1));
    (min..=max).contains(&value)
}

/// Signed division truncating toward zero, with the bit-vector convention for a
/// zero divisor (`-1` for a non-negative dividend, `1` otherwise).
fn signed_div(a: i64, b: i64, width: u32) -> i64 {
    if b == 0 {
        if a < 0 {
            1
        } else {
            wrap(-1, width)
        }
    } else {
        wrap(a as i128 / b as i128, width)
    }
}

fn arith(op: ArithOp, a: i64, b: i64, width: u32) -> i64 {
    let (a, b) = (a as i128, b as i128);
    match op {
        ArithOp::Add => wrap(a + b, width),
        ArithOp::Sub => wrap(a - b, width),
        ArithOp::Mul => wrap(a * b, width),
        ArithOp::Div => signed_div(a as i64, b as i64, width),
    }
}

fn no_overflow(op: ArithOp, a: i64, b: i64, width: u32) -> bool {
    let (a, b) = (a as i128, b as i128);
    match op {
        ArithOp::Add => fits(a + b, width),
        ArithOp::Sub => fits(a - b, width),
        ArithOp::Mul => fits(a * b, width),
        ArithOp::Div => b == 0 || fits(a / b, width),
    }
}

/// Satisfying assignment returned by an oracle.
#[derive(Debug, Clone)]
pub struct Model {
    values: HashMap<Term, Value>,
    int_width: u32,
}

impl Model {
    pub fn new(int_width: u32) -> Self {
        assert!((2..=64).contains(&int_width), "integer width must be in 2..=64");
        Self {
            values: HashMap::new(),
            int_width,
        }
    }

    pub fn insert(&mut self, constant: Term, value: Value) {
        self.values.insert(constant, value);
    }

    /// Interpretation of a declared constant, if the model has one.
    pub fn get(&self, constant: Term) -> Option<&Value> {
        self.values.get(&constant)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn int_width(&self) -> u32 {
        self.int_width
    }

    /// Evaluates `term` under this model.
    ///
    /// Fails with [`Error::MissingInterpretation`] if the term depends on a
    /// constant the model does not interpret.
    pub fn eval(&self, pool: &TermPool, term: Term) -> Result<Value> {
        let mut cache = HashMap::new();
        self.eval_cached(pool, term, &mut cache)
    }

    pub fn eval_bool(&self, pool: &TermPool, term: Term) -> Result<bool> {
        let value = self.eval(pool, term)?;
        value.as_bool().ok_or_else(|| ill_sorted(pool, term))
    }

    pub fn eval_i64(&self, pool: &TermPool, term: Term) -> Result<i64> {
        let value = self.eval(pool, term)?;
        value.as_i64().ok_or_else(|| ill_sorted(pool, term))
    }

    fn width_of(&self, sort: Sort) -> u32 {
        match sort {
            Sort::Int => self.int_width,
            Sort::BitVec(w) => w,
            _ => unreachable!("word width of sort {}", sort),
        }
    }

    fn word(&self, sort: Sort, value: i64) -> Value {
        match sort {
            Sort::Int => Value::Int(wrap(value as i128, self.int_width)),
            Sort::BitVec(w) => Value::bitvec(value, w),
            _ => unreachable!("word value of sort {}", sort),
        }
    }

    fn eval_cached(&self, pool: &TermPool, term: Term, cache: &mut HashMap<Term, Value>) -> Result<Value> {
        if let Some(v) = cache.get(&term) {
            return Ok(v.clone());
        }
        let sort = pool.sort(term);
        let node = pool.node(term);
        let value = match node {
            Node::Bool(b) => Value::Bool(b),
            Node::Int(v) => Value::Int(wrap(v as i128, self.int_width)),
            Node::BitVec { width, bits } => Value::BitVec { width, bits },
            Node::Const(name) => self
                .values
                .get(&term)
                .cloned()
                .ok_or(Error::MissingInterpretation(name))?,
            Node::Not(a) => Value::Bool(!self.bool_of(pool, a, cache)?),
            Node::And(xs) => {
                let mut result = true;
                for x in xs {
                    result &= self.bool_of(pool, x, cache)?;
                }
                Value::Bool(result)
            }
            Node::Or(xs) => {
                let mut result = false;
                for x in xs {
                    result |= self.bool_of(pool, x, cache)?;
                }
                Value::Bool(result)
            }
            Node::Ite(c, t, e) => {
                if self.bool_of(pool, c, cache)? {
                    self.eval_cached(pool, t, cache)?
                } else {
                    self.eval_cached(pool, e, cache)?
                }
            }
            Node::Eq(a, b) => {
                let a = self.eval_cached(pool, a, cache)?;
                let b = self.eval_cached(pool, b, cache)?;
                Value::Bool(a == b)
            }
            Node::Arith(op, a, b) => {
                let width = self.width_of(sort);
                let a = self.int_of(pool, a, cache)?;
                let b = self.int_of(pool, b, cache)?;
                self.word(sort, arith(op, a, b, width))
            }
            Node::Neg(a) => {
                let a = self.int_of(pool, a, cache)?;
                self.word(sort, wrap(-(a as i128), self.width_of(sort)))
            }
            Node::Le(a, b) => Value::Bool(self.int_of(pool, a, cache)? <= self.int_of(pool, b, cache)?),
            Node::Lt(a, b) => Value::Bool(self.int_of(pool, a, cache)? < self.int_of(pool, b, cache)?),
            Node::SignExtend(a, _) => {
                let a = self.int_of(pool, a, cache)?;
                self.word(sort, a)
            }
            Node::NoOverflow(op, a, b) => {
                let width = self.width_of(pool.sort(a));
                let a = self.int_of(pool, a, cache)?;
                let b = self.int_of(pool, b, cache)?;
                Value::Bool(no_overflow(op, a, b, width))
            }
            Node::Select(array, index) => {
                let Sort::BitVec(width) = sort else { unreachable!() };
                let items = self.eval_cached(pool, array, cache)?;
                let index = self.int_of(pool, index, cache)?;
                let items = items.as_array().ok_or_else(|| ill_sorted(pool, array))?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::bitvec(0, width))
            }
            Node::Store(array, index, v) => {
                let items = self.eval_cached(pool, array, cache)?;
                let index = self.int_of(pool, index, cache)?;
                let v = self.eval_cached(pool, v, cache)?;
                let Value::Array(mut items) = items else {
                    return Err(ill_sorted(pool, array));
                };
                if let Some(slot) = usize::try_from(index).ok().and_then(|i| items.get_mut(i)) {
                    *slot = v;
                }
                Value::Array(items)
            }
        };
        cache.insert(term, value.clone());
        Ok(value)
    }

    fn bool_of(&self, pool: &TermPool, term: Term, cache: &mut HashMap<Term, Value>) -> Result<bool> {
        self.eval_cached(pool, term, cache)?
            .as_bool()
            .ok_or_else(|| ill_sorted(pool, term))
    }

    fn int_of(&self, pool: &TermPool, term: Term, cache: &mut HashMap<Term, Value>) -> Result<i64> {
        self.eval_cached(pool, term, cache)?
            .as_i64()
            .ok_or_else(|| ill_sorted(pool, term))
    }
}

fn ill_sorted(pool: &TermPool, term: Term) -> Error {
    Error::MissingInterpretation(pool.to_sexpr(term))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_signed_helpers() {
        assert_eq!(to_signed(0xFF, 8), -1);
        assert_eq!(to_signed(0x7F, 8), 127);
        assert_eq!(wrap(128, 8), -128);
        assert_eq!(signed_div(-7, 2, 8), -3);
        assert_eq!(signed_div(5, 0, 8), -1);
        assert_eq!(signed_div(-5, 0, 8), 1);
        assert_eq!(signed_div(-128, -1, 8), -128);
        assert!(no_overflow(ArithOp::Add, 100, 27, 8));
        assert!(!no_overflow(ArithOp::Add, 100, 28, 8));
        assert!(!no_overflow(ArithOp::Mul, 16, 8, 8));
        assert!(!no_overflow(ArithOp::Div, -128, -1, 8));
    }

    #[test]
    fn test_eval_terms() {
        let pool = TermPool::new();
        let x = pool.bv_const("x", 8);
        let y = pool.bv_const("y", 8);
        let mut model = Model::new(16);
        model.insert(x, Value::bitvec(100, 8));
        model.insert(y, Value::bitvec(50, 8));

        let sum = pool.mk_add(x, y);
        assert_eq!(model.eval_i64(&pool, sum).unwrap(), -106);
        let fits = pool.mk_no_overflow(ArithOp::Add, x, y);
        assert!(!model.eval_bool(&pool, fits).unwrap());
        let wide = pool.mk_add(pool.mk_sign_extend(x, 1), pool.mk_sign_extend(y, 1));
        assert_eq!(model.eval_i64(&pool, wide).unwrap(), 150);
    }

    #[test]
    fn test_eval_arrays() {
        let pool = TermPool::new();
        let a = pool.array_const("a", 3, 8);
        let i = pool.int_const("i");
        let mut model = Model::new(16);
        model.insert(
            a,
            Value::Array(vec![Value::bitvec(1, 8), Value::bitvec(2, 8), Value::bitvec(3, 8)]),
        );
        model.insert(i, Value::Int(1));

        let stored = pool.mk_store(a, i, pool.mk_bv(9, 8));
        assert_eq!(model.eval(&pool, stored).unwrap().to_string(), "[1, 9, 3]");
        assert_eq!(model.eval_i64(&pool, pool.mk_select(a, i)).unwrap(), 2);
        let out_of_range = pool.mk_select(a, pool.mk_int(5));
        assert_eq!(model.eval_i64(&pool, out_of_range).unwrap(), 0);
    }

    #[test]
    fn test_missing_interpretation() {
        let pool = TermPool::new();
        let x = pool.bool_const("x");
        let model = Model::new(16);
        match model.eval(&pool, x) {
            Err(Error::MissingInterpretation(name)) => assert_eq!(name, "x"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
