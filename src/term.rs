//! Hash-consed term store.
//!
//! All terms of a solving session live in one [`TermPool`]. A [`Term`] is a
//! lightweight copyable handle into the pool, so constraints never hold shared
//! mutable references and two pools can never alias each other's terms.
//!
//! The pool guarantees two kinds of identity:
//!
//! - **Name identity**: [`TermPool::get_or_create`] returns the same handle for
//!   the same name, for as long as the pool lives.
//! - **Structural identity**: building the same node twice (e.g. `(and a b)`)
//!   yields the same handle, which lets downstream caches key on handles.
//!
//! Cheap simplifications are applied on construction (constant folding of the
//! boolean connectives, `ite` with a constant condition, `select` over `store`
//! with literal indices), in the spirit of the terminal cases of `ite` in a
//! decision-diagram manager.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Display, Formatter};

use log::debug;

/// Sort of a term.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Sort {
    Bool,
    /// Mathematical integers. Backends decide them at a fixed word size.
    Int,
    /// Fixed-width bit-vector, interpreted as two's complement by the signed operations.
    BitVec(u32),
    /// Array with integer indices `0..len` and bit-vector elements.
    Array { len: u32, width: u32 },
}

impl Sort {
    /// Whether arithmetic and comparisons apply to this sort.
    pub fn is_word(self) -> bool {
        matches!(self, Sort::Int | Sort::BitVec(_))
    }
}

impl Display for Sort {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {})", w),
            Sort::Array { len, width } => write!(f, "(Array[{}] Int (_ BitVec {}))", len, width),
        }
    }
}

/// Handle to a term inside a [`TermPool`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Term(u32);

impl Term {
    /// Position of the term in its pool.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Binary arithmetic operators. Division is signed and truncates toward zero.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// Structure of a term.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Node {
    Bool(bool),
    Int(i64),
    /// Bit-vector literal; `bits` holds the low `width` bits.
    BitVec { width: u32, bits: u64 },
    /// Uninterpreted constant, declared through [`TermPool::get_or_create`].
    Const(String),
    Not(Term),
    And(Vec<Term>),
    Or(Vec<Term>),
    Ite(Term, Term, Term),
    Eq(Term, Term),
    Arith(ArithOp, Term, Term),
    Neg(Term),
    /// Signed `<=`.
    Le(Term, Term),
    /// Signed `<`.
    Lt(Term, Term),
    SignExtend(Term, u32),
    /// True iff the signed operation does not leave the operands' range.
    NoOverflow(ArithOp, Term, Term),
    Select(Term, Term),
    Store(Term, Term, Term),
}

impl Node {
    /// Direct subterms, in order.
    pub fn children(&self) -> Vec<Term> {
        match self {
            Node::Bool(_) | Node::Int(_) | Node::BitVec { .. } | Node::Const(_) => vec![],
            Node::Not(a) | Node::Neg(a) | Node::SignExtend(a, _) => vec![*a],
            Node::And(xs) | Node::Or(xs) => xs.clone(),
            Node::Eq(a, b)
            | Node::Arith(_, a, b)
            | Node::Le(a, b)
            | Node::Lt(a, b)
            | Node::NoOverflow(_, a, b)
            | Node::Select(a, b) => vec![*a, *b],
            Node::Ite(a, b, c) | Node::Store(a, b, c) => vec![*a, *b, *c],
        }
    }

    /// Whether the node is a literal value.
    pub fn is_value(&self) -> bool {
        matches!(self, Node::Bool(_) | Node::Int(_) | Node::BitVec { .. })
    }
}

/// Mask selecting the low `width` bits.
pub(crate) fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[derive(Default)]
struct Storage {
    nodes: Vec<Node>,
    sorts: Vec<Sort>,
    unique: HashMap<Node, Term>,
    names: HashMap<String, Term>,
}

/// Session-owned arena of terms.
pub struct TermPool {
    storage: RefCell<Storage>,
}

impl Default for TermPool {
    fn default() -> Self {
        TermPool::new()
    }
}

impl Debug for TermPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("TermPool")
            .field("size", &storage.nodes.len())
            .field("names", &storage.names.len())
            .finish()
    }
}

impl TermPool {
    pub fn new() -> Self {
        Self {
            storage: RefCell::new(Storage::default()),
        }
    }

    /// Number of distinct terms in the pool.
    pub fn len(&self) -> usize {
        self.storage.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, term: Term) -> Node {
        self.storage.borrow().nodes[term.index()].clone()
    }

    pub fn sort(&self, term: Term) -> Sort {
        self.storage.borrow().sorts[term.index()]
    }

    /// Name of a declared constant.
    pub fn name(&self, term: Term) -> Option<String> {
        match &self.storage.borrow().nodes[term.index()] {
            Node::Const(name) => Some(name.clone()),
            _ => None,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Term> {
        self.storage.borrow().names.get(name).copied()
    }

    fn intern(&self, node: Node, sort: Sort) -> Term {
        let mut storage = self.storage.borrow_mut();
        if let Some(&term) = storage.unique.get(&node) {
            return term;
        }
        let term = Term(storage.nodes.len() as u32);
        storage.nodes.push(node.clone());
        storage.sorts.push(sort);
        storage.unique.insert(node, term);
        term
    }

    /// Returns the constant called `name`, declaring it with `sort` on first use.
    ///
    /// # Panics
    ///
    /// Panics if `name` was already declared with a different sort.
    pub fn get_or_create(&self, name: &str, sort: Sort) -> Term {
        if let Some(term) = self.lookup(name) {
            let existing = self.sort(term);
            assert_eq!(existing, sort, "`{}` is already declared with sort {}", name, existing);
            return term;
        }
        match sort {
            Sort::BitVec(w) => assert!((1..=64).contains(&w), "bit-vector width must be in 1..=64"),
            Sort::Array { len, width } => {
                assert!(len > 0, "arrays must have at least one element");
                assert!((1..=64).contains(&width), "bit-vector width must be in 1..=64");
            }
            Sort::Bool | Sort::Int => {}
        }
        debug!("declare {} : {}", name, sort);
        let term = self.intern(Node::Const(name.to_string()), sort);
        self.storage.borrow_mut().names.insert(name.to_string(), term);
        term
    }

    pub fn bool_const(&self, name: &str) -> Term {
        self.get_or_create(name, Sort::Bool)
    }

    pub fn int_const(&self, name: &str) -> Term {
        self.get_or_create(name, Sort::Int)
    }

    pub fn bv_const(&self, name: &str, width: u32) -> Term {
        self.get_or_create(name, Sort::BitVec(width))
    }

    pub fn array_const(&self, name: &str, len: u32, width: u32) -> Term {
        self.get_or_create(name, Sort::Array { len, width })
    }

    /// All declared constants reachable from `roots`, in creation order.
    pub fn constants(&self, roots: &[Term]) -> Vec<Term> {
        let mut visited = HashSet::new();
        let mut stack: Vec<Term> = roots.to_vec();
        let mut found = Vec::new();
        while let Some(t) = stack.pop() {
            if !visited.insert(t) {
                continue;
            }
            let node = self.node(t);
            if let Node::Const(_) = node {
                found.push(t);
            }
            stack.extend(node.children());
        }
        found.sort();
        found
    }
}

// Literals
impl TermPool {
    pub fn mk_bool(&self, value: bool) -> Term {
        self.intern(Node::Bool(value), Sort::Bool)
    }

    pub fn mk_true(&self) -> Term {
        self.mk_bool(true)
    }

    pub fn mk_false(&self) -> Term {
        self.mk_bool(false)
    }

    pub fn mk_int(&self, value: i64) -> Term {
        self.intern(Node::Int(value), Sort::Int)
    }

    /// Bit-vector literal of the given width; `value` is truncated to two's complement.
    pub fn mk_bv(&self, value: i64, width: u32) -> Term {
        assert!((1..=64).contains(&width), "bit-vector width must be in 1..=64");
        let bits = (value as u64) & mask(width);
        self.intern(Node::BitVec { width, bits }, Sort::BitVec(width))
    }

    /// The zero literal of a word sort.
    pub fn mk_zero(&self, sort: Sort) -> Term {
        match sort {
            Sort::Int => self.mk_int(0),
            Sort::BitVec(w) => self.mk_bv(0, w),
            _ => panic!("no zero literal for sort {}", sort),
        }
    }

    /// Literal value of a boolean term, if it is one.
    pub fn as_bool(&self, term: Term) -> Option<bool> {
        match self.node(term) {
            Node::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Literal value of an integer term, if it is one.
    pub fn as_int(&self, term: Term) -> Option<i64> {
        match self.node(term) {
            Node::Int(v) => Some(v),
            _ => None,
        }
    }

    fn is_value(&self, term: Term) -> bool {
        self.storage.borrow().nodes[term.index()].is_value()
    }
}

// Boolean connectives
impl TermPool {
    fn assert_bool(&self, term: Term) {
        let sort = self.sort(term);
        assert_eq!(sort, Sort::Bool, "expected a Bool term, got {} of sort {}", term, sort);
    }

    pub fn mk_not(&self, a: Term) -> Term {
        self.assert_bool(a);
        match self.node(a) {
            Node::Bool(b) => self.mk_bool(!b),
            Node::Not(x) => x,
            _ => self.intern(Node::Not(a), Sort::Bool),
        }
    }

    /// Shared flattening for `and`/`or`: `absorbing` short-circuits, `neutral` is dropped.
    fn mk_nary(&self, terms: impl IntoIterator<Item = Term>, absorbing: bool) -> Result<Vec<Term>, Term> {
        let mut args = Vec::new();
        for t in terms {
            self.assert_bool(t);
            match self.as_bool(t) {
                Some(b) if b == absorbing => return Err(t),
                Some(_) => {}
                None => args.push(t),
            }
        }
        args.sort();
        args.dedup();
        Ok(args)
    }

    pub fn mk_and(&self, terms: impl IntoIterator<Item = Term>) -> Term {
        match self.mk_nary(terms, false) {
            Err(zero) => zero,
            Ok(args) => match args.len() {
                0 => self.mk_true(),
                1 => args[0],
                _ => self.intern(Node::And(args), Sort::Bool),
            },
        }
    }

    pub fn mk_or(&self, terms: impl IntoIterator<Item = Term>) -> Term {
        match self.mk_nary(terms, true) {
            Err(one) => one,
            Ok(args) => match args.len() {
                0 => self.mk_false(),
                1 => args[0],
                _ => self.intern(Node::Or(args), Sort::Bool),
            },
        }
    }

    pub fn mk_implies(&self, a: Term, b: Term) -> Term {
        let not_a = self.mk_not(a);
        self.mk_or([not_a, b])
    }

    pub fn mk_ite(&self, cond: Term, then: Term, else_: Term) -> Term {
        self.assert_bool(cond);
        let sort = self.sort(then);
        assert_eq!(sort, self.sort(else_), "ite branches must have the same sort");
        if let Some(c) = self.as_bool(cond) {
            return if c { then } else { else_ };
        }
        if then == else_ {
            return then;
        }
        if sort == Sort::Bool {
            match (self.as_bool(then), self.as_bool(else_)) {
                (Some(true), Some(false)) => return cond,
                (Some(false), Some(true)) => return self.mk_not(cond),
                _ => {}
            }
        }
        self.intern(Node::Ite(cond, then, else_), sort)
    }

    pub fn mk_eq(&self, a: Term, b: Term) -> Term {
        let sort = self.sort(a);
        assert_eq!(sort, self.sort(b), "cannot compare terms of different sorts");
        if a == b {
            return self.mk_true();
        }
        // Literals are hash-consed, so distinct handles mean distinct values.
        if self.is_value(a) && self.is_value(b) {
            return self.mk_false();
        }
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.intern(Node::Eq(a, b), Sort::Bool)
    }
}

// Arithmetic
impl TermPool {
    fn word_sort(&self, a: Term, b: Term) -> Sort {
        let sort = self.sort(a);
        assert!(sort.is_word(), "arithmetic on non-word sort {}", sort);
        assert_eq!(sort, self.sort(b), "operands must have the same sort");
        sort
    }

    pub fn mk_arith(&self, op: ArithOp, a: Term, b: Term) -> Term {
        let sort = self.word_sort(a, b);
        self.intern(Node::Arith(op, a, b), sort)
    }

    pub fn mk_add(&self, a: Term, b: Term) -> Term {
        self.mk_arith(ArithOp::Add, a, b)
    }

    pub fn mk_sub(&self, a: Term, b: Term) -> Term {
        self.mk_arith(ArithOp::Sub, a, b)
    }

    pub fn mk_mul(&self, a: Term, b: Term) -> Term {
        self.mk_arith(ArithOp::Mul, a, b)
    }

    pub fn mk_div(&self, a: Term, b: Term) -> Term {
        self.mk_arith(ArithOp::Div, a, b)
    }

    pub fn mk_neg(&self, a: Term) -> Term {
        let sort = self.sort(a);
        assert!(sort.is_word(), "negation of non-word sort {}", sort);
        self.intern(Node::Neg(a), sort)
    }

    pub fn mk_le(&self, a: Term, b: Term) -> Term {
        self.word_sort(a, b);
        if a == b {
            return self.mk_true();
        }
        self.intern(Node::Le(a, b), Sort::Bool)
    }

    pub fn mk_lt(&self, a: Term, b: Term) -> Term {
        self.word_sort(a, b);
        if a == b {
            return self.mk_false();
        }
        self.intern(Node::Lt(a, b), Sort::Bool)
    }

    pub fn mk_ge(&self, a: Term, b: Term) -> Term {
        self.mk_le(b, a)
    }

    pub fn mk_gt(&self, a: Term, b: Term) -> Term {
        self.mk_lt(b, a)
    }

    /// Absolute value, as `ite(a < 0, -a, a)`.
    pub fn mk_abs(&self, a: Term) -> Term {
        let zero = self.mk_zero(self.sort(a));
        let negative = self.mk_lt(a, zero);
        let negated = self.mk_neg(a);
        self.mk_ite(negative, negated, a)
    }

    pub fn mk_sign_extend(&self, a: Term, extra: u32) -> Term {
        let Sort::BitVec(width) = self.sort(a) else {
            panic!("sign extension of non bit-vector term {}", a);
        };
        if extra == 0 {
            return a;
        }
        assert!(width + extra <= 64, "bit-vector width must be in 1..=64");
        self.intern(Node::SignExtend(a, extra), Sort::BitVec(width + extra))
    }

    /// Signed no-overflow predicate of `a op b`.
    pub fn mk_no_overflow(&self, op: ArithOp, a: Term, b: Term) -> Term {
        let sort = self.word_sort(a, b);
        assert!(matches!(sort, Sort::BitVec(_)), "overflow predicates apply to bit-vectors only");
        self.intern(Node::NoOverflow(op, a, b), Sort::Bool)
    }
}

// Arrays
impl TermPool {
    pub fn mk_select(&self, array: Term, index: Term) -> Term {
        let Sort::Array { width, .. } = self.sort(array) else {
            panic!("select from non-array term {}", array);
        };
        assert_eq!(self.sort(index), Sort::Int, "array indices are integers");
        if let Node::Store(inner, i, v) = self.node(array) {
            if let (Some(i), Some(j)) = (self.as_int(i), self.as_int(index)) {
                return if i == j { v } else { self.mk_select(inner, index) };
            }
        }
        self.intern(Node::Select(array, index), Sort::BitVec(width))
    }

    pub fn mk_store(&self, array: Term, index: Term, value: Term) -> Term {
        let sort = self.sort(array);
        let Sort::Array { width, .. } = sort else {
            panic!("store into non-array term {}", array);
        };
        assert_eq!(self.sort(index), Sort::Int, "array indices are integers");
        assert_eq!(self.sort(value), Sort::BitVec(width), "stored value must match the element sort");
        self.intern(Node::Store(array, index, value), sort)
    }
}

// Rendering
impl TermPool {
    /// Renders a term as an SMT-LIB style S-expression.
    pub fn to_sexpr(&self, term: Term) -> String {
        let mut out = String::new();
        self.write_sexpr(term, &mut out);
        out
    }

    fn write_sexpr(&self, term: Term, out: &mut String) {
        use std::fmt::Write;

        let node = self.node(term);
        let head = match &node {
            Node::Bool(b) => {
                let _ = write!(out, "{}", b);
                return;
            }
            Node::Int(v) => {
                let _ = write!(out, "{}", v);
                return;
            }
            Node::BitVec { width, bits } => {
                let _ = write!(out, "(_ bv{} {})", bits, width);
                return;
            }
            Node::Const(name) => {
                out.push_str(name);
                return;
            }
            Node::Not(_) => "not".to_string(),
            Node::And(_) => "and".to_string(),
            Node::Or(_) => "or".to_string(),
            Node::Ite(..) => "ite".to_string(),
            Node::Eq(..) => "=".to_string(),
            Node::Arith(op, ..) => op.symbol().to_string(),
            Node::Neg(_) => "neg".to_string(),
            Node::Le(..) => "<=".to_string(),
            Node::Lt(..) => "<".to_string(),
            Node::SignExtend(_, extra) => format!("(_ sign_extend {})", extra),
            Node::NoOverflow(op, ..) => format!("no_overflow{}", op.symbol()),
            Node::Select(..) => "select".to_string(),
            Node::Store(..) => "store".to_string(),
        };
        out.push('(');
        out.push_str(&head);
        for child in node.children() {
            out.push(' ');
            self.write_sexpr(child, out);
        }
        out.push(')');
    }
}
