//! Interface of the decision procedure.
//!
//! Encoders and drivers only talk to an oracle through these traits, so any
//! implementation (the bit-blasting [`SatOracle`][crate::solver::SatOracle], or a
//! brute-force double in tests) can back them.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::constraints::ConstraintSet;
use crate::model::Model;
use crate::term::{Term, TermPool};

/// Answer of a satisfiability check.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Status {
    Satisfiable,
    Unsatisfiable,
    /// The oracle gave up (timeout, resource limit). Never coerced to either answer.
    Unknown,
}

impl Status {
    pub fn is_sat(self) -> bool {
        self == Status::Satisfiable
    }

    pub fn is_unsat(self) -> bool {
        self == Status::Unsatisfiable
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Status::Satisfiable => write!(f, "SATISFIABLE"),
            Status::Unsatisfiable => write!(f, "UNSATISFIABLE"),
            Status::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Incremental satisfiability oracle.
///
/// Constants are declared implicitly by the first assertion mentioning them.
pub trait Oracle {
    fn assert(&mut self, pool: &TermPool, term: Term);

    fn assert_all(&mut self, pool: &TermPool, set: &ConstraintSet) {
        for &term in set.iter() {
            self.assert(pool, term);
        }
    }

    /// Opens a scope. Assertions made inside it are retracted by the matching [`Oracle::pop`].
    fn push(&mut self);

    /// Closes the innermost scope.
    ///
    /// # Panics
    ///
    /// Panics if no scope is open.
    fn pop(&mut self);

    fn check(&mut self, pool: &TermPool, timeout: Option<Duration>) -> Status;

    /// Model of the last check, available only if it returned [`Status::Satisfiable`].
    fn model(&self) -> Option<&Model>;
}

/// Non-incremental minimisation oracle.
pub trait Optimizer {
    fn assert(&mut self, pool: &TermPool, term: Term);

    fn assert_all(&mut self, pool: &TermPool, set: &ConstraintSet) {
        for &term in set.iter() {
            self.assert(pool, term);
        }
    }

    /// Registers a bit-vector objective to minimise, read as unsigned.
    fn minimize(&mut self, pool: &TermPool, criterion: Term);

    /// Decides the assertions and, when satisfiable, minimises the objective.
    fn check(&mut self, pool: &TermPool, timeout: Option<Duration>) -> Status;

    fn model(&self) -> Option<&Model>;

    /// Optimal objective value found by the last satisfiable check.
    fn objective(&self) -> Option<u64>;
}

/// Factory of fresh solving sessions.
pub trait Backend {
    type Oracle: Oracle;
    type Optimizer: Optimizer;

    fn oracle(&self) -> Self::Oracle;

    fn optimizer(&self) -> Self::Optimizer;
}
