//! Type-safe wrappers for SAT variables and literals.
//!
//! These are the currency of the [`sat`][crate::sat] and [`blast`][crate::blast]
//! layers. Variables are 0-indexed internally; the [`Lit::to_dimacs`] view shifts
//! them by one so that literals print the way DIMACS files spell them.
use std::fmt;
use std::ops::Neg;

/// A propositional variable (0-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a variable with the given index.
    pub const fn new(index: u32) -> Self {
        Var(index)
    }

    /// Returns the index of the variable as a `usize`, suitable for indexing
    /// per-variable tables.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Positive literal of this variable.
    pub const fn pos(self) -> Lit {
        Lit::new(self, false)
    }

    /// Negative literal of this variable.
    pub const fn neg(self) -> Lit {
        Lit::new(self, true)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0 + 1)
    }
}

/// A literal: a variable together with a polarity.
///
/// The encoding is `2 * var + negated`, so that a literal and its negation are
/// adjacent and [`Lit::code`] can index watch lists directly.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(u32);

impl Lit {
    pub const fn new(var: Var, negated: bool) -> Self {
        Lit((var.0 << 1) | negated as u32)
    }

    pub const fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    pub const fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    /// Dense code of the literal (`2 * var + negated`).
    pub const fn code(self) -> usize {
        self.0 as usize
    }

    /// Signed 1-based representation, as used by DIMACS.
    pub fn to_dimacs(self) -> i32 {
        let v = (self.0 >> 1) as i32 + 1;
        if self.is_negated() {
            -v
        } else {
            v
        }
    }

    /// Inverse of [`Lit::to_dimacs`].
    ///
    /// # Panics
    ///
    /// Panics if `value == 0`.
    pub fn from_dimacs(value: i32) -> Self {
        assert_ne!(value, 0, "DIMACS literals must be non-zero");
        let var = Var(value.unsigned_abs() - 1);
        Lit::new(var, value < 0)
    }
}

impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_encoding() {
        let x = Var::new(3);
        assert_eq!(x.pos().var(), x);
        assert_eq!(x.neg().var(), x);
        assert!(!x.pos().is_negated());
        assert!(x.neg().is_negated());
        assert_eq!(-x.pos(), x.neg());
        assert_eq!(-(-x.neg()), x.neg());
        assert_eq!(x.pos().code() ^ 1, x.neg().code());
    }

    #[test]
    fn test_dimacs() {
        assert_eq!(Var::new(0).pos().to_dimacs(), 1);
        assert_eq!(Var::new(0).neg().to_dimacs(), -1);
        assert_eq!(Lit::from_dimacs(-5), Var::new(4).neg());
        assert_eq!(Lit::from_dimacs(7).to_string(), "7");
    }

    #[test]
    #[should_panic(expected = "DIMACS literals must be non-zero")]
    fn test_dimacs_zero_panics() {
        Lit::from_dimacs(0);
    }
}
