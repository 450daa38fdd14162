//! # smt-puzzles: combinatorial puzzles as constraint problems
//!
//! **`smt-puzzles`** compiles small combinatorial puzzles into quantifier-free
//! formulas over booleans, fixed-width integers and bounded arrays, and drives an
//! incremental solver over them.
//!
//! ## Layers
//!
//! - **Terms**: a hash-consing [`TermPool`][crate::term::TermPool] hands out copyable
//!   [`Term`][crate::term::Term] handles. All construction goes through the pool.
//! - **Oracles**: the [`Oracle`][crate::oracle::Oracle] and
//!   [`Optimizer`][crate::oracle::Optimizer] traits are the only surface the encoders
//!   talk to. The bundled backend bit-blasts terms ([`blast`]) into a CDCL solver ([`sat`]).
//! - **Encoders**:
//!   - [`sudoku`]: generalised `n² × n²` Sudoku, boolean or integer cell encoding,
//!     with solution enumeration.
//!   - [`stack_machine`]: reach a target value by pushing numbers and applying
//!     arithmetic on a bounded stack, with a closest-result fallback.
//!   - [`swaps`]: sort an array with exactly three swaps.
//! - **Search**: [`bmc`] unrolls any [`TransitionSystem`][crate::bmc::TransitionSystem]
//!   step by step.
//!
//! ## Basic Usage
//!
//! ```rust
//! use smt_puzzles::oracle::{Oracle, Status};
//! use smt_puzzles::solver::SatOracle;
//! use smt_puzzles::term::TermPool;
//!
//! let pool = TermPool::new();
//! let x = pool.bv_const("x", 8);
//! let y = pool.bv_const("y", 8);
//!
//! // x + y = 10, x > y > 2
//! let mut oracle = SatOracle::default();
//! oracle.assert(&pool, pool.mk_eq(pool.mk_add(x, y), pool.mk_bv(10, 8)));
//! oracle.assert(&pool, pool.mk_gt(x, y));
//! oracle.assert(&pool, pool.mk_gt(y, pool.mk_bv(2, 8)));
//! assert_eq!(oracle.check(&pool, None), Status::Satisfiable);
//!
//! let model = oracle.model().unwrap();
//! let (x, y) = (model.eval_i64(&pool, x).unwrap(), model.eval_i64(&pool, y).unwrap());
//! assert_eq!(x + y, 10);
//! assert!(x > y && y > 2);
//! ```

pub mod blast;
pub mod bmc;
pub mod constraints;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod oracle;
pub mod parse;
pub mod sat;
pub mod solver;
pub mod stack_machine;
pub mod sudoku;
pub mod swaps;
pub mod term;
pub mod types;

pub use error::{Error, Result};
