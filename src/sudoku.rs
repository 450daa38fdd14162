//! Sudoku grids as constraint systems.
//!
//! A puzzle of block size `n` has a `w × w` grid with `w = n²`. Two encodings are
//! available, selected by [`GridEncoding`]:
//!
//! - [`GridEncoding::Boolean`]: one boolean `i_j_v` per cell and candidate value
//!   (`v` is 1-based), with exactly one of them true per cell.
//! - [`GridEncoding::Integer`]: one integer `i_j` per cell holding the 0-based value.
//!
//! Both share the row, column and block families, built over the proposition
//! "cell `(i, j)` holds value `v`". Rows and columns get a disjunction plus
//! pairwise exclusion; blocks only get the disjunction.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

use crate::constraints::{at_least_one, at_most_one, exactly_one, ConstraintSet};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::oracle::{Oracle, Status};
use crate::parse::Puzzle;
use crate::solver::{SatOracle, SolverConfig};
use crate::term::{Term, TermPool};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum GridEncoding {
    #[default]
    Boolean,
    Integer,
}

#[derive(Debug, Clone, Default)]
pub struct SudokuConfig {
    pub encoding: GridEncoding,
    pub timeout: Option<Duration>,
    /// Trace every emitted constraint.
    pub verbose: bool,
}

/// A solved grid, values 1-based.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Grid {
    width: usize,
    cells: Vec<u32>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Self {
        let width = rows.len();
        assert!(rows.iter().all(|r| r.len() == width), "grid must be square");
        Self {
            width,
            cells: rows.into_iter().flatten().collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row * self.width + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.cells.chunks(self.width)
    }

    /// Checks the Sudoku rules for block size `block`.
    pub fn is_valid(&self, block: usize) -> bool {
        let w = self.width;
        if block * block != w {
            return false;
        }
        (0..w).all(|i| all_distinct(w, (0..w).map(|j| self.get(i, j))))
            && (0..w).all(|j| all_distinct(w, (0..w).map(|i| self.get(i, j))))
            && (0..w).all(|b| {
                let (bi, bj) = (b / block * block, b % block * block);
                all_distinct(w, (0..w).map(|k| self.get(bi + k / block, bj + k % block)))
            })
    }
}

/// Whether `cells` is a permutation of `1..=width`.
fn all_distinct(width: usize, cells: impl Iterator<Item = u32>) -> bool {
    let mut seen = vec![false; width + 1];
    let mut count = 0;
    for v in cells {
        let v = v as usize;
        if v == 0 || v > width || seen[v] {
            return false;
        }
        seen[v] = true;
        count += 1;
    }
    count == width
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// A Sudoku solving session.
pub struct Sudoku<O: Oracle = SatOracle> {
    block: usize,
    width: usize,
    encoding: GridEncoding,
    timeout: Option<Duration>,
    pool: TermPool,
    oracle: O,
    /// `Boolean`: `w³` propositions indexed by `(i, j, v)`; `Integer`: `w²` cells.
    cells: Vec<Term>,
    givens: HashSet<(usize, usize)>,
    diagnostics: Diagnostics,
}

/// Bits needed to hold `0..width` as a signed integer.
fn int_width_for(width: usize) -> u32 {
    (usize::BITS - width.leading_zeros() + 1).max(2)
}

impl Sudoku<SatOracle> {
    pub fn new(block: usize, config: SudokuConfig) -> Result<Self> {
        let oracle = SatOracle::new(SolverConfig {
            int_width: int_width_for(block * block),
            timeout: config.timeout,
            conflict_limit: None,
        });
        Self::with_oracle(block, config, oracle)
    }

    /// Builds the session for a parsed puzzle and pins its givens.
    pub fn from_puzzle(puzzle: &Puzzle, config: SudokuConfig) -> Result<Self> {
        let mut sudoku = Self::new(puzzle.block, config)?;
        for &(row, col, value) in &puzzle.givens {
            sudoku.add_value(row, col, value)?;
        }
        Ok(sudoku)
    }
}

impl<O: Oracle> Sudoku<O> {
    pub fn with_oracle(block: usize, config: SudokuConfig, oracle: O) -> Result<Self> {
        if block == 0 {
            return Err(Error::Config("block size must be positive".to_string()));
        }
        let width = block * block;
        let pool = TermPool::new();
        let cells = match config.encoding {
            GridEncoding::Boolean => (0..width * width * width)
                .map(|k| {
                    let (i, j, v) = (k / (width * width), k / width % width, k % width);
                    pool.bool_const(&format!("{}_{}_{}", i, j, v + 1))
                })
                .collect(),
            GridEncoding::Integer => (0..width * width)
                .map(|k| pool.int_const(&format!("{}_{}", k / width, k % width)))
                .collect(),
        };
        let diagnostics = Diagnostics::new("sudoku", config.verbose);
        let mut sudoku = Self {
            block,
            width,
            encoding: config.encoding,
            timeout: config.timeout,
            pool,
            oracle,
            cells,
            givens: HashSet::new(),
            diagnostics,
        };

        let start = Instant::now();
        let existence = sudoku.existence_constraints();
        sudoku.emit("existence", &existence);
        let rows = sudoku.line_constraints(true);
        sudoku.emit("row", &rows);
        let columns = sudoku.line_constraints(false);
        sudoku.emit("column", &columns);
        let blocks = sudoku.block_constraints();
        sudoku.emit("block", &blocks);
        sudoku.diagnostics.info(format_args!(
            "time to build constraints: {} ms",
            start.elapsed().as_millis()
        ));
        Ok(sudoku)
    }

    pub fn block(&self) -> usize {
        self.block
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pool(&self) -> &TermPool {
        &self.pool
    }

    /// Proposition "cell `(i, j)` holds the 0-based value `v`".
    fn holds(&self, i: usize, j: usize, v: usize) -> Term {
        let w = self.width;
        match self.encoding {
            GridEncoding::Boolean => self.cells[(i * w + j) * w + v],
            GridEncoding::Integer => self.pool.mk_eq(self.cells[i * w + j], self.pool.mk_int(v as i64)),
        }
    }

    fn emit(&mut self, family: &str, set: &ConstraintSet) {
        self.diagnostics.fine(format_args!("adding {} constraints", family));
        if self.diagnostics.is_verbose() {
            for &t in set {
                self.diagnostics.fine(format_args!("adding clause {}", self.pool.to_sexpr(t)));
            }
        }
        self.oracle.assert_all(&self.pool, set);
    }

    fn existence_constraints(&self) -> ConstraintSet {
        let w = self.width;
        let mut set = ConstraintSet::new();
        for i in 0..w {
            for j in 0..w {
                match self.encoding {
                    GridEncoding::Boolean => {
                        let candidates: Vec<Term> = (0..w).map(|v| self.holds(i, j, v)).collect();
                        exactly_one(&self.pool, &candidates, &mut set);
                    }
                    GridEncoding::Integer => {
                        let cell = self.cells[i * w + j];
                        set.push(self.pool.mk_le(self.pool.mk_int(0), cell));
                        set.push(self.pool.mk_le(cell, self.pool.mk_int(w as i64 - 1)));
                    }
                }
            }
        }
        set
    }

    /// Row (`by_row`) or column constraints: each value occurs in the line, at most once.
    fn line_constraints(&self, by_row: bool) -> ConstraintSet {
        let w = self.width;
        let mut set = ConstraintSet::new();
        for line in 0..w {
            for v in 0..w {
                let occurrences: Vec<Term> = (0..w)
                    .map(|k| if by_row { self.holds(line, k, v) } else { self.holds(k, line, v) })
                    .collect();
                at_least_one(&self.pool, &occurrences, &mut set);
                at_most_one(&self.pool, &occurrences, &mut set);
            }
        }
        set
    }

    fn block_constraints(&self) -> ConstraintSet {
        let n = self.block;
        let mut set = ConstraintSet::new();
        for bi in 0..n {
            for bj in 0..n {
                for v in 0..self.width {
                    let occurrences: Vec<Term> = (0..n * n)
                        .map(|k| self.holds(bi * n + k / n, bj * n + k % n, v))
                        .collect();
                    at_least_one(&self.pool, &occurrences, &mut set);
                }
            }
        }
        set
    }

    /// Pins cell `(row, col)` (0-based) to `value` (1-based).
    pub fn add_value(&mut self, row: usize, col: usize, value: u32) -> Result<()> {
        let max = self.width as i64 - 1;
        for (what, x) in [("row", row), ("column", col)] {
            if x as i64 > max {
                return Err(Error::OutOfBounds {
                    what,
                    value: x as i64,
                    min: 0,
                    max,
                });
            }
        }
        if value == 0 || value as usize > self.width {
            return Err(Error::OutOfBounds {
                what: "value",
                value: value as i64,
                min: 1,
                max: self.width as i64,
            });
        }
        let pin = self.holds(row, col, value as usize - 1);
        self.diagnostics
            .fine(format_args!("pinning ({}, {}) to {}", row, col, value));
        self.oracle.assert(&self.pool, pin);
        self.givens.insert((row, col));
        Ok(())
    }

    pub fn solve(&mut self) -> Status {
        let start = Instant::now();
        let status = self.oracle.check(&self.pool, self.timeout);
        self.diagnostics.info(format_args!(
            "time to solve problem: {} ms",
            start.elapsed().as_millis()
        ));
        status
    }

    /// The grid of the last satisfiable [`Sudoku::solve`].
    pub fn grid(&self) -> Result<Grid> {
        let model = self.oracle.model().ok_or(Error::NoModel)?;
        let w = self.width;
        let mut rows = Vec::with_capacity(w);
        for i in 0..w {
            let mut row = Vec::with_capacity(w);
            for j in 0..w {
                let value = match self.encoding {
                    GridEncoding::Boolean => {
                        let mut found = None;
                        for v in 0..w {
                            if model.eval_bool(&self.pool, self.holds(i, j, v))? {
                                found = Some(v as u32 + 1);
                                break;
                            }
                        }
                        found.ok_or_else(|| Error::MissingInterpretation(format!("{}_{}", i, j)))?
                    }
                    GridEncoding::Integer => {
                        let v = model.eval_i64(&self.pool, self.cells[i * w + j])?;
                        u32::try_from(v + 1).map_err(|_| Error::MissingInterpretation(format!("{}_{}", i, j)))?
                    }
                };
                row.push(value);
            }
            rows.push(row);
        }
        Ok(Grid::from_rows(rows))
    }

    /// Forbids the current assignment of the non-given cells.
    pub fn add_current_solution_as_cube(&mut self) -> Result<()> {
        let model = self.oracle.model().ok_or(Error::NoModel)?;
        let w = self.width;
        let mut cube = Vec::new();
        for i in 0..w {
            for j in 0..w {
                if self.givens.contains(&(i, j)) {
                    continue;
                }
                for v in 0..w {
                    let t = self.holds(i, j, v);
                    if model.eval_bool(&self.pool, t)? {
                        cube.push(t);
                    }
                }
            }
        }
        self.diagnostics
            .fine(format_args!("blocking a cube of {} cells", cube.len()));
        let block = self.pool.mk_not(self.pool.mk_and(cube));
        self.oracle.assert(&self.pool, block);
        Ok(())
    }

    /// Solves repeatedly, blocking each solution, until the puzzle runs out of
    /// solutions or `limit` grids were found.
    ///
    /// Returns the grids and the status of the last check.
    pub fn enumerate(&mut self, limit: Option<usize>) -> Result<(Vec<Grid>, Status)> {
        let mut grids = Vec::new();
        loop {
            if limit.is_some_and(|n| grids.len() >= n) {
                return Ok((grids, Status::Satisfiable));
            }
            let status = self.solve();
            if !status.is_sat() {
                return Ok((grids, status));
            }
            grids.push(self.grid()?);
            self.add_current_solution_as_cube()?;
        }
    }
}
