//! Reader for the Sudoku puzzle text format.
//!
//! ```text
//! 2
//! 1,,,
//! ,,3,
//! ,4,,
//! ,,,2
//! ```
//!
//! The first line is the block size `n`. Each following line is a row of up to
//! `n²` comma-separated fields, either empty or a value in `1..=n²`.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};

/// A parsed puzzle: block size and 0-based `(row, column, value)` givens.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Puzzle {
    pub block: usize,
    pub givens: Vec<(usize, usize, u32)>,
}

fn input_error(line: usize, message: impl Into<String>) -> Error {
    Error::Input {
        line,
        message: message.into(),
    }
}

impl Puzzle {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let header = lines.next().ok_or_else(|| input_error(1, "missing block size"))?;
        let block: usize = header
            .trim()
            .parse()
            .map_err(|_| input_error(1, format!("invalid block size `{}`", header.trim())))?;
        if block == 0 {
            return Err(input_error(1, "block size must be positive"));
        }
        let width = block * block;

        let rows: Vec<&str> = lines.collect();
        let used = rows.iter().rposition(|l| !l.trim().is_empty()).map_or(0, |k| k + 1);
        if used > width {
            return Err(input_error(width + 2, format!("more than {} rows", width)));
        }

        let mut givens = Vec::new();
        for (row, line) in rows[..used].iter().enumerate() {
            let line_no = row + 2;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() > width {
                return Err(input_error(line_no, format!("more than {} fields", width)));
            }
            for (col, field) in fields.iter().enumerate() {
                let field = field.trim();
                if field.is_empty() {
                    continue;
                }
                let value: u32 = field
                    .parse()
                    .map_err(|_| input_error(line_no, format!("invalid value `{}`", field)))?;
                if value == 0 || value as usize > width {
                    return Err(input_error(line_no, format!("value {} is not in 1..={}", value, width)));
                }
                givens.push((row, col, value));
            }
        }
        debug!("parsed puzzle with block size {} and {} givens", block, givens.len());
        Ok(Self { block, givens })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }
}
