//! Dense outcome counters indexed by (position-count row, missing count, outcome).

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::error::InputError;
use crate::solver::Outcome;

/// Outcome counters for one sweep.
///
/// Rows follow the sweep's `positions` list; columns are the number of
/// removed measurements. Every cell starts at zero, so an unvisited cell and
/// a visited cell without hits read the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeTable {
    rows: usize,
    cols: usize,
    counts: Vec<[u32; 3]>,
}

impl OutcomeTable {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            counts: vec![[0; 3]; rows * cols],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn offset(&self, row: usize, missing: usize) -> Result<usize, InputError> {
        if row >= self.rows {
            return Err(InputError::IndexOutOfRange {
                what: "table row",
                index: row,
                len: self.rows,
            });
        }
        if missing >= self.cols {
            return Err(InputError::IndexOutOfRange {
                what: "missing count",
                index: missing,
                len: self.cols,
            });
        }
        Ok(row * self.cols + missing)
    }

    pub fn increment(&mut self, row: usize, missing: usize, outcome: Outcome) -> Result<(), InputError> {
        let i = self.offset(row, missing)?;
        self.counts[i][outcome.index()] += 1;
        Ok(())
    }

    pub fn get(&self, row: usize, missing: usize, outcome: Outcome) -> Result<u32, InputError> {
        let i = self.offset(row, missing)?;
        Ok(self.counts[i][outcome.index()])
    }

    /// Attempts recorded in a cell, all outcomes together.
    pub fn total(&self, row: usize, missing: usize) -> Result<u32, InputError> {
        let i = self.offset(row, missing)?;
        Ok(self.counts[i].iter().sum())
    }

    /// Sum over every cell for one outcome.
    pub fn outcome_total(&self, outcome: Outcome) -> u64 {
        self.counts.iter().map(|c| c[outcome.index()] as u64).sum()
    }

    /// Add the counters of an independently accumulated table.
    pub fn merge(&mut self, other: &OutcomeTable) -> Result<(), InputError> {
        if self.shape() != other.shape() {
            return Err(InputError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            for (m, t) in mine.iter_mut().zip(theirs) {
                *m += t;
            }
        }
        Ok(())
    }

    /// Counters of one outcome as a `rows x cols` matrix.
    pub fn matrix(&self, outcome: Outcome) -> DMatrix<f64> {
        DMatrix::from_fn(self.rows, self.cols, |r, c| {
            self.counts[r * self.cols + c][outcome.index()] as f64
        })
    }

    /// Rebuild a table from per-outcome matrices (e.g. read back from disk).
    ///
    /// Missing outcomes count as zero; NaN cells count as zero.
    pub fn from_matrices(matrices: &BTreeMap<Outcome, DMatrix<f64>>) -> Result<Self, InputError> {
        let shape = match matrices.values().next() {
            Some(m) => m.shape(),
            None => return Ok(Self::new(0, 0)),
        };
        let mut table = Self::new(shape.0, shape.1);
        for (outcome, m) in matrices {
            if m.shape() != shape {
                return Err(InputError::ShapeMismatch {
                    expected: shape,
                    actual: m.shape(),
                });
            }
            for r in 0..shape.0 {
                for c in 0..shape.1 {
                    let v = m[(r, c)];
                    if v.is_nan() {
                        continue;
                    }
                    if !(0.0..=u32::MAX as f64).contains(&v) || v.fract() != 0.0 {
                        return Err(InputError::InvalidCounter(v));
                    }
                    table.counts[r * shape.1 + c][outcome.index()] = v as u32;
                }
            }
        }
        Ok(table)
    }
}
