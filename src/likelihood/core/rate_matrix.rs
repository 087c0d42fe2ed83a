//! Rate matrices and the hidden-state → observable-class partition.
//!
//! Purpose
//! -------
//! Represent the full generator matrix of an aggregated kinetic model and the
//! partition of its hidden states into observable classes, and extract the
//! class-to-class blocks (`Q_aa`, `Q_ab`) used by the backward recursion.
//!
//! Key behaviors
//! -------------
//! - [`StatePartition`] maps each hidden state to its [`ObservableClass`] and
//!   lists the member states of each class in ascending state order.
//! - [`RateMatrix::new`] checks shape and finiteness; generator structure
//!   (non-negative off-diagonals, zero row sums) is checked separately by
//!   [`RateMatrix::validate_generator`] so that models may opt in.
//! - [`RateMatrix::block`] copies the rows of one class and the columns of
//!   another into an owned matrix.
//!
//! Invariants & assumptions
//! ------------------------
//! - A rate matrix is square with finite entries.
//! - Block rows/columns follow the member order of the partition, which is
//!   also the order of every beta vector over that class.
use crate::likelihood::{
    core::classes::ObservableClass,
    errors::{LikelihoodError, LikelihoodResult},
};
use ndarray::{Array2, ArrayView2, Axis};
use std::collections::BTreeMap;

/// Default relative tolerance for generator row sums.
pub const GENERATOR_TOL: f64 = 1e-8;

/// Partition of hidden states into observable classes.
#[derive(Debug, Clone, PartialEq)]
pub struct StatePartition {
    classes: Vec<ObservableClass>,
    members: BTreeMap<ObservableClass, Vec<usize>>,
}

impl StatePartition {
    /// Build from the class of each hidden state (`classes[i]` is the class
    /// of state `i`).
    pub fn new(classes: Vec<ObservableClass>) -> LikelihoodResult<Self> {
        if classes.is_empty() {
            return Err(LikelihoodError::DimensionMismatch {
                context: "state partition",
                expected: 1,
                actual: 0,
            });
        }
        let mut members: BTreeMap<ObservableClass, Vec<usize>> = BTreeMap::new();
        for (state, class) in classes.iter().enumerate() {
            members.entry(*class).or_default().push(state);
        }
        Ok(StatePartition { classes, members })
    }

    /// Build from per-state labels such as `["dark", "dark", "bright"]`.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> LikelihoodResult<Self> {
        let classes =
            labels.iter().map(|s| s.as_ref().parse()).collect::<LikelihoodResult<Vec<_>>>()?;
        StatePartition::new(classes)
    }

    pub fn n_states(&self) -> usize {
        self.classes.len()
    }

    pub fn class_of(&self, state: usize) -> Option<ObservableClass> {
        self.classes.get(state).copied()
    }

    /// Member states of `class`, ascending.
    ///
    /// Errors with `LikelihoodError::EmptyClass` if no state has this class.
    pub fn members(&self, class: ObservableClass) -> LikelihoodResult<&[usize]> {
        self.members
            .get(&class)
            .map(|v| v.as_slice())
            .ok_or(LikelihoodError::EmptyClass { class })
    }
}

/// Full rate matrix over the hidden-state space.
#[derive(Debug, Clone, PartialEq)]
pub struct RateMatrix {
    matrix: Array2<f64>,
}

impl RateMatrix {
    /// Wrap a square matrix with finite entries.
    ///
    /// Errors
    /// ------
    /// - `LikelihoodError::InvalidRateMatrix` when the matrix is not square or
    ///   an entry is NaN/±inf (the first offending entry is reported).
    pub fn new(matrix: Array2<f64>) -> LikelihoodResult<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(LikelihoodError::InvalidRateMatrix {
                row: rows,
                col: cols,
                reason: "rate matrix must be square",
            });
        }
        for ((row, col), value) in matrix.indexed_iter() {
            if !value.is_finite() {
                return Err(LikelihoodError::InvalidRateMatrix {
                    row,
                    col,
                    reason: "rate matrix entries must be finite",
                });
            }
        }
        Ok(RateMatrix { matrix })
    }

    /// Check generator structure: off-diagonal entries `>= 0` and each row
    /// summing to zero within `tol · max(1, |q_ii|)`.
    pub fn validate_generator(&self, tol: f64) -> LikelihoodResult<()> {
        for (row, values) in self.matrix.axis_iter(Axis(0)).enumerate() {
            for (col, &value) in values.iter().enumerate() {
                if row != col && value < 0.0 {
                    return Err(LikelihoodError::InvalidRateMatrix {
                        row,
                        col,
                        reason: "off-diagonal rates must be non-negative",
                    });
                }
            }
            let row_sum: f64 = values.sum();
            if row_sum.abs() > tol * values[row].abs().max(1.0) {
                return Err(LikelihoodError::InvalidRateMatrix {
                    row,
                    col: row,
                    reason: "generator rows must sum to zero",
                });
            }
        }
        Ok(())
    }

    pub fn n_states(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    /// Copy of the block with the given rows and columns.
    pub fn block(&self, rows: &[usize], cols: &[usize]) -> Array2<f64> {
        self.matrix.select(Axis(0), rows).select(Axis(1), cols)
    }
}
