//! Errors for the backward likelihood stack (input validation, model
//! collaborator failures, recursion pathologies, and exponentiation).
//!
//! This module defines [`LikelihoodError`], the single error type surfaced by
//! trajectories, models, the rate-matrix organizer, the step strategies, and
//! the backward engine. It implements `Display`/`Error` and converts to
//! `PyErr` when the `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Segment indices are 0-based** and refer to temporal order (index 0 is
//!   the earliest dwell), even though the recursion visits them in reverse.
//! - Fatal recursion failures (`NonFiniteResult`, `ExponentiationFailure`,
//!   `DimensionMismatch`) are never retried by this crate.
//! - Values below the numerical floor are clamped, not reported; there is no
//!   underflow error.
use crate::likelihood::core::classes::ObservableClass;
use crate::numerics::ExpmError;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Crate-wide result alias for likelihood operations.
pub type LikelihoodResult<T> = Result<T, LikelihoodError>;

/// Unified error type for backward-recursion likelihoods.
#[derive(Debug, Clone, PartialEq)]
pub enum LikelihoodError {
    // ---- Trajectory validation ----
    /// Trajectory has no segments.
    EmptyTrajectory,

    /// A segment duration is NaN/±inf or ≤ 0.
    InvalidDuration { index: usize, value: f64 },

    /// A class label could not be parsed.
    UnknownClass { label: String },

    // ---- Model / rate matrix ----
    /// The partition has no hidden states for this class.
    EmptyClass { class: ObservableClass },

    /// The rate matrix violates a structural requirement.
    InvalidRateMatrix { row: usize, col: usize, reason: &'static str },

    /// A boundary probability vector is not a distribution over the states.
    InvalidDistribution { which: &'static str, reason: &'static str },

    /// A block declared diagonal has a non-zero off-diagonal entry.
    NonDiagonalBlock { class: ObservableClass, row: usize, col: usize, value: f64 },

    /// Submatrix requested before any rate matrix was built.
    RateMatrixNotBuilt,

    /// Free-form failure reported by a model collaborator.
    Model { reason: String },

    // ---- Options ----
    /// Numerical floor must be finite with 0 < floor < 1.
    InvalidFloor { value: f64 },

    /// Krylov options failed validation.
    InvalidExpvOptions { reason: &'static str },

    // ---- Recursion failures ----
    /// Submatrix / vector shapes are incompatible.
    DimensionMismatch { context: &'static str, expected: usize, actual: usize },

    /// A step produced NaN/±inf.
    NonFiniteResult { segment: usize, class: ObservableClass },

    /// The matrix-exponential action failed structurally.
    ExponentiationFailure { segment: Option<usize>, source: ExpmError },
}

impl std::error::Error for LikelihoodError {}

impl std::fmt::Display for LikelihoodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Trajectory validation ----
            LikelihoodError::EmptyTrajectory => {
                write!(f, "Trajectory has no segments.")
            }
            LikelihoodError::InvalidDuration { index, value } => {
                write!(f, "Segment {index} duration must be finite and > 0; got: {value}")
            }
            LikelihoodError::UnknownClass { label } => {
                write!(f, "Unknown observable class label: {label:?}")
            }
            // ---- Model / rate matrix ----
            LikelihoodError::EmptyClass { class } => {
                write!(f, "No hidden states belong to class {class}.")
            }
            LikelihoodError::InvalidRateMatrix { row, col, reason } => {
                write!(f, "Invalid rate matrix at ({row}, {col}): {reason}")
            }
            LikelihoodError::InvalidDistribution { which, reason } => {
                write!(f, "Invalid {which} probability vector: {reason}")
            }
            LikelihoodError::NonDiagonalBlock { class, row, col, value } => {
                write!(
                    f,
                    "Within-class block for {class} was declared diagonal but entry ({row}, {col}) is {value}"
                )
            }
            LikelihoodError::RateMatrixNotBuilt => {
                write!(f, "Rate matrix has not been built yet.")
            }
            LikelihoodError::Model { reason } => {
                write!(f, "Model failure: {reason}")
            }
            // ---- Options ----
            LikelihoodError::InvalidFloor { value } => {
                write!(f, "Numerical floor must be finite with 0 < floor < 1; got: {value}")
            }
            LikelihoodError::InvalidExpvOptions { reason } => {
                write!(f, "Invalid Krylov options: {reason}")
            }
            // ---- Recursion failures ----
            LikelihoodError::DimensionMismatch { context, expected, actual } => {
                write!(f, "Dimension mismatch in {context}: expected {expected}, got {actual}")
            }
            LikelihoodError::NonFiniteResult { segment, class } => {
                write!(f, "Likelihood calculation failure: non-finite beta at segment {segment} ({class})")
            }
            LikelihoodError::ExponentiationFailure { segment: Some(segment), source } => {
                write!(f, "Matrix exponentiation failed at segment {segment}: {source}")
            }
            LikelihoodError::ExponentiationFailure { segment: None, source } => {
                write!(f, "Matrix exponentiation failed: {source}")
            }
        }
    }
}

impl From<ExpmError> for LikelihoodError {
    fn from(err: ExpmError) -> LikelihoodError {
        LikelihoodError::ExponentiationFailure { segment: None, source: err }
    }
}

impl LikelihoodError {
    /// Attach a segment index to an exponentiation failure; other variants
    /// pass through unchanged.
    pub fn at_segment(self, index: usize) -> LikelihoodError {
        match self {
            LikelihoodError::ExponentiationFailure { segment: None, source } => {
                LikelihoodError::ExponentiationFailure { segment: Some(index), source }
            }
            other => other,
        }
    }

    /// True for the recursion failures that abort a trajectory.
    pub fn is_fatal_recursion_failure(&self) -> bool {
        matches!(
            self,
            LikelihoodError::NonFiniteResult { .. }
                | LikelihoodError::ExponentiationFailure { .. }
                | LikelihoodError::DimensionMismatch { .. }
        )
    }
}

/// Convert a [`LikelihoodError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<LikelihoodError> for PyErr {
    fn from(err: LikelihoodError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
