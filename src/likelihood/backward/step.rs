//! Backward step strategies — one segment of the beta recursion.
//!
//! Purpose
//! -------
//! Turn the rescaled beta of the successor segment into the unnormalized beta
//! of the current segment:
//!
//! ```text
//! v = 1                     (last segment)
//! v = Q_ab · β_next         (otherwise)
//! v_i = max(v_i, floor)
//! β = exp(Q_aa · t) · v
//! ```
//!
//! Key behaviors
//! -------------
//! - [`StepStrategy::compute_backward_vector`] is shared: it builds and
//!   clamps the target, records segment debug artifacts when asked, calls the
//!   strategy's [`exponentiate`](StepStrategy::exponentiate), and records an
//!   `Exponentiation` artifact before returning a failure.
//! - [`GeneralStep`] uses the dense Padé action for small blocks and the
//!   Krylov `expv` for large ones.
//! - [`DiagonalStep`] uses the exact closed form `exp(q_ii·t)·v_i`; it
//!   rejects a block with a non-zero off-diagonal entry.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Q_aa` is square over the current class; `Q_ab` maps the current class
//!   to the successor class; `β_next` is over the successor class.
//! - Shape disagreements are `DimensionMismatch` errors; nothing is padded
//!   or truncated.
//! - Non-finite output is returned as-is; the engine classifies it.
use crate::{
    likelihood::{
        core::{
            classes::ObservableClass,
            diagnostics::{DiagnosticArtifact, DiagnosticsSink, matrix_rows, vector_values},
            scaling::clamp_to_floor,
        },
        errors::{LikelihoodError, LikelihoodResult},
    },
    numerics::{ExpvOptions, diagonal_expm_action, expv},
};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Inputs of one backward step.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    /// Temporal index of the segment.
    pub segment: usize,
    pub class: ObservableClass,
    pub duration: f64,
    pub q_aa: ArrayView2<'a, f64>,
    /// `None` for the last segment.
    pub q_ab: Option<ArrayView2<'a, f64>>,
    /// Rescaled beta of the successor segment; `None` for the last segment.
    pub beta_next: Option<ArrayView1<'a, f64>>,
    pub floor: f64,
    /// Record a `SegmentDebug` artifact for this step.
    pub debug: bool,
}

/// Strategy for the exponential action of one step.
pub trait StepStrategy: Send + Sync {
    /// `exp(Q_aa · t) · target`.
    fn exponentiate(
        &self, input: &StepInput<'_>, target: ArrayView1<f64>,
    ) -> LikelihoodResult<Array1<f64>>;

    /// Build the clamped target vector of a step.
    fn target_vector(&self, input: &StepInput<'_>) -> LikelihoodResult<Array1<f64>> {
        let n = input.q_aa.nrows();
        if input.q_aa.ncols() != n {
            return Err(LikelihoodError::DimensionMismatch {
                context: "Q_aa columns",
                expected: n,
                actual: input.q_aa.ncols(),
            });
        }
        let mut target = match (input.q_ab, input.beta_next) {
            (None, _) => Array1::ones(n),
            (Some(q_ab), Some(beta)) => {
                if q_ab.nrows() != n {
                    return Err(LikelihoodError::DimensionMismatch {
                        context: "Q_ab rows",
                        expected: n,
                        actual: q_ab.nrows(),
                    });
                }
                if q_ab.ncols() != beta.len() {
                    return Err(LikelihoodError::DimensionMismatch {
                        context: "Q_ab columns vs successor beta",
                        expected: q_ab.ncols(),
                        actual: beta.len(),
                    });
                }
                q_ab.dot(&beta)
            }
            (Some(q_ab), None) => {
                return Err(LikelihoodError::DimensionMismatch {
                    context: "successor beta",
                    expected: q_ab.ncols(),
                    actual: 0,
                });
            }
        };
        clamp_to_floor(&mut target, input.floor);
        Ok(target)
    }

    /// Unnormalized beta of the segment described by `input`.
    fn compute_backward_vector(
        &self, input: &StepInput<'_>, sink: &mut dyn DiagnosticsSink,
    ) -> LikelihoodResult<Array1<f64>> {
        let target = self.target_vector(input)?;
        if input.debug {
            sink.record(DiagnosticArtifact::SegmentDebug {
                segment: input.segment,
                class: input.class,
                duration: input.duration,
                q_aa: matrix_rows(input.q_aa),
                q_ab: input.q_ab.map(matrix_rows),
                target: vector_values(target.view()),
            });
        }
        match self.exponentiate(input, target.view()) {
            Err(err @ LikelihoodError::ExponentiationFailure { .. }) => {
                sink.record(DiagnosticArtifact::Exponentiation {
                    segment: input.segment,
                    class: input.class,
                    duration: input.duration,
                    q_aa: matrix_rows(input.q_aa),
                    q_ab: input.q_ab.map(matrix_rows),
                    target: vector_values(target.view()),
                    reason: err.to_string(),
                });
                Err(err.at_segment(input.segment))
            }
            other => other,
        }
    }
}

/// Dense/Krylov exponential action for arbitrary blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeneralStep {
    pub expv: ExpvOptions,
}

impl GeneralStep {
    pub fn new(expv: ExpvOptions) -> Self {
        GeneralStep { expv }
    }
}

impl StepStrategy for GeneralStep {
    fn exponentiate(
        &self, input: &StepInput<'_>, target: ArrayView1<f64>,
    ) -> LikelihoodResult<Array1<f64>> {
        Ok(expv(input.q_aa, input.duration, target, &self.expv)?)
    }
}

/// Closed-form action for blocks declared diagonal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiagonalStep;

impl StepStrategy for DiagonalStep {
    fn exponentiate(
        &self, input: &StepInput<'_>, target: ArrayView1<f64>,
    ) -> LikelihoodResult<Array1<f64>> {
        for ((row, col), &value) in input.q_aa.indexed_iter() {
            if row != col && value != 0.0 {
                return Err(LikelihoodError::NonDiagonalBlock { class: input.class, row, col, value });
            }
        }
        Ok(diagonal_expm_action(input.q_aa.diag(), input.duration, target)?)
    }
}
