//! State-indexed vectors and probability-distribution checks.
//!
//! A beta vector lives on the hidden states of one class, while the model's
//! boundary distributions live on the full state space. [`StateVector`] keeps
//! the hidden-state ids next to the values so the two can be combined by id
//! rather than by position.
use crate::likelihood::errors::{LikelihoodError, LikelihoodResult};
use ndarray::{Array1, ArrayView1};

/// Absolute tolerance on `Σ p_i = 1` for boundary distributions.
pub const DISTRIBUTION_TOL: f64 = 1e-8;

/// Values tagged with the hidden-state id of each entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    states: Vec<usize>,
    values: Array1<f64>,
}

impl StateVector {
    /// Pair `states[i]` with `values[i]`.
    ///
    /// Errors with `DimensionMismatch` when the lengths differ.
    pub fn new(states: Vec<usize>, values: Array1<f64>) -> LikelihoodResult<Self> {
        if states.len() != values.len() {
            return Err(LikelihoodError::DimensionMismatch {
                context: "state vector ids",
                expected: states.len(),
                actual: values.len(),
            });
        }
        Ok(StateVector { states, values })
    }

    /// Vector over the full state space `0..values.len()`.
    pub fn full(values: Array1<f64>) -> Self {
        StateVector { states: (0..values.len()).collect(), values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn states(&self) -> &[usize] {
        &self.states
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// `Σ_i self[s_i] · other[s_i]` over the states of `other`.
    ///
    /// Every state of `other` must be present in `self`; a missing state is
    /// reported as `DimensionMismatch` with the missing id as `actual`.
    pub fn aligned_dot(&self, other: &StateVector) -> LikelihoodResult<f64> {
        let mut total = 0.0;
        for (&state, &value) in other.states.iter().zip(other.values.iter()) {
            let position = self.states.iter().position(|&s| s == state).ok_or(
                LikelihoodError::DimensionMismatch {
                    context: "state alignment",
                    expected: self.states.len(),
                    actual: state,
                },
            )?;
            total += self.values[position] * value;
        }
        Ok(total)
    }
}

/// Check that `p` is a probability distribution over `n_states` states.
///
/// Errors
/// ------
/// - `DimensionMismatch` when `p.len() != n_states`.
/// - `InvalidDistribution` for negative or non-finite entries, or a sum
///   further than [`DISTRIBUTION_TOL`] from 1.
pub fn validate_distribution(
    p: ArrayView1<f64>, n_states: usize, which: &'static str,
) -> LikelihoodResult<()> {
    if p.len() != n_states {
        return Err(LikelihoodError::DimensionMismatch {
            context: "probability vector length",
            expected: n_states,
            actual: p.len(),
        });
    }
    if p.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return Err(LikelihoodError::InvalidDistribution {
            which,
            reason: "entries must be finite and non-negative",
        });
    }
    if (p.sum() - 1.0).abs() > DISTRIBUTION_TOL {
        return Err(LikelihoodError::InvalidDistribution { which, reason: "entries must sum to 1" });
    }
    Ok(())
}
