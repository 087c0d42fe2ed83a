//! Scaling factors — per-step rescaling of beta vectors and the
//! log-likelihood they imply.
//!
//! Purpose
//! -------
//! Keep the backward recursion inside floating-point range over long
//! trajectories. Every step divides its vector by the vector's sum and records
//! the reciprocal as a scaling factor; the likelihood is the reciprocal of the
//! product of all factors.
//!
//! Key behaviors
//! -------------
//! - [`ScalingFactorSet::scale_vector`] rescales in place and records the
//!   factor under a [`StepKey`]. A sum below the floor yields factor
//!   `1/floor` instead of `1/sum`.
//! - [`ScalingFactorSet::log10_likelihood`] folds the factors in log space,
//!   `log10 L = -Σ log10 c_i`, and floors the result at `log10(floor)`.
//! - [`clamp_to_floor`] raises entries below the floor to the floor.
//!
//! Invariants & assumptions
//! ------------------------
//! - Recorded factors are finite and strictly positive whenever the scaled
//!   vector is finite (callers reject non-finite vectors before scaling).
//! - `Π c_i · (unnormalized final total) ≈ 1` for a completed pass.
//!
//! Conventions
//! -----------
//! - Factors are kept in insertion order: terminal seed, then segments from
//!   last to first, then the initial-distribution fold.
//!
//! Testing notes
//! -------------
//! - Property tests (`proptest`) check that scaled vectors sum to one, that
//!   `factor · sum == 1` above the floor, and that clamping never lowers an
//!   entry.
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Default numerical floor for sums, entries, and the likelihood.
pub const ALMOST_ZERO: f64 = 1e-300;

/// Identifies one rescaling step of a backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
    /// The model's terminal probability vector that seeds the pass.
    Terminal,
    /// The beta vector of segment `k` (temporal index).
    Segment(usize),
    /// The scalar fold with the initial distribution.
    Initial,
}

impl std::fmt::Display for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKey::Terminal => write!(f, "terminal"),
            StepKey::Segment(k) => write!(f, "segment_{k}"),
            StepKey::Initial => write!(f, "initial"),
        }
    }
}

/// Ordered collection of scaling factors for one backward pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingFactorSet {
    factors: Vec<(StepKey, f64)>,
}

impl ScalingFactorSet {
    pub fn new() -> Self {
        ScalingFactorSet { factors: Vec::new() }
    }

    /// Rescale `v` to unit sum and record the factor under `key`.
    ///
    /// Returns
    /// -------
    /// The factor `c`: `1/sum` when `sum >= floor`, otherwise `1/floor`.
    pub fn scale_vector(&mut self, key: StepKey, v: &mut Array1<f64>, floor: f64) -> f64 {
        let total = v.sum();
        let factor = if total < floor {
            warn!(step = %key, total, floor, "vector sum below floor; scaling by 1/floor");
            1.0 / floor
        } else {
            1.0 / total
        };
        v.mapv_inplace(|x| x * factor);
        trace!(step = %key, factor, "recorded scaling factor");
        self.factors.push((key, factor));
        factor
    }

    /// Product of all factors. May overflow to `inf` for long passes; prefer
    /// [`ScalingFactorSet::log10_likelihood`].
    pub fn compute_product(&self) -> f64 {
        self.factors.iter().map(|(_, c)| c).product()
    }

    /// `log10(1 / Π c_i)`, floored at `log10(floor)`.
    pub fn log10_likelihood(&self, floor: f64) -> f64 {
        let log_product: f64 = self.factors.iter().map(|(_, c)| c.log10()).sum();
        (-log_product).max(floor.log10())
    }

    pub fn get(&self, key: StepKey) -> Option<f64> {
        self.factors.iter().find(|(k, _)| *k == key).map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(StepKey, f64)> + '_ {
        self.factors.iter()
    }

    /// Factors alone, in insertion order.
    pub fn factors(&self) -> Vec<f64> {
        self.factors.iter().map(|(_, c)| *c).collect()
    }
}

/// Raise every entry below `floor` to `floor`; returns how many changed.
pub fn clamp_to_floor(v: &mut Array1<f64>, floor: f64) -> usize {
    let mut clamped = 0;
    v.mapv_inplace(|x| {
        if x < floor {
            clamped += 1;
            floor
        } else {
            x
        }
    });
    clamped
}
