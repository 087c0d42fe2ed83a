//! Prediction value objects returned by the backward engine.
use crate::likelihood::core::{archive::BackwardArchive, scaling::ScalingFactorSet};
use ndarray::{Array1, array};
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_10;

/// Log10-likelihood of one trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodPrediction {
    log_likelihood: f64,
}

impl LikelihoodPrediction {
    pub fn new(log_likelihood: f64) -> Self {
        LikelihoodPrediction { log_likelihood }
    }

    /// `log10 L`.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Natural-log likelihood `ln L`.
    pub fn ln_likelihood(&self) -> f64 {
        self.log_likelihood * LN_10
    }

    /// `L = 10^{log10 L}`; underflows to 0 for very long trajectories.
    pub fn likelihood(&self) -> f64 {
        10f64.powf(self.log_likelihood)
    }

    /// One-element array holding `log10 L`.
    pub fn as_array(&self) -> Array1<f64> {
        array![self.log_likelihood]
    }
}

/// Prediction plus the scaling factors and archive of the pass.
///
/// `archive` is empty unless archiving was enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct BackwardOutcome {
    pub prediction: LikelihoodPrediction,
    pub scaling: ScalingFactorSet,
    pub archive: BackwardArchive,
}
