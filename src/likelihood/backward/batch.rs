//! Batch evaluation of many trajectories against one model.
//!
//! Purpose
//! -------
//! Evaluate independent trajectories in parallel and fold them into a single
//! score for model comparison. Each pass owns its own organizer and scaling
//! state, so the only shared data are the immutable engine, model, and
//! trajectories.
//!
//! Key behaviors
//! -------------
//! - [`BackwardLikelihood::predict_batch`] maps trajectories through
//!   [`BackwardLikelihood::predict_data`] on the `rayon` pool, preserving
//!   input order.
//! - [`LikelihoodJudge::judge`] scores a batch as `-Σ log10 L_i` (lower is
//!   better) and fails with the first error in input order.
use crate::likelihood::{
    backward::{engine::BackwardLikelihood, prediction::LikelihoodPrediction},
    core::trajectory::Trajectory,
    errors::LikelihoodResult,
    models::traits::AggregatedKineticModel,
};
use rayon::prelude::*;
use tracing::debug;

impl BackwardLikelihood {
    /// Predict every trajectory in parallel; results keep the input order.
    pub fn predict_batch<M>(
        &self, model: &M, trajectories: &[Trajectory],
    ) -> Vec<LikelihoodResult<LikelihoodPrediction>>
    where
        M: AggregatedKineticModel + Sync + ?Sized,
    {
        trajectories.par_iter().map(|trajectory| self.predict_data(model, trajectory)).collect()
    }
}

/// Score of a batch together with the per-trajectory predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeScore {
    pub score: f64,
    pub predictions: Vec<LikelihoodPrediction>,
}

/// Folds batch predictions into one score; lower is better.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LikelihoodJudge {
    engine: BackwardLikelihood,
}

impl LikelihoodJudge {
    pub fn new(engine: BackwardLikelihood) -> Self {
        LikelihoodJudge { engine }
    }

    /// `-Σ log10 L_i` over `trajectories`.
    pub fn judge<M>(&self, model: &M, trajectories: &[Trajectory]) -> LikelihoodResult<JudgeScore>
    where
        M: AggregatedKineticModel + Sync + ?Sized,
    {
        let predictions =
            self.engine.predict_batch(model, trajectories).into_iter().collect::<LikelihoodResult<Vec<_>>>()?;
        let score = -predictions.iter().map(|p| p.log_likelihood()).sum::<f64>();
        debug!(trajectories = predictions.len(), score, "judged batch");
        Ok(JudgeScore { score, predictions })
    }
}
