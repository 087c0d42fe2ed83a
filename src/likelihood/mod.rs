//! likelihood — backward-recursion likelihoods of dwell trajectories under
//! aggregated kinetic models.
//!
//! Purpose
//! -------
//! Bundle the value types, the model collaborator trait, the backward engine,
//! and the shared error type under one namespace. This is the surface most
//! consumers (including the Python bindings) should depend on.
//!
//! Key behaviors
//! -------------
//! - [`core`]: trajectories, classes, rate matrices and partitions, scaling
//!   factors, options, archives, and diagnostics sinks.
//! - [`models`]: the [`AggregatedKineticModel`] trait plus a fixed-generator
//!   and a time-varying model.
//! - [`backward`]: the [`BackwardLikelihood`] engine, its step strategies,
//!   and batch evaluation through [`LikelihoodJudge`].
//! - [`errors`]: [`LikelihoodError`] and the [`LikelihoodResult`] alias.
//!
//! Invariants & assumptions
//! ------------------------
//! - Trajectories are validated on construction (non-empty, positive finite
//!   durations) and never mutated by a pass.
//! - Likelihoods are reported as `log10 L`, floored at `log10(floor)`.
//!
//! Downstream usage
//! ----------------
//! - Build a [`Trajectory`] and a model, then call
//!   [`BackwardLikelihood::predict_data`]. Use
//!   [`BackwardLikelihood::predict_with_diagnostics`] with a sink to inspect
//!   scaling factors, archived vectors, and failure artifacts.
pub mod backward;
pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::backward::{
    BackwardLikelihood, BackwardOutcome, JudgeScore, LikelihoodJudge, LikelihoodPrediction,
};
pub use self::core::{
    ALMOST_ZERO, BackwardOptions, DiagnosticArtifact, DiagnosticsSink, FileSink, MemorySink,
    NoopSink, ObservableClass, RateMatrix, RebuildPolicy, Segment, StatePartition, StepKey,
    TracingSink, Trajectory,
};
pub use self::errors::{LikelihoodError, LikelihoodResult};
pub use self::models::{AggregatedKineticModel, GeneratorModel, TimeVaryingModel};

// ---- Optional convenience prelude for downstream crates -------------------
//
//     use dwell_likelihood::likelihood::prelude::*;

pub mod prelude {
    pub use super::{
        AggregatedKineticModel, BackwardLikelihood, BackwardOptions, GeneratorModel,
        LikelihoodError, LikelihoodPrediction, LikelihoodResult, ObservableClass, RebuildPolicy,
        StatePartition, TimeVaryingModel, Trajectory,
    };
}
