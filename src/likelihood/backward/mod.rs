//! likelihood::backward — the backward recursion and its building blocks.
//!
//! - [`organizer`]: per-pass rate-matrix cache and block extraction.
//! - [`step`]: general and diagonal step strategies.
//! - [`engine`]: the reverse pass, rescaling, and finalization.
//! - [`prediction`]: returned value objects.
//! - [`batch`]: parallel evaluation and the likelihood judge.
pub mod batch;
pub mod engine;
pub mod organizer;
pub mod prediction;
pub mod step;

pub use self::batch::{JudgeScore, LikelihoodJudge};
pub use self::engine::BackwardLikelihood;
pub use self::organizer::RateMatrixOrganizer;
pub use self::prediction::{BackwardOutcome, LikelihoodPrediction};
pub use self::step::{DiagonalStep, GeneralStep, StepInput, StepStrategy};
