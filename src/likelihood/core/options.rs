//! Backward options — configuration for a backward likelihood pass.
//!
//! Purpose
//! -------
//! Collect the knobs of a backward pass in one validated carrier: when the
//! rate matrix is rebuilt, whether intermediate vectors are archived, whether
//! every segment's inputs are recorded as diagnostics, the numerical floor,
//! and the Krylov tuning used for large blocks.
//!
//! Key behaviors
//! -------------
//! - [`RebuildPolicy`] makes the rebuild schedule explicit. `EverySegment`
//!   rebuilds at each segment's cumulative start time, `Once` reuses the
//!   matrix built at the trajectory end time, and `FromModel` rebuilds only
//!   when the model reports itself as time-dependent.
//! - [`BackwardOptions::new`] validates the floor and the Krylov options and
//!   never panics; `Default` gives the documented defaults.
//!
//! Invariants & assumptions
//! ------------------------
//! - `floor` is finite with `0 < floor < 1`, so `1/floor` is a finite
//!   scaling factor and `log10(floor)` a finite log-likelihood floor.
//! - `expv.krylov_dim >= 2` and `expv.tol` is finite and positive.
//!
//! Conventions
//! -----------
//! - Options derive `serde` traits so they can be loaded from JSON
//!   configuration; deserialized values should be passed through
//!   [`BackwardOptions::validate`] before use.
//!
//! Testing notes
//! -------------
//! - Unit tests cover defaults, builder methods, floor validation, and a
//!   JSON round trip through `serde_json`.
use crate::{
    likelihood::{
        core::scaling::ALMOST_ZERO,
        errors::{LikelihoodError, LikelihoodResult},
    },
    numerics::ExpvOptions,
};
use serde::{Deserialize, Serialize};

/// When the organizer rebuilds the rate matrix during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildPolicy {
    /// Rebuild at every segment's cumulative start time.
    #[default]
    EverySegment,
    /// Build once at the trajectory end time.
    Once,
    /// Rebuild per segment only if the model is time-dependent.
    FromModel,
}

impl RebuildPolicy {
    /// Whether a rebuild happens before each segment.
    pub fn rebuilds_per_segment(&self, model_is_time_dependent: bool) -> bool {
        match self {
            RebuildPolicy::EverySegment => true,
            RebuildPolicy::Once => false,
            RebuildPolicy::FromModel => model_is_time_dependent,
        }
    }
}

/// BackwardOptions — configuration of one backward pass.
///
/// Fields
/// ------
/// - `rebuild`: [`RebuildPolicy`], default `EverySegment`.
/// - `archive`: keep scaled vectors and rate matrices of every step and
///   return them with the prediction; on failure they are also written to the
///   diagnostics sink. Default `false`.
/// - `debug_segments`: record each segment's `Q_aa`, `Q_ab`, target vector,
///   and duration to the diagnostics sink. Default `false`.
/// - `floor`: numerical floor (default [`ALMOST_ZERO`]).
/// - `expv`: Krylov tuning, see [`ExpvOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackwardOptions {
    pub rebuild: RebuildPolicy,
    pub archive: bool,
    pub debug_segments: bool,
    pub floor: f64,
    pub expv: ExpvOptions,
}

impl Default for BackwardOptions {
    fn default() -> Self {
        BackwardOptions {
            rebuild: RebuildPolicy::default(),
            archive: false,
            debug_segments: false,
            floor: ALMOST_ZERO,
            expv: ExpvOptions::default(),
        }
    }
}

impl BackwardOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - `LikelihoodError::InvalidFloor` unless `floor` is finite with
    ///   `0 < floor < 1`.
    /// - `LikelihoodError::InvalidExpvOptions` when the Krylov options fail
    ///   their own validation.
    pub fn new(
        rebuild: RebuildPolicy, archive: bool, debug_segments: bool, floor: f64, expv: ExpvOptions,
    ) -> LikelihoodResult<Self> {
        let opts = BackwardOptions { rebuild, archive, debug_segments, floor, expv };
        opts.validate()?;
        Ok(opts)
    }

    /// Re-check invariants (useful after deserialization).
    pub fn validate(&self) -> LikelihoodResult<()> {
        if !self.floor.is_finite() || self.floor <= 0.0 || self.floor >= 1.0 {
            return Err(LikelihoodError::InvalidFloor { value: self.floor });
        }
        self.expv.validate().map_err(|reason| LikelihoodError::InvalidExpvOptions { reason })
    }

    pub fn with_rebuild(mut self, rebuild: RebuildPolicy) -> Self {
        self.rebuild = rebuild;
        self
    }

    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_debug_segments(mut self, debug_segments: bool) -> Self {
        self.debug_segments = debug_segments;
        self
    }

    /// Replace the floor; validated.
    pub fn with_floor(mut self, floor: f64) -> LikelihoodResult<Self> {
        self.floor = floor;
        self.validate()?;
        Ok(self)
    }

    /// Replace the Krylov options; validated.
    pub fn with_expv(mut self, expv: ExpvOptions) -> LikelihoodResult<Self> {
        self.expv = expv;
        self.validate()?;
        Ok(self)
    }
}
