//! Dwell trajectories: validated sequences of class-labeled segments.
//!
//! Purpose
//! -------
//! Provide the read-only trajectory collaborator consumed by the backward
//! engine: ordered segments with strictly positive durations, reverse
//! iteration, and cumulative start times.
//!
//! Key behaviors
//! -------------
//! - [`Trajectory::new`] enforces non-emptiness and finite, strictly positive
//!   durations, and precomputes cumulative start times.
//! - [`Trajectory::reverse_iter`] yields `(index, &Segment)` from the last
//!   segment to the first, the order of the backward recursion.
//!
//! Invariants & assumptions
//! ------------------------
//! - `segments.len() > 0`.
//! - Every duration is finite and `> 0`, in the same time units as the rate
//!   constants of the model.
//! - `cumulative_time(i) = Σ_{j < i} duration_j`, so `cumulative_time(0) = 0`
//!   and `end_time() = Σ_j duration_j`.
//!
//! Conventions
//! -----------
//! - Index 0 is the earliest segment.
//! - Parsing trajectory files is outside this crate; callers build segments
//!   from whatever source they use.
use crate::likelihood::{
    core::classes::ObservableClass,
    errors::{LikelihoodError, LikelihoodResult},
};
use serde::{Deserialize, Serialize};

/// One dwell: an observable class held for `duration` time units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    class: ObservableClass,
    duration: f64,
}

impl Segment {
    pub fn new(class: ObservableClass, duration: f64) -> Self {
        Segment { class, duration }
    }

    pub fn class(&self) -> ObservableClass {
        self.class
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// `Trajectory` — validated, immutable sequence of dwell segments.
///
/// Fields
/// ------
/// - `segments`: dwell segments in temporal order.
/// - `start_times`: cumulative start time of each segment.
///
/// Invariants
/// ----------
/// - Non-empty; all durations finite and strictly positive.
/// - `start_times.len() == segments.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    segments: Vec<Segment>,
    start_times: Vec<f64>,
}

impl Trajectory {
    /// Construct a validated trajectory.
    ///
    /// Errors
    /// ------
    /// - `LikelihoodError::EmptyTrajectory` when `segments` is empty.
    /// - `LikelihoodError::InvalidDuration { index, value }` for the first
    ///   duration that is non-finite or `<= 0`.
    pub fn new(segments: Vec<Segment>) -> LikelihoodResult<Self> {
        if segments.is_empty() {
            return Err(LikelihoodError::EmptyTrajectory);
        }

        let mut start_times = Vec::with_capacity(segments.len());
        let mut elapsed = 0.0;
        for (index, segment) in segments.iter().enumerate() {
            let value = segment.duration;
            if !value.is_finite() || value <= 0.0 {
                return Err(LikelihoodError::InvalidDuration { index, value });
            }
            start_times.push(elapsed);
            elapsed += value;
        }

        Ok(Trajectory { segments, start_times })
    }

    /// Build from `(class, duration)` pairs.
    pub fn from_pairs<I>(pairs: I) -> LikelihoodResult<Self>
    where
        I: IntoIterator<Item = (ObservableClass, f64)>,
    {
        Trajectory::new(pairs.into_iter().map(|(class, duration)| Segment::new(class, duration)).collect())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a constructed trajectory; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment at `index`, or `None` past the end.
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn last_index(&self) -> usize {
        self.segments.len() - 1
    }

    /// Cumulative start time of segment `index` (`None` past the end).
    pub fn cumulative_time(&self, index: usize) -> Option<f64> {
        self.start_times.get(index).copied()
    }

    /// Cumulative start times of all segments, in trajectory order.
    pub fn start_times(&self) -> &[f64] {
        &self.start_times
    }

    /// Total observed time.
    pub fn end_time(&self) -> f64 {
        self.start_times[self.last_index()] + self.segments[self.last_index()].duration
    }

    /// Iterate `(index, segment)` from the last segment to the first.
    pub fn reverse_iter(&self) -> impl Iterator<Item = (usize, &Segment)> + '_ {
        self.segments.iter().enumerate().rev()
    }
}
