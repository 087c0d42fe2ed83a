//! Backward likelihood engine — reverse pass over a dwell trajectory.
//!
//! Purpose
//! -------
//! Compute `log10 L` of a class-labeled dwell trajectory under an aggregated
//! kinetic model by running the beta recursion from the last segment to the
//! first, rescaling after every step, and folding the initial distribution
//! into the first beta.
//!
//! Key behaviors
//! -------------
//! The pass is a small state machine:
//!
//! - **init**: build the rate matrix at the trajectory end time, validate the
//!   boundary distributions, and rescale the terminal vector (this seeds the
//!   scaling set).
//! - **per segment** `k = last..=0`: optionally rebuild at the segment's
//!   cumulative start time (see [`RebuildPolicy`]), extract `Q_aa` and
//!   `Q_ab` (`None` for the last segment), run the diagonal or general step
//!   strategy, reject non-finite output, rescale, and archive.
//! - **finalize**: `p_0 · β_0` aligned by hidden-state id, rescaled as a
//!   one-element vector into the same scaling set.
//! - **done**: `log10 L = -Σ log10 c_i`, floored at `log10(floor)`.
//!
//! A failing step moves the pass to a terminal failed state: diagnostics are
//! recorded to the sink (the offending matrices and vector, plus the archived
//! vectors when archiving is on) and the error is returned. Nothing is
//! retried.
//!
//! Invariants & assumptions
//! ------------------------
//! - Each pass owns its organizer, scaling set, and archive; the engine
//!   itself is immutable and can be shared across threads.
//! - Beta vectors are ordered like the partition's member list of their
//!   class.
//!
//! Conventions
//! -----------
//! - Logging: `debug` at pass start and end, `trace` per segment, `warn`
//!   from the scaling set on floor hits, `error` on fatal failures.
//!
//! Testing notes
//! -------------
//! - Unit tests check closed-form two-state likelihoods, the scaling
//!   invariant, rebuild policies on a time-varying model, and the failure
//!   path with a [`MemorySink`](crate::likelihood::core::diagnostics::MemorySink).
//! - The seed four-state scenario lives in `tests/`.
use crate::likelihood::{
    backward::{
        organizer::RateMatrixOrganizer,
        prediction::{BackwardOutcome, LikelihoodPrediction},
        step::{DiagonalStep, GeneralStep, StepInput, StepStrategy},
    },
    core::{
        archive::BackwardArchive,
        diagnostics::{DiagnosticArtifact, DiagnosticsSink, NoopSink, matrix_rows, vector_values},
        options::{BackwardOptions, RebuildPolicy},
        scaling::{ScalingFactorSet, StepKey},
        trajectory::Trajectory,
        vectors::{StateVector, validate_distribution},
    },
    errors::{LikelihoodError, LikelihoodResult},
    models::traits::AggregatedKineticModel,
};
use ndarray::Array1;
use tracing::{debug, error, trace};

/// Backward (beta) recursion likelihood engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackwardLikelihood {
    options: BackwardOptions,
    general: GeneralStep,
    diagonal: DiagonalStep,
}

impl Default for BackwardLikelihood {
    fn default() -> Self {
        let options = BackwardOptions::default();
        BackwardLikelihood { options, general: GeneralStep::new(options.expv), diagonal: DiagonalStep }
    }
}

impl BackwardLikelihood {
    /// Engine with validated `options`.
    pub fn new(options: BackwardOptions) -> LikelihoodResult<Self> {
        options.validate()?;
        Ok(BackwardLikelihood { options, general: GeneralStep::new(options.expv), diagonal: DiagonalStep })
    }

    pub fn options(&self) -> &BackwardOptions {
        &self.options
    }

    /// `log10 L` of `trajectory` under `model`, discarding diagnostics.
    pub fn predict_data<M>(&self, model: &M, trajectory: &Trajectory) -> LikelihoodResult<LikelihoodPrediction>
    where
        M: AggregatedKineticModel + ?Sized,
    {
        self.predict_with_sink(model, trajectory, &mut NoopSink)
    }

    /// `log10 L`, reporting debug and failure artifacts to `sink`.
    pub fn predict_with_sink<M>(
        &self, model: &M, trajectory: &Trajectory, sink: &mut dyn DiagnosticsSink,
    ) -> LikelihoodResult<LikelihoodPrediction>
    where
        M: AggregatedKineticModel + ?Sized,
    {
        Ok(self.compute_backward_vectors(model, trajectory, sink)?.prediction)
    }

    /// Full outcome with archiving forced on, regardless of the options.
    pub fn predict_with_diagnostics<M>(
        &self, model: &M, trajectory: &Trajectory, sink: &mut dyn DiagnosticsSink,
    ) -> LikelihoodResult<BackwardOutcome>
    where
        M: AggregatedKineticModel + ?Sized,
    {
        let engine = BackwardLikelihood { options: self.options.with_archive(true), ..*self };
        engine.compute_backward_vectors(model, trajectory, sink)
    }

    /// Run one backward pass.
    ///
    /// Errors
    /// ------
    /// - Model and validation errors from the collaborators.
    /// - `DimensionMismatch` for incompatible blocks or boundary vectors.
    /// - `ExponentiationFailure` / `NonDiagonalBlock` from the step strategy.
    /// - `NonFiniteResult` when a beta vector contains NaN/±inf.
    pub fn compute_backward_vectors<M>(
        &self, model: &M, trajectory: &Trajectory, sink: &mut dyn DiagnosticsSink,
    ) -> LikelihoodResult<BackwardOutcome>
    where
        M: AggregatedKineticModel + ?Sized,
    {
        let opts = &self.options;
        let floor = opts.floor;
        let mut scaling = ScalingFactorSet::new();
        let mut archive = BackwardArchive::default();

        // ---- init ----
        let mut organizer = RateMatrixOrganizer::new(model);
        let end_time = trajectory.end_time();
        let built = organizer.build(end_time)?;
        if opts.archive {
            archive.matrices.push(end_time, built.view().to_owned());
        }

        let partition = model.partition();
        let n_states = partition.n_states();
        let initial = model.initial_probability_vector();
        validate_distribution(initial.view(), n_states, "initial")?;
        let mut terminal = model.final_probability_vector();
        validate_distribution(terminal.view(), n_states, "final")?;
        scaling.scale_vector(StepKey::Terminal, &mut terminal, floor);
        if opts.archive {
            archive.vectors.push(StepKey::Terminal, end_time, Some((0..n_states).collect()), terminal);
        }

        let rebuild = opts.rebuild.rebuilds_per_segment(model.is_time_dependent());
        debug!(
            segments = trajectory.len(),
            n_states,
            end_time,
            rebuild_per_segment = rebuild,
            "starting backward pass"
        );

        // ---- per segment ----
        let mut beta_next: Option<StateVector> = None;
        for ((k, segment), &start) in trajectory.reverse_iter().zip(trajectory.start_times().iter().rev()) {
            let class = segment.class();
            let duration = segment.duration();
            let next_class = trajectory.segment(k + 1).map(|s| s.class());

            if rebuild {
                let built = organizer.build(start)?;
                if opts.archive {
                    archive.matrices.push(start, built.view().to_owned());
                }
            }

            let q_aa = organizer.submatrix(Some(class), Some(class))?.ok_or(LikelihoodError::RateMatrixNotBuilt)?;
            let q_ab = organizer.submatrix(Some(class), next_class)?;
            let strategy: &dyn StepStrategy =
                if model.has_diagonal_block(class) { &self.diagonal } else { &self.general };
            let input = StepInput {
                segment: k,
                class,
                duration,
                q_aa: q_aa.view(),
                q_ab: q_ab.as_ref().map(|m| m.view()),
                beta_next: beta_next.as_ref().map(|b| b.values()),
                floor,
                debug: opts.debug_segments,
            };

            let mut beta = match strategy.compute_backward_vector(&input, &mut *sink) {
                Ok(beta) => beta,
                Err(err) => {
                    error!(segment = k, %class, duration, error = %err, "backward step failed");
                    if opts.archive {
                        sink.record(DiagnosticArtifact::ArchivedVectors { rows: archive.vectors.to_rows() });
                    }
                    return Err(err);
                }
            };

            if beta.iter().any(|x| !x.is_finite()) {
                error!(segment = k, %class, duration, "non-finite beta vector");
                sink.record(DiagnosticArtifact::NonFinite {
                    segment: k,
                    class,
                    duration,
                    q_aa: matrix_rows(q_aa.view()),
                    q_ab: q_ab.as_ref().map(|m| matrix_rows(m.view())),
                    beta: vector_values(beta.view()),
                });
                if opts.archive {
                    sink.record(DiagnosticArtifact::ArchivedVectors { rows: archive.vectors.to_rows() });
                }
                return Err(LikelihoodError::NonFiniteResult { segment: k, class });
            }

            let factor = scaling.scale_vector(StepKey::Segment(k), &mut beta, floor);
            trace!(segment = k, %class, duration, start, factor, "backward step");

            let members = partition.members(class)?.to_vec();
            if opts.archive {
                archive.vectors.push(StepKey::Segment(k), start, Some(members.clone()), beta.clone());
            }
            beta_next = Some(StateVector::new(members, beta)?);
        }

        // ---- finalize ----
        let beta_first = beta_next.ok_or(LikelihoodError::EmptyTrajectory)?;
        let total = StateVector::full(initial).aligned_dot(&beta_first)?;
        let mut folded = Array1::from_elem(1, total);
        scaling.scale_vector(StepKey::Initial, &mut folded, floor);
        if opts.archive {
            archive.vectors.push(StepKey::Initial, 0.0, None, folded);
        }

        // ---- done ----
        let log_likelihood = scaling.log10_likelihood(floor);
        debug!(segments = trajectory.len(), log_likelihood, "finished backward pass");

        Ok(BackwardOutcome { prediction: LikelihoodPrediction::new(log_likelihood), scaling, archive })
    }
}

impl From<RebuildPolicy> for BackwardLikelihood {
    fn from(rebuild: RebuildPolicy) -> Self {
        let options = BackwardOptions::default().with_rebuild(rebuild);
        BackwardLikelihood { options, general: GeneralStep::new(options.expv), diagonal: DiagonalStep }
    }
}
