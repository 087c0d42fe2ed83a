//! Integration tests for the backward likelihood pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path: a trajectory read from a CSV fixture, a
//!   four-state blinking model, and the backward engine, against an
//!   independent forward composition of dense matrix exponentials.
//! - Exercise the failure path with a file-backed diagnostics sink.
//!
//! Coverage
//! --------
//! - `likelihood::core`: `Trajectory`, `StatePartition`, `BackwardOptions`,
//!   `FileSink`, `MemorySink`.
//! - `likelihood::models`: `GeneratorModel` with and without a diagonal dark
//!   block, `TimeVaryingModel`, and a hand-written model.
//! - `likelihood::backward`: `BackwardLikelihood` (all rebuild policies),
//!   `predict_batch`, and `LikelihoodJudge`.
//! - The Krylov route through the engine on a 25-state ladder model, across
//!   time units.
//!
//! Exclusions
//! ----------
//! - Python bindings.
//! - Kernel-level accuracy of `expm`/`expv` (unit tests in `numerics`).
use approx::assert_relative_eq;
use dwell_likelihood::numerics::ExpvOptions;
use dwell_likelihood::likelihood::{
    AggregatedKineticModel, BackwardLikelihood, BackwardOptions, DiagnosticArtifact, FileSink,
    GeneratorModel, LikelihoodError, LikelihoodJudge, MemorySink, ObservableClass, RateMatrix,
    LikelihoodResult, RebuildPolicy, StatePartition, StepKey, TimeVaryingModel, Trajectory,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, array};
use serde::Deserialize;
use std::path::Path;

use ObservableClass::{Bright, Dark};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/short_blink_traj.csv");

#[derive(Debug, Deserialize)]
struct Row {
    class: String,
    duration: f64,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn load_trajectory(path: &Path) -> Trajectory {
    let mut reader = csv::Reader::from_path(path).expect("fixture should open");
    let pairs: Vec<(ObservableClass, f64)> = reader
        .deserialize::<Row>()
        .map(|row| {
            let row = row.expect("fixture rows should parse");
            (row.class.parse().expect("fixture classes should be known"), row.duration)
        })
        .collect();
    Trajectory::from_pairs(pairs).expect("fixture should be a valid trajectory")
}

/// Four-state blinking model over states I, D, B, A.
///
/// I, D, and B are dark; A is bright. I → A at `ka`, D → A at `kr`,
/// A → D at `kd`, A → B at `kb`; B is absorbing.
fn blink_matrix(ka: f64, kd: f64, kr: f64, kb: f64) -> Array2<f64> {
    let mut q = Array2::zeros((4, 4));
    q[[0, 0]] = -ka;
    q[[0, 3]] = ka;
    q[[1, 1]] = -kr;
    q[[1, 3]] = kr;
    q[[3, 1]] = kd;
    q[[3, 2]] = kb;
    q[[3, 3]] = -kd - kb;
    q
}

fn blink_partition() -> StatePartition {
    StatePartition::new(vec![Dark, Dark, Dark, Bright]).unwrap()
}

fn seed_rate() -> f64 {
    10f64.powf(-0.5)
}

fn seed_model() -> GeneratorModel {
    let k = seed_rate();
    GeneratorModel::new(blink_matrix(k, k, k, k), blink_partition(), array![1.0, 0.0, 0.0, 0.0])
        .unwrap()
}

/// Forward composition `p_0 · Π_k exp(Q_kk t_k) Q_k,k+1 · 1` with nalgebra's
/// dense exponential.
fn reference_log10_likelihood(q: &Array2<f64>, traj: &Trajectory) -> f64 {
    fn members(c: ObservableClass) -> &'static [usize] {
        match c {
            Dark => &[0, 1, 2],
            Bright => &[3],
        }
    }
    let block = |a: &[usize], b: &[usize]| -> DMatrix<f64> {
        DMatrix::from_fn(a.len(), b.len(), |i, j| q[[a[i], b[j]]])
    };

    let mut g = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 0.0]);
    for (k, segment) in traj.segments().iter().enumerate() {
        let c = members(segment.class());
        let e = (block(c, c) * segment.duration()).exp();
        g = &g * e;
        if let Some(next) = traj.segment(k + 1) {
            g = &g * block(c, members(next.class()));
        }
    }
    g.sum().log10()
}

#[test]
// Purpose
// -------
// Seed scenario: the engine matches the forward dense composition on the
// fixture trajectory, with and without the diagonal dark block.
//
// Given
// -----
// - `ka = kd = kr = kb = 10^-0.5`, start in I.
// - Seven alternating segments from `tests/data/short_blink_traj.csv`.
//
// Expect
// ------
// - Both strategies within 0.1 of the reference log10-likelihood (and in
//   practice far closer).
fn seed_scenario_matches_dense_reference() {
    // Arrange
    init_tracing();
    let traj = load_trajectory(Path::new(FIXTURE));
    let k = seed_rate();
    let reference = reference_log10_likelihood(&blink_matrix(k, k, k, k), &traj);
    let engine = BackwardLikelihood::default();

    // Act
    let general = engine.predict_data(&seed_model(), &traj).unwrap();
    let diagonal = engine.predict_data(&seed_model().with_diagonal_class(Dark), &traj).unwrap();

    // Assert
    assert_eq!(traj.len(), 7);
    assert!((general.log_likelihood() - reference).abs() < 0.1);
    assert!((diagonal.log_likelihood() - reference).abs() < 0.1);
    assert_relative_eq!(general.log_likelihood(), reference, max_relative = 1e-8);
    assert_relative_eq!(diagonal.log_likelihood(), general.log_likelihood(), max_relative = 1e-8);
    assert!(general.likelihood() > 0.0 && general.likelihood() <= 1.0);
}

#[test]
// Purpose
// -------
// Scaling invariant on the seed scenario and archive bookkeeping.
//
// Expect
// ------
// - `Π c_i · L ≈ 1`.
// - One archived vector per step; segment vectors sum to one.
fn seed_scenario_scaling_invariant() {
    let traj = load_trajectory(Path::new(FIXTURE));
    let mut sink = MemorySink::new();

    let outcome = BackwardLikelihood::default()
        .predict_with_diagnostics(&seed_model(), &traj, &mut sink)
        .unwrap();

    assert_relative_eq!(
        outcome.scaling.compute_product() * outcome.prediction.likelihood(),
        1.0,
        max_relative = 1e-9
    );
    assert_eq!(outcome.scaling.len(), traj.len() + 2);
    assert_eq!(outcome.archive.vectors.len(), traj.len() + 2);
    for k in 0..traj.len() {
        let entry = outcome.archive.vectors.get(StepKey::Segment(k)).unwrap();
        assert_relative_eq!(entry.values.sum(), 1.0, max_relative = 1e-12);
    }
    assert!(sink.artifacts.is_empty());
}

#[test]
// Purpose
// -------
// Degenerate trajectory: one dark dwell reduces to the survival probability
// of the initial dark state.
fn single_dark_segment_is_terminal_only() {
    let k = seed_rate();
    let traj = Trajectory::from_pairs([(Dark, 2.0)]).unwrap();

    let prediction = BackwardLikelihood::default().predict_data(&seed_model(), &traj).unwrap();

    assert_relative_eq!(prediction.log_likelihood(), (-k * 2.0f64).exp().log10(), max_relative = 1e-10);
}

#[test]
// Purpose
// -------
// A static model gives the same answer under every rebuild policy, and a
// constant time-varying model matches the static one.
fn rebuild_policies_agree_for_static_models() {
    let traj = load_trajectory(Path::new(FIXTURE));
    let k = seed_rate();
    let static_model = seed_model();
    let varying = TimeVaryingModel::new(
        move |_t: f64| blink_matrix(k, k, k, k),
        blink_partition(),
        array![1.0, 0.0, 0.0, 0.0],
    )
    .unwrap();

    let results: Vec<f64> = [RebuildPolicy::EverySegment, RebuildPolicy::Once, RebuildPolicy::FromModel]
        .into_iter()
        .flat_map(|policy| {
            let engine = BackwardLikelihood::new(BackwardOptions::default().with_rebuild(policy)).unwrap();
            [
                engine.predict_data(&static_model, &traj).unwrap().log_likelihood(),
                engine.predict_data(&varying, &traj).unwrap().log_likelihood(),
            ]
        })
        .collect();

    for value in &results[1..] {
        assert_relative_eq!(*value, results[0], max_relative = 1e-12);
    }
}

#[test]
// Purpose
// -------
// Batch evaluation over fixture prefixes matches sequential evaluation, and
// the judge score is the negated sum.
fn batch_and_judge_over_fixture_prefixes() {
    let full = load_trajectory(Path::new(FIXTURE));
    let trajectories: Vec<Trajectory> =
        (1..=full.len()).map(|n| Trajectory::new(full.segments()[..n].to_vec()).unwrap()).collect();
    let model = seed_model().with_diagonal_class(Dark);
    let engine = BackwardLikelihood::default();

    let batch = engine.predict_batch(&model, &trajectories);
    let judged = LikelihoodJudge::new(engine).judge(&model, &trajectories).unwrap();

    let sequential: Vec<f64> =
        trajectories.iter().map(|t| engine.predict_data(&model, t).unwrap().log_likelihood()).collect();
    let batched: Vec<f64> = batch.into_iter().map(|r| r.unwrap().log_likelihood()).collect();
    assert_eq!(batched, sequential);
    assert_relative_eq!(judged.score, -sequential.iter().sum::<f64>(), max_relative = 1e-12);
}

/// Blinking model whose dark block has a positive diagonal rate, so a long
/// dark dwell overflows.
struct RunawayDarkModel {
    partition: StatePartition,
    matrix: Array2<f64>,
}

impl RunawayDarkModel {
    fn new() -> Self {
        let k = seed_rate();
        let mut matrix = blink_matrix(k, k, k, k);
        matrix[[0, 0]] = 800.0;
        RunawayDarkModel { partition: blink_partition(), matrix }
    }
}

impl AggregatedKineticModel for RunawayDarkModel {
    fn partition(&self) -> &StatePartition {
        &self.partition
    }

    fn build_rate_matrix(&self, _time: f64) -> LikelihoodResult<RateMatrix> {
        RateMatrix::new(self.matrix.clone())
    }

    fn initial_probability_vector(&self) -> Array1<f64> {
        array![1.0, 0.0, 0.0, 0.0]
    }

    fn has_diagonal_block(&self, class: ObservableClass) -> bool {
        class == Dark
    }
}

#[test]
// Purpose
// -------
// Failure scenario: a dark dwell long enough for the exponential to overflow
// aborts with `NonFiniteResult`, and with archiving the file sink receives
// the offending step and the archived vectors.
//
// Given
// -----
// - Dark self-rate +800 on state I; fixture trajectory (first dark dwell
//   1.2, last dark dwell 3.0).
//
// Expect
// ------
// - `NonFiniteResult` at the last segment (index 6, dark): it is the first
//   one visited and `e^{2400}` overflows.
// - `000_non_finite.json` and `001_archived_vectors.json` in the sink dir.
fn overflowing_dark_dwell_writes_failure_artifacts() {
    // Arrange
    init_tracing();
    let traj = load_trajectory(Path::new(FIXTURE));
    let engine = BackwardLikelihood::new(BackwardOptions::default().with_archive(true)).unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let mut sink = FileSink::new(tmp.path()).unwrap();

    // Act
    let err = engine.predict_with_sink(&RunawayDarkModel::new(), &traj, &mut sink).unwrap_err();

    // Assert
    assert_eq!(err, LikelihoodError::NonFiniteResult { segment: 6, class: Dark });
    assert!(err.is_fatal_recursion_failure());
    let text = std::fs::read_to_string(tmp.path().join("000_non_finite.json")).unwrap();
    let non_finite: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(non_finite["kind"], "non_finite");
    assert_eq!(non_finite["segment"], 6);
    assert!(non_finite["beta"][0].is_null());

    let text = std::fs::read_to_string(tmp.path().join("001_archived_vectors.json")).unwrap();
    let archived: DiagnosticArtifact = serde_json::from_str(&text).unwrap();
    match archived {
        DiagnosticArtifact::ArchivedVectors { rows } => {
            assert_eq!(rows.len(), 4);
            assert!(rows.iter().all(|r| r.step == StepKey::Terminal));
        }
        other => panic!("unexpected artifact: {other:?}"),
    }
}

#[test]
// Purpose
// -------
// A dark block that is declared diagonal but is not is rejected rather
// than truncated.
fn non_diagonal_declared_block_is_rejected() {
    let mut q = blink_matrix(1.0, 1.0, 1.0, 1.0);
    q[[0, 1]] = 0.5;
    q[[0, 0]] = -1.5;
    let model = GeneratorModel::new(q, blink_partition(), array![1.0, 0.0, 0.0, 0.0])
        .unwrap()
        .with_diagonal_class(Dark);
    let traj = Trajectory::from_pairs([(Dark, 1.0), (Bright, 1.0)]).unwrap();

    let err = BackwardLikelihood::default().predict_data(&model, &traj).unwrap_err();

    assert_eq!(err, LikelihoodError::NonDiagonalBlock { class: Dark, row: 0, col: 1, value: 0.5 });
}

/// Ladder model with 20 bright states and 5 dark states, all rates × `scale`.
///
/// Bright states form a birth–death chain (up 1.3, down 0.8); each bright
/// state leaks to one dark state at 0.2. Dark states step along their own
/// chain at 0.4 and return to bright state 0 at 0.6.
fn ladder_model(scale: f64) -> GeneratorModel {
    const BRIGHT: usize = 20;
    const DARK: usize = 5;
    let n = BRIGHT + DARK;
    let mut q = Array2::<f64>::zeros((n, n));
    for i in 0..BRIGHT {
        if i + 1 < BRIGHT {
            q[[i, i + 1]] = 1.3;
        }
        if i > 0 {
            q[[i, i - 1]] = 0.8;
        }
        q[[i, BRIGHT + i % DARK]] = 0.2;
    }
    for j in BRIGHT..n {
        if j + 1 < n {
            q[[j, j + 1]] = 0.4;
        }
        q[[j, 0]] = 0.6;
    }
    for i in 0..n {
        let out: f64 = q.row(i).sum();
        q[[i, i]] = -out;
    }
    q *= scale;

    let mut classes = vec![Bright; BRIGHT];
    classes.extend(std::iter::repeat(Dark).take(DARK));
    let mut initial = Array1::zeros(n);
    initial[0] = 1.0;
    GeneratorModel::new(q, StatePartition::new(classes).unwrap(), initial).unwrap()
}

/// `[(Bright, 8), (Dark, 0.5), (Bright, 12)]` with durations divided by `scale`.
fn ladder_trajectory(scale: f64) -> Trajectory {
    Trajectory::from_pairs([(Bright, 8.0 / scale), (Dark, 0.5 / scale), (Bright, 12.0 / scale)]).unwrap()
}

fn dense_only_engine() -> BackwardLikelihood {
    let expv = ExpvOptions { dense_threshold: usize::MAX, ..ExpvOptions::default() };
    BackwardLikelihood::new(BackwardOptions::default().with_expv(expv).unwrap()).unwrap()
}

#[test]
// Purpose
// -------
// A bright class larger than the dense threshold goes through the Krylov
// route; the engine must agree with a dense-only engine at every rate scale.
//
// Given
// -----
// - Ladder model (20 bright states > default threshold of 16) at rate scales
//   1, 1e-9 (seconds for a nanosecond process) and 1e3.
//
// Expect
// ------
// - Default and dense-only log10-likelihoods agree to 1e-6 relative.
// - The value is well above the floor.
fn krylov_route_matches_dense_route_across_rate_scales() {
    init_tracing();
    let default_engine = BackwardLikelihood::default();
    let dense_engine = dense_only_engine();
    assert!(20 > default_engine.options().expv.dense_threshold);

    for scale in [1.0, 1e-9, 1e3] {
        let model = ladder_model(scale);
        let traj = ladder_trajectory(scale);

        let krylov = default_engine.predict_data(&model, &traj).unwrap().log_likelihood();
        let dense = dense_engine.predict_data(&model, &traj).unwrap().log_likelihood();

        assert_relative_eq!(krylov, dense, max_relative = 1e-6);
        assert!(krylov > -250.0, "scale {scale}: log10 L = {krylov}");
    }
}

#[test]
// Purpose
// -------
// Re-expressing the same process in another time unit only shifts the
// log10-likelihood by the density Jacobian: each of the two transitions
// contributes one factor of the rate scale.
//
// Expect
// ------
// - `log10 L(c) = log10 L(1) + 2 · log10 c` for c = 1e-9 and c = 1e3, to
//   1e-6 absolute.
fn likelihood_tracks_time_unit_change() {
    let engine = BackwardLikelihood::default();
    let unit = engine.predict_data(&ladder_model(1.0), &ladder_trajectory(1.0)).unwrap().log_likelihood();

    for scale in [1e-9, 1e3] {
        let rescaled =
            engine.predict_data(&ladder_model(scale), &ladder_trajectory(scale)).unwrap().log_likelihood();

        assert!((rescaled - (unit + 2.0 * scale.log10())).abs() < 1e-6, "scale {scale}: {rescaled} vs {unit}");
    }
}
