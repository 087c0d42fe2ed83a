//! likelihood::core — value types shared by the backward likelihood engine.
//!
//! Purpose
//! -------
//! Hold the data model of the backward recursion: observable classes,
//! validated trajectories, rate matrices and their class partition,
//! state-indexed vectors, scaling factors, pass configuration, archives, and
//! diagnostics sinks. Nothing in here runs a recursion; the engine in
//! [`crate::likelihood::backward`] composes these pieces.
//!
//! Conventions
//! -----------
//! - Segment indices are 0-based in temporal order.
//! - Beta vectors are ordered like the member states of their class in the
//!   [`rate_matrix::StatePartition`].
pub mod archive;
pub mod classes;
pub mod diagnostics;
pub mod options;
pub mod rate_matrix;
pub mod scaling;
pub mod trajectory;
pub mod vectors;

pub use self::archive::{ArchiveRow, BackwardArchive, RateMatrixTrajectory, VectorTrajectory};
pub use self::classes::ObservableClass;
pub use self::diagnostics::{
    DiagnosticArtifact, DiagnosticsSink, FileSink, MemorySink, NoopSink, TracingSink,
};
pub use self::options::{BackwardOptions, RebuildPolicy};
pub use self::rate_matrix::{RateMatrix, StatePartition};
pub use self::scaling::{ALMOST_ZERO, ScalingFactorSet, StepKey};
pub use self::trajectory::{Segment, Trajectory};
pub use self::vectors::StateVector;
