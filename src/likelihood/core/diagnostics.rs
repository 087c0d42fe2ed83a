//! Diagnostics sinks — where a backward pass reports its debug and failure
//! artifacts.
//!
//! Purpose
//! -------
//! Decouple the engine from any fixed debug directory. The engine builds a
//! [`DiagnosticArtifact`] (matrices, vectors, durations, archived rows) and
//! hands it to an injected [`DiagnosticsSink`]; the sink decides whether to
//! drop it, keep it in memory, log it, or write it to disk.
//!
//! Key behaviors
//! -------------
//! - [`NoopSink`] discards everything (the default for plain predictions and
//!   batch evaluation).
//! - [`MemorySink`] keeps artifacts for inspection by the caller or tests.
//! - [`TracingSink`] logs each artifact at `warn` level as JSON.
//! - [`FileSink`] writes one pretty-printed JSON file per artifact into a
//!   caller-chosen directory, named `{NNN}_{kind}.json`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Recording never fails from the engine's point of view: the file sink
//!   logs I/O and serialization errors and carries on.
//! - Non-finite values serialize as JSON `null`.
//!
//! Testing notes
//! -------------
//! - The file sink is tested against a `tempfile` directory; engine tests use
//!   [`MemorySink`] to check which artifacts a failure produces.
use crate::likelihood::core::{archive::ArchiveRow, classes::ObservableClass};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::warn;

/// A debug or failure record produced by a backward pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticArtifact {
    /// Inputs of one segment step, recorded when segment debugging is on.
    SegmentDebug {
        segment: usize,
        class: ObservableClass,
        duration: f64,
        q_aa: Vec<Vec<f64>>,
        q_ab: Option<Vec<Vec<f64>>>,
        target: Vec<f64>,
    },
    /// Inputs of a step whose exponential action failed.
    Exponentiation {
        segment: usize,
        class: ObservableClass,
        duration: f64,
        q_aa: Vec<Vec<f64>>,
        q_ab: Option<Vec<Vec<f64>>>,
        target: Vec<f64>,
        reason: String,
    },
    /// A step whose beta vector came out NaN/±inf.
    NonFinite {
        segment: usize,
        class: ObservableClass,
        duration: f64,
        q_aa: Vec<Vec<f64>>,
        q_ab: Option<Vec<Vec<f64>>>,
        beta: Vec<f64>,
    },
    /// The archived vectors up to the failing step.
    ArchivedVectors { rows: Vec<ArchiveRow> },
}

impl DiagnosticArtifact {
    /// Short snake-case tag, also used in file names.
    pub fn kind(&self) -> &'static str {
        match self {
            DiagnosticArtifact::SegmentDebug { .. } => "segment_debug",
            DiagnosticArtifact::Exponentiation { .. } => "exponentiation",
            DiagnosticArtifact::NonFinite { .. } => "non_finite",
            DiagnosticArtifact::ArchivedVectors { .. } => "archived_vectors",
        }
    }
}

/// Destination for diagnostic artifacts.
pub trait DiagnosticsSink {
    fn record(&mut self, artifact: DiagnosticArtifact);
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut S {
    fn record(&mut self, artifact: DiagnosticArtifact) {
        (**self).record(artifact)
    }
}

/// Discards every artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn record(&mut self, _artifact: DiagnosticArtifact) {}
}

/// Keeps artifacts in memory, in recording order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub artifacts: Vec<DiagnosticArtifact>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink { artifacts: Vec::new() }
    }

    /// Artifacts of the given kind.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a DiagnosticArtifact> + 'a {
        self.artifacts.iter().filter(move |a| a.kind() == kind)
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&mut self, artifact: DiagnosticArtifact) {
        self.artifacts.push(artifact);
    }
}

/// Logs artifacts through `tracing` at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&mut self, artifact: DiagnosticArtifact) {
        match serde_json::to_string(&artifact) {
            Ok(json) => warn!(kind = artifact.kind(), artifact = %json, "backward diagnostics"),
            Err(err) => warn!(kind = artifact.kind(), error = %err, "could not serialize diagnostics"),
        }
    }
}

/// Writes each artifact to `{dir}/{NNN}_{kind}.json`.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    counter: usize,
}

impl FileSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileSink { dir, counter: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, path: &Path, artifact: &DiagnosticArtifact) -> Result<(), String> {
        let file = File::create(path).map_err(|e| e.to_string())?;
        serde_json::to_writer_pretty(BufWriter::new(file), artifact).map_err(|e| e.to_string())
    }
}

impl DiagnosticsSink for FileSink {
    fn record(&mut self, artifact: DiagnosticArtifact) {
        let path = self.dir.join(format!("{:03}_{}.json", self.counter, artifact.kind()));
        self.counter += 1;
        if let Err(error) = self.write(&path, &artifact) {
            warn!(path = %path.display(), %error, "failed to write diagnostics artifact");
        }
    }
}

// ---- Helpers ----

/// Row-major copy of a matrix view.
pub fn matrix_rows(m: ArrayView2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|row| row.to_vec()).collect()
}

pub fn vector_values(v: ArrayView1<f64>) -> Vec<f64> {
    v.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::likelihood::core::scaling::StepKey;
    use ndarray::array;

    fn non_finite() -> DiagnosticArtifact {
        DiagnosticArtifact::NonFinite {
            segment: 2,
            class: ObservableClass::Dark,
            duration: 9.0,
            q_aa: matrix_rows(array![[800.0]].view()),
            q_ab: None,
            beta: vec![f64::INFINITY],
        }
    }

    #[test]
    // Purpose
    // -------
    // The memory sink keeps artifacts in order and filters by kind.
    fn memory_sink_records_in_order() {
        let mut sink = MemorySink::new();
        sink.record(non_finite());
        sink.record(DiagnosticArtifact::ArchivedVectors {
            rows: vec![ArchiveRow { time: 0.0, step: StepKey::Initial, state: None, value: 1.0 }],
        });

        assert_eq!(sink.artifacts.len(), 2);
        assert_eq!(sink.of_kind("archived_vectors").count(), 1);
        assert_eq!(sink.artifacts[0].kind(), "non_finite");
    }

    #[test]
    // Purpose
    // -------
    // The file sink writes numbered JSON files; non-finite values become
    // `null`.
    //
    // Given
    // -----
    // - A fresh temporary directory and two artifacts.
    //
    // Expect
    // ------
    // - `000_non_finite.json` and `001_archived_vectors.json` exist and parse
    //   back as JSON with the `kind` tag.
    fn file_sink_writes_numbered_json() {
        // Arrange
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(tmp.path().join("dump")).unwrap();

        // Act
        sink.record(non_finite());
        sink.record(DiagnosticArtifact::ArchivedVectors { rows: vec![] });

        // Assert
        let first = fs::read_to_string(sink.dir().join("000_non_finite.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["kind"], "non_finite");
        assert_eq!(value["segment"], 2);
        assert!(value["beta"][0].is_null());
        assert!(sink.dir().join("001_archived_vectors.json").exists());
    }
}
