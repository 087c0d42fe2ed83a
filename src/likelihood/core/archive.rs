//! Archives of intermediate backward-pass state.
//!
//! When archiving is enabled the engine keeps every scaled vector (keyed by
//! [`StepKey`] and time) and every rate matrix it built. The archive is
//! returned with the prediction and, on failure, flattened into rows for the
//! diagnostics sink.
use crate::likelihood::core::scaling::StepKey;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// One scaled vector of a pass.
///
/// `states` holds the hidden-state id of each entry; it is `None` for the
/// scalar initial-distribution fold.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedVector {
    pub key: StepKey,
    pub time: f64,
    pub states: Option<Vec<usize>>,
    pub values: Array1<f64>,
}

/// Flattened archive entry: one value of one vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRow {
    pub time: f64,
    pub step: StepKey,
    pub state: Option<usize>,
    pub value: f64,
}

/// Scaled vectors in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorTrajectory {
    entries: Vec<ArchivedVector>,
}

impl VectorTrajectory {
    pub fn new() -> Self {
        VectorTrajectory { entries: Vec::new() }
    }

    pub fn push(&mut self, key: StepKey, time: f64, states: Option<Vec<usize>>, values: Array1<f64>) {
        self.entries.push(ArchivedVector { key, time, states, values });
    }

    pub fn get(&self, key: StepKey) -> Option<&ArchivedVector> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchivedVector> + '_ {
        self.entries.iter()
    }

    /// One row per stored value, in insertion order.
    pub fn to_rows(&self) -> Vec<ArchiveRow> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry.values.iter().enumerate().map(move |(i, &value)| ArchiveRow {
                    time: entry.time,
                    step: entry.key,
                    state: entry.states.as_ref().and_then(|s| s.get(i).copied()),
                    value,
                })
            })
            .collect()
    }
}

/// A full rate matrix and the time it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedMatrix {
    pub time: f64,
    pub matrix: Array2<f64>,
}

/// Rate matrices in build order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateMatrixTrajectory {
    entries: Vec<ArchivedMatrix>,
}

impl RateMatrixTrajectory {
    pub fn new() -> Self {
        RateMatrixTrajectory { entries: Vec::new() }
    }

    pub fn push(&mut self, time: f64, matrix: Array2<f64>) {
        self.entries.push(ArchivedMatrix { time, matrix });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchivedMatrix> + '_ {
        self.entries.iter()
    }

    /// Most recently built matrix.
    pub fn last(&self) -> Option<&ArchivedMatrix> {
        self.entries.last()
    }
}

/// Everything archived during one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackwardArchive {
    pub vectors: VectorTrajectory,
    pub matrices: RateMatrixTrajectory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Rows carry time, step, and state id; the scalar fold has no state.
    fn flattens_to_rows() {
        let mut vectors = VectorTrajectory::new();
        vectors.push(StepKey::Segment(1), 2.5, Some(vec![0, 2]), array![0.25, 0.75]);
        vectors.push(StepKey::Initial, 0.0, None, array![1.0]);

        let rows = vectors.to_rows();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], ArchiveRow { time: 2.5, step: StepKey::Segment(1), state: Some(2), value: 0.75 });
        assert_eq!(rows[2].state, None);
        assert_eq!(vectors.get(StepKey::Initial).unwrap().values, array![1.0]);
        assert!(vectors.get(StepKey::Terminal).is_none());
    }

    #[test]
    fn matrices_keep_build_order() {
        let mut matrices = RateMatrixTrajectory::new();
        matrices.push(3.0, array![[-1.0, 1.0], [0.0, 0.0]]);
        matrices.push(1.0, array![[-2.0, 2.0], [0.0, 0.0]]);

        let times: Vec<f64> = matrices.iter().map(|m| m.time).collect();

        assert_eq!(times, vec![3.0, 1.0]);
        assert_eq!(matrices.last().unwrap().matrix[[0, 0]], -2.0);
    }
}
