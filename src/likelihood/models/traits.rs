//! The model collaborator consumed by the backward engine.
//!
//! Purpose
//! -------
//! Describe what the backward recursion needs from an aggregated kinetic
//! model: the class partition of its hidden states, a rate matrix at a given
//! time, the boundary probability vectors, and which classes have a diagonal
//! within-class block. How the rate matrix is derived from rate constants is
//! up to the implementor.
//!
//! Key behaviors
//! -------------
//! - `final_probability_vector` defaults to the uniform distribution.
//! - `submatrix` defaults to slicing the matrix by the partition's member
//!   lists; models with a cheaper block layout may override it.
//! - `has_diagonal_block` defaults to `false`; a class is only treated as
//!   diagonal when the model declares it.
//! - `is_time_dependent` defaults to `true`, which keeps
//!   `RebuildPolicy::FromModel` rebuilding unless a model opts out.
//!
//! Invariants & assumptions
//! ------------------------
//! - `build_rate_matrix(t)` returns an `n×n` matrix where
//!   `n = partition().n_states()`.
//! - Boundary vectors have length `n` and are probability distributions.
use crate::likelihood::{
    core::{
        classes::ObservableClass,
        rate_matrix::{RateMatrix, StatePartition},
    },
    errors::LikelihoodResult,
};
use ndarray::{Array1, Array2};

/// Aggregated kinetic model: a CTMC whose hidden states are observed only
/// through their class.
pub trait AggregatedKineticModel {
    /// Hidden state → observable class map.
    fn partition(&self) -> &StatePartition;

    /// Rate matrix at time `time`.
    fn build_rate_matrix(&self, time: f64) -> LikelihoodResult<RateMatrix>;

    /// Distribution of the hidden state at the start of the trajectory.
    fn initial_probability_vector(&self) -> Array1<f64>;

    /// Distribution that seeds the backward pass at the trajectory end.
    fn final_probability_vector(&self) -> Array1<f64> {
        let n = self.partition().n_states();
        Array1::from_elem(n, 1.0 / n as f64)
    }

    /// Whether the within-class block of `class` is diagonal.
    fn has_diagonal_block(&self, _class: ObservableClass) -> bool {
        false
    }

    /// Whether `build_rate_matrix` depends on its time argument.
    fn is_time_dependent(&self) -> bool {
        true
    }

    /// Block of `matrix` from the states of `from` to the states of `to`.
    fn submatrix(
        &self, matrix: &RateMatrix, from: ObservableClass, to: ObservableClass,
    ) -> LikelihoodResult<Array2<f64>> {
        let partition = self.partition();
        Ok(matrix.block(partition.members(from)?, partition.members(to)?))
    }
}
