//! Ready-made models: a fixed generator matrix and a time-varying builder.
//!
//! Purpose
//! -------
//! Provide the two model shapes most callers need without an external model
//! layer. [`GeneratorModel`] wraps a validated, time-independent generator.
//! [`TimeVaryingModel`] wraps a callback that builds the matrix for a given
//! time and validates each result.
//!
//! Key behaviors
//! -------------
//! - Construction validates the generator structure, the partition size, and
//!   the boundary distributions, so a model that constructs can be handed to
//!   the engine directly.
//! - Diagonal within-class blocks are declared per class with
//!   `with_diagonal_class`; nothing is inferred from the matrix.
//!
//! Invariants & assumptions
//! ------------------------
//! - Generator rows sum to zero within [`GENERATOR_TOL`] and off-diagonal
//!   rates are non-negative.
//! - `partition.n_states()` equals the matrix dimension.
use crate::likelihood::{
    core::{
        classes::ObservableClass,
        rate_matrix::{GENERATOR_TOL, RateMatrix, StatePartition},
        vectors::validate_distribution,
    },
    errors::{LikelihoodError, LikelihoodResult},
    models::traits::AggregatedKineticModel,
};
use ndarray::{Array1, Array2};
use std::collections::BTreeSet;

/// Shared boundary data of the provided models.
#[derive(Debug, Clone, PartialEq)]
struct Boundary {
    partition: StatePartition,
    initial: Array1<f64>,
    terminal: Option<Array1<f64>>,
    diagonal_classes: BTreeSet<ObservableClass>,
}

impl Boundary {
    fn new(partition: StatePartition, initial: Array1<f64>) -> LikelihoodResult<Self> {
        validate_distribution(initial.view(), partition.n_states(), "initial")?;
        Ok(Boundary { partition, initial, terminal: None, diagonal_classes: BTreeSet::new() })
    }

    fn set_terminal(&mut self, terminal: Array1<f64>) -> LikelihoodResult<()> {
        validate_distribution(terminal.view(), self.partition.n_states(), "final")?;
        self.terminal = Some(terminal);
        Ok(())
    }

    fn terminal_or_uniform(&self) -> Array1<f64> {
        match &self.terminal {
            Some(p) => p.clone(),
            None => {
                let n = self.partition.n_states();
                Array1::from_elem(n, 1.0 / n as f64)
            }
        }
    }
}

fn checked_generator(matrix: Array2<f64>, partition: &StatePartition) -> LikelihoodResult<RateMatrix> {
    let rate_matrix = RateMatrix::new(matrix)?;
    if rate_matrix.n_states() != partition.n_states() {
        return Err(LikelihoodError::DimensionMismatch {
            context: "rate matrix vs partition",
            expected: partition.n_states(),
            actual: rate_matrix.n_states(),
        });
    }
    rate_matrix.validate_generator(GENERATOR_TOL)?;
    Ok(rate_matrix)
}

/// Time-independent model backed by one validated generator matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorModel {
    rate_matrix: RateMatrix,
    boundary: Boundary,
}

impl GeneratorModel {
    /// Validate and wrap a generator.
    ///
    /// Errors
    /// ------
    /// - `InvalidRateMatrix` for non-square, non-finite, or non-generator
    ///   matrices.
    /// - `DimensionMismatch` when the partition or `initial` has the wrong
    ///   length.
    /// - `InvalidDistribution` when `initial` is not a distribution.
    pub fn new(
        matrix: Array2<f64>, partition: StatePartition, initial: Array1<f64>,
    ) -> LikelihoodResult<Self> {
        let rate_matrix = checked_generator(matrix, &partition)?;
        let boundary = Boundary::new(partition, initial)?;
        Ok(GeneratorModel { rate_matrix, boundary })
    }

    /// Use `terminal` instead of the uniform distribution to seed the pass.
    pub fn with_final_distribution(mut self, terminal: Array1<f64>) -> LikelihoodResult<Self> {
        self.boundary.set_terminal(terminal)?;
        Ok(self)
    }

    /// Declare the within-class block of `class` diagonal.
    pub fn with_diagonal_class(mut self, class: ObservableClass) -> Self {
        self.boundary.diagonal_classes.insert(class);
        self
    }

    pub fn rate_matrix(&self) -> &RateMatrix {
        &self.rate_matrix
    }
}

impl AggregatedKineticModel for GeneratorModel {
    fn partition(&self) -> &StatePartition {
        &self.boundary.partition
    }

    fn build_rate_matrix(&self, _time: f64) -> LikelihoodResult<RateMatrix> {
        Ok(self.rate_matrix.clone())
    }

    fn initial_probability_vector(&self) -> Array1<f64> {
        self.boundary.initial.clone()
    }

    fn final_probability_vector(&self) -> Array1<f64> {
        self.boundary.terminal_or_uniform()
    }

    fn has_diagonal_block(&self, class: ObservableClass) -> bool {
        self.boundary.diagonal_classes.contains(&class)
    }

    fn is_time_dependent(&self) -> bool {
        false
    }
}

/// Model whose generator is produced by a callback for each time.
pub struct TimeVaryingModel<F>
where
    F: Fn(f64) -> Array2<f64>,
{
    builder: F,
    boundary: Boundary,
}

impl<F> TimeVaryingModel<F>
where
    F: Fn(f64) -> Array2<f64>,
{
    /// Wrap `builder`; each built matrix is validated as a generator.
    pub fn new(builder: F, partition: StatePartition, initial: Array1<f64>) -> LikelihoodResult<Self> {
        Ok(TimeVaryingModel { builder, boundary: Boundary::new(partition, initial)? })
    }

    pub fn with_final_distribution(mut self, terminal: Array1<f64>) -> LikelihoodResult<Self> {
        self.boundary.set_terminal(terminal)?;
        Ok(self)
    }

    pub fn with_diagonal_class(mut self, class: ObservableClass) -> Self {
        self.boundary.diagonal_classes.insert(class);
        self
    }
}

impl<F> AggregatedKineticModel for TimeVaryingModel<F>
where
    F: Fn(f64) -> Array2<f64>,
{
    fn partition(&self) -> &StatePartition {
        &self.boundary.partition
    }

    fn build_rate_matrix(&self, time: f64) -> LikelihoodResult<RateMatrix> {
        checked_generator((self.builder)(time), &self.boundary.partition)
    }

    fn initial_probability_vector(&self) -> Array1<f64> {
        self.boundary.initial.clone()
    }

    fn final_probability_vector(&self) -> Array1<f64> {
        self.boundary.terminal_or_uniform()
    }

    fn has_diagonal_block(&self, class: ObservableClass) -> bool {
        self.boundary.diagonal_classes.contains(&class)
    }
}
