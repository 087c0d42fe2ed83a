//! Rate-matrix organizer — per-pass cache of the model's rate matrix.
//!
//! The organizer owns the most recently built rate matrix of one backward
//! pass and hands out class-to-class blocks. It is created fresh for each
//! pass and never shared, so a batch of passes needs no locking.
use crate::likelihood::{
    core::{classes::ObservableClass, rate_matrix::RateMatrix},
    errors::{LikelihoodError, LikelihoodResult},
    models::traits::AggregatedKineticModel,
};
use ndarray::Array2;

pub struct RateMatrixOrganizer<'m, M: AggregatedKineticModel + ?Sized> {
    model: &'m M,
    current: Option<RateMatrix>,
    built_at: Option<f64>,
}

impl<'m, M: AggregatedKineticModel + ?Sized> RateMatrixOrganizer<'m, M> {
    pub fn new(model: &'m M) -> Self {
        RateMatrixOrganizer { model, current: None, built_at: None }
    }

    /// Ask the model for its rate matrix at `time` and cache it.
    ///
    /// Model errors propagate unchanged. A matrix whose size disagrees with
    /// the model's partition is a `DimensionMismatch`.
    pub fn build(&mut self, time: f64) -> LikelihoodResult<&RateMatrix> {
        let matrix = self.model.build_rate_matrix(time)?;
        let expected = self.model.partition().n_states();
        if matrix.n_states() != expected {
            return Err(LikelihoodError::DimensionMismatch {
                context: "built rate matrix vs partition",
                expected,
                actual: matrix.n_states(),
            });
        }
        self.built_at = Some(time);
        Ok(self.current.insert(matrix))
    }

    /// Block from `from` to `to` of the cached matrix; `None` if either class
    /// is `None`.
    ///
    /// Errors with `RateMatrixNotBuilt` before the first [`build`](Self::build).
    pub fn submatrix(
        &self, from: Option<ObservableClass>, to: Option<ObservableClass>,
    ) -> LikelihoodResult<Option<Array2<f64>>> {
        let matrix = self.current.as_ref().ok_or(LikelihoodError::RateMatrixNotBuilt)?;
        match (from, to) {
            (Some(from), Some(to)) => self.model.submatrix(matrix, from, to).map(Some),
            _ => Ok(None),
        }
    }

    /// Time passed to the most recent build.
    pub fn built_at(&self) -> Option<f64> {
        self.built_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::likelihood::{core::rate_matrix::StatePartition, models::GeneratorModel};
    use ndarray::array;
    use ObservableClass::{Bright, Dark};

    fn model() -> GeneratorModel {
        GeneratorModel::new(
            array![[-1.0, 0.0, 1.0], [0.0, -2.0, 2.0], [3.0, 4.0, -7.0]],
            StatePartition::new(vec![Dark, Dark, Bright]).unwrap(),
            array![1.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Submatrices need a prior build; a `None` class yields `None`.
    fn submatrix_requires_build_and_handles_none() {
        let model = model();
        let mut organizer = RateMatrixOrganizer::new(&model);

        assert_eq!(
            organizer.submatrix(Some(Dark), Some(Dark)).unwrap_err(),
            LikelihoodError::RateMatrixNotBuilt
        );

        organizer.build(4.0).unwrap();

        assert_eq!(organizer.built_at(), Some(4.0));
        assert_eq!(organizer.submatrix(Some(Dark), None).unwrap(), None);
        assert_eq!(organizer.submatrix(Some(Bright), Some(Dark)).unwrap(), Some(array![[3.0, 4.0]]));
        assert_eq!(
            organizer.submatrix(Some(Dark), Some(Dark)).unwrap(),
            Some(array![[-1.0, 0.0], [0.0, -2.0]])
        );
    }
}
