//! dwell_likelihood — backward-recursion likelihoods of dwell-time
//! trajectories under aggregated continuous-time Markov models, with Python
//! bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the backward likelihood engine to Python via the
//! `_dwell_likelihood` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`likelihood` and `numerics`) as the
//!   public crate surface.
//! - Define the `BackwardPredictor` `#[pyclass]` and the `#[pymodule]`
//!   initializer when the `python-bindings` feature is enabled.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file performs only
//!   FFI glue, input conversion, and error mapping.
//! - Errors from core Rust code surface in Python as `ValueError`.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`likelihood`] (or its `prelude`) and
//!   can ignore the PyO3 items guarded by `python-bindings`.
//!
//! Testing notes
//! -------------
//! - Engine behavior is covered by unit tests in the inner modules and by
//!   the integration tests under `tests/`.

pub mod likelihood;
pub mod numerics;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    likelihood::{
        backward::engine::BackwardLikelihood,
        core::{diagnostics::NoopSink, trajectory::Trajectory},
        models::generator::GeneratorModel,
    },
    utils::{
        extract_classes, extract_matrix, extract_options, extract_partition, extract_trajectory,
        extract_vector,
    },
};

/// BackwardPredictor — Python-facing backward likelihood for a fixed
/// generator.
///
/// Constructed from Python via
/// `BackwardPredictor(rate_matrix, state_classes, initial, final=None,
/// diagonal_classes=None, rebuild=None, floor=None)`:
/// - `rate_matrix`: `n×n` generator (rows sum to zero).
/// - `state_classes`: class label (`"bright"` / `"dark"`) of each state.
/// - `initial`: initial distribution over the `n` states.
/// - `final`: optional terminal distribution (uniform when omitted).
/// - `diagonal_classes`: classes whose within-class block is diagonal.
/// - `rebuild`: `"every_segment"`, `"once"`, or `"from_model"`.
/// - `floor`: numerical floor, `0 < floor < 1`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "dwell_likelihood.backward")]
pub struct BackwardPredictor {
    model: GeneratorModel,
    engine: BackwardLikelihood,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl BackwardPredictor {
    #[new]
    #[pyo3(
        signature = (
            rate_matrix,
            state_classes,
            initial,
            r#final = None,
            diagonal_classes = None,
            rebuild = None,
            floor = None,
        ),
        text_signature = "(rate_matrix, state_classes, initial, /, final=None, \
                          diagonal_classes=None, rebuild=None, floor=None)"
    )]
    pub fn new<'py>(
        py: Python<'py>, rate_matrix: &Bound<'py, PyAny>, state_classes: Vec<String>,
        initial: &Bound<'py, PyAny>, r#final: Option<&Bound<'py, PyAny>>,
        diagonal_classes: Option<Vec<String>>, rebuild: Option<&str>, floor: Option<f64>,
    ) -> PyResult<Self> {
        let matrix = extract_matrix(rate_matrix, "rate_matrix")?;
        let partition = extract_partition(&state_classes)?;
        let initial = extract_vector(py, initial, "initial")?;

        let mut model = GeneratorModel::new(matrix, partition, initial)?;
        if let Some(terminal) = r#final {
            model = model.with_final_distribution(extract_vector(py, terminal, "final")?)?;
        }
        for class in extract_classes(&diagonal_classes.unwrap_or_default())? {
            model = model.with_diagonal_class(class);
        }

        let engine = BackwardLikelihood::new(extract_options(rebuild, None, None, floor)?)?;
        Ok(BackwardPredictor { model, engine })
    }

    /// log10-likelihood of one trajectory.
    pub fn predict<'py>(
        &self, py: Python<'py>, classes: Vec<String>, durations: &Bound<'py, PyAny>,
    ) -> PyResult<f64> {
        let trajectory = extract_trajectory(py, &classes, durations)?;
        Ok(self.engine.predict_data(&self.model, &trajectory)?.log_likelihood())
    }

    /// log10-likelihoods of many `(classes, durations)` pairs, evaluated in
    /// parallel with the GIL released.
    pub fn predict_many<'py>(
        &self, py: Python<'py>, trajectories: Vec<(Vec<String>, Bound<'py, PyAny>)>,
    ) -> PyResult<Vec<f64>> {
        let trajectories = trajectories
            .iter()
            .map(|(classes, durations)| extract_trajectory(py, classes, durations))
            .collect::<PyResult<Vec<Trajectory>>>()?;
        let results = py.allow_threads(|| self.engine.predict_batch(&self.model, &trajectories));
        results.into_iter().map(|r| r.map(|p| p.log_likelihood()).map_err(PyErr::from)).collect()
    }

    /// Scaling factors of one pass, in recording order.
    pub fn scaling_factors<'py>(
        &self, py: Python<'py>, classes: Vec<String>, durations: &Bound<'py, PyAny>,
    ) -> PyResult<Vec<f64>> {
        let trajectory = extract_trajectory(py, &classes, durations)?;
        let outcome = self.engine.compute_backward_vectors(&self.model, &trajectory, &mut NoopSink)?;
        Ok(outcome.scaling.factors())
    }
}

/// _dwell_likelihood — PyO3 module initializer for the Python extension.
///
/// Creates the `backward` submodule, attaches it to the parent module, and
/// registers it in `sys.modules` so dotted imports work.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _dwell_likelihood<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let backward_mod = PyModule::new(_py, "backward")?;
    backward_mod.add_class::<BackwardPredictor>()?;
    m.add_submodule(&backward_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("dwell_likelihood.backward", backward_mod)?;
    Ok(())
}
