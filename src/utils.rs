//! Python-boundary helpers: convert array-likes and option strings into the
//! validated Rust types of the likelihood stack.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::likelihood::{
    core::{
        classes::ObservableClass,
        options::{BackwardOptions, RebuildPolicy},
        rate_matrix::StatePartition,
        trajectory::Trajectory,
    },
    errors::LikelihoodResult,
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a 1-D array-like into an owned `Array1`.
#[cfg(feature = "python-bindings")]
pub fn extract_vector<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

/// Copy a 2-D array-like (ndarray or nested sequence) into an owned `Array2`.
#[cfg(feature = "python-bindings")]
pub fn extract_matrix<'py>(raw: &Bound<'py, PyAny>, name: &str) -> PyResult<Array2<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().to_owned());
    }

    let rows: Vec<Vec<f64>> = raw.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(format!(
            "{name} must be a 2-D numpy.ndarray or nested sequence of float64"
        ))
    })?;
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, |r| r.len());
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(PyValueError::new_err(format!("{name} rows must all have the same length")));
    }
    Array2::from_shape_vec((n_rows, n_cols), rows.into_iter().flatten().collect())
        .map_err(|e| PyValueError::new_err(format!("{name}: {e}")))
}

#[cfg(feature = "python-bindings")]
pub fn extract_partition(labels: &[String]) -> PyResult<StatePartition> {
    Ok(StatePartition::from_labels(labels)?)
}

#[cfg(feature = "python-bindings")]
pub fn extract_classes(labels: &[String]) -> PyResult<Vec<ObservableClass>> {
    Ok(labels.iter().map(|s| s.parse()).collect::<LikelihoodResult<Vec<_>>>()?)
}

/// Pair class labels with durations into a validated trajectory.
#[cfg(feature = "python-bindings")]
pub fn extract_trajectory<'py>(
    py: Python<'py>, classes: &[String], durations: &Bound<'py, PyAny>,
) -> PyResult<Trajectory> {
    let durations = extract_vector(py, durations, "durations")?;
    if durations.len() != classes.len() {
        return Err(PyValueError::new_err(format!(
            "classes and durations must have the same length ({} vs {})",
            classes.len(),
            durations.len()
        )));
    }
    let classes = extract_classes(classes)?;
    Ok(Trajectory::from_pairs(classes.into_iter().zip(durations.iter().copied()))?)
}

#[cfg(feature = "python-bindings")]
pub fn extract_options(
    rebuild: Option<&str>, archive: Option<bool>, debug_segments: Option<bool>, floor: Option<f64>,
) -> PyResult<BackwardOptions> {
    let rebuild = match rebuild.map(|s| s.to_lowercase()).as_deref() {
        None | Some("every_segment") => RebuildPolicy::EverySegment,
        Some("once") => RebuildPolicy::Once,
        Some("from_model") => RebuildPolicy::FromModel,
        Some(other) => {
            return Err(PyValueError::new_err(format!(
                "invalid rebuild policy {:?} (expected 'every_segment', 'once', or 'from_model')",
                other
            )));
        }
    };

    let defaults = BackwardOptions::default();
    Ok(BackwardOptions::new(
        rebuild,
        archive.unwrap_or(defaults.archive),
        debug_segments.unwrap_or(defaults.debug_segments),
        floor.unwrap_or(defaults.floor),
        defaults.expv,
    )?)
}
