//! Conversion helpers for the Python binding surface.
//!
//! Everything here is FFI glue: pulling contiguous `f64` columns and boolean
//! row filters out of Python objects and normalizing host missing values
//! (NaN) into the crate's MISSING sentinel. Heavy numerical work never
//! happens in this module.
#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

/// Extract a 1-D contiguous float64 view from a numpy array, pandas Series,
/// or plain sequence.
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

/// Copy a host column into an owned vector, replacing non-finite host cells
/// (the Python side's missing marker) with the MISSING sentinel.
#[cfg(feature = "python-bindings")]
pub fn extract_column<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, missing: f64,
) -> PyResult<Vec<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        pyo3::exceptions::PyValueError::new_err(
            "expected a 1-D contiguous float64 array or sequence",
        )
    })?;
    Ok(slice.iter().map(|&v| if v.is_finite() { v } else { missing }).collect())
}

/// Extract a boolean row filter from a sequence of bools or 0/1 numbers.
#[cfg(feature = "python-bindings")]
pub fn extract_filter<'py>(py: Python<'py>, raw_data: &Bound<'py, PyAny>) -> PyResult<Vec<bool>> {
    if let Ok(flags) = raw_data.extract::<Vec<bool>>() {
        return Ok(flags);
    }
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        pyo3::exceptions::PyValueError::new_err(
            "expected a 1-D contiguous filter array or sequence",
        )
    })?;
    Ok(slice.iter().map(|&v| v != 0.0).collect())
}
