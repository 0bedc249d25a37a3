//! Python Bindings
//!
//! Python-side signals hold arbitrary Python objects. Their staleness key is
//! the upstream value's `str()`, so anything with a stable string form can
//! be tracked, including signals nested inside signals.
//!
//! Exceptions raised by a derivation or by `__str__` propagate to the caller
//! of `get`, and leave the computed signal's record untouched.

use pyo3::prelude::*;
use tracing::debug;

use crate::reactive::next_signal_id;

fn snapshot_of(value: &Bound<'_, PyAny>) -> PyResult<String> {
    Ok(value.str()?.to_string())
}

/// Python-exposed Signal type.
#[pyclass(name = "Signal", module = "tether._core")]
pub struct PySignal {
    /// Unique identifier for this signal.
    id: u64,

    /// The current value.
    value: PyObject,
}

#[pymethods]
impl PySignal {
    /// Create a new signal with the given initial value.
    #[new]
    fn new(value: PyObject) -> Self {
        Self {
            id: next_signal_id(),
            value,
        }
    }

    /// Get the current value.
    fn get(&self, py: Python<'_>) -> PyObject {
        self.value.clone_ref(py)
    }

    /// Set a new value.
    fn set(&mut self, value: PyObject) {
        self.value = value;
    }

    /// Get the signal's unique ID.
    #[getter]
    fn id(&self) -> u64 {
        self.id
    }

    fn __str__(&self, py: Python<'_>) -> PyResult<String> {
        snapshot_of(self.value.bind(py))
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        let repr = self
            .value
            .bind(py)
            .repr()
            .map(|r| r.to_string())
            .unwrap_or_else(|_| "?".to_string());
        format!("Signal(id={}, value={})", self.id, repr)
    }
}

/// Python-exposed ComputedSignal type.
///
/// `depends_on` may be any object with a `get()` method, including another
/// `ComputedSignal`.
#[pyclass(name = "ComputedSignal", module = "tether._core")]
pub struct PyComputedSignal {
    id: u64,
    depends_on: PyObject,
    computed_by: PyObject,
    last_value: PyObject,
    flat_snapshot: String,
    value: PyObject,
    recomputes: u64,
}

#[pymethods]
impl PyComputedSignal {
    #[new]
    fn new(py: Python<'_>, depends_on: PyObject, computed_by: PyObject) -> PyResult<Self> {
        let last_value = depends_on.call_method0(py, "get")?;
        let flat_snapshot = snapshot_of(last_value.bind(py))?;
        let value = computed_by.call1(py, (depends_on.clone_ref(py),))?;

        Ok(Self {
            id: next_signal_id(),
            depends_on,
            computed_by,
            last_value,
            flat_snapshot,
            value,
            recomputes: 0,
        })
    }

    /// Get the current value, recomputing if the upstream's `str()` changed.
    fn get(&mut self, py: Python<'_>) -> PyResult<PyObject> {
        let current = self.depends_on.call_method0(py, "get")?;
        let snapshot = snapshot_of(current.bind(py))?;

        if snapshot != self.flat_snapshot {
            let value = self
                .computed_by
                .call1(py, (self.depends_on.clone_ref(py),))?;

            self.last_value = current;
            self.flat_snapshot = snapshot;
            self.value = value;
            self.recomputes += 1;

            debug!(
                signal_id = self.id,
                recomputes = self.recomputes,
                snapshot = %self.flat_snapshot,
                "computed signal recomputed"
            );
        }

        Ok(self.value.clone_ref(py))
    }

    /// Overwrite the memoized value, bypassing the derivation.
    fn set(&mut self, value: PyObject) {
        self.value = value;
    }

    #[getter]
    fn id(&self) -> u64 {
        self.id
    }

    /// The upstream `str()` recorded at the last recomputation.
    #[getter]
    fn snapshot(&self) -> String {
        self.flat_snapshot.clone()
    }

    #[getter]
    fn last_value(&self, py: Python<'_>) -> PyObject {
        self.last_value.clone_ref(py)
    }

    #[getter]
    fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// `str()` of the current value, recomputing first if stale.
    fn __str__(&mut self, py: Python<'_>) -> PyResult<String> {
        let value = self.get(py)?;
        snapshot_of(value.bind(py))
    }

    fn __repr__(&self) -> String {
        format!(
            "ComputedSignal(id={}, snapshot={:?}, recomputes={})",
            self.id, self.flat_snapshot, self.recomputes
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
