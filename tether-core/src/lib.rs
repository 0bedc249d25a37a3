//! Tether Core
//!
//! This crate provides pull-based reactive values:
//!
//! - [`Signal`](reactive::Signal): a mutable, directly settable container
//! - [`ComputedSignal`](reactive::ComputedSignal): a value derived from one
//!   upstream, recomputed lazily when a read finds the upstream changed
//!
//! Nothing is pushed. Writing a signal does not touch anything that derives
//! from it; the derived value catches up on its next read, once, no matter
//! how many writes happened in between.
//!
//! The crate can also be built as a Python extension module (feature
//! `extension-module`, which implies the `python` bindings) exposing the
//! same two types.
//!
//! # Example
//!
//! ```rust
//! use tether_core::reactive::{ComputedSignal, Signal};
//!
//! let count = Signal::new(4);
//! let is_even = ComputedSignal::new(&count, |c| c.get() % 2 == 0)?;
//! assert!(is_even.get()?);
//!
//! count.set(5);
//! assert!(!is_even.get()?);
//! # Ok::<(), tether_core::reactive::SignalError>(())
//! ```

pub mod reactive;

#[cfg(feature = "python")]
mod python;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PySignal>()?;
    m.add_class::<python::PyComputedSignal>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
