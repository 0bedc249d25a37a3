//! Signal Implementation
//!
//! A Signal is the leaf reactive primitive. It holds a value and exposes
//! direct read and write access.
//!
//! # How Signals Work
//!
//! 1. A signal is created with an initial value.
//!
//! 2. `get` returns a clone of the value most recently written.
//!
//! 3. `set` overwrites the value. Nobody is notified: derived signals notice
//!    the change the next time they are read.
//!
//! # Sharing
//!
//! A `Signal` is a handle. Cloning it is cheap and the clones share the same
//! value, so a derived signal can hold its own handle to an upstream without
//! owning the caller's copy.

use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::Result;
use super::snapshot::Snapshot;
use super::source::Source;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
pub(crate) fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A mutable value container.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::Signal;
///
/// let count = Signal::new(4);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    /// Unique identifier, shared by clones.
    id: u64,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// Number of writes since construction.
    version: Arc<AtomicU64>,
}

impl<T: Clone> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Run `f` against the current value without cloning it.
    ///
    /// The value is read-locked while `f` runs, so `f` must not write to
    /// this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.read())
    }

    /// Overwrite the value.
    ///
    /// Derived signals pick up the change on their next read.
    pub fn set(&self, value: T) {
        self.replace(value);
    }

    /// Overwrite the value and return the previous one.
    pub fn replace(&self, value: T) -> T {
        let previous = std::mem::replace(&mut *self.value.write(), value);
        self.version.fetch_add(1, Ordering::Relaxed);
        previous
    }

    /// Update the value using a function of the current value.
    ///
    /// No lock is held while `f` runs, so it may read this signal through
    /// any handle.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.get());
        self.set(next);
    }

    /// Number of writes made through any handle since construction.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }
}

impl<T: Snapshot> Signal<T> {
    /// Deterministic text form of the current value.
    pub fn to_snapshot(&self) -> Result<String> {
        self.value.read().snapshot()
    }
}

impl<T: Clone> Source for Signal<T> {
    type Value = T;

    fn read(&self) -> Result<T> {
        Ok(self.get())
    }

    fn write(&self, value: T) {
        self.set(value);
    }

    fn source_id(&self) -> u64 {
        self.id
    }
}

impl<T: Snapshot> Snapshot for Signal<T> {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        self.value.read().write_snapshot(out)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            version: Arc::clone(&self.version),
        }
    }
}

/// Human-readable form of the value.
///
/// Values that cannot be snapshotted all print as `<unserializable>`, so
/// this text is not a reliable key. Staleness checks go through
/// [`Signal::to_snapshot`], which reports the failure instead.
impl<T: Snapshot> Display for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_snapshot() {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<unserializable>"),
        }
    }
}

impl<T: Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .field("version", &self.version.load(Ordering::Relaxed))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
