//! The read/write contract shared by plain and derived signals.

use super::error::Result;

/// A readable and writable value container.
///
/// Both [`Signal`](super::Signal) and [`ComputedSignal`](super::ComputedSignal)
/// implement this, so either can be the upstream of a derived signal.
pub trait Source {
    /// The type of value held.
    type Value;

    /// Read the current value.
    ///
    /// Derived sources perform their staleness check here and may recompute.
    fn read(&self) -> Result<Self::Value>;

    /// Overwrite the current value.
    fn write(&self, value: Self::Value);

    /// Identifier of this source, shared by clones.
    fn source_id(&self) -> u64;
}
