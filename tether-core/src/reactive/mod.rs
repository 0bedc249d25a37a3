//! Reactive Primitives
//!
//! This module implements the two reactive primitives: signals and computed
//! signals.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. Reading returns the value most
//! recently written. Writing notifies nobody.
//!
//! ## Computed Signals
//!
//! A ComputedSignal is a derived value over exactly one upstream. It caches
//! its result and re-derives only when a read finds that the upstream has
//! changed since the last derivation.
//!
//! # Implementation Notes
//!
//! There is no dependency graph and no subscriber registry. Staleness is
//! pulled, not pushed: each read compares the upstream's current state with
//! a record taken at the last derivation. By default the record is the
//! upstream's textual [`Snapshot`], so any value with a deterministic text
//! form can be tracked, including signals nested inside signals. Types whose
//! text forms are ambiguous can opt into [`Staleness::equality`] or
//! [`Staleness::comparer`] instead.
//!
//! Both primitives implement [`Source`], so a computed signal can itself be
//! the upstream of another. Each hop re-checks its own upstream on read.

mod builder;
mod computed;
mod error;
mod signal;
mod snapshot;
mod source;
mod staleness;

pub use builder::{Compared, DependsOn, SignalBuilder};
pub use computed::ComputedSignal;
pub use error::{BoxError, Result, SignalError};
pub use signal::Signal;
pub use snapshot::{Json, Snapshot};
pub use source::Source;
pub use staleness::Staleness;

pub(crate) use signal::next_signal_id;
