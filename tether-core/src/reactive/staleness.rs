//! Staleness Detection
//!
//! A derived signal keeps a record of the upstream value it last derived
//! from. On every read it asks its [`Staleness`] strategy whether the
//! upstream has moved away from that record.
//!
//! # Strategies
//!
//! - **Snapshot** (default): compare the upstream's textual snapshot with the
//!   one stored at the last recomputation. Works for any [`Snapshot`] type,
//!   including signals nested inside signals, but cannot tell apart values
//!   whose text forms collide.
//!
//! - **Equality**: compare the upstream value with the stored one using
//!   `PartialEq`. No text is produced.
//!
//! - **Comparer**: compare with a caller-supplied equality function, for
//!   types without a useful `PartialEq` (ordered lists compared element-wise,
//!   records compared by key, and so on).

use std::fmt::{self, Debug};
use std::sync::Arc;

use super::error::Result;
use super::snapshot::Snapshot;

type KeyFn<X> = fn(&X) -> Result<String>;
type EqFn<X> = Arc<dyn Fn(&X, &X) -> bool + Send + Sync>;

/// How a derived signal decides its upstream has changed.
pub struct Staleness<X> {
    detector: Detector<X>,
}

enum Detector<X> {
    Snapshot(KeyFn<X>),
    Equality(EqFn<X>),
    Comparer(EqFn<X>),
}

/// Outcome of comparing the current upstream value with the stored record.
pub(crate) struct Check {
    pub(crate) stale: bool,
    /// Fresh snapshot of the current upstream value (snapshot mode only).
    pub(crate) snapshot: Option<String>,
}

fn snapshot_key<X: Snapshot>(value: &X) -> Result<String> {
    value.snapshot()
}

impl<X> Staleness<X> {
    /// Compare textual snapshots.
    pub fn snapshot() -> Self
    where
        X: Snapshot,
    {
        Self {
            detector: Detector::Snapshot(snapshot_key::<X>),
        }
    }

    /// Compare values with `PartialEq`.
    pub fn equality() -> Self
    where
        X: PartialEq + 'static,
    {
        Self {
            detector: Detector::Equality(Arc::new(|a: &X, b: &X| a == b)),
        }
    }

    /// Compare values with a custom equality function.
    ///
    /// `equal(last, current)` returning `false` marks the derived value stale.
    pub fn comparer<F>(equal: F) -> Self
    where
        F: Fn(&X, &X) -> bool + Send + Sync + 'static,
    {
        Self {
            detector: Detector::Comparer(Arc::new(equal)),
        }
    }

    /// Short name of the strategy, used in log events.
    pub fn kind(&self) -> &'static str {
        match self.detector {
            Detector::Snapshot(_) => "snapshot",
            Detector::Equality(_) => "equality",
            Detector::Comparer(_) => "comparer",
        }
    }

    /// Whether this strategy keeps a textual snapshot.
    pub fn uses_snapshot(&self) -> bool {
        matches!(self.detector, Detector::Snapshot(_))
    }

    /// Snapshot to store alongside a freshly derived value.
    pub(crate) fn fingerprint(&self, value: &X) -> Result<Option<String>> {
        match &self.detector {
            Detector::Snapshot(key) => key(value).map(Some),
            Detector::Equality(_) | Detector::Comparer(_) => Ok(None),
        }
    }

    /// Compare `current` with the record kept since the last recomputation.
    pub(crate) fn check(
        &self,
        last_value: &X,
        flat_snapshot: Option<&str>,
        current: &X,
    ) -> Result<Check> {
        match &self.detector {
            Detector::Snapshot(key) => {
                let snapshot = key(current)?;
                Ok(Check {
                    stale: flat_snapshot != Some(snapshot.as_str()),
                    snapshot: Some(snapshot),
                })
            }
            Detector::Equality(equal) | Detector::Comparer(equal) => Ok(Check {
                stale: !equal(last_value, current),
                snapshot: None,
            }),
        }
    }
}

impl<X: Snapshot> Default for Staleness<X> {
    fn default() -> Self {
        Self::snapshot()
    }
}

impl<X> Clone for Staleness<X> {
    fn clone(&self) -> Self {
        let detector = match &self.detector {
            Detector::Snapshot(key) => Detector::Snapshot(*key),
            Detector::Equality(equal) => Detector::Equality(Arc::clone(equal)),
            Detector::Comparer(equal) => Detector::Comparer(Arc::clone(equal)),
        };
        Self { detector }
    }
}

impl<X> Debug for Staleness<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Staleness").field(&self.kind()).finish()
    }
}
