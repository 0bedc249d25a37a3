//! Fluent construction of computed signals.
//!
//! ```rust
//! use tether_core::reactive::{Signal, SignalBuilder};
//!
//! let counter = Signal::new(5);
//! let is_even = SignalBuilder::depends_on(&counter)
//!     .computed_by(|c| c.get() % 2 == 0)
//!     .unwrap();
//!
//! assert!(!is_even.get().unwrap());
//! ```

use std::fmt::{self, Debug};

use super::computed::ComputedSignal;
use super::error::{BoxError, Result};
use super::snapshot::Snapshot;
use super::source::Source;
use super::staleness::Staleness;

/// Entry point for building computed signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalBuilder;

impl SignalBuilder {
    /// Start building a computed signal over `source`.
    pub fn depends_on<S>(source: &S) -> DependsOn<S>
    where
        S: Source + Clone,
    {
        DependsOn {
            source: source.clone(),
        }
    }
}

/// A builder with an upstream but no staleness strategy yet.
///
/// Finishing from here compares upstream snapshots.
pub struct DependsOn<S> {
    source: S,
}

impl<S> DependsOn<S>
where
    S: Source + Clone + 'static,
{
    /// Compare upstream values with a custom equality function.
    pub fn using_equality<F>(self, equal: F) -> Compared<S>
    where
        F: Fn(&S::Value, &S::Value) -> bool + Send + Sync + 'static,
    {
        self.staleness(Staleness::comparer(equal))
    }

    /// Compare upstream values with `PartialEq`.
    pub fn compare_by_value(self) -> Compared<S>
    where
        S::Value: PartialEq + 'static,
    {
        self.staleness(Staleness::equality())
    }

    /// Compare upstream snapshots (the default, spelled out).
    pub fn compare_by_snapshot(self) -> Compared<S>
    where
        S::Value: Snapshot,
    {
        self.staleness(Staleness::snapshot())
    }

    /// Use an explicit staleness strategy.
    pub fn staleness(self, staleness: Staleness<S::Value>) -> Compared<S> {
        Compared {
            source: self.source,
            staleness,
        }
    }

    /// Finish with an infallible derivation.
    pub fn computed_by<T, F>(self, computed_by: F) -> Result<ComputedSignal<S, T>>
    where
        S::Value: Snapshot,
        T: Clone + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        ComputedSignal::new(&self.source, computed_by)
    }

    /// Finish with a derivation that may fail.
    pub fn try_computed_by<T, E, F>(self, computed_by: F) -> Result<ComputedSignal<S, T>>
    where
        S::Value: Snapshot,
        T: Clone + 'static,
        E: Into<BoxError>,
        F: Fn(&S) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        ComputedSignal::try_new(&self.source, computed_by)
    }
}

impl<S: Source> Debug for DependsOn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependsOn")
            .field("upstream_id", &self.source.source_id())
            .finish()
    }
}

/// A builder with both an upstream and a staleness strategy.
pub struct Compared<S>
where
    S: Source,
{
    source: S,
    staleness: Staleness<S::Value>,
}

impl<S> Compared<S>
where
    S: Source + Clone + 'static,
{
    /// Finish with an infallible derivation.
    pub fn computed_by<T, F>(self, computed_by: F) -> Result<ComputedSignal<S, T>>
    where
        T: Clone + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        ComputedSignal::with_staleness(&self.source, computed_by, self.staleness)
    }

    /// Finish with a derivation that may fail.
    pub fn try_computed_by<T, E, F>(self, computed_by: F) -> Result<ComputedSignal<S, T>>
    where
        T: Clone + 'static,
        E: Into<BoxError>,
        F: Fn(&S) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        ComputedSignal::try_with_staleness(&self.source, computed_by, self.staleness)
    }
}

impl<S: Source> Debug for Compared<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compared")
            .field("upstream_id", &self.source.source_id())
            .field("staleness", &self.staleness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;

    #[derive(Debug, Clone)]
    struct Person {
        name: &'static str,
        age: u32,
    }

    #[test]
    fn default_builder_uses_snapshots() {
        let counter = Signal::new(4i32);
        let is_even = SignalBuilder::depends_on(&counter)
            .computed_by(|c: &Signal<i32>| c.get() % 2 == 0)
            .unwrap();

        assert!(is_even.staleness().uses_snapshot());
        assert_eq!(is_even.recorded_snapshot().as_deref(), Some("4"));
    }

    #[test]
    fn using_equality_skips_identical_rewrites() {
        let data = Signal::new(vec![Person { name: "David", age: 48 }]);
        let adults = SignalBuilder::depends_on(&data)
            .using_equality(|a: &Vec<Person>, b: &Vec<Person>| {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.name == y.name && x.age == y.age)
            })
            .computed_by(|d: &Signal<Vec<Person>>| {
                d.with(|people| people.iter().filter(|p| p.age > 18).count())
            })
            .unwrap();

        assert_eq!(adults.get().unwrap(), 1);

        let both = vec![
            Person { name: "David", age: 48 },
            Person { name: "Rebecca", age: 48 },
        ];
        data.set(both.clone());
        assert_eq!(adults.get().unwrap(), 2);

        data.set(both);
        assert_eq!(adults.get().unwrap(), 2);
        assert_eq!(adults.recompute_count(), 1);
    }

    #[test]
    fn compare_by_value_builder() {
        let name = Signal::new("David".to_string());
        let shout = SignalBuilder::depends_on(&name)
            .compare_by_value()
            .computed_by(|n: &Signal<String>| n.get().to_uppercase())
            .unwrap();

        assert_eq!(shout.get().unwrap(), "DAVID");
        assert_eq!(shout.staleness().kind(), "equality");

        name.set("Rebecca".into());
        assert_eq!(shout.get().unwrap(), "REBECCA");
    }

    #[test]
    fn try_computed_by_reports_failure() {
        let input = Signal::new("12".to_string());
        let parsed = SignalBuilder::depends_on(&input)
            .compare_by_snapshot()
            .try_computed_by(|s: &Signal<String>| s.get().parse::<u8>())
            .unwrap();

        assert_eq!(parsed.get().unwrap(), 12);

        input.set("not a number".into());
        assert!(parsed.get().unwrap_err().is_derivation());
    }

    #[test]
    fn builders_debug_show_upstream() {
        let counter = Signal::new(1u8);
        let text = format!("{:?}", SignalBuilder::depends_on(&counter).compare_by_value());
        assert!(text.contains("Compared"));
        assert!(text.contains("equality"));
    }
}
