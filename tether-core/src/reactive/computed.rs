//! Computed Signal Implementation
//!
//! A ComputedSignal is a cached derived value over exactly one upstream
//! source. It is never told that the upstream changed. Instead, every read
//! checks for itself.
//!
//! # How Computed Signals Work
//!
//! 1. On construction, the upstream is read, its snapshot recorded, and the
//!    derivation run once to produce the memoized value.
//!
//! 2. On every `get`, the upstream is read again and compared with the
//!    record (by snapshot text unless another [`Staleness`] was chosen).
//!
//! 3. If the record still matches, the memoized value is returned as is.
//!
//! 4. Otherwise the derivation runs, and the record and memoized value are
//!    replaced together before returning.
//!
//! Any number of upstream writes between two reads costs at most one
//! recomputation, and writes that restore the recorded state cost none.
//!
//! # Manual Overrides
//!
//! `set` writes the memoized value directly. The override is returned by
//! reads for as long as the upstream stays put. The first read after the
//! upstream changes replaces it with a fresh derivation.
//!
//! # Failures
//!
//! A derivation that fails (or a snapshot that cannot be taken) leaves the
//! record and memoized value exactly as they were, so the next read retries.
//! Panics inside a derivation propagate to the caller unchanged.
//!
//! # Thread Safety
//!
//! The check-and-recompute sequence runs under a per-signal mutex, so
//! concurrent readers never observe a half-updated record. The derivation is
//! called with that mutex held; it must not read the signal it defines.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::error::{BoxError, Result, SignalError};
use super::next_signal_id;
use super::snapshot::Snapshot;
use super::source::Source;
use super::staleness::Staleness;

type Derivation<S, T> = Arc<dyn Fn(&S) -> std::result::Result<T, BoxError> + Send + Sync>;

/// Record kept between reads.
struct ComputedState<X, T> {
    /// Upstream value at the most recent recomputation.
    last_value: X,

    /// Snapshot of `last_value`; `None` unless the strategy is snapshot-based.
    flat_snapshot: Option<String>,

    /// The memoized derived value.
    value: T,

    /// Recomputations since construction (the initial derivation excluded).
    recomputes: u64,
}

/// A derived value that lazily tracks one upstream source.
///
/// # Type Parameters
///
/// - `S`: the upstream, usually a [`Signal`](super::Signal) but any
///   [`Source`] works, including another `ComputedSignal`.
/// - `T`: the derived value type.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::{ComputedSignal, Signal};
///
/// let counter = Signal::new(4);
/// let is_even = ComputedSignal::new(&counter, |c| c.get() % 2 == 0).unwrap();
/// assert!(is_even.get().unwrap());
///
/// counter.set(5);
/// assert!(!is_even.get().unwrap());
/// ```
pub struct ComputedSignal<S, T>
where
    S: Source,
{
    /// Unique identifier, shared by clones.
    id: u64,

    /// The single upstream.
    depends_on: S,

    /// The derivation function.
    computed_by: Derivation<S, T>,

    /// How staleness is decided.
    staleness: Staleness<S::Value>,

    /// Record and memoized value.
    state: Arc<Mutex<ComputedState<S::Value, T>>>,
}

impl<S, T> ComputedSignal<S, T>
where
    S: Source + Clone + 'static,
    T: Clone + 'static,
{
    /// Derive from `depends_on`, detecting changes by snapshot text.
    ///
    /// Fails only if the upstream's snapshot cannot be taken.
    pub fn new<F>(depends_on: &S, computed_by: F) -> Result<Self>
    where
        S::Value: Snapshot,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self::with_staleness(depends_on, computed_by, Staleness::snapshot())
    }

    /// Derive from `depends_on` with an explicit staleness strategy.
    pub fn with_staleness<F>(
        depends_on: &S,
        computed_by: F,
        staleness: Staleness<S::Value>,
    ) -> Result<Self>
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self::build(
            depends_on.clone(),
            Arc::new(move |source: &S| -> std::result::Result<T, BoxError> {
                Ok(computed_by(source))
            }),
            staleness,
        )
    }

    /// Derive from `depends_on` with a derivation that may fail.
    ///
    /// A failure during construction is returned as
    /// [`SignalError::Derivation`].
    pub fn try_new<F, E>(depends_on: &S, computed_by: F) -> Result<Self>
    where
        S::Value: Snapshot,
        F: Fn(&S) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::try_with_staleness(depends_on, computed_by, Staleness::snapshot())
    }

    /// Fallible derivation with an explicit staleness strategy.
    pub fn try_with_staleness<F, E>(
        depends_on: &S,
        computed_by: F,
        staleness: Staleness<S::Value>,
    ) -> Result<Self>
    where
        F: Fn(&S) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::build(
            depends_on.clone(),
            Arc::new(move |source: &S| -> std::result::Result<T, BoxError> {
                computed_by(source).map_err(Into::into)
            }),
            staleness,
        )
    }

    fn build(
        depends_on: S,
        computed_by: Derivation<S, T>,
        staleness: Staleness<S::Value>,
    ) -> Result<Self> {
        let last_value = depends_on.read()?;
        let flat_snapshot = staleness.fingerprint(&last_value)?;
        let value = computed_by(&depends_on).map_err(SignalError::Derivation)?;

        let id = next_signal_id();
        debug!(
            signal_id = id,
            upstream_id = depends_on.source_id(),
            strategy = staleness.kind(),
            "computed signal created"
        );

        Ok(Self {
            id,
            depends_on,
            computed_by,
            staleness,
            state: Arc::new(Mutex::new(ComputedState {
                last_value,
                flat_snapshot,
                value,
                recomputes: 0,
            })),
        })
    }
}

impl<S, T> ComputedSignal<S, T>
where
    S: Source,
    T: Clone,
{
    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The upstream this signal derives from.
    pub fn depends_on(&self) -> &S {
        &self.depends_on
    }

    /// The staleness strategy in use.
    pub fn staleness(&self) -> &Staleness<S::Value> {
        &self.staleness
    }

    /// Get the current value, recomputing if the upstream has changed.
    ///
    /// This is the main entry point for reading a computed signal.
    pub fn get(&self) -> Result<T> {
        let mut state = self.state.lock();

        let current = self.depends_on.read()?;
        let check = self.staleness.check(
            &state.last_value,
            state.flat_snapshot.as_deref(),
            &current,
        )?;

        trace!(
            signal_id = self.id,
            stale = check.stale,
            strategy = self.staleness.kind(),
            "staleness check"
        );

        if check.stale {
            // Derive first so a failure leaves the record untouched.
            let value = (self.computed_by)(&self.depends_on).map_err(|error| {
                warn!(signal_id = self.id, %error, "derivation failed");
                SignalError::Derivation(error)
            })?;

            state.last_value = current;
            state.flat_snapshot = check.snapshot;
            state.value = value;
            state.recomputes += 1;

            debug!(
                signal_id = self.id,
                recomputes = state.recomputes,
                snapshot = state.flat_snapshot.as_deref().unwrap_or(""),
                "computed signal recomputed"
            );
        }

        Ok(state.value.clone())
    }

    /// Overwrite the memoized value, bypassing the derivation.
    ///
    /// The override is kept until a read finds the upstream changed.
    pub fn set(&self, value: T) {
        self.state.lock().value = value;
        debug!(signal_id = self.id, "computed value overridden");
    }

    /// Whether the next `get` would recompute.
    ///
    /// Never runs this signal's derivation or touches its record. The
    /// upstream is read as usual, so an upstream `ComputedSignal` may
    /// refresh itself.
    pub fn is_stale(&self) -> Result<bool> {
        let state = self.state.lock();
        let current = self.depends_on.read()?;
        let check = self.staleness.check(
            &state.last_value,
            state.flat_snapshot.as_deref(),
            &current,
        )?;
        Ok(check.stale)
    }

    /// The upstream snapshot recorded at the last recomputation.
    ///
    /// Not to be confused with [`Snapshot::snapshot`], which renders this
    /// signal's own value. Always `None` for strategies that do not use snapshots.
    pub fn recorded_snapshot(&self) -> Option<String> {
        self.state.lock().flat_snapshot.clone()
    }

    /// The upstream value recorded at the last recomputation.
    pub fn last_value(&self) -> S::Value
    where
        S::Value: Clone,
    {
        self.state.lock().last_value.clone()
    }

    /// Number of recomputations since construction.
    pub fn recompute_count(&self) -> u64 {
        self.state.lock().recomputes
    }
}

impl<S, T> Source for ComputedSignal<S, T>
where
    S: Source,
    T: Clone,
{
    type Value = T;

    fn read(&self) -> Result<T> {
        self.get()
    }

    fn write(&self, value: T) {
        self.set(value);
    }

    fn source_id(&self) -> u64 {
        self.id
    }
}

impl<S, T> Snapshot for ComputedSignal<S, T>
where
    S: Source,
    T: Clone + Snapshot,
{
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        self.get()?.write_snapshot(out)
    }
}

impl<S, T> Clone for ComputedSignal<S, T>
where
    S: Source + Clone,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            depends_on: self.depends_on.clone(),
            computed_by: Arc::clone(&self.computed_by),
            staleness: self.staleness.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S, T> Debug for ComputedSignal<S, T>
where
    S: Source,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ComputedSignal")
            .field("id", &self.id)
            .field("upstream_id", &self.depends_on.source_id())
            .field("staleness", &self.staleness)
            .field("snapshot", &state.flat_snapshot)
            .field("recomputes", &state.recomputes)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counting_parity(
        source: &Signal<i64>,
    ) -> (ComputedSignal<Signal<i64>, bool>, Arc<AtomicI32>) {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let computed = ComputedSignal::new(source, move |s: &Signal<i64>| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            s.get() % 2 == 0
        })
        .unwrap();
        (computed, calls)
    }

    #[test]
    fn computes_on_construction() {
        let source = Signal::new(4i64);
        let (computed, calls) = counting_parity(&source);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(computed.recorded_snapshot().as_deref(), Some("4"));
        assert_eq!(computed.last_value(), 4);
        assert!(computed.get().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn caches_value_while_upstream_unchanged() {
        let source = Signal::new(4i64);
        let (computed, calls) = counting_parity(&source);

        for _ in 0..3 {
            assert!(computed.get().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(computed.recompute_count(), 0);
    }

    #[test]
    fn recomputes_once_per_distinct_upstream_state() {
        let source = Signal::new(4i64);
        let (computed, calls) = counting_parity(&source);

        source.set(5);
        source.set(7);
        source.set(9);
        assert!(!computed.get().unwrap());
        assert!(!computed.get().unwrap());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(computed.recompute_count(), 1);
        assert_eq!(computed.recorded_snapshot().as_deref(), Some("9"));
    }

    #[test]
    fn writes_restoring_the_recorded_state_cost_nothing() {
        let source = Signal::new(4i64);
        let (computed, calls) = counting_parity(&source);

        source.set(5);
        source.set(4);
        assert!(computed.get().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_set_is_kept_while_upstream_unchanged() {
        let source = Signal::new(4i64);
        let (computed, _) = counting_parity(&source);
        assert!(computed.get().unwrap());

        computed.set(false);
        assert!(!computed.get().unwrap());
        assert!(!computed.get().unwrap());
    }

    #[test]
    fn manual_set_is_replaced_after_upstream_change() {
        let source = Signal::new(4i64);
        let (computed, _) = counting_parity(&source);

        computed.set(false);
        source.set(6);
        assert!(computed.get().unwrap());
    }

    #[test]
    fn is_stale_does_not_recompute() {
        let source = Signal::new(4i64);
        let (computed, calls) = counting_parity(&source);
        assert!(!computed.is_stale().unwrap());

        source.set(3);
        assert!(computed.is_stale().unwrap());
        assert!(computed.is_stale().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        computed.get().unwrap();
        assert!(!computed.is_stale().unwrap());
    }

    #[test]
    fn is_stale_on_a_chain_refreshes_only_the_upstream() {
        let counter = Signal::new(4i64);
        let (is_even, even_calls) = counting_parity(&counter);

        let parity_calls = Arc::new(AtomicI32::new(0));
        let calls = parity_calls.clone();
        let parity = ComputedSignal::try_new(&is_even, move |e: &ComputedSignal<Signal<i64>, bool>| {
            calls.fetch_add(1, Ordering::SeqCst);
            e.get().map(|even| if even { "Even" } else { "Odd" })
        })
        .unwrap();

        counter.set(5);
        assert!(parity.is_stale().unwrap());

        // The upstream computed signal pulled the new counter value.
        assert_eq!(is_even.recompute_count(), 1);
        assert_eq!(even_calls.load(Ordering::SeqCst), 2);

        // This signal's own record is untouched.
        assert_eq!(parity.recompute_count(), 0);
        assert_eq!(parity.recorded_snapshot().as_deref(), Some("true"));
        assert_eq!(parity_calls.load(Ordering::SeqCst), 1);

        assert_eq!(parity.get().unwrap(), "Odd");
        assert_eq!(parity.recompute_count(), 1);
        assert!(!parity.is_stale().unwrap());
    }

    #[test]
    fn recorded_snapshot_is_the_upstream_text_not_the_value() {
        let source = Signal::new(3i64);
        let (computed, _) = counting_parity(&source);

        assert_eq!(computed.recorded_snapshot().as_deref(), Some("3"));
        assert_eq!(Snapshot::snapshot(&computed).unwrap(), "false");
    }

    #[test]
    fn failed_derivation_leaves_record_untouched() {
        let source = Signal::new(2i32);
        let computed = ComputedSignal::try_new(&source, |s: &Signal<i32>| {
            let n = s.get();
            if n < 0 {
                Err(format!("negative input: {n}"))
            } else {
                Ok(n * 10)
            }
        })
        .unwrap();

        source.set(-1);
        let error = computed.get().unwrap_err();
        assert!(error.is_derivation());
        assert_eq!(computed.recorded_snapshot().as_deref(), Some("2"));
        assert_eq!(computed.last_value(), 2);
        assert_eq!(computed.recompute_count(), 0);

        // Still stale, so the next read retries.
        source.set(3);
        assert_eq!(computed.get().unwrap(), 30);
    }

    #[test]
    fn failed_initial_derivation_is_reported() {
        let source = Signal::new(0u32);
        let result = ComputedSignal::try_new(&source, |s: &Signal<u32>| {
            100u32.checked_div(s.get()).ok_or("division by zero")
        });

        assert!(matches!(result, Err(SignalError::Derivation(_))));
    }

    #[test]
    fn equality_strategy_has_no_snapshot() {
        let source = Signal::new(vec![1, 2, 3]);
        let total = ComputedSignal::with_staleness(
            &source,
            |s: &Signal<Vec<i32>>| s.with(|v| v.iter().sum::<i32>()),
            Staleness::equality(),
        )
        .unwrap();

        assert_eq!(total.recorded_snapshot(), None);
        assert_eq!(total.get().unwrap(), 6);

        source.set(vec![4]);
        assert_eq!(total.get().unwrap(), 4);
        assert_eq!(total.last_value(), vec![4]);
    }

    #[test]
    fn clone_shares_state() {
        let source = Signal::new(1i64);
        let (computed, calls) = counting_parity(&source);
        let other = computed.clone();

        source.set(2);
        assert!(other.get().unwrap());
        assert!(computed.get().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(computed.id(), other.id());
    }

    #[test]
    fn computed_over_computed_pulls_through() {
        let counter = Signal::new(4i64);
        let (is_even, _) = counting_parity(&counter);

        let parity = ComputedSignal::try_new(&is_even, |e: &ComputedSignal<Signal<i64>, bool>| {
            e.get().map(|even| if even { "Even" } else { "Odd" })
        })
        .unwrap();
        assert_eq!(parity.get().unwrap(), "Even");

        counter.set(9);
        assert_eq!(parity.get().unwrap(), "Odd");
        assert_eq!(parity.depends_on().id(), is_even.id());
    }

    #[test]
    fn debug_lists_record() {
        let source = Signal::new(8i64);
        let (computed, _) = counting_parity(&source);
        let text = format!("{:?}", computed);

        assert!(text.contains("ComputedSignal"));
        assert!(text.contains("snapshot: Some(\"8\")"));
    }
}
