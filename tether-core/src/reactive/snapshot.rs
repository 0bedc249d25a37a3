//! Textual Snapshots
//!
//! A snapshot is the deterministic text form of a value. Derived signals
//! compare the snapshot of their upstream against the one taken at the last
//! recomputation to decide whether the memoized value is stale.
//!
//! # Determinism
//!
//! Two snapshots of the same value must be byte-identical, and two values
//! that differ in any observable way should produce different snapshots.
//! Values whose text forms collide are indistinguishable to the snapshot
//! check; use [`Staleness::Equality`](super::Staleness) for those.
//!
//! Containers compose snapshots from their elements, so a signal holding
//! another signal snapshots the innermost value.

use std::fmt::Write as _;
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;

use super::error::{Result, SignalError};

/// A value with a deterministic textual representation.
pub trait Snapshot {
    /// Append this value's snapshot to `out`.
    fn write_snapshot(&self, out: &mut String) -> Result<()>;

    /// Render this value's snapshot into a fresh string.
    fn snapshot(&self) -> Result<String> {
        let mut out = String::new();
        self.write_snapshot(&mut out)?;
        Ok(out)
    }
}

macro_rules! display_snapshot {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Snapshot for $ty {
                fn write_snapshot(&self, out: &mut String) -> Result<()> {
                    write!(out, "{}", self)?;
                    Ok(())
                }
            }
        )*
    };
}

display_snapshot!(
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, bool, char, str, String,
);

impl Snapshot for () {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        out.push_str("()");
        Ok(())
    }
}

impl<T: Snapshot + ?Sized> Snapshot for &T {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        (**self).write_snapshot(out)
    }
}

impl<T: Snapshot + ?Sized> Snapshot for Box<T> {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        (**self).write_snapshot(out)
    }
}

impl<T: Snapshot + ?Sized> Snapshot for Arc<T> {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        (**self).write_snapshot(out)
    }
}

impl<T: Snapshot + ?Sized> Snapshot for Rc<T> {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        (**self).write_snapshot(out)
    }
}

impl<T: Snapshot> Snapshot for Option<T> {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        match self {
            Some(value) => {
                out.push_str("Some(");
                value.write_snapshot(out)?;
                out.push(')');
            }
            None => out.push_str("None"),
        }
        Ok(())
    }
}

impl<T: Snapshot> Snapshot for [T] {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        out.push('[');
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            item.write_snapshot(out)?;
        }
        out.push(']');
        Ok(())
    }
}

impl<T: Snapshot, const N: usize> Snapshot for [T; N] {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        self.as_slice().write_snapshot(out)
    }
}

impl<T: Snapshot> Snapshot for Vec<T> {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        self.as_slice().write_snapshot(out)
    }
}

impl<A: Snapshot, B: Snapshot> Snapshot for (A, B) {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        out.push('(');
        self.0.write_snapshot(out)?;
        out.push_str(", ");
        self.1.write_snapshot(out)?;
        out.push(')');
        Ok(())
    }
}

impl<A: Snapshot, B: Snapshot, C: Snapshot> Snapshot for (A, B, C) {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        out.push('(');
        self.0.write_snapshot(out)?;
        out.push_str(", ");
        self.1.write_snapshot(out)?;
        out.push_str(", ");
        self.2.write_snapshot(out)?;
        out.push(')');
        Ok(())
    }
}

/// Snapshots any `Serialize` value as compact JSON.
///
/// Useful for records that have no `Snapshot` impl of their own. Map keys
/// must serialize as strings; anything `serde_json` rejects surfaces as
/// [`SignalError::Snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> Snapshot for Json<T> {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        let json = serde_json::to_string(&self.0).map_err(SignalError::snapshot::<T>)?;
        out.push_str(&json);
        Ok(())
    }
}

impl Snapshot for serde_json::Value {
    fn write_snapshot(&self, out: &mut String) -> Result<()> {
        write!(out, "{}", self)?;
        Ok(())
    }
}
