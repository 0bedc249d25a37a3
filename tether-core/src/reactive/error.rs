//! Errors raised while reading derived signals.

use thiserror::Error;

/// Boxed error produced by a fallible derivation function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the reactive module.
pub type Result<T, E = SignalError> = std::result::Result<T, E>;

/// Failure while checking staleness or recomputing a derived value.
#[derive(Debug, Error)]
pub enum SignalError {
    /// The upstream value could not be turned into its textual snapshot.
    #[error("Unable to snapshot value. type: {type_name}, reason: {reason}")]
    Snapshot {
        type_name: &'static str,
        reason: String,
    },

    /// The derivation function rejected the upstream value.
    #[error("Derivation failed. reason: {0}")]
    Derivation(#[source] BoxError),
}

impl SignalError {
    pub(crate) fn snapshot<T: ?Sized>(reason: impl std::fmt::Display) -> Self {
        Self::Snapshot {
            type_name: std::any::type_name::<T>(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the failure came from the derivation function.
    pub fn is_derivation(&self) -> bool {
        matches!(self, Self::Derivation(_))
    }
}

impl From<std::fmt::Error> for SignalError {
    fn from(error: std::fmt::Error) -> Self {
        Self::Snapshot {
            type_name: "core::fmt::Write",
            reason: error.to_string(),
        }
    }
}
