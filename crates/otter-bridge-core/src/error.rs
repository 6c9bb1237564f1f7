//! Error types for value conversion
//!
//! Conversion never produces a best-effort value once either side has raised.
//! The raised exception travels inside [`CodecError::ConversionAborted`] so the
//! caller can rethrow it into the script context or log it.

use thiserror::Error;

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Which side of the bridge raised an exception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionOrigin {
    /// The script engine (allocation limits, throwing getters, `toString`)
    Engine,
    /// The host runtime (local reference overflow, throwing accessors)
    Host,
}

/// An exception left pending by the engine or the host while a value was
/// being produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error_type}: {message}")]
pub struct PendingException {
    /// Exception class, e.g. `RangeError` or `java.lang.OutOfMemoryError`
    pub error_type: String,
    /// Human-readable message
    pub message: String,
    /// Side that raised it
    pub origin: ExceptionOrigin,
}

impl PendingException {
    /// Create an engine-side exception
    pub fn engine(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            origin: ExceptionOrigin::Engine,
        }
    }

    /// Create a host-side exception
    pub fn host(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            origin: ExceptionOrigin::Host,
        }
    }

    /// Engine `RangeError`
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::engine("RangeError", message)
    }

    /// Engine `TypeError`
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::engine("TypeError", message)
    }
}

/// Errors surfaced by the value and array codecs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A nested engine or host call raised; no partial value was produced
    #[error("Conversion aborted, exception pending: {0}")]
    ConversionAborted(#[source] PendingException),
}

impl CodecError {
    /// The exception that aborted the conversion
    pub fn pending_exception(&self) -> &PendingException {
        match self {
            Self::ConversionAborted(exception) => exception,
        }
    }

    /// Consume the error, keeping only the pending exception
    pub fn into_pending_exception(self) -> PendingException {
        match self {
            Self::ConversionAborted(exception) => exception,
        }
    }
}

impl From<PendingException> for CodecError {
    fn from(exception: PendingException) -> Self {
        Self::ConversionAborted(exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_exception_display() {
        let exc = PendingException::range_error("Invalid string length");
        assert_eq!(exc.to_string(), "RangeError: Invalid string length");
        assert_eq!(exc.origin, ExceptionOrigin::Engine);
    }

    #[test]
    fn test_conversion_aborted_keeps_exception() {
        let err = CodecError::from(PendingException::host(
            "java.lang.OutOfMemoryError",
            "local reference table overflow",
        ));
        assert!(err.to_string().starts_with("Conversion aborted"));
        assert_eq!(err.pending_exception().origin, ExceptionOrigin::Host);
        assert_eq!(
            err.into_pending_exception().error_type,
            "java.lang.OutOfMemoryError"
        );
    }
}
