//! Error types for otter-bridge
//!
//! Wraps codec errors from otter-bridge-core and adds dispatch errors.

use thiserror::Error;

use otter_bridge_core::{CodecError, PendingException, ScriptValue, ValueKind};

use crate::capsule::CallbackToken;

/// Errors raised by the dispatch bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Fewer arguments than the entry point requires
    #[error("Not enough parameters: expected {expected}, got {actual}")]
    Arity { expected: usize, actual: usize },

    /// Argument at `index` has the wrong type
    #[error("Parameter {index} must be {}", .expected.with_article())]
    TypeError { index: usize, expected: ValueKind },

    /// Callback capture attempted on something that is not a function
    #[error("Callback must be a function, got {}", .actual.with_article())]
    InvalidCallback { actual: ValueKind },

    /// Value conversion raised in the engine or the host
    #[error(transparent)]
    Conversion(#[from] CodecError),

    /// No host dispatcher, or the dispatcher refused the request
    #[error("Host dispatch unavailable: {0}")]
    DispatchUnavailable(String),

    /// The delivered callback threw
    #[error("Callback threw {0}")]
    CallbackThrew(PendingException),

    /// Token is not outstanding: never issued, released, or already settled
    #[error("No outstanding callback for {0}")]
    UnknownCallback(CallbackToken),

    /// The realm owning the callback is gone
    #[error("Realm has shut down")]
    RealmClosed,

    #[error("Invalid bridge configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl BridgeError {
    /// Host dispatch failure with `message`
    pub fn dispatch_unavailable(message: impl Into<String>) -> Self {
        Self::DispatchUnavailable(message.into())
    }

    /// Argument checks that fail before any host interaction
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Arity { .. } | Self::TypeError { .. } | Self::InvalidCallback { .. }
        )
    }

    /// The value thrown into script for this error.
    ///
    /// Validation failures throw their bare message as a string. Engine and
    /// host exceptions keep their `Type: message` rendering.
    pub fn to_exception(&self) -> ScriptValue {
        match self {
            Self::Arity { .. } => ScriptValue::from("Not enough parameters"),
            Self::Conversion(err) => ScriptValue::from(err.pending_exception().to_string()),
            Self::CallbackThrew(exc) => ScriptValue::from(exc.to_string()),
            other => ScriptValue::from(other.to_string()),
        }
    }

    /// The exception a script-visible entry point leaves pending
    pub fn into_pending_exception(self) -> PendingException {
        match self {
            Self::Conversion(err) => err.into_pending_exception(),
            Self::CallbackThrew(exc) => exc,
            Self::Arity { .. } => PendingException::engine("Error", "Not enough parameters"),
            err @ (Self::TypeError { .. } | Self::InvalidCallback { .. }) => {
                PendingException::type_error(err.to_string())
            }
            other => PendingException::engine("Error", other.to_string()),
        }
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        let err = BridgeError::TypeError {
            index: 0,
            expected: ValueKind::String,
        };
        assert_eq!(err.to_string(), "Parameter 0 must be a string");
        assert!(err.is_validation());

        let err = BridgeError::TypeError {
            index: 2,
            expected: ValueKind::Object,
        };
        assert_eq!(err.to_exception(), ScriptValue::from("Parameter 2 must be a hash object"));
    }

    #[test]
    fn test_arity_exception_is_bare_message() {
        let err = BridgeError::Arity {
            expected: 5,
            actual: 2,
        };
        assert_eq!(err.to_string(), "Not enough parameters: expected 5, got 2");
        assert_eq!(err.to_exception(), ScriptValue::from("Not enough parameters"));
    }

    #[test]
    fn test_into_pending_exception() {
        let exc = BridgeError::TypeError {
            index: 4,
            expected: ValueKind::Function,
        }
        .into_pending_exception();
        assert_eq!(exc.error_type, "TypeError");
        assert_eq!(exc.message, "Parameter 4 must be a function");

        let thrown = PendingException::engine("Error", "boom");
        let exc = BridgeError::CallbackThrew(thrown.clone()).into_pending_exception();
        assert_eq!(exc, thrown);
    }

    #[test]
    fn test_conversion_keeps_exception_rendering() {
        let err = BridgeError::from(CodecError::from(PendingException::range_error(
            "Invalid string length",
        )));
        assert!(!err.is_validation());
        assert_eq!(
            err.to_exception(),
            ScriptValue::from("RangeError: Invalid string length")
        );
    }
}
