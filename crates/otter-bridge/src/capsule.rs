//! Callback capsules
//!
//! A capsule keeps a script function alive from the moment a request is
//! dispatched until its response is delivered or the request is abandoned.
//! The host never sees the function itself, only the capsule's
//! [`CallbackToken`], which it passes back when it delivers.
//!
//! Invoking and releasing both consume the capsule, so a capsule can be
//! settled at most once.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use otter_bridge_core::{PendingException, ScriptFunction, ScriptValue};
use tracing::trace;

use crate::error::{BridgeError, BridgeResult};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a captured callback.
///
/// Tokens are unique for the life of the process and plain data, so they can
/// travel to any host thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackToken(u64);

impl CallbackToken {
    fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuild a token from the raw id a host stored
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw token value
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

/// A strong, engine-thread-only reference to a script callback
pub struct CallbackCapsule {
    token: CallbackToken,
    function: ScriptFunction,
}

impl CallbackCapsule {
    /// Capture a callback, keeping it alive until the capsule is settled
    pub fn capture(value: &ScriptValue) -> BridgeResult<Self> {
        match value {
            ScriptValue::Function(function) => {
                let capsule = Self {
                    token: CallbackToken::next(),
                    function: function.clone(),
                };
                trace!(token = %capsule.token, name = function.name(), "callback captured");
                Ok(capsule)
            }
            other => Err(BridgeError::InvalidCallback {
                actual: other.kind(),
            }),
        }
    }

    /// Token identifying this capsule
    pub fn identity(&self) -> CallbackToken {
        self.token
    }

    /// The held function
    pub fn function(&self) -> &ScriptFunction {
        &self.function
    }

    /// Call the callback once and release it
    pub fn invoke(self, args: &[ScriptValue]) -> Result<ScriptValue, PendingException> {
        trace!(token = %self.token, argc = args.len(), "invoking callback");
        self.function.call(args)
    }

    /// Release the callback without calling it
    pub fn release(self) {
        trace!(token = %self.token, "callback released");
    }
}

impl fmt::Debug for CallbackCapsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCapsule")
            .field("token", &self.token)
            .field("function", &self.function.name())
            .finish()
    }
}

/// Live capsules of one realm, keyed by token
#[derive(Debug, Default)]
pub(crate) struct CapsuleTable {
    entries: RefCell<HashMap<CallbackToken, CallbackCapsule>>,
}

impl CapsuleTable {
    pub(crate) fn insert(&self, capsule: CallbackCapsule) -> CallbackToken {
        let token = capsule.identity();
        self.entries.borrow_mut().insert(token, capsule);
        token
    }

    /// Remove a capsule so it can be settled. The borrow ends before the
    /// caller runs script code, which may re-enter the realm.
    pub(crate) fn take(&self, token: CallbackToken) -> Option<CallbackCapsule> {
        self.entries.borrow_mut().remove(&token)
    }

    pub(crate) fn contains(&self, token: CallbackToken) -> bool {
        self.entries.borrow().contains_key(&token)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_capture_rejects_non_functions() {
        let err = CallbackCapsule::capture(&ScriptValue::from("nope")).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InvalidCallback {
                actual: otter_bridge_core::ValueKind::String
            }
        ));
        assert_eq!(err.to_string(), "Callback must be a function, got a string");
    }

    #[test]
    fn test_tokens_are_distinct() {
        let f = ScriptValue::function("cb", |_| Ok(ScriptValue::Undefined));
        let a = CallbackCapsule::capture(&f).unwrap();
        let b = CallbackCapsule::capture(&f).unwrap();
        assert_ne!(a.identity(), b.identity());
        assert_eq!(CallbackToken::from_raw(a.identity().as_raw()), a.identity());
    }

    #[test]
    fn test_capsule_keeps_function_alive() {
        let f = ScriptFunction::new("cb", |_| Ok(ScriptValue::Undefined));
        let weak = f.downgrade();
        let capsule = CallbackCapsule::capture(&ScriptValue::Function(f)).unwrap();
        assert!(weak.is_alive());
        capsule.release();
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_invoke_calls_once_and_releases() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let f = ScriptFunction::new("cb", move |args| {
            seen.set(seen.get() + 1);
            Ok(args.first().cloned().unwrap_or(ScriptValue::Undefined))
        });
        let weak = f.downgrade();
        let capsule = CallbackCapsule::capture(&ScriptValue::Function(f)).unwrap();
        let result = capsule.invoke(&[ScriptValue::Int32(7)]).unwrap();
        assert_eq!(result, ScriptValue::Int32(7));
        assert_eq!(calls.get(), 1);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_table_take_is_single_shot() {
        let table = CapsuleTable::default();
        let f = ScriptValue::function("cb", |_| Ok(ScriptValue::Undefined));
        let token = table.insert(CallbackCapsule::capture(&f).unwrap());
        assert!(table.contains(token));
        assert_eq!(table.len(), 1);
        assert!(table.take(token).is_some());
        assert!(table.take(token).is_none());
        assert!(table.is_empty());
    }
}
