//! Engine handle scopes
//!
//! Every script value materialized by the codec occupies one engine handle.
//! A [`HandleScope`] owns the handles created while it is open and gives them
//! all back when it is dropped, whichever way the conversion exits. Closing a
//! scope with [`HandleScope::close`] escapes exactly one handle, the result,
//! into the enclosing scope.

use serde::Deserialize;
use std::cell::Cell;

use crate::error::{CodecResult, PendingException};
use crate::script::ScriptValue;

/// Longest string the engine will allocate, in UTF-16 code units
pub const DEFAULT_MAX_STRING_LENGTH: usize = (1 << 29) - 24;

/// Longest array the engine will allocate
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// Allocation limits of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    pub max_string_length: usize,
    pub max_array_length: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
        }
    }
}

/// Handle bookkeeping for one engine context.
///
/// Not `Sync`: handles belong to the engine thread.
#[derive(Debug, Default)]
pub struct HandleArena {
    limits: EngineLimits,
    live: Cell<usize>,
    peak: Cell<usize>,
}

impl HandleArena {
    /// Create an arena enforcing `limits`
    pub fn new(limits: EngineLimits) -> Self {
        Self {
            limits,
            live: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    /// Allocation limits of this arena
    pub fn limits(&self) -> EngineLimits {
        self.limits
    }

    /// Handles currently held by open scopes
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// Highest number of handles held at once
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    fn acquire(&self) {
        let live = self.live.get() + 1;
        self.live.set(live);
        if live > self.peak.get() {
            self.peak.set(live);
        }
    }
}

/// A scope of engine handles
#[derive(Debug)]
pub struct HandleScope<'a> {
    arena: &'a HandleArena,
    base: usize,
}

impl<'a> HandleScope<'a> {
    /// Open a scope on `arena`
    pub fn new(arena: &'a HandleArena) -> Self {
        Self {
            base: arena.live(),
            arena,
        }
    }

    /// Number of handles this scope currently holds
    pub fn len(&self) -> usize {
        self.arena.live() - self.base
    }

    /// Check if the scope holds no handles
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize a primitive value
    pub fn value(&self, value: ScriptValue) -> ScriptValue {
        self.arena.acquire();
        value
    }

    /// Materialize a string, raising `RangeError` past the engine limit
    pub fn string(&self, s: &str) -> CodecResult<ScriptValue> {
        // UTF-8 length bounds UTF-16 length from above; count exactly only
        // when it might matter.
        let max = self.arena.limits.max_string_length;
        if s.len() > max && s.encode_utf16().count() > max {
            return Err(PendingException::range_error("Invalid string length").into());
        }
        Ok(self.value(ScriptValue::String(s.to_string())))
    }

    /// Allocate a fixed-length array filled with `undefined`
    pub fn array(&self, len: usize) -> CodecResult<Vec<ScriptValue>> {
        if len > self.arena.limits.max_array_length {
            return Err(PendingException::range_error("Invalid array length").into());
        }
        self.arena.acquire();
        Ok(vec![ScriptValue::Undefined; len])
    }

    /// Release this scope's handles and keep one for `value` in the parent
    pub fn close(self, value: ScriptValue) -> ScriptValue {
        let arena = self.arena;
        drop(self);
        arena.acquire();
        value
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        self.arena.live.set(self.base);
    }
}
