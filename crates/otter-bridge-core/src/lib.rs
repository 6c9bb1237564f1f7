//! Value marshaling between a script engine and a host object model.
//!
//! This crate holds the pure half of the otter bridge: the two value models
//! and the codecs between them.
//!
//! - [`ScriptValue`]: the engine's tagged values (primitives, strings, dates,
//!   arrays, plain objects, functions)
//! - [`HostValue`]: boxed host values (`String`, `Long`/`Integer`/`Short`/
//!   `Byte`, `Double`/`Float`, `Boolean`, `Date`, arrays)
//! - [`to_host`] and [`Marshaler::to_script`]: the value codec, with arrays
//!   handled element by element
//!
//! Only primitives, strings, dates, arrays and functions are bridged. Plain
//! objects and foreign host classes are not marshaled.
//!
//! # Example
//!
//! ```
//! use otter_bridge_core::{HandleArena, HostValue, LocalRefTable, Marshaler, ScriptValue, to_host};
//!
//! let handles = HandleArena::default();
//! let locals = LocalRefTable::default();
//! let marshaler = Marshaler::new(&handles, &locals);
//!
//! let host = to_host(&ScriptValue::Uint32(3_000_000_000));
//! assert_eq!(host, HostValue::Long(3_000_000_000));
//!
//! let back = marshaler.to_script(&host).unwrap();
//! assert_eq!(back, ScriptValue::Uint32(3_000_000_000));
//! ```
//!
//! # Thread Safety
//!
//! Script values, handle arenas and local reference tables are `!Send` and
//! `!Sync`. They belong to the engine thread. Host values are plain data and
//! may cross threads freely.
//!
//! ```compile_fail
//! use otter_bridge_core::ScriptValue;
//!
//! let f = ScriptValue::function("cb", |_| Ok(ScriptValue::Undefined));
//! std::thread::spawn(move || {
//!     drop(f); // Error: ScriptValue is !Send
//! });
//! ```

mod array;
mod codec;
mod error;
mod host;
mod local;
mod scope;
mod script;

pub use array::array_to_host;
pub use codec::{CodecOptions, LongProjection, Marshaler, to_host};
pub use error::{CodecError, CodecResult, ExceptionOrigin, PendingException};
pub use host::{HostClass, HostObject, HostValue};
pub use local::{DEFAULT_LOCAL_REF_CAPACITY, LocalRef, LocalRefTable};
pub use scope::{
    DEFAULT_MAX_ARRAY_LENGTH, DEFAULT_MAX_STRING_LENGTH, EngineLimits, HandleArena, HandleScope,
};
pub use script::{
    NativeFunction, ScriptFunction, ScriptObject, ScriptValue, ValueKind, WeakScriptFunction,
    date_to_string, number_to_string,
};
