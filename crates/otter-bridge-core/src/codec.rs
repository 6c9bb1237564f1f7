//! Value codec
//!
//! `to_host` is pure and total. `to_script` allocates engine handles and may
//! abort with the pending exception when the engine or host raises.
//!
//! Host values are classified in a fixed order: string, integral boxes
//! (`Long`, `Integer`, `Short`, `Byte`), floating boxes (`Double`, `Float`),
//! boolean, date, and only then arrays. Anything past that is unsupported and
//! converts to `undefined`.

use serde::Deserialize;
use tracing::trace;

use crate::array::{array_to_host, array_to_script};
use crate::error::CodecResult;
use crate::host::HostValue;
use crate::local::LocalRefTable;
use crate::scope::{HandleArena, HandleScope};
use crate::script::ScriptValue;

/// How a host `Long` becomes a script number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongProjection {
    /// Keep the numeric value: Int32 when it fits, then Uint32, then Int64
    #[default]
    Widen,
    /// Project through `intValue()`, truncating to 32 bits like every other
    /// integral box
    IntValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub long_projection: LongProjection,
}

/// Convert a script value to its host counterpart.
///
/// `undefined` and `null` map to host null. Int32 boxes as `Integer`;
/// UInt32 always widens to `Long` so values above `i32::MAX` keep their
/// sign. A plain number is classified the way the engine reports it: int32
/// first, then uint32, otherwise `Double`. Dates floor to whole
/// milliseconds. Plain objects and functions are not bridged and map to null.
pub fn to_host(value: &ScriptValue) -> HostValue {
    match value {
        ScriptValue::Undefined | ScriptValue::Null => HostValue::Null,
        ScriptValue::Bool(b) => HostValue::Boolean(*b),
        ScriptValue::Int32(v) => HostValue::Integer(*v),
        ScriptValue::Uint32(v) => HostValue::Long(i64::from(*v)),
        ScriptValue::Int64(v) => HostValue::Long(*v),
        ScriptValue::String(s) => HostValue::String(s.clone()),
        ScriptValue::Date(millis) => {
            if millis.is_finite() {
                HostValue::Date(millis.floor() as i64)
            } else {
                HostValue::Null
            }
        }
        ScriptValue::Number(n) => {
            if value.is_int32() {
                HostValue::Integer(*n as i32)
            } else if value.is_uint32() {
                HostValue::Long(*n as i64)
            } else {
                HostValue::Double(*n)
            }
        }
        ScriptValue::Array(items) => array_to_host(items),
        ScriptValue::Object(_) | ScriptValue::Function(_) => HostValue::Null,
    }
}

/// Host-to-script converter bound to one engine context and one host frame
#[derive(Debug, Clone, Copy)]
pub struct Marshaler<'a> {
    handles: &'a HandleArena,
    locals: &'a LocalRefTable,
    options: CodecOptions,
}

impl<'a> Marshaler<'a> {
    /// Create a marshaler over a realm's handle arena and local table
    pub fn new(handles: &'a HandleArena, locals: &'a LocalRefTable) -> Self {
        Self {
            handles,
            locals,
            options: CodecOptions::default(),
        }
    }

    /// Replace the conversion options
    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    /// Current conversion options
    pub fn options(&self) -> CodecOptions {
        self.options
    }

    pub(crate) fn locals(&self) -> &'a LocalRefTable {
        self.locals
    }

    /// Convert a host value into the engine.
    ///
    /// On error nothing is returned and every handle taken during the
    /// attempt has been released.
    pub fn to_script(&self, value: &HostValue) -> CodecResult<ScriptValue> {
        let scope = HandleScope::new(self.handles);
        let result = match value {
            HostValue::Null => scope.value(ScriptValue::Null),
            HostValue::String(s) => scope.string(s)?,
            HostValue::Long(v) => scope.value(self.project_long(*v)),
            HostValue::Integer(_) | HostValue::Short(_) | HostValue::Byte(_) => {
                scope.value(ScriptValue::Int32(value.int_value().unwrap_or_default()))
            }
            HostValue::Double(_) | HostValue::Float(_) => {
                scope.value(ScriptValue::Number(value.double_value().unwrap_or(f64::NAN)))
            }
            HostValue::Boolean(b) => scope.value(ScriptValue::Bool(*b)),
            HostValue::Date(millis) => scope.value(ScriptValue::Date(*millis as f64)),
            HostValue::Array(items) => array_to_script(self, &scope, items)?,
            // Empty handle, which the engine surfaces as undefined
            HostValue::Object(obj) => {
                trace!(class = obj.class_name(), "unsupported host object");
                scope.value(ScriptValue::Undefined)
            }
        };
        Ok(scope.close(result))
    }

    fn project_long(&self, v: i64) -> ScriptValue {
        match self.options.long_projection {
            LongProjection::IntValue => ScriptValue::Int32(v as i32),
            LongProjection::Widen => {
                if let Ok(v) = i32::try_from(v) {
                    ScriptValue::Int32(v)
                } else if let Ok(v) = u32::try_from(v) {
                    ScriptValue::Uint32(v)
                } else {
                    ScriptValue::Int64(v)
                }
            }
        }
    }
}
