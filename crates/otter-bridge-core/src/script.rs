//! Script engine value model
//!
//! [`ScriptValue`] mirrors the engine's tagged values. Every variant that can
//! hold an object graph is reference-counted with `Rc`, which keeps script
//! values `!Send` and `!Sync`: they belong to the engine thread that produced
//! them. To keep a function alive past the current turn, capture it in a
//! callback capsule instead of moving the value around.

use chrono::DateTime;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::PendingException;

/// Signature of a native function body.
///
/// Returning `Err` is the engine equivalent of throwing.
pub type NativeFunction = dyn Fn(&[ScriptValue]) -> Result<ScriptValue, PendingException>;

/// Coarse type of a script value, used in diagnostics and argument checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Date,
    Array,
    Object,
    Function,
}

impl ValueKind {
    /// Lowercase name, as `typeof`-style diagnostics print it
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
            Self::Function => "function",
        }
    }

    /// Name with an indefinite article, for "must be a ..." messages
    pub fn with_article(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "a boolean",
            Self::Number => "a number",
            Self::String => "a string",
            Self::Date => "a date",
            Self::Array => "an array",
            Self::Object => "a hash object",
            Self::Function => "a function",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value owned by the script engine
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Number(f64),
    String(String),
    /// Milliseconds since the Unix epoch; may carry a fractional part
    Date(f64),
    Array(Vec<ScriptValue>),
    Object(ScriptObject),
    Function(ScriptFunction),
}

impl ScriptValue {
    /// Create a date value
    pub fn date(millis: f64) -> Self {
        Self::Date(millis)
    }

    /// Create a native function value
    pub fn function<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> Result<ScriptValue, PendingException> + 'static,
    {
        Self::Function(ScriptFunction::new(name, body))
    }

    /// Create a plain object from `(name, value)` pairs in enumeration order
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, ScriptValue)>,
        K: Into<String>,
    {
        Self::Object(properties.into_iter().collect())
    }

    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Undefined => ValueKind::Undefined,
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Int32(_) | Self::Uint32(_) | Self::Int64(_) | Self::Number(_) => {
                ValueKind::Number
            }
            Self::String(_) => ValueKind::String,
            Self::Date(_) => ValueKind::Date,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
            Self::Function(_) => ValueKind::Function,
        }
    }

    /// Check if the value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Check if the value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Check if the value is a boolean
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Check if the value is a function
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Whether the value is an object in the engine's sense.
    ///
    /// Arrays, dates and functions are objects too.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Self::Object(_) | Self::Array(_) | Self::Date(_) | Self::Function(_)
        )
    }

    /// True when the engine would report this number as a 32-bit signed
    /// integer, whatever its storage variant.
    pub fn is_int32(&self) -> bool {
        match self {
            Self::Int32(_) => true,
            Self::Uint32(v) => i32::try_from(*v).is_ok(),
            Self::Int64(v) => i32::try_from(*v).is_ok(),
            Self::Number(n) => integral_in_range(*n, f64::from(i32::MIN), f64::from(i32::MAX)),
            _ => false,
        }
    }

    /// True when the engine would report this number as a 32-bit unsigned
    /// integer.
    pub fn is_uint32(&self) -> bool {
        match self {
            Self::Int32(v) => *v >= 0,
            Self::Uint32(_) => true,
            Self::Int64(v) => u32::try_from(*v).is_ok(),
            Self::Number(n) => integral_in_range(*n, 0.0, f64::from(u32::MAX)),
            _ => false,
        }
    }

    /// Get the string if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean if this is a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the numeric value of any number variant
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Uint32(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the function if this is a function value
    pub fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Own enumerable property names in enumeration order.
    ///
    /// Array indices come first as decimal strings. Primitives, dates and
    /// functions enumerate nothing.
    pub fn own_property_names(&self) -> Vec<String> {
        match self {
            Self::Object(obj) => obj.keys().map(str::to_owned).collect(),
            Self::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Read an own property. Missing properties read as `None`.
    pub fn get_property(&self, name: &str) -> Option<&ScriptValue> {
        match self {
            Self::Object(obj) => obj.get(name),
            Self::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// The engine's `ToString` coercion.
    ///
    /// Fails only when user code runs during the coercion and throws, e.g. an
    /// object whose own `toString` raises.
    pub fn to_js_string(&self) -> Result<String, PendingException> {
        match self {
            Self::Undefined => Ok("undefined".to_string()),
            Self::Null => Ok("null".to_string()),
            Self::Bool(b) => Ok(b.to_string()),
            Self::Int32(v) => Ok(v.to_string()),
            Self::Uint32(v) => Ok(v.to_string()),
            Self::Int64(v) => Ok(v.to_string()),
            Self::Number(n) => Ok(number_to_string(*n)),
            Self::String(s) => Ok(s.clone()),
            Self::Date(millis) => Ok(date_to_string(*millis)),
            Self::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_null_or_undefined() {
                        parts.push(String::new());
                    } else {
                        parts.push(item.to_js_string()?);
                    }
                }
                Ok(parts.join(","))
            }
            Self::Object(obj) => match obj.get("toString") {
                Some(Self::Function(to_string)) => {
                    let primitive = to_string.call(&[])?;
                    if primitive.is_object() {
                        return Err(PendingException::type_error(
                            "Cannot convert object to primitive value",
                        ));
                    }
                    primitive.to_js_string()
                }
                _ => Ok("[object Object]".to_string()),
            },
            Self::Function(f) => Ok(format!(
                "function {}() {{\n    [native code]\n}}",
                f.name()
            )),
        }
    }

    /// Strict equality with numbers compared by value across storage
    /// variants (`Int32(5)` is equivalent to `Number(5.0)`).
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
            }
            _ => match (integral_value(self), integral_value(other)) {
                (Some(a), Some(b)) => a == b,
                _ => match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a == b,
                    _ => self == other,
                },
            },
        }
    }
}

fn integral_in_range(n: f64, min: f64, max: f64) -> bool {
    n.fract() == 0.0 && n >= min && n <= max && !(n == 0.0 && n.is_sign_negative())
}

fn integral_value(value: &ScriptValue) -> Option<i128> {
    match value {
        ScriptValue::Int32(v) => Some(i128::from(*v)),
        ScriptValue::Uint32(v) => Some(i128::from(*v)),
        ScriptValue::Int64(v) => Some(i128::from(*v)),
        _ => None,
    }
}

/// `Number::toString` with radix 10
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut buf = ryu_js::Buffer::new();
    buf.format(n).to_string()
}

/// `Date.prototype.toString`, rendered in UTC
pub fn date_to_string(millis: f64) -> String {
    if !millis.is_finite() {
        return "Invalid Date".to_string();
    }
    match DateTime::from_timestamp_millis(millis.trunc() as i64) {
        Some(dt) => dt
            .format("%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)")
            .to_string(),
        None => "Invalid Date".to_string(),
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<u32> for ScriptValue {
    fn from(v: u32) -> Self {
        Self::Uint32(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(items: Vec<ScriptValue>) -> Self {
        Self::Array(items)
    }
}

impl From<ScriptObject> for ScriptValue {
    fn from(obj: ScriptObject) -> Self {
        Self::Object(obj)
    }
}

impl From<ScriptFunction> for ScriptValue {
    fn from(f: ScriptFunction) -> Self {
        Self::Function(f)
    }
}

/// A plain script object with own properties kept in insertion order
#[derive(Clone, Default)]
pub struct ScriptObject {
    properties: Rc<Vec<(String, ScriptValue)>>,
}

impl ScriptObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an own property
    pub fn get(&self, name: &str) -> Option<&ScriptValue> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Own property names in enumeration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(key, _)| key.as_str())
    }

    /// Own properties in enumeration order
    pub fn entries(&self) -> &[(String, ScriptValue)] {
        &self.properties
    }

    /// Number of own properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the object has no own properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ScriptValue)> for ScriptObject {
    /// Re-assigning a key keeps its original position, as property
    /// assignment does.
    fn from_iter<I: IntoIterator<Item = (K, ScriptValue)>>(iter: I) -> Self {
        let mut properties: Vec<(String, ScriptValue)> = Vec::new();
        for (key, value) in iter {
            let key = key.into();
            match properties.iter_mut().find(|(existing, _)| *existing == key) {
                Some(slot) => slot.1 = value,
                None => properties.push((key, value)),
            }
        }
        Self {
            properties: Rc::new(properties),
        }
    }
}

impl PartialEq for ScriptObject {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.properties, &other.properties) || self.properties == other.properties
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.properties.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

struct FunctionInner {
    name: String,
    body: Box<NativeFunction>,
}

/// A callable script function.
///
/// Clones share the same function; equality is identity.
#[derive(Clone)]
pub struct ScriptFunction {
    inner: Rc<FunctionInner>,
}

impl ScriptFunction {
    /// Create a function from a native body
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> Result<ScriptValue, PendingException> + 'static,
    {
        Self {
            inner: Rc::new(FunctionInner {
                name: name.into(),
                body: Box::new(body),
            }),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Invoke the function. Must run on the engine thread, which `!Send`
    /// already guarantees.
    pub fn call(&self, args: &[ScriptValue]) -> Result<ScriptValue, PendingException> {
        (self.inner.body)(args)
    }

    /// Number of strong references keeping the function alive
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Check if both refer to the same function
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A non-owning reference, useful to observe when the function dies
    pub fn downgrade(&self) -> WeakScriptFunction {
        WeakScriptFunction(Rc::downgrade(&self.inner))
    }
}

impl PartialEq for ScriptFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.inner.name)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Weak counterpart of [`ScriptFunction`]
#[derive(Clone)]
pub struct WeakScriptFunction(Weak<FunctionInner>);

impl WeakScriptFunction {
    /// Get the function back if it is still alive
    pub fn upgrade(&self) -> Option<ScriptFunction> {
        self.0.upgrade().map(|inner| ScriptFunction { inner })
    }

    /// Check if the function is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakScriptFunction(alive: {})", self.is_alive())
    }
}
