//! Host object model
//!
//! The host is a class-based managed runtime where primitives travel boxed
//! (`Integer`, `Long`, `Double`, ...). [`HostValue`] is the closed set of
//! shapes the bridge understands; anything else arrives as an opaque
//! [`HostObject`] and is not marshaled.

use std::fmt;

/// A boxed host value
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    String(String),
    Long(i64),
    Integer(i32),
    Short(i16),
    Byte(i8),
    Double(f64),
    Float(f32),
    Boolean(bool),
    /// Milliseconds since the Unix epoch
    Date(i64),
    Array(Vec<HostValue>),
    Object(HostObject),
}

/// Runtime class of a [`HostValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostClass {
    String,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    Boolean,
    Date,
    Array,
    Object,
}

impl HostClass {
    /// Fully qualified class name on the host side
    pub fn binary_name(self) -> &'static str {
        match self {
            Self::String => "java.lang.String",
            Self::Long => "java.lang.Long",
            Self::Integer => "java.lang.Integer",
            Self::Short => "java.lang.Short",
            Self::Byte => "java.lang.Byte",
            Self::Double => "java.lang.Double",
            Self::Float => "java.lang.Float",
            Self::Boolean => "java.lang.Boolean",
            Self::Date => "java.util.Date",
            Self::Array => "java.lang.Object[]",
            Self::Object => "java.lang.Object",
        }
    }

    /// Subclasses of `Number` projected through `intValue()`
    pub fn is_integral(self) -> bool {
        matches!(self, Self::Long | Self::Integer | Self::Short | Self::Byte)
    }

    /// Subclasses of `Number` projected through `doubleValue()`
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Double | Self::Float)
    }
}

impl fmt::Display for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

impl HostValue {
    /// Runtime class, `None` for null
    pub fn class(&self) -> Option<HostClass> {
        Some(match self {
            Self::Null => return None,
            Self::String(_) => HostClass::String,
            Self::Long(_) => HostClass::Long,
            Self::Integer(_) => HostClass::Integer,
            Self::Short(_) => HostClass::Short,
            Self::Byte(_) => HostClass::Byte,
            Self::Double(_) => HostClass::Double,
            Self::Float(_) => HostClass::Float,
            Self::Boolean(_) => HostClass::Boolean,
            Self::Date(_) => HostClass::Date,
            Self::Array(_) => HostClass::Array,
            Self::Object(_) => HostClass::Object,
        })
    }

    /// Check if this is host null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `Number.intValue()`: integral boxes narrow to 32 bits, floating boxes
    /// truncate toward zero and saturate.
    pub fn int_value(&self) -> Option<i32> {
        match self {
            Self::Long(v) => Some(*v as i32),
            Self::Integer(v) => Some(*v),
            Self::Short(v) => Some(i32::from(*v)),
            Self::Byte(v) => Some(i32::from(*v)),
            Self::Double(v) => Some(*v as i32),
            Self::Float(v) => Some(*v as i32),
            _ => None,
        }
    }

    /// `Number.longValue()`
    pub fn long_value(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            Self::Integer(v) => Some(i64::from(*v)),
            Self::Short(v) => Some(i64::from(*v)),
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Double(v) => Some(*v as i64),
            Self::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// `Number.doubleValue()`
    pub fn double_value(&self) -> Option<f64> {
        match self {
            Self::Long(v) => Some(*v as f64),
            Self::Integer(v) => Some(f64::from(*v)),
            Self::Short(v) => Some(f64::from(*v)),
            Self::Byte(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Get the string if this is a `java.lang.String`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Create an opaque object of the given class
    pub fn object(class_name: impl Into<String>) -> Self {
        Self::Object(HostObject::new(class_name))
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for HostValue {
    /// Integers box as `Integer` when they fit, `Long` otherwise. JSON
    /// objects have no counterpart in the bridged set and become opaque
    /// `java.util.Map` instances.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    i32::try_from(v).map_or(Self::Long(v), Self::Integer)
                } else if let Some(v) = n.as_u64() {
                    i64::try_from(v).map_or(Self::Double(v as f64), Self::Long)
                } else {
                    Self::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(_) => Self::object("java.util.Map"),
        }
    }
}

/// A host object outside the bridged set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostObject {
    class_name: String,
}

impl HostObject {
    /// Create an opaque object of the given class
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }

    /// Binary name of the object's class
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_groups() {
        for class in [
            HostClass::Long,
            HostClass::Integer,
            HostClass::Short,
            HostClass::Byte,
        ] {
            assert!(class.is_integral());
            assert!(!class.is_floating());
        }
        assert!(HostClass::Float.is_floating());
        assert!(!HostClass::Boolean.is_integral());
        assert_eq!(HostValue::Null.class(), None);
        assert_eq!(HostValue::Date(0).class(), Some(HostClass::Date));
    }

    #[test]
    fn test_int_value_truncates() {
        assert_eq!(HostValue::Long(1 << 32).int_value(), Some(0));
        assert_eq!(HostValue::Long(3_000_000_000).int_value(), Some(-1_294_967_296));
        assert_eq!(HostValue::Byte(-3).int_value(), Some(-3));
        assert_eq!(HostValue::Double(2.9).int_value(), Some(2));
        assert_eq!(HostValue::from("1").int_value(), None);
    }

    #[test]
    fn test_from_json() {
        let value = HostValue::from(json!([1, 5_000_000_000_i64, 1.5, "a", true, null, {"k": 1}]));
        assert_eq!(
            value,
            HostValue::Array(vec![
                HostValue::Integer(1),
                HostValue::Long(5_000_000_000),
                HostValue::Double(1.5),
                HostValue::from("a"),
                HostValue::Boolean(true),
                HostValue::Null,
                HostValue::object("java.util.Map"),
            ])
        );
    }

    #[test]
    fn test_from_option_and_vec() {
        assert_eq!(HostValue::from(None::<i32>), HostValue::Null);
        assert_eq!(
            HostValue::from(vec!["a", "b"]),
            HostValue::Array(vec![HostValue::from("a"), HostValue::from("b")])
        );
    }
}
