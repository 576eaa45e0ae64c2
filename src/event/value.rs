use std::{borrow::Cow, collections::BTreeMap};

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use ordered_float::NotNan;
use serde::{Serialize, Serializer};

/// The fields of an object value, keyed by field name.
pub type ObjectMap = BTreeMap<String, Value>;

/// A value stored in a field of a [`LogEvent`](super::LogEvent).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Raw bytes, usually UTF-8 text.
    Bytes(Bytes),

    /// A signed integer.
    Integer(i64),

    /// A floating point number that is never NaN.
    Float(NotNan<f64>),

    /// A boolean.
    Boolean(bool),

    /// A point in time in UTC.
    Timestamp(DateTime<Utc>),

    /// A nested map of fields.
    Object(ObjectMap),

    /// An ordered list of values.
    Array(Vec<Value>),

    /// The absence of a value.
    Null,
}

impl Value {
    /// Creates a Value from an f64. If the value is NaN, it is converted to 0.0
    #[must_use]
    pub fn from_f64_or_zero(value: f64) -> Self {
        NotNan::new(value).map_or_else(
            |_| Self::Float(NotNan::new(0.0).expect("0.0 is not NaN")),
            Self::Float,
        )
    }

    /// Returns true if self is `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Serializes the value as JSON text.
    ///
    /// # Errors
    ///
    /// Fails only if the underlying JSON writer fails.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Converts the value to its string representation (JSON for objects and arrays).
    ///
    /// `Null` converts to the empty string.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self {
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
            Self::Timestamp(timestamp) => Cow::Owned(timestamp_to_string(timestamp)),
            Self::Integer(num) => Cow::Owned(num.to_string()),
            Self::Float(num) => Cow::Owned(num.to_string()),
            Self::Boolean(b) => Cow::Owned(b.to_string()),
            Self::Object(_) | Self::Array(_) => Cow::Owned(self.to_json_string().unwrap_or_default()),
            Self::Null => Cow::Borrowed(""),
        }
    }
}

pub(crate) fn timestamp_to_string(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self {
            Self::Bytes(bytes) => serializer.serialize_str(String::from_utf8_lossy(bytes).as_ref()),
            Self::Timestamp(timestamp) => serializer.serialize_str(&timestamp_to_string(timestamp)),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(f.into_inner()),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Object(m) => serializer.collect_map(m),
            Self::Array(a) => serializer.collect_seq(a),
            Self::Null => serializer.serialize_none(),
        }
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Self::Bytes(string.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<NotNan<f64>> for Value {
    fn from(value: NotNan<f64>) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Self::Timestamp(timestamp)
    }
}

impl From<ObjectMap> for Value {
    fn from(map: ObjectMap) -> Self {
        Self::Object(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(array: Vec<Value>) -> Self {
        Self::Array(array)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json_value: serde_json::Value) -> Self {
        match json_value {
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::from_f64_or_zero(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::from(s),
            serde_json::Value::Object(obj) => Self::Object(
                obj.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => Self::Array(arr.into_iter().map(Self::from).collect()),
            serde_json::Value::Null => Self::Null,
        }
    }
}
