use serde::{Serialize, Serializer};

use super::{ObjectMap, Value};

/// A structured log event: a map of field names to values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogEvent {
    fields: ObjectMap,
}

impl LogEvent {
    /// Creates an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a field.
    ///
    /// An exact top-level match wins; otherwise the key is treated as a
    /// dot-separated path into nested objects (and array indices).
    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        let key = key.as_ref();
        if let Some(value) = self.fields.get(key) {
            return Some(value);
        }

        let mut segments = key.split('.');
        let first = self.fields.get(segments.next()?)?;
        segments.try_fold(first, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(array) => segment.parse::<usize>().ok().and_then(|i| array.get(i)),
            _ => None,
        })
    }

    /// Returns true if [`LogEvent::get`] finds the field.
    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a top-level field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Removes a top-level field.
    pub fn remove(&mut self, key: impl AsRef<str>) -> Option<Value> {
        self.fields.remove(key.as_ref())
    }

    /// Returns true if the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<ObjectMap> for LogEvent {
    fn from(fields: ObjectMap) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for LogEvent {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl TryFrom<serde_json::Value> for LogEvent {
    type Error = crate::Error;

    fn try_from(json: serde_json::Value) -> crate::Result<Self> {
        match Value::from(json) {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(format!(
                "Attempted to convert non-object JSON value into a log event: {}",
                other.to_string_lossy()
            )
            .into()),
        }
    }
}

impl Serialize for LogEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(&self.fields)
    }
}
