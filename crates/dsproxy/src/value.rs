//! Values bound to and read from driver objects.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A SQL value as seen by the proxy layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (any width, widened to 64 bits)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Timestamp with timezone
    Timestamp(DateTime<Utc>),
    /// JSON document
    Json(serde_json::Value),
}

impl Value {
    /// Check if value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text payload, if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// How a parameter is addressed: by 1-based position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterKey {
    /// Positional parameter (1-based)
    Index(usize),
    /// Named parameter (callable statements)
    Name(String),
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKey::Index(i) => write!(f, "{i}"),
            ParameterKey::Name(name) => write!(f, ":{name}"),
        }
    }
}

impl From<usize> for ParameterKey {
    fn from(index: usize) -> Self {
        ParameterKey::Index(index)
    }
}

impl From<i32> for ParameterKey {
    fn from(index: i32) -> Self {
        ParameterKey::Index(usize::try_from(index).unwrap_or(0))
    }
}

impl From<&str> for ParameterKey {
    fn from(name: &str) -> Self {
        ParameterKey::Name(name.to_string())
    }
}

impl From<String> for ParameterKey {
    fn from(name: String) -> Self {
        ParameterKey::Name(name)
    }
}

impl From<&ParameterKey> for Value {
    fn from(key: &ParameterKey) -> Self {
        match key {
            ParameterKey::Index(i) => Value::from(*i),
            ParameterKey::Name(name) => Value::Text(name.clone()),
        }
    }
}

/// Bound parameters in binding order.
///
/// Re-binding a key that is already present replaces its value in place, so
/// the first binding of each key fixes its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parameters {
    entries: Vec<(ParameterKey, Value)>,
}

impl Parameters {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `key`.
    pub fn set(&mut self, key: impl Into<ParameterKey>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`Parameters::set`].
    pub fn with(mut self, key: impl Into<ParameterKey>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Value bound to `key`, if any.
    pub fn get(&self, key: &ParameterKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Remove the binding for `key`, returning its value.
    pub fn remove(&mut self, key: &ParameterKey) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no parameter is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every binding.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over bindings in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Bound values in binding order.
    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }
}

impl<K: Into<ParameterKey>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

/// One query sent to the driver together with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryInfo {
    /// Query text as forwarded to the driver (after transformation).
    pub query: String,
    /// Parameters bound for this execution (empty for plain statements).
    pub parameters: Parameters,
}

impl QueryInfo {
    /// A query without parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: Parameters::new(),
        }
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_keeps_original_position() {
        let mut params = Parameters::new();
        params.set(1, "a");
        params.set(2, 10);
        params.set(1, "b");

        let keys: Vec<_> = params.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![ParameterKey::Index(1), ParameterKey::Index(2)]);
        assert_eq!(params.get(&ParameterKey::Index(1)), Some(&Value::from("b")));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn named_and_positional_keys_coexist() {
        let params: Parameters = [
            (ParameterKey::Name("user".into()), Value::from("alice")),
            (ParameterKey::Index(1), Value::from(7)),
        ]
        .into_iter()
        .collect();

        assert_eq!(params.values(), vec![Value::from("alice"), Value::Int(7)]);
        assert_eq!(
            params.get(&ParameterKey::from("user")).and_then(Value::as_str),
            Some("alice")
        );
    }

    #[test]
    fn remove_and_clear() {
        let mut params = Parameters::new().with(1, 1).with(2, 2).with(3, 3);
        assert_eq!(params.remove(&ParameterKey::Index(2)), Some(Value::Int(2)));
        assert_eq!(params.values(), vec![Value::Int(1), Value::Int(3)]);
        assert!(params.remove(&ParameterKey::Index(9)).is_none());

        params.clear();
        assert!(params.is_empty());
    }

    #[test]
    fn option_maps_to_null() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn display_values_and_keys() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bytes(vec![1, 2, 3]).to_string(), "<3 bytes>");
        assert_eq!(ParameterKey::Index(2).to_string(), "2");
        assert_eq!(ParameterKey::from("id").to_string(), ":id");
    }
}
