//! Document-store values
//!
//! This module defines [`Value`], the dynamically typed value that flows through every
//! intercepted call, and [`Document`], the insertion-ordered map used for query specs,
//! sort orderings and call records. Key order is significant: a sort document
//! `{b: -1, a: 1}` is not the same ordering as `{a: 1, b: -1}`.

use base64::Engine;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::Result;

/// 12-byte document identifier: a big-endian seconds timestamp followed by 8 random bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        let seconds = chrono::Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let random = uuid::Uuid::new_v4();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&random.as_bytes()[..8]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Seconds since the Unix epoch at which the id was generated
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A value stored in, or sent to, the document store
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
    ObjectId(ObjectId),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Scalars that a persistent sink may store verbatim
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) | Value::Binary(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Truthiness as the store evaluates flags: null, false and zero are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            _ => true,
        }
    }

    /// Convert to a JSON value.
    ///
    /// Binary values become `{"$binary": <base64>}` and object ids `{"$oid": <hex>}`.
    /// Fails for non-finite floats, which JSON cannot represent.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(S::Error::custom(format!("{} is not representable in JSON", f)));
                }
                serializer.serialize_f64(*f)
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Binary(bytes) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$binary", &base64::engine::general_purpose::STANDARD.encode(bytes))?;
                map.end()
            }
            Value::ObjectId(oid) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$oid", &oid.to_hex())?;
                map.end()
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Document(doc) => doc.serialize(serializer),
        }
    }
}

/// Shell-style textual representation, used when a value can not be rendered as JSON
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => f.write_str("NaN"),
            Value::Float(x) if x.is_infinite() => {
                f.write_str(if x.is_sign_positive() { "Infinity" } else { "-Infinity" })
            }
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Binary(bytes) => write!(
                f,
                "BinData(0, {:?})",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
            Value::ObjectId(oid) => write!(f, "ObjectId({:?})", oid.to_hex()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Document(doc) => write!(f, "{}", doc),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::ObjectId(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Insertion-ordered, string-keyed map of values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing key in place so its position is kept
    ///
    /// Returns the previous value for the key, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Merge another document in, later keys overwriting earlier ones
    pub fn extend(&mut self, other: Document) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    /// Look up a dotted path such as `address.city`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.get(first)?;
        for part in parts {
            current = match current {
                Value::Document(doc) => doc.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}: {}", key, value)?;
        }
        f.write_str(" }")
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for Document {
    fn from(pairs: Vec<(K, V)>) -> Self {
        let mut doc = Document::new();
        for (key, value) in pairs {
            doc.insert(key, value);
        }
        doc
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (key, value) in iter {
            doc.insert(key, value);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a [`Document`] from `key => value` pairs, keeping their order.
///
/// ```
/// use mongodog::doc;
///
/// let spec = doc! { "a" => 0, "b" => doc! { "$gt" => 1 } };
/// assert_eq!(spec.keys().collect::<Vec<_>>(), vec!["a", "b"]);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::value::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::value::Document::new();
        $(doc.insert($key, $value);)+
        doc
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_i64_rejects_out_of_range_floats() {
        assert_eq!(Value::Float(42.0).as_i64(), Some(42));
        assert_eq!(Value::Float(-3.0).as_i64(), Some(-3));
        assert_eq!(Value::Float(1.5).as_i64(), None);
        assert_eq!(Value::Float(1e19).as_i64(), None);
        assert_eq!(Value::Float(-1e19).as_i64(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(Value::Float(f64::NAN).as_i64(), None);
    }

    #[test]
    fn test_insert_keeps_position_on_replace() {
        let mut doc = doc! { "a" => 1, "b" => 2, "c" => 3 };
        let previous = doc.insert("b", 20);

        assert_eq!(previous, Some(Value::Int(2)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(doc.get("b"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_remove() {
        let mut doc = doc! { "a" => 1, "b" => 2 };
        assert_eq!(doc.remove("a"), Some(Value::Int(1)));
        assert_eq!(doc.remove("a"), None);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_get_path() {
        let doc = doc! {
            "address" => doc! { "city" => "Vilnius" },
            "tags" => vec!["x", "y"],
        };

        assert_eq!(doc.get_path("address.city"), Some(&Value::from("Vilnius")));
        assert_eq!(doc.get_path("tags.1"), Some(&Value::from("y")));
        assert_eq!(doc.get_path("address.zip"), None);
    }

    #[test]
    fn test_is_primitive() {
        assert!(Value::Bool(true).is_primitive());
        assert!(Value::Int(1).is_primitive());
        assert!(Value::Float(1.5).is_primitive());
        assert!(Value::from("s").is_primitive());
        assert!(Value::Binary(vec![1, 2]).is_primitive());

        assert!(!Value::Null.is_primitive());
        assert!(!Value::Array(vec![]).is_primitive());
        assert!(!Value::Document(Document::new()).is_primitive());
        assert!(!Value::ObjectId(ObjectId::new()).is_primitive());
    }

    #[test]
    fn test_to_json_keeps_key_order() {
        let doc = doc! { "z" => 1, "a" => vec![doc! { "b" => -1 }] };
        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(text, r#"{"z":1,"a":[{"b":-1}]}"#);
    }

    #[test]
    fn test_to_json_extended_types() {
        let oid = ObjectId::from_bytes([0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let value = Value::from(doc! {
            "_id" => oid,
            "blob" => Value::Binary(vec![0xde, 0xad]),
        });

        assert_eq!(
            value.to_json().unwrap(),
            json!({"_id": {"$oid": "000000010203040506070809"}, "blob": {"$binary": "3q0="}})
        );
    }

    #[test]
    fn test_to_json_fails_for_non_finite_float() {
        let value = Value::from(vec![Value::Float(f64::NAN)]);
        assert!(value.to_json().is_err());
    }

    #[test]
    fn test_display_is_shell_like() {
        let value = Value::from(doc! { "a" => "x", "n" => Value::Float(f64::NAN), "l" => vec![1, 2] });
        assert_eq!(value.to_string(), r#"{ "a": "x", "n": NaN, "l": [1, 2] }"#);
    }

    #[test]
    fn test_object_id_timestamp_and_uniqueness() {
        let before = chrono::Utc::now().timestamp() as u32;
        let first = ObjectId::new();
        let second = ObjectId::new();

        assert_ne!(first, second);
        assert!(first.timestamp() >= before);
        assert_eq!(first.to_hex().len(), 24);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
