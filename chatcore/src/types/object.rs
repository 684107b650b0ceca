//! Raw objects as they arrive from the object store.
//!
//! The store is untrusted and eventually consistent, so a `RawObject` is kept
//! as an open JSON mapping. Typed views are derived from it by the filters in
//! [`crate::filter`]; nothing here validates the shape of a record.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ActorId = String;
pub type ObjectId = String;

pub const KIND_NOTE: &str = "Note";
pub const KIND_PROFILE: &str = "Profile";
pub const KIND_LIKE: &str = "Like";
pub const KIND_READ: &str = "Read";
pub const KIND_IMAGE: &str = "Image";

/// A loosely typed record from the object store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawObject(Map<String, Value>);

impl RawObject {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps a JSON value. Returns `None` for anything that is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Builder-style variant of [`RawObject::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Whether `key` holds a truthy value (see [`is_truthy`]).
    pub fn is_present(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }

    /// The `type` tag.
    pub fn kind(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind() == Some(kind)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn actor(&self) -> Option<&str> {
        self.str_field("actor")
    }

    /// Parses `published` as an RFC 3339 string or as epoch milliseconds.
    /// Unparseable timestamps are treated as missing.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        match self.0.get("published")? {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        }
    }

    /// String entries of the `context` array.
    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.0
            .get("context")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    pub fn has_context(&self, context: &str) -> bool {
        self.contexts().any(|c| c == context)
    }

    /// Whether this object is tagged with any of `contexts`.
    pub fn in_any_context<S: AsRef<str>>(&self, contexts: &[S]) -> bool {
        contexts.iter().any(|c| self.has_context(c.as_ref()))
    }
}

impl From<RawObject> for Value {
    fn from(object: RawObject) -> Self {
        object.into_value()
    }
}

impl TryFrom<Value> for RawObject {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Presence check used by every view predicate.
///
/// `null`, `false`, `0`, and `""` count as absent; every other value,
/// including empty arrays and objects, counts as present.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Anything carrying a `published` timestamp.
pub trait Published {
    fn published(&self) -> Option<DateTime<Utc>>;
}

impl Published for RawObject {
    fn published(&self) -> Option<DateTime<Utc>> {
        RawObject::published(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> RawObject {
        RawObject::from_value(value).expect("test value is an object")
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(1.5)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_published_parsing() {
        let iso = object(json!({"published": "2023-05-08T12:00:00Z"}));
        let millis = object(json!({"published": 1683547200000i64}));
        assert_eq!(iso.published(), millis.published());
        assert!(iso.published().is_some());

        let garbage = object(json!({"published": "yesterday"}));
        assert!(garbage.published().is_none());
        assert!(RawObject::new().published().is_none());
    }

    #[test]
    fn test_contexts_skip_non_strings() {
        let obj = object(json!({"context": ["general", 4, null, "alice"]}));
        let contexts: Vec<&str> = obj.contexts().collect();
        assert_eq!(contexts, vec!["general", "alice"]);
        assert!(obj.in_any_context(&["bob", "alice"]));
        assert!(!obj.in_any_context(&["bob"]));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(RawObject::from_value(json!([1, 2])).is_none());
        assert!(RawObject::try_from(json!("note")).is_err());
    }
}
