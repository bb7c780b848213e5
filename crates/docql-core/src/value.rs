//! Runtime values
//!
//! Documents are JSON, but query evaluation needs one more state than JSON
//! can express: a property that does not exist. [`Value::Undefined`] carries
//! that state through joins, comparisons and projections; it is removed
//! before results leave the engine.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;

/// Largest integer an f64 represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Object representation; keeps insertion order like the source documents
pub type Object = IndexMap<String, Value>;

/// A value flowing through a compiled plan
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent property, distinct from null
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Number (all numbers are doubles)
    Number(f64),
    /// String
    String(String),
    /// Array
    Array(Vec<Value>),
    /// Object
    Object(Object),
}

impl Value {
    /// Type name as reported by the type-checking built-ins
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Rank used when values of different types are ordered
    pub fn type_rank(&self) -> u8 {
        match self {
            Value::Undefined => 0,
            Value::Null => 1,
            Value::Bool(_) => 2,
            Value::Number(_) => 3,
            Value::String(_) => 4,
            Value::Array(_) => 5,
            Value::Object(_) => 6,
        }
    }

    /// True for [`Value::Undefined`]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Loose truthiness: undefined, null, false, 0, NaN and "" are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Numeric content, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Array content, if this is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Property lookup; anything that is not an object yields undefined
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(map) => map.get(key).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Walk a key path (`["c", "address", "city"]`); an empty path is the value itself
    pub fn lookup_path<S: AsRef<str>>(&self, path: &[S]) -> Value {
        let mut current = self.clone();
        for key in path {
            current = match &current {
                Value::Object(map) => map.get(key.as_ref()).cloned().unwrap_or_default(),
                Value::Array(items) => key
                    .as_ref()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
                _ => Value::Undefined,
            };
        }
        current
    }

    /// Convert to JSON. Undefined has no JSON form; inside objects the
    /// property is dropped, inside arrays it becomes null.
    pub fn to_json(&self) -> Option<JsonValue> {
        match self {
            Value::Undefined => None,
            Value::Null => Some(JsonValue::Null),
            Value::Bool(b) => Some(JsonValue::Bool(*b)),
            Value::Number(n) => Some(number_to_json(*n)),
            Value::String(s) => Some(JsonValue::String(s.clone())),
            Value::Array(items) => Some(JsonValue::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(JsonValue::Null))
                    .collect(),
            )),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    if let Some(json) = value.to_json() {
                        out.insert(key.clone(), json);
                    }
                }
                Some(JsonValue::Object(out))
            }
        }
    }

    /// Total order used by ORDER BY, MIN and MAX: values of different types
    /// order by [`Value::type_rank`], equal types by content.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.sort_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Object(a), Value::Object(b)) => {
                let mut a_keys: Vec<&String> = a.keys().collect();
                let mut b_keys: Vec<&String> = b.keys().collect();
                a_keys.sort();
                b_keys.sort();
                for (ka, kb) in a_keys.iter().zip(b_keys.iter()) {
                    let ord = ka.cmp(kb).then_with(|| a[*ka].sort_cmp(&b[*kb]));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a_keys.len().cmp(&b_keys.len())
            }
            _ => Ordering::Equal,
        }
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        JsonValue::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from(&json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::String(s) => write!(f, "{s:?}"),
            other => match other.to_json() {
                Some(json) => write!(f, "{json}"),
                None => f.write_str("undefined"),
            },
        }
    }
}
