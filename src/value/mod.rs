// ABOUTME: Dynamic value carrier used throughout the engine
// ABOUTME: Covers scalars, safe strings, lists, maps, and opaque host objects

mod object;
mod safestring;

pub use object::Object;
pub use safestring::SafeString;

use std::collections::HashMap;
use std::sync::Arc;

/// The dynamic value variant. Every path through the engine preserves the
/// variant; narrowing conversions happen only at render and filter
/// boundaries.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Invalid,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Safe(SafeString),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Object(Arc<dyn Object>),
}

impl Value {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    /// Truthiness as used by `if`, `firstof`, and the `default` filter.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Invalid => false,
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Safe(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Whether the value is a string already marked escape-safe.
    pub fn is_safe(&self) -> bool {
        matches!(self, Value::Safe(s) if s.is_safe())
    }

    /// Rendered text of the value. Invalid renders empty; containers render
    /// a bracketed listing with map keys sorted for stable output.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Invalid => String::new(),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Safe(s) => s.text().to_string(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_display_string()).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let parts: Vec<String> = keys
                    .iter()
                    .map(|k| format!("{}: {}", k, map[*k].to_display_string()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Object(o) => o.as_str().unwrap_or_default(),
        }
    }

    /// The value as a SafeString, preserving existing safety flags.
    pub fn to_safe_string(&self) -> SafeString {
        match self {
            Value::Safe(s) => s.clone(),
            other => SafeString::new(other.to_display_string()),
        }
    }

    /// Promote a string value to a safe string; other variants are unchanged.
    pub fn mark_safe(self) -> Value {
        match self {
            Value::String(s) => Value::Safe(SafeString::safe(s)),
            Value::Safe(s) => Value::Safe(s.mark_safe()),
            other => other,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) => Some(*n as i64),
            Value::Bool(b) => Some(*b as i64),
            Value::String(s) => s.trim().parse().ok(),
            Value::Safe(s) => s.text().trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            Value::Safe(s) => s.text().trim().parse().ok(),
            _ => None,
        }
    }

    /// Sequence view for `for` iteration: lists iterate their items, strings
    /// iterate characters, iterable host objects delegate. Maps and scalars
    /// are not iterable.
    pub fn iter_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::String(s) => Some(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Safe(s) => Some(
                s.text()
                    .chars()
                    .map(|c| Value::String(c.to_string()))
                    .collect(),
            ),
            Value::Object(o) => o.iter(),
            _ => None,
        }
    }

    /// One segment of dotted-path resolution: mapping lookup by key, then
    /// integer-indexed access, then host attribute, then nullary method call.
    pub fn get_member(&self, segment: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(segment).cloned(),
            Value::List(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx).cloned()),
            Value::Object(o) => o.get_attr(segment).or_else(|| o.call(segment)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Invalid => f.write_str("Invalid"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Safe(s) => write!(f, "Safe({s:?})"),
            Value::List(l) => f.debug_tuple("List").field(l).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Invalid, Invalid) => true,
            (Bool(a), Bool(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => *a as f64 == *b,
            (String(_) | Safe(_), String(_) | Safe(_)) => self.text_eq(other),
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Object(a), Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    fn text_eq(&self, other: &Value) -> bool {
        let a = match self {
            Value::String(s) => s.as_str(),
            Value::Safe(s) => s.text(),
            _ => return false,
        };
        let b = match other {
            Value::String(s) => s.as_str(),
            Value::Safe(s) => s.text(),
            _ => return false,
        };
        a == b
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
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

impl From<SafeString> for Value {
    fn from(s: SafeString) -> Self {
        Value::Safe(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Invalid,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}
