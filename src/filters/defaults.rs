// ABOUTME: The built-in "defaultfilters" library
// ABOUTME: String, sequence, and escaping filters registered by default

use std::collections::HashMap;
use std::sync::Arc;

use crate::library::TagLibrary;
use crate::value::{SafeString, Value};

use super::Filter;

/// `upper` — uppercase the display form.
struct Upper;

impl Filter for Upper {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        Value::String(input.to_display_string().to_uppercase())
    }
}

/// `lower` — lowercase the display form.
struct Lower;

impl Filter for Lower {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        Value::String(input.to_display_string().to_lowercase())
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// `capfirst` — uppercase the first character.
struct CapFirst;

impl Filter for CapFirst {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        let text = input.to_display_string();
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => {
                Value::String(first.to_uppercase().chain(chars).collect::<String>())
            }
            None => Value::String(text),
        }
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// `length` — element count of lists and maps, character count of strings.
struct Length;

impl Filter for Length {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        match input {
            Value::List(items) => Value::Integer(items.len() as i64),
            Value::Map(map) => Value::Integer(map.len() as i64),
            Value::String(s) => Value::Integer(s.chars().count() as i64),
            Value::Safe(s) => Value::Integer(s.text().chars().count() as i64),
            _ => Value::Invalid,
        }
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// `default` — the argument when the input is falsy.
struct Default;

impl Filter for Default {
    fn filter(&self, input: &Value, arg: &Value, _auto_escape: bool) -> Value {
        if input.is_truthy() {
            input.clone()
        } else {
            arg.clone()
        }
    }
}

/// `join` — concatenate list items with the argument separator.
struct Join;

impl Filter for Join {
    fn filter(&self, input: &Value, arg: &Value, _auto_escape: bool) -> Value {
        match input {
            Value::List(items) => {
                let sep = arg.to_display_string();
                let parts: Vec<String> = items.iter().map(|v| v.to_display_string()).collect();
                Value::String(parts.join(&sep))
            }
            other => other.clone(),
        }
    }
}

/// `safe` — mark the input as requiring no escaping.
struct Safe;

impl Filter for Safe {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        Value::Safe(SafeString::safe(input.to_display_string()))
    }

    fn is_safe(&self) -> bool {
        true
    }

    fn accepts_unsafe(&self) -> bool {
        true
    }
}

/// `escape` — force escaping even when auto-escape is off.
struct Escape;

impl Filter for Escape {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        let mut out = SafeString::new(input.to_display_string());
        out.set_needs_escape(true);
        Value::Safe(out)
    }

    fn accepts_unsafe(&self) -> bool {
        true
    }
}

/// `cut` — remove every occurrence of the argument.
struct Cut;

impl Filter for Cut {
    fn filter(&self, input: &Value, arg: &Value, _auto_escape: bool) -> Value {
        let needle = arg.to_display_string();
        if needle.is_empty() {
            return input.clone();
        }
        Value::String(input.to_display_string().replace(&needle, ""))
    }
}

/// `first` — first list item or first character.
struct First;

impl Filter for First {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        match input {
            Value::List(items) => items.first().cloned().unwrap_or(Value::Invalid),
            other => other
                .iter_items()
                .and_then(|items| items.first().cloned())
                .unwrap_or(Value::Invalid),
        }
    }
}

/// `last` — last list item or last character.
struct Last;

impl Filter for Last {
    fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
        match input {
            Value::List(items) => items.last().cloned().unwrap_or(Value::Invalid),
            other => other
                .iter_items()
                .and_then(|items| items.last().cloned())
                .unwrap_or(Value::Invalid),
        }
    }
}

/// `add` — numeric addition, list concatenation, or string concatenation.
struct Add;

impl Filter for Add {
    fn filter(&self, input: &Value, arg: &Value, _auto_escape: bool) -> Value {
        match (input, arg) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a + b),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Value::List(out)
            }
            _ => match (input.as_float(), arg.as_float()) {
                (Some(a), Some(b)) => Value::Float(a + b),
                _ => Value::String(format!(
                    "{}{}",
                    input.to_display_string(),
                    arg.to_display_string()
                )),
            },
        }
    }
}

pub struct DefaultFiltersLibrary;

impl TagLibrary for DefaultFiltersLibrary {
    fn filters(&self) -> HashMap<String, Arc<dyn Filter>> {
        let mut filters: HashMap<String, Arc<dyn Filter>> = HashMap::new();
        filters.insert("upper".to_string(), Arc::new(Upper));
        filters.insert("lower".to_string(), Arc::new(Lower));
        filters.insert("capfirst".to_string(), Arc::new(CapFirst));
        filters.insert("length".to_string(), Arc::new(Length));
        filters.insert("default".to_string(), Arc::new(Default));
        filters.insert("join".to_string(), Arc::new(Join));
        filters.insert("safe".to_string(), Arc::new(Safe));
        filters.insert("escape".to_string(), Arc::new(Escape));
        filters.insert("cut".to_string(), Arc::new(Cut));
        filters.insert("first".to_string(), Arc::new(First));
        filters.insert("last".to_string(), Arc::new(Last));
        filters.insert("add".to_string(), Arc::new(Add));
        filters
    }
}
