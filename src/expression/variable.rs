// ABOUTME: A compiled variable: literal, translatable literal, or dotted path
// ABOUTME: Resolution walks the path against the context scope stack

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::value::Value;

use super::{unescape, unquote};

#[derive(Debug, Clone)]
enum Inner {
    /// Placeholder for an argument slot the grammar consumed but that has no
    /// resolvable content. Always resolves to an invalid value.
    Empty,
    Literal(Value),
    /// `_("...")` literal, localized at resolve time.
    Translatable(String),
    Path(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Variable {
    inner: Inner,
}

impl Variable {
    /// Compile a raw expression piece: a quoted string, an i18n literal, a
    /// number, or a dotted lookup path.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self { inner: Inner::Empty };
        }

        if let Some(body) = raw.strip_prefix("_(").and_then(|s| s.strip_suffix(')')) {
            if let Some(text) = unquote(body) {
                return Self {
                    inner: Inner::Translatable(unescape(text)),
                };
            }
        }

        if let Some(text) = unquote(raw) {
            return Self {
                inner: Inner::Literal(Value::String(unescape(text))),
            };
        }

        if let Ok(n) = raw.parse::<i64>() {
            return Self {
                inner: Inner::Literal(Value::Integer(n)),
            };
        }
        if raw.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.') {
            if let Ok(n) = raw.parse::<f64>() {
                return Self {
                    inner: Inner::Literal(Value::Float(n)),
                };
            }
        }

        Self {
            inner: Inner::Path(raw.split('.').map(str::to_string).collect()),
        }
    }

    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.inner, Inner::Empty)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.inner, Inner::Literal(_) | Inner::Translatable(_))
    }

    /// Resolve against the context. A broken path yields an invalid value
    /// unless the context is strict, in which case it is an error.
    pub fn resolve(&self, ctx: &Context) -> Result<Value> {
        match &self.inner {
            Inner::Empty => Ok(Value::Invalid),
            Inner::Literal(value) => Ok(value.clone()),
            Inner::Translatable(text) => {
                Ok(Value::String(ctx.localizer().localize_string(text, &[])))
            }
            Inner::Path(segments) => {
                let mut current = ctx.lookup_checked(&segments[0])?;
                for segment in &segments[1..] {
                    match current.get_member(segment) {
                        Some(next) => current = next,
                        None if ctx.is_strict() => {
                            return Err(TemplateError::new(
                                ErrorKind::VariableNotInContext,
                                format!("cannot resolve '{segment}' in '{}'", segments.join(".")),
                            ))
                        }
                        None => return Ok(Value::Invalid),
                    }
                }
                Ok(current)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_literal() {
        let ctx = Context::new();
        let v = Variable::new("\"hello\"");
        assert_eq!(v.resolve(&ctx).unwrap(), Value::from("hello"));
        assert!(v.is_literal());
    }

    #[test]
    fn test_number_literals() {
        let ctx = Context::new();
        assert_eq!(
            Variable::new("42").resolve(&ctx).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            Variable::new("-3").resolve(&ctx).unwrap(),
            Value::Integer(-3)
        );
        assert_eq!(
            Variable::new("2.5").resolve(&ctx).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            Variable::new("1e3").resolve(&ctx).unwrap(),
            Value::Float(1000.0)
        );
    }

    #[test]
    fn test_dotted_path_resolution() {
        let ctx = Context::from_json(json!({
            "user": {"name": "ada", "langs": ["rust", "c"]}
        }));
        assert_eq!(
            Variable::new("user.name").resolve(&ctx).unwrap(),
            Value::from("ada")
        );
        assert_eq!(
            Variable::new("user.langs.1").resolve(&ctx).unwrap(),
            Value::from("c")
        );
    }

    #[test]
    fn test_missing_path_is_silent() {
        let ctx = Context::from_json(json!({"a": {"b": 1}}));
        assert_eq!(
            Variable::new("a.nope.c").resolve(&ctx).unwrap(),
            Value::Invalid
        );
        assert_eq!(Variable::new("zzz").resolve(&ctx).unwrap(), Value::Invalid);
    }

    #[test]
    fn test_missing_path_errors_in_strict_mode() {
        let mut ctx = Context::from_json(json!({"a": 1}));
        ctx.set_strict(true);
        assert!(Variable::new("zzz").resolve(&ctx).is_err());
    }

    #[test]
    fn test_translatable_literal() {
        let ctx = Context::new();
        let v = Variable::new("_(\"greeting\")");
        assert_eq!(v.resolve(&ctx).unwrap(), Value::from("greeting"));
    }
}
