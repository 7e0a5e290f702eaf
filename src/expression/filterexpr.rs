// ABOUTME: Compiled filter expression: a variable followed by a filter chain
// ABOUTME: Regex-scanned once at parse time, resolved per render

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::filters::Filter;
use crate::parser::Parser;
use crate::value::Value;

use super::Variable;

// The alternatives, in order: a leading constant (quoted string or i18n
// literal), a leading variable path, a number, a filter, a filter argument.
// Leading alternatives are anchored so they can only start the expression.
static FILTER_RE: Lazy<Regex> = Lazy::new(|| {
    let dq = r#""[^"\\]*(?:\\.[^"\\]*)*""#;
    let sq = r#"'[^'\\]*(?:\\.[^'\\]*)*'"#;
    let constant = format!(r"(?:_\({dq}\)|_\({sq}\)|{dq}|{sq})");
    let var = r"[\w\.]+";
    let num = r"[-+\.]?\d[\d\.e]*";
    let filter = r"\|\w+";
    Regex::new(&format!(
        "^{constant}|^{var}|{num}|{filter}|:(?:{constant}|{var}|{num}|{filter})"
    ))
    .expect("filter expression pattern is valid")
});

#[derive(Clone)]
struct FilterCall {
    name: String,
    filter: Arc<dyn Filter>,
    arg: Option<Variable>,
}

#[derive(Clone)]
pub struct FilterExpression {
    variable: Variable,
    filters: Vec<FilterCall>,
}

impl FilterExpression {
    /// Compile a raw `{{ ... }}` or tag-argument expression. Filter names are
    /// resolved eagerly against the parser's registry; input not consumed by
    /// the grammar is a syntax error.
    pub fn new(token: &str, parser: &Parser<'_>) -> Result<Self> {
        let vs = token.trim();
        let mut variable = Variable::empty();
        let mut filters: Vec<FilterCall> = Vec::new();

        let mut pos = 0;
        while pos < vs.len() {
            let m = match FILTER_RE.find_at(vs, pos) {
                Some(m) if m.start() == pos => m,
                _ => break,
            };
            let sub = m.as_str();
            if let Some(name) = sub.strip_prefix('|') {
                let filter = parser.get_filter(name)?;
                filters.push(FilterCall {
                    name: name.to_string(),
                    filter,
                    arg: None,
                });
            } else if let Some(arg) = sub.strip_prefix(':') {
                let call = filters.last_mut().ok_or_else(|| {
                    TemplateError::new(
                        ErrorKind::TagSyntax,
                        format!("filter argument without a filter in '{vs}'"),
                    )
                })?;
                // A chained filter as argument is consumed by the grammar but
                // carries no value.
                call.arg = Some(if arg.starts_with('|') {
                    Variable::empty()
                } else {
                    Variable::new(arg)
                });
            } else {
                variable = Variable::new(sub);
            }
            pos = m.end();
        }

        if pos != vs.len() {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("could not parse the remainder '{}' of '{vs}'", &vs[pos..]),
            ));
        }

        Ok(Self { variable, filters })
    }

    /// A filter expression wrapping a bare variable, outside any parse.
    pub fn constant(variable: Variable) -> Self {
        Self {
            variable,
            filters: Vec::new(),
        }
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    /// Resolve the variable and fold it through the filter chain. A filter
    /// marked safe keeps already-safe input safe; escaping itself happens at
    /// stream write time.
    pub fn resolve(&self, ctx: &Context) -> Result<Value> {
        let mut value = self.variable.resolve(ctx)?;
        for call in &self.filters {
            let arg = match &call.arg {
                Some(v) => v.resolve(ctx)?,
                None => Value::Invalid,
            };
            let input_safe = value.is_safe() || matches!(value, Value::Integer(_) | Value::Float(_));
            let mut out = call.filter.filter(&value, &arg, ctx.auto_escape());
            if call.filter.is_safe() && input_safe {
                out = out.mark_safe();
            }
            value = out;
        }
        Ok(value)
    }

    pub fn is_true(&self, ctx: &Context) -> Result<bool> {
        Ok(self.resolve(ctx)?.is_truthy())
    }

    /// The resolved value as a list: lists as-is, strings character-wise,
    /// scalars as a single-element list, invalid as empty.
    pub fn to_list(&self, ctx: &Context) -> Result<Vec<Value>> {
        let value = self.resolve(ctx)?;
        match value {
            Value::Invalid => Ok(Vec::new()),
            Value::Object(ref o) => o.iter().map(Ok).unwrap_or_else(|| {
                Err(TemplateError::new(
                    ErrorKind::ObjectReturnTypeInvalid,
                    "host object cannot be iterated",
                ))
            }),
            other => {
                let single = vec![other.clone()];
                Ok(other.iter_items().unwrap_or(single))
            }
        }
    }
}

impl std::fmt::Debug for FilterExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.filters.iter().map(|c| c.name.as_str()).collect();
        f.debug_struct("FilterExpression")
            .field("variable", &self.variable)
            .field("filters", &names)
            .finish()
    }
}
