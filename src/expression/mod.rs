// ABOUTME: Expression layer: variables, filter expressions, argument splitting
// ABOUTME: Shared tokenizing helpers for tag factories

mod filterexpr;
mod variable;

pub use filterexpr::FilterExpression;
pub use variable::Variable;

use once_cell::sync::Lazy;
use regex::Regex;

static SMART_SPLIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:[^\s'"]*(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')[^\s'"]*)+|\S+"#)
        .expect("smart split pattern is valid")
});

/// Split tag content on whitespace while keeping quoted substrings (with
/// backslash escapes) intact. The canonical way factories tokenize their
/// argument content.
pub fn smart_split(content: &str) -> Vec<String> {
    SMART_SPLIT_RE
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Strip matching single or double quotes. Returns `None` when the string is
/// not quoted.
pub fn unquote(raw: &str) -> Option<&str> {
    let stripped = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    stripped.filter(|_| raw.len() >= 2)
}

/// Process backslash escapes inside a quoted literal.
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}
