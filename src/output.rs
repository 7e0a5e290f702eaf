// ABOUTME: Escape-aware output sink for rendering
// ABOUTME: Applies the engine's escape function based on SafeString flags

use std::sync::Arc;

use crate::value::SafeString;

pub type EscapeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// HTML escaping, the default escape function.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Buffered sink with an escape policy. Writes are verbatim unless the value
/// is an unsafe string that was flagged for escaping.
pub struct OutputStream {
    buffer: String,
    escape: EscapeFn,
}

impl OutputStream {
    pub fn new() -> Self {
        Self::with_escape(Arc::new(escape_html))
    }

    pub fn with_escape(escape: EscapeFn) -> Self {
        Self {
            buffer: String::new(),
            escape,
        }
    }

    /// A fresh stream sharing this stream's escape policy. Used to capture a
    /// sub-render (block.super, the `*_var` tags).
    pub fn buffered(&self) -> OutputStream {
        Self {
            buffer: String::new(),
            escape: Arc::clone(&self.escape),
        }
    }

    /// Raw write, used for literal template text.
    pub fn write_text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Policy write: escape only when the string is not safe and carries the
    /// needs-escape flag.
    pub fn write(&mut self, value: &SafeString) {
        if value.is_safe() || !value.needs_escape() {
            self.buffer.push_str(value.text());
        } else {
            let escaped = (self.escape)(value.text());
            self.buffer.push_str(&escaped);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for OutputStream {
    fn default() -> Self {
        Self::new()
    }
}
