// ABOUTME: SafeString carries a string plus its escaping state
// ABOUTME: Tracks whether content is pre-escaped and whether escaping is mandatory

use serde::{Deserialize, Serialize};

/// A string annotated with its escaping state.
///
/// `safe` means the content is already escaped for the output format and must
/// not be escaped again. `needs_escape` forces escaping even when the
/// surrounding scope has auto-escape turned off (set by the `escape` filter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeString {
    text: String,
    safe: bool,
    needs_escape: bool,
}

impl SafeString {
    /// An unsafe (escapable) string.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            safe: false,
            needs_escape: false,
        }
    }

    /// A string already escaped for the output format.
    pub fn safe(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            safe: true,
            needs_escape: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn needs_escape(&self) -> bool {
        self.needs_escape
    }

    pub fn set_safe(&mut self, safe: bool) {
        self.safe = safe;
    }

    pub fn set_needs_escape(&mut self, needs_escape: bool) {
        self.needs_escape = needs_escape;
    }

    pub fn mark_safe(mut self) -> Self {
        self.safe = true;
        self
    }

    /// Concatenation keeps the result safe only when every part is safe; a
    /// mandatory-escape flag on either part survives.
    pub fn append(&mut self, other: &SafeString) {
        self.text.push_str(&other.text);
        self.safe = self.safe && other.safe;
        self.needs_escape = self.needs_escape || other.needs_escape;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for SafeString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for SafeString {
    fn from(text: &str) -> Self {
        SafeString::new(text)
    }
}

impl From<String> for SafeString {
    fn from(text: String) -> Self {
        SafeString::new(text)
    }
}
