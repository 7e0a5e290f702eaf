// ABOUTME: Error types shared by template compilation and rendering
// ABOUTME: Carries the error kind, message, and source position of the failure

use thiserror::Error;

/// The failure classes reported by the engine. Compile-time kinds
/// (`EmptyVariable` through `TagSyntax`) abort compilation and are stored on
/// the template; render-time kinds terminate the current render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyVariable,
    EmptyBlockTag,
    InvalidBlockTag,
    UnclosedBlockTag,
    UnknownFilter,
    TagSyntax,
    VariableNotInContext,
    ObjectReturnTypeInvalid,
    CompileFunction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EmptyVariable => "empty variable",
            ErrorKind::EmptyBlockTag => "empty block tag",
            ErrorKind::InvalidBlockTag => "invalid block tag",
            ErrorKind::UnclosedBlockTag => "unclosed block tag",
            ErrorKind::UnknownFilter => "unknown filter",
            ErrorKind::TagSyntax => "tag syntax error",
            ErrorKind::VariableNotInContext => "variable not in context",
            ErrorKind::ObjectReturnTypeInvalid => "object return type invalid",
            ErrorKind::CompileFunction => "compile function error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}{}", position_suffix(.line, .column))]
pub struct TemplateError {
    pub kind: ErrorKind,
    pub message: String,
    /// 1-based source line of the offending token, 0 when unknown.
    pub line: u32,
    /// 1-based source column of the offending token, 0 when unknown.
    pub column: u32,
    /// Content of the tag being compiled when the error was raised.
    pub tag: String,
}

fn position_suffix(line: &u32, column: &u32) -> String {
    if *line == 0 {
        String::new()
    } else {
        format!(" (line {line}, column {column})")
    }
}

impl TemplateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: 0,
            column: 0,
            tag: String::new(),
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn in_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;
