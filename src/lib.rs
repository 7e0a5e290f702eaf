// ABOUTME: Main library module for the stencil template engine
// ABOUTME: Exports all core modules and provides the public API

pub mod context;
pub mod engine;
pub mod error;
pub mod expression;
pub mod filters;
pub mod lexer;
pub mod library;
pub mod loader;
pub mod localize;
pub mod node;
pub mod output;
pub mod parser;
pub mod tags;
pub mod value;

// Re-export commonly used types
pub use context::{Context, RenderContext, ScopeGuard};
pub use engine::{Engine, EngineConfig, Template};
pub use error::{ErrorKind, Result, TemplateError};
pub use expression::{smart_split, FilterExpression, Variable};
pub use filters::Filter;
pub use lexer::{tokenize, Token, TokenKind};
pub use library::TagLibrary;
pub use loader::{FileSystemLoader, InMemoryLoader, TemplateLoader};
pub use localize::{Localizer, PassthroughLocalizer};
pub use node::{Node, NodeFactory, NodeList, TextNode, VariableNode};
pub use output::{escape_html, EscapeFn, OutputStream};
pub use parser::Parser;
pub use value::{Object, SafeString, Value};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
