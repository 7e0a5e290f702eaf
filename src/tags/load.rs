// ABOUTME: The load tag: pulls a tag library into the parser at parse time
// ABOUTME: Later registrations override earlier ones; the node itself is inert

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::lexer::Token;
use crate::node::{Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;

/// The side effect happens during parsing; the node renders as nothing.
pub struct LoadNode;

impl Node for LoadNode {
    fn render(&self, _stream: &mut OutputStream, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

pub struct LoadNodeFactory;

impl NodeFactory for LoadNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr: Vec<&str> = token.content.split_whitespace().collect();
        if expr.len() <= 1 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("'{}' expects at least one argument", expr[0]),
            ));
        }

        for name in &expr[1..] {
            parser.load_library(name)?;
        }

        Ok(Box::new(LoadNode))
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use crate::error::ErrorKind;

    #[test]
    fn test_load_known_library_renders_empty() {
        let engine = Engine::new();
        let template = engine.new_template("a{% load defaultfilters %}b", "test");
        let mut ctx = crate::context::Context::new();
        assert_eq!(template.render(&mut ctx).unwrap(), "ab");
    }

    #[test]
    fn test_load_missing_library_is_error() {
        let engine = Engine::new();
        let template = engine.new_template("{% load nosuchlibrary %}", "broken");
        let err = template.error().unwrap();
        assert_eq!(err.kind, ErrorKind::TagSyntax);
    }

    #[test]
    fn test_load_without_arguments_is_error() {
        let engine = Engine::new();
        let template = engine.new_template("{% load %}", "broken");
        assert!(template.error().is_some());
    }
}
