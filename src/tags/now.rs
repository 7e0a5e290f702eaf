// ABOUTME: The now tag: writes the current time through a strftime format
// ABOUTME: Invalid format strings are reported at render time

use chrono::format::{Item, StrftimeItems};
use chrono::Local;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::lexer::Token;
use crate::node::{stream_value, Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::Value;

pub struct NowNode {
    format: String,
}

impl Node for NowNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let items: Vec<Item<'_>> = StrftimeItems::new(&self.format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("invalid date format: '{}'", self.format),
            ));
        }
        let formatted = Local::now().format_with_items(items.iter()).to_string();
        stream_value(stream, &Value::String(formatted), ctx);
        Ok(())
    }
}

pub struct NowNodeFactory;

impl NodeFactory for NowNodeFactory {
    fn get_node(&self, token: &Token, _parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        // The format string is everything between the double quotes.
        let expr: Vec<&str> = token.content.split('"').collect();
        if expr.len() != 3 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "now tag takes one argument",
            ));
        }
        Ok(Box::new(NowNode {
            format: expr[1].to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::engine::Engine;

    #[test]
    fn test_renders_current_year() {
        let engine = Engine::new();
        let template = engine.new_template("{% now \"%Y\" %}", "test");
        let mut ctx = Context::new();
        let output = template.render(&mut ctx).unwrap();
        assert_eq!(output.len(), 4);
        assert!(output.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_literal_text_in_format() {
        let engine = Engine::new();
        let template = engine.new_template("{% now \"year %Y!\" %}", "test");
        let mut ctx = Context::new();
        let output = template.render(&mut ctx).unwrap();
        assert!(output.starts_with("year "));
        assert!(output.ends_with('!'));
    }

    #[test]
    fn test_missing_quotes_is_error() {
        let engine = Engine::new();
        let template = engine.new_template("{% now %Y %}", "broken");
        assert!(template.error().is_some());
    }

    #[test]
    fn test_invalid_format_fails_at_render() {
        let engine = Engine::new();
        let template = engine.new_template("{% now \"%Q\" %}", "test");
        assert!(template.error().is_none());
        let mut ctx = Context::new();
        assert!(template.render(&mut ctx).is_err());
    }
}
