// ABOUTME: The if tag: ordered condition branches with an optional else body
// ABOUTME: Conditions are parsed by the Pratt parser in if_parser

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::smart_split;
use crate::lexer::Token;
use crate::node::{Node, NodeFactory, NodeList};
use crate::output::OutputStream;
use crate::parser::Parser;

use super::if_parser::{IfExpr, IfParser};

pub struct IfNode {
    branches: Vec<(IfExpr, NodeList)>,
    else_list: Option<NodeList>,
}

impl Node for IfNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        for (condition, body) in &self.branches {
            if condition.evaluate(ctx).is_truthy() {
                return body.render(stream, ctx);
            }
        }
        if let Some(body) = &self.else_list {
            return body.render(stream, ctx);
        }
        Ok(())
    }
}

pub struct IfNodeFactory;

impl NodeFactory for IfNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let args = smart_split(&token.content);
        if args.len() < 2 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "if tag requires at least one argument",
            ));
        }

        let mut branches = Vec::new();
        let mut condition = IfParser::new(parser, &args[1..])?.parse()?;
        let mut else_list = None;

        loop {
            let body = parser.parse(&["elif", "else", "endif"])?;
            branches.push((condition, body));

            let stop = parser.take_next_token()?;
            match stop.tag_name() {
                Some("elif") => {
                    let args = smart_split(&stop.content);
                    condition = IfParser::new(parser, &args[1..])?.parse()?;
                }
                Some("else") => {
                    else_list = Some(parser.parse(&["endif"])?);
                    parser.remove_next_token();
                    break;
                }
                _ => break,
            }
        }

        Ok(Box::new(IfNode {
            branches,
            else_list,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::engine::Engine;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> String {
        let engine = Engine::new();
        let template = engine.new_template(source, "test");
        let mut ctx = Context::from_json(data);
        template.render(&mut ctx).unwrap()
    }

    #[test]
    fn test_if_else() {
        let source = "{% if a and not b %}Y{% else %}N{% endif %}";
        assert_eq!(render(source, json!({"a": true, "b": false})), "Y");
        assert_eq!(render(source, json!({"a": true, "b": true})), "N");
        assert_eq!(render(source, json!({"a": false, "b": false})), "N");
    }

    #[test]
    fn test_elif_chain_takes_first_truthy() {
        let source = "{% if a %}1{% elif b %}2{% elif c %}3{% else %}4{% endif %}";
        assert_eq!(render(source, json!({"b": true, "c": true})), "2");
        assert_eq!(render(source, json!({"c": true})), "3");
        assert_eq!(render(source, json!({})), "4");
    }

    #[test]
    fn test_if_without_else_renders_empty() {
        assert_eq!(render("[{% if a %}x{% endif %}]", json!({})), "[]");
    }

    #[test]
    fn test_missing_endif_is_stored_error() {
        let engine = Engine::new();
        let template = engine.new_template("{% if a %}x", "broken");
        assert!(template.error().is_some());
    }
}
