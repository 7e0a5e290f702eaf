// ABOUTME: The autoescape tag: toggles auto-escaping for its body
// ABOUTME: Saves and restores the context flag around the body on every exit path

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::lexer::Token;
use crate::node::{Node, NodeFactory, NodeList};
use crate::output::OutputStream;
use crate::parser::Parser;

pub struct AutoescapeNode {
    enabled: bool,
    list: NodeList,
}

impl Node for AutoescapeNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let previous = ctx.set_auto_escape(self.enabled);
        let result = self.list.render(stream, ctx);
        ctx.set_auto_escape(previous);
        result
    }
}

pub struct AutoescapeNodeFactory;

impl NodeFactory for AutoescapeNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr: Vec<&str> = token.content.split_whitespace().collect();
        if expr.len() != 2 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "autoescape takes two arguments",
            ));
        }

        let enabled = match expr[1] {
            "on" => true,
            "off" => false,
            _ => {
                return Err(TemplateError::new(
                    ErrorKind::TagSyntax,
                    "argument must be 'on' or 'off'",
                ))
            }
        };

        let list = parser.parse(&["endautoescape"])?;
        parser.remove_next_token();

        Ok(Box::new(AutoescapeNode { enabled, list }))
    }
}
