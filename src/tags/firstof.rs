// ABOUTME: The firstof tag: writes the first truthy expression of its list
// ABOUTME: Evaluates expressions in order and stops at the first non-empty result

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::{smart_split, FilterExpression};
use crate::lexer::Token;
use crate::node::{stream_value, Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;

pub struct FirstOfNode {
    expressions: Vec<FilterExpression>,
}

impl Node for FirstOfNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        for expr in &self.expressions {
            let value = expr.resolve(ctx)?;
            if value.is_truthy() {
                stream_value(stream, &value, ctx);
                return Ok(());
            }
        }
        Ok(())
    }
}

pub struct FirstOfNodeFactory;

impl NodeFactory for FirstOfNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let mut expr = smart_split(&token.content);
        let tag_name = expr.remove(0);
        if expr.is_empty() {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("'{tag_name}' expects at least one argument"),
            ));
        }

        Ok(Box::new(FirstOfNode {
            expressions: parser.filter_expression_list(&expr)?,
        }))
    }
}
