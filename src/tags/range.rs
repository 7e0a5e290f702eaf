// ABOUTME: The range tag: integer iteration with optional step and bound name
// ABOUTME: Iterates the half-open interval, pushing a scope per pass when named

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::{smart_split, FilterExpression, Variable};
use crate::lexer::Token;
use crate::node::{Node, NodeFactory, NodeList};
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::Value;

pub struct RangeNode {
    name: Option<String>,
    start: FilterExpression,
    stop: FilterExpression,
    step: Option<FilterExpression>,
    list: NodeList,
}

impl Node for RangeNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let start = self.start.resolve(ctx)?.as_integer().unwrap_or(0);
        let stop = self.stop.resolve(ctx)?.as_integer().unwrap_or(0);
        let step = match &self.step {
            Some(expr) => expr.resolve(ctx)?.as_integer().unwrap_or(1),
            None => 1,
        };
        if step == 0 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "range tag requires a non-zero step",
            ));
        }

        let mut i = start;
        while if step > 0 { i < stop } else { i > stop } {
            match &self.name {
                Some(name) => {
                    let mut scope = ctx.scope();
                    scope.insert(name.clone(), Value::Integer(i));
                    self.list.render(stream, &mut scope)?;
                }
                None => self.list.render(stream, ctx)?,
            }
            i += step;
        }
        Ok(())
    }
}

pub struct RangeNodeFactory;

impl NodeFactory for RangeNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let mut expr = smart_split(&token.content);
        expr.remove(0);
        let mut num_args = expr.len();

        if num_args != 1 {
            if num_args <= 2 {
                return Err(TemplateError::new(
                    ErrorKind::TagSyntax,
                    "'range' tag requires at least three arguments",
                ));
            }
            if expr[num_args - 2] != "as" {
                return Err(TemplateError::new(
                    ErrorKind::TagSyntax,
                    "invalid arguments to 'range' tag",
                ));
            }
        }

        let name = if num_args > 2 {
            let name = expr[num_args - 1].clone();
            num_args -= 2;
            Some(name)
        } else {
            None
        };

        let (start, stop, step) = match num_args {
            1 => (
                FilterExpression::constant(Variable::new("0")),
                FilterExpression::new(&expr[0], parser)?,
                None,
            ),
            2 => (
                FilterExpression::new(&expr[0], parser)?,
                FilterExpression::new(&expr[1], parser)?,
                None,
            ),
            3 => (
                FilterExpression::new(&expr[0], parser)?,
                FilterExpression::new(&expr[1], parser)?,
                Some(FilterExpression::new(&expr[2], parser)?),
            ),
            _ => {
                return Err(TemplateError::new(
                    ErrorKind::TagSyntax,
                    "invalid arguments to 'range' tag",
                ))
            }
        };

        let list = parser.parse(&["endrange"])?;
        parser.remove_next_token();

        Ok(Box::new(RangeNode {
            name,
            start,
            stop,
            step,
            list,
        }))
    }
}
