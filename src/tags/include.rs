// ABOUTME: The include tag: renders another template against the current context
// ABOUTME: Constant includes clean their block definitions out of the BlockContext

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::{smart_split, unquote, FilterExpression};
use crate::lexer::Token;
use crate::node::{Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;

fn render_by_name(name: &str, stream: &mut OutputStream, ctx: &mut Context) -> Result<crate::engine::Template> {
    let engine = ctx
        .render_context()
        .engine()
        .cloned()
        .ok_or_else(|| TemplateError::new(ErrorKind::TagSyntax, "no engine available for include"))?;

    let template = engine.load_by_name(name);
    if let Some(err) = template.error() {
        return Err(TemplateError::new(
            ErrorKind::TagSyntax,
            format!("failed to include '{name}': {}", err.message),
        ));
    }

    template.render_to(stream, ctx)?;
    Ok(template)
}

/// `{% include expr %}` with a dynamically resolved name.
pub struct IncludeNode {
    expr: FilterExpression,
}

impl Node for IncludeNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let name = self.expr.resolve(ctx)?.to_display_string();
        render_by_name(&name, stream, ctx)?;
        Ok(())
    }
}

/// `{% include "name" %}` with a literal name.
pub struct ConstantIncludeNode {
    name: String,
}

impl Node for ConstantIncludeNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let template = render_by_name(&self.name, stream, ctx)?;
        // Forget the included template's blocks so they cannot shadow later
        // inheritance in the including template.
        ctx.render_context_mut()
            .block_context_mut()
            .remove_blocks(template.blocks());
        Ok(())
    }
}

pub struct IncludeNodeFactory;

impl NodeFactory for IncludeNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr = smart_split(&token.content);
        if expr.len() != 2 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "include tag takes only one argument",
            ));
        }

        match unquote(&expr[1]) {
            Some(name) => Ok(Box::new(ConstantIncludeNode {
                name: name.to_string(),
            })),
            None => Ok(Box::new(IncludeNode {
                expr: FilterExpression::new(&expr[1], parser)?,
            })),
        }
    }
}
