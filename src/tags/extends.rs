// ABOUTME: The extends tag: template inheritance via the BlockContext
// ABOUTME: Consumes the rest of the child template and renders the parent

use std::sync::Arc;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::{smart_split, unquote, FilterExpression};
use crate::lexer::Token;
use crate::node::{Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;

use super::block::BlockNode;

enum Parent {
    Constant(String),
    Dynamic(FilterExpression),
}

/// `{% extends parent %}`. Must be the first content of its template; the
/// child's blocks are pushed as overrides before the parent renders.
pub struct ExtendsNode {
    parent: Parent,
    blocks: Vec<(String, Arc<BlockNode>)>,
}

impl Node for ExtendsNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let name = match &self.parent {
            Parent::Constant(name) => name.clone(),
            Parent::Dynamic(expr) => expr.resolve(ctx)?.to_display_string(),
        };

        let engine = ctx.render_context().engine().cloned().ok_or_else(|| {
            TemplateError::new(ErrorKind::TagSyntax, "no engine available for extends")
        })?;
        let parent = engine.load_by_name(&name);
        if let Some(err) = parent.error() {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("cannot extend '{name}': {}", err.message),
            ));
        }

        {
            let block_context = ctx.render_context_mut().block_context_mut();
            for (block_name, block) in &self.blocks {
                block_context.push(block_name, Arc::clone(block));
            }
        }

        let result = parent.render_to(stream, ctx);

        let block_context = ctx.render_context_mut().block_context_mut();
        for (block_name, block) in &self.blocks {
            block_context.remove(block_name, block);
        }
        result
    }

    fn must_be_first(&self) -> bool {
        true
    }
}

pub struct ExtendsNodeFactory;

impl NodeFactory for ExtendsNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr = smart_split(&token.content);
        if expr.len() != 2 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "extends takes one argument",
            ));
        }

        let parent = match unquote(&expr[1]) {
            Some(name) => Parent::Constant(name.to_string()),
            None => Parent::Dynamic(FilterExpression::new(&expr[1], parser)?),
        };

        // Consume the rest of the child template. Content outside blocks is
        // discarded; the blocks themselves were recorded while parsing.
        let mark = parser.block_count();
        parser.parse(&[])?;
        let blocks = parser.blocks_since(mark);

        Ok(Box::new(ExtendsNode { parent, blocks }))
    }
}
