// ABOUTME: The comment tag: its body is discarded at parse time
// ABOUTME: Skips tokens up to endcomment without compiling them

use crate::context::Context;
use crate::error::Result;
use crate::lexer::Token;
use crate::node::{Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;

pub struct CommentNode;

impl Node for CommentNode {
    fn render(&self, _stream: &mut OutputStream, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

pub struct CommentNodeFactory;

impl NodeFactory for CommentNodeFactory {
    fn get_node(&self, _token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        parser.skip_past("endcomment")?;
        Ok(Box::new(CommentNode))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::engine::Engine;

    #[test]
    fn test_body_discarded() {
        let engine = Engine::new();
        let template =
            engine.new_template("a{% comment %} {{ broken | | }} {% endcomment %}b", "test");
        let mut ctx = Context::new();
        assert_eq!(template.render(&mut ctx).unwrap(), "ab");
    }

    #[test]
    fn test_unclosed_comment_is_error() {
        let engine = Engine::new();
        let template = engine.new_template("a{% comment %}b", "broken");
        assert!(template.error().is_some());
    }
}
