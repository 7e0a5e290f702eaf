// ABOUTME: The executable node tree: Node trait, NodeList, text and variable nodes
// ABOUTME: Nodes are compiled once and carry no per-render state

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::FilterExpression;
use crate::lexer::Token;
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::{SafeString, Value};

/// One executable element of a compiled template.
///
/// Nodes are shared between renders and must not keep render state; anything
/// per-render lives in the [`Context`].
pub trait Node: Send + Sync {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()>;

    /// Repeatable nodes produce the same output on every render.
    fn is_repeatable(&self) -> bool {
        false
    }

    /// Persistent nodes survive a mutating render; the output of
    /// non-persistent nodes is folded into literal text.
    fn is_persistent(&self) -> bool {
        true
    }

    /// Tags like `extends` that may only appear before any non-text node.
    fn must_be_first(&self) -> bool {
        false
    }

    fn is_text(&self) -> bool {
        false
    }
}

/// Creates a node from a block token. Factories may consume further tokens
/// from the parser for tags that carry a body.
pub trait NodeFactory: Send + Sync {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>>;
}

/// An ordered node sequence tracking whether it holds anything besides text.
#[derive(Default)]
pub struct NodeList {
    nodes: Vec<Box<dyn Node>>,
    contains_non_text: bool,
}

impl std::fmt::Debug for NodeList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeList")
            .field("len", &self.nodes.len())
            .field("contains_non_text", &self.contains_non_text)
            .finish()
    }
}

impl NodeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, enforcing the must-be-first invariant.
    pub fn append(&mut self, node: Box<dyn Node>) -> Result<()> {
        if node.must_be_first() && self.contains_non_text {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "tag must be the first content of the template",
            ));
        }
        if !node.is_text() {
            self.contains_non_text = true;
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn contains_non_text(&self) -> bool {
        self.contains_non_text
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        for node in &self.nodes {
            node.render(stream, ctx)?;
        }
        Ok(())
    }

    /// The mutating render variant: stream everything, then fold the output
    /// of non-persistent nodes into literal text so later renders skip
    /// recomputing them. Runs as a collection pass followed by a rebuild; the
    /// list is left untouched when any node fails.
    pub fn render_mutating(&mut self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let mut outputs = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut sub = stream.buffered();
            node.render(&mut sub, ctx)?;
            let rendered = sub.into_string();
            stream.write_text(&rendered);
            outputs.push(rendered);
        }

        let mut kept: Vec<Box<dyn Node>> = Vec::with_capacity(self.nodes.len());
        let mut baked = String::new();
        for (node, rendered) in std::mem::take(&mut self.nodes).into_iter().zip(outputs) {
            if node.is_persistent() {
                if !baked.is_empty() {
                    kept.push(Box::new(TextNode::new(std::mem::take(&mut baked))));
                }
                kept.push(node);
            } else {
                baked.push_str(&rendered);
            }
        }
        if !baked.is_empty() {
            kept.push(Box::new(TextNode::new(baked)));
        }

        self.contains_non_text = kept.iter().any(|n| !n.is_text());
        self.nodes = kept;
        Ok(())
    }
}

/// Literal template text.
pub struct TextNode {
    content: String,
}

impl TextNode {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Node for TextNode {
    fn render(&self, stream: &mut OutputStream, _ctx: &mut Context) -> Result<()> {
        stream.write_text(&self.content);
        Ok(())
    }

    fn is_repeatable(&self) -> bool {
        true
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn is_text(&self) -> bool {
        true
    }
}

/// `{{ expr }}` substitution.
pub struct VariableNode {
    expr: FilterExpression,
}

impl VariableNode {
    pub fn new(expr: FilterExpression) -> Self {
        Self { expr }
    }
}

impl Node for VariableNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let value = self.expr.resolve(ctx)?;
        if !value.is_valid() {
            return Ok(());
        }
        stream_value(stream, &value, ctx);
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Write a resolved value through the escape-aware stream: an unsafe string
/// is flagged for escaping when the scope has auto-escape on.
pub fn stream_value(stream: &mut OutputStream, value: &Value, ctx: &Context) {
    let mut text: SafeString = value.to_safe_string();
    if ctx.auto_escape() && !text.is_safe() {
        text.set_needs_escape(true);
    }
    stream.write(&text);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticNode(&'static str);

    impl Node for StaticNode {
        fn render(&self, stream: &mut OutputStream, _ctx: &mut Context) -> Result<()> {
            stream.write_text(self.0);
            Ok(())
        }
    }

    struct FirstOnlyNode;

    impl Node for FirstOnlyNode {
        fn render(&self, _stream: &mut OutputStream, _ctx: &mut Context) -> Result<()> {
            Ok(())
        }

        fn must_be_first(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_contains_non_text_tracking() {
        let mut list = NodeList::new();
        list.append(Box::new(TextNode::new("a"))).unwrap();
        assert!(!list.contains_non_text());
        list.append(Box::new(StaticNode("b"))).unwrap();
        assert!(list.contains_non_text());
    }

    #[test]
    fn test_must_be_first_enforced() {
        let mut list = NodeList::new();
        list.append(Box::new(TextNode::new("a"))).unwrap();
        assert!(list.append(Box::new(FirstOnlyNode)).is_ok());

        let mut list = NodeList::new();
        list.append(Box::new(StaticNode("x"))).unwrap();
        let err = list.append(Box::new(FirstOnlyNode)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TagSyntax);
    }

    #[test]
    fn test_render_order() {
        let mut list = NodeList::new();
        list.append(Box::new(TextNode::new("a"))).unwrap();
        list.append(Box::new(StaticNode("b"))).unwrap();
        list.append(Box::new(TextNode::new("c"))).unwrap();

        let mut stream = OutputStream::new();
        let mut ctx = Context::new();
        list.render(&mut stream, &mut ctx).unwrap();
        assert_eq!(stream.as_str(), "abc");
    }

    #[test]
    fn test_stream_value_escapes_when_auto_escape_on() {
        let mut stream = OutputStream::new();
        let ctx = Context::new();
        stream_value(&mut stream, &Value::from("<x>"), &ctx);
        assert_eq!(stream.as_str(), "&lt;x&gt;");
    }

    #[test]
    fn test_stream_value_safe_passthrough() {
        let mut stream = OutputStream::new();
        let ctx = Context::new();
        stream_value(&mut stream, &Value::Safe(SafeString::safe("<x>")), &ctx);
        assert_eq!(stream.as_str(), "<x>");
    }

    #[test]
    fn test_mutating_render_folds_non_persistent() {
        let mut list = NodeList::new();
        list.append(Box::new(TextNode::new("a"))).unwrap();
        list.append(Box::new(TextNode::new("b"))).unwrap();
        list.append(Box::new(StaticNode("tag"))).unwrap();
        list.append(Box::new(TextNode::new("c"))).unwrap();

        let mut stream = OutputStream::new();
        let mut ctx = Context::new();
        list.render_mutating(&mut stream, &mut ctx).unwrap();
        assert_eq!(stream.as_str(), "abtagc");
        // a and b folded into one text node; the persistent node and the
        // trailing text survive.
        assert_eq!(list.len(), 3);

        let mut second = OutputStream::new();
        list.render(&mut second, &mut ctx).unwrap();
        assert_eq!(second.as_str(), "abtagc");
    }
}
