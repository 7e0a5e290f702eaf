// ABOUTME: The block tag: named, overridable regions used by template inheritance
// ABOUTME: BlockContext carries override chains through the render scratch state

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::lexer::Token;
use crate::node::{Node, NodeFactory, NodeList};
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::{SafeString, Value};

/// Per-render map of block name to its override chain, most-derived first.
/// `extends` pushes child overrides before rendering the parent; the parent's
/// block nodes consult it.
#[derive(Default)]
pub struct BlockContext {
    blocks: HashMap<String, VecDeque<Arc<BlockNode>>>,
}

impl BlockContext {
    /// Add an override behind any more-derived ones already present.
    pub fn push(&mut self, name: &str, node: Arc<BlockNode>) {
        self.blocks.entry(name.to_string()).or_default().push_back(node);
    }

    /// The most-derived override for a name, if any.
    pub fn get_block(&self, name: &str) -> Option<Arc<BlockNode>> {
        self.blocks.get(name).and_then(|chain| chain.front().cloned())
    }

    /// Remove and return the whole chain for a name, most-derived first.
    pub fn take_chain(&mut self, name: &str) -> Vec<Arc<BlockNode>> {
        self.blocks.remove(name).map(Vec::from).unwrap_or_default()
    }

    pub fn restore_chain(&mut self, name: &str, chain: Vec<Arc<BlockNode>>) {
        if !chain.is_empty() {
            self.blocks.insert(name.to_string(), chain.into());
        }
    }

    /// Remove one specific block registration.
    pub fn remove(&mut self, name: &str, node: &Arc<BlockNode>) {
        if let Some(chain) = self.blocks.get_mut(name) {
            chain.retain(|candidate| !Arc::ptr_eq(candidate, node));
            if chain.is_empty() {
                self.blocks.remove(name);
            }
        }
    }

    /// Remove every listed block definition; used after a constant include so
    /// the included template's blocks do not leak into later inheritance.
    pub fn remove_blocks(&mut self, blocks: &[(String, Arc<BlockNode>)]) {
        for (name, node) in blocks {
            self.remove(name, node);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// `{% block NAME %}...{% endblock %}`.
pub struct BlockNode {
    name: String,
    list: NodeList,
}

impl BlockNode {
    pub fn new(name: impl Into<String>, list: NodeList) -> Self {
        Self {
            name: name.into(),
            list,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn list(&self) -> &NodeList {
        &self.list
    }

    /// Render position `idx` of an override chain. The next chain entry (or
    /// the base block itself) is captured into `block.super`.
    fn render_chain(
        &self,
        chain: &[Arc<BlockNode>],
        idx: usize,
        stream: &mut OutputStream,
        ctx: &mut Context,
    ) -> Result<()> {
        let node: &BlockNode = chain.get(idx).map(|n| n.as_ref()).unwrap_or(self);
        let super_text = if idx < chain.len() {
            let mut sub = stream.buffered();
            self.render_chain(chain, idx + 1, &mut sub, ctx)?;
            Some(sub.into_string())
        } else {
            None
        };

        let mut scope = ctx.scope();
        if let Some(text) = super_text {
            let mut block_var = HashMap::new();
            block_var.insert("super".to_string(), Value::Safe(SafeString::safe(text)));
            scope.insert("block", Value::Map(block_var));
        }
        node.list.render(stream, &mut scope)
    }
}

impl Node for Arc<BlockNode> {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let chain = ctx
            .render_context_mut()
            .block_context_mut()
            .take_chain(self.name());
        let result = self.render_chain(&chain, 0, stream, ctx);
        ctx.render_context_mut()
            .block_context_mut()
            .restore_chain(self.name(), chain);
        result
    }
}

pub struct BlockNodeFactory;

impl NodeFactory for BlockNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let parts: Vec<&str> = token.content.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "block tag takes one argument, the block name",
            ));
        }
        let name = parts[1];

        let list = parser.parse(&["endblock"])?;
        parser.remove_next_token();

        let node = Arc::new(BlockNode::new(name, list));
        parser.record_block(name, Arc::clone(&node));
        Ok(Box::new(node))
    }
}
