// ABOUTME: Consumes the token stream and assembles the node tree
// ABOUTME: Dispatches block tags to factories registered by tag libraries

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::warn;

use crate::engine::Engine;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::FilterExpression;
use crate::filters::Filter;
use crate::lexer::{strip_leading_newline, Token, TokenKind};
use crate::library::TagLibrary;
use crate::node::{NodeFactory, NodeList, TextNode, VariableNode};
use crate::tags::block::BlockNode;

/// Attach the token's position to an error that has none.
fn with_pos(err: TemplateError, token: &Token) -> TemplateError {
    if err.line == 0 {
        err.at(token.line, token.column).in_tag(&token.content)
    } else {
        err
    }
}

/// Token-stream parser. Tag factories receive it to consume their own bodies
/// and to reach the filter and factory registries.
pub struct Parser<'e> {
    tokens: VecDeque<Token>,
    engine: &'e Arc<Engine>,
    node_factories: HashMap<String, Arc<dyn NodeFactory>>,
    filters: HashMap<String, Arc<dyn Filter>>,
    blocks: Vec<(String, Arc<BlockNode>)>,
}

impl<'e> Parser<'e> {
    /// Build a parser over a token stream, preloading the engine's default
    /// libraries. A default library that fails to load is skipped with a
    /// diagnostic; only an explicit `{% load %}` makes that fatal.
    pub fn new(tokens: Vec<Token>, engine: &'e Arc<Engine>) -> Self {
        let mut parser = Self {
            tokens: tokens.into(),
            engine,
            node_factories: HashMap::new(),
            filters: HashMap::new(),
            blocks: Vec::new(),
        };
        for name in engine.default_libraries() {
            match engine.load_library(&name) {
                Ok(library) => parser.open_library(library.as_ref()),
                Err(err) => warn!(library = %name, error = %err, "skipping default library"),
            }
        }
        parser
    }

    /// Merge a library's registrations; later loads override earlier ones.
    fn open_library(&mut self, library: &dyn TagLibrary) {
        for (name, factory) in library.node_factories() {
            self.node_factories.insert(name, factory);
        }
        for (name, filter) in library.filters() {
            self.filters.insert(name, filter);
        }
    }

    /// Load a library by name through the engine and merge it.
    pub fn load_library(&mut self, name: &str) -> Result<()> {
        let library = self.engine.load_library(name)?;
        self.open_library(library.as_ref());
        Ok(())
    }

    pub fn engine(&self) -> &Arc<Engine> {
        self.engine
    }

    pub fn get_filter(&self, name: &str) -> Result<Arc<dyn Filter>> {
        self.filters.get(name).cloned().ok_or_else(|| {
            TemplateError::new(ErrorKind::UnknownFilter, format!("unknown filter: '{name}'"))
        })
    }

    /// Compile each element to a filter expression.
    pub fn filter_expression_list(&self, parts: &[String]) -> Result<Vec<FilterExpression>> {
        parts
            .iter()
            .map(|part| FilterExpression::new(part, self))
            .collect()
    }

    pub fn has_next_token(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn next_token(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    /// The next token, which must exist; used by factories right after a
    /// body parse stopped at a terminator.
    pub fn take_next_token(&mut self) -> Result<Token> {
        self.tokens.pop_front().ok_or_else(|| {
            TemplateError::new(ErrorKind::UnclosedBlockTag, "unexpected end of template")
        })
    }

    pub fn peek_token(&self) -> Option<&Token> {
        self.tokens.front()
    }

    pub fn prepend_token(&mut self, token: Token) {
        self.tokens.push_front(token);
    }

    /// Drop the next token, consuming a terminator tag.
    pub fn remove_next_token(&mut self) {
        self.tokens.pop_front();
    }

    /// Discard tokens up to and including the named block tag. Used by tags
    /// whose body is never compiled.
    pub fn skip_past(&mut self, tag: &str) -> Result<()> {
        while let Some(token) = self.tokens.pop_front() {
            if token.kind == TokenKind::Block && token.tag_name() == Some(tag) {
                return Ok(());
            }
        }
        Err(TemplateError::new(
            ErrorKind::UnclosedBlockTag,
            format!("no closing tag found for '{tag}'"),
        ))
    }

    /// Record a parsed `{% block %}` so the owning template (and `extends`)
    /// can find it later.
    pub fn record_block(&mut self, name: &str, node: Arc<BlockNode>) {
        self.blocks.push((name.to_string(), node));
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks_since(&self, mark: usize) -> Vec<(String, Arc<BlockNode>)> {
        self.blocks[mark..].to_vec()
    }

    pub fn take_blocks(&mut self) -> Vec<(String, Arc<BlockNode>)> {
        std::mem::take(&mut self.blocks)
    }

    /// Consume tokens until end of input or a block tag named in `stop_at`.
    /// The stop token is pushed back for the caller to consume. Reaching end
    /// of input with a non-empty `stop_at` is an unclosed-tag error.
    pub fn parse(&mut self, stop_at: &[&str]) -> Result<NodeList> {
        let mut list = NodeList::new();

        while let Some(token) = self.tokens.pop_front() {
            match token.kind {
                TokenKind::Text => {
                    let content = if token.trim_trailing_newline {
                        strip_leading_newline(&token.content)
                    } else {
                        token.content.as_str()
                    };
                    if !content.is_empty() {
                        let node = Box::new(TextNode::new(content));
                        list.append(node).map_err(|e| with_pos(e, &token))?;
                    }
                }
                TokenKind::Variable => {
                    if token.content.is_empty() {
                        return Err(TemplateError::new(
                            ErrorKind::EmptyVariable,
                            "empty variable tag",
                        )
                        .at(token.line, token.column));
                    }
                    let expr = FilterExpression::new(&token.content, self)
                        .map_err(|e| with_pos(e, &token))?;
                    let node = Box::new(VariableNode::new(expr));
                    list.append(node).map_err(|e| with_pos(e, &token))?;
                }
                TokenKind::Block => {
                    let name = match token.tag_name() {
                        Some(name) => name.to_string(),
                        None => {
                            return Err(TemplateError::new(
                                ErrorKind::EmptyBlockTag,
                                "empty block tag",
                            )
                            .at(token.line, token.column))
                        }
                    };

                    if stop_at.contains(&name.as_str()) {
                        self.tokens.push_front(token);
                        return Ok(list);
                    }

                    let factory = self.node_factories.get(&name).cloned().ok_or_else(|| {
                        TemplateError::new(
                            ErrorKind::InvalidBlockTag,
                            format!("unknown tag: '{name}'"),
                        )
                        .at(token.line, token.column)
                        .in_tag(&token.content)
                    })?;

                    let node = factory
                        .get_node(&token, self)
                        .map_err(|e| with_pos(e, &token))?;
                    list.append(node).map_err(|e| with_pos(e, &token))?;
                }
            }
        }

        if !stop_at.is_empty() {
            return Err(TemplateError::new(
                ErrorKind::UnclosedBlockTag,
                format!(
                    "unclosed tag in template, expected one of: ({})",
                    stop_at.join(" ")
                ),
            ));
        }

        Ok(list)
    }
}
