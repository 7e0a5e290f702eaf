// ABOUTME: The for tag: iteration with loop bookkeeping and unpacking
// ABOUTME: Injects the forloop mapping and supports an empty fallback body

use std::collections::HashMap;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::{smart_split, FilterExpression};
use crate::lexer::Token;
use crate::node::{Node, NodeFactory, NodeList};
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::Value;

const FORLOOP: &str = "forloop";
const PARENTLOOP: &str = "parentloop";

pub struct ForNode {
    loop_vars: Vec<String>,
    expr: FilterExpression,
    reversed: bool,
    loop_list: NodeList,
    empty_list: NodeList,
}

fn loop_variables(list_size: usize, index: usize, parent: Option<&Value>) -> Value {
    let mut forloop = HashMap::new();
    forloop.insert("counter0".to_string(), Value::Integer(index as i64));
    forloop.insert("counter".to_string(), Value::Integer(index as i64 + 1));
    forloop.insert(
        "revcounter".to_string(),
        Value::Integer((list_size - index) as i64),
    );
    forloop.insert(
        "revcounter0".to_string(),
        Value::Integer((list_size - index - 1) as i64),
    );
    forloop.insert("first".to_string(), Value::Bool(index == 0));
    forloop.insert("last".to_string(), Value::Bool(index == list_size - 1));
    if let Some(parent) = parent {
        forloop.insert(PARENTLOOP.to_string(), parent.clone());
    }
    Value::Map(forloop)
}

impl Node for ForNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let parent_loop = ctx.lookup(FORLOOP);
        let unpack = self.loop_vars.len() > 1;

        let mut scope = ctx.scope();
        let items = self
            .expr
            .resolve(&scope)?
            .iter_items()
            .unwrap_or_default();
        if items.is_empty() {
            return self.empty_list.render(stream, &mut scope);
        }

        let list_size = items.len();
        let indexed: Box<dyn Iterator<Item = &Value>> = if self.reversed {
            Box::new(items.iter().rev())
        } else {
            Box::new(items.iter())
        };

        for (index, item) in indexed.enumerate() {
            scope.insert(
                FORLOOP,
                loop_variables(list_size, index, parent_loop.as_ref()),
            );

            if unpack {
                match item {
                    // Sequence items assign positionally, padded with
                    // invalid values when short.
                    Value::List(parts) => {
                        for (position, var) in self.loop_vars.iter().enumerate() {
                            scope.insert(
                                var.clone(),
                                parts.get(position).cloned().unwrap_or(Value::Invalid),
                            );
                        }
                    }
                    // Anything else assigns each variable by member lookup
                    // on the item.
                    other => {
                        for var in &self.loop_vars {
                            scope.insert(
                                var.clone(),
                                other.get_member(var).unwrap_or(Value::Invalid),
                            );
                        }
                    }
                }
            } else {
                scope.insert(self.loop_vars[0].clone(), item.clone());
            }

            self.loop_list.render(stream, &mut scope)?;
        }
        Ok(())
    }
}

pub struct ForNodeFactory;

impl NodeFactory for ForNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let mut expr = smart_split(&token.content);
        if expr.len() < 4 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!(
                    "'for' statements should have at least four words: {}",
                    token.content
                ),
            ));
        }

        expr.remove(0);
        let reversed = expr.last().map(String::as_str) == Some("reversed");
        if reversed {
            expr.pop();
        }

        if expr.get(expr.len() - 2).map(String::as_str) != Some("in") {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!(
                    "'for' statements should use the form 'for x in y': {}",
                    token.content
                ),
            ));
        }

        let mut loop_vars = Vec::new();
        for arg in &expr[..expr.len() - 2] {
            loop_vars.extend(
                arg.split(',')
                    .filter(|part| !part.is_empty())
                    .map(str::to_string),
            );
        }
        if loop_vars.is_empty() {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "'for' tag received an invalid argument",
            ));
        }

        let fe = FilterExpression::new(expr.last().expect("checked length"), parser)?;

        let loop_list = parser.parse(&["empty", "endfor"])?;
        let stop = parser.take_next_token()?;
        let empty_list = if stop.tag_name() == Some("empty") {
            let list = parser.parse(&["endfor"])?;
            parser.remove_next_token();
            list
        } else {
            NodeList::new()
        };

        Ok(Box::new(ForNode {
            loop_vars,
            expr: fe,
            reversed,
            loop_list,
            empty_list,
        }))
    }
}
