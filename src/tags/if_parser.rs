// ABOUTME: Pratt parser for boolean and relational expressions in the if tag
// ABOUTME: Errors inside condition evaluation are swallowed and treated as false

use std::cmp::Ordering;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::FilterExpression;
use crate::parser::Parser;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Or,
    And,
    Not,
    In,
    NotIn,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Left binding power; higher binds tighter.
fn lbp(op: OpCode) -> u8 {
    match op {
        OpCode::Or => 6,
        OpCode::And => 7,
        OpCode::Not => 8,
        OpCode::In | OpCode::NotIn => 9,
        OpCode::Eq | OpCode::Neq | OpCode::Gt | OpCode::Gte | OpCode::Lt | OpCode::Lte => 10,
    }
}

fn op_name(op: OpCode) -> &'static str {
    match op {
        OpCode::Or => "or",
        OpCode::And => "and",
        OpCode::Not => "not",
        OpCode::In => "in",
        OpCode::NotIn => "not in",
        OpCode::Eq => "==",
        OpCode::Neq => "!=",
        OpCode::Gt => ">",
        OpCode::Gte => ">=",
        OpCode::Lt => "<",
        OpCode::Lte => "<=",
    }
}

fn op_for(word: &str) -> Option<OpCode> {
    match word {
        "or" => Some(OpCode::Or),
        "and" => Some(OpCode::And),
        "not" => Some(OpCode::Not),
        "in" => Some(OpCode::In),
        "==" => Some(OpCode::Eq),
        "!=" => Some(OpCode::Neq),
        ">" => Some(OpCode::Gt),
        ">=" => Some(OpCode::Gte),
        "<" => Some(OpCode::Lt),
        "<=" => Some(OpCode::Lte),
        _ => None,
    }
}

/// A parsed condition tree. Terminal literals are filter expressions.
pub enum IfExpr {
    Literal(FilterExpression),
    Unary(OpCode, Box<IfExpr>),
    Binary(OpCode, Box<IfExpr>, Box<IfExpr>),
}

impl std::fmt::Debug for IfExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IfExpr::Literal(_) => f.write_str("IfExpr::Literal(..)"),
            IfExpr::Unary(op, inner) => {
                f.debug_tuple("IfExpr::Unary").field(op).field(inner).finish()
            }
            IfExpr::Binary(op, lhs, rhs) => f
                .debug_tuple("IfExpr::Binary")
                .field(op)
                .field(lhs)
                .field(rhs)
                .finish(),
        }
    }
}

impl IfExpr {
    /// Evaluate, treating any error inside the condition as false.
    pub fn evaluate(&self, ctx: &Context) -> Value {
        self.eval(ctx).unwrap_or(Value::Bool(false))
    }

    fn eval(&self, ctx: &Context) -> Result<Value> {
        match self {
            IfExpr::Literal(expr) => expr.resolve(ctx),
            IfExpr::Unary(_, inner) => Ok(Value::Bool(!inner.evaluate(ctx).is_truthy())),
            IfExpr::Binary(op, lhs, rhs) => {
                let result = match op {
                    OpCode::Or => {
                        lhs.evaluate(ctx).is_truthy() || rhs.evaluate(ctx).is_truthy()
                    }
                    OpCode::And => {
                        lhs.evaluate(ctx).is_truthy() && rhs.evaluate(ctx).is_truthy()
                    }
                    OpCode::In => contains(&lhs.evaluate(ctx), &rhs.evaluate(ctx)),
                    OpCode::NotIn => !contains(&lhs.evaluate(ctx), &rhs.evaluate(ctx)),
                    OpCode::Eq => lhs.evaluate(ctx) == rhs.evaluate(ctx),
                    OpCode::Neq => lhs.evaluate(ctx) != rhs.evaluate(ctx),
                    OpCode::Gt | OpCode::Gte | OpCode::Lt | OpCode::Lte => {
                        match compare_values(&lhs.evaluate(ctx), &rhs.evaluate(ctx)) {
                            Some(ordering) => match op {
                                OpCode::Gt => ordering == Ordering::Greater,
                                OpCode::Gte => ordering != Ordering::Less,
                                OpCode::Lt => ordering == Ordering::Less,
                                OpCode::Lte => ordering != Ordering::Greater,
                                _ => unreachable!(),
                            },
                            // Incomparable operands order as false.
                            None => false,
                        }
                    }
                    OpCode::Not => false,
                };
                Ok(Value::Bool(result))
            }
        }
    }
}

/// Membership: substring for string containers, element membership for
/// lists, key membership for maps.
fn contains(needle: &Value, container: &Value) -> bool {
    match container {
        Value::String(_) | Value::Safe(_) => container
            .to_display_string()
            .contains(&needle.to_display_string()),
        Value::List(items) => items.iter().any(|item| item == needle),
        Value::Map(map) => map.contains_key(&needle.to_display_string()),
        _ => false,
    }
}

/// Natural ordering across numbers, strings, and booleans; `None` for
/// everything else.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (
            Value::Integer(_) | Value::Float(_),
            Value::Integer(_) | Value::Float(_),
        ) => a.as_float()?.partial_cmp(&b.as_float()?),
        (Value::String(_) | Value::Safe(_), Value::String(_) | Value::Safe(_)) => {
            Some(a.to_display_string().cmp(&b.to_display_string()))
        }
        _ => None,
    }
}

#[derive(Clone)]
enum RawToken {
    Op(OpCode),
    Literal(FilterExpression),
}

/// Pratt parser over the whitespace-split if arguments. `not in` is joined
/// into one token during construction.
pub struct IfParser {
    tokens: Vec<RawToken>,
    pos: usize,
}

impl IfParser {
    pub fn new(parser: &Parser<'_>, args: &[String]) -> Result<Self> {
        let mut tokens = Vec::with_capacity(args.len());
        let mut i = 0;
        while i < args.len() {
            if args[i] == "not" && args.get(i + 1).map(String::as_str) == Some("in") {
                tokens.push(RawToken::Op(OpCode::NotIn));
                i += 2;
                continue;
            }
            tokens.push(match op_for(&args[i]) {
                Some(op) => RawToken::Op(op),
                None => RawToken::Literal(FilterExpression::new(&args[i], parser)?),
            });
            i += 1;
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn peek_lbp(&self) -> u8 {
        match self.tokens.get(self.pos) {
            Some(RawToken::Op(op)) => lbp(*op),
            _ => 0,
        }
    }

    fn consume(&mut self) -> Option<RawToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn parse(mut self) -> Result<IfExpr> {
        let expr = self.expression(0)?;
        if self.pos < self.tokens.len() {
            let name = match &self.tokens[self.pos] {
                RawToken::Op(op) => op_name(*op).to_string(),
                RawToken::Literal(_) => "literal".to_string(),
            };
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("unused '{name}' at end of if expression"),
            ));
        }
        Ok(expr)
    }

    fn expression(&mut self, rbp: u8) -> Result<IfExpr> {
        let token = self.consume().ok_or_else(|| {
            TemplateError::new(ErrorKind::TagSyntax, "missing expression in if tag")
        })?;
        let mut left = self.nud(token)?;
        while rbp < self.peek_lbp() {
            let op = match self.consume() {
                Some(RawToken::Op(op)) => op,
                _ => break,
            };
            left = self.led(op, left)?;
        }
        Ok(left)
    }

    fn nud(&mut self, token: RawToken) -> Result<IfExpr> {
        match token {
            RawToken::Literal(expr) => Ok(IfExpr::Literal(expr)),
            RawToken::Op(OpCode::Not) => {
                let operand = self.expression(lbp(OpCode::Not))?;
                Ok(IfExpr::Unary(OpCode::Not, Box::new(operand)))
            }
            RawToken::Op(op) => Err(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("not expecting '{}' in this position in if tag", op_name(op)),
            )),
        }
    }

    fn led(&mut self, op: OpCode, left: IfExpr) -> Result<IfExpr> {
        if op == OpCode::Not {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "not expecting 'not' as an infix operator in if tag",
            ));
        }
        let right = self.expression(lbp(op))?;
        Ok(IfExpr::Binary(op, Box::new(left), Box::new(right)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::expression::smart_split;
    use crate::lexer::tokenize;
    use serde_json::json;

    fn eval(expr: &str, ctx: &Context) -> bool {
        let engine = Engine::new();
        let tokens = tokenize("", false).unwrap();
        let parser = Parser::new(tokens, &engine);
        let args = smart_split(expr);
        IfParser::new(&parser, &args)
            .unwrap()
            .parse()
            .unwrap()
            .evaluate(ctx)
            .is_truthy()
    }

    #[test]
    fn test_and_or_not() {
        let ctx = Context::from_json(json!({"a": true, "b": false}));
        assert!(eval("a", &ctx));
        assert!(eval("a and not b", &ctx));
        assert!(!eval("a and b", &ctx));
        assert!(eval("a or b", &ctx));
        assert!(eval("not b", &ctx));
    }

    #[test]
    fn test_precedence_or_binds_loosest() {
        // not a or b  parses as (not a) or b
        let ctx = Context::from_json(json!({"a": false, "b": false}));
        assert!(eval("not a or b", &ctx));
        // a and b == c parses as a and (b == c)
        let ctx = Context::from_json(json!({"a": true, "b": 2, "c": 2}));
        assert!(eval("a and b == c", &ctx));
    }

    #[test]
    fn test_comparisons() {
        let ctx = Context::from_json(json!({"n": 3, "s": "abc"}));
        assert!(eval("n > 2", &ctx));
        assert!(eval("n >= 3", &ctx));
        assert!(eval("n < 3.5", &ctx));
        assert!(eval("n == 3", &ctx));
        assert!(eval("n != 4", &ctx));
        assert!(eval("s == \"abc\"", &ctx));
    }

    #[test]
    fn test_incomparable_is_false() {
        let ctx = Context::from_json(json!({"s": "abc", "n": 1}));
        assert!(!eval("s > n", &ctx));
        assert!(!eval("s < n", &ctx));
    }

    #[test]
    fn test_membership() {
        let ctx = Context::from_json(json!({
            "s": "hello", "xs": [1, 2, 3], "m": {"k": 1}
        }));
        assert!(eval("\"ell\" in s", &ctx));
        assert!(eval("2 in xs", &ctx));
        assert!(eval("4 not in xs", &ctx));
        assert!(eval("\"k\" in m", &ctx));
        assert!(!eval("\"z\" in m", &ctx));
    }

    #[test]
    fn test_errors_evaluate_false() {
        let mut ctx = Context::new();
        ctx.set_strict(true);
        assert!(!eval("missing", &ctx));
        assert!(eval("not missing", &ctx));
    }

    #[test]
    fn test_unused_token_is_error() {
        let engine = Engine::new();
        let tokens = tokenize("", false).unwrap();
        let parser = Parser::new(tokens, &engine);
        let args = smart_split("a b");
        let err = IfParser::new(&parser, &args).unwrap().parse().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TagSyntax);
    }

    #[test]
    fn test_leading_infix_is_error() {
        let engine = Engine::new();
        let tokens = tokenize("", false).unwrap();
        let parser = Parser::new(tokens, &engine);
        let args = smart_split("and a");
        let err = IfParser::new(&parser, &args).unwrap().parse().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TagSyntax);
    }
}
