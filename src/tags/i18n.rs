// ABOUTME: Localization tags: i18nc and i18np plus their *_var variants
// ABOUTME: Delegate to the context's localizer; var variants bind a context name

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::{smart_split, unescape, unquote, FilterExpression};
use crate::lexer::Token;
use crate::node::{stream_value, Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::Value;

/// A static, quoted tag argument.
fn static_string(raw: &str, what: &str, tag: &str) -> Result<String> {
    unquote(raw).map(unescape).ok_or_else(|| {
        TemplateError::new(
            ErrorKind::TagSyntax,
            format!("{tag} tag {what} must be a static string"),
        )
    })
}

fn resolve_args(expressions: &[FilterExpression], ctx: &Context) -> Result<Vec<Value>> {
    expressions.iter().map(|fe| fe.resolve(ctx)).collect()
}

/// The plural count is the first argument that resolves to an integer.
fn plural_count(args: &[Value]) -> i64 {
    args.iter()
        .find_map(|arg| match arg {
            Value::Integer(n) => Some(*n),
            _ => None,
        })
        .unwrap_or(0)
}

/// `{% i18nc "context" "source" args... %}`
pub struct I18ncNode {
    source: String,
    context: String,
    args: Vec<FilterExpression>,
}

impl I18ncNode {
    fn localized(&self, ctx: &Context) -> Result<String> {
        let args = resolve_args(&self.args, ctx)?;
        Ok(ctx
            .localizer()
            .localize_context_string(&self.source, &self.context, &args))
    }
}

impl Node for I18ncNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let result = self.localized(ctx)?;
        stream_value(stream, &Value::String(result), ctx);
        Ok(())
    }
}

/// `{% i18nc_var "context" "source" args... as name %}`
pub struct I18ncVarNode {
    inner: I18ncNode,
    result_name: String,
}

impl Node for I18ncVarNode {
    fn render(&self, _stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let result = self.inner.localized(ctx)?;
        ctx.insert(self.result_name.clone(), Value::String(result));
        Ok(())
    }
}

/// `{% i18np "singular" "plural" args... %}`
pub struct I18npNode {
    source: String,
    plural: String,
    args: Vec<FilterExpression>,
}

impl I18npNode {
    fn localized(&self, ctx: &Context) -> Result<String> {
        let args = resolve_args(&self.args, ctx)?;
        let count = plural_count(&args);
        Ok(ctx
            .localizer()
            .localize_plural_string(&self.source, &self.plural, count, &args))
    }
}

impl Node for I18npNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let result = self.localized(ctx)?;
        stream_value(stream, &Value::String(result), ctx);
        Ok(())
    }
}

/// `{% i18np_var "singular" "plural" args... as name %}`
pub struct I18npVarNode {
    inner: I18npNode,
    result_name: String,
}

impl Node for I18npVarNode {
    fn render(&self, _stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let result = self.inner.localized(ctx)?;
        ctx.insert(self.result_name.clone(), Value::String(result));
        Ok(())
    }
}

pub struct I18ncNodeFactory;

impl NodeFactory for I18ncNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr = smart_split(&token.content);
        if expr.len() < 3 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "i18nc tag takes at least two arguments",
            ));
        }
        let context = static_string(&expr[1], "first argument", "i18nc")?;
        let source = static_string(&expr[2], "second argument", "i18nc")?;
        let args = parser.filter_expression_list(&expr[3..])?;
        Ok(Box::new(I18ncNode {
            source,
            context,
            args,
        }))
    }
}

pub struct I18ncVarNodeFactory;

impl NodeFactory for I18ncVarNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr = smart_split(&token.content);
        if expr.len() < 5 || expr[expr.len() - 2] != "as" {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "i18nc_var tag takes at least four arguments, ending with 'as NAME'",
            ));
        }
        let context = static_string(&expr[1], "first argument", "i18nc_var")?;
        let source = static_string(&expr[2], "second argument", "i18nc_var")?;
        let args = parser.filter_expression_list(&expr[3..expr.len() - 2])?;
        let result_name = expr[expr.len() - 1].clone();
        Ok(Box::new(I18ncVarNode {
            inner: I18ncNode {
                source,
                context,
                args,
            },
            result_name,
        }))
    }
}

pub struct I18npNodeFactory;

impl NodeFactory for I18npNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr = smart_split(&token.content);
        if expr.len() < 3 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "i18np tag takes at least two arguments",
            ));
        }
        let source = static_string(&expr[1], "first argument", "i18np")?;
        let plural = static_string(&expr[2], "second argument", "i18np")?;
        let args = parser.filter_expression_list(&expr[3..])?;
        Ok(Box::new(I18npNode {
            source,
            plural,
            args,
        }))
    }
}

pub struct I18npVarNodeFactory;

impl NodeFactory for I18npVarNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr = smart_split(&token.content);
        if expr.len() < 5 || expr[expr.len() - 2] != "as" {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "i18np_var tag takes at least four arguments, ending with 'as NAME'",
            ));
        }
        let source = static_string(&expr[1], "first argument", "i18np_var")?;
        let plural = static_string(&expr[2], "second argument", "i18np_var")?;
        let args = parser.filter_expression_list(&expr[3..expr.len() - 2])?;
        let result_name = expr[expr.len() - 1].clone();
        Ok(Box::new(I18npVarNode {
            inner: I18npNode {
                source,
                plural,
                args,
            },
            result_name,
        }))
    }
}
