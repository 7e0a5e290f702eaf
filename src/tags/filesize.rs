// ABOUTME: The l10n_filesize tag: localized file size formatting
// ABOUTME: Scales a byte count into SI or IEC units with configurable precision

use tracing::warn;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::{smart_split, FilterExpression};
use crate::lexer::Token;
use crate::node::{stream_value, Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::Value;

const SI_UNITS: [&str; 9] = ["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const IEC_UNITS: [&str; 9] = [
    "B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB",
];

/// Scale a size into `(scaled, unit)` for the given unit system.
fn calc_file_size(size: f64, unit_system: i64, multiplier: f64) -> (f64, &'static str) {
    let (step, units) = if unit_system == 2 {
        (1024.0, &IEC_UNITS)
    } else {
        (1000.0, &SI_UNITS)
    };

    let mut scaled = size * multiplier;
    let mut index = 0;
    while scaled.abs() >= step && index < units.len() - 1 {
        scaled /= step;
        index += 1;
    }
    (scaled, units[index])
}

pub struct L10nFileSizeNode {
    size: FilterExpression,
    unit_system: Option<FilterExpression>,
    precision: Option<FilterExpression>,
    multiplier: Option<FilterExpression>,
}

impl L10nFileSizeNode {
    /// Resolve the parameters and format. `None` means the size could not be
    /// read as a number, which renders as nothing.
    fn formatted(&self, ctx: &Context) -> Result<Option<String>> {
        let size = match self.size.resolve(ctx)?.as_float() {
            Some(size) => size,
            None => {
                warn!("failed to convert input file size into a floating point number");
                return Ok(None);
            }
        };

        let unit_system = match &self.unit_system {
            Some(expr) => match expr.resolve(ctx)?.as_integer() {
                Some(system @ (2 | 10)) => system,
                _ => {
                    warn!("invalid unit system for file size, using decimal");
                    10
                }
            },
            None => 10,
        };

        let mut precision = match &self.precision {
            Some(expr) => expr.resolve(ctx)?.as_integer().unwrap_or_else(|| {
                warn!("invalid precision for file size, using 2");
                2
            }),
            None => 2,
        };

        let multiplier = match &self.multiplier {
            Some(expr) => match expr.resolve(ctx)?.as_float() {
                Some(m) if m != 0.0 => m,
                _ => {
                    warn!("invalid multiplier for file size, using 1.0");
                    1.0
                }
            },
            None => 1.0,
        };

        // Sizes below one scaling step render without decimals.
        let total = size * multiplier;
        let step = if unit_system == 2 { 1024.0 } else { 1000.0 };
        if total > -step && total < step {
            precision = 0;
        }

        let (scaled, unit) = calc_file_size(size, unit_system, multiplier);
        let number = if precision == 2 {
            ctx.localizer().localize_number(scaled)
        } else {
            let prec = precision.max(0) as usize;
            format!("{scaled:.prec$}")
        };
        Ok(Some(format!("{number} {unit}")))
    }
}

impl Node for L10nFileSizeNode {
    fn render(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        if let Some(result) = self.formatted(ctx)? {
            stream_value(stream, &Value::String(result), ctx);
        }
        Ok(())
    }
}

pub struct L10nFileSizeVarNode {
    inner: L10nFileSizeNode,
    result_name: String,
}

impl Node for L10nFileSizeVarNode {
    fn render(&self, _stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        if let Some(result) = self.inner.formatted(ctx)? {
            ctx.insert(self.result_name.clone(), Value::String(result));
        }
        Ok(())
    }
}

fn parse_parameters(
    parts: &[String],
    parser: &Parser<'_>,
) -> Result<L10nFileSizeNode> {
    Ok(L10nFileSizeNode {
        size: FilterExpression::new(&parts[0], parser)?,
        unit_system: parts
            .get(1)
            .map(|p| FilterExpression::new(p, parser))
            .transpose()?,
        precision: parts
            .get(2)
            .map(|p| FilterExpression::new(p, parser))
            .transpose()?,
        multiplier: parts
            .get(3)
            .map(|p| FilterExpression::new(p, parser))
            .transpose()?,
    })
}

pub struct L10nFileSizeNodeFactory;

impl NodeFactory for L10nFileSizeNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let mut parts = smart_split(&token.content);
        parts.remove(0);
        if parts.is_empty() {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "l10n_filesize requires at least the file size as first parameter",
            ));
        }
        Ok(Box::new(parse_parameters(&parts, parser)?))
    }
}

pub struct L10nFileSizeVarNodeFactory;

impl NodeFactory for L10nFileSizeVarNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let mut parts = smart_split(&token.content);
        parts.remove(0);
        if parts.len() < 2 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "l10n_filesize_var takes at least 2 arguments, the file size and the variable name",
            ));
        }
        let result_name = parts.pop().expect("checked length");
        Ok(Box::new(L10nFileSizeVarNode {
            inner: parse_parameters(&parts, parser)?,
            result_name,
        }))
    }
}
