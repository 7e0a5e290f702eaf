// ABOUTME: Localizer contract consumed by the i18n tags
// ABOUTME: Ships a passthrough implementation with positional-argument substitution

use crate::value::Value;

/// Translation and number formatting backend. The engine only consumes this
/// interface; real backends (gettext catalogs, ICU) live outside the crate.
pub trait Localizer: Send + Sync {
    fn localize_string(&self, source: &str, args: &[Value]) -> String;

    fn localize_context_string(&self, source: &str, context: &str, args: &[Value]) -> String;

    fn localize_plural_string(
        &self,
        singular: &str,
        plural: &str,
        count: i64,
        args: &[Value],
    ) -> String;

    fn localize_number(&self, number: f64) -> String;

    fn current_locale(&self) -> String;
}

/// Default backend: no translation, `%1`-style positional substitution, plain
/// number formatting.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughLocalizer;

/// Replace `%1` through `%9` with the display form of the matching argument.
fn substitute_args(source: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            if let Some(d) = chars.peek().and_then(|p| p.to_digit(10)) {
                if d >= 1 {
                    chars.next();
                    if let Some(arg) = args.get(d as usize - 1) {
                        out.push_str(&arg.to_display_string());
                    }
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

impl Localizer for PassthroughLocalizer {
    fn localize_string(&self, source: &str, args: &[Value]) -> String {
        substitute_args(source, args)
    }

    fn localize_context_string(&self, source: &str, _context: &str, args: &[Value]) -> String {
        substitute_args(source, args)
    }

    fn localize_plural_string(
        &self,
        singular: &str,
        plural: &str,
        count: i64,
        args: &[Value],
    ) -> String {
        let source = if count == 1 { singular } else { plural };
        substitute_args(source, args)
    }

    fn localize_number(&self, number: f64) -> String {
        format!("{number:.2}")
    }

    fn current_locale(&self) -> String {
        "C".to_string()
    }
}
