// ABOUTME: Filter contract and the default filter library
// ABOUTME: Filters are pure value transforms registered by tag libraries

mod defaults;

pub use defaults::DefaultFiltersLibrary;

use crate::value::Value;

/// A named transform in a `{{ v|f:arg }}` chain.
///
/// Filters must not mutate their inputs; the chain folds left to right with
/// the resolved argument (invalid when absent) and the scope's auto-escape
/// flag. Escaping itself is applied at stream write time.
pub trait Filter: Send + Sync {
    fn filter(&self, input: &Value, arg: &Value, auto_escape: bool) -> Value;

    /// Output is safe whenever the input was safe.
    fn is_safe(&self) -> bool {
        false
    }

    /// The filter may process unsafe input without requesting escaping.
    fn accepts_unsafe(&self) -> bool {
        false
    }
}
