// ABOUTME: Trait for opaque host objects carried through the template context
// ABOUTME: Supports named attribute lookup, nullary method calls, and iteration

use super::Value;

/// An opaque host value. The engine never inspects the concrete type; it only
/// asks for attributes, nullary method results, or a sequence view.
pub trait Object: Send + Sync {
    /// Named attribute lookup, the `c` step of dotted-path resolution.
    fn get_attr(&self, name: &str) -> Option<Value>;

    /// Nullary method call, tried after attribute lookup fails.
    fn call(&self, _method: &str) -> Option<Value> {
        None
    }

    /// Sequence view for iteration. `None` means the object is not iterable.
    fn iter(&self) -> Option<Vec<Value>> {
        None
    }

    /// Textual rendering when the object itself is streamed.
    fn as_str(&self) -> Option<String> {
        None
    }
}
