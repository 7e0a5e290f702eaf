// ABOUTME: Runtime render context: scoped variable stack and render state
// ABOUTME: Provides scope guards, auto-escape state, and per-render scratch data

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::localize::{Localizer, PassthroughLocalizer};
use crate::tags::block::BlockContext;
use crate::value::Value;

/// Per-render scratch state, reachable from any node during a render.
#[derive(Default)]
pub struct RenderContext {
    engine: Option<Arc<Engine>>,
    block_context: BlockContext,
    data: HashMap<usize, Value>,
}

impl RenderContext {
    pub fn engine(&self) -> Option<&Arc<Engine>> {
        self.engine.as_ref()
    }

    pub fn set_engine(&mut self, engine: Arc<Engine>) {
        self.engine = Some(engine);
    }

    pub fn block_context(&self) -> &BlockContext {
        &self.block_context
    }

    pub fn block_context_mut(&mut self) -> &mut BlockContext {
        &mut self.block_context
    }

    /// Scratch storage keyed by node identity.
    pub fn data(&self, key: usize) -> Option<&Value> {
        self.data.get(&key)
    }

    pub fn set_data(&mut self, key: usize, value: Value) {
        self.data.insert(key, value);
    }
}

/// The render-time variable stack. Lookup walks scopes top-down; inserts land
/// in the innermost scope. Every push is paired with a pop through
/// [`Context::scope`], which pops on drop so the pairing holds on all exit
/// paths.
pub struct Context {
    scopes: Vec<HashMap<String, Value>>,
    auto_escape: bool,
    mutating: bool,
    strict: bool,
    localizer: Arc<dyn Localizer>,
    render_context: RenderContext,
}

impl Context {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            auto_escape: true,
            mutating: false,
            strict: false,
            localizer: Arc::new(PassthroughLocalizer),
            render_context: RenderContext::default(),
        }
    }

    /// Build a context from a JSON object; non-object values yield an empty
    /// context.
    pub fn from_json(data: serde_json::Value) -> Self {
        let mut ctx = Self::new();
        if let serde_json::Value::Object(map) = data {
            for (key, value) in map {
                ctx.insert(key, Value::from(value));
            }
        }
        ctx
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.scopes
            .last_mut()
            .expect("context always has a base scope")
            .insert(name.into(), value.into());
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    /// Lookup honoring strict mode: a miss is an error when strict.
    pub fn lookup_checked(&self, name: &str) -> Result<Value> {
        match self.lookup(name) {
            Some(value) => Ok(value),
            None if self.strict => Err(TemplateError::new(
                ErrorKind::VariableNotInContext,
                format!("variable '{name}' not found in context"),
            )),
            None => Ok(Value::Invalid),
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the base scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Push a scope and return a guard that pops it on drop.
    pub fn scope(&mut self) -> ScopeGuard<'_> {
        self.push();
        ScopeGuard { context: self }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn auto_escape(&self) -> bool {
        self.auto_escape
    }

    pub fn set_auto_escape(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.auto_escape, enabled)
    }

    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    pub fn set_mutating(&mut self, mutating: bool) {
        self.mutating = mutating;
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn localizer(&self) -> &Arc<dyn Localizer> {
        &self.localizer
    }

    pub fn set_localizer(&mut self, localizer: Arc<dyn Localizer>) {
        self.localizer = localizer;
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.render_context
    }

    pub fn render_context_mut(&mut self) -> &mut RenderContext {
        &mut self.render_context
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Pops the scope it guards when dropped.
pub struct ScopeGuard<'a> {
    context: &'a mut Context,
}

impl Deref for ScopeGuard<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.context
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.context
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.context.pop();
    }
}
