// ABOUTME: Engine orchestration: loaders, tag libraries, template compilation
// ABOUTME: Templates store compile errors and re-raise them on render

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, Weak};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::filters::DefaultFiltersLibrary;
use crate::lexer::tokenize;
use crate::library::TagLibrary;
use crate::loader::TemplateLoader;
use crate::node::NodeList;
use crate::output::{escape_html, EscapeFn, OutputStream};
use crate::parser::Parser;
use crate::tags::block::BlockNode;
use crate::tags::{DefaultTagsLibrary, I18nTagsLibrary, LoaderTagsLibrary};

static VERSION_MAJOR: Lazy<u32> =
    Lazy::new(|| env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0));
static VERSION_MINOR: Lazy<u32> =
    Lazy::new(|| env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0));

fn builtin_library_names() -> Vec<String> {
    ["defaulttags", "loadertags", "defaultfilters", "i18ntags"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Engine-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trim whitespace around block and variable tags standing alone on a
    /// line.
    pub smart_trim: bool,
    /// Libraries merged into every parser before parsing begins.
    pub default_libraries: Vec<String>,
    /// Search roots for versioned plugin libraries.
    pub plugin_paths: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smart_trim: false,
            default_libraries: builtin_library_names(),
            plugin_paths: Vec::new(),
        }
    }
}

/// Per-engine state: ordered template loaders, registered tag libraries, and
/// the escape policy. Engines live behind an `Arc`; registration is meant to
/// happen at setup time, before templates compile or render.
pub struct Engine {
    config: RwLock<EngineConfig>,
    loaders: RwLock<Vec<Arc<dyn TemplateLoader>>>,
    libraries: RwLock<HashMap<String, Arc<dyn TagLibrary>>>,
    escape: RwLock<EscapeFn>,
    weak_self: Weak<Engine>,
}

impl Engine {
    pub fn new() -> Arc<Self> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Arc<Self> {
        let mut libraries: HashMap<String, Arc<dyn TagLibrary>> = HashMap::new();
        libraries.insert("defaulttags".to_string(), Arc::new(DefaultTagsLibrary));
        libraries.insert("loadertags".to_string(), Arc::new(LoaderTagsLibrary));
        libraries.insert("defaultfilters".to_string(), Arc::new(DefaultFiltersLibrary));
        libraries.insert("i18ntags".to_string(), Arc::new(I18nTagsLibrary));

        Arc::new_cyclic(|weak_self| Self {
            config: RwLock::new(config),
            loaders: RwLock::new(Vec::new()),
            libraries: RwLock::new(libraries),
            escape: RwLock::new(Arc::new(escape_html)),
            weak_self: weak_self.clone(),
        })
    }

    /// The engine's own `Arc` handle. Valid for the lifetime of any `&self`
    /// call, since engines are only constructed behind an `Arc`.
    fn handle(&self) -> Arc<Engine> {
        self.weak_self
            .upgrade()
            .expect("engine is always constructed behind an Arc")
    }

    pub fn config(&self) -> EngineConfig {
        self.config.read().expect("engine config lock").clone()
    }

    pub fn add_template_loader(&self, loader: Arc<dyn TemplateLoader>) {
        self.loaders.write().expect("engine loader lock").push(loader);
    }

    pub fn template_loaders(&self) -> Vec<Arc<dyn TemplateLoader>> {
        self.loaders.read().expect("engine loader lock").clone()
    }

    /// Walk the loaders for a media reference; first hit wins.
    pub fn media_uri(&self, name: &str) -> Option<(PathBuf, String)> {
        self.template_loaders()
            .iter()
            .find_map(|loader| loader.media_uri(name))
    }

    pub fn set_smart_trim_enabled(&self, enabled: bool) {
        self.config.write().expect("engine config lock").smart_trim = enabled;
    }

    pub fn smart_trim_enabled(&self) -> bool {
        self.config.read().expect("engine config lock").smart_trim
    }

    pub fn default_libraries(&self) -> Vec<String> {
        self.config
            .read()
            .expect("engine config lock")
            .default_libraries
            .clone()
    }

    pub fn add_default_library(&self, name: impl Into<String>) {
        self.config
            .write()
            .expect("engine config lock")
            .default_libraries
            .push(name.into());
    }

    pub fn remove_default_library(&self, name: &str) {
        self.config
            .write()
            .expect("engine config lock")
            .default_libraries
            .retain(|lib| lib != name);
    }

    pub fn plugin_paths(&self) -> Vec<PathBuf> {
        self.config
            .read()
            .expect("engine config lock")
            .plugin_paths
            .clone()
    }

    /// New plugin paths are searched before existing ones.
    pub fn add_plugin_path(&self, dir: impl Into<PathBuf>) {
        self.config
            .write()
            .expect("engine config lock")
            .plugin_paths
            .insert(0, dir.into());
    }

    pub fn remove_plugin_path(&self, dir: &Path) {
        self.config
            .write()
            .expect("engine config lock")
            .plugin_paths
            .retain(|path| path != dir);
    }

    pub fn set_plugin_paths(&self, dirs: Vec<PathBuf>) {
        self.config.write().expect("engine config lock").plugin_paths = dirs;
    }

    /// Register a tag library under a name, making it loadable by `{% load %}`
    /// and eligible as a default library.
    pub fn register_library(&self, name: impl Into<String>, library: Arc<dyn TagLibrary>) {
        self.libraries
            .write()
            .expect("engine library lock")
            .insert(name.into(), library);
    }

    /// A library handle by name. Registered libraries are cached handles, so
    /// loading twice returns the same library and is a no-op.
    pub fn load_library(&self, name: &str) -> Result<Arc<dyn TagLibrary>> {
        if let Some(library) = self.libraries.read().expect("engine library lock").get(name) {
            return Ok(Arc::clone(library));
        }

        if let Some(path) = self.find_library_path(name) {
            return Err(TemplateError::new(
                ErrorKind::CompileFunction,
                format!(
                    "library '{name}' found at {} but cannot be loaded dynamically",
                    path.display()
                ),
            ));
        }

        Err(TemplateError::new(
            ErrorKind::TagSyntax,
            format!("tag library '{name}' not found"),
        ))
    }

    /// Search the plugin paths for the library, matching this engine's major
    /// version and the highest supported minor version, descending.
    fn find_library_path(&self, name: &str) -> Option<PathBuf> {
        let plugin_paths = self.plugin_paths();
        for minor in (0..=*VERSION_MINOR).rev() {
            for dir in &plugin_paths {
                let candidate_dir = dir
                    .join("stencil")
                    .join(format!("{}.{minor}", *VERSION_MAJOR));
                let entries = match std::fs::read_dir(&candidate_dir) {
                    Ok(entries) => entries,
                    Err(_) => continue,
                };
                for entry in entries.flatten() {
                    let file_name = entry.file_name();
                    if file_name.to_string_lossy().starts_with(name) {
                        return Some(entry.path());
                    }
                }
            }
        }
        None
    }

    pub fn set_escape_fn(&self, escape: EscapeFn) {
        *self.escape.write().expect("engine escape lock") = escape;
    }

    pub fn escape_fn(&self) -> EscapeFn {
        Arc::clone(&self.escape.read().expect("engine escape lock"))
    }

    /// Compile a template. Parse errors are stored on the returned template
    /// and re-raised when it is rendered.
    pub fn new_template(&self, source: &str, name: &str) -> Template {
        debug!(template = name, "compiling template");
        let engine = self.handle();
        match compile(&engine, source) {
            Ok((nodes, blocks)) => Template {
                name: name.to_string(),
                nodes,
                blocks,
                error: None,
                engine,
            },
            Err(error) => Template {
                name: name.to_string(),
                nodes: NodeList::new(),
                blocks: Vec::new(),
                error: Some(error),
                engine,
            },
        }
    }

    /// Load a template through the ordered loader list. When nothing loads,
    /// the returned template carries a not-found error.
    pub fn load_by_name(&self, name: &str) -> Template {
        let engine = self.handle();
        for loader in self.template_loaders() {
            if !loader.can_load(name) {
                continue;
            }
            if let Some(template) = loader.load(name, &engine) {
                return template;
            }
        }
        debug!(template = name, "template not found in any loader");
        Template {
            name: name.to_string(),
            nodes: NodeList::new(),
            blocks: Vec::new(),
            error: Some(TemplateError::new(
                ErrorKind::TagSyntax,
                format!("template not found: '{name}'"),
            )),
            engine,
        }
    }
}

fn compile(
    engine: &Arc<Engine>,
    source: &str,
) -> Result<(NodeList, Vec<(String, Arc<BlockNode>)>)> {
    let tokens = tokenize(source, engine.smart_trim_enabled())?;
    let mut parser = Parser::new(tokens, engine);
    let nodes = parser.parse(&[])?;
    let blocks = parser.take_blocks();
    Ok((nodes, blocks))
}

/// A compiled template. Immutable after compilation; may be rendered from
/// multiple threads as long as each render brings its own context and
/// stream.
pub struct Template {
    name: String,
    nodes: NodeList,
    blocks: Vec<(String, Arc<BlockNode>)>,
    error: Option<TemplateError>,
    engine: Arc<Engine>,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compile error, if compilation failed.
    pub fn error(&self) -> Option<&TemplateError> {
        self.error.as_ref()
    }

    pub fn nodes(&self) -> &NodeList {
        &self.nodes
    }

    /// The `{% block %}` definitions this template declares.
    pub fn blocks(&self) -> &[(String, Arc<BlockNode>)] {
        &self.blocks
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Render into a fresh string using the engine's escape policy.
    pub fn render(&self, ctx: &mut Context) -> Result<String> {
        let mut stream = OutputStream::with_escape(self.engine.escape_fn());
        self.render_to(&mut stream, ctx)?;
        Ok(stream.into_string())
    }

    /// Render into an existing stream.
    pub fn render_to(&self, stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        ctx.render_context_mut().set_engine(Arc::clone(&self.engine));
        self.nodes.render(stream, ctx)
    }

    /// The mutating render variant: output of non-persistent nodes is folded
    /// into literal text so subsequent renders skip recomputing it.
    pub fn render_mutating(&mut self, ctx: &mut Context) -> Result<String> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let mut stream = OutputStream::with_escape(self.engine.escape_fn());
        ctx.render_context_mut().set_engine(Arc::clone(&self.engine));
        ctx.set_mutating(true);
        let result = self.nodes.render_mutating(&mut stream, ctx);
        ctx.set_mutating(false);
        result?;
        Ok(stream.into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_simple_template() {
        let engine = Engine::new();
        let template = engine.new_template("Hello {{ name }}!", "greeting");
        assert!(template.error().is_none());
        let mut ctx = Context::from_json(json!({"name": "World"}));
        assert_eq!(template.render(&mut ctx).unwrap(), "Hello World!");
    }

    #[test]
    fn test_compile_error_stored_and_reraised() {
        let engine = Engine::new();
        let template = engine.new_template("{% bogus %}", "broken");
        let stored = template.error().unwrap().clone();
        assert_eq!(stored.kind, ErrorKind::InvalidBlockTag);

        let mut ctx = Context::new();
        let raised = template.render(&mut ctx).unwrap_err();
        assert_eq!(raised, stored);
    }

    #[test]
    fn test_load_by_name_without_loaders() {
        let engine = Engine::new();
        let template = engine.load_by_name("anything");
        assert!(template.error().is_some());
    }

    #[test]
    fn test_load_library_unknown_name() {
        let engine = Engine::new();
        let err = engine.load_library("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TagSyntax);
    }

    #[test]
    fn test_load_library_is_cached_by_name() {
        let engine = Engine::new();
        let first = engine.load_library("defaulttags").unwrap();
        let second = engine.load_library("defaulttags").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_find_library_path_version_descent() {
        let dir = tempfile::tempdir().unwrap();
        let versioned = dir
            .path()
            .join("stencil")
            .join(format!("{}.{}", *VERSION_MAJOR, *VERSION_MINOR));
        std::fs::create_dir_all(&versioned).unwrap();
        std::fs::write(versioned.join("exttags.so"), b"").unwrap();

        let engine = Engine::new();
        engine.add_plugin_path(dir.path());
        let err = engine.load_library("exttags").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CompileFunction);
    }

    #[test]
    fn test_smart_trim_toggle() {
        let engine = Engine::new();
        assert!(!engine.smart_trim_enabled());
        engine.set_smart_trim_enabled(true);
        assert!(engine.smart_trim_enabled());

        let template = engine.new_template("a\n  {% if x %}\nb\n  {% endif %}\nc", "t");
        let mut ctx = Context::from_json(json!({"x": true}));
        assert_eq!(template.render(&mut ctx).unwrap(), "a\nb\nc");
    }

    #[test]
    fn test_mutating_render_bakes_variables() {
        let engine = Engine::new();
        let mut template = engine.new_template("a {{ x }} b", "t");
        let before = template.nodes().len();
        assert_eq!(before, 3);

        let mut ctx = Context::from_json(json!({"x": 1}));
        assert_eq!(template.render_mutating(&mut ctx).unwrap(), "a 1 b");
        // Text and variable nodes collapsed into a single literal.
        assert_eq!(template.nodes().len(), 1);

        // A later plain render replays the baked content even with a
        // different context.
        let mut other = Context::from_json(json!({"x": 2}));
        assert_eq!(template.render(&mut other).unwrap(), "a 1 b");
    }

    #[test]
    fn test_custom_library_registration() {
        use crate::filters::Filter;
        use crate::value::Value;
        use std::collections::HashMap;

        struct Shout;
        impl Filter for Shout {
            fn filter(&self, input: &Value, _arg: &Value, _auto_escape: bool) -> Value {
                Value::String(format!("{}!!", input.to_display_string()))
            }
        }

        struct ShoutLibrary;
        impl TagLibrary for ShoutLibrary {
            fn filters(&self) -> HashMap<String, Arc<dyn Filter>> {
                let mut filters: HashMap<String, Arc<dyn Filter>> = HashMap::new();
                filters.insert("shout".to_string(), Arc::new(Shout));
                filters
            }
        }

        let engine = Engine::new();
        engine.register_library("shoutlib", Arc::new(ShoutLibrary));

        let template = engine.new_template("{% load shoutlib %}{{ w|shout }}", "t");
        let mut ctx = Context::from_json(json!({"w": "hey"}));
        assert_eq!(template.render(&mut ctx).unwrap(), "hey!!");
    }
}
