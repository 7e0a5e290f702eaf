// ABOUTME: Template loader contract with filesystem and in-memory backends
// ABOUTME: Loaders are consulted in registration order; first match wins

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::engine::{Engine, Template};

/// Materializes template source by name.
pub trait TemplateLoader: Send + Sync {
    fn can_load(&self, name: &str) -> bool;

    fn load(&self, name: &str, engine: &Arc<Engine>) -> Option<Template>;

    /// Resolve a media file reference to `(directory, relative path)`.
    fn media_uri(&self, _name: &str) -> Option<(PathBuf, String)> {
        None
    }
}

/// Loads templates from an ordered list of directories.
pub struct FileSystemLoader {
    dirs: Vec<PathBuf>,
}

impl FileSystemLoader {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn add_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    /// Directory traversal in template names is refused.
    fn is_safe_name(name: &str) -> bool {
        !name.is_empty() && !Path::new(name).components().any(|c| {
            matches!(
                c,
                std::path::Component::ParentDir | std::path::Component::RootDir
            )
        })
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        if !Self::is_safe_name(name) {
            return None;
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }
}

impl TemplateLoader for FileSystemLoader {
    fn can_load(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn load(&self, name: &str, engine: &Arc<Engine>) -> Option<Template> {
        let path = self.find(name)?;
        match std::fs::read_to_string(&path) {
            Ok(source) => Some(engine.new_template(&source, name)),
            Err(err) => {
                warn!(template = name, path = %path.display(), error = %err, "failed to read template");
                None
            }
        }
    }

    fn media_uri(&self, name: &str) -> Option<(PathBuf, String)> {
        if !Self::is_safe_name(name) {
            return None;
        }
        self.dirs
            .iter()
            .find(|dir| dir.join(name).is_file())
            .map(|dir| (dir.clone(), name.to_string()))
    }
}

/// Holds template sources in memory, keyed by name.
#[derive(Default)]
pub struct InMemoryLoader {
    templates: HashMap<String, String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }
}

impl TemplateLoader for InMemoryLoader {
    fn can_load(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    fn load(&self, name: &str, engine: &Arc<Engine>) -> Option<Template> {
        self.templates
            .get(name)
            .map(|source| engine.new_template(source, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_in_memory_loader() {
        let mut loader = InMemoryLoader::new();
        loader.insert("greeting", "Hello {{ name }}!");
        let engine = Engine::new();
        engine.add_template_loader(Arc::new(loader));

        let template = engine.load_by_name("greeting");
        assert!(template.error().is_none());
        let mut ctx = Context::from_json(json!({"name": "World"}));
        assert_eq!(template.render(&mut ctx).unwrap(), "Hello World!");
    }

    #[test]
    fn test_filesystem_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "fs {{{{ x }}}}").unwrap();

        let loader = FileSystemLoader::new(vec![dir.path().to_path_buf()]);
        assert!(loader.can_load("page.html"));
        assert!(!loader.can_load("missing.html"));

        let engine = Engine::new();
        engine.add_template_loader(Arc::new(loader));

        let template = engine.load_by_name("page.html");
        let mut ctx = Context::from_json(json!({"x": 7}));
        assert_eq!(template.render(&mut ctx).unwrap(), "fs 7");
    }

    #[test]
    fn test_filesystem_loader_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inner.html"), "x").unwrap();
        let nested = dir.path().join("templates");
        std::fs::create_dir(&nested).unwrap();

        let loader = FileSystemLoader::new(vec![nested]);
        assert!(!loader.can_load("../inner.html"));
    }

    #[test]
    fn test_media_uri_walks_dirs_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("logo.png"), b"png").unwrap();

        let loader = FileSystemLoader::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let (dir, rel) = loader.media_uri("logo.png").unwrap();
        assert_eq!(dir, second.path());
        assert_eq!(rel, "logo.png");
    }

    #[test]
    fn test_loader_order_first_match_wins() {
        let mut first = InMemoryLoader::new();
        first.insert("t", "first");
        let mut second = InMemoryLoader::new();
        second.insert("t", "second");

        let engine = Engine::new();
        engine.add_template_loader(Arc::new(first));
        engine.add_template_loader(Arc::new(second));

        let mut ctx = Context::new();
        assert_eq!(engine.load_by_name("t").render(&mut ctx).unwrap(), "first");
    }
}
