// ABOUTME: Shared helpers for integration tests
// ABOUTME: Builds engines with in-memory templates and renders against JSON data

#![allow(dead_code)]

use std::sync::Arc;

use stencil::{Context, Engine, InMemoryLoader, Template};

/// An engine backed by an in-memory loader holding the given templates.
pub fn engine_with(templates: &[(&str, &str)]) -> Arc<Engine> {
    let mut loader = InMemoryLoader::new();
    for (name, source) in templates {
        loader.insert(*name, *source);
    }
    let engine = Engine::new();
    engine.add_template_loader(Arc::new(loader));
    engine
}

pub fn compile(source: &str) -> Template {
    let engine = Engine::new();
    let template = engine.new_template(source, "test");
    if let Some(err) = template.error() {
        panic!("compile error in {source:?}: {err}");
    }
    template
}

/// Compile and render a standalone template against JSON context data.
pub fn render(source: &str, data: serde_json::Value) -> String {
    let template = compile(source);
    let mut ctx = Context::from_json(data);
    template
        .render(&mut ctx)
        .unwrap_or_else(|err| panic!("render error in {source:?}: {err}"))
}
