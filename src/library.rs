// ABOUTME: Tag library contract: bundles of node factories and filters
// ABOUTME: Libraries register by name on the engine and merge into the parser

use std::collections::HashMap;
use std::sync::Arc;

use crate::filters::Filter;
use crate::node::NodeFactory;

/// A named bundle of tag factories and filters. Built-in libraries implement
/// this directly; dynamically discovered plugins return the same interface.
///
/// Filters registered here must outlive every filter expression compiled
/// against them, which holds naturally because registries hand out `Arc`s.
pub trait TagLibrary: Send + Sync {
    fn node_factories(&self) -> HashMap<String, Arc<dyn NodeFactory>> {
        HashMap::new()
    }

    fn filters(&self) -> HashMap<String, Arc<dyn Filter>> {
        HashMap::new()
    }
}

impl std::fmt::Debug for dyn TagLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn TagLibrary>")
    }
}
