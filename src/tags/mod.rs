// ABOUTME: The built-in tag libraries: default, loader, and i18n tags
// ABOUTME: Each library bundles its node factories for registration by name

pub mod autoescape;
pub mod block;
pub mod comment;
pub mod extends;
pub mod filesize;
pub mod firstof;
pub mod for_tag;
pub mod i18n;
pub mod if_parser;
pub mod if_tag;
pub mod include;
pub mod load;
pub mod now;
pub mod range;
pub mod regroup;

use std::collections::HashMap;
use std::sync::Arc;

use crate::library::TagLibrary;
use crate::node::NodeFactory;

/// Control-flow and utility tags.
pub struct DefaultTagsLibrary;

impl TagLibrary for DefaultTagsLibrary {
    fn node_factories(&self) -> HashMap<String, Arc<dyn NodeFactory>> {
        let mut factories: HashMap<String, Arc<dyn NodeFactory>> = HashMap::new();
        factories.insert("autoescape".to_string(), Arc::new(autoescape::AutoescapeNodeFactory));
        factories.insert("comment".to_string(), Arc::new(comment::CommentNodeFactory));
        factories.insert("firstof".to_string(), Arc::new(firstof::FirstOfNodeFactory));
        factories.insert("for".to_string(), Arc::new(for_tag::ForNodeFactory));
        factories.insert("if".to_string(), Arc::new(if_tag::IfNodeFactory));
        factories.insert("load".to_string(), Arc::new(load::LoadNodeFactory));
        factories.insert("now".to_string(), Arc::new(now::NowNodeFactory));
        factories.insert("range".to_string(), Arc::new(range::RangeNodeFactory));
        factories.insert("regroup".to_string(), Arc::new(regroup::RegroupNodeFactory));
        factories
    }
}

/// Tags that pull in other templates: include, extends, block.
pub struct LoaderTagsLibrary;

impl TagLibrary for LoaderTagsLibrary {
    fn node_factories(&self) -> HashMap<String, Arc<dyn NodeFactory>> {
        let mut factories: HashMap<String, Arc<dyn NodeFactory>> = HashMap::new();
        factories.insert("block".to_string(), Arc::new(block::BlockNodeFactory));
        factories.insert("extends".to_string(), Arc::new(extends::ExtendsNodeFactory));
        factories.insert("include".to_string(), Arc::new(include::IncludeNodeFactory));
        factories
    }
}

/// Localization tags.
pub struct I18nTagsLibrary;

impl TagLibrary for I18nTagsLibrary {
    fn node_factories(&self) -> HashMap<String, Arc<dyn NodeFactory>> {
        let mut factories: HashMap<String, Arc<dyn NodeFactory>> = HashMap::new();
        factories.insert("i18nc".to_string(), Arc::new(i18n::I18ncNodeFactory));
        factories.insert("i18nc_var".to_string(), Arc::new(i18n::I18ncVarNodeFactory));
        factories.insert("i18np".to_string(), Arc::new(i18n::I18npNodeFactory));
        factories.insert("i18np_var".to_string(), Arc::new(i18n::I18npVarNodeFactory));
        factories.insert(
            "l10n_filesize".to_string(),
            Arc::new(filesize::L10nFileSizeNodeFactory),
        );
        factories.insert(
            "l10n_filesize_var".to_string(),
            Arc::new(filesize::L10nFileSizeVarNodeFactory),
        );
        factories
    }
}
