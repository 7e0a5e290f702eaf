// ABOUTME: The regroup tag: groups an already-sorted list by a common key
// ABOUTME: Inserts a list of {grouper, list} records into the context

use std::collections::HashMap;

use crate::context::Context;
use crate::error::{ErrorKind, Result, TemplateError};
use crate::expression::FilterExpression;
use crate::lexer::Token;
use crate::node::{Node, NodeFactory};
use crate::output::OutputStream;
use crate::parser::Parser;
use crate::value::Value;

pub struct RegroupNode {
    target: FilterExpression,
    key: String,
    var_name: String,
}

impl RegroupNode {
    fn key_of(&self, item: &Value) -> Value {
        let mut current = item.clone();
        for segment in self.key.split('.') {
            match current.get_member(segment) {
                Some(next) => current = next,
                None => return Value::Invalid,
            }
        }
        current
    }
}

impl Node for RegroupNode {
    fn render(&self, _stream: &mut OutputStream, ctx: &mut Context) -> Result<()> {
        let items = self.target.to_list(ctx)?;
        if items.is_empty() {
            ctx.insert(self.var_name.clone(), Value::Map(HashMap::new()));
            return Ok(());
        }

        // The input is expected to be sorted by the key; only adjacent items
        // with an equal key land in the same group.
        let mut groups: Vec<Value> = Vec::new();
        let mut current_key: Option<String> = None;
        for item in items {
            let key = self.key_of(&item).to_display_string();
            if current_key.as_deref() == Some(key.as_str()) {
                if let Some(Value::Map(group)) = groups.last_mut() {
                    if let Some(Value::List(list)) = group.get_mut("list") {
                        list.push(item);
                        continue;
                    }
                }
            }
            let mut group = HashMap::new();
            group.insert("grouper".to_string(), Value::String(key.clone()));
            group.insert("list".to_string(), Value::List(vec![item]));
            groups.push(Value::Map(group));
            current_key = Some(key);
        }

        ctx.insert(self.var_name.clone(), Value::List(groups));
        Ok(())
    }
}

pub struct RegroupNodeFactory;

impl NodeFactory for RegroupNodeFactory {
    fn get_node(&self, token: &Token, parser: &mut Parser<'_>) -> Result<Box<dyn Node>> {
        let expr: Vec<&str> = token.content.split_whitespace().collect();
        if expr.len() != 6 {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "regroup takes five arguments",
            ));
        }
        if expr[2] != "by" {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "second argument to regroup must be 'by'",
            ));
        }
        if expr[4] != "as" {
            return Err(TemplateError::new(
                ErrorKind::TagSyntax,
                "fourth argument to regroup must be 'as'",
            ));
        }

        Ok(Box::new(RegroupNode {
            target: FilterExpression::new(expr[1], parser)?,
            key: expr[3].to_string(),
            var_name: expr[5].to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::engine::Engine;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> String {
        let engine = Engine::new();
        let template = engine.new_template(source, "test");
        if let Some(err) = template.error() {
            panic!("compile error: {err}");
        }
        let mut ctx = Context::from_json(data);
        template.render(&mut ctx).unwrap()
    }

    #[test]
    fn test_groups_adjacent_items() {
        let source = "{% regroup people by city as grouped %}\
{% for g in grouped %}{{ g.grouper }}:{% for p in g.list %}{{ p.name }},{% endfor %};{% endfor %}";
        let data = json!({"people": [
            {"name": "ann", "city": "oslo"},
            {"name": "bob", "city": "oslo"},
            {"name": "cat", "city": "rome"},
        ]});
        assert_eq!(render(source, data), "oslo:ann,bob,;rome:cat,;");
    }

    #[test]
    fn test_unsorted_input_splits_groups() {
        let source = "{% regroup xs by k as g %}{% for e in g %}{{ e.grouper }};{% endfor %}";
        let data = json!({"xs": [{"k": "a"}, {"k": "b"}, {"k": "a"}]});
        assert_eq!(render(source, data), "a;b;a;");
    }

    #[test]
    fn test_empty_input_inserts_empty_mapping() {
        let source = "{% regroup xs by k as g %}[{{ g }}]";
        assert_eq!(render(source, json!({"xs": []})), "[{}]");
    }

    #[test]
    fn test_dotted_key() {
        let source = "{% regroup xs by a.b as g %}{% for e in g %}{{ e.grouper }}{% endfor %}";
        let data = json!({"xs": [{"a": {"b": 1}}, {"a": {"b": 1}}]});
        assert_eq!(render(source, data), "1");
    }

    #[test]
    fn test_wrong_keywords_are_errors() {
        let engine = Engine::new();
        assert!(engine
            .new_template("{% regroup xs of k as g %}", "b1")
            .error()
            .is_some());
        assert!(engine
            .new_template("{% regroup xs by k into g %}", "b2")
            .error()
            .is_some());
    }
}
