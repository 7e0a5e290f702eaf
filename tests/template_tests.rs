// ABOUTME: End-to-end template rendering tests
// ABOUTME: Covers the language surface: substitution, control flow, escaping

mod common;

use common::{compile, render};
use serde_json::json;
use std::sync::Arc;
use stencil::{Context, Engine, ErrorKind};

#[test]
fn test_variable_substitution() {
    assert_eq!(
        render("Hello {{ name }}!", json!({"name": "World"})),
        "Hello World!"
    );
}

#[test]
fn test_for_loop() {
    assert_eq!(
        render("{% for x in xs %}{{ x }},{% endfor %}", json!({"xs": [1, 2, 3]})),
        "1,2,3,"
    );
}

#[test]
fn test_for_empty_branch() {
    assert_eq!(
        render(
            "{% for x in xs %}{{ x }}{% empty %}none{% endfor %}",
            json!({"xs": []})
        ),
        "none"
    );
}

#[test]
fn test_if_with_boolean_operators() {
    assert_eq!(
        render(
            "{% if a and not b %}Y{% else %}N{% endif %}",
            json!({"a": true, "b": false})
        ),
        "Y"
    );
}

#[test]
fn test_firstof() {
    assert_eq!(
        render("{% firstof a b \"c\" %}", json!({"a": "", "b": 0})),
        "c"
    );
}

#[test]
fn test_autoescape_on() {
    assert_eq!(
        render(
            "{% autoescape on %}{{ s }}{% endautoescape %}",
            json!({"s": "<x>"})
        ),
        "&lt;x&gt;"
    );
}

#[test]
fn test_range_with_binding() {
    assert_eq!(render("{% range 0 3 as i %}[{{ i }}]{% endrange %}", json!({})), "[0][1][2]");
}

#[test]
fn test_round_trip_plain_text() {
    let sources = [
        "plain text with no delimiters",
        "unicode: héllo wörld æøå",
        "almost { a tag % but } not # quite",
        "multi\nline\n\ttext\n",
    ];
    for source in sources {
        assert_eq!(render(source, json!({})), source);
    }
}

#[test]
fn test_missing_variables_render_empty() {
    assert_eq!(render("[{{ ghost }}]", json!({})), "[]");
    assert_eq!(render("[{{ a.b.c }}]", json!({"a": 1})), "[]");
}

#[test]
fn test_strict_mode_raises_on_missing_variable() {
    let template = compile("{{ ghost }}");
    let mut ctx = Context::new();
    ctx.set_strict(true);
    let err = template.render(&mut ctx).unwrap_err();
    assert_eq!(err.kind, ErrorKind::VariableNotInContext);
}

#[test]
fn test_scope_depth_balanced_after_render() {
    let source = "{% for x in xs %}{% for y in x %}{{ y }}{% endfor %}\
{% range 0 2 as i %}{{ i }}{% endrange %}{% endfor %}\
{% if a %}{% autoescape off %}{{ a }}{% endautoescape %}{% endif %}";
    let template = compile(source);
    let mut ctx = Context::from_json(json!({"xs": [[1], [2]], "a": "x"}));
    let depth = ctx.depth();
    template.render(&mut ctx).unwrap();
    assert_eq!(ctx.depth(), depth);
}

#[test]
fn test_scope_depth_balanced_after_render_error() {
    // The inner include fails at render time inside a for body.
    let template = compile("{% for x in xs %}{% include \"ghost\" %}{% endfor %}");
    let mut ctx = Context::from_json(json!({"xs": [1]}));
    let depth = ctx.depth();
    assert!(template.render(&mut ctx).is_err());
    assert_eq!(ctx.depth(), depth);
}

#[test]
fn test_forloop_bookkeeping_invariant() {
    // counter0 + revcounter == len for every iteration.
    let out = render(
        "{% for x in xs %}{{ forloop.counter0 }}+{{ forloop.revcounter }};{% endfor %}",
        json!({"xs": ["a", "b", "c", "d"]}),
    );
    for pair in out.trim_end_matches(';').split(';') {
        let (c0, rev) = pair.split_once('+').unwrap();
        let sum: i64 = c0.parse::<i64>().unwrap() + rev.parse::<i64>().unwrap();
        assert_eq!(sum, 4);
    }
}

#[test]
fn test_forloop_undefined_outside_loop() {
    assert_eq!(
        render("{% for x in xs %}{% endfor %}[{{ forloop.counter }}]", json!({"xs": [1, 2]})),
        "[]"
    );
}

#[test]
fn test_filter_chains() {
    assert_eq!(
        render("{{ name|upper }} has {{ xs|length }} items", json!({"name": "ada", "xs": [1, 2]})),
        "ADA has 2 items"
    );
    assert_eq!(
        render("{{ missing|default:\"fallback\"|capfirst }}", json!({})),
        "Fallback"
    );
    assert_eq!(
        render("{{ xs|join:\", \" }}", json!({"xs": ["a", "b"]})),
        "a, b"
    );
}

#[test]
fn test_escaping_defaults_on() {
    assert_eq!(render("{{ s }}", json!({"s": "<b>&</b>"})), "&lt;b&gt;&amp;&lt;/b&gt;");
}

#[test]
fn test_safe_filter_disables_escaping() {
    assert_eq!(render("{{ s|safe }}", json!({"s": "<b>"})), "<b>");
}

#[test]
fn test_escape_filter_forces_escaping_when_autoescape_off() {
    assert_eq!(
        render(
            "{% autoescape off %}{{ s|escape }}|{{ s }}{% endautoescape %}",
            json!({"s": "<b>"})
        ),
        "&lt;b&gt;|<b>"
    );
}

#[test]
fn test_safe_string_idempotence() {
    // For a safe-marked value, output is identical whether auto-escape is on
    // or off.
    let on = render("{{ s|safe|lower }}", json!({"s": "<B>"}));
    let off = render(
        "{% autoescape off %}{{ s|safe|lower }}{% endautoescape %}",
        json!({"s": "<B>"}),
    );
    assert_eq!(on, off);
    assert_eq!(on, "<b>");
}

#[test]
fn test_comment_tag_and_comment_delimiters() {
    assert_eq!(render("a{# inline #}b", json!({})), "ab");
    assert_eq!(
        render("a{% comment %}anything {{ at }} all{% endcomment %}b", json!({})),
        "ab"
    );
}

#[test]
fn test_i18n_literal_in_expression() {
    assert_eq!(render("{{ _(\"welcome\") }}", json!({})), "welcome");
}

#[test]
fn test_nested_for_if() {
    let source = "{% for row in rows %}{% if row %}{% for c in row %}{{ c }}{% endfor %}|{% endif %}{% endfor %}";
    assert_eq!(render(source, json!({"rows": [[1, 2], [], [3]]})), "12|3|");
}

#[test]
fn test_parse_eof_invariant_reported_as_stored_error() {
    let engine = Engine::new();
    for source in [
        "{% if a %}no end",
        "{% for x in xs %}no end",
        "{% autoescape on %}no end",
        "{% block b %}no end",
    ] {
        let template = engine.new_template(source, "broken");
        let err = template.error().expect("expected stored error");
        assert_eq!(err.kind, ErrorKind::UnclosedBlockTag, "{source}");
    }
}

#[test]
fn test_error_values_surface() {
    let engine = Engine::new();
    let cases = [
        ("{{ }}", ErrorKind::EmptyVariable),
        ("{% unknowntag %}", ErrorKind::InvalidBlockTag),
        ("{{ v|nosuchfilter }}", ErrorKind::UnknownFilter),
        ("{{ v !! }}", ErrorKind::TagSyntax),
    ];
    for (source, kind) in cases {
        let template = engine.new_template(source, "broken");
        assert_eq!(template.error().unwrap().kind, kind, "{source}");
    }
}

#[test]
fn test_output_ordering_is_source_order() {
    let out = render(
        "1{% if a %}2{% endif %}3{% for x in xs %}{{ x }}{% endfor %}4",
        json!({"a": true, "xs": [5, 6]}),
    );
    assert_eq!(out, "123564");
}

#[test]
fn test_template_is_shareable_across_threads() {
    let template = Arc::new(compile("{{ n }}-{% for x in xs %}{{ x }}{% endfor %}"));
    let mut handles = Vec::new();
    for n in 0..4 {
        let template = Arc::clone(&template);
        handles.push(std::thread::spawn(move || {
            let mut ctx = Context::from_json(json!({"n": n, "xs": [1, 2]}));
            template.render(&mut ctx).unwrap()
        }));
    }
    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("{n}-12"));
    }
}
