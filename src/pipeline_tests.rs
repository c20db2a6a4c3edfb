//! End-to-end tests: component text in, module source out.

use crate::analyze::analyze;
use crate::codegen::{build_fragment_code, generate, Instruction};
use crate::compile::{compile, CompileOptions};
use crate::parse::parse;
use oxc_allocator::Allocator;

const COUNTER: &str = "<script>let count = 0; function increment() { count += 1 }</script><button on:click={increment}>{count}</button>";

#[test]
fn test_counter_round_trip() {
    let result = compile(COUNTER, &CompileOptions::default()).unwrap();

    let summary = &result.analysis;
    for name in ["count", "increment"] {
        assert!(summary.declared_variables.iter().any(|v| v == name));
        assert!(summary.will_use_in_template.iter().any(|v| v == name));
    }
    assert!(summary.will_change.iter().any(|v| v == "count"));

    let js = &result.js;
    assert!(js.contains("document.createElement(\"button\")"), "{}", js);
    assert!(js.contains("addEventListener(\"click\", increment)"), "{}", js);
    assert!(js.contains("document.createTextNode(count)"), "{}", js);
    assert!(js.contains("changed.includes(\"count\")"), "{}", js);
    assert!(js.contains("lifecycle.update([\"count\"])"), "{}", js);
    assert!(js.contains("export default function() {"));
}

#[test]
fn test_generate_is_idempotent() {
    let allocator = Allocator::default();
    let ast = parse(&allocator, COUNTER).unwrap();
    let analysis = analyze(&ast).unwrap();
    let options = CompileOptions::default();

    let first = generate(&allocator, &ast, &analysis, &options).unwrap();
    let second = generate(&allocator, &ast, &analysis, &options).unwrap();
    assert_eq!(first, second);

    let again = compile(COUNTER, &options).unwrap();
    assert_eq!(first, again.js);
}

#[test]
fn test_update_iff_will_change() {
    // `shown` changes, `fixed` never does, `total` changes but only via a shadowed name.
    let source = "<script>\
        let shown = 0; let fixed = 1; let total = 2;\
        function bump() { shown += 1 }\
        function shadow(total) { total; total++ }\
        </script><p>{shown}{fixed}{total}</p>";
    let allocator = Allocator::default();
    let ast = parse(&allocator, source).unwrap();
    let analysis = analyze(&ast).unwrap();
    let code = build_fragment_code(&ast, &analysis, &CompileOptions::default()).unwrap();

    let guards: Vec<&str> = code.update.iter().map(|(g, _)| g.as_str()).collect();
    assert_eq!(guards, vec!["shown"]);
    assert!(analysis.will_change.contains("shown"));
    assert!(!analysis.will_change.contains("fixed"));
    assert!(!analysis.will_change.contains("total"));
}

#[test]
fn test_instrumented_iff_changed_and_used() {
    let source = "<script>\
        let seen = 0; let unseen = 0;\
        function a() { seen = 1 }\
        function b() { unseen = 1 }\
        </script><p>{seen}</p>";
    let result = compile(source, &CompileOptions::default()).unwrap();

    assert!(result.js.contains("lifecycle.update([\"seen\"])"));
    assert!(!result.js.contains("lifecycle.update([\"unseen\"])"));
    assert_eq!(result.analysis.will_change, vec!["seen", "unseen"]);
}

#[test]
fn test_changed_but_unused_gets_no_update_and_no_hook() {
    let source = "<script>let n = 0; function f() { n = 1 }</script><p>static</p>";
    let result = compile(source, &CompileOptions::default()).unwrap();
    assert!(!result.js.contains("changed.includes"));
    assert!(!result.js.contains("lifecycle.update(["));
}

#[test]
fn test_nested_markup_instruction_order() {
    let allocator = Allocator::default();
    let ast = parse(&allocator, "<ul><li>a</li><li>b</li></ul>").unwrap();
    let analysis = analyze(&ast).unwrap();
    let code = build_fragment_code(&ast, &analysis, &CompileOptions::default()).unwrap();

    assert_eq!(code.variables, vec!["ul_1", "li_2", "txt_3", "li_4", "txt_5"]);
    assert_eq!(
        code.create.last(),
        Some(&Instruction::Append {
            parent: "target".into(),
            child: "ul_1".into()
        })
    );
    assert_eq!(
        code.destroy,
        vec![
            Instruction::Remove {
                parent: "ul_1".into(),
                child: "li_2".into()
            },
            Instruction::Remove {
                parent: "ul_1".into(),
                child: "li_4".into()
            },
            Instruction::Detach {
                child: "ul_1".into()
            },
        ]
    );
}

#[test]
fn test_imports_are_hoisted_above_factory() {
    let source = "<script>import { format } from './format.js';\nlet n = 0;\nfunction f() { n = 1 }</script><p>{n}</p>";
    let result = compile(source, &CompileOptions::default()).unwrap();
    let import_at = result.js.find("import { format }").unwrap();
    let factory_at = result.js.find("export default function").unwrap();
    assert!(import_at < factory_at);
    assert_eq!(result.js.matches("import { format }").count(), 1);
}

#[test]
fn test_custom_options_flow_through() {
    let options = CompileOptions {
        event_prefix: "@".to_string(),
        hook_object: "component".to_string(),
        root_target: "host".to_string(),
    };
    let source = "<script>let n = 0; function f() { n = 1 }</script><button @click={f}>{n}</button>";
    let js = compile(source, &options).unwrap().js;

    assert!(js.contains("create(host) {"));
    assert!(js.contains("host.appendChild(button_1);"));
    assert!(js.contains("button_1.addEventListener(\"click\", f);"));
    assert!(js.contains("component.update([\"n\"])"));
    assert!(js.contains("const component = {"));
    assert!(js.contains("return component;"));
}

#[test]
fn test_literal_attribute_is_not_an_expression() {
    let allocator = Allocator::default();
    let ast = parse(&allocator, r#"<p title={"literal"}>x</p>"#).unwrap();
    let analysis = analyze(&ast).unwrap();
    assert!(analysis.will_use_in_template.is_empty());

    let json: serde_json::Value = serde_json::from_str(&ast.to_json().unwrap()).unwrap();
    let value = &json["html"][0]["attributes"][0]["value"];
    assert_eq!(value["kind"], "literal");
    assert_eq!(value["value"], "literal");
}

#[test]
fn test_exported_script_bindings_stay_inside_the_factory() {
    let source = "<script>export let name = 'world'; export function rename() { name = 'you' }</script><p>{name}</p>";
    let js = compile(source, &CompileOptions::default()).unwrap().js;

    assert_eq!(js.matches("export").count(), 1, "{}", js);
    assert!(js.starts_with("export default function() {"));
    assert!(js.contains("  let name = \"world\";"), "{}", js);
    assert!(js.contains("lifecycle.update([\"name\"])"), "{}", js);
}

#[test]
fn test_bare_export_list_is_rejected() {
    let source = "<script>let name = 'world'; export { name };</script><p>{name}</p>";
    let err = compile(source, &CompileOptions::default()).unwrap_err();
    assert!(err.is(crate::error::UNSUPPORTED_EXPORT));
}
