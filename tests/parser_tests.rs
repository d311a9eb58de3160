// tests/parser_tests.rs

mod common;

use among::ast::Among;
use among::diagnostics::ReportHandler;
use among::engine::{AmongEngine, EngineConfig};
use among::macros::{MacroBuilder, MacroKind};
use among::syntax::Source;
use among::{AmongDefinition, AmongError};
use common::{assert_clean, compile, compile_with_config, errors, values, warnings};

// ---
// Values
// ---

#[test]
fn test_values_objects_and_lists() {
    let result = compile("hello world\n{name: among, tags: [a, b]}\nlist[1, 2]\nop(x)");
    assert_clean(&result);
    assert_eq!(
        values(&result),
        ["\"hello world\"", "{name:among,tags:[a,b]}", "list[1,2]", "op(x)"]
    );
}

#[test]
fn test_values_may_contain_colons_and_keys_brackets() {
    let result = compile("{time: 12:30, f(x): y}");
    assert_clean(&result);
    let object = result.root().get(0).and_then(Among::as_object).unwrap();
    assert_eq!(object.get("time"), Some(&Among::value("12:30")));
    assert_eq!(object.get("f(x)"), Some(&Among::value("y")));
}

#[test]
fn test_comments_are_ignored() {
    let result = compile("a // first\n/* between */ b\n[c, /* inline */ d]");
    assert_clean(&result);
    assert_eq!(values(&result), ["a", "b", "[c,d]"]);
}

#[test]
fn test_multiline_quoted_primitive() {
    let result = compile("{text: 'line one\n      |line two'}");
    assert_clean(&result);
    let object = result.root().get(0).and_then(Among::as_object).unwrap();
    assert_eq!(object.get("text"), Some(&Among::value("line one\nline two")));
}

#[test]
fn test_line_breaks_separate_elements() {
    let result = compile("[\n  a\n  b\n]\n{\n  k: v\n  l: w\n}");
    assert_clean(&result);
    assert_eq!(values(&result), ["[a,b]", "{k:v,l:w}"]);
}

#[test]
fn test_source_positions_are_code_point_indices() {
    let result = compile("é, [x]");
    let list = result.root().get(1).unwrap();
    assert_eq!(list.source_position(), Some(3));
}

// ---
// Operations
// ---

#[test]
fn test_precedence() {
    let result = compile("use default_operators\n(1 + 2 * 3)\n(1 * 2 + 3)\n((1 + 2) * 3)");
    assert_clean(&result);
    assert_eq!(values(&result), ["+(1,*(2,3))", "+(*(1,2),3)", "*(+(1,2),3)"]);
}

#[test]
fn test_associativity() {
    let result = compile(
        "operator ^ as binary right-associative (8)\n\
         operator - as binary (6)\n\
         (2 ^ 3 ^ 2)\n\
         (5 - 3 - 1)",
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["^(2,^(3,2))", "-(-(5,3),1)"]);
}

#[test]
fn test_default_operator_associativity() {
    let result = compile("use default_operators\n(2 ^ 3 ^ 2)\n(a = b = c)");
    assert_clean(&result);
    assert_eq!(values(&result), ["^(^(2,3),2)", "=(a,=(b,c))"]);
}

#[test]
fn test_prefix_and_binary_share_a_spelling() {
    let result = compile("use default_operators\n(-a - -b)\n(!!x)");
    assert_clean(&result);
    assert_eq!(values(&result), ["-(-(a),-(b))", "!(!(x))"]);
}

#[test]
fn test_operation_terms() {
    let result = compile("use default_operators\n(1.5 + 2e-3, x)");
    assert_clean(&result);
    assert_eq!(values(&result), ["(+(1.5,2e-3),x)"]);
}

#[test]
fn test_accessor_desugars_into_calls() {
    let result = compile("use default_operators\n(a.b)\n(a.f[x])\n(a.g{k: v})");
    assert_clean(&result);
    assert_eq!(values(&result), ["b[a]", "f[a,[x]]", "g[a,{k:v}]"]);
}

#[test]
fn test_operator_statements() {
    let result = compile(
        "operator ~ as prefix\n\
         operator ++ as postfix\n\
         operator ?? as binary right-associative (2) : coalesce\n\
         (~x)\n\
         (y++)\n\
         (a ?? b ?? c)",
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["~(x)", "++(y)", "coalesce(a,coalesce(b,c))"]);
    assert_eq!(result.definition().operators.all_operators().count(), 3);
}

#[test]
fn test_keyword_statement() {
    let result = compile("keyword and as binary\n(a and b)\n(android)");
    assert_clean(&result);
    assert_eq!(values(&result), ["and(a,b)", "android"]);
}

#[test]
fn test_invalid_operator_statements() {
    let cases = [
        (
            "operator ~ as prefix left-associative",
            "Prefix and postfix operators cannot have additional properties",
        ),
        ("operator ~ as binary prefix", "Operator type defined twice: 'binary' and 'prefix'"),
        (
            "operator ~ as left-associative",
            "Missing operator type; needs either 'binary', 'prefix' or 'postfix'",
        ),
        (
            "operator ~ as binary accessor right-associative",
            "Cannot be 'right-associative' and 'accessor' at the same time",
        ),
        ("operator ~ as binary (high)", "Number expected"),
    ];
    for (text, expected) in cases {
        let result = compile(text);
        assert_eq!(errors(&result).first().map(String::as_str), Some(expected), "{text}");
        assert!(result.definition().operators.is_empty(), "{text}");
    }
}

#[test]
fn test_conflicting_operator_is_an_error_unless_allowed() {
    let text = "operator ! as binary\noperator ! as postfix";
    let result = compile(text);
    assert_eq!(errors(&result).len(), 1);
    assert!(errors(&result)[0].contains("cannot be both binary and postfix"));

    let config = EngineConfig {
        allow_invalid_operator_registration: true,
        ..EngineConfig::default()
    };
    let result = compile_with_config(&format!("{text}\n(a !)"), config);
    assert!(result.is_success());
    assert_eq!(warnings(&result).len(), 1);
    // The later definition replaced the binary one.
    assert_eq!(values(&result), ["!(a)"]);
}

#[test]
fn test_undef_operator() {
    let result = compile("use default_operators\nundef operator +\n(a, +, b)\n(a * b)");
    assert_clean(&result);
    assert_eq!(values(&result), ["(a,+,b)", "*(a,b)"]);
}

// ---
// Errors and recovery
// ---

#[test]
fn test_missing_value_recovers() {
    let result = compile("{a: , b: \"ok\"}");
    assert_eq!(errors(&result), ["Expected value"]);
    let object = result.root().get(0).and_then(Among::as_object).unwrap();
    assert_eq!(object.get("b"), Some(&Among::value("ok")));
}

#[test]
fn test_duplicate_property() {
    let result = compile("{a: 1, a: 2}");
    assert_eq!(errors(&result), ["Property 'a' is already defined"]);
    assert_eq!(values(&result), ["{a:1}"]);
    assert_eq!(result.reports().reports()[0].source_position, Some(7));

    let config = EngineConfig {
        allow_duplicate_object_property: true,
        ..EngineConfig::default()
    };
    let result = compile_with_config("{a: 1, a: 2}", config);
    assert!(result.is_success());
    assert_eq!(warnings(&result), ["Property 'a' is already defined"]);
}

#[test]
fn test_unterminated_collections() {
    assert_eq!(errors(&compile("[1, 2")), ["Unterminated list"]);
    assert_eq!(errors(&compile("{a: 1")), ["Unterminated object"]);
    assert_eq!(errors(&compile("(a")), ["Unterminated operation"]);
}

#[test]
fn test_redundant_comma() {
    let result = compile("[a,, b]");
    assert_eq!(errors(&result), ["Redundant comma"]);
    assert_eq!(values(&result), ["[a,b]"]);
}

#[test]
fn test_spaces_stay_inside_values() {
    let result = compile("{a: 1 b}");
    assert_clean(&result);
    assert_eq!(values(&result), ["{a:\"1 b\"}"]);
}

#[test]
fn test_recovery_resumes_at_next_statement() {
    let result = compile("{a: [1] b: 2}\nnext");
    assert_eq!(
        errors(&result),
        ["Each object property should be separated with either line breaks or ','"]
    );
    assert_eq!(values(&result), ["{a:[1]}", "next"]);
}

#[test]
fn test_unterminated_quote_and_comment_do_not_abort() {
    let result = compile("'open");
    assert_eq!(errors(&result), ["Unterminated primitive"]);
    assert_eq!(values(&result), ["open"]);

    let result = compile("a /* never closed");
    assert_eq!(errors(&result), ["Unterminated block comment"]);
    assert_eq!(values(&result), ["a"]);
}

#[test]
fn test_invalid_unicode_escape_falls_back_to_raw_text() {
    let result = compile(r"\uZZZZ");
    assert_eq!(errors(&result).len(), 1);
    assert_eq!(values(&result), ["uZZZZ"]);
    assert_eq!(result.reports().reports()[0].source_position, Some(0));
}

#[test]
fn test_rendered_report_points_at_position() {
    let result = compile("{a: 1, a: 2}");
    let rendered = result.reports().reports()[0].render(result.source());
    assert!(rendered.starts_with("[1:8] Property 'a' is already defined"), "{rendered}");
    assert!(rendered.contains("/* HERE >>> */a: 2"), "{rendered}");
}

// ---
// Faults in native macros
// ---

fn failing(_: &[Among], _: bool, _: &mut dyn ReportHandler) -> among::Result<Option<Among>> {
    Err(AmongError::MacroFault {
        name: "boom".to_string(),
        reason: "always fails".to_string(),
    })
}

fn panicking(_: &[Among], _: bool, _: &mut dyn ReportHandler) -> among::Result<Option<Among>> {
    panic!("native macro panicked")
}

fn definition_with(name: &str, function: among::macros::NativeMacroFn) -> AmongDefinition {
    let mut definition = AmongDefinition::new();
    let m = MacroBuilder::new(name, MacroKind::Const).build_native(function).unwrap();
    definition.macros.add(m, &mut among::diagnostics::Silent);
    definition
}

#[test]
fn test_macro_fault_is_reported_and_compilation_continues() {
    let engine = AmongEngine::new();
    let result = engine.read_with(Source::of("[boom]\nafter"), definition_with("boom", failing));
    assert_eq!(errors(&result), ["Unexpected error on macro processing"]);
    assert_eq!(values(&result), ["[ERROR]", "after"]);
    assert_eq!(result.reports().reports()[0].hints, ["macro 'boom' failed: always fails"]);
}

#[test]
fn test_panicking_macro_does_not_stop_compilation() {
    let engine = AmongEngine::new();
    let result = engine.read_with(
        Source::of("before\n[bang]\nafter\n{k: v}"),
        definition_with("bang", panicking),
    );
    assert_eq!(errors(&result), ["Unexpected error on macro processing"]);
    assert_eq!(values(&result), ["before", "[ERROR]", "after", "{k:v}"]);
    assert_eq!(
        result.reports().reports()[0].hints,
        ["macro 'bang' failed: native macro panicked"]
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let text = "use default_operators\n{a: (1 + 2), a: 3}\n[x,, y]\n(1 +)";
    let first = compile(text);
    let second = compile(text);
    assert_eq!(first.root(), second.root());
    assert_eq!(first.reports(), second.reports());
}
