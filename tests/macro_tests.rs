// tests/macro_tests.rs

mod common;

use among::ast::Among;
use among::diagnostics::ReportKind;
use among::engine::EngineConfig;
use common::{assert_clean, compile, compile_with_config, errors, messages, values, warnings};

// ---
// Template macros
// ---

#[test]
fn test_constant_macro() {
    let result =
        compile("macro greeting : hello\n{msg: greeting}\n[greeting, 'greeting']\ngreeting");
    assert_clean(&result);
    // Quoted primitives and top level primitives are never expanded.
    assert_eq!(values(&result), ["{msg:hello}", "[hello,greeting]", "greeting"]);
}

#[test]
fn test_list_macro_with_default() {
    let result = compile("macro pair[a, b = 0] : [a, b]\npair[1]\npair[1, 2]");
    assert_clean(&result);
    assert_eq!(values(&result), ["[1,0]", "[1,2]"]);
}

#[test]
fn test_object_macro_binds_by_key() {
    let result = compile("macro point{x, y = 0} : [x, y]\npoint{x: 1}\npoint{y: 2, x: 3}");
    assert_clean(&result);
    assert_eq!(values(&result), ["[1,0]", "[3,2]"]);
}

#[test]
fn test_operation_macro() {
    let result = compile("macro twice(v) : [v, v]\ntwice(a)");
    assert_clean(&result);
    assert_eq!(values(&result), ["[a,a]"]);
}

#[test]
fn test_parameter_renames_collections() {
    let result = compile("macro tag[n] : n{}\ntag[hi]");
    assert_clean(&result);
    assert_eq!(values(&result), ["hi{}"]);
}

#[test]
fn test_rename_requires_primitive_argument() {
    let result = compile("macro tag[n] : n{}\ntag[[x]]");
    let errors = errors(&result);
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].starts_with("Type of argument 'n' does not match its inferred type."),
        "{}",
        errors[0]
    );
    assert_eq!(values(&result), ["ERROR"]);
}

#[test]
fn test_macro_calls_inside_templates_run_on_application() {
    let result = compile("macro pi : 3.14\nmacro circle[r] : area[pi, r]\ncircle[2]");
    assert_clean(&result);
    assert_eq!(values(&result), ["area[3.14,2]"]);
}

#[test]
fn test_function_macros_through_accessor() {
    let result = compile(
        "use default_operators\n\
         fn greet[who] : [self, who]\n\
         fn double : [self, self]\n\
         (me.greet[you])\n\
         (x.double)",
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["[me,you]", "[x,x]"]);
}

#[test]
fn test_operator_macro_intercepts_operations() {
    let result = compile("use default_operators\nmacro +(a, b) : sum[a, b]\n(1 + 2)\n(3 * 4)");
    assert_clean(&result);
    assert_eq!(values(&result), ["sum[1,2]", "*(3,4)"]);
}

// ---
// Binding failures
// ---

#[test]
fn test_wrong_usage_lists_candidates() {
    let result = compile("macro pair[a, b = 0] : [a, b]\npair[]");
    assert_eq!(errors(&result), ["Wrong usage, expected:\n  pair[a, b = /* default */]"]);
    assert_eq!(values(&result), ["ERROR"]);
}

#[test]
fn test_unused_arguments_are_warnings() {
    let result = compile("macro point{x} : [x]\npoint{x: 1, z: 2}\nmacro one[a] : a\none[1, 2]");
    assert!(result.is_success());
    assert_eq!(
        warnings(&result),
        [
            "Unused argument 'z'",
            "Unused parameters: maximum of 1 expected, 2 provided"
        ]
    );
    assert_eq!(values(&result), ["[1]", "1"]);
}

#[test]
fn test_overloads_pick_the_closest_match() {
    let result = compile("macro f[a] : one\nmacro f[a, b, c] : three\nf[x]\nf[x, y, z]");
    assert_clean(&result);
    assert_eq!(values(&result), ["one", "three"]);
}

#[test]
fn test_ambiguous_overloads_are_an_error() {
    let result = compile("macro f[a, b] : x\nmacro f[a, b = 0] : y\nf[1, 2]");
    assert_eq!(messages(&result, ReportKind::Info).len(), 1);
    let errors = errors(&result);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Ambiguous usage of macro f[]:"), "{}", errors[0]);
    assert!(errors[0].contains("\n  f[a, b]\n  f[a, b = /* default */]"), "{}", errors[0]);
    assert_eq!(values(&result), ["ERROR"]);
}

#[test]
fn test_redefinition_overwrites_with_warning() {
    let result = compile("macro pi : 3\nmacro pi : 4\n[pi]");
    assert!(result.is_success());
    let warnings = warnings(&result);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("overwrites 1 preexisting macro(s)"), "{}", warnings[0]);
    assert_eq!(values(&result), ["[4]"]);
}

// ---
// Invalid definitions
// ---

#[test]
fn test_optional_parameters_must_be_trailing() {
    let result = compile("macro m[a = 1, b] : [a, b]");
    assert_eq!(
        errors(&result),
        ["Optional parameters of list macro should be consecutive, \
          placed at end of the parameter list"]
    );
    assert!(result.definition().macros.is_empty());
}

#[test]
fn test_object_macro_defaults_may_be_anywhere() {
    let result = compile("macro m{a = 1, b} : [a, b]\nm{b: 2}");
    assert_clean(&result);
    assert_eq!(values(&result), ["[1,2]"]);
}

#[test]
fn test_duplicate_and_reserved_parameters() {
    assert_eq!(errors(&compile("macro m[a, a] : a")), ["Duplicated parameter 'a'."]);
    assert_eq!(
        errors(&compile("fn m[self] : self")),
        ["Cannot define parameter named 'self' in function macros"]
    );
}

#[test]
fn test_invalid_macro_statement() {
    let result = compile("macro m = 1\nnext");
    assert_eq!(errors(&result), ["Invalid macro statement; expected '{', '[', '(' or ':'"]);
    assert_eq!(values(&result), ["next"]);
}

#[test]
fn test_undef_macro() {
    let result = compile(
        "macro pi : 3.14\n\
         macro pair[a, b] : [a, b]\n\
         undef macro pi\n\
         undef macro pair[]\n\
         [pi]\n\
         pair[1, 2]",
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["[pi]", "pair[1,2]"]);
    assert!(result.definition().macros.is_empty());
}

#[test]
fn test_copied_constants_are_independent() {
    let text = "macro base : {k: v}\n[base, base]";
    let copied = compile(text);
    let config = EngineConfig {
        copy_macro_constant: false,
        ..EngineConfig::default()
    };
    let shared = compile_with_config(text, config);
    assert_clean(&shared);
    assert_eq!(copied.root(), shared.root());

    let list = shared.root().get(0).and_then(Among::as_list).unwrap();
    let mut first = list.get(0).cloned().unwrap();
    first.as_object_mut().unwrap().set("k", "changed");
    assert_eq!(list.get(1).map(ToString::to_string).as_deref(), Some("{k:v}"));
}
