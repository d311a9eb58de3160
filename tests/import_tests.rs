// tests/import_tests.rs

mod common;

use among::diagnostics::Silent;
use among::syntax::Source;
use common::{
    assert_clean, compile, compile_with_modules, engine_with_modules, errors, values, warnings,
};

#[test]
fn test_use_imports_macros_and_operators() {
    let result = compile_with_modules(
        "use shapes\npoint{x: 1, y: 2}\n(~a)",
        &[("shapes", "macro point{x, y} : [x, y]\noperator ~ as prefix")],
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["[1,2]", "~(a)"]);
    // Plain imports are not re-exported.
    assert!(result.definition().macros.is_empty());
    assert!(result.definition().operators.is_empty());
}

#[test]
fn test_use_public_re_exports() {
    let modules = [
        ("base", "macro pi : 3.14"),
        ("public_mid", "use public base"),
        ("private_mid", "use base"),
    ];
    let result = compile_with_modules("use public_mid\n[pi]", &modules);
    assert_clean(&result);
    assert_eq!(values(&result), ["[3.14]"]);

    let result = compile_with_modules("use private_mid\n[pi]", &modules);
    assert_clean(&result);
    assert_eq!(values(&result), ["[pi]"]);
}

#[test]
fn test_imported_values_are_not_merged() {
    let result = compile_with_modules("use data\nmine", &[("data", "theirs\nmacro m : x")]);
    assert_clean(&result);
    assert_eq!(values(&result), ["mine"]);
}

#[test]
fn test_missing_path_is_reported_at_the_statement() {
    let result = compile("a\nuse nowhere");
    assert_eq!(
        errors(&result),
        ["Cannot resolve definitions from path 'nowhere': No script corresponding to path"]
    );
    assert_eq!(result.reports().reports()[0].source_position, Some(2));
}

#[test]
fn test_failed_import_is_reported_once_per_session() {
    let result = compile("use nowhere\nuse nowhere\nafter");
    assert_eq!(errors(&result).len(), 1);
    assert_eq!(values(&result), ["after"]);
}

#[test]
fn test_error_in_imported_script() {
    let result = compile_with_modules("use broken\n[ok]", &[("broken", "[unterminated")]);
    assert_eq!(
        errors(&result),
        ["Cannot resolve definitions from path 'broken': Error in script"]
    );
    assert_eq!(values(&result), ["[ok]"]);
}

#[test]
fn test_self_reference() {
    let engine = engine_with_modules(&[("me", "use me")]);
    let mut session = engine.session();
    assert!(!session.get_or_read_from("me", &mut Silent).is_success());
    let compiled = session
        .get_or_read_from("me", &mut Silent)
        .compile_result()
        .unwrap();
    assert_eq!(
        errors(compiled),
        ["Cannot resolve definitions from path 'me': Self-reference"]
    );
}

#[test]
fn test_circular_reference_trace() {
    let engine = engine_with_modules(&[("a", "use b"), ("b", "use c"), ("c", "use a")]);
    let mut session = engine.session();
    assert!(!session.get_or_read_from("a", &mut Silent).is_success());

    // The cycle closes while `c` is compiled; the scripts above it fail in turn.
    let c = session.get_or_read_from("c", &mut Silent).compile_result().unwrap();
    assert_eq!(
        errors(c),
        ["Cannot resolve definitions from path 'a': Circular reference detected\n  \
          'a' references 'b'\n  \
          'b' references 'c'\n  \
          and 'c' references 'a'"]
    );
    let b = session.get_or_read_from("b", &mut Silent).compile_result().unwrap();
    assert_eq!(errors(b), ["Cannot resolve definitions from path 'c': Error in script"]);
}

#[test]
fn test_session_shares_imports_between_compilations() {
    let engine = engine_with_modules(&[("lib", "macro v : 1")]);
    let mut session = engine.session();
    let first = session.read(Source::of("use lib\n[v]"));
    let second = session.read(Source::of("use lib\n[v, v]"));
    assert_eq!(values(&first), ["[1]"]);
    assert_eq!(values(&second), ["[1,1]"]);
    assert!(session.get_or_read_from("lib", &mut Silent).is_success());
}

#[test]
fn test_undef_use_removes_imported_definitions() {
    let result = compile_with_modules(
        "use ops\nundef use ops\n[pi]\n(~x)",
        &[("ops", "operator ~ as prefix\nmacro pi : 3")],
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["[pi]", "~x"]);
}

#[test]
fn test_conflicting_imported_operator_is_a_warning() {
    let result = compile_with_modules(
        "operator ! as postfix\nuse ops\n(a !)",
        &[("ops", "operator ! as binary")],
    );
    assert!(result.is_success());
    let warnings = warnings(&result);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Cannot import operator definition"), "{}", warnings[0]);
    assert_eq!(values(&result), ["!(a)"]);
}

#[test]
fn test_default_library_paths() {
    let paths = [
        "default_operator",
        "default_operators",
        "eval",
        "collection",
        "collections",
        "format",
    ];
    for path in paths {
        let result = compile(&format!("use {path}"));
        assert_clean(&result);
    }
}
