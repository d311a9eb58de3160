// tests/library_tests.rs

mod common;

use among::ast::Among;
use common::{assert_clean, compile, errors, values};

// ---
// eval
// ---

#[test]
fn test_eval_folds_arithmetic() {
    let result =
        compile("use eval\neval(1 + 2 * 3)\neval((1 + 2) * 3)\neval(2 ^ 3 ^ 2)\neval(-4 / 8)");
    assert_clean(&result);
    assert_eq!(values(&result), ["7", "9", "64", "-0.5"]);
}

#[test]
fn test_eval_logic_and_comparison() {
    let result = compile(
        "use eval\neval(1 < 2 && 3 >= 3)\neval(!true || false)\neval(a == a)\neval(6 & 3)",
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["true", "false", "true", "2"]);
}

#[test]
fn test_eval_reports_failures() {
    let result = compile("use eval\neval(1 / 0)\neval(a + 1)\n{after: eval(2)}");
    assert_eq!(
        errors(&result),
        ["Division by zero", "Cannot apply '+' to 'a' and '1'"]
    );
    assert_eq!(values(&result), ["ERROR", "ERROR", "{after:2}"]);
}

// ---
// collection
// ---

#[test]
fn test_collection_access_macros() {
    let result = compile(
        "use collection\n\
         ({a: 1, b: 2}.size)\n\
         ({a: 1, b: 2}.keys)\n\
         (item{}.name)\n\
         ([x, y].get(0))\n\
         ({a: 1}.get(a))",
    );
    assert_clean(&result);
    assert_eq!(values(&result), ["2", "[a,b]", "item", "x", "1"]);
}

#[test]
fn test_collection_updates_return_copies() {
    let result = compile(
        "use collection\n\
         ([1, 2].add(3))\n\
         ([1, 2].concat([3]))\n\
         ({a: 1}.merge({a: 9, b: 2}))\n\
         ([1, 2].set(0, z))\n\
         ({a: 1, b: 2}.remove(a))\n\
         ([1].named(ones))",
    );
    assert_clean(&result);
    assert_eq!(
        values(&result),
        ["[1,2,3]", "[1,2,3]", "{a:1,b:2}", "[z,2]", "{b:2}", "ones[1]"]
    );
}

#[test]
fn test_collection_index_errors() {
    let result = compile("use collection\n([1].get(5))\n([1].get(x))\n([1].getOrDefault(5, none))");
    assert_eq!(errors(&result), ["Index out of range (5, size = 1)", "Expected int"]);
    assert_eq!(values(&result), ["ERROR", "ERROR", "none"]);
}

#[test]
fn test_collection_type_mismatch() {
    let result = compile("use collection\n(word.keys)");
    let errors = errors(&result);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Type of argument 'self' does not match its inferred type."));
}

// ---
// format
// ---

#[test]
fn test_format_operator_and_macro() {
    let result = compile(
        "use format\n\
         (\"{} and {}\" % [a, b])\n\
         format('{name}!', {name: x})\n\
         (\"{0}{0} {missing}\" % solo)",
    );
    assert_clean(&result);
    let rendered: Vec<&Among> = result.root().iter().collect();
    assert_eq!(
        rendered,
        [&Among::value("a and b"), &Among::value("x!"), &Among::value("solosolo {missing}")]
    );
}
