// tests/ast_tests.rs

use among::ast::{Among, AmongPrimitive, NodePath};
use among::AmongError;

fn sample() -> Among {
    Among::named_object("config")
        .with_property("name", "among")
        .with_property("tags", Among::list().with("a").with("b"))
        .into()
}

#[test]
fn test_copies_never_alias() {
    let original = sample();
    let mut copy = original.clone();
    assert_eq!(original, copy);

    let tags = copy
        .as_object_mut()
        .and_then(|o| o.get_mut("tags"))
        .and_then(Among::as_list_mut)
        .unwrap();
    tags.push("c");

    assert_ne!(original, copy);
    assert_eq!(original.to_string(), "config{name:among,tags:[a,b]}");
    assert_eq!(copy.to_string(), "config{name:among,tags:[a,b,c]}");
}

#[test]
fn test_equality_ignores_source_position() {
    assert_eq!(Among::value("x").with_source_position(12), Among::value("x"));
}

#[test]
fn test_operation_and_list_differ() {
    let list: Among = Among::list().with("1").into();
    let operation: Among = Among::operation().with("1").into();
    assert_ne!(list, operation);
    assert_eq!(operation.shape_name(), "operation");
    assert!(operation.is_list());
    assert!(operation.is_operation());
}

#[test]
fn test_names_only_on_nameables() {
    let mut primitive = Among::value("p");
    assert!(!primitive.set_name("n"));
    assert_eq!(primitive.name(), None);

    let mut list: Among = Among::list().into();
    assert!(!list.has_name());
    assert!(list.set_name("items"));
    assert_eq!(list.name(), Some("items"));
    assert_eq!(list.shape_name(), "named list");
}

#[test]
fn test_primitive_conversions() {
    assert_eq!(AmongPrimitive::new("1.5").as_f64().unwrap(), 1.5);
    assert_eq!(AmongPrimitive::new("-3").as_i64().unwrap(), -3);
    assert!(AmongPrimitive::new("TRUE").as_bool().unwrap());
    assert!(matches!(
        AmongPrimitive::new("one").as_f64(),
        Err(AmongError::NotANumber { value }) if value == "one"
    ));
    assert!(matches!(AmongPrimitive::new("2.5").as_i64(), Err(AmongError::NotAnInteger { .. })));
    assert!(matches!(AmongPrimitive::new("yes").as_bool(), Err(AmongError::NotABoolean { .. })));
}

#[test]
fn test_expect_shape_reports_what_was_found() {
    let value = Among::value("x");
    let err = value.expect_object().unwrap_err();
    assert!(matches!(err, AmongError::UnexpectedNode { found, .. } if found == "primitive"));
}

#[test]
fn test_node_path_replacement() {
    let mut root = sample();
    let path = NodePath::root().property("tags").index(1);
    path.replace(&mut root, Among::value("z")).unwrap();
    assert_eq!(root.to_string(), "config{name:among,tags:[a,z]}");

    let missing = NodePath::root().property("tags").index(5);
    assert!(matches!(
        missing.replace(&mut root, Among::value("q")),
        Err(AmongError::InvalidPath { path }) if path == ".tags[5]"
    ));
}

#[test]
fn test_display_quotes_when_needed() {
    let value: Among = Among::object()
        .with_property("two words", "a: b")
        .with_property("k", "")
        .into();
    assert_eq!(value.to_string(), r#"{"two words":"a: b",k:""}"#);
}

#[test]
fn test_json_shape() {
    let value: Among = Among::named_operation("+").with("1").with("2").into();
    let json = serde_json::to_value(&value).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "name": "+", "elements": ["1", "2"], "operation": true })
    );

    let json = serde_json::to_value(&sample()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "name": "config",
            "properties": { "name": "among", "tags": { "elements": ["a", "b"] } }
        })
    );
}
