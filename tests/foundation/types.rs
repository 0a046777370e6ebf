//! Integration tests for ArgType

use parley_foundation::{ArgType, EnumType, Value};

#[test]
fn keys_are_display_forms() {
    assert_eq!(ArgType::Bool.key(), "bool");
    assert_eq!(ArgType::list(ArgType::Int).key(), "list<int>");
    assert_eq!(ArgType::optional(ArgType::Float).key(), "option<float>");
    assert_eq!(ArgType::enumeration("mode", ["a", "b"]).key(), "mode");
}

#[test]
fn nested_acceptance() {
    let ty = ArgType::map(ArgType::String, ArgType::list(ArgType::Int));
    let good = Value::map_from([(Value::from("hp"), Value::from(vec![1_i64, 2]))]);
    let bad = Value::map_from([(Value::from("hp"), Value::from(vec!["x"]))]);
    assert!(ty.accepts(&good));
    assert!(!ty.accepts(&bad));
}

#[test]
fn enum_types_compare_by_content() {
    assert_eq!(EnumType::new("dir", ["up", "down"]), EnumType::new("dir", ["up", "down"]));
    assert_ne!(EnumType::new("dir", ["up", "down"]), EnumType::new("dir", ["down", "up"]));
}
