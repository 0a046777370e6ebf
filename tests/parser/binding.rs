//! Integration tests for overload selection and binding

use parley_foundation::{ArgType, ConsoleInvoker, ErrorKind, Value};
use parley_parser::{
    ArgumentBuilder, ArgumentPool, ArgumentSchema, BindRequest, Bound, IntRange, OneOf, ParserRegistry,
    RequiresPermission, ValidationContext, bind, select_overload, split_line,
};

fn schemas(builders: Vec<ArgumentBuilder>) -> Vec<ArgumentSchema> {
    let registry = ParserRegistry::new();
    builders.into_iter().map(|b| b.build(&registry).unwrap()).collect()
}

fn bind_as(
    overloads: &[ArgumentSchema],
    line: &str,
    invoker: &ConsoleInvoker,
    pool: &ArgumentPool,
) -> parley_foundation::Result<Bound> {
    let split = split_line(line);
    let mut args = split.args;
    let command = args.remove(0);
    bind(
        overloads,
        &BindRequest {
            command: &command.text,
            line,
            args: &args,
            invoker,
            split_error: split.error.as_ref(),
        },
        pool,
    )
}

fn bind_line(
    overloads: &[ArgumentSchema],
    line: &str,
    pool: &ArgumentPool,
) -> parley_foundation::Result<Bound> {
    let invoker = ConsoleInvoker::new("op").with_property("home", "spawn");
    bind_as(overloads, line, &invoker, pool)
}

// =============================================================================
// Overload Selection
// =============================================================================

#[test]
fn equal_required_counts_prefer_first_declared() {
    let overloads = schemas(vec![
        ArgumentBuilder::new().with_arg("item", ArgType::String),
        ArgumentBuilder::new()
            .with_arg("item", ArgType::String)
            .with_optional("count", ArgType::Int, 1),
    ]);
    assert_eq!(select_overload(&overloads, 1), Some(0));
    assert_eq!(select_overload(&overloads, 2), Some(1));
    assert_eq!(select_overload(&overloads, 3), None);
}

#[test]
fn more_required_arguments_win() {
    let overloads = schemas(vec![
        ArgumentBuilder::new().with_remainder("text"),
        ArgumentBuilder::new()
            .with_arg("target", ArgType::String)
            .with_remainder("text"),
    ]);
    assert_eq!(select_overload(&overloads, 1), Some(0));
    assert_eq!(select_overload(&overloads, 5), Some(1));
}

#[test]
fn remainder_outranks_trailing_optional() {
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("who", ArgType::String)
            .with_optional("times", ArgType::Int, 1),
        ArgumentBuilder::new()
            .with_arg("who", ArgType::String)
            .with_remainder("message"),
    ]);
    assert_eq!(select_overload(&overloads, 1), Some(0));
    assert_eq!(select_overload(&overloads, 2), Some(1));
}

#[test]
fn no_overload_lists_every_usage() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new().with_arg("item", ArgType::String),
        ArgumentBuilder::new()
            .with_arg("item", ArgType::String)
            .with_arg("count", ArgType::Int),
    ]);
    let err = bind_line(&overloads, "give", &pool).unwrap_err();
    let ErrorKind::NoOverload { provided, usage } = err.kind else {
        panic!("expected no-overload error");
    };
    assert_eq!(provided, 0);
    assert_eq!(usage, "usage: give <item:string>\nusage: give <item:string> <count:int>");
}

// =============================================================================
// Binding
// =============================================================================

#[test]
fn binds_typed_values() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("name", ArgType::String)
            .with_arg("length", ArgType::Int)
            .with_arg("scale", ArgType::Float)
            .with_arg("loud", ArgType::Bool),
    ]);
    let bound = bind_line(&overloads, "duration alpha 30 1.5 yes", &pool).unwrap();
    let args = &bound.arguments;
    assert_eq!(args.string("name"), Some("alpha"));
    assert_eq!(args.int("length"), Some(30));
    assert_eq!(args.float("scale"), Some(1.5));
    assert_eq!(args.bool("loud"), Some(true));
}

#[test]
fn lookups_are_case_insensitive() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![ArgumentBuilder::new().with_arg("Place", ArgType::String)]);
    let bound = bind_line(&overloads, "warp ${home}", &pool).unwrap();
    assert_eq!(bound.arguments.string("place"), Some("spawn"));
    assert_eq!(bound.arguments.string("PLACE"), Some("spawn"));
}

#[test]
fn parser_failure_names_argument_type_and_text() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("name", ArgType::String)
            .with_arg("length", ArgType::Int),
    ]);
    let err = bind_line(&overloads, "duration alpha abc", &pool).unwrap_err();
    let ErrorKind::Bind {
        argument,
        expected,
        raw,
        reason,
    } = err.kind
    else {
        panic!("expected bind error");
    };
    assert_eq!(argument, "length");
    assert_eq!(expected, "int");
    assert_eq!(raw, "abc");
    assert_eq!(reason, "not a valid integer");
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn list_failures_name_the_index() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![ArgumentBuilder::new().with_arg("ids", ArgType::list(ArgType::Int))]);
    let err = bind_line(&overloads, "pick [1,2,x]", &pool).unwrap_err();
    assert!(err.to_string().contains("item 2 (`x`)"), "{err}");
}

#[test]
fn map_keys_must_stay_distinct_after_parsing() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new().with_arg("slots", ArgType::map(ArgType::Int, ArgType::String)),
    ]);
    let err = bind_line(&overloads, "equip {1:sword,01:shield}", &pool).unwrap_err();
    assert!(err.to_string().contains("duplicate key `01`"), "{err}");

    let bound = bind_line(&overloads, "equip {1:sword,2:shield}", &pool).unwrap();
    let map = bound.arguments.map("slots").unwrap();
    assert_eq!(map.get(&Value::Int(2)), Some(&Value::from("shield")));
}

#[test]
fn enum_accepts_names_and_ordinals() {
    let pool = ArgumentPool::default();
    let mode = ArgType::enumeration("mode", ["survival", "creative"]);
    let overloads = schemas(vec![ArgumentBuilder::new().with_arg("mode", mode)]);

    let by_name = bind_line(&overloads, "gamemode CREATIVE", &pool).unwrap();
    assert_eq!(by_name.arguments.enum_variant("mode").map(|v| v.ordinal), Some(1));

    let by_ordinal = bind_line(&overloads, "gamemode 0", &pool).unwrap();
    assert_eq!(by_ordinal.arguments.enum_variant("mode").map(|v| &*v.variant), Some("survival"));

    assert!(bind_line(&overloads, "gamemode 7", &pool).is_err());
}

#[test]
fn optional_type_parses_null() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new().with_arg("limit", ArgType::optional(ArgType::Int)),
    ]);
    let bound = bind_line(&overloads, "list null", &pool).unwrap();
    assert_eq!(bound.arguments.get("limit"), Some(&Value::Nil));
    let bound = bind_line(&overloads, "list 4", &pool).unwrap();
    assert_eq!(bound.arguments.int("limit"), Some(4));
}

#[test]
fn remainder_takes_verbatim_rest() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("who", ArgType::String)
            .with_remainder("message"),
    ]);
    let bound = bind_line(&overloads, "tell bob  hi [there]  {friend}  ", &pool).unwrap();
    assert_eq!(bound.arguments.string("message"), Some("hi [there]  {friend}"));
}

#[test]
fn remainder_tolerates_stray_delimiters() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![ArgumentBuilder::new().with_remainder("text")]);

    let bound = bind_line(&overloads, "say :] hello", &pool).unwrap();
    assert_eq!(bound.arguments.string("text"), Some(":] hello"));

    let bound = bind_line(&overloads, "say hi \"there", &pool).unwrap();
    assert_eq!(bound.arguments.string("text"), Some("hi \"there"));

    let bound = bind_line(&overloads, "say {oops", &pool).unwrap();
    assert_eq!(bound.arguments.string("text"), Some("{oops"));
}

#[test]
fn stray_delimiters_outside_the_remainder_are_rejected() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("who", ArgType::String)
            .with_remainder("message"),
    ]);
    let err = bind_line(&overloads, "tell bo\"b hi", &pool).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Scan { position: 7, .. }), "{err}");

    let err = bind_line(&overloads, "tell bob}", &pool).unwrap_err();
    assert!(err.to_string().contains("unexpected '}'"), "{err}");
}

#[test]
fn failures_record_command_line_and_usage() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("item", ArgType::String)
            .with_optional("count", ArgType::Int, 1),
    ]);
    let err = bind_line(&overloads, "give apple lots", &pool).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Bind { .. }));
    let context = err.context.expect("context attached");
    assert_eq!(context.command.as_deref(), Some("give"));
    assert_eq!(context.input.as_deref(), Some("give apple lots"));
    assert_eq!(context.notes, ["usage: give <item:string> [count:int=1]"]);
    assert!(context.to_string().starts_with("in `give` (input: \"give apple lots\")"));
}

#[test]
fn omitted_optionals_get_defaults_without_validation() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("item", ArgType::String)
            .with_optional("count", ArgType::Int, 0)
            .validated_by(IntRange::new(1, 64)),
    ]);

    let bound = bind_line(&overloads, "give apple", &pool).unwrap();
    assert_eq!(bound.arguments.int("count"), Some(0));

    let err = bind_line(&overloads, "give apple 0", &pool).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Bind { .. }));
}

#[test]
fn omitted_float_default_binds_as_float() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("target", ArgType::String)
            .with_optional("speed", ArgType::Float, 1),
    ]);
    let bound = bind_line(&overloads, "walk north", &pool).unwrap();
    assert_eq!(bound.arguments.get("speed"), Some(&Value::Float(1.0)));
    assert_eq!(bound.arguments.float("speed"), Some(1.0));
}

#[test]
fn validators_short_circuit_in_order() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("color", ArgType::String)
            .validated_by(OneOf::new(["red", "green"]))
            .validated_by(|_: &Value, _: &ValidationContext<'_>| -> Result<(), String> {
                Err("never reached".to_string())
            }),
    ]);
    let err = bind_line(&overloads, "paint blue", &pool).unwrap_err();
    assert!(err.to_string().contains("must be one of: red, green"), "{err}");
}

#[test]
fn permission_validator_sees_the_invoker() {
    let pool = ArgumentPool::default();
    let overloads = schemas(vec![
        ArgumentBuilder::new()
            .with_arg("target", ArgType::String)
            .validated_by(RequiresPermission("admin".to_string())),
    ]);
    let guest = ConsoleInvoker::new("guest").with_permissions(["chat"]);
    let err = bind_as(&overloads, "kick bob", &guest, &pool).unwrap_err();
    assert!(err.to_string().contains("requires permission admin"), "{err}");

    let admin = ConsoleInvoker::new("root");
    assert!(bind_as(&overloads, "kick bob", &admin, &pool).is_ok());
}

#[test]
fn bound_collections_return_to_the_pool() {
    let pool = ArgumentPool::new(4);
    let overloads = schemas(vec![ArgumentBuilder::new().with_arg("x", ArgType::Int)]);
    {
        let first = bind_line(&overloads, "set 1", &pool).unwrap();
        let second = bind_line(&overloads, "set 2", &pool).unwrap();
        assert_eq!(pool.outstanding(), 2);
        assert_ne!(first.arguments, second.arguments);
    }
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(pool.available(), 2);

    let reused = bind_line(&overloads, "set 3", &pool).unwrap();
    assert_eq!(reused.arguments.len(), 1);
    assert_eq!(pool.available(), 1);
}
