//! End-to-end dispatch scenarios

use std::sync::{Arc, Mutex};

use parley_foundation::{ArgType, ConsoleInvoker, Invoker, Value};
use parley_parser::{ArgumentBuilder, CollectionSize, IntRange, OneOf};
use parley_runtime::{CommandContext, CommandDefinition, CommandEngine, Dispatch, EngineConfig, Execution, Response, Step};

type Captured = Arc<Mutex<Vec<(String, Value)>>>;

/// A handler that records every bound argument and answers `ok`.
fn capture(into: &Captured) -> Execution {
    let into = Arc::clone(into);
    Execution::sync(move |ctx| {
        let bound = ctx
            .arguments()
            .iter()
            .map(|(name, arg)| (name.to_owned(), arg.value.clone()))
            .collect();
        *into.lock().unwrap() = bound;
        ctx.respond_ok("ok")?;
        Ok(())
    })
}

fn engine() -> CommandEngine {
    CommandEngine::new(EngineConfig::default().with_worker_threads(1)).unwrap()
}

fn player() -> Arc<dyn Invoker> {
    Arc::new(
        ConsoleInvoker::new("ada")
            .with_permissions(["chat"])
            .with_property("home", "harbor"),
    )
}

fn strings(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::from(*s)).collect())
}

#[test]
fn scalar_arguments_bind_by_position() {
    let captured = Captured::default();
    let mut engine = engine();
    engine
        .register(
            CommandDefinition::new("duration", capture(&captured)).overload(
                ArgumentBuilder::new()
                    .with_arg("name", ArgType::String)
                    .with_arg("length", ArgType::Int),
            ),
        )
        .unwrap();

    let dispatch = engine.execute("duration alpha 30", player());
    assert_eq!(dispatch, Dispatch::Completed(Response::ok("ok")));
    assert_eq!(
        *captured.lock().unwrap(),
        [
            ("name".to_owned(), Value::from("alpha")),
            ("length".to_owned(), Value::Int(30)),
        ]
    );
}

#[test]
fn bracketed_list_binds_as_one_argument() {
    let captured = Captured::default();
    let mut engine = engine();
    engine
        .register(
            CommandDefinition::new("tag", capture(&captured)).overload(
                ArgumentBuilder::new()
                    .with_arg("list", ArgType::list(ArgType::String))
                    .validated_by(CollectionSize::non_empty()),
            ),
        )
        .unwrap();

    assert!(engine.execute("tag [red,green,blue]", player()).response().is_some_and(Response::is_ok));
    assert_eq!(
        *captured.lock().unwrap(),
        [("list".to_owned(), strings(&["red", "green", "blue"]))]
    );

    let empty = engine.execute("tag []", player());
    assert!(empty.response().is_some_and(|r| r.message.contains("<list: list<string>>")));
}

#[test]
fn unterminated_list_is_a_scan_error() {
    let captured = Captured::default();
    let mut engine = engine();
    engine
        .register(
            CommandDefinition::new("tag", capture(&captured))
                .overload(ArgumentBuilder::new().with_arg("list", ArgType::list(ArgType::String))),
        )
        .unwrap();

    let Dispatch::Completed(response) = engine.execute("tag [red,green", player()) else {
        panic!("scan errors complete immediately");
    };
    assert!(response.is_fail());
    assert!(response.message.starts_with("scan error at 4: unterminated '['"), "{}", response.message);
    assert!(captured.lock().unwrap().is_empty());
}

#[test]
fn stepped_command_reports_through_tick() {
    let mut engine = engine();
    engine
        .register(
            CommandDefinition::new(
                "countdown",
                Execution::stepped(|ctx| {
                    let mut remaining = ctx.arguments().int("from").unwrap_or(1);
                    move |ctx: &mut CommandContext| -> anyhow::Result<Step> {
                        remaining -= 1;
                        if remaining > 0 {
                            return Ok(Step::Yield);
                        }
                        ctx.respond_ok("liftoff")?;
                        Ok(Step::Done)
                    }
                }),
            )
            .overload(
                ArgumentBuilder::new()
                    .with_arg("from", ArgType::Int)
                    .validated_by(IntRange::new(1, 10)),
            ),
        )
        .unwrap();

    let too_far = engine.execute("countdown 50", player());
    assert!(too_far.response().is_some_and(Response::is_fail));

    let Dispatch::Pending(run) = engine.execute("countdown 3", player()) else {
        panic!("expected pending");
    };
    let mut ticks = 0;
    let completion = loop {
        ticks += 1;
        if let Some(done) = engine.tick().pop() {
            break done;
        }
    };
    assert_eq!(ticks, 2);
    assert_eq!(completion.run, run);
    assert_eq!(completion.response, Response::ok("liftoff"));
}

#[test]
fn overloads_enums_and_properties_work_together() {
    let captured = Captured::default();
    let mut engine = engine();
    let direction = ArgType::enumeration("direction", ["north", "east", "south", "west"]);
    engine
        .register(
            CommandDefinition::new("go", capture(&captured))
                .alias("move")
                .overload(ArgumentBuilder::new().with_arg("direction", direction.clone()))
                .overload(
                    ArgumentBuilder::new()
                        .with_arg("direction", direction)
                        .with_arg("steps", ArgType::Int)
                        .with_optional("via", ArgType::String, "road"),
                ),
        )
        .unwrap();

    engine.execute("MOVE 2 4", player());
    let bound = captured.lock().unwrap().clone();
    let Value::Enum(variant) = &bound[0].1 else {
        panic!("expected an enum, got {:?}", bound[0].1);
    };
    assert_eq!(&*variant.variant, "south");
    assert_eq!(bound[1], ("steps".to_owned(), Value::Int(4)));
    assert_eq!(bound[2], ("via".to_owned(), Value::from("road")));

    engine.execute("go west 1 ${home}", player());
    assert_eq!(captured.lock().unwrap()[2], ("via".to_owned(), Value::from("harbor")));

    let unknown = engine.execute("go up", player());
    assert!(unknown.response().is_some_and(|r| r.message.contains("`up`")));
}

#[test]
fn maps_and_optional_types() {
    let captured = Captured::default();
    let mut engine = engine();
    engine
        .register(
            CommandDefinition::new("stock", capture(&captured)).overload(
                ArgumentBuilder::new()
                    .with_arg("items", ArgType::map(ArgType::String, ArgType::optional(ArgType::Int)))
                    .with_arg("shop", ArgType::String)
                    .validated_by(OneOf::new(["forge", "market"])),
            ),
        )
        .unwrap();

    engine.execute("stock {sword:2, shield:null} forge", player());
    let bound = captured.lock().unwrap().clone();
    let items = bound[0].1.as_map().unwrap();
    assert_eq!(items.get(&Value::from("sword")), Some(&Value::Int(2)));
    assert_eq!(items.get(&Value::from("shield")), Some(&Value::Nil));

    let wrong_shop = engine.execute("stock {} tavern", player());
    assert!(wrong_shop.response().is_some_and(|r| r.message.contains("must be one of: forge, market")));
}

#[test]
fn help_lists_commands_with_usage() {
    let captured = Captured::default();
    let mut engine = engine();
    engine
        .register(
            CommandDefinition::new("kick", capture(&captured))
                .described("Remove a player")
                .requires("moderation.kick")
                .overload(ArgumentBuilder::new().with_arg("who", ArgType::String)),
        )
        .unwrap();
    let commands = engine.shared_commands();
    engine
        .register(
            CommandDefinition::new(
                "help",
                Execution::sync(move |ctx| {
                    ctx.respond_ok(commands.describe().trim_end())?;
                    Ok(())
                }),
            )
            .alias("?"),
        )
        .unwrap();

    let Dispatch::Completed(help) = engine.execute("?", player()) else {
        panic!("help is synchronous");
    };
    assert!(help.message.contains("kick <who:string>\n    Remove a player"), "{}", help.message);
    assert!(help.message.contains("aliases: ?"));

    let denied = engine.execute("kick bob", player());
    assert_eq!(
        denied,
        Dispatch::Completed(Response::fail("permission denied: `kick` requires moderation.kick"))
    );
}
