//! Parley console entry point.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use parley_foundation::{ArgType, ConsoleInvoker, Invoker, Opaque, Value};
use parley_parser::{ArgumentBuilder, CollectionSize, IntRange};
use parley_runtime::{
    CommandContext, CommandDefinition, CommandEngine, Console, EngineConfig, Execution, Response, Step,
};
use tracing_subscriber::EnvFilter;

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    scripts: Vec<PathBuf>,
    batch_mode: bool,
    show_help: bool,
    show_version: bool,
    log_level: Option<String>,
    invoker: Option<String>,
    development: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "-b" | "--batch" => config.batch_mode = true,
            "--dev" => config.development = true,
            "--log" | "--name" => {
                let flag = args[i].clone();
                i += 1;
                let Some(value) = args.get(i) else {
                    return Err(format!("{flag} requires a value").into());
                };
                if flag == "--log" {
                    config.log_level = Some(value.clone());
                } else {
                    config.invoker = Some(value.clone());
                }
            }
            arg if arg.starts_with('-') => {
                return Err(format!("unknown option: {arg}").into());
            }
            path => config.scripts.push(PathBuf::from(path)),
        }
        i += 1;
    }

    Ok(config)
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args(args)?;

    if config.show_help {
        print_help();
        return Ok(());
    }

    if config.show_version {
        println!("parley {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let filter = match &config.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine_config = if config.development {
        EngineConfig::development()
    } else {
        EngineConfig::default()
    };
    let mut engine = CommandEngine::new(engine_config)?;
    register_demo_commands(&mut engine)?;

    let name = config.invoker.unwrap_or_else(|| "console".to_string());
    let invoker: Arc<dyn Invoker> = Arc::new(ConsoleInvoker::new(name).with_property("home", "spawn"));
    let mut console = Console::new(engine, invoker)?;

    for script in &config.scripts {
        let text = fs::read_to_string(script).map_err(|e| format!("cannot read {}: {e}", script.display()))?;
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            println!("> {line}");
            for response in console.handle_line(line) {
                print_response(&response);
            }
        }
    }

    if config.batch_mode {
        return Ok(());
    }

    if !config.scripts.is_empty() {
        console = console.without_banner();
    }

    console.run()?;
    Ok(())
}

fn print_response(response: &Response) {
    if response.message.is_empty() {
        return;
    }
    if response.is_fail() {
        eprintln!("\x1b[31m{response}\x1b[0m");
    } else {
        println!("{response}");
    }
}

/// Parses `90s`, `5m`, `2h`, or a bare number of seconds.
fn parse_duration(text: &str) -> Result<Value, String> {
    let (digits, unit) = match text.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((i, _)) => text.split_at(i),
        None => (text, "s"),
    };
    let amount: u64 = digits.parse().map_err(|_| format!("expected duration, got '{text}'"))?;
    let seconds = match unit {
        "s" => amount,
        "m" => amount.saturating_mul(60),
        "h" => amount.saturating_mul(3600),
        other => return Err(format!("unknown duration unit '{other}'")),
    };
    Ok(Value::Opaque(Opaque::new("duration", Duration::from_secs(seconds))))
}

fn register_demo_commands(engine: &mut CommandEngine) -> parley_foundation::Result<()> {
    engine.parsers().register_scalar("duration", parse_duration);

    engine.register(
        CommandDefinition::new(
            "echo",
            Execution::sync(|ctx| {
                let text = ctx.arguments().string("text").unwrap_or_default().to_owned();
                ctx.respond_ok(text)?;
                Ok(())
            }),
        )
        .alias("say")
        .described("Repeat the rest of the line")
        .overload(ArgumentBuilder::new().with_remainder("text")),
    )?;

    engine.register(
        CommandDefinition::new(
            "greet",
            Execution::sync(|ctx| {
                let name = ctx.arguments().string("name").unwrap_or("stranger").to_owned();
                let times = ctx.arguments().int("times").unwrap_or(1);
                let count = usize::try_from(times).unwrap_or(1);
                ctx.respond_ok(vec![format!("hello, {name}!"); count].join(" "))?;
                Ok(())
            }),
        )
        .described("Say hello")
        .overload(ArgumentBuilder::new())
        .overload(
            ArgumentBuilder::new()
                .with_arg("name", ArgType::String)
                .with_optional("times", ArgType::Int, 1)
                .validated_by(IntRange::new(1, 5)),
        ),
    )?;

    engine.register(
        CommandDefinition::new(
            "tag",
            Execution::sync(|ctx| {
                let colors: Vec<String> = ctx
                    .arguments()
                    .list("colors")
                    .map(|items| items.iter().map(ToString::to_string).collect())
                    .unwrap_or_default();
                ctx.respond_ok(format!("tagged: {}", colors.join(", ")))?;
                Ok(())
            }),
        )
        .described("Tag with a list of colors")
        .overload(
            ArgumentBuilder::new()
                .with_arg("colors", ArgType::list(ArgType::String))
                .validated_by(CollectionSize::non_empty()),
        ),
    )?;

    engine.register(
        CommandDefinition::new(
            "mode",
            Execution::sync(|ctx| {
                let level = ctx
                    .arguments()
                    .enum_variant("level")
                    .map_or_else(String::new, |v| v.variant.to_string());
                ctx.respond_ok(format!("mode set to {level}"))?;
                Ok(())
            }),
        )
        .described("Set the output mode")
        .requires("console.mode")
        .overload(ArgumentBuilder::new().with_arg("level", ArgType::enumeration("level", ["quiet", "normal", "loud"]))),
    )?;

    engine.register(
        CommandDefinition::new(
            "countdown",
            Execution::stepped(|ctx| {
                let mut remaining = ctx.arguments().int("from").unwrap_or(3);
                move |ctx: &mut CommandContext| -> anyhow::Result<Step> {
                    if remaining > 0 {
                        println!("{remaining}...");
                        remaining -= 1;
                        return Ok(Step::Yield);
                    }
                    ctx.respond_ok("liftoff")?;
                    Ok(Step::Done)
                }
            }),
        )
        .described("Count down one number per tick")
        .overload(
            ArgumentBuilder::new()
                .with_arg("from", ArgType::Int)
                .validated_by(IntRange::new(1, 20)),
        ),
    )?;

    engine.register(
        CommandDefinition::new(
            "remind",
            Execution::worker(|request| async move {
                let after = match request.arguments.get("after") {
                    Some(Value::Opaque(opaque)) => opaque.downcast_ref::<Duration>().copied().unwrap_or_default(),
                    _ => Duration::ZERO,
                };
                tokio::time::sleep(after).await;
                let text = request.arguments.string("text").unwrap_or_default().to_owned();
                Ok::<_, anyhow::Error>(Response::ok(format!("reminder for {}: {text}", request.invoker.name())))
            }),
        )
        .described("Wait off the main loop, then remind")
        .overload(
            ArgumentBuilder::new()
                .with_arg("after", ArgType::custom("duration"))
                .with_remainder("text"),
        ),
    )?;

    engine.register(
        CommandDefinition::new(
            "confirm",
            Execution::sync(|ctx| {
                let action = ctx.arguments().string("action").unwrap_or_default().to_owned();
                ctx.respond_continued(format!("really {action}? (yes/no)"), move |next| {
                    if next.raw_input().trim().eq_ignore_ascii_case("yes") {
                        next.respond_ok(format!("{action}: done"))?;
                    } else {
                        next.respond_fail(format!("{action}: cancelled"))?;
                    }
                    Ok(())
                })?;
                Ok(())
            }),
        )
        .described("Ask before doing something")
        .overload(ArgumentBuilder::new().with_arg("action", ArgType::String)),
    )?;

    let commands = engine.shared_commands();
    engine.register(
        CommandDefinition::new(
            "help",
            Execution::sync(move |ctx| {
                ctx.respond_ok(commands.describe().trim_end())?;
                Ok(())
            }),
        )
        .alias("?")
        .described("List commands"),
    )?;

    Ok(())
}

fn print_help() {
    println!(
        "\x1b[1mParley\x1b[0m - Command console

\x1b[1mUSAGE:\x1b[0m
    parley [OPTIONS] [SCRIPTS...]

\x1b[1mARGUMENTS:\x1b[0m
    [SCRIPTS...]    Files of command lines to run before the console starts

\x1b[1mOPTIONS:\x1b[0m
    -h, --help         Print help information
    -V, --version      Print version information
    -b, --batch        Run scripts and exit (no console)
    --log FILTER       Log filter, e.g. debug or parley_runtime=trace
    --name NAME        Invoker name (default: console)
    --dev              Use the development engine configuration

\x1b[1mEXAMPLES:\x1b[0m
    parley                          Start the console
    parley -b setup.txt             Run setup.txt and exit
    parley --log debug              Show dispatch and binding logs

\x1b[1mCONSOLE:\x1b[0m
    help                 List commands
    Ctrl+C               Cancel input or an open conversation
    Ctrl+D               Exit"
    );
}
