//! The console driven by a scripted line editor

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_foundation::{ArgType, ConsoleInvoker, Result};
use parley_parser::ArgumentBuilder;
use parley_runtime::{
    CommandContext, CommandDefinition, CommandEngine, Console, EngineConfig, Execution, LineEditor, ReadResult,
    Response, Step,
};

/// Replays scripted reads and records what the console asked for.
#[derive(Default)]
struct ScriptedEditor {
    reads: VecDeque<ReadResult>,
    prompts: Arc<Mutex<Vec<String>>>,
    history: Arc<Mutex<Vec<String>>>,
    keywords: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEditor {
    fn lines(lines: &[&str]) -> Self {
        Self {
            reads: lines.iter().map(|l| ReadResult::Line((*l).to_owned())).collect(),
            ..Self::default()
        }
    }

    fn then(mut self, read: ReadResult) -> Self {
        self.reads.push_back(read);
        self
    }
}

impl LineEditor for ScriptedEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadResult> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        Ok(self.reads.pop_front().unwrap_or(ReadResult::Eof))
    }

    fn add_history(&mut self, line: &str) {
        self.history.lock().unwrap().push(line.to_owned());
    }

    fn set_keywords(&mut self, keywords: Vec<String>) {
        *self.keywords.lock().unwrap() = keywords;
    }
}

fn engine(log: &Arc<Mutex<Vec<String>>>) -> CommandEngine {
    let mut engine = CommandEngine::new(EngineConfig::default().with_worker_threads(1)).unwrap();

    let tags = Arc::clone(log);
    engine
        .register(
            CommandDefinition::new(
                "tag",
                Execution::sync(move |ctx| {
                    let count = ctx.arguments().list("colors").map_or(0, im::Vector::len);
                    tags.lock().unwrap().push(format!("tagged {count}"));
                    Ok(())
                }),
            )
            .overload(ArgumentBuilder::new().with_arg("colors", ArgType::list(ArgType::String))),
        )
        .unwrap();

    let answers = Arc::clone(log);
    engine
        .register(
            CommandDefinition::new(
                "confirm",
                Execution::sync(move |ctx| {
                    let answers = Arc::clone(&answers);
                    ctx.respond_continued("sure?", move |next| {
                        answers.lock().unwrap().push(format!("answered {}", next.raw_input()));
                        Ok(())
                    })?;
                    Ok(())
                }),
            )
            .overload(ArgumentBuilder::new().with_arg("action", ArgType::String)),
        )
        .unwrap();

    engine
        .register(CommandDefinition::new(
            "wait",
            Execution::stepped(|_| {
                let mut polled = false;
                move |ctx: &mut CommandContext| -> anyhow::Result<Step> {
                    if !polled {
                        polled = true;
                        return Ok(Step::Yield);
                    }
                    ctx.respond_ok("waited")?;
                    Ok(Step::Done)
                }
            }),
        ))
        .unwrap();
    engine
}

#[test]
fn console_session_end_to_end() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let editor = ScriptedEditor::lines(&["tag [red,", "green]", "", "confirm reset", "yes"]);
    let prompts = Arc::clone(&editor.prompts);
    let history = Arc::clone(&editor.history);
    let keywords = Arc::clone(&editor.keywords);

    let invoker = Arc::new(ConsoleInvoker::new("ada"));
    let mut console = Console::with_editor(editor, engine(&log), invoker)
        .without_banner()
        .with_prompt("parley> ");
    console.run().unwrap();

    assert_eq!(*log.lock().unwrap(), ["tagged 2", "answered yes"]);
    assert_eq!(*prompts.lock().unwrap(), ["parley> ", ".. ", "parley> ", "parley> ", "?> ", "parley> "]);
    assert_eq!(*history.lock().unwrap(), ["tag [red, green]", "confirm reset", "yes"]);
    assert_eq!(*keywords.lock().unwrap(), ["confirm", "tag", "wait"]);
}

#[test]
fn interrupt_cancels_an_open_conversation() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let editor = ScriptedEditor::lines(&["confirm reset"]).then(ReadResult::Interrupted);
    let invoker = Arc::new(ConsoleInvoker::new("ada"));
    let mut console = Console::with_editor(editor, engine(&log), invoker).without_banner();

    console.run().unwrap();
    assert_eq!(console.engine().conversation_count(), 0);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn suspended_commands_finish_before_the_next_prompt() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let invoker = Arc::new(ConsoleInvoker::new("ada"));
    let mut console = Console::with_editor(ScriptedEditor::default(), engine(&log), invoker)
        .without_banner()
        .with_tick_interval(Duration::ZERO);

    assert_eq!(console.handle_line("wait"), [Response::ok("waited")]);
    assert_eq!(console.engine().in_flight(), 0);
    let rejected = console.handle_line("tag red");
    assert!(rejected[0].is_fail());
    assert!(
        rejected[0].message.ends_with("expected a [..] collection, got a word"),
        "{}",
        rejected[0].message
    );
}
