//! An interactive console over a [`CommandEngine`].
//!
//! Every line is dispatched for a single invoker. Suspended commands are
//! driven by ticking the engine until they finish, so the console behaves
//! like a host loop that only has one player.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use parley_foundation::{Error, ErrorKind, Invoker, Result};

use crate::editor::{LineEditor, ReadResult, RustylineEditor, is_balanced};
use crate::engine::{CommandEngine, Dispatch};
use crate::response::Response;

/// The interactive console.
pub struct Console<E: LineEditor = RustylineEditor> {
    editor: E,
    engine: CommandEngine,
    invoker: Arc<dyn Invoker>,
    show_banner: bool,
    prompt: String,
    continuation_prompt: String,
    reply_prompt: String,
    tick_interval: Duration,
}

impl Console<RustylineEditor> {
    /// Creates a console with the default rustyline editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor fails to initialize.
    pub fn new(engine: CommandEngine, invoker: Arc<dyn Invoker>) -> Result<Self> {
        let editor = RustylineEditor::new()?;
        Ok(Self::with_editor(editor, engine, invoker))
    }
}

impl<E: LineEditor> Console<E> {
    /// Creates a console with the given editor.
    pub fn with_editor(editor: E, engine: CommandEngine, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            editor,
            engine,
            invoker,
            show_banner: true,
            prompt: "> ".to_string(),
            continuation_prompt: ".. ".to_string(),
            reply_prompt: "?> ".to_string(),
            tick_interval: Duration::from_millis(50),
        }
    }

    /// Disables the welcome banner.
    #[must_use]
    pub const fn without_banner(mut self) -> Self {
        self.show_banner = false;
        self
    }

    /// Sets the primary prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the pause between ticks while a command is suspended.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Returns a reference to the engine.
    #[must_use]
    pub const fn engine(&self) -> &CommandEngine {
        &self.engine
    }

    /// Returns a mutable reference to the engine.
    pub fn engine_mut(&mut self) -> &mut CommandEngine {
        &mut self.engine
    }

    /// Runs the console loop until EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails.
    pub fn run(&mut self) -> Result<()> {
        if self.show_banner {
            self.print_banner();
        }
        self.editor.set_keywords(self.engine.commands().names());

        while let Some(line) = self.read_input()? {
            if line.trim().is_empty() {
                continue;
            }
            self.editor.add_history(&line);
            for response in self.handle_line(&line) {
                print_response(&response);
            }
        }

        println!("\nGoodbye!");
        Ok(())
    }

    /// Dispatches one line and returns every response it produced, waiting
    /// for suspended commands to finish.
    pub fn handle_line(&mut self, line: &str) -> Vec<Response> {
        match self.engine.execute(line, Arc::clone(&self.invoker)) {
            Dispatch::Completed(response) | Dispatch::Continued(response) => vec![response],
            Dispatch::Pending(run) => {
                let mut responses = Vec::new();
                loop {
                    let completions = self.engine.tick();
                    let done = completions.iter().any(|c| c.run == run);
                    responses.extend(completions.into_iter().map(|c| c.response));
                    if done {
                        return responses;
                    }
                    std::thread::sleep(self.tick_interval);
                }
            }
        }
    }

    fn current_prompt(&self) -> &str {
        if self.engine.has_conversation(&self.invoker.conversation_key()) {
            &self.reply_prompt
        } else {
            &self.prompt
        }
    }

    /// Reads a line, continuing while a list, map, or quote is open.
    fn read_input(&mut self) -> Result<Option<String>> {
        let mut input = String::new();
        let mut first_line = true;

        loop {
            let prompt = if first_line {
                self.current_prompt().to_owned()
            } else {
                self.continuation_prompt.clone()
            };

            match self.editor.read_line(&prompt)? {
                ReadResult::Line(line) => {
                    if !first_line {
                        input.push(' ');
                    }
                    input.push_str(&line);
                    if is_balanced(&input) {
                        return Ok(Some(input));
                    }
                    first_line = false;
                }
                ReadResult::Interrupted => {
                    let key = self.invoker.conversation_key();
                    if self.engine.end_conversation(&key) {
                        println!("\nConversation cancelled.");
                    } else if !first_line {
                        println!("\nInput cancelled.");
                    } else {
                        println!();
                    }
                    return Ok(Some(String::new()));
                }
                ReadResult::Eof => {
                    if first_line {
                        return Ok(None);
                    }
                    return Err(Error::new(ErrorKind::Internal(
                        "unexpected EOF in multi-line input".to_string(),
                    )));
                }
            }
        }
    }

    #[allow(clippy::unused_self)]
    fn print_banner(&self) {
        println!("\x1b[1;36mparley\x1b[0m console v{}", env!("CARGO_PKG_VERSION"));
        println!("Type `help` to list commands. Use Ctrl+D to exit.\n");
        let _ = io::stdout().flush();
    }
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
