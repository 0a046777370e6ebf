//! The command engine.
//!
//! [`CommandEngine`] ties the pieces together. [`execute`](CommandEngine::execute)
//! dispatches one line: it splits the line, looks up the command, checks
//! permission, binds arguments, and starts a runner. Sync commands answer
//! immediately; stepped and worker commands answer later from
//! [`tick`](CommandEngine::tick), which the host calls once per cycle.
//!
//! A line from an invoker with an open conversation skips all of that and
//! goes to the waiting continuation instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use parley_foundation::{Error, ErrorContext, ErrorKind, Invoker, Result};
use parley_parser::{
    ArgumentPool, BindRequest, ParserRegistry, SplitLine, ValueParser, bind, split_arguments, split_line,
};
use tokio::runtime::{Handle, Runtime};

use crate::config::EngineConfig;
use crate::context::{CommandContext, ContinuationFn, ContinuedContext};
use crate::registry::{CommandDefinition, CommandRegistry, RegisteredCommand};
use crate::response::Response;
use crate::runner::{CommandRunner, fault, guarded};
use crate::scheduler::{RunId, Scheduler};

/// What happened to a dispatched line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The invocation finished with this response.
    Completed(Response),
    /// The invocation is running; its [`Completion`] arrives from `tick`.
    Pending(RunId),
    /// The conversation stays open. The response is either the prompt for
    /// the next line or the reason this line was rejected.
    Continued(Response),
}

impl Dispatch {
    /// The response, unless the invocation is still pending.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Completed(response) | Self::Continued(response) => Some(response),
            Self::Pending(_) => None,
        }
    }

    /// Returns true if the invocation is still running.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// A suspended invocation that finished during a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// The id returned by `execute`.
    pub run: RunId,
    /// Canonical command name.
    pub command: String,
    /// Name of the invoker.
    pub invoker: String,
    /// The final response.
    pub response: Response,
}

struct Conversation {
    previous: Arc<CommandContext>,
    callback: ContinuationFn,
}

enum Workers {
    Owned(Runtime),
    Shared(Handle),
}

impl Workers {
    fn handle(&self) -> &Handle {
        match self {
            Self::Owned(runtime) => runtime.handle(),
            Self::Shared(handle) => handle,
        }
    }
}

type Outbox = Arc<Mutex<Vec<(RunId, CommandContext)>>>;

/// Idle runners, each tagged with the registration that created it.
type RunnerPool = Vec<(Arc<RegisteredCommand>, CommandRunner)>;

/// Parses, binds, and runs command lines.
pub struct CommandEngine {
    config: EngineConfig,
    parsers: Arc<ParserRegistry>,
    commands: Arc<CommandRegistry>,
    arguments: ArgumentPool,
    runners: HashMap<String, RunnerPool>,
    origins: HashMap<RunId, Arc<RegisteredCommand>>,
    scheduler: Scheduler,
    conversations: IndexMap<String, Conversation>,
    outbox: Outbox,
    workers: Workers,
    next_run: u64,
}

impl fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEngine")
            .field("config", &self.config)
            .field("commands", &self.commands)
            .field("in_flight", &self.scheduler.len())
            .field("conversations", &self.conversations.len())
            .finish_non_exhaustive()
    }
}

impl CommandEngine {
    /// Creates an engine with its own worker runtime.
    ///
    /// The engine must not be dropped from inside an async context.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the worker runtime cannot start.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("parley-worker")
            .enable_all()
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal(format!("failed to start worker runtime: {e}"))))?;
        Ok(Self::with_workers(config, Workers::Owned(runtime)))
    }

    /// Creates an engine that spawns worker commands on an existing runtime.
    #[must_use]
    pub fn with_handle(config: EngineConfig, handle: Handle) -> Self {
        Self::with_workers(config, Workers::Shared(handle))
    }

    fn with_workers(config: EngineConfig, workers: Workers) -> Self {
        Self {
            arguments: ArgumentPool::new(config.argument_pool_capacity),
            config,
            parsers: Arc::new(ParserRegistry::new()),
            commands: Arc::new(CommandRegistry::new()),
            runners: HashMap::new(),
            origins: HashMap::new(),
            scheduler: Scheduler::new(),
            conversations: IndexMap::new(),
            outbox: Arc::default(),
            workers,
            next_run: 0,
        }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The parser registry used when building command schemas.
    #[must_use]
    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// The registered commands.
    #[must_use]
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// The registered commands, shared (e.g. for a `help` handler).
    #[must_use]
    pub fn shared_commands(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.commands)
    }

    /// The pool argument collections are rented from.
    #[must_use]
    pub const fn argument_pool(&self) -> &ArgumentPool {
        &self.arguments
    }

    /// Registers a parser for a type key.
    ///
    /// Schemas resolve their parsers when they are built, so register custom
    /// parsers before the commands that use them.
    pub fn register_parser(&self, key: impl Into<String>, parser: impl ValueParser + 'static) {
        self.parsers.register(key, parser);
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// Returns a schema error if any overload is invalid; nothing is
    /// registered in that case.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<()> {
        let command = self.commands.register(definition, &self.parsers)?;
        self.runners.remove(&command.name);
        Ok(())
    }

    /// Dispatches one line on behalf of `invoker`.
    pub fn execute(&mut self, line: &str, invoker: Arc<dyn Invoker>) -> Dispatch {
        let key = invoker.conversation_key();
        if let Some(conversation) = self.conversations.shift_remove(&key) {
            return self.continue_conversation(key, conversation, line);
        }

        let SplitLine {
            mut args,
            error: split_error,
        } = split_line(line);
        if args.is_empty() {
            return Dispatch::Completed(Response::fail("no command given"));
        }
        let name = args.remove(0);
        if let Some(err) = split_error
            .as_ref()
            .filter(|err| err.scan_position().is_some_and(|position| position < name.end()))
        {
            let context = ErrorContext::new().with_input(line);
            tracing::debug!(error = %err, context = %context, "rejected malformed line");
            return Dispatch::Completed(Response::from(err));
        }
        let name = name.text;

        let Some(command) = self.commands.lookup(&name) else {
            if self.config.log_unknown_commands {
                tracing::info!(command = %name, invoker = %invoker.name(), "unknown command");
            }
            return Dispatch::Completed(Response::from(Error::unknown_command(name)));
        };

        if let Some(permission) = &command.permission {
            if !invoker.has_permission(permission) {
                tracing::debug!(command = %command.name, invoker = %invoker.name(), "permission denied");
                return Dispatch::Completed(Response::from(Error::new(ErrorKind::PermissionDenied {
                    command: command.name.clone(),
                    permission: permission.clone(),
                })));
            }
        }

        let request = BindRequest {
            command: &command.name,
            line,
            args: &args,
            invoker: &*invoker,
            split_error: split_error.as_ref(),
        };
        let bound = match bind(&command.overloads, &request, &self.arguments) {
            Ok(bound) => bound,
            Err(err) => {
                let context = err.context.clone().unwrap_or_default();
                tracing::debug!(command = %command.name, error = %err, context = %context, "bind failed");
                return Dispatch::Completed(Response::from(&err));
            }
        };
        tracing::debug!(command = %command.name, overload = bound.overload, "bound arguments");

        let raw_args = args.into_iter().map(|arg| arg.text).collect();
        let context = CommandContext::new(
            line,
            raw_args,
            command.name.clone(),
            bound.arguments,
            Arc::clone(&invoker),
        );
        self.start(&command, context)
    }

    fn start(&mut self, command: &Arc<RegisteredCommand>, context: CommandContext) -> Dispatch {
        self.next_run += 1;
        let id = RunId(self.next_run);

        let mut runner = self.rent_runner(command);
        let outbox = Arc::clone(&self.outbox);
        runner.run(
            context,
            Box::new(move |ctx| outbox.lock().push((id, ctx))),
            self.workers.handle(),
        );

        if !runner.is_finished() {
            tracing::debug!(command = %command.name, run = id.0, "command suspended");
            self.scheduler.submit(id, runner);
            self.origins.insert(id, Arc::clone(command));
            return Dispatch::Pending(id);
        }

        self.recycle(command, runner);
        let finished = {
            let mut outbox = self.outbox.lock();
            outbox
                .iter()
                .position(|(run, _)| *run == id)
                .map(|index| outbox.swap_remove(index).1)
        };
        match finished {
            Some(context) => self.conclude(context),
            None => Dispatch::Completed(Response::empty()),
        }
    }

    /// Advances every in-flight invocation by one step and returns those
    /// that finished, in submission order.
    pub fn tick(&mut self) -> Vec<Completion> {
        let mut finished: HashMap<RunId, CommandRunner> = self.scheduler.tick().into_iter().collect();
        let done = std::mem::take(&mut *self.outbox.lock());

        let mut completions = Vec::with_capacity(done.len());
        for (run, context) in done {
            let origin = self.origins.remove(&run);
            if let (Some(runner), Some(origin)) = (finished.remove(&run), origin) {
                self.recycle(&origin, runner);
            }
            let command = context.command().to_owned();
            let invoker = context.invoker().name().to_owned();
            let response = self.settle(context);
            tracing::debug!(command = %command, run = run.0, kind = ?response.kind, "command completed");
            completions.push(Completion {
                run,
                command,
                invoker,
                response,
            });
        }
        for run in finished.keys() {
            self.origins.remove(run);
        }
        completions
    }

    /// Abandons the open conversation of `key`, if any.
    pub fn end_conversation(&mut self, key: &str) -> bool {
        let ended = self.conversations.shift_remove(key).is_some();
        if ended {
            tracing::debug!(conversation = %key, "conversation ended");
        }
        ended
    }

    /// Returns true if the next line from `key` goes to a continuation.
    #[must_use]
    pub fn has_conversation(&self, key: &str) -> bool {
        self.conversations.contains_key(key)
    }

    /// Number of open conversations.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Number of invocations still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.scheduler.len()
    }

    /// Idle runners pooled for `command`.
    #[must_use]
    pub fn pooled_runners(&self, command: &str) -> usize {
        self.runners.get(&command.to_lowercase()).map_or(0, Vec::len)
    }

    fn continue_conversation(&mut self, key: String, conversation: Conversation, line: &str) -> Dispatch {
        let args = match split_arguments(line) {
            Ok(args) => args,
            Err(err) => {
                let response = Response::from(&err);
                self.conversations.insert(key, conversation);
                return Dispatch::Continued(response);
            }
        };
        let raw_args = args.into_iter().map(|arg| arg.text).collect();

        let Conversation { previous, callback } = conversation;
        let mut continued = ContinuedContext::new(previous, line, raw_args);
        if let Err(err) = guarded(|| callback(&mut continued)) {
            fault(&mut continued, &err);
        }

        let mut context = continued.into_context();
        context.ensure_response();
        tracing::debug!(command = %context.command(), depth = context.depth(), "continued");
        self.conclude(context)
    }

    fn conclude(&mut self, context: CommandContext) -> Dispatch {
        let response = self.settle(context);
        if response.is_continued() {
            Dispatch::Continued(response)
        } else {
            Dispatch::Completed(response)
        }
    }

    /// Takes the final response and opens a conversation if it continues.
    fn settle(&mut self, mut context: CommandContext) -> Response {
        let response = context.response().cloned().unwrap_or_else(Response::empty);
        if response.is_continued() {
            if let Some(callback) = context.take_continuation() {
                let key = context.invoker().conversation_key();
                self.open_conversation(
                    key,
                    Conversation {
                        previous: Arc::new(context),
                        callback,
                    },
                );
            }
        }
        response
    }

    fn open_conversation(&mut self, key: String, conversation: Conversation) {
        let limit = self.config.max_conversations.max(1);
        while self.conversations.len() >= limit && !self.conversations.contains_key(&key) {
            if let Some((oldest, _)) = self.conversations.shift_remove_index(0) {
                tracing::warn!(conversation = %oldest, "abandoning oldest conversation");
            }
        }
        if self.conversations.insert(key.clone(), conversation).is_some() {
            tracing::warn!(conversation = %key, "replaced an open conversation");
        }
    }

    fn rent_runner(&mut self, command: &Arc<RegisteredCommand>) -> CommandRunner {
        // The registry can be changed without going through `register`, so a
        // pooled runner is only reused by the registration that created it.
        let pooled = self.runners.get_mut(&command.name).and_then(|pool| {
            pool.retain(|(origin, _)| Arc::ptr_eq(origin, command));
            pool.pop()
        });
        pooled
            .map_or_else(|| CommandRunner::create(command.execution.clone()), |(_, runner)| runner)
            .with_slow_task_threshold(self.config.slow_task_threshold)
    }

    fn recycle(&mut self, origin: &Arc<RegisteredCommand>, mut runner: CommandRunner) {
        let current = self.commands.lookup(&origin.name);
        if !current.is_some_and(|current| Arc::ptr_eq(&current, origin)) {
            tracing::debug!(command = %origin.name, "dropping runner of a replaced command");
            return;
        }
        if !runner.should_pool() || !runner.reset() {
            return;
        }
        let pool = self.runners.entry(origin.name.clone()).or_default();
        if pool.len() < self.config.runner_pool_capacity {
            pool.push((Arc::clone(origin), runner));
        }
    }
}
