//! Per-invocation context and multi-turn continuations.
//!
//! A [`CommandContext`] is created for every dispatched line. It carries the
//! raw input, the bound arguments, and the invoker, and it receives exactly
//! one [`Response`]. A handler that answers with
//! [`respond_continued`](CommandContext::respond_continued) leaves a callback
//! behind; the next line of the same conversation is handed to that callback
//! as a [`ContinuedContext`].

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parley_foundation::{Error, Invoker, Result};
use parley_parser::ArgumentCollection;

use crate::response::{Response, ResponseKind};

/// Callback run with the next line of a conversation.
pub type ContinuationFn = Box<dyn FnOnce(&mut ContinuedContext) -> anyhow::Result<()> + Send + Sync>;

/// Everything known about one invocation.
pub struct CommandContext {
    raw_input: String,
    raw_args: Vec<String>,
    command: String,
    arguments: Arc<ArgumentCollection>,
    invoker: Arc<dyn Invoker>,
    response: Option<Response>,
    continuation: Option<ContinuationFn>,
    previous: Option<Arc<CommandContext>>,
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command)
            .field("raw_input", &self.raw_input)
            .field("invoker", &self.invoker.name())
            .field("arguments", &self.arguments)
            .field("response", &self.response)
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Creates a context for a freshly dispatched line.
    #[must_use]
    pub fn new(
        raw_input: impl Into<String>,
        raw_args: Vec<String>,
        command: impl Into<String>,
        arguments: ArgumentCollection,
        invoker: Arc<dyn Invoker>,
    ) -> Self {
        Self {
            raw_input: raw_input.into(),
            raw_args,
            command: command.into(),
            arguments: Arc::new(arguments),
            invoker,
            response: None,
            continuation: None,
            previous: None,
        }
    }

    /// The full input line.
    #[must_use]
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    /// Raw argument strings, command name excluded.
    #[must_use]
    pub fn raw_args(&self) -> &[String] {
        &self.raw_args
    }

    /// Canonical name of the command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The bound arguments.
    #[must_use]
    pub fn arguments(&self) -> &ArgumentCollection {
        &self.arguments
    }

    /// The bound arguments, shared.
    #[must_use]
    pub fn shared_arguments(&self) -> Arc<ArgumentCollection> {
        Arc::clone(&self.arguments)
    }

    /// Who is running the command.
    #[must_use]
    pub fn invoker(&self) -> &dyn Invoker {
        &*self.invoker
    }

    /// Who is running the command, shared.
    #[must_use]
    pub fn shared_invoker(&self) -> Arc<dyn Invoker> {
        Arc::clone(&self.invoker)
    }

    /// The response, once given.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Returns true once any `respond*` call succeeded.
    #[must_use]
    pub fn has_responded(&self) -> bool {
        self.response.is_some()
    }

    /// The context this one continues, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&CommandContext> {
        self.previous.as_deref()
    }

    /// Number of continuation hops that led to this context.
    #[must_use]
    pub fn depth(&self) -> usize {
        std::iter::successors(self.previous(), |c| c.previous()).count()
    }

    /// Sets the response.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if a response was already given, or if
    /// `response` is continued (use [`respond_continued`](Self::respond_continued)).
    pub fn respond(&mut self, response: Response) -> Result<()> {
        if response.kind == ResponseKind::Continued {
            return Err(Error::contract_violation(format!(
                "`{}` answered continued without a callback",
                self.command
            )));
        }
        self.set_response(response)
    }

    /// Responds with success.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if a response was already given.
    pub fn respond_ok(&mut self, message: impl Into<String>) -> Result<()> {
        self.set_response(Response::ok(message))
    }

    /// Responds with failure.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if a response was already given.
    pub fn respond_fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.set_response(Response::fail(message))
    }

    /// Prompts for the next line and registers the callback that handles it.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if a response was already given.
    pub fn respond_continued<F>(&mut self, message: impl Into<String>, callback: F) -> Result<()>
    where
        F: FnOnce(&mut ContinuedContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.set_response(Response::continued(message))?;
        self.continuation = Some(Box::new(callback));
        Ok(())
    }

    fn set_response(&mut self, response: Response) -> Result<()> {
        if let Some(existing) = &self.response {
            return Err(Error::contract_violation(format!(
                "`{}` already responded ({:?})",
                self.command, existing.kind
            )));
        }
        self.response = Some(response);
        Ok(())
    }

    /// Gives the empty ok response if the handler never responded.
    pub(crate) fn ensure_response(&mut self) -> &Response {
        self.response.get_or_insert_with(Response::empty)
    }

    pub(crate) fn take_continuation(&mut self) -> Option<ContinuationFn> {
        self.continuation.take()
    }
}

/// The context of a line that continues an earlier response.
///
/// Derefs to a fresh [`CommandContext`] holding the new line, the same bound
/// arguments, and a link back to the previous context.
pub struct ContinuedContext {
    context: CommandContext,
    previous: Arc<CommandContext>,
}

impl fmt::Debug for ContinuedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuedContext")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ContinuedContext {
    /// Continues `previous` with a new line.
    #[must_use]
    pub fn new(previous: Arc<CommandContext>, raw_input: impl Into<String>, raw_args: Vec<String>) -> Self {
        let context = CommandContext {
            raw_input: raw_input.into(),
            raw_args,
            command: previous.command.clone(),
            arguments: Arc::clone(&previous.arguments),
            invoker: Arc::clone(&previous.invoker),
            response: None,
            continuation: None,
            previous: Some(Arc::clone(&previous)),
        };
        Self { context, previous }
    }

    /// The context whose response this line answers.
    #[must_use]
    pub fn previous(&self) -> &CommandContext {
        &self.previous
    }

    /// The previous context's response.
    #[must_use]
    pub fn previous_response(&self) -> Option<&Response> {
        self.previous.response()
    }

    /// Unwraps the inner context.
    #[must_use]
    pub fn into_context(self) -> CommandContext {
        self.context
    }
}

impl Deref for ContinuedContext {
    type Target = CommandContext;

    fn deref(&self) -> &CommandContext {
        &self.context
    }
}

impl DerefMut for ContinuedContext {
    fn deref_mut(&mut self) -> &mut CommandContext {
        &mut self.context
    }
}
