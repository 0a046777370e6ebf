//! Command runners.
//!
//! A [`CommandRunner`] executes one invocation of a handler under one of
//! three suspension strategies:
//!
//! - [`Execution::Sync`] runs the handler to completion inside
//!   [`run`](CommandRunner::run).
//! - [`Execution::SteppedUntilDone`] builds a [`Coroutine`] and resumes it
//!   once in `run` and once per [`poll`](CommandRunner::poll) until it
//!   reports [`Step::Done`].
//! - [`Execution::AwaitedOnWorker`] hands an owned [`WorkerRequest`] to the
//!   handler and spawns the returned future on the worker runtime. `poll`
//!   picks up the result on the calling thread.
//!
//! Whatever the strategy, handler errors and panics stop here: they are
//! logged and turned into a failure response. The completion callback runs
//! exactly once, on the thread that called `run` or `poll`.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use parley_foundation::{Error, Invoker};
use parley_parser::ArgumentCollection;
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::context::CommandContext;
use crate::response::Response;

/// Lifecycle of a runner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunnerState {
    /// Ready to run.
    #[default]
    Idle,
    /// Suspended between steps or waiting for a worker.
    InProgress,
    /// Completed; the completion callback has fired.
    Finished,
}

/// What a coroutine step reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Resume again next tick.
    Yield,
    /// The work is complete.
    Done,
}

/// A resumable handler body, advanced one step per tick.
pub trait Coroutine: Send {
    /// Runs until the next suspension point.
    ///
    /// # Errors
    ///
    /// An error ends the coroutine with a failure response.
    fn resume(&mut self, ctx: &mut CommandContext) -> anyhow::Result<Step>;
}

impl<F> Coroutine for F
where
    F: FnMut(&mut CommandContext) -> anyhow::Result<Step> + Send,
{
    fn resume(&mut self, ctx: &mut CommandContext) -> anyhow::Result<Step> {
        self(ctx)
    }
}

/// An owned snapshot of a context for work done off the main loop.
#[derive(Clone)]
pub struct WorkerRequest {
    /// Canonical command name.
    pub command: String,
    /// The full input line.
    pub raw_input: String,
    /// Raw argument strings.
    pub raw_args: Vec<String>,
    /// The bound arguments.
    pub arguments: Arc<ArgumentCollection>,
    /// Who is running the command.
    pub invoker: Arc<dyn Invoker>,
}

impl WorkerRequest {
    fn snapshot(ctx: &CommandContext) -> Self {
        Self {
            command: ctx.command().to_owned(),
            raw_input: ctx.raw_input().to_owned(),
            raw_args: ctx.raw_args().to_vec(),
            arguments: ctx.shared_arguments(),
            invoker: ctx.shared_invoker(),
        }
    }
}

impl fmt::Debug for WorkerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRequest")
            .field("command", &self.command)
            .field("raw_input", &self.raw_input)
            .field("invoker", &self.invoker.name())
            .finish_non_exhaustive()
    }
}

/// Handler run to completion on the main loop.
pub type SyncHandler = Arc<dyn Fn(&mut CommandContext) -> anyhow::Result<()> + Send + Sync>;

/// Builds a fresh coroutine for each invocation.
pub type CoroutineFactory = Arc<dyn Fn(&CommandContext) -> Box<dyn Coroutine> + Send + Sync>;

/// Future produced by a worker handler.
pub type WorkerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Response>> + Send + 'static>>;

/// Handler whose work runs on the worker runtime.
pub type WorkerHandler = Arc<dyn Fn(WorkerRequest) -> WorkerFuture + Send + Sync>;

/// Called once with the finished context.
pub type CompletionFn = Box<dyn FnOnce(CommandContext) + Send>;

/// How a command's handler suspends.
#[derive(Clone)]
pub enum Execution {
    /// Runs to completion when dispatched.
    Sync(SyncHandler),
    /// Advances one step per tick.
    SteppedUntilDone(CoroutineFactory),
    /// Runs on a background worker; the result is applied on the main loop.
    AwaitedOnWorker(WorkerHandler),
}

impl Execution {
    /// Wraps a synchronous handler.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&mut CommandContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(handler))
    }

    /// Wraps a coroutine factory.
    pub fn stepped<F, C>(factory: F) -> Self
    where
        F: Fn(&CommandContext) -> C + Send + Sync + 'static,
        C: Coroutine + 'static,
    {
        Self::SteppedUntilDone(Arc::new(move |ctx: &CommandContext| {
            Box::new(factory(ctx)) as Box<dyn Coroutine>
        }))
    }

    /// Wraps an async handler.
    pub fn worker<F, Fut>(handler: F) -> Self
    where
        F: Fn(WorkerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        Self::AwaitedOnWorker(Arc::new(move |request| Box::pin(handler(request)) as WorkerFuture))
    }

    /// Short name of the strategy, for logs.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::SteppedUntilDone(_) => "stepped",
            Self::AwaitedOnWorker(_) => "worker",
        }
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Execution::{}", self.strategy())
    }
}

enum InFlight {
    Stepping {
        coroutine: Box<dyn Coroutine>,
        context: CommandContext,
    },
    Awaiting {
        receiver: oneshot::Receiver<anyhow::Result<Response>>,
        context: CommandContext,
        started: Instant,
        warned: bool,
    },
}

/// Executes one invocation at a time of a command's handler.
pub struct CommandRunner {
    execution: Execution,
    state: RunnerState,
    in_flight: Option<InFlight>,
    completion: Option<CompletionFn>,
    slow_task_threshold: Duration,
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("execution", &self.execution)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    /// Creates an idle runner.
    #[must_use]
    pub fn create(execution: Execution) -> Self {
        Self {
            execution,
            state: RunnerState::Idle,
            in_flight: None,
            completion: None,
            slow_task_threshold: Duration::from_secs(5),
        }
    }

    /// Sets how long a worker task may run before a warning is logged.
    #[must_use]
    pub fn with_slow_task_threshold(mut self, threshold: Duration) -> Self {
        self.slow_task_threshold = threshold;
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RunnerState {
        self.state
    }

    /// The strategy this runner executes.
    #[must_use]
    pub const fn execution(&self) -> &Execution {
        &self.execution
    }

    /// Returns true while suspended.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.state == RunnerState::InProgress
    }

    /// Returns true once the completion callback has fired.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == RunnerState::Finished
    }

    /// Reports whether the runner is done (it is finished).
    #[must_use]
    pub fn should_continue(&self) -> bool {
        self.is_finished()
    }

    /// Whether a finished runner may be reused for the next invocation.
    ///
    /// Worker runners are not reused.
    #[must_use]
    pub const fn should_pool(&self) -> bool {
        matches!(self.execution, Execution::Sync(_) | Execution::SteppedUntilDone(_))
    }

    /// Returns a finished runner to idle so it can be reused.
    ///
    /// Returns false (and does nothing) unless the runner is finished.
    pub fn reset(&mut self) -> bool {
        if !self.is_finished() {
            return false;
        }
        self.state = RunnerState::Idle;
        self.in_flight = None;
        self.completion = None;
        true
    }

    /// Starts executing `context`.
    ///
    /// Sync handlers finish before this returns. Stepped handlers run their
    /// first step. Worker handlers are spawned on `workers`. Calls while the
    /// runner is in progress are ignored.
    pub fn run(&mut self, mut context: CommandContext, completion: CompletionFn, workers: &Handle) {
        if self.is_in_progress() {
            tracing::debug!(command = %context.command(), "runner busy, run ignored");
            return;
        }
        self.state = RunnerState::InProgress;
        self.completion = Some(completion);

        match self.execution.clone() {
            Execution::Sync(handler) => {
                if let Err(err) = guarded(|| handler(&mut context)) {
                    fault(&mut context, &err);
                }
                self.finish(context);
            }
            Execution::SteppedUntilDone(factory) => match guarded(|| Ok(factory(&context))) {
                Ok(coroutine) => self.step(coroutine, context),
                Err(err) => {
                    fault(&mut context, &err);
                    self.finish(context);
                }
            },
            Execution::AwaitedOnWorker(handler) => {
                let request = WorkerRequest::snapshot(&context);
                match guarded(|| Ok(handler(request))) {
                    Ok(future) => {
                        let (sender, receiver) = oneshot::channel();
                        workers.spawn(async move {
                            let _ = sender.send(future.await);
                        });
                        self.in_flight = Some(InFlight::Awaiting {
                            receiver,
                            context,
                            started: Instant::now(),
                            warned: false,
                        });
                    }
                    Err(err) => {
                        fault(&mut context, &err);
                        self.finish(context);
                    }
                }
            }
        }
    }

    /// Advances an in-progress runner by one tick.
    pub fn poll(&mut self) {
        if !self.is_in_progress() {
            return;
        }
        match self.in_flight.take() {
            Some(InFlight::Stepping { coroutine, context }) => self.step(coroutine, context),
            Some(InFlight::Awaiting {
                mut receiver,
                mut context,
                started,
                mut warned,
            }) => match receiver.try_recv() {
                Ok(result) => {
                    let applied = result.and_then(|response| context.respond(response).map_err(anyhow::Error::from));
                    if let Err(err) = applied {
                        fault(&mut context, &err);
                    }
                    self.finish(context);
                }
                Err(TryRecvError::Empty) => {
                    let elapsed = started.elapsed();
                    if !warned && elapsed >= self.slow_task_threshold {
                        tracing::warn!(
                            command = %context.command(),
                            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                            "worker task is running slowly"
                        );
                        warned = true;
                    }
                    self.in_flight = Some(InFlight::Awaiting {
                        receiver,
                        context,
                        started,
                        warned,
                    });
                }
                Err(TryRecvError::Closed) => {
                    fault(&mut context, &anyhow!("worker task panicked or was dropped"));
                    self.finish(context);
                }
            },
            None => {}
        }
    }

    fn step(&mut self, mut coroutine: Box<dyn Coroutine>, mut context: CommandContext) {
        match guarded(|| coroutine.resume(&mut context)) {
            Ok(Step::Yield) => self.in_flight = Some(InFlight::Stepping { coroutine, context }),
            Ok(Step::Done) => self.finish(context),
            Err(err) => {
                fault(&mut context, &err);
                self.finish(context);
            }
        }
    }

    fn finish(&mut self, mut context: CommandContext) {
        context.ensure_response();
        self.state = RunnerState::Finished;
        self.in_flight = None;
        if let Some(completion) = self.completion.take() {
            completion(context);
        }
    }
}

/// Runs handler code, turning a panic into an error.
pub(crate) fn guarded<T>(f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Logs a handler failure and answers with it, unless already answered.
pub(crate) fn fault(context: &mut CommandContext, err: &anyhow::Error) {
    let error = Error::runner_fault(context.command(), format!("{err:#}"));
    tracing::error!(command = %context.command(), error = %err, "command handler failed");
    if !context.has_responded() {
        let _ = context.respond_fail(error.to_string());
    }
}
