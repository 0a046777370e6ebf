//! Command registry, runners, conversations, and the console for Parley.
//!
//! The [`CommandEngine`] is the entry point: register commands, hand it
//! lines with [`execute`](CommandEngine::execute), and call
//! [`tick`](CommandEngine::tick) once per host cycle.
//!
//! # Architecture
//!
//! ```text
//! execute(line, invoker)
//!          │
//!          ├── open conversation? ──► continuation callback ──► Response
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ REGISTRY        │  → command by name or alias, permission check
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ BIND            │  → ArgumentCollection (pooled)
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ RUNNER          │  sync ─────────────► Completed(Response)
//! │                 │  stepped / worker ─► Pending(RunId)
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ SCHEDULER       │  tick() → Vec<Completion>
//! └─────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`response`] - Terminal responses
//! - [`context`] - Per-invocation context and conversation chains
//! - [`runner`] - Execution strategies and the runner state machine
//! - [`scheduler`] - Per-tick driving of suspended runners
//! - [`registry`] - Command definitions and lookup
//! - [`config`] - Engine configuration
//! - [`engine`] - Dispatch
//! - [`editor`] - Line editor abstraction
//! - [`console`] - Interactive console

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod console;
pub mod context;
pub mod editor;
pub mod engine;
pub mod registry;
pub mod response;
pub mod runner;
pub mod scheduler;

pub use config::EngineConfig;
pub use console::Console;
pub use context::{CommandContext, ContinuationFn, ContinuedContext};
pub use editor::{LineEditor, ReadResult, RustylineEditor};
pub use engine::{CommandEngine, Completion, Dispatch};
pub use registry::{CommandDefinition, CommandRegistry, RegisteredCommand};
pub use response::{Response, ResponseKind};
pub use runner::{
    CommandRunner, CompletionFn, Coroutine, CoroutineFactory, Execution, RunnerState, Step, SyncHandler, WorkerFuture,
    WorkerHandler, WorkerRequest,
};
pub use scheduler::{RunId, Scheduler};
