//! Error types for the Parley system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//!
//! Scan and bind failures are ordinary outcomes of user-typed input and are
//! carried around as values. Schema errors surface from registration, and
//! runner faults are produced at the runner boundary from handler failures.

use std::fmt;

use thiserror::Error;

/// The main error type for Parley operations.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a scan error for a malformed fragment at a byte position.
    #[must_use]
    pub fn scan(message: impl Into<String>, fragment: impl Into<String>, position: usize) -> Self {
        Self::new(ErrorKind::Scan {
            message: message.into(),
            fragment: fragment.into(),
            position,
        })
    }

    /// Creates a schema error raised while registering a command.
    #[must_use]
    pub fn schema(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema {
            command: command.into(),
            message: message.into(),
        })
    }

    /// Creates a bind error for a single argument.
    #[must_use]
    pub fn bind(
        argument: impl Into<String>,
        expected: impl Into<String>,
        raw: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Bind {
            argument: argument.into(),
            expected: expected.into(),
            raw: raw.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unknown command error.
    #[must_use]
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownCommand(name.into()))
    }

    /// Creates a contract violation error.
    #[must_use]
    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContractViolation(message.into()))
    }

    /// Creates a runner fault from a failed or panicking handler.
    #[must_use]
    pub fn runner_fault(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RunnerFault {
            command: command.into(),
            message: message.into(),
        })
    }

    /// Byte position in the input line, for scan errors.
    #[must_use]
    pub const fn scan_position(&self) -> Option<usize> {
        match self.kind {
            ErrorKind::Scan { position, .. } => Some(position),
            _ => None,
        }
    }

    /// Returns true if this error was caused by malformed user input
    /// (scan, bind, overload, unknown command) rather than a programming error.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Scan { .. }
                | ErrorKind::Bind { .. }
                | ErrorKind::NoOverload { .. }
                | ErrorKind::UnknownCommand(_)
                | ErrorKind::PermissionDenied { .. }
        )
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Clone, Debug, Error)]
pub enum ErrorKind {
    /// Malformed or unterminated delimiter in raw input.
    #[error("scan error at {position}: {message} (near `{fragment}`)")]
    Scan {
        /// Description of the problem.
        message: String,
        /// The offending text.
        fragment: String,
        /// Byte offset into the raw input line.
        position: usize,
    },

    /// A command author mis-declared an overload.
    #[error("invalid schema for `{command}`: {message}")]
    Schema {
        /// Command whose registration failed.
        command: String,
        /// Description of the problem.
        message: String,
    },

    /// An argument failed its parser or a validator.
    #[error("invalid value `{raw}` for <{argument}: {expected}>: {reason}")]
    Bind {
        /// Argument name.
        argument: String,
        /// Expected type description.
        expected: String,
        /// Raw text that failed.
        raw: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// No overload accepts the number of arguments given.
    #[error("wrong number of arguments ({provided})\n{usage}")]
    NoOverload {
        /// Number of raw arguments provided.
        provided: usize,
        /// Usage lines of every overload.
        usage: String,
    },

    /// No command is registered under this name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The invoker lacks the permission the command requires.
    #[error("permission denied: `{command}` requires {permission}")]
    PermissionDenied {
        /// Command that was refused.
        command: String,
        /// Permission the command requires.
        permission: String,
    },

    /// A handler body failed or panicked.
    #[error("command `{command}` failed: {message}")]
    RunnerFault {
        /// Command whose handler faulted.
        command: String,
        /// Failure description.
        message: String,
    },

    /// An API contract was broken by the caller (e.g. responding twice).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Command being executed, if known.
    pub command: Option<String>,
    /// The raw input line.
    pub input: Option<String>,
    /// Notes added while the error propagated.
    pub notes: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the command name.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Sets the raw input line.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Adds a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(command) = &self.command {
            write!(f, "in `{command}`")?;
        }
        if let Some(input) = &self.input {
            write!(f, " (input: {input:?})")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}
