//! Command responses.

use std::fmt;

use parley_foundation::Error;

/// How an invocation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// The command succeeded.
    Ok,
    /// The command failed.
    Fail,
    /// The command waits for the next line of the conversation.
    Continued,
}

/// The single terminal response of one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Outcome.
    pub kind: ResponseKind,
    /// Text for the front-end to render.
    pub message: String,
}

impl Response {
    /// A success response.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Ok,
            message: message.into(),
        }
    }

    /// A failure response.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Fail,
            message: message.into(),
        }
    }

    /// A prompt for the next line of a conversation.
    #[must_use]
    pub fn continued(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Continued,
            message: message.into(),
        }
    }

    /// The response given to a handler that never responded.
    #[must_use]
    pub fn empty() -> Self {
        Self::ok(String::new())
    }

    /// Returns true for [`ResponseKind::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.kind == ResponseKind::Ok
    }

    /// Returns true for [`ResponseKind::Fail`].
    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.kind == ResponseKind::Fail
    }

    /// Returns true for [`ResponseKind::Continued`].
    #[must_use]
    pub fn is_continued(&self) -> bool {
        self.kind == ResponseKind::Continued
    }
}

impl From<&Error> for Response {
    fn from(error: &Error) -> Self {
        Self::fail(error.to_string())
    }
}

impl From<Error> for Response {
    fn from(error: Error) -> Self {
        Self::from(&error)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResponseKind::Ok => write!(f, "{}", self.message),
            ResponseKind::Fail => write!(f, "error: {}", self.message),
            ResponseKind::Continued => write!(f, "{} ...", self.message),
        }
    }
}
