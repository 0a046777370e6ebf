//! Core values, argument types, and errors for Parley.
//!
//! This crate provides:
//! - [`Value`] - The value an argument binds to
//! - [`ArgType`] - Semantic shape of a command parameter
//! - [`Invoker`] - The identity a command runs on behalf of
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod invoker;
pub mod types;
pub mod value;

pub use error::{Error, ErrorContext, ErrorKind};
pub use invoker::{ConsoleInvoker, Invoker, InvokerProperties, NoProperties, PropertySource};
pub use types::{ArgType, EnumType};
pub use value::{EnumValue, Opaque, Value};

/// Result type alias using Parley's error type.
pub type Result<T> = std::result::Result<T, Error>;
