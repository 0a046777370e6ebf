//! Argument scanning, type parsing, and binding for Parley.
//!
//! This crate turns the text after a command name into a populated
//! [`ArgumentCollection`] for one of the command's overloads.
//!
//! # Architecture
//!
//! ```text
//! "tag [red, green] ${home}"
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ SPLIT           │  → ["tag", "[red, green]", "${home}"]
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ OVERLOAD        │  → overload #1 (most required arguments that fit)
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ SCAN            │  → Collection[Plain(red), Plain(green)], Property(home)
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ PARSE/VALIDATE  │  → {colors: ["red", "green"], place: "spawn"}
//! └─────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`token`] - Structured argument tokens
//! - [`scanner`] - Line splitting and token scanning
//! - [`parsers`] - Type parser registry
//! - [`validator`] - Value validators
//! - [`argument`] - Argument declarations and overload schemas
//! - [`arguments`] - Bound argument collections and their pool
//! - [`overload`] - Overload selection
//! - [`binder`] - Binding raw arguments to an overload

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod argument;
pub mod arguments;
pub mod binder;
pub mod overload;
pub mod parsers;
pub mod scanner;
pub mod token;
pub mod validator;

pub use argument::{ArgumentBuilder, ArgumentDefinition, ArgumentSchema, ArgumentSpec, SchemaError};
pub use arguments::{ArgumentCollection, ArgumentPool, BoundArgument};
pub use binder::{BindRequest, Bound, bind, usage_lines};
pub use overload::{OverloadMatch, feasible_overloads, select_overload};
pub use parsers::{ParserRegistry, ResolvedParser, ValueParser};
pub use scanner::{RawArgument, Scanner, SplitLine, split_arguments, split_line};
pub use token::Token;
pub use validator::{
    CollectionSize, FloatRange, IntRange, OneOf, RequiresPermission, StringLength,
    ValidationContext, Validator,
};
