//! Parley - command argument parsing and execution
//!
//! This crate re-exports all layers of the Parley system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: parley_runtime    — Registry, runners, conversations, console
//! Layer 1: parley_parser     — Scanner, type parsers, schemas, binder
//! Layer 0: parley_foundation — Core types (Value, ArgType, Invoker, Error)
//! ```

pub use parley_foundation as foundation;
pub use parley_parser as parser;
pub use parley_runtime as runtime;
