//! End-to-end tests across all layers
//!
//! Lines go in as text and come out as responses, with parsers, overloads,
//! runners, and conversations all in play.

mod console;
mod scenarios;
