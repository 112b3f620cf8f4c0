//! Command-line interface
//!
//! # Commands
//!
//! - `replay` - Fetch a window of records through a persisted source
//! - `show` - Inspect a persisted source
//! - `validate` - Parse a source file and re-check its invariants
//!
//! Analysis itself is a library entry point (`analyzer::analyze`): it
//! needs a live browser driver and an LLM client, which the embedding
//! application provides.

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
