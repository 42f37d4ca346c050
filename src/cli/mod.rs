//! Command-line interface for batchio
//!
//! Parsing lives in [`commands`], styled terminal output in [`output`].

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
