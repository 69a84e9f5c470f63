//! CLI module for fluxlist - command-line interface and subcommands.
//!
//! Inspects and maintains the lists persisted by a `ListStore`.

pub mod commands;

pub use commands::Cli;
