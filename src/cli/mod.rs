//! CLI module for remindr - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
