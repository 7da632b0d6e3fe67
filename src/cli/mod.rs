//! CLI module for toolchat - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
