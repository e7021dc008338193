//! CLI module for tagloop - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the poll loop,
//! a single cycle, a plain read, and printing the effective configuration.

pub mod commands;

pub use commands::Cli;
