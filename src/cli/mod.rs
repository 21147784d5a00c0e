//! Command-line interface for mediaweave.
//!
//! Resolves, searches and expands media URIs against the configured
//! providers, and maintains the object cache.

mod commands;

pub use commands::{CacheAction, Cli, Commands, run_command};
