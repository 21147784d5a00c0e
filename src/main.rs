//! mediaweave - a media metadata resolver.
//!
//! Addresses creators, albums, streams and search results from several
//! providers through one `provider:type:id` URI scheme, caches resolved
//! objects on disk and expands nested references in place.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod expansion;
pub mod handler;
pub mod model;
pub mod resolver;
pub mod service;
#[cfg(test)]
pub mod test_utils;
pub mod uri;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mediaweave=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
