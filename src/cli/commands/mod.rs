//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `resolve`: URI resolution, expansion, search and playback formats
//! - `providers`: registered providers and their formats
//! - `cache`: object cache maintenance

mod cache;
mod providers;
mod resolve;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::service::MediaService;

pub use cache::{cmd_cache_clear, cmd_cache_evict, cmd_cache_gc, cmd_cache_stats};
pub use providers::{cmd_formats, cmd_providers};
pub use resolve::{cmd_expand, cmd_playback, cmd_resolve, cmd_search};

/// mediaweave CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, env = "MEDIAWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a URI such as `provider:album:id` or `search:query`
    Resolve {
        uri: String,
        /// Only consult the cache
        #[arg(long, conflicts_with = "live")]
        cached: bool,
        /// Skip the cache entirely
        #[arg(long)]
        live: bool,
        /// Expand the result before printing it
        #[arg(long, conflicts_with = "cached")]
        expand: bool,
    },
    /// Search every active provider
    Search {
        /// Words to search for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Resolve a URI and embed its references
    Expand { uri: String },
    /// List the formats a provider serves
    Formats { provider: String },
    /// List playback formats for a stream, best first
    Playback {
        uri: String,
        /// Preferred format id
        #[arg(long)]
        format: Option<u32>,
    },
    /// List registered providers
    Providers,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Maintain the object cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance actions
#[derive(Subcommand)]
pub enum CacheAction {
    /// Remove expired and unreadable entries
    Gc,
    /// Remove every entry
    Clear,
    /// Show entry count and size
    Stats,
    /// Remove the entry for one URI
    Evict { uri: String },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Init { force } = &cli.command {
        return cmd_init(cli.config.as_deref(), *force);
    }

    let config = match &cli.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => config::load()?,
    };

    // Cache maintenance needs no runtime
    if let Commands::Cache { action } = &cli.command {
        return match action {
            CacheAction::Gc => cmd_cache_gc(&config),
            CacheAction::Clear => cmd_cache_clear(&config),
            CacheAction::Stats => cmd_cache_stats(&config),
            CacheAction::Evict { uri } => cmd_cache_evict(&MediaService::from_config(&config)?, uri),
        };
    }

    let service = MediaService::from_config(&config)?;
    if service.registry().is_empty() {
        tracing::warn!("No active providers configured");
    }
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Resolve {
            uri,
            cached,
            live,
            expand,
        } => cmd_resolve(&rt, &service, uri, *cached, *live, *expand),
        Commands::Search { query } => cmd_search(&rt, &service, &query.join(" ")),
        Commands::Expand { uri } => cmd_expand(&rt, &service, uri),
        Commands::Formats { provider } => cmd_formats(&service, provider),
        Commands::Playback { uri, format } => cmd_playback(&rt, &service, uri, *format),
        Commands::Providers => cmd_providers(&config, &service),
        Commands::Cache { .. } | Commands::Init { .. } => Ok(()),
    }
}

/// Write the default config to `path` or the default location
pub fn cmd_init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_path().context("could not determine config directory")?,
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save(&Config::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a byte count for humans.
pub(crate) fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
