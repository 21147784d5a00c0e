//! Object cache maintenance commands.

use tracing::info;

use crate::cache::{ObjectCache, TtlPolicy};
use crate::config::Config;
use crate::service::MediaService;

use super::human_size;

fn open(config: &Config) -> ObjectCache {
    ObjectCache::new(&config.cache.dir, TtlPolicy::from_config(&config.cache))
}

/// Remove expired and unreadable entries
pub fn cmd_cache_gc(config: &Config) -> anyhow::Result<()> {
    let report = open(config).collect_garbage();
    info!(
        scanned = report.scanned,
        expired = report.expired,
        corrupt = report.corrupt,
        "Garbage collection finished"
    );
    println!(
        "Scanned {} entries: removed {} expired, {} unreadable.",
        report.scanned, report.expired, report.corrupt
    );
    Ok(())
}

/// Remove every cached entry
pub fn cmd_cache_clear(config: &Config) -> anyhow::Result<()> {
    let cache = open(config);
    let count = cache.entry_count();
    cache.clear()?;
    println!("Removed {count} entries from {}.", cache.root().display());
    Ok(())
}

/// Show cache location, entry count and size
pub fn cmd_cache_stats(config: &Config) -> anyhow::Result<()> {
    let cache = open(config);
    println!("Location: {}", cache.root().display());
    println!("Entries:  {}", cache.entry_count());
    println!("Size:     {}", human_size(cache.size_bytes()));
    Ok(())
}

/// Remove the cached entry for one URI
pub fn cmd_cache_evict(service: &MediaService, uri: &str) -> anyhow::Result<()> {
    if service.evict(uri)? {
        println!("Evicted {uri}.");
    } else {
        println!("{uri} was not cached.");
    }
    Ok(())
}
