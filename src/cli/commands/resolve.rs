//! Resolution, expansion and search commands.

use tokio::runtime::Runtime;
use tracing::{info, warn};

use super::print_json;
use crate::model::MediaObject;
use crate::service::MediaService;

/// Resolve a URI and print the object as JSON
pub fn cmd_resolve(
    rt: &Runtime,
    service: &MediaService,
    uri: &str,
    cached: bool,
    live: bool,
    expand: bool,
) -> anyhow::Result<()> {
    let obj = if cached {
        match rt.block_on(service.resolve_cached(uri)) {
            Some(obj) => obj,
            None => anyhow::bail!("{uri} is not in the cache"),
        }
    } else {
        rt.block_on(async {
            let obj = if live {
                service.resolve_live(uri).await
            } else {
                service.resolve(uri).await
            };
            if expand {
                service.trigger_expansion(obj).await.finish().await
            } else {
                obj
            }
        })
    };
    print_object(&obj)
}

/// Search every provider and print the merged results
pub fn cmd_search(rt: &Runtime, service: &MediaService, query: &str) -> anyhow::Result<()> {
    let results = rt.block_on(service.aggregate_search(query));
    info!(
        query = %results.query,
        streams = results.streams.len(),
        creators = results.creators.len(),
        albums = results.albums.len(),
        "Search complete"
    );
    print_json(&results)
}

/// Resolve a URI, expand it and print the result
pub fn cmd_expand(rt: &Runtime, service: &MediaService, uri: &str) -> anyhow::Result<()> {
    let report = match rt.block_on(service.expand(uri)) {
        Ok(report) => report,
        Err(e) => return print_object(&e.into_object()),
    };

    info!(uri = %report.object.uri, resolved = report.resolved, "Expansion finished");
    for failed in &report.failed {
        warn!(uri = %failed, "Reference could not be resolved");
    }
    print_json(&report.object)?;
    report.into_result()?;
    Ok(())
}

/// Print the playback formats of a stream, starting at `format`
pub fn cmd_playback(
    rt: &Runtime,
    service: &MediaService,
    uri: &str,
    format: Option<u32>,
) -> anyhow::Result<()> {
    let formats = match rt.block_on(service.playback_formats(uri, format)) {
        Ok(formats) => formats,
        Err(e) => return print_object(&e.into_object()),
    };
    if formats.is_empty() {
        warn!(uri, "Stream has no playback formats");
    }
    print_json(&formats)
}

/// Print an object; error objects also fail the command.
fn print_object(obj: &MediaObject) -> anyhow::Result<()> {
    print_json(obj)?;
    if let Some(err) = obj.as_error() {
        anyhow::bail!("{} ({})", err.message, err.kind);
    }
    Ok(())
}
