//! Provider listing commands.

use crate::config::Config;
use crate::service::MediaService;

use super::print_json;

/// List configured providers and whether they are registered
pub fn cmd_providers(config: &Config, service: &MediaService) -> anyhow::Result<()> {
    if config.providers.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    for provider in &config.providers {
        let status = if service.registry().get(&provider.name).is_some() {
            "active"
        } else {
            "inactive"
        };
        println!(
            "{:<16} {:<10} {:<8} {}",
            provider.name,
            provider.kind.as_str(),
            status,
            provider.path.display()
        );
    }
    Ok(())
}

/// Print the formats a provider serves
pub fn cmd_formats(service: &MediaService, provider: &str) -> anyhow::Result<()> {
    let Some(handler) = service.registry().get(provider) else {
        anyhow::bail!("no active provider named {provider}");
    };
    print_json(&handler.format_list())
}
