use rumbo_core::{ProviderId, RumboConfig};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SourceStatus {
    priority: usize,
    name: &'static str,
    requires_api_key: bool,
    configured: bool,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceStatus>,
    fresh_ttl_secs: u64,
    stale_ceiling_secs: u64,
    tides: &'static str,
}

pub fn run(config: &RumboConfig) -> Result<CommandResult, CliError> {
    let sources = config
        .provider_order
        .iter()
        .enumerate()
        .map(|(index, provider)| status(config, index + 1, *provider))
        .collect::<Vec<_>>();

    let warnings = sources
        .iter()
        .filter(|source| !source.configured)
        .map(|source| format!("{} is skipped: no API key configured", source.name))
        .collect::<Vec<_>>();

    let tides = if config.worldtides_api_key.is_some() {
        "worldtides"
    } else {
        "astronomical"
    };

    let data = serde_json::to_value(SourcesResponseData {
        sources,
        fresh_ttl_secs: config.cache_policy.fresh_ttl.as_secs(),
        stale_ceiling_secs: config.cache_policy.stale_ceiling.as_secs(),
        tides,
    })?;

    let source_chain = config
        .provider_order
        .iter()
        .map(|provider| provider.as_str().to_owned())
        .collect();

    Ok(CommandResult::ok(data, source_chain).with_warnings(warnings))
}

fn status(config: &RumboConfig, priority: usize, provider: ProviderId) -> SourceStatus {
    SourceStatus {
        priority,
        name: provider.as_str(),
        requires_api_key: provider.requires_api_key(),
        configured: config.is_configured(provider),
    }
}
