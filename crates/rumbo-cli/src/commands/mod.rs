mod conditions;
mod forecast;
mod sources;

use rumbo_core::{HybridProvider, Origin, ProviderFailure, RumboConfig, Served};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::{Envelope, Meta};

pub struct CommandResult {
    pub data: Value,
    pub origin: &'static str,
    pub warnings: Vec<String>,
    pub errors: Vec<ProviderFailure>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub source_chain: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<String>) -> Self {
        Self {
            data,
            origin: "local",
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            source_chain,
        }
    }

    /// Carries the trace of a hybrid resolution over to the response.
    pub fn from_served<T>(data: Value, served: &Served<T>) -> Self {
        let mut result = Self::ok(data, served.source_chain.clone())
            .with_origin(served.origin.as_str())
            .with_errors(served.failures.clone())
            .with_latency(served.latency_ms)
            .with_cache_hit(served.origin.is_cache_hit());

        if let Origin::StaleCache { age_minutes } = served.origin {
            result = result.with_warning(format!(
                "every provider failed; serving cached data from {age_minutes} minute(s) ago"
            ));
        }
        if let Origin::Provider(provider) = &served.origin {
            if !served.failures.is_empty() {
                result = result.with_warning(format!(
                    "served by fallback provider '{provider}' after {} failed attempt(s)",
                    served.failures.len()
                ));
            }
        }
        result
    }

    pub fn with_origin(mut self, origin: &'static str) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<ProviderFailure>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let config = RumboConfig::from_env()?;

    let command_result = match &cli.command {
        Command::Conditions(args) => {
            let provider = build_provider(config)?;
            conditions::run(args, &provider).await?
        }
        Command::Forecast(args) => {
            let provider = build_provider(config)?;
            forecast::run(args, &provider).await?
        }
        Command::Sources => sources::run(&config)?,
    };

    let CommandResult {
        data,
        origin,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        source_chain,
    } = command_result;

    let mut meta = Meta::new(origin, source_chain, latency_ms, cache_hit);
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope { meta, data, errors })
}

fn build_provider(config: RumboConfig) -> Result<HybridProvider, CliError> {
    let provider = HybridProvider::builder().with_config(config).build()?;
    debug!(chain = ?provider.source_names(), "provider chain ready");
    Ok(provider)
}
