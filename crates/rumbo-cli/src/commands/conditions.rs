use rumbo_core::{Coordinates, HybridProvider, NormalizedReading};
use serde::Serialize;

use crate::cli::LocationArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ConditionsResponseData {
    bucket: String,
    conditions: NormalizedReading,
}

pub async fn run(args: &LocationArgs, provider: &HybridProvider) -> Result<CommandResult, CliError> {
    let coords = Coordinates::new(args.lat, args.lon)?;

    let served = provider.resolve_conditions(coords).await?;
    let data = serde_json::to_value(ConditionsResponseData {
        bucket: coords.bucket().key(),
        conditions: served.data.clone(),
    })?;

    Ok(CommandResult::from_served(data, &served))
}
