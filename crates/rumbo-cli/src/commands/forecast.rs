use rumbo_core::{Coordinates, HybridProvider, NormalizedReading, MAX_FORECAST_HOURS};
use serde::Serialize;

use crate::cli::ForecastArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ForecastResponseData {
    bucket: String,
    hours: usize,
    forecast: Vec<NormalizedReading>,
}

pub async fn run(args: &ForecastArgs, provider: &HybridProvider) -> Result<CommandResult, CliError> {
    let coords = Coordinates::new(args.location.lat, args.location.lon)?;

    let served = provider.resolve_forecast(coords, args.hours).await?;
    let warnings = forecast_warnings(args.hours, served.data.len());
    let data = serde_json::to_value(ForecastResponseData {
        bucket: coords.bucket().key(),
        hours: served.data.len(),
        forecast: served.data.clone(),
    })?;

    Ok(CommandResult::from_served(data, &served).with_warnings(warnings))
}

fn forecast_warnings(requested: usize, served: usize) -> Vec<String> {
    let mut warnings = Vec::new();
    if requested > MAX_FORECAST_HOURS {
        warnings.push(format!(
            "requested {requested} hours; forecasts are capped at {MAX_FORECAST_HOURS}"
        ));
    }
    let expected = requested.min(MAX_FORECAST_HOURS);
    if served < expected {
        warnings.push(format!("only {served} of {expected} hourly entries available"));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_forecast_has_no_warnings() {
        assert!(forecast_warnings(12, 12).is_empty());
        assert!(forecast_warnings(0, 0).is_empty());
    }

    #[test]
    fn capped_and_short_forecasts_are_flagged() {
        let warnings = forecast_warnings(72, 30);

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("capped at 48"));
        assert!(warnings[1].contains("only 30 of 48"));
    }
}
