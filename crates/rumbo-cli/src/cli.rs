//! CLI argument definitions for rumbo.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `conditions` | Current marine conditions at a coordinate |
//! | `forecast` | Hourly forecast at a coordinate |
//! | `sources` | Configured provider chain and key status |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! rumbo conditions --lat -38.014 --lon -57.53
//! rumbo forecast --lat -38.014 --lon -57.53 --hours 24 --pretty
//! rumbo sources --format table
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

use rumbo_core::DEFAULT_FORECAST_HOURS;

/// Marine weather for stand-up paddling spots.
///
/// Queries Stormglass, Windy, OpenWeather and Open-Meteo in priority order,
/// caching results per ~1 km coordinate bucket.
#[derive(Debug, Parser)]
#[command(
    name = "rumbo",
    author,
    version,
    about = "Marine weather with provider fallback and caching",
    long_about = "rumbo resolves current conditions and hourly forecasts from a chain of \
weather providers. The first provider returning usable data wins; when all of them \
fail, a recent cached result is served instead.\n\
\n\
API keys are read from the environment (or a .env file):\n\
  RUMBO_STORMGLASS_API_KEY, RUMBO_WINDY_API_KEY,\n\
  RUMBO_OPENWEATHER_API_KEY, RUMBO_WORLDTIDES_API_KEY"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    Table,
    /// Single JSON object output.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Current conditions at a coordinate.
    Conditions(LocationArgs),
    /// Hourly forecast at a coordinate.
    Forecast(ForecastArgs),
    /// List the provider chain in priority order.
    Sources,
}

#[derive(Debug, Clone, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees, [-90, 90].
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees, [-180, 180].
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

#[derive(Debug, Clone, Args)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Number of hourly entries (capped at 48).
    #[arg(long, default_value_t = DEFAULT_FORECAST_HOURS)]
    pub hours: usize,
}
