use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] rumbo_core::ValidationError),

    #[error("configuration error: {0}")]
    Config(#[from] rumbo_core::ConfigError),

    #[error("http client setup failed: {0}")]
    HttpSetup(#[from] rumbo_core::HttpError),

    #[error(transparent)]
    Unavailable(#[from] rumbo_core::ServiceUnavailable),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::HttpSetup(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
            // EX_TEMPFAIL
            Self::Unavailable(_) => 75,
        }
    }
}
