use miette::{Diagnostic, Result};
use thiserror::Error;

/// Reasons a single scraped record cannot become an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("event has no usable title")]
    MissingTitle,

    #[error("event '{0}' has no source URL")]
    MissingUrl(String),

    #[error("event '{0}' has no parsable date")]
    MissingDate(String),
}

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Network error: {0}")]
    #[diagnostic(code(pogocal::network))]
    Network(String),

    #[error("Parse error: {0}")]
    #[diagnostic(code(pogocal::parse))]
    Parse(#[from] ParseError),

    #[error("Authentication error: {0}")]
    #[diagnostic(
        code(pogocal::auth),
        help("run `pogocal --reauth` or `get_calendar_token` to authorize again")
    )]
    Auth(String),

    #[error("Calendar sync error: {0}")]
    #[diagnostic(code(pogocal::sync))]
    Sync(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(pogocal::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(pogocal::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(pogocal::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(pogocal::other))]
    Other(String),
}

impl Error {
    /// Whether the error means the stored credentials are no longer usable
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create network errors
pub fn network_error(message: &str) -> Error {
    Error::Network(message.to_string())
}

/// Helper to create authentication errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}

/// Helper to create calendar sync errors
pub fn sync_error(message: &str) -> Error {
    Error::Sync(message.to_string())
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
