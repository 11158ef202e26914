use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Markup error: {0}")]
    #[diagnostic(code(patcal::markup))]
    Markup(String),

    #[error("Store error: {0}")]
    #[diagnostic(code(patcal::store))]
    Store(String),

    #[error("Calendar error: {0}")]
    #[diagnostic(code(patcal::calendar))]
    Calendar(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(patcal::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(patcal::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(patcal::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(patcal::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(patcal::other))]
    Other(String),
}

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

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Markup(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type PatternResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Invalid environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create markup errors
pub fn markup_error(message: &str) -> Error {
    Error::Markup(message.to_string())
}

/// Helper to create store errors
pub fn store_error(message: &str) -> Error {
    Error::Store(message.to_string())
}

/// Helper to create calendar errors
pub fn calendar_error(message: &str) -> Error {
    Error::Calendar(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
