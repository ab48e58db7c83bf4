//! Error types for the image handler

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for handler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running the handler
#[derive(Error, Debug)]
pub enum Error {
    /// Both an HTML and a component template were supplied
    #[error("Ambigious template provided. You must provide either `html` or `component` template.")]
    AmbiguousTemplate,

    /// Neither template kind was supplied
    #[error("No template was provided.")]
    MissingTemplate,

    /// The configured strategy is not one of the known values
    #[error(
        "Unknown strategy provided: {0}. Possible values: {values}",
        values = crate::Strategy::POSSIBLE_VALUES.join(",")
    )]
    UnknownStrategy(String),

    /// The request does not match the declared parameter strategy
    #[error("{message}")]
    StrategyMismatch { status: StatusCode, message: String },

    /// Request parameters could not be decoded
    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),

    /// The template function failed
    #[error("Template failed: {0}")]
    TemplateError(String),

    /// Failed to launch the browser or open the page
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load markup or capture the page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The JSON body exceeded the accepted size
    #[error("Request body is larger than {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status used when this error aborts a request
    pub fn status(&self) -> StatusCode {
        match self {
            Error::StrategyMismatch { status, .. } => *status,
            Error::InvalidParams(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidParams(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
