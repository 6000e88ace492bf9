use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    #[diagnostic(code(calagent::invalid_date))]
    InvalidDate,

    #[error("Invalid time format. Use HH:MM.")]
    #[diagnostic(code(calagent::invalid_time))]
    InvalidTime,

    #[error("Missing required argument '{0}'")]
    #[diagnostic(code(calagent::missing_argument))]
    MissingArgument(String),

    #[error("Unknown operation '{0}'")]
    #[diagnostic(code(calagent::unknown_operation))]
    UnknownOperation(String),

    #[error("Missing client configuration: {0}")]
    #[diagnostic(code(calagent::missing_client_config))]
    MissingClientConfig(String),

    #[error("Authorization exchange failed: {0}")]
    #[diagnostic(code(calagent::auth_exchange))]
    AuthExchangeFailed(String),

    #[error("Unsupported provider '{0}'")]
    #[diagnostic(code(calagent::unsupported_provider))]
    Unsupported(String),

    #[error("Malformed shorthand command: {0}")]
    #[diagnostic(code(calagent::malformed_shorthand))]
    MalformedShorthand(String),

    #[error("Could not resolve a date in '{0}'")]
    #[diagnostic(code(calagent::unresolved_date))]
    UnresolvedDate(String),

    #[error("Tool execution failed: {0}")]
    #[diagnostic(code(calagent::execution_failed))]
    ExecutionFailed(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(calagent::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(calagent::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(calagent::serialization))]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// HTTP status the transport shim should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidDate
            | Error::InvalidTime
            | Error::MissingArgument(_)
            | Error::UnknownOperation(_)
            | Error::Unsupported(_)
            | Error::MalformedShorthand(_)
            | Error::UnresolvedDate(_) => 400,
            _ => 500,
        }
    }
}

/// Type alias for Result with our Error type
pub type CalResult<T> = Result<T, Error>;

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create authorization exchange errors
pub fn auth_error(message: &str) -> Error {
    Error::AuthExchangeFailed(message.to_string())
}

/// Helper to create execution errors
pub fn execution_error(message: &str) -> Error {
    Error::ExecutionFailed(message.to_string())
}
