//! CLI error types.

use std::fmt;

use asl_client::AslError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration.
    Config(String),
    /// Output formatting error.
    Format(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// Log client error.
    Log(AslError),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::InvalidArgument(msg) => f.write_str(msg),
            Self::Log(e) => write!(f, "log error: {e}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Log(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<AslError> for CliError {
    fn from(err: AslError) -> Self {
        Self::Log(err)
    }
}
