//! Error types for the log client.

use thiserror::Error;

/// Broad classification of an [`AslError`].
///
/// Callers that only care about the category of failure (wrong argument
/// shape, semantically invalid value, missing key, facility failure) can
/// match on this instead of the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The argument had the wrong shape (bad text, wrong message kind).
    Type,
    /// The argument was well-formed but not acceptable (unknown code, closed client).
    Value,
    /// A lookup of an attribute that is not present.
    Key,
    /// A failure reported by the facility or the operating system.
    Os,
}

/// Errors that can occur in the log client.
#[derive(Debug, Error)]
pub enum AslError {
    /// An argument did not have the required shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A message kind code that is neither a record nor a query.
    #[error("invalid message kind: {0}")]
    InvalidKind(u32),

    /// A message of the wrong kind was passed.
    #[error("expected a {expected} message, got a {actual} message")]
    WrongKind {
        /// Kind the operation requires.
        expected: &'static str,
        /// Kind that was supplied.
        actual: &'static str,
    },

    /// A query operator code with an unrecognized base comparison.
    #[error("invalid query operator: {0:#x}")]
    InvalidOperator(u32),

    /// A severity level outside 0..=7.
    #[error("invalid severity level: {0}")]
    InvalidLevel(i64),

    /// A descriptor direction that is neither read nor write.
    #[error("invalid descriptor direction: {0}")]
    InvalidDirection(i32),

    /// A regular expression in a query failed to compile.
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// The requested attribute is not set.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The client connection has been released.
    #[error("client is closed")]
    ClientClosed,

    /// The facility does not provide the operation.
    #[error("operation not supported by the facility: {0}")]
    Unsupported(&'static str),

    /// Serialization or deserialization of a stored record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AslError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::WrongKind { .. } | Self::InvalidOperator(_) => {
                ErrorKind::Type
            }
            Self::InvalidKind(_)
            | Self::InvalidLevel(_)
            | Self::InvalidDirection(_)
            | Self::InvalidRegex(_)
            | Self::ClientClosed
            | Self::Unsupported(_) => ErrorKind::Value,
            Self::KeyNotFound(_) => ErrorKind::Key,
            Self::Serialization(_) | Self::Io(_) => ErrorKind::Os,
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type alias for log client operations.
pub type Result<T> = std::result::Result<T, AslError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = AslError::InvalidKind(42);
        assert_eq!(err.to_string(), "invalid message kind: 42");

        let err = AslError::ClientClosed;
        assert_eq!(err.to_string(), "client is closed");

        let err = AslError::KeyNotFound("Sender".to_string());
        assert_eq!(err.to_string(), "key not found: Sender");

        let err = AslError::InvalidOperator(0x208);
        assert_eq!(err.to_string(), "invalid query operator: 0x208");

        let err = AslError::WrongKind {
            expected: "record",
            actual: "query",
        };
        assert_eq!(err.to_string(), "expected a record message, got a query message");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AslError>();
    }

    #[test]
    fn error_kinds_follow_taxonomy() {
        assert_eq!(AslError::invalid_argument("x").kind(), ErrorKind::Type);
        assert_eq!(
            AslError::WrongKind {
                expected: "query",
                actual: "record"
            }
            .kind(),
            ErrorKind::Type
        );
        assert_eq!(AslError::InvalidOperator(0).kind(), ErrorKind::Type);
        assert_eq!(AslError::InvalidKind(42).kind(), ErrorKind::Value);
        assert_eq!(AslError::InvalidDirection(44).kind(), ErrorKind::Value);
        assert_eq!(AslError::ClientClosed.kind(), ErrorKind::Value);
        assert_eq!(AslError::KeyNotFound("a".into()).kind(), ErrorKind::Key);

        let io_err = std::io::Error::from_raw_os_error(libc::EBADF);
        assert_eq!(AslError::from(io_err).kind(), ErrorKind::Os);
    }

    #[test]
    fn error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AslError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_regex_conversion() {
        let regex_err = regex::Regex::new("(").err();
        assert!(regex_err.is_some());
        if let Some(e) = regex_err {
            let err: AslError = e.into();
            assert_eq!(err.kind(), ErrorKind::Value);
        }
    }
}
