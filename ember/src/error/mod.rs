//! Error types and reporting

use crate::interp::RuntimeError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {message}")]
    Io { message: String },

    /// Source text the parser could not turn into an AST
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Malformed interpreter configuration
    #[error("Config error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Runtime error behind this error, if evaluation failed
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            Self::Runtime(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    #[test]
    fn test_display() {
        assert_eq!(Error::parse_error("unexpected end").to_string(), "Parse error: unexpected end");
        assert_eq!(Error::io_error("denied").to_string(), "IO error: denied");
        assert_eq!(Error::config_error("bad key").to_string(), "Config error: bad key");
    }

    #[test]
    fn test_runtime_is_transparent() {
        let err: Error = RuntimeError::no_method("Nil", "foo").into();
        assert_eq!(err.to_string(), "NoMethodError: undefined method `foo` for Nil");
        assert_eq!(err.as_runtime().map(|e| e.kind), Some(ErrorKind::NoMethod));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.as_runtime().is_none());
    }
}
