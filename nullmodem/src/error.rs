//! Error types for nullmodem.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for nullmodem operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for nullmodem operations.
///
/// Only infrastructure failures are errors. A control-utility run that
/// completes but reports the operation as refused is a `false` outcome, not
/// an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// The com0com install directory or its control utility could not be found.
    #[error("com0com installation not found: {0}")]
    InstallationNotFound(String),

    /// The control utility could not be started or waited on.
    #[error("failed to execute {}: {source}", program.display())]
    Execution {
        /// Program that was being run.
        program: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The control utility did not exit within its time budget and was killed.
    #[error("{} did not finish within {timeout:?}", program.display())]
    Timeout {
        /// Program that was being run.
        program: PathBuf,
        /// Budget that was exceeded.
        timeout: Duration,
    },

    /// A line of control-utility output did not have the expected shape.
    #[error("malformed record {line:?}: {reason}")]
    MalformedRecord {
        /// The offending line, trimmed.
        line: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A pair with this identity already exists.
    #[error("pair {0} already exists")]
    DuplicateIdentity(u32),

    /// No pair with this identity is known.
    #[error("pair {0} does not exist")]
    UnknownIdentity(u32),

    /// A port configuration was rendered with no options set.
    #[error("port configuration is empty")]
    EmptyConfiguration,

    /// I/O error outside of process execution.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration input.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a [`Error::MalformedRecord`] for `line`.
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line: line.trim().to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error happened at the process-execution boundary.
    ///
    /// Timeouts count as execution failures for propagation purposes.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_execution_failure() {
        let err = Error::Timeout {
            program: PathBuf::from("setupc.exe"),
            timeout: Duration::from_secs(5),
        };
        assert!(err.is_execution_failure());
        assert!(err.to_string().contains("setupc.exe"));

        let err = Error::Execution {
            program: PathBuf::from("setupc.exe"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_execution_failure());
    }

    #[test]
    fn test_local_errors_are_not_execution_failures() {
        assert!(!Error::UnknownIdentity(3).is_execution_failure());
        assert!(!Error::DuplicateIdentity(3).is_execution_failure());
        assert!(!Error::EmptyConfiguration.is_execution_failure());
    }

    #[test]
    fn test_malformed_trims_line() {
        let err = Error::malformed("  CNCX0 PortName=COM1 \r", "bad order");
        match err {
            Error::MalformedRecord { line, reason } => {
                assert_eq!(line, "CNCX0 PortName=COM1");
                assert_eq!(reason, "bad order");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
