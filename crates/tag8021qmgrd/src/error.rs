//! Error types for the tagging manager.

use std::io;
use tag8021q::{StoreError, TaggingError};
use thiserror::Error;

/// Result type alias for manager operations.
pub type MgrResult<T> = Result<T, MgrError>;

/// Errors that can occur while managing port tagging.
#[derive(Debug, Error)]
pub enum MgrError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}'")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Configuration file could not be parsed or written.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// No switch with this index is configured.
    #[error("Switch {0} is not configured")]
    UnknownSwitch(usize),

    /// No port with this name on the switch.
    #[error("Port '{port}' not found on switch {switch}")]
    UnknownPort {
        /// Switch index.
        switch: usize,
        /// Interface name.
        port: String,
    },

    /// Tagging core failure.
    #[error(transparent)]
    Tagging(#[from] TaggingError),

    /// Membership table could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl MgrError {
    /// Creates an invalid config error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            MgrError::ShellCommandFailed { .. } => true,
            MgrError::Tagging(e) => e.is_retryable(),
            MgrError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tag8021q::{TaggingStep, TagVid};

    #[test]
    fn test_error_display() {
        let err = MgrError::invalid_config("switches[0].ports", "no upstream port");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for switches[0].ports: no upstream port"
        );
        assert_eq!(
            MgrError::UnknownPort {
                switch: 1,
                port: "swp9".to_string()
            }
            .to_string(),
            "Port 'swp9' not found on switch 1"
        );
    }

    #[test]
    fn test_tagging_error_is_transparent() {
        let inner = TaggingError::truncated(4, 0);
        let message = inner.to_string();
        let err = MgrError::from(inner);
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_is_retryable() {
        let err = MgrError::from(TaggingError::Membership {
            step: TaggingStep::TxPort,
            vid: TagVid::from_tci(2049),
            port: 1,
            source: StoreError::backend("add", "busy"),
        });
        assert!(err.is_retryable());
        assert!(!MgrError::UnknownSwitch(3).is_retryable());
        assert!(MgrError::from(StoreError::backend("show", "busy")).is_retryable());
    }
}
