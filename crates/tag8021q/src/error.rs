//! Error types for 802.1Q tagging operations.
//!
//! Two layers exist: [`StoreError`] is what a VLAN membership backend
//! reports, and [`TaggingError`] is what the synchronizer and the frame
//! adapter hand back to their callers. Store errors are carried verbatim
//! inside [`TaggingError::Membership`] together with the step, VID and port
//! that were being mutated.

use thiserror::Error;

use crate::types::TaggingStep;
use crate::vid::{TagVid, MAX_PORTS, MAX_SWITCHES};

/// Result type alias for tagging operations.
pub type TaggingResult<T> = Result<T, TaggingError>;

/// Errors reported by a VLAN membership store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The hardware VLAN table has no room for another entry.
    #[error("VLAN table full while adding VID {vid} to port {port}")]
    TableFull {
        /// Port being configured.
        port: usize,
        /// VID being added.
        vid: u16,
    },

    /// The backend does not know the port.
    #[error("Port {0} is not valid for this switch")]
    InvalidPort(usize),

    /// The backend refused the VID.
    #[error("VID {0} rejected by the VLAN table")]
    InvalidVid(u16),

    /// Any other backend failure (driver call, shell command, ...).
    #[error("VLAN table operation failed: {operation}: {message}")]
    Backend {
        /// The operation that failed (e.g. "add", "del").
        operation: String,
        /// Error message.
        message: String,
    },
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true if re-invoking the same transition may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::TableFull { .. } | StoreError::Backend { .. })
    }
}

/// Errors produced by the tagging core.
#[derive(Debug, Error)]
pub enum TaggingError {
    /// A membership mutation was rejected by the store.
    #[error("Failed to apply {step} VID {vid} to port {port}")]
    Membership {
        /// Step of the transition that failed.
        step: TaggingStep,
        /// VID being mutated.
        vid: TagVid,
        /// Port being mutated.
        port: usize,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// Not enough bytes in the buffer to hold a VLAN tag.
    #[error("Truncated frame: need {needed} bytes, {available} available")]
    TruncatedFrame {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// The target port does not exist on the switch.
    #[error("Port {port} out of range for switch {switch} with {num_ports} ports")]
    PortOutOfRange {
        /// Switch index.
        switch: usize,
        /// Requested port.
        port: usize,
        /// Number of ports on the switch.
        num_ports: usize,
    },

    /// Switch index does not fit the SWITCH_ID field.
    #[error("Switch index {0} out of range (max {max})", max = MAX_SWITCHES - 1)]
    SwitchIndexOutOfRange(usize),

    /// Port index does not fit the PORT field.
    #[error("Port index {0} out of range (max {max})", max = MAX_PORTS - 1)]
    PortIndexOutOfRange(usize),

    /// Switch layout is inconsistent.
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// A transactional transition failed and could not be undone.
    #[error("Rollback failed after '{cause}'")]
    RollbackFailed {
        /// The error that triggered the rollback.
        cause: Box<TaggingError>,
        /// The store error raised while restoring.
        #[source]
        rollback: StoreError,
    },
}

impl TaggingError {
    /// Creates a truncated frame error.
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::TruncatedFrame { needed, available }
    }

    /// Creates an invalid topology error.
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology(message.into())
    }

    /// Returns the store error behind a membership failure, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            TaggingError::Membership { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true if re-invoking the same transition may converge.
    pub fn is_retryable(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_retryable)
    }
}
