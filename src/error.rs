//! Error type shared by the core and the service layer.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a [`TspError`], used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or insufficient input (no network, too few points).
    Precondition,
    /// Malformed upload.
    Format,
    /// Two points cannot reach each other over the network.
    Connectivity,
    /// A logic fault inside the core.
    InternalConsistency,
    /// Nothing to export.
    NotFound,
}

impl ErrorKind {
    /// ```
    /// use network_tsp::error::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::InternalConsistency.as_str(), "internal_consistency");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Precondition => "precondition",
            ErrorKind::Format => "format",
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::InternalConsistency => "internal_consistency",
            ErrorKind::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TspError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("invalid input: {0}")]
    Format(String),

    #[error("no route between point {from_id} (#{from}) and point {to_id} (#{to}); the network is disconnected")]
    Connectivity {
        from: usize,
        to: usize,
        from_id: String,
        to_id: String,
    },

    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("{0}")]
    NotFound(String),
}

impl TspError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TspError::Precondition(_) => ErrorKind::Precondition,
            TspError::Format(_) => ErrorKind::Format,
            TspError::Connectivity { .. } => ErrorKind::Connectivity,
            TspError::InternalConsistency(_) => ErrorKind::InternalConsistency,
            TspError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

pub type Result<T, E = TspError> = std::result::Result<T, E>;
