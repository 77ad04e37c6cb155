// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the geofencing bridge.
//
// Every variant maps to a stable wire code so the shell can branch on the
// failure class without parsing messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all geofencing operations.
#[derive(Debug, Error)]
pub enum GeofenceError {
    // -- Platform-reported failures --
    #[error("location authorization insufficient: {0}")]
    Authorization(String),

    #[error("region monitoring capacity exceeded: {0}")]
    Capacity(String),

    #[error("location services unavailable: {0}")]
    Unavailable(String),

    #[error("platform error: {0}")]
    Platform(String),

    // -- Validation --
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Adapter --
    #[error("failed to stop {} region(s): {}", .failed.len(), .failed.join(", "))]
    PartialStop { failed: Vec<String> },

    #[error("unsupported action: {0}")]
    Unsupported(String),

    #[error("invocation cancelled: {0}")]
    Cancelled(String),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Host plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GeofenceError {
    /// Stable code sent to the shell alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authorization(_) => "authorization",
            Self::Capacity(_) => "capacity",
            Self::Unavailable(_) | Self::PlatformUnavailable => "unavailable",
            Self::Platform(_) | Self::Bridge(_) => "platform",
            Self::UnknownRegion(_) | Self::InvalidArgument(_) => "validation",
            Self::PartialStop { .. } => "partial-failure",
            Self::Unsupported(_) => "unsupported",
            Self::Cancelled(_) => "cancelled",
            Self::Io(_) | Self::Serialization(_) => "internal",
        }
    }

    /// Wire form of this error.
    pub fn to_payload(&self) -> ErrorPayload {
        let identifiers = match self {
            Self::PartialStop { failed } => failed.clone(),
            Self::UnknownRegion(id) => vec![id.clone()],
            _ => Vec::new(),
        };
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            identifiers,
        }
    }
}

/// Structured error payload delivered to the shell's error callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    /// Regions the error concerns, when it concerns specific regions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GeofenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_region_is_a_validation_error() {
        let payload = GeofenceError::UnknownRegion("office".into()).to_payload();
        assert_eq!(payload.code, "validation");
        assert_eq!(payload.identifiers, vec!["office".to_string()]);
    }

    #[test]
    fn partial_stop_lists_failed_regions() {
        let err = GeofenceError::PartialStop {
            failed: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "failed to stop 2 region(s): a, b");
        assert_eq!(err.to_payload().code, "partial-failure");
    }

    #[test]
    fn payload_omits_empty_identifiers() {
        let payload = GeofenceError::Capacity("limit of 20 reached".into()).to_payload();
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["code"], "capacity");
        assert!(json.get("identifiers").is_none());
    }
}
