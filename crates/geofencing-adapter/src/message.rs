// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outbound wire messages: terminal results and out-of-band notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use geofencing_core::error::{ErrorPayload, GeofenceError};
use geofencing_core::types::{CallbackId, PermissionState, Transition};

/// Success payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// `requestPermissions`.
    Permission { permission: PermissionState },
    /// `startMonitoringRegion` / `stopMonitoringRegion` acknowledgement.
    Region { identifier: String },
    /// `stopMonitoringAllRegions`: every region that was stopped.
    Regions { identifiers: Vec<String> },
}

/// Terminal outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResult {
    Ok { payload: Payload },
    Error { error: ErrorPayload },
}

impl CommandResult {
    pub fn ok(payload: Payload) -> Self {
        Self::Ok { payload }
    }

    pub fn error(error: &GeofenceError) -> Self {
        Self::Error {
            error: error.to_payload(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Wire code of the error, if this is one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Ok { .. } => None,
            Self::Error { error } => Some(&error.code),
        }
    }
}

/// Out-of-band notification, not tied to any invocation handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum ShellEvent {
    RegionEntered {
        identifier: String,
        at: DateTime<Utc>,
    },
    RegionExited {
        identifier: String,
        at: DateTime<Utc>,
    },
    PermissionChanged {
        permission: PermissionState,
    },
    /// A region failed after its registration was acknowledged, or the
    /// platform could not say which region failed.
    MonitoringFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identifier: Option<String>,
        error: ErrorPayload,
    },
}

impl ShellEvent {
    pub fn crossing(identifier: String, transition: Transition, at: DateTime<Utc>) -> Self {
        match transition {
            Transition::Enter => Self::RegionEntered { identifier, at },
            Transition::Exit => Self::RegionExited { identifier, at },
        }
    }

    /// Region this notification concerns, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::RegionEntered { identifier, .. } | Self::RegionExited { identifier, .. } => {
                Some(identifier)
            }
            Self::MonitoringFailed { identifier, .. } => identifier.as_deref(),
            Self::PermissionChanged { .. } => None,
        }
    }
}

/// Everything the adapter sends towards the shell, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Result {
        #[serde(rename = "callbackId")]
        callback_id: CallbackId,
        result: CommandResult,
    },
    Event {
        event: ShellEvent,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn permission_result_wire_shape() {
        let outbound = Outbound::Result {
            callback_id: CallbackId::new("MBGeofencing1"),
            result: CommandResult::ok(Payload::Permission {
                permission: PermissionState::AuthorizedAlways,
            }),
        };
        assert_eq!(
            serde_json::to_value(&outbound).expect("serialize"),
            json!({
                "type": "result",
                "callbackId": "MBGeofencing1",
                "result": {"status": "ok", "payload": {"permission": "authorized-always"}}
            })
        );
    }

    #[test]
    fn error_result_carries_code() {
        let result = CommandResult::error(&GeofenceError::UnknownRegion("gym".into()));
        assert_eq!(result.error_code(), Some("validation"));
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["identifiers"], json!(["gym"]));
    }

    #[test]
    fn crossing_event_is_named_by_direction() {
        let at = Utc::now();
        let event = ShellEvent::crossing("home".into(), Transition::Exit, at);
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["name"], "regionExited");
        assert_eq!(value["identifier"], "home");
    }
}
