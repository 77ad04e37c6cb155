// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound invocations and their decoding into typed commands.
//
// Arguments arrive either positionally, the way `exec(success, error,
// service, action, [identifier, lat, lon, radius])` passes them, or as a
// keyed object. Both forms decode to the same `Command`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use geofencing_core::error::{GeofenceError, Result};
use geofencing_core::types::{CallbackId, Coordinate, Region};

pub const REQUEST_PERMISSIONS: &str = "requestPermissions";
pub const START_MONITORING_REGION: &str = "startMonitoringRegion";
pub const STOP_MONITORING_REGION: &str = "stopMonitoringRegion";
pub const STOP_MONITORING_ALL_REGIONS: &str = "stopMonitoringAllRegions";

/// One request from the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    #[serde(default = "CallbackId::generate")]
    pub callback_id: CallbackId,
    pub action: String,
    #[serde(default)]
    pub args: Value,
}

impl Invocation {
    pub fn new(callback_id: CallbackId, action: impl Into<String>, args: Value) -> Self {
        Self {
            callback_id,
            action: action.into(),
            args,
        }
    }
}

/// Decoded, validated-for-shape command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RequestPermissions,
    StartMonitoringRegion(Region),
    StopMonitoringRegion { identifier: String },
    StopMonitoringAllRegions,
}

impl Command {
    /// Decode `action` and its arguments.
    ///
    /// # Errors
    ///
    /// `Unsupported` for an unknown action, `InvalidArgument` for missing or
    /// mistyped arguments. Range checks on the region happen later, in
    /// `Region::validate`.
    pub fn parse(action: &str, args: &Value) -> Result<Self> {
        match action {
            REQUEST_PERMISSIONS => Ok(Self::RequestPermissions),
            START_MONITORING_REGION => {
                let identifier = string_arg(args, 0, &["identifier", "id"])?;
                let latitude = number_arg(args, 1, &["latitude", "lat"])?;
                let longitude = number_arg(args, 2, &["longitude", "lon", "lng"])?;
                let radius = number_arg(args, 3, &["radius"])?;
                Ok(Self::StartMonitoringRegion(Region {
                    identifier,
                    center: Coordinate::new(latitude, longitude),
                    radius,
                    notify_on_entry: flag_arg(args, 4, &["notifyOnEntry"], true)?,
                    notify_on_exit: flag_arg(args, 5, &["notifyOnExit"], true)?,
                }))
            }
            STOP_MONITORING_REGION => Ok(Self::StopMonitoringRegion {
                identifier: string_arg(args, 0, &["identifier", "id"])?,
            }),
            STOP_MONITORING_ALL_REGIONS => Ok(Self::StopMonitoringAllRegions),
            other => Err(GeofenceError::Unsupported(other.to_string())),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::RequestPermissions => REQUEST_PERMISSIONS,
            Self::StartMonitoringRegion(_) => START_MONITORING_REGION,
            Self::StopMonitoringRegion { .. } => STOP_MONITORING_REGION,
            Self::StopMonitoringAllRegions => STOP_MONITORING_ALL_REGIONS,
        }
    }
}

/// Look up an argument by position (array form) or by any of `names`
/// (object form). JSON `null` counts as absent.
fn arg<'a>(args: &'a Value, index: usize, names: &[&str]) -> Option<&'a Value> {
    let value = match args {
        Value::Array(items) => items.get(index),
        Value::Object(map) => names.iter().find_map(|name| map.get(*name)),
        _ => None,
    };
    value.filter(|v| !v.is_null())
}

fn string_arg(args: &Value, index: usize, names: &[&str]) -> Result<String> {
    match arg(args, index, names) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(GeofenceError::InvalidArgument(format!(
            "{} must be a string, got {other}",
            names[0]
        ))),
        None => Err(GeofenceError::InvalidArgument(format!(
            "missing {}",
            names[0]
        ))),
    }
}

/// Numbers may also arrive as numeric strings from loosely typed callers.
fn number_arg(args: &Value, index: usize, names: &[&str]) -> Result<f64> {
    let invalid = |v: &Value| {
        GeofenceError::InvalidArgument(format!("{} must be a number, got {v}", names[0]))
    };
    match arg(args, index, names) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(&Value::Number(n.clone()))),
        Some(v @ Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid(v)),
        Some(other) => Err(invalid(other)),
        None => Err(GeofenceError::InvalidArgument(format!(
            "missing {}",
            names[0]
        ))),
    }
}

fn flag_arg(args: &Value, index: usize, names: &[&str], default: bool) -> Result<bool> {
    match arg(args, index, names) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(GeofenceError::InvalidArgument(format!(
            "{} must be a boolean, got {other}",
            names[0]
        ))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn positional_start_matches_exec_wire_form() {
        let command = Command::parse(
            START_MONITORING_REGION,
            &json!(["home", 37.3349, -122.009, 100]),
        )
        .expect("parse");
        let Command::StartMonitoringRegion(region) = command else {
            panic!("expected start command");
        };
        assert_eq!(region.identifier, "home");
        assert_eq!(region.center, Coordinate::new(37.3349, -122.009));
        assert_eq!(region.radius, 100.0);
        assert!(region.notify_on_entry && region.notify_on_exit);
    }

    #[test]
    fn object_form_accepts_aliases_and_flags() {
        let command = Command::parse(
            START_MONITORING_REGION,
            &json!({"id": "office", "lat": "52.52", "lng": 13.405, "radius": 250.5, "notifyOnEntry": false}),
        )
        .expect("parse");
        let Command::StartMonitoringRegion(region) = command else {
            panic!("expected start command");
        };
        assert_eq!(region.identifier, "office");
        assert_eq!(region.center.latitude, 52.52);
        assert!(!region.notify_on_entry);
        assert!(region.notify_on_exit);
    }

    #[test]
    fn missing_radius_is_invalid() {
        let err = Command::parse(START_MONITORING_REGION, &json!(["home", 1.0, 2.0]))
            .expect_err("radius is required");
        assert!(matches!(err, GeofenceError::InvalidArgument(ref m) if m.contains("radius")));
    }

    #[test]
    fn non_numeric_coordinate_is_invalid() {
        let err = Command::parse(START_MONITORING_REGION, &json!(["home", "north", 2.0, 10]))
            .expect_err("latitude must be numeric");
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn stop_takes_identifier_in_either_form() {
        let positional = Command::parse(STOP_MONITORING_REGION, &json!(["home"])).expect("parse");
        let keyed =
            Command::parse(STOP_MONITORING_REGION, &json!({"identifier": "home"})).expect("parse");
        assert_eq!(positional, keyed);
    }

    #[test]
    fn no_argument_commands_ignore_args() {
        assert_eq!(
            Command::parse(REQUEST_PERMISSIONS, &Value::Null).expect("parse"),
            Command::RequestPermissions
        );
        assert_eq!(
            Command::parse(STOP_MONITORING_ALL_REGIONS, &json!([])).expect("parse"),
            Command::StopMonitoringAllRegions
        );
    }

    #[test]
    fn unknown_action_is_unsupported() {
        let err = Command::parse("getCurrentPosition", &json!([])).expect_err("unknown");
        assert!(matches!(err, GeofenceError::Unsupported(ref a) if a == "getCurrentPosition"));
    }

    #[test]
    fn invocation_without_callback_id_gets_one() {
        let invocation: Invocation =
            serde_json::from_str(r#"{"action": "requestPermissions"}"#).expect("decode");
        assert!(!invocation.callback_id.as_str().is_empty());
        assert_eq!(invocation.args, Value::Null);
    }
}
