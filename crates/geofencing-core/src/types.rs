// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the geofencing bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GeofenceError, Result};

/// Correlation token linking an inbound invocation to its single terminal
/// response. Supplied by the shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(pub String);

impl CallbackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh handle for hosts that do not supply their own.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A circular region handed to the platform for entry/exit monitoring.
///
/// The adapter never stores these; ownership passes to the platform once
/// registration is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub identifier: String,
    pub center: Coordinate,
    /// Radius in metres.
    pub radius: f64,
    pub notify_on_entry: bool,
    pub notify_on_exit: bool,
}

impl Region {
    /// Region that triggers on both entry and exit.
    pub fn circular(identifier: impl Into<String>, center: Coordinate, radius: f64) -> Self {
        Self {
            identifier: identifier.into(),
            center,
            radius,
            notify_on_entry: true,
            notify_on_exit: true,
        }
    }

    /// Check the descriptor before it reaches the platform.
    pub fn validate(&self) -> Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(GeofenceError::InvalidArgument(
                "region identifier must not be empty".into(),
            ));
        }
        if !self.center.is_valid() {
            return Err(GeofenceError::InvalidArgument(format!(
                "coordinate out of range: ({}, {})",
                self.center.latitude, self.center.longitude
            )));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(GeofenceError::InvalidArgument(format!(
                "radius must be a positive number of metres, got {}",
                self.radius
            )));
        }
        if !self.notify_on_entry && !self.notify_on_exit {
            return Err(GeofenceError::InvalidArgument(
                "region must notify on entry, exit, or both".into(),
            ));
        }
        Ok(())
    }

    /// Whether a crossing in the given direction is wanted by the caller.
    pub fn wants(&self, transition: Transition) -> bool {
        match transition {
            Transition::Enter => self.notify_on_entry,
            Transition::Exit => self.notify_on_exit,
        }
    }
}

/// Location authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionState {
    /// The user has not been asked yet.
    NotDetermined,
    /// Blocked by device policy (parental controls, MDM).
    Restricted,
    Denied,
    /// Foreground-only authorization.
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl PermissionState {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDetermined => "not-determined",
            Self::Restricted => "restricted",
            Self::Denied => "denied",
            Self::AuthorizedWhenInUse => "authorized-when-in-use",
            Self::AuthorizedAlways => "authorized-always",
        }
    }

    /// Whether the user (or device policy) has answered.
    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::NotDetermined)
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a geofence crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Enter,
    Exit,
}

/// Events pushed by a platform backend into the adapter's event channel.
///
/// Backends send these from whatever thread the OS delivers callbacks on.
#[derive(Debug)]
pub enum PlatformEvent {
    /// The authorization status changed (or was re-reported).
    AuthorizationChanged(PermissionState),
    /// The platform accepted a region registration.
    MonitoringStarted { identifier: String },
    /// The platform rejected a registration or later gave up on a region.
    /// `identifier` is `None` when the platform could not name the region.
    MonitoringFailed {
        identifier: Option<String>,
        error: GeofenceError,
    },
    /// The device crossed a monitored region boundary.
    Crossing {
        identifier: String,
        transition: Transition,
        at: DateTime<Utc>,
    },
}

impl PlatformEvent {
    /// Crossing event stamped with the current time.
    pub fn crossing(identifier: impl Into<String>, transition: Transition) -> Self {
        Self::Crossing {
            identifier: identifier.into(),
            transition,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Region {
        Region::circular("home", Coordinate::new(51.5007, -0.1246), 100.0)
    }

    #[test]
    fn valid_region_passes() {
        assert!(home().validate().is_ok());
    }

    #[test]
    fn blank_identifier_is_rejected() {
        let mut region = home();
        region.identifier = "   ".into();
        assert!(matches!(
            region.validate(),
            Err(GeofenceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let mut region = home();
        region.center.latitude = 91.0;
        assert!(region.validate().is_err());
    }

    #[test]
    fn zero_and_nan_radius_are_rejected() {
        let mut region = home();
        region.radius = 0.0;
        assert!(region.validate().is_err());
        region.radius = f64::NAN;
        assert!(region.validate().is_err());
    }

    #[test]
    fn region_without_triggers_is_rejected() {
        let mut region = home();
        region.notify_on_entry = false;
        region.notify_on_exit = false;
        assert!(region.validate().is_err());
    }

    #[test]
    fn permission_state_wire_names_match_serde() {
        for state in [
            PermissionState::NotDetermined,
            PermissionState::Restricted,
            PermissionState::Denied,
            PermissionState::AuthorizedWhenInUse,
            PermissionState::AuthorizedAlways,
        ] {
            let json = serde_json::to_string(&state).expect("serialize");
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }

    #[test]
    fn only_not_determined_is_undetermined() {
        assert!(!PermissionState::NotDetermined.is_determined());
        assert!(PermissionState::Denied.is_determined());
        assert!(PermissionState::Restricted.is_determined());
    }
}
