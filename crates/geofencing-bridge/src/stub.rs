// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native location services are
// unavailable.
//
// Every operation returns `PlatformUnavailable`. Real implementations live
// in the `ios` and `android` modules.

use geofencing_core::config::AuthorizationLevel;
use geofencing_core::error::{GeofenceError, Result};
use geofencing_core::types::{PermissionState, Region};

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl LocationServices for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativeAuthorization for StubBridge {
    fn location_services_enabled(&self) -> bool {
        false
    }

    fn authorization_status(&self) -> Result<PermissionState> {
        Err(GeofenceError::PlatformUnavailable)
    }

    fn request_authorization(&self, _level: AuthorizationLevel) -> Result<()> {
        tracing::warn!("NativeAuthorization::request_authorization called on stub bridge");
        Err(GeofenceError::PlatformUnavailable)
    }
}

impl NativeRegionMonitoring for StubBridge {
    fn monitoring_available(&self) -> bool {
        false
    }

    fn start_monitoring(&self, _region: &Region) -> Result<()> {
        tracing::warn!("NativeRegionMonitoring::start_monitoring called on stub bridge");
        Err(GeofenceError::PlatformUnavailable)
    }

    fn stop_monitoring(&self, _identifier: &str) -> Result<()> {
        tracing::warn!("NativeRegionMonitoring::stop_monitoring called on stub bridge");
        Err(GeofenceError::PlatformUnavailable)
    }

    fn monitored_regions(&self) -> Result<Vec<String>> {
        tracing::warn!("NativeRegionMonitoring::monitored_regions called on stub bridge");
        Err(GeofenceError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_reports_everything_unavailable() {
        let bridge = StubBridge;
        assert!(!bridge.location_services_enabled());
        assert!(!bridge.monitoring_available());
        assert!(matches!(
            bridge.authorization_status(),
            Err(GeofenceError::PlatformUnavailable)
        ));
        assert!(bridge.monitored_regions().is_err());
    }

    #[test]
    fn stub_refuses_to_stop_regions() {
        let bridge = StubBridge;
        assert!(matches!(
            bridge.stop_monitoring("home"),
            Err(GeofenceError::PlatformUnavailable)
        ));
    }
}
