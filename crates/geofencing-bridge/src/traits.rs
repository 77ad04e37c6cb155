// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for location services.
//
// Methods return once the request has been handed to the platform. Outcomes
// that the platform reports later (authorization answers, registration
// acknowledgements, crossings) arrive as `PlatformEvent`s on the channel the
// backend was built with.

use geofencing_core::config::AuthorizationLevel;
use geofencing_core::error::Result;
use geofencing_core::types::{PermissionState, PlatformEvent, Region};

/// Channel half a backend pushes platform callbacks into.
///
/// Unbounded so that sending never blocks the OS callback thread.
pub type EventSender = tokio::sync::mpsc::UnboundedSender<PlatformEvent>;

/// Unified bridge that groups the location capabilities the adapter needs.
///
/// Backends are not required to be `Send`: CoreLocation objects must stay on
/// the thread that created them.
pub trait LocationServices: NativeAuthorization + NativeRegionMonitoring {
    /// Human-readable platform name (e.g. "iOS", "Android").
    fn platform_name(&self) -> &str;
}

/// Location authorization.
pub trait NativeAuthorization {
    /// Whether location services are switched on at the OS level.
    fn location_services_enabled(&self) -> bool;

    /// Current authorization as the platform sees it.
    fn authorization_status(&self) -> Result<PermissionState>;

    /// Ask the user for authorization. The answer arrives as
    /// `PlatformEvent::AuthorizationChanged`.
    fn request_authorization(&self, level: AuthorizationLevel) -> Result<()>;
}

/// Circular region monitoring.
pub trait NativeRegionMonitoring {
    /// Whether this device can monitor circular regions at all.
    fn monitoring_available(&self) -> bool;

    /// Register a region. `Err` is a synchronous rejection; acceptance is
    /// reported as `PlatformEvent::MonitoringStarted` and late rejection as
    /// `PlatformEvent::MonitoringFailed`.
    fn start_monitoring(&self, region: &Region) -> Result<()>;

    /// Deregister a region. Completes synchronously.
    fn stop_monitoring(&self, identifier: &str) -> Result<()>;

    /// Identifiers of every region the platform monitors for this app,
    /// including regions registered by earlier launches.
    fn monitored_regions(&self) -> Result<Vec<String>>;
}
