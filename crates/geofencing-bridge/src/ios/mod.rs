// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS location-services bridge via objc2.
//
// Requires compilation with the iOS SDK (Xcode). Wraps a `CLLocationManager`
// whose delegate is an Objective-C class defined here; every delegate
// callback is converted into a `PlatformEvent` and pushed into the adapter's
// event channel.
//
// This module is cfg-gated to `target_os = "ios"` and will not compile on other
// platforms. CoreLocation delivers delegate callbacks on the run loop of the
// thread that created the manager, so `IosBridge::new` insists on the main
// thread and the bridge must stay there.
//
// Unsafe code in this module is limited to Objective-C message sends to
// documented CoreLocation / Foundation selectors and the `define_class!`
// declaration required by the objc2 runtime.

#![cfg(target_os = "ios")]

use objc2::rc::Retained;
use objc2::runtime::{Bool, NSObject, NSObjectProtocol, ProtocolObject};
use objc2::{
    AllocAnyThread, ClassType, DefinedClass, MainThreadMarker, MainThreadOnly, define_class,
    msg_send,
};
use objc2_core_location::{
    CLAuthorizationStatus, CLCircularRegion, CLLocationCoordinate2D, CLLocationManager,
    CLLocationManagerDelegate, CLRegion,
};
use objc2_foundation::{NSArray, NSError, NSSet, NSString};

use geofencing_core::config::AuthorizationLevel;
use geofencing_core::error::{GeofenceError, Result};
use geofencing_core::types::{PermissionState, PlatformEvent, Region, Transition};

use crate::traits::*;

// ---------------------------------------------------------------------------
// CoreLocation constants
// ---------------------------------------------------------------------------

/// Regions a single app may monitor at once.
const MAX_MONITORED_REGIONS: usize = 20;

// CLAuthorizationStatus raw values.
const STATUS_NOT_DETERMINED: i32 = 0;
const STATUS_RESTRICTED: i32 = 1;
const STATUS_DENIED: i32 = 2;
const STATUS_AUTHORIZED_ALWAYS: i32 = 3;
const STATUS_AUTHORIZED_WHEN_IN_USE: i32 = 4;

// CLError codes in kCLErrorDomain.
const CL_ERROR_DENIED: isize = 1;
const CL_ERROR_REGION_MONITORING_DENIED: isize = 4;
const CL_ERROR_REGION_MONITORING_FAILURE: isize = 5;

fn map_status(status: CLAuthorizationStatus) -> PermissionState {
    match status.0 {
        STATUS_NOT_DETERMINED => PermissionState::NotDetermined,
        STATUS_RESTRICTED => PermissionState::Restricted,
        STATUS_DENIED => PermissionState::Denied,
        STATUS_AUTHORIZED_ALWAYS => PermissionState::AuthorizedAlways,
        STATUS_AUTHORIZED_WHEN_IN_USE => PermissionState::AuthorizedWhenInUse,
        other => {
            tracing::warn!(status = other, "iOS: unknown CLAuthorizationStatus");
            PermissionState::NotDetermined
        }
    }
}

/// Translate a CoreLocation `NSError` into the error taxonomy.
///
/// `monitored` is the number of regions currently registered, used to tell a
/// capacity failure apart from other monitoring failures.
fn map_error(error: &NSError, monitored: usize) -> GeofenceError {
    // SAFETY: `code` and `localizedDescription` are NSError properties
    // available on every iOS version.
    let (code, description) = unsafe {
        let code: isize = msg_send![error, code];
        let description: Retained<NSString> = msg_send![error, localizedDescription];
        (code, description.to_string())
    };

    match code {
        CL_ERROR_DENIED | CL_ERROR_REGION_MONITORING_DENIED => {
            GeofenceError::Authorization(description)
        }
        CL_ERROR_REGION_MONITORING_FAILURE if monitored >= MAX_MONITORED_REGIONS => {
            GeofenceError::Capacity(description)
        }
        _ => GeofenceError::Platform(format!("CLError {code}: {description}")),
    }
}

fn region_identifier(region: &CLRegion) -> String {
    // SAFETY: `identifier` is a non-null NSString property on CLRegion.
    let identifier: Retained<NSString> = unsafe { msg_send![region, identifier] };
    identifier.to_string()
}

/// Snapshot of `manager.monitoredRegions` as an owned list.
fn monitored_regions(manager: &CLLocationManager) -> Vec<Retained<CLRegion>> {
    // SAFETY: `monitoredRegions` returns a non-null NSSet<CLRegion>;
    // `allObjects`, `count` and `objectAtIndex:` are NSSet/NSArray selectors
    // and the index is bounded by `count`.
    unsafe {
        let set: Retained<NSSet<CLRegion>> = msg_send![manager, monitoredRegions];
        let all: Retained<NSArray<CLRegion>> = msg_send![&*set, allObjects];
        let count: usize = msg_send![&*all, count];
        (0..count)
            .map(|i| -> Retained<CLRegion> { msg_send![&*all, objectAtIndex: i] })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Location manager delegate (CLLocationManagerDelegate)
// ---------------------------------------------------------------------------

struct LocationDelegateIvars {
    events: EventSender,
}

// SAFETY: define_class! #[unsafe(super(NSObject))] declares LocationDelegate as
// an ObjC class inheriting from NSObject. MainThreadOnly matches where the
// manager delivers callbacks (the creating thread, enforced to be main).
define_class! {
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "GeofencingLocationDelegate"]
    #[ivars = LocationDelegateIvars]
    struct LocationDelegate;

    unsafe impl NSObjectProtocol for LocationDelegate {}

    unsafe impl CLLocationManagerDelegate for LocationDelegate {
        /// Called on creation and whenever authorization changes (iOS 14+).
        #[unsafe(method(locationManagerDidChangeAuthorization:))]
        fn did_change_authorization(&self, manager: &CLLocationManager) {
            // SAFETY: instance `authorizationStatus` property, iOS 14+.
            let status: CLAuthorizationStatus = unsafe { msg_send![manager, authorizationStatus] };
            self.send(PlatformEvent::AuthorizationChanged(map_status(status)));
        }

        #[unsafe(method(locationManager:didStartMonitoringForRegion:))]
        fn did_start_monitoring(&self, _manager: &CLLocationManager, region: &CLRegion) {
            self.send(PlatformEvent::MonitoringStarted {
                identifier: region_identifier(region),
            });
        }

        /// `region` is nil when CoreLocation cannot attribute the failure.
        #[unsafe(method(locationManager:monitoringDidFailForRegion:withError:))]
        fn monitoring_did_fail(
            &self,
            manager: &CLLocationManager,
            region: Option<&CLRegion>,
            error: &NSError,
        ) {
            let monitored = monitored_regions(manager).len();
            self.send(PlatformEvent::MonitoringFailed {
                identifier: region.map(region_identifier),
                error: map_error(error, monitored),
            });
        }

        #[unsafe(method(locationManager:didEnterRegion:))]
        fn did_enter_region(&self, _manager: &CLLocationManager, region: &CLRegion) {
            self.send(PlatformEvent::crossing(region_identifier(region), Transition::Enter));
        }

        #[unsafe(method(locationManager:didExitRegion:))]
        fn did_exit_region(&self, _manager: &CLLocationManager, region: &CLRegion) {
            self.send(PlatformEvent::crossing(region_identifier(region), Transition::Exit));
        }
    }
}

impl LocationDelegate {
    fn new(mtm: MainThreadMarker, events: EventSender) -> Retained<Self> {
        let this = mtm.alloc::<Self>();
        let this = this.set_ivars(LocationDelegateIvars { events });
        // SAFETY: Standard NSObject init via super.
        unsafe { msg_send![super(this), init] }
    }

    fn send(&self, event: PlatformEvent) {
        tracing::debug!(?event, "iOS: location delegate callback");
        if self.ivars().events.send(event).is_err() {
            tracing::warn!("iOS: location event dropped, adapter is gone");
        }
    }
}

// ---------------------------------------------------------------------------
// IosBridge
// ---------------------------------------------------------------------------

/// Concrete iOS location-services bridge.
///
/// Owns the `CLLocationManager` and keeps its delegate alive (the manager
/// only holds a weak reference to it).
pub struct IosBridge {
    manager: Retained<CLLocationManager>,
    _delegate: Retained<LocationDelegate>,
}

impl IosBridge {
    /// Create the manager and wire its delegate to `events`.
    ///
    /// # Errors
    ///
    /// Returns `GeofenceError::Bridge` if not called from the main thread.
    pub fn new(events: EventSender) -> Result<Self> {
        let mtm = MainThreadMarker::new()
            .ok_or_else(|| GeofenceError::Bridge("must be called from the main thread".into()))?;

        let delegate = LocationDelegate::new(mtm, events);

        // SAFETY: `new` and `setDelegate:` on CLLocationManager; the delegate
        // is retained by `IosBridge` for as long as the manager lives.
        let manager = unsafe {
            let manager: Retained<CLLocationManager> = CLLocationManager::new();
            manager.setDelegate(Some(ProtocolObject::from_ref(&*delegate)));
            manager
        };

        tracing::info!("iOS: CLLocationManager ready");
        Ok(Self {
            manager,
            _delegate: delegate,
        })
    }

    fn find_region(&self, identifier: &str) -> Option<Retained<CLRegion>> {
        monitored_regions(&self.manager)
            .into_iter()
            .find(|region| region_identifier(region) == identifier)
    }
}

impl LocationServices for IosBridge {
    fn platform_name(&self) -> &str {
        "iOS"
    }
}

// ---------------------------------------------------------------------------
// NativeAuthorization -- CLLocationManager authorization
// ---------------------------------------------------------------------------

impl NativeAuthorization for IosBridge {
    fn location_services_enabled(&self) -> bool {
        // SAFETY: class method `+locationServicesEnabled`.
        unsafe { msg_send![CLLocationManager::class(), locationServicesEnabled] }
    }

    fn authorization_status(&self) -> Result<PermissionState> {
        // SAFETY: instance `authorizationStatus` property, iOS 14+.
        let status: CLAuthorizationStatus =
            unsafe { msg_send![&*self.manager, authorizationStatus] };
        Ok(map_status(status))
    }

    /// Show the system prompt. CoreLocation answers through
    /// `locationManagerDidChangeAuthorization:`.
    ///
    /// Info.plist must carry `NSLocationWhenInUseUsageDescription` (and
    /// `NSLocationAlwaysAndWhenInUseUsageDescription` for `Always`), otherwise
    /// iOS silently ignores the request.
    fn request_authorization(&self, level: AuthorizationLevel) -> Result<()> {
        tracing::info!(?level, "iOS: requesting location authorization");
        // SAFETY: documented CLLocationManager selectors, main thread.
        unsafe {
            match level {
                AuthorizationLevel::Always => {
                    let _: () = msg_send![&*self.manager, requestAlwaysAuthorization];
                }
                AuthorizationLevel::WhenInUse => {
                    let _: () = msg_send![&*self.manager, requestWhenInUseAuthorization];
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NativeRegionMonitoring -- CLCircularRegion monitoring
// ---------------------------------------------------------------------------

impl NativeRegionMonitoring for IosBridge {
    fn monitoring_available(&self) -> bool {
        // SAFETY: class method `+isMonitoringAvailableForClass:` with the
        // CLCircularRegion class object.
        unsafe {
            msg_send![
                CLLocationManager::class(),
                isMonitoringAvailableForClass: CLCircularRegion::class()
            ]
        }
    }

    /// Register a `CLCircularRegion`.
    ///
    /// CoreLocation replaces any region already registered under the same
    /// identifier. Acceptance arrives as `didStartMonitoringForRegion:`.
    ///
    /// # Errors
    ///
    /// Returns `GeofenceError::InvalidArgument` if the radius exceeds the
    /// manager's `maximumRegionMonitoringDistance`.
    fn start_monitoring(&self, region: &Region) -> Result<()> {
        // SAFETY: `maximumRegionMonitoringDistance` is a read-only double
        // property; negative when monitoring is unsupported.
        let max_radius: f64 = unsafe { msg_send![&*self.manager, maximumRegionMonitoringDistance] };
        if max_radius > 0.0 && region.radius > max_radius {
            return Err(GeofenceError::InvalidArgument(format!(
                "radius {} m exceeds platform maximum of {max_radius} m",
                region.radius
            )));
        }

        tracing::info!(
            region = %region.identifier,
            radius = region.radius,
            "iOS: startMonitoringForRegion"
        );

        let identifier = NSString::from_str(&region.identifier);
        let center = CLLocationCoordinate2D {
            latitude: region.center.latitude,
            longitude: region.center.longitude,
        };

        // SAFETY: designated initialiser of CLCircularRegion followed by its
        // notifyOnEntry/notifyOnExit setters and
        // `startMonitoringForRegion:` on the main-thread manager.
        unsafe {
            let circular: Retained<CLCircularRegion> = msg_send![
                CLCircularRegion::alloc(),
                initWithCenter: center,
                radius: region.radius,
                identifier: &*identifier
            ];
            let _: () = msg_send![&*circular, setNotifyOnEntry: Bool::new(region.notify_on_entry)];
            let _: () = msg_send![&*circular, setNotifyOnExit: Bool::new(region.notify_on_exit)];
            let _: () = msg_send![&*self.manager, startMonitoringForRegion: &*circular];
        }
        Ok(())
    }

    fn stop_monitoring(&self, identifier: &str) -> Result<()> {
        let region = self
            .find_region(identifier)
            .ok_or_else(|| GeofenceError::UnknownRegion(identifier.to_string()))?;

        tracing::info!(region = identifier, "iOS: stopMonitoringForRegion");
        // SAFETY: `stopMonitoringForRegion:` with a region obtained from
        // this manager's own `monitoredRegions`.
        unsafe {
            let _: () = msg_send![&*self.manager, stopMonitoringForRegion: &*region];
        }
        Ok(())
    }

    fn monitored_regions(&self) -> Result<Vec<String>> {
        Ok(monitored_regions(&self.manager)
            .iter()
            .map(|region| region_identifier(region))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_status_values_map_to_states() {
        assert_eq!(
            map_status(CLAuthorizationStatus(STATUS_AUTHORIZED_ALWAYS)),
            PermissionState::AuthorizedAlways
        );
        assert_eq!(
            map_status(CLAuthorizationStatus(STATUS_AUTHORIZED_WHEN_IN_USE)),
            PermissionState::AuthorizedWhenInUse
        );
        assert_eq!(
            map_status(CLAuthorizationStatus(STATUS_DENIED)),
            PermissionState::Denied
        );
    }
}
