// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geofencing: native location-services bridge.
//
// Defines the `LocationServices` trait the adapter drives and the per-OS
// backends behind it: CoreLocation on iOS (objc2), the platform geofencing
// client on Android (JNI), a stub for desktop/CI, and an in-memory simulator.
//
// Every backend reports asynchronous outcomes by pushing `PlatformEvent`s
// into the `EventSender` it was constructed with.

pub mod sim;
pub mod traits;

#[cfg(target_os = "ios")]
pub mod ios;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod stub;

use geofencing_core::error::Result;

pub use traits::{EventSender, LocationServices};

/// Build the location-services backend for the target operating system.
///
/// Platform callbacks are delivered through `events`.
pub fn platform_bridge(events: EventSender) -> Result<Box<dyn LocationServices>> {
    #[cfg(target_os = "ios")]
    {
        // iOS: CLLocationManager plus an objc2-defined delegate class.
        Ok(Box::new(ios::IosBridge::new(events)?))
    }
    #[cfg(target_os = "android")]
    {
        // Android: JNI into the host's GeofenceHost helper.
        Ok(Box::new(android::AndroidBridge::new(events)?))
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        drop(events);
        Ok(Box::new(stub::StubBridge))
    }
}
