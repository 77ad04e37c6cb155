// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android location-services bridge via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`.
//
// ## Architecture notes
//
// Android geofencing lives in Google Play services (`GeofencingClient`) and
// reports through `PendingIntent`s and `Task` listeners, none of which can be
// implemented from native code alone. The host app therefore ships a small
// Java/Kotlin helper, `org.geofencing.bridge.GeofenceHost`, with the static
// methods called below. The helper reports asynchronous outcomes back through
// the native method `GeofenceHost.nativeOnEvent(int kind, String id, int code,
// String message)`, implemented at the bottom of this file.
//
// Status codes shared with the helper mirror CoreLocation's
// `CLAuthorizationStatus` so both platforms speak the same numbers:
// 0 not determined, 1 restricted, 2 denied, 3 always, 4 when in use.

#![cfg(target_os = "android")]

use std::sync::{Mutex, OnceLock};

use jni::objects::{JClass, JObject, JObjectArray, JString, JValue};
use jni::sys::jint;
use jni::{JNIEnv, JavaVM};

use geofencing_core::config::AuthorizationLevel;
use geofencing_core::error::{GeofenceError, Result};
use geofencing_core::types::{PermissionState, PlatformEvent, Region, Transition};

use crate::traits::*;

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Fully-qualified (dotted) name of the host helper class.
const HOST_CLASS: &str = "org.geofencing.bridge.GeofenceHost";

// `nativeOnEvent` kinds.
const EVENT_AUTHORIZATION: jint = 0;
const EVENT_STARTED: jint = 1;
const EVENT_FAILED: jint = 2;
const EVENT_ENTER: jint = 3;
const EVENT_EXIT: jint = 4;

// com.google.android.gms.location.GeofenceStatusCodes
const GEOFENCE_NOT_AVAILABLE: jint = 1000;
const GEOFENCE_TOO_MANY_GEOFENCES: jint = 1001;
const GEOFENCE_TOO_MANY_PENDING_INTENTS: jint = 1002;
const GEOFENCE_INSUFFICIENT_LOCATION_PERMISSION: jint = 1004;

static JVM: OnceLock<JavaVM> = OnceLock::new();

/// Where `nativeOnEvent` forwards events. Replaced by each `AndroidBridge::new`.
static EVENTS: Mutex<Option<EventSender>> = Mutex::new(None);

/// Obtain a [`JNIEnv`] for the current thread.
///
/// The `JavaVM*` comes from `ndk_context::android_context()`, set by
/// `android_main` or `ANativeActivity_onCreate`. Threads are attached
/// permanently; the adapter calls in from a single dispatch thread.
fn jni_env() -> Result<JNIEnv<'static>> {
    let vm = match JVM.get() {
        Some(vm) => vm,
        None => {
            let ctx = ndk_context::android_context();
            // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
            // The pointer is guaranteed valid for the lifetime of the process.
            let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
                .map_err(|e| GeofenceError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
            JVM.get_or_init(|| vm)
        }
    };
    vm.attach_current_thread_permanently()
        .map_err(|e| GeofenceError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// Obtain the hosting `Activity` as a [`JObject`].
fn activity() -> Result<JObject<'static>> {
    let ctx = ndk_context::android_context();
    let ptr = ctx.context();
    if ptr.is_null() {
        return Err(GeofenceError::Bridge(
            "Android context is null, native activity not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Activity.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

/// Convenience: map any `jni::errors::Error` into `GeofenceError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> GeofenceError {
    GeofenceError::Bridge(format!("{context}: {e}"))
}

/// Load the helper class through the Activity's class loader.
///
/// `FindClass` on a natively attached thread only sees system classes, so
/// app classes have to come from the application class loader.
fn host_class(env: &mut JNIEnv<'static>, activity: &JObject<'static>) -> Result<JClass<'static>> {
    let loader = env
        .call_method(activity, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .map_err(|e| jni_err("getClassLoader", e))?
        .l()
        .map_err(|e| jni_err("getClassLoader->l", e))?;
    let name = env
        .new_string(HOST_CLASS)
        .map_err(|e| jni_err("new_string(HOST_CLASS)", e))?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&name)],
        )
        .map_err(|e| jni_err("loadClass", e))?
        .l()
        .map_err(|e| jni_err("loadClass->l", e))?;
    Ok(JClass::from(class))
}

fn map_status(code: jint) -> PermissionState {
    match code {
        0 => PermissionState::NotDetermined,
        1 => PermissionState::Restricted,
        2 => PermissionState::Denied,
        3 => PermissionState::AuthorizedAlways,
        4 => PermissionState::AuthorizedWhenInUse,
        other => {
            tracing::warn!(status = other, "Android: unknown authorization status");
            PermissionState::NotDetermined
        }
    }
}

fn map_error(code: jint, message: String) -> GeofenceError {
    match code {
        GEOFENCE_TOO_MANY_GEOFENCES | GEOFENCE_TOO_MANY_PENDING_INTENTS => {
            GeofenceError::Capacity(message)
        }
        GEOFENCE_INSUFFICIENT_LOCATION_PERMISSION => GeofenceError::Authorization(message),
        // Location is switched off or the user revoked the location consent.
        GEOFENCE_NOT_AVAILABLE => GeofenceError::Unavailable(message),
        _ => GeofenceError::Platform(format!("status {code}: {message}")),
    }
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the location-services bridge.
///
/// Holds a global reference to the helper class; all geofence state lives on
/// the Java side.
pub struct AndroidBridge {
    host: jni::objects::GlobalRef,
}

impl AndroidBridge {
    /// Resolve the helper class and install `events` as the destination of
    /// `nativeOnEvent`.
    pub fn new(events: EventSender) -> Result<Self> {
        let mut env = jni_env()?;
        let activity = activity()?;
        let class = host_class(&mut env, &activity)?;
        let host = env
            .new_global_ref(class)
            .map_err(|e| jni_err("new_global_ref(GeofenceHost)", e))?;

        *EVENTS
            .lock()
            .map_err(|_| GeofenceError::Bridge("event sender lock poisoned".into()))? =
            Some(events);

        tracing::info!("Android: GeofenceHost bound");
        Ok(Self { host })
    }

    /// `&JClass` view of the helper's global reference.
    fn class(&self) -> &JClass<'static> {
        <&JClass>::from(self.host.as_obj())
    }

    fn call_bool(&self, name: &str) -> Result<bool> {
        let mut env = jni_env()?;
        let activity = activity()?;
        env.call_static_method(
            self.class(),
            name,
            "(Landroid/content/Context;)Z",
            &[JValue::Object(&activity)],
        )
        .map_err(|e| jni_err(name, e))?
        .z()
        .map_err(|e| jni_err(name, e))
    }
}

impl LocationServices for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }
}

// ---------------------------------------------------------------------------
// NativeAuthorization: runtime location permissions
// ---------------------------------------------------------------------------

impl NativeAuthorization for AndroidBridge {
    fn location_services_enabled(&self) -> bool {
        self.call_bool("locationServicesEnabled").unwrap_or_else(|e| {
            tracing::warn!("Android: locationServicesEnabled failed: {e}");
            false
        })
    }

    fn authorization_status(&self) -> Result<PermissionState> {
        let mut env = jni_env()?;
        let activity = activity()?;
        let code = env
            .call_static_method(
                self.class(),
                "authorizationStatus",
                "(Landroid/content/Context;)I",
                &[JValue::Object(&activity)],
            )
            .map_err(|e| jni_err("authorizationStatus", e))?
            .i()
            .map_err(|e| jni_err("authorizationStatus->i", e))?;
        Ok(map_status(code))
    }

    /// Launch `ActivityCompat.requestPermissions`. The helper forwards
    /// `onRequestPermissionsResult` as an authorization event.
    fn request_authorization(&self, level: AuthorizationLevel) -> Result<()> {
        let mut env = jni_env()?;
        let activity = activity()?;
        let always = matches!(level, AuthorizationLevel::Always);

        tracing::info!(?level, "Android: requesting location permission");
        env.call_static_method(
            self.class(),
            "requestAuthorization",
            "(Landroid/app/Activity;Z)V",
            &[JValue::Object(&activity), JValue::Bool(always.into())],
        )
        .map_err(|e| jni_err("requestAuthorization", e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NativeRegionMonitoring: GeofencingClient via GeofenceHost
// ---------------------------------------------------------------------------

impl NativeRegionMonitoring for AndroidBridge {
    fn monitoring_available(&self) -> bool {
        self.call_bool("isGeofencingAvailable").unwrap_or_else(|e| {
            tracing::warn!("Android: isGeofencingAvailable failed: {e}");
            false
        })
    }

    /// Hand the region to `GeofencingClient.addGeofences`. The helper's
    /// success/failure listeners report back through `nativeOnEvent`.
    fn start_monitoring(&self, region: &Region) -> Result<()> {
        let mut env = jni_env()?;
        let activity = activity()?;
        let identifier = env
            .new_string(&region.identifier)
            .map_err(|e| jni_err("new_string(identifier)", e))?;

        tracing::info!(
            region = %region.identifier,
            radius = region.radius,
            "Android: addGeofence"
        );
        env.call_static_method(
            self.class(),
            "addGeofence",
            "(Landroid/content/Context;Ljava/lang/String;DDFZZ)V",
            &[
                JValue::Object(&activity),
                JValue::Object(&identifier),
                JValue::Double(region.center.latitude),
                JValue::Double(region.center.longitude),
                JValue::Float(region.radius as f32),
                JValue::Bool(region.notify_on_entry.into()),
                JValue::Bool(region.notify_on_exit.into()),
            ],
        )
        .map_err(|e| jni_err("addGeofence", e))?;
        Ok(())
    }

    fn stop_monitoring(&self, identifier: &str) -> Result<()> {
        let mut env = jni_env()?;
        let activity = activity()?;
        let j_identifier = env
            .new_string(identifier)
            .map_err(|e| jni_err("new_string(identifier)", e))?;

        let removed = env
            .call_static_method(
                self.class(),
                "removeGeofence",
                "(Landroid/content/Context;Ljava/lang/String;)Z",
                &[JValue::Object(&activity), JValue::Object(&j_identifier)],
            )
            .map_err(|e| jni_err("removeGeofence", e))?
            .z()
            .map_err(|e| jni_err("removeGeofence->z", e))?;

        if removed {
            tracing::info!(region = identifier, "Android: removeGeofence");
            Ok(())
        } else {
            Err(GeofenceError::UnknownRegion(identifier.to_string()))
        }
    }

    fn monitored_regions(&self) -> Result<Vec<String>> {
        let mut env = jni_env()?;
        let activity = activity()?;
        let array = env
            .call_static_method(
                self.class(),
                "monitoredRegions",
                "(Landroid/content/Context;)[Ljava/lang/String;",
                &[JValue::Object(&activity)],
            )
            .map_err(|e| jni_err("monitoredRegions", e))?
            .l()
            .map_err(|e| jni_err("monitoredRegions->l", e))?;
        let array = JObjectArray::from(array);

        let len = env
            .get_array_length(&array)
            .map_err(|e| jni_err("get_array_length", e))?;
        let mut identifiers = Vec::with_capacity(len.max(0) as usize);
        for i in 0..len {
            let element = env
                .get_object_array_element(&array, i)
                .map_err(|e| jni_err("get_object_array_element", e))?;
            let element = JString::from(element);
            let identifier: String = env
                .get_string(&element)
                .map_err(|e| jni_err("get_string", e))?
                .into();
            identifiers.push(identifier);
        }
        Ok(identifiers)
    }
}

// ---------------------------------------------------------------------------
// Callback entry point
// ---------------------------------------------------------------------------

fn optional_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        return None;
    }
    env.get_string(value).ok().map(String::from)
}

fn decode_event(kind: jint, identifier: Option<String>, code: jint, message: String) -> Option<PlatformEvent> {
    match (kind, identifier) {
        (EVENT_AUTHORIZATION, _) => Some(PlatformEvent::AuthorizationChanged(map_status(code))),
        (EVENT_STARTED, Some(identifier)) => Some(PlatformEvent::MonitoringStarted { identifier }),
        (EVENT_FAILED, identifier) => Some(PlatformEvent::MonitoringFailed {
            identifier,
            error: map_error(code, message),
        }),
        (EVENT_ENTER, Some(identifier)) => Some(PlatformEvent::crossing(identifier, Transition::Enter)),
        (EVENT_EXIT, Some(identifier)) => Some(PlatformEvent::crossing(identifier, Transition::Exit)),
        _ => None,
    }
}

/// `static native void nativeOnEvent(int kind, String id, int code, String message)`
/// on `org.geofencing.bridge.GeofenceHost`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_org_geofencing_bridge_GeofenceHost_nativeOnEvent<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    kind: jint,
    identifier: JString<'local>,
    code: jint,
    message: JString<'local>,
) {
    let identifier = optional_string(&mut env, &identifier);
    let message = optional_string(&mut env, &message).unwrap_or_default();

    let Some(event) = decode_event(kind, identifier, code, message) else {
        tracing::warn!(kind, code, "Android: malformed GeofenceHost event");
        return;
    };

    tracing::debug!(?event, "Android: GeofenceHost callback");
    match EVENTS.lock() {
        Ok(guard) => match guard.as_ref() {
            Some(events) if events.send(event).is_ok() => {}
            _ => tracing::warn!("Android: location event dropped, adapter is gone"),
        },
        Err(_) => tracing::warn!("Android: event sender lock poisoned"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_geofences_is_capacity() {
        assert!(matches!(
            map_error(GEOFENCE_TOO_MANY_GEOFENCES, "limit".into()),
            GeofenceError::Capacity(_)
        ));
    }

    #[test]
    fn crossing_without_identifier_is_dropped() {
        assert!(decode_event(EVENT_ENTER, None, 0, String::new()).is_none());
    }
}
