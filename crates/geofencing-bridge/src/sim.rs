// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory location services.
//
// Behaves like a well-mannered platform: registrations are acknowledged
// through the event channel, crossings are only reported for registered
// regions whose trigger flags ask for them, and the authorization prompt is
// answered with a preset state. Knobs exist for the failure paths (capacity,
// duplicate identifiers, late registration failures, stop failures).
//
// Clones share state, so a test can hand one clone to the adapter and keep
// another to drive the platform side.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use geofencing_core::config::AuthorizationLevel;
use geofencing_core::error::{GeofenceError, Result};
use geofencing_core::types::{PermissionState, PlatformEvent, Region, Transition};

use crate::traits::*;

/// Regions a single app may monitor on iOS.
pub const DEFAULT_CAPACITY: usize = 20;

/// What the simulated platform does with a second registration under an
/// identifier it already monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Replace the old region and acknowledge the new one (CoreLocation).
    Replace,
    /// Refuse the registration synchronously.
    Reject,
}

struct SimState {
    services_enabled: bool,
    monitoring_available: bool,
    status: PermissionState,
    /// Answer given when the prompt is shown. `None` leaves it open.
    prompt_answer: Option<PermissionState>,
    prompts_shown: usize,
    capacity: usize,
    duplicates: DuplicatePolicy,
    auto_acknowledge: bool,
    regions: BTreeMap<String, Region>,
    fail_start: HashMap<String, String>,
    fail_stop: HashSet<String>,
}

/// Simulated platform location services.
#[derive(Clone)]
pub struct SimulatedLocationServices {
    state: Arc<Mutex<SimState>>,
    events: EventSender,
}

impl SimulatedLocationServices {
    /// Location services on, nothing decided yet, prompt answered with
    /// "always", iOS capacity, duplicates replace.
    pub fn new(events: EventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                services_enabled: true,
                monitoring_available: true,
                status: PermissionState::NotDetermined,
                prompt_answer: Some(PermissionState::AuthorizedAlways),
                prompts_shown: 0,
                capacity: DEFAULT_CAPACITY,
                duplicates: DuplicatePolicy::Replace,
                auto_acknowledge: true,
                regions: BTreeMap::new(),
                fail_start: HashMap::new(),
                fail_stop: HashSet::new(),
            })),
            events,
        }
    }

    // -- Builder knobs --------------------------------------------------------

    pub fn with_status(self, status: PermissionState) -> Self {
        self.lock().status = status;
        self
    }

    pub fn with_prompt_answer(self, answer: Option<PermissionState>) -> Self {
        self.lock().prompt_answer = answer;
        self
    }

    pub fn with_capacity(self, capacity: usize) -> Self {
        self.lock().capacity = capacity;
        self
    }

    pub fn with_duplicate_policy(self, policy: DuplicatePolicy) -> Self {
        self.lock().duplicates = policy;
        self
    }

    /// When off, registrations stay unacknowledged until [`acknowledge`]
    /// is called.
    ///
    /// [`acknowledge`]: SimulatedLocationServices::acknowledge
    pub fn with_auto_acknowledge(self, on: bool) -> Self {
        self.lock().auto_acknowledge = on;
        self
    }

    pub fn with_services_enabled(self, on: bool) -> Self {
        self.lock().services_enabled = on;
        self
    }

    pub fn with_monitoring_available(self, on: bool) -> Self {
        self.lock().monitoring_available = on;
        self
    }

    /// Registration of `identifier` fails asynchronously with `reason`.
    pub fn failing_start(self, identifier: &str, reason: &str) -> Self {
        self.lock()
            .fail_start
            .insert(identifier.to_string(), reason.to_string());
        self
    }

    /// Deregistration of `identifier` fails.
    pub fn failing_stop(self, identifier: &str) -> Self {
        self.lock().fail_stop.insert(identifier.to_string());
        self
    }

    // -- Platform-side drivers -----------------------------------------------

    /// Answer an open authorization prompt.
    pub fn answer_prompt(&self, state: PermissionState) {
        self.lock().status = state;
        self.emit(PlatformEvent::AuthorizationChanged(state));
    }

    /// Acknowledge a registration that is being held back.
    pub fn acknowledge(&self, identifier: &str) {
        self.emit(PlatformEvent::MonitoringStarted {
            identifier: identifier.to_string(),
        });
    }

    /// Report a crossing, as the OS would. Returns whether an event was
    /// emitted (the region is monitored and wants this direction).
    pub fn cross(&self, identifier: &str, transition: Transition) -> bool {
        let wanted = self
            .lock()
            .regions
            .get(identifier)
            .is_some_and(|region| region.wants(transition));
        if wanted {
            self.emit(PlatformEvent::crossing(identifier, transition));
        }
        wanted
    }

    /// The platform gives up on an already registered region.
    pub fn drop_region(&self, identifier: &str, reason: &str) {
        self.lock().regions.remove(identifier);
        self.emit(PlatformEvent::MonitoringFailed {
            identifier: Some(identifier.to_string()),
            error: GeofenceError::Platform(reason.to_string()),
        });
    }

    // -- Inspection -----------------------------------------------------------

    pub fn region(&self, identifier: &str) -> Option<Region> {
        self.lock().regions.get(identifier).cloned()
    }

    pub fn prompts_shown(&self) -> usize {
        self.lock().prompts_shown
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: PlatformEvent) {
        debug!(?event, "simulated platform event");
        // The adapter may already be gone; late platform callbacks are dropped.
        let _ = self.events.send(event);
    }
}

impl LocationServices for SimulatedLocationServices {
    fn platform_name(&self) -> &str {
        "Simulated"
    }
}

impl NativeAuthorization for SimulatedLocationServices {
    fn location_services_enabled(&self) -> bool {
        self.lock().services_enabled
    }

    fn authorization_status(&self) -> Result<PermissionState> {
        Ok(self.lock().status)
    }

    fn request_authorization(&self, level: AuthorizationLevel) -> Result<()> {
        let answer = {
            let mut state = self.lock();
            if state.status.is_determined() {
                // The OS only prompts once.
                return Ok(());
            }
            state.prompts_shown += 1;
            let answer = match (state.prompt_answer, level) {
                (Some(PermissionState::AuthorizedAlways), AuthorizationLevel::WhenInUse) => {
                    Some(PermissionState::AuthorizedWhenInUse)
                }
                (answer, _) => answer,
            };
            if let Some(answer) = answer {
                state.status = answer;
            }
            answer
        };
        if let Some(answer) = answer {
            self.emit(PlatformEvent::AuthorizationChanged(answer));
        }
        Ok(())
    }
}

impl NativeRegionMonitoring for SimulatedLocationServices {
    fn monitoring_available(&self) -> bool {
        self.lock().monitoring_available
    }

    fn start_monitoring(&self, region: &Region) -> Result<()> {
        let event = {
            let mut state = self.lock();
            if !state.services_enabled {
                return Err(GeofenceError::Unavailable(
                    "location services are disabled".into(),
                ));
            }
            if matches!(
                state.status,
                PermissionState::Denied | PermissionState::Restricted
            ) {
                return Err(GeofenceError::Authorization(state.status.to_string()));
            }
            let id = region.identifier.clone();
            let exists = state.regions.contains_key(&id);
            if exists && state.duplicates == DuplicatePolicy::Reject {
                return Err(GeofenceError::Platform(format!(
                    "region {id} is already monitored"
                )));
            }
            if !exists && state.regions.len() >= state.capacity {
                return Err(GeofenceError::Capacity(format!(
                    "limit of {} regions reached",
                    state.capacity
                )));
            }
            if let Some(reason) = state.fail_start.remove(&id) {
                Some(PlatformEvent::MonitoringFailed {
                    identifier: Some(id),
                    error: GeofenceError::Platform(reason),
                })
            } else {
                state.regions.insert(id.clone(), region.clone());
                state
                    .auto_acknowledge
                    .then_some(PlatformEvent::MonitoringStarted { identifier: id })
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
        Ok(())
    }

    fn stop_monitoring(&self, identifier: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_stop.contains(identifier) {
            return Err(GeofenceError::Platform(format!(
                "could not stop monitoring {identifier}"
            )));
        }
        state
            .regions
            .remove(identifier)
            .map(|_| ())
            .ok_or_else(|| GeofenceError::UnknownRegion(identifier.to_string()))
    }

    fn monitored_regions(&self) -> Result<Vec<String>> {
        Ok(self.lock().regions.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofencing_core::types::Coordinate;
    use tokio::sync::mpsc;

    fn region(id: &str) -> Region {
        Region::circular(id, Coordinate::new(48.8584, 2.2945), 150.0)
    }

    #[test]
    fn prompt_is_answered_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx);

        sim.request_authorization(AuthorizationLevel::Always)
            .expect("request");
        sim.request_authorization(AuthorizationLevel::Always)
            .expect("request");

        assert_eq!(sim.prompts_shown(), 1);
        assert!(matches!(
            rx.try_recv(),
            Ok(PlatformEvent::AuthorizationChanged(
                PermissionState::AuthorizedAlways
            ))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn when_in_use_request_caps_the_grant() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx);
        sim.request_authorization(AuthorizationLevel::WhenInUse)
            .expect("request");
        assert_eq!(
            sim.authorization_status().expect("status"),
            PermissionState::AuthorizedWhenInUse
        );
    }

    #[test]
    fn capacity_limit_rejects_new_regions_only() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx).with_capacity(1);

        sim.start_monitoring(&region("a")).expect("first fits");
        assert!(matches!(
            sim.start_monitoring(&region("b")),
            Err(GeofenceError::Capacity(_))
        ));
        // Re-registering an existing identifier does not need a new slot.
        sim.start_monitoring(&region("a")).expect("replace fits");
    }

    #[test]
    fn crossings_respect_trigger_flags() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx);
        let mut exit_only = region("gate");
        exit_only.notify_on_entry = false;
        sim.start_monitoring(&exit_only).expect("start");
        let _ack = rx.try_recv();

        assert!(!sim.cross("gate", Transition::Enter));
        assert!(sim.cross("gate", Transition::Exit));
        assert!(!sim.cross("elsewhere", Transition::Exit));
    }

    #[test]
    fn stopping_unknown_region_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sim = SimulatedLocationServices::new(tx);
        assert!(matches!(
            sim.stop_monitoring("nowhere"),
            Err(GeofenceError::UnknownRegion(_))
        ));
    }
}
