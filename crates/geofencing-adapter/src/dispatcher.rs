// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The command adapter.
//
// Invocations are handled on one thread and never block: each is forwarded
// to the backend and, when the platform answers later, parked in the pending
// table. Platform callbacks come back over an unbounded channel and are
// matched to parked handles here, or forwarded to the shell as
// notifications when nothing is waiting for them.
//
// Every handle gets exactly one terminal result: `respond` only delivers to
// handles still in the pending table, and `shutdown` cancels whatever is left.
//
// Known platform race: a crossing can be delivered after a stop for the same
// region has been issued. The adapter forwards it as-is.

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use geofencing_bridge::{EventSender, LocationServices};
use geofencing_core::config::AdapterConfig;
use geofencing_core::error::{GeofenceError, Result};
use geofencing_core::types::{CallbackId, PermissionState, PlatformEvent, Region};

use crate::invocation::{Command, Invocation};
use crate::message::{CommandResult, Payload, ShellEvent};
use crate::pending::PendingTable;
use crate::shell::ShellChannel;

/// One adapter per application lifetime: created by the host at start,
/// consumed by [`GeofencingAdapter::run`] or [`GeofencingAdapter::shutdown`].
pub struct GeofencingAdapter {
    bridge: Box<dyn LocationServices>,
    shell: Box<dyn ShellChannel>,
    events: mpsc::UnboundedReceiver<PlatformEvent>,
    config: AdapterConfig,
    pending: PendingTable,
}

impl GeofencingAdapter {
    /// Assemble an adapter around an existing backend. `events` must be the
    /// receiving half of the channel the backend sends into.
    pub fn new(
        bridge: Box<dyn LocationServices>,
        shell: Box<dyn ShellChannel>,
        events: mpsc::UnboundedReceiver<PlatformEvent>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            bridge,
            shell,
            events,
            config,
            pending: PendingTable::default(),
        }
    }

    /// Build an adapter on the native backend for the target OS.
    pub fn with_platform(shell: Box<dyn ShellChannel>, config: AdapterConfig) -> Result<Self> {
        let (tx, rx): (EventSender, _) = mpsc::unbounded_channel();
        let bridge = geofencing_bridge::platform_bridge(tx)?;
        info!(platform = bridge.platform_name(), "location services bridge ready");
        Ok(Self::new(bridge, shell, rx, config))
    }

    /// Number of handles still owed a result.
    pub fn outstanding(&self) -> usize {
        self.pending.outstanding()
    }

    // -- Inbound --------------------------------------------------------------

    /// Dispatch one invocation. Returns immediately; the result is sent now
    /// or when the platform answers.
    #[instrument(skip_all, fields(callback_id = %invocation.callback_id, action = %invocation.action))]
    pub fn handle(&mut self, invocation: Invocation) {
        let Invocation {
            callback_id,
            action,
            args,
        } = invocation;

        if !self.pending.open(callback_id.clone()) {
            warn!("handle already outstanding, invocation dropped");
            return;
        }

        let command = match Command::parse(&action, &args) {
            Ok(command) => command,
            Err(e) => return self.fail(&callback_id, e),
        };
        debug!(?command, "dispatching");

        match command {
            Command::RequestPermissions => self.request_permissions(callback_id),
            Command::StartMonitoringRegion(region) => self.start_monitoring(callback_id, region),
            Command::StopMonitoringRegion { identifier } => {
                self.stop_monitoring(callback_id, identifier)
            }
            Command::StopMonitoringAllRegions => self.stop_monitoring_all(callback_id),
        }
    }

    fn request_permissions(&mut self, callback_id: CallbackId) {
        let state = match self.bridge.authorization_status() {
            Ok(state) => state,
            Err(e) => return self.fail(&callback_id, e),
        };
        if state.is_determined() {
            return self.resolve_permission(&callback_id, state);
        }

        // An undetermined status with services switched off never produces
        // a prompt, so nothing would ever answer.
        if !self.bridge.location_services_enabled() {
            return self.fail(
                &callback_id,
                GeofenceError::Unavailable("location services are disabled".into()),
            );
        }
        if let Err(e) = self.bridge.request_authorization(self.config.authorization) {
            return self.fail(&callback_id, e);
        }
        debug!("waiting for authorization answer");
        self.pending.await_permission(callback_id);
    }

    fn start_monitoring(&mut self, callback_id: CallbackId, region: Region) {
        if let Err(e) = region.validate() {
            return self.fail(&callback_id, e);
        }
        if !self.bridge.monitoring_available() {
            return self.fail(
                &callback_id,
                GeofenceError::Unavailable("region monitoring is not supported on this device".into()),
            );
        }
        match self.bridge.start_monitoring(&region) {
            Ok(()) => {
                debug!(region = %region.identifier, "waiting for registration acknowledgement");
                self.pending.await_start(region.identifier, callback_id);
            }
            Err(e) => self.fail(&callback_id, e),
        }
    }

    fn stop_monitoring(&mut self, callback_id: CallbackId, identifier: String) {
        let monitored = match self.bridge.monitored_regions() {
            Ok(monitored) => monitored,
            Err(e) => return self.fail(&callback_id, e),
        };
        if !monitored.contains(&identifier) {
            return self.fail(&callback_id, GeofenceError::UnknownRegion(identifier));
        }
        match self.bridge.stop_monitoring(&identifier) {
            Ok(()) => {
                info!(region = %identifier, "region monitoring stopped");
                self.cancel_starts(&identifier);
                self.succeed(&callback_id, Payload::Region { identifier });
            }
            Err(e) => self.fail(&callback_id, e),
        }
    }

    /// Best-effort: every region is attempted even after a failure.
    fn stop_monitoring_all(&mut self, callback_id: CallbackId) {
        let monitored = match self.bridge.monitored_regions() {
            Ok(monitored) => monitored,
            Err(e) => return self.fail(&callback_id, e),
        };

        let mut stopped = Vec::with_capacity(monitored.len());
        let mut failed = Vec::new();
        for identifier in monitored {
            match self.bridge.stop_monitoring(&identifier) {
                Ok(()) => {
                    self.cancel_starts(&identifier);
                    stopped.push(identifier);
                }
                Err(e) => {
                    warn!(region = %identifier, "failed to stop region: {e}");
                    failed.push(identifier);
                }
            }
        }

        info!(stopped = stopped.len(), failed = failed.len(), "stop all regions");
        if failed.is_empty() {
            self.succeed(&callback_id, Payload::Regions { identifiers: stopped });
        } else {
            self.fail(&callback_id, GeofenceError::PartialStop { failed });
        }
    }

    /// A stopped region will never be acknowledged; release its waiters.
    fn cancel_starts(&mut self, identifier: &str) {
        for waiter in self.pending.take_starts(identifier) {
            self.fail(
                &waiter,
                GeofenceError::Cancelled(format!(
                    "monitoring of {identifier} stopped before it was acknowledged"
                )),
            );
        }
    }

    // -- Platform events ------------------------------------------------------

    /// Apply one platform callback.
    #[instrument(skip_all)]
    pub fn process_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::AuthorizationChanged(state) => {
                if state.is_determined() {
                    for waiter in self.pending.take_permission_waiters() {
                        self.resolve_permission(&waiter, state);
                    }
                }
                self.shell
                    .send_event(ShellEvent::PermissionChanged { permission: state });
            }

            PlatformEvent::MonitoringStarted { identifier } => {
                match self.pending.take_start(&identifier) {
                    Some(waiter) => {
                        info!(region = %identifier, "region monitoring started");
                        self.succeed(&waiter, Payload::Region { identifier });
                    }
                    None => debug!(region = %identifier, "unsolicited registration acknowledgement"),
                }
            }

            PlatformEvent::MonitoringFailed { identifier, error } => {
                let waiter = identifier
                    .as_deref()
                    .and_then(|identifier| self.pending.take_start(identifier));
                match waiter {
                    Some(waiter) => self.fail(&waiter, error),
                    None => {
                        warn!(region = ?identifier, "region monitoring failed: {error}");
                        self.shell.send_event(ShellEvent::MonitoringFailed {
                            identifier,
                            error: error.to_payload(),
                        });
                    }
                }
            }

            PlatformEvent::Crossing {
                identifier,
                transition,
                at,
            } => {
                // A crossing proves the region is registered: acknowledge
                // first so the result precedes the notification.
                for waiter in self.pending.take_starts(&identifier) {
                    self.succeed(
                        &waiter,
                        Payload::Region {
                            identifier: identifier.clone(),
                        },
                    );
                }
                info!(region = %identifier, ?transition, "region crossing");
                self.shell
                    .send_event(ShellEvent::crossing(identifier, transition, at));
            }
        }
    }

    /// Apply every platform callback already queued. Returns how many.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.process_event(event);
            applied += 1;
        }
        applied
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Serve invocations until `invocations` closes, then shut down.
    ///
    /// Platform events are preferred over new invocations so that results
    /// owed to earlier invocations go out first.
    pub async fn run(self, invocations: mpsc::UnboundedReceiver<Invocation>) {
        self.run_with(invocations, Self::handle).await;
    }

    /// Like [`GeofencingAdapter::run`], for hosts whose inbound stream
    /// carries more than invocations. Each item is applied with `apply`, in
    /// arrival order, interleaved with platform events.
    pub async fn run_with<T, F>(mut self, mut inbound: mpsc::UnboundedReceiver<T>, mut apply: F)
    where
        F: FnMut(&mut Self, T),
    {
        info!(platform = self.bridge.platform_name(), "geofencing adapter running");
        loop {
            tokio::select! {
                biased;
                Some(event) = self.events.recv() => self.process_event(event),
                item = inbound.recv() => match item {
                    Some(item) => apply(&mut self, item),
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    /// Apply queued platform events, then cancel every handle still waiting.
    pub fn shutdown(mut self) {
        self.drain_events();
        let leftover = self.pending.drain();
        if !leftover.is_empty() {
            info!(count = leftover.len(), "cancelling outstanding invocations");
        }
        for callback_id in leftover {
            self.shell.send_result(
                &callback_id,
                CommandResult::error(&GeofenceError::Cancelled("adapter shut down".into())),
            );
        }
        info!("geofencing adapter stopped");
    }

    // -- Responses ------------------------------------------------------------

    fn resolve_permission(&mut self, callback_id: &CallbackId, state: PermissionState) {
        let refused = matches!(state, PermissionState::Denied | PermissionState::Restricted);
        if refused && self.config.denied_is_error {
            self.fail(callback_id, GeofenceError::Authorization(state.to_string()));
        } else {
            self.succeed(callback_id, Payload::Permission { permission: state });
        }
    }

    fn succeed(&mut self, callback_id: &CallbackId, payload: Payload) {
        self.respond(callback_id, CommandResult::ok(payload));
    }

    fn fail(&mut self, callback_id: &CallbackId, error: GeofenceError) {
        warn!(%callback_id, code = error.code(), "invocation failed: {error}");
        self.respond(callback_id, CommandResult::error(&error));
    }

    fn respond(&mut self, callback_id: &CallbackId, result: CommandResult) {
        if !self.pending.close(callback_id) {
            warn!(%callback_id, "handle already retired, result suppressed");
            return;
        }
        self.shell.send_result(callback_id, result);
    }
}
