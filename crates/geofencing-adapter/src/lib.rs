// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geofencing: command adapter.
//
// Accepts the four shell commands (`requestPermissions`,
// `startMonitoringRegion`, `stopMonitoringRegion`, `stopMonitoringAllRegions`),
// forwards each to a `LocationServices` backend, and relays the platform's
// asynchronous answers back as exactly one result per invocation handle.
// Crossings and other unsolicited platform events go out as notifications.

pub mod dispatcher;
pub mod invocation;
pub mod message;
mod pending;
pub mod shell;

pub use dispatcher::GeofencingAdapter;
pub use invocation::{Command, Invocation};
pub use message::{CommandResult, Outbound, Payload, ShellEvent};
pub use shell::{ChannelShell, ShellChannel};
