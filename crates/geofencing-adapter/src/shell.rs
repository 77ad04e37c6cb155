// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The shell-facing half of the adapter.

use tokio::sync::mpsc;
use tracing::warn;

use geofencing_core::types::CallbackId;

use crate::message::{CommandResult, Outbound, ShellEvent};

/// Where results and notifications go. Implemented by whatever hosts the
/// webview (plugin result callbacks, document events, a line protocol).
pub trait ShellChannel {
    /// Deliver the single terminal result for `callback_id`.
    fn send_result(&self, callback_id: &CallbackId, result: CommandResult);

    /// Deliver an out-of-band notification.
    fn send_event(&self, event: ShellEvent);
}

/// `ShellChannel` that queues everything, in order, on a tokio channel.
#[derive(Clone)]
pub struct ChannelShell {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelShell {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, outbound: Outbound) {
        if self.tx.send(outbound).is_err() {
            warn!("shell receiver closed, outbound message dropped");
        }
    }
}

impl ShellChannel for ChannelShell {
    fn send_result(&self, callback_id: &CallbackId, result: CommandResult) {
        self.push(Outbound::Result {
            callback_id: callback_id.clone(),
            result,
        });
    }

    fn send_event(&self, event: ShellEvent) {
        self.push(Outbound::Event { event });
    }
}
