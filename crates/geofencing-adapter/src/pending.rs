// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bookkeeping for invocation handles that are still owed a response.

use std::collections::{HashMap, HashSet, VecDeque};

use geofencing_core::types::CallbackId;

/// Outstanding handles and what each one is waiting for.
///
/// `live` is the source of truth: a handle may receive a response only
/// while it is in `live`, and closing removes it. The waiter lists only say
/// which platform event resolves which handle.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    live: HashSet<CallbackId>,
    permission: Vec<CallbackId>,
    /// Per region identifier, in issue order.
    starts: HashMap<String, VecDeque<CallbackId>>,
}

impl PendingTable {
    /// Admit a new handle. `false` if it is already outstanding.
    pub(crate) fn open(&mut self, id: CallbackId) -> bool {
        self.live.insert(id)
    }

    /// Retire a handle. `false` if it was not outstanding.
    pub(crate) fn close(&mut self, id: &CallbackId) -> bool {
        self.live.remove(id)
    }

    pub(crate) fn await_permission(&mut self, id: CallbackId) {
        self.permission.push(id);
    }

    pub(crate) fn take_permission_waiters(&mut self) -> Vec<CallbackId> {
        std::mem::take(&mut self.permission)
    }

    pub(crate) fn await_start(&mut self, identifier: String, id: CallbackId) {
        self.starts.entry(identifier).or_default().push_back(id);
    }

    /// Oldest start still waiting on `identifier`.
    pub(crate) fn take_start(&mut self, identifier: &str) -> Option<CallbackId> {
        let queue = self.starts.get_mut(identifier)?;
        let id = queue.pop_front();
        if queue.is_empty() {
            self.starts.remove(identifier);
        }
        id
    }

    /// Every start waiting on `identifier`, oldest first.
    pub(crate) fn take_starts(&mut self, identifier: &str) -> Vec<CallbackId> {
        self.starts
            .remove(identifier)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.live.len()
    }

    /// Forget all waiters and hand back every outstanding handle.
    pub(crate) fn drain(&mut self) -> Vec<CallbackId> {
        self.permission.clear();
        self.starts.clear();
        let mut ids: Vec<CallbackId> = self.live.drain().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CallbackId {
        CallbackId::new(s)
    }

    #[test]
    fn handle_closes_once() {
        let mut table = PendingTable::default();
        assert!(table.open(id("1")));
        assert!(!table.open(id("1")));
        assert!(table.close(&id("1")));
        assert!(!table.close(&id("1")));
    }

    #[test]
    fn starts_resolve_in_issue_order() {
        let mut table = PendingTable::default();
        table.await_start("home".into(), id("1"));
        table.await_start("home".into(), id("2"));
        assert_eq!(table.take_start("home"), Some(id("1")));
        assert_eq!(table.take_starts("home"), vec![id("2")]);
        assert_eq!(table.take_start("home"), None);
    }

    #[test]
    fn drain_returns_every_live_handle() {
        let mut table = PendingTable::default();
        table.open(id("b"));
        table.open(id("a"));
        table.await_permission(id("a"));
        assert_eq!(table.drain(), vec![id("a"), id("b")]);
        assert_eq!(table.outstanding(), 0);
        assert!(table.take_permission_waiters().is_empty());
    }
}
