//! Driver index double that holds requests until the test answers them.

use std::sync::{Arc, Mutex};

use crate::args::NodeAddArgs;
use crate::dispatch::Responder;
use crate::error::{Status, TransportError};
use crate::index::{DriverIndex, MatchedDriver};

use super::with_state;

struct PendingMatch {
    args: NodeAddArgs,
    responder: Responder<Result<MatchedDriver, Status>>,
}

#[derive(Default)]
struct IndexState {
    requests: Vec<NodeAddArgs>,
    pending: Vec<PendingMatch>,
    base_driver_waits: Vec<Responder<()>>,
}

/// Driver index that records match requests and answers on demand.
#[derive(Clone, Default)]
pub struct FakeDriverIndex {
    shared: Arc<Mutex<IndexState>>,
}

impl FakeDriverIndex {
    /// Returns a handle for answering requests and asserting on them.
    pub fn handle(&self) -> DriverIndexHandle {
        DriverIndexHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl DriverIndex for FakeDriverIndex {
    fn match_driver(
        &mut self,
        args: NodeAddArgs,
        responder: Responder<Result<MatchedDriver, Status>>,
    ) {
        with_state(&self.shared, |state| {
            state.requests.push(args.clone());
            state.pending.push(PendingMatch { args, responder });
        });
    }

    fn wait_for_base_drivers(&mut self, responder: Responder<()>) {
        with_state(&self.shared, |state| state.base_driver_waits.push(responder));
    }
}

/// Control handle for a [`FakeDriverIndex`].
#[derive(Clone)]
pub struct DriverIndexHandle {
    shared: Arc<Mutex<IndexState>>,
}

impl DriverIndexHandle {
    /// Names of every node the index was asked to match, in order.
    pub fn requested_names(&self) -> Vec<String> {
        with_state(&self.shared, |state| {
            state
                .requests
                .iter()
                .filter_map(|args| args.name.clone())
                .collect()
        })
    }

    /// Every match request received, in order.
    pub fn requests(&self) -> Vec<NodeAddArgs> {
        with_state(&self.shared, |state| state.requests.clone())
    }

    /// Number of unanswered match requests.
    pub fn pending_matches(&self) -> usize {
        with_state(&self.shared, |state| state.pending.len())
    }

    /// Number of unanswered base-driver waits.
    pub fn pending_base_driver_waits(&self) -> usize {
        with_state(&self.shared, |state| state.base_driver_waits.len())
    }

    fn take_match(&self, name: &str) -> Responder<Result<MatchedDriver, Status>> {
        let pending = with_state(&self.shared, |state| {
            let position = state
                .pending
                .iter()
                .position(|entry| entry.args.name.as_deref() == Some(name))?;
            Some(state.pending.remove(position))
        });
        pending
            .unwrap_or_else(|| panic!("no pending match request for '{name}'"))
            .responder
    }

    /// Answers the oldest pending match for `name`.
    pub fn respond(&self, name: &str, result: Result<MatchedDriver, Status>) {
        self.take_match(name).respond(result);
    }

    /// Fails the oldest pending match for `name` at the transport level.
    pub fn fail(&self, name: &str, error: TransportError) {
        self.take_match(name).fail(error);
    }

    /// Signals every pending base-driver wait.
    pub fn signal_base_drivers(&self) {
        let waits = with_state(&self.shared, |state| std::mem::take(&mut state.base_driver_waits));
        for wait in waits {
            wait.respond(());
        }
    }

    /// Fails every pending base-driver wait.
    pub fn fail_base_drivers(&self, error: TransportError) {
        let waits = with_state(&self.shared, |state| std::mem::take(&mut state.base_driver_waits));
        for wait in waits {
            wait.fail(error);
        }
    }
}
