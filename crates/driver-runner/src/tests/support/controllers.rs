//! Recording controller and node servers.

use std::sync::{Arc, Mutex};

use crate::binding::{ComponentControllerServer, NodeControllerServer, NodeServer};
use crate::error::{Status, TransportError};

use super::with_state;

#[derive(Debug, Default)]
struct ControllerState {
    on_bind: usize,
    unbind: usize,
    fail_on_bind: bool,
}

/// Node controller server that counts the events it sees.
#[derive(Debug, Clone, Default)]
pub struct RecordingNodeController {
    shared: Arc<Mutex<ControllerState>>,
}

impl RecordingNodeController {
    /// A controller whose `OnBind` delivery fails.
    pub fn failing_on_bind() -> Self {
        let controller = Self::default();
        with_state(&controller.shared, |state| state.fail_on_bind = true);
        controller
    }

    /// Returns a handle for assertions.
    pub fn handle(&self) -> NodeControllerHandle {
        NodeControllerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl NodeControllerServer for RecordingNodeController {
    fn on_bind(&mut self) -> Result<(), TransportError> {
        with_state(&self.shared, |state| {
            state.on_bind += 1;
            if state.fail_on_bind {
                return Err(TransportError::PeerClosed);
            }
            Ok(())
        })
    }

    fn unbind(&mut self) {
        with_state(&self.shared, |state| state.unbind += 1);
    }
}

/// Assertion handle for a [`RecordingNodeController`].
#[derive(Debug, Clone)]
pub struct NodeControllerHandle {
    shared: Arc<Mutex<ControllerState>>,
}

impl NodeControllerHandle {
    /// Number of `OnBind` events sent.
    pub fn on_bind_count(&self) -> usize {
        with_state(&self.shared, |state| state.on_bind)
    }

    /// Number of times the binding was released.
    pub fn unbind_count(&self) -> usize {
        with_state(&self.shared, |state| state.unbind)
    }
}

/// Node server that counts releases.
#[derive(Debug, Clone, Default)]
pub struct RecordingNodeServer {
    unbinds: Arc<Mutex<usize>>,
}

impl RecordingNodeServer {
    /// Number of times the binding was released.
    pub fn unbind_count(&self) -> usize {
        with_state(&self.unbinds, |count| *count)
    }
}

impl NodeServer for RecordingNodeServer {
    fn unbind(&mut self) {
        with_state(&self.unbinds, |count| *count += 1);
    }
}

/// Component controller server that records its epitaphs.
#[derive(Debug, Clone, Default)]
pub struct RecordingComponentController {
    epitaphs: Arc<Mutex<Vec<Option<Status>>>>,
}

impl RecordingComponentController {
    /// Epitaphs the controller was closed with, in order.
    pub fn epitaphs(&self) -> Vec<Option<Status>> {
        with_state(&self.epitaphs, |epitaphs| epitaphs.clone())
    }
}

impl ComponentControllerServer for RecordingComponentController {
    fn close(&mut self, epitaph: Option<Status>) {
        with_state(&self.epitaphs, |epitaphs| epitaphs.push(epitaph));
    }
}
