//! Server bindings attached to nodes and driver components.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dispatch::{Event, EventSender};
use crate::error::{Status, TransportError};
use crate::node::NodeId;

/// Why a channel binding ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbindReason {
    /// The peer closed its end.
    PeerClosed,
    /// The local side unbound.
    Unbind,
    /// The local side closed with an epitaph.
    Close,
    /// The channel failed.
    TransportError,
}

/// How a channel binding ended, including the peer's epitaph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnbindInfo {
    /// Reason the binding ended.
    pub reason: UnbindReason,
    /// Epitaph status. `None` means the channel ended with OK.
    pub status: Option<Status>,
}

impl UnbindInfo {
    /// The peer closed, optionally leaving a non-OK epitaph.
    #[must_use]
    pub const fn peer_closed(status: Option<Status>) -> Self {
        Self {
            reason: UnbindReason::PeerClosed,
            status,
        }
    }

    /// The channel failed with `error`.
    #[must_use]
    pub const fn transport(error: TransportError) -> Self {
        Self {
            reason: UnbindReason::TransportError,
            status: Some(error.status()),
        }
    }

    /// Returns `true` for an orderly peer close with an OK epitaph.
    #[must_use]
    pub const fn is_clean(self) -> bool {
        matches!(self.reason, UnbindReason::PeerClosed) && self.status.is_none()
    }
}

impl fmt::Display for UnbindInfo {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(status) = self.status else {
            return write!(formatter, "{:?} (ok)", self.reason);
        };
        write!(formatter, "{:?} ({status})", self.reason)
    }
}

/// Server side of a `NodeController` connection.
pub trait NodeControllerServer {
    /// Tells the controller's owner that a driver was bound to the node.
    ///
    /// # Errors
    ///
    /// Returns the transport failure when the event could not be sent.
    fn on_bind(&mut self) -> Result<(), TransportError>;

    /// Releases the binding. Called once, when the node is destroyed.
    fn unbind(&mut self);
}

/// Server side of a `Node` connection.
pub trait NodeServer {
    /// Releases the binding. Called once, when the node is destroyed.
    fn unbind(&mut self);
}

/// Server side of a component controller connection.
pub trait ComponentControllerServer {
    /// Closes the connection with `epitaph`; `None` closes with OK.
    fn close(&mut self, epitaph: Option<Status>);
}

/// Client end of a node connection handed to a started driver.
///
/// The driver adds children through the runner using [`Self::node`]. Closing
/// the end asks the runner to remove the node.
#[derive(Debug)]
pub struct NodeClientEnd {
    node: NodeId,
    bound: Arc<AtomicBool>,
    events: EventSender,
}

impl NodeClientEnd {
    /// Node this end is connected to.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Returns `true` while the runner still serves the node.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    /// Hangs up. The runner removes the node unless it already released it.
    pub fn close(self) {
        if self.is_bound() {
            self.events.post(Event::NodeChannelClosed { node: self.node });
        }
    }
}

/// Runner-side node server paired with a [`NodeClientEnd`].
#[derive(Debug)]
pub(crate) struct LocalNodeServer {
    bound: Arc<AtomicBool>,
}

impl NodeServer for LocalNodeServer {
    fn unbind(&mut self) {
        self.bound.store(false, Ordering::Release);
    }
}

/// Creates a connected node client and server for `node`.
pub(crate) fn node_endpoints(
    node: NodeId,
    events: EventSender,
) -> (NodeClientEnd, LocalNodeServer) {
    let bound = Arc::new(AtomicBool::new(true));
    let client = NodeClientEnd {
        node,
        bound: Arc::clone(&bound),
        events,
    };
    (client, LocalNodeServer { bound })
}
