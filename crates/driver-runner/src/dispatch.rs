//! Completion events and the single-threaded queue that carries them.
//!
//! Collaborators never call back into the runner. Every asynchronous
//! completion is turned into an [`Event`] and posted to the runner's queue,
//! where `DriverRunner::run_until_idle` applies it. Events only carry
//! generational ids, so a completion whose target has gone away resolves to
//! nothing and is dropped.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use tracing::debug;

use crate::binding::UnbindInfo;
use crate::driver_component::DriverId;
use crate::driver_host::HostId;
use crate::error::{Status, TransportError};
use crate::index::MatchedDriver;
use crate::launcher::{Collection, DirectoryServer};
use crate::node::NodeId;

const DISPATCH_TARGET: &str = "driver_runner::dispatch";

/// Component whose creation is in flight.
#[derive(Debug)]
pub(crate) struct PendingComponent {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) collection: Collection,
    pub(crate) exposed_dir: Option<DirectoryServer>,
}

/// Completion applied by the runner's dispatch loop.
#[derive(Debug)]
pub(crate) enum Event {
    MatchCompleted {
        node: NodeId,
        result: Result<Result<MatchedDriver, Status>, TransportError>,
    },
    BaseDriversReady {
        result: Result<(), TransportError>,
    },
    ComponentCreated {
        component: PendingComponent,
        result: Result<Result<(), Status>, TransportError>,
    },
    ExposedDirOpened {
        name: String,
        url: String,
        result: Result<Result<(), Status>, TransportError>,
    },
    DriverChannelClosed {
        driver: DriverId,
        info: UnbindInfo,
    },
    DriverHostClosed {
        host: HostId,
    },
    NodeChannelClosed {
        node: NodeId,
    },
    ControllerUnbound {
        driver: DriverId,
    },
}

/// Posting side of the runner's queue.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    sender: Sender<Event>,
}

impl EventSender {
    pub(crate) fn post(&self, event: Event) {
        if let Err(error) = self.sender.send(event) {
            debug!(
                target: DISPATCH_TARGET,
                event = ?error.0,
                "runner has shut down, dropping event"
            );
        }
    }
}

/// Queue owned by the runner.
#[derive(Debug)]
pub(crate) struct EventQueue {
    sender: EventSender,
    receiver: Receiver<Event>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender: EventSender { sender },
            receiver,
        }
    }

    pub(crate) fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Next queued event, if any.
    pub(crate) fn try_next(&self) -> Option<Event> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

type Completion<T> = Box<dyn FnOnce(Result<T, TransportError>) -> Event + Send>;

/// One-shot reply slot handed to a collaborator with each request.
///
/// Answering posts the completion to the runner's queue. Dropping the
/// responder without answering reports [`TransportError::PeerClosed`], the
/// same as a peer that hangs up mid-request.
pub struct Responder<T> {
    events: EventSender,
    complete: Option<Completion<T>>,
}

impl<T> Responder<T> {
    pub(crate) fn new<F>(events: EventSender, complete: F) -> Self
    where
        F: FnOnce(Result<T, TransportError>) -> Event + Send + 'static,
    {
        Self {
            events,
            complete: Some(Box::new(complete)),
        }
    }

    /// Delivers the reply.
    pub fn respond(mut self, value: T) {
        self.finish(Ok(value));
    }

    /// Reports that the request could not be delivered or answered.
    pub fn fail(mut self, error: TransportError) {
        self.finish(Err(error));
    }

    fn finish(&mut self, result: Result<T, TransportError>) {
        if let Some(complete) = self.complete.take() {
            self.events.post(complete(result));
        }
    }
}

impl<T> Drop for Responder<T> {
    fn drop(&mut self) {
        self.finish(Err(TransportError::PeerClosed));
    }
}

impl<T> fmt::Debug for Responder<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Responder")
            .field("answered", &self.complete.is_none())
            .finish_non_exhaustive()
    }
}
