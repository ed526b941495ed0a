//! Error types shared by the runner and its collaborators.

use thiserror::Error;

/// Status code carried by failed requests and channel epitaphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Status {
    /// The request carried malformed or inconsistent arguments.
    #[error("invalid arguments")]
    InvalidArgs,
    /// The target of the request is not available.
    #[error("unavailable")]
    Unavailable,
    /// The remote end of a channel went away.
    #[error("peer closed")]
    PeerClosed,
    /// The requested entity does not exist.
    #[error("not found")]
    NotFound,
    /// The target is in a state that cannot serve the request.
    #[error("bad state")]
    BadState,
    /// The operation is not supported by the peer.
    #[error("not supported")]
    NotSupported,
    /// The peer refused the request.
    #[error("access denied")]
    AccessDenied,
    /// An internal invariant was violated on the remote side.
    #[error("internal error")]
    Internal,
}

/// Failure to deliver a request or receive its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer closed the channel before replying.
    #[error("peer closed the channel")]
    PeerClosed,
    /// The channel failed with a status.
    #[error("transport failed: {0}")]
    Status(Status),
}

impl TransportError {
    /// Status equivalent of the transport failure.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::PeerClosed => Status::PeerClosed,
            Self::Status(status) => status,
        }
    }

    /// Returns `true` when the peer simply went away.
    #[must_use]
    pub const fn is_peer_closed(self) -> bool {
        matches!(self, Self::PeerClosed | Self::Status(Status::PeerClosed))
    }
}

impl From<TransportError> for Status {
    fn from(error: TransportError) -> Self {
        error.status()
    }
}

/// Rejection reasons for `AddChild` requests.
///
/// Validation happens in declaration order; the first failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum NodeError {
    /// The parent is being removed and no longer accepts children.
    #[error("parent node is being removed")]
    NodeRemoved,
    /// No child name was supplied.
    #[error("child name is missing")]
    NameMissing,
    /// The child name contains a `.`.
    #[error("child name must not contain '.'")]
    NameInvalid,
    /// A sibling already uses the name.
    #[error("a sibling with this name already exists")]
    NameAlreadyExists,
    /// An offer has no source name.
    #[error("offer is missing a source name")]
    OfferSourceNameMissing,
    /// An offer names an explicit source or target.
    #[error("offer must not set a source or target")]
    OfferRefExists,
    /// A symbol has no name.
    #[error("symbol is missing a name")]
    SymbolNameMissing,
    /// A symbol has no address.
    #[error("symbol is missing an address")]
    SymbolAddressMissing,
    /// A symbol name appears twice in one request.
    #[error("symbol name is duplicated")]
    SymbolAlreadyExists,
}
