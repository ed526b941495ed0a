//! Device topology orchestration for a modular driver runtime.
//!
//! The crate keeps a graph of device nodes contributed by running drivers,
//! matches new nodes against a driver index, launches matched drivers into
//! driver host processes and tears the graph down, children first, when
//! nodes, drivers or hosts go away.
//!
//! Everything runs on one thread. Collaborators sit behind the
//! [`DriverIndex`], [`ComponentLauncher`], [`DriverHost`] and [`Driver`]
//! traits and report completions through [`Responder`]s and channel ends
//! that queue events for [`DriverRunner::run_until_idle`]. Nodes are
//! addressed by generational [`NodeId`]s, so a completion that arrives after
//! its node has gone simply finds nothing to act on.

mod args;
mod binding;
mod composite;
mod dispatch;
mod driver_component;
mod driver_host;
mod error;
mod index;
mod inspect;
mod launcher;
mod node;
mod offer;
mod runner;
pub mod telemetry;
mod token;

pub use args::{NodeAddArgs, NodeProperty, NodeSymbol, PropertyKey, PropertyValue};
pub use binding::{
    ComponentControllerServer, NodeClientEnd, NodeControllerServer, NodeServer, UnbindInfo,
    UnbindReason,
};
pub use dispatch::Responder;
pub use driver_component::DriverId;
pub use driver_host::{
    Driver, DriverHost, DriverServerEnd, DriverStartArgs, HostId, TeardownObserver,
};
pub use error::{NodeError, Status, TransportError};
pub use index::{DriverIndex, DriverInfo, MatchedCompositeInfo, MatchedDriver};
pub use inspect::InspectNode;
pub use launcher::{
    BOOT_DRIVER_COLLECTION, ChildDecl, Collection, CollectionRef, ComponentLauncher,
    ComponentStartInfo, CreateChildArgs, DRIVER_HOST_COLLECTION, DirectoryClient,
    DirectoryServer, NamespaceEntry, PACKAGE_DRIVER_COLLECTION, ProgramDictionary, ProgramValue,
    StartupMode, directory_endpoints,
};
pub use node::{COMPOSITE_NODE_NAME, Node, NodeId, NodeState, ROOT_NODE_NAME, Topology};
pub use offer::{ChildRef, Offer, OfferDecl, Ref};
pub use runner::DriverRunner;
pub use token::{HandleInfo, Koid, TOKEN_ID, Token};

#[cfg(test)]
mod tests;
