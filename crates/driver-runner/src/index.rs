//! Driver index contract.

use crate::args::NodeAddArgs;
use crate::dispatch::Responder;
use crate::error::Status;

/// Driver selected for a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverInfo {
    /// Component URL of the driver.
    pub url: Option<String>,
}

impl DriverInfo {
    /// Describes the driver at `url`.
    #[must_use]
    pub fn at(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

/// A match that places the node inside a composite device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedCompositeInfo {
    /// Position of the node within the composite.
    pub node_index: Option<u32>,
    /// Number of nodes the composite needs.
    pub num_nodes: Option<u32>,
    /// Driver bound to the assembled composite.
    pub driver_info: Option<DriverInfo>,
}

impl MatchedCompositeInfo {
    /// Describes slot `node_index` of an `num_nodes`-node composite bound to
    /// the driver at `url`.
    #[must_use]
    pub fn slot(node_index: u32, num_nodes: u32, url: impl Into<String>) -> Self {
        Self {
            node_index: Some(node_index),
            num_nodes: Some(num_nodes),
            driver_info: Some(DriverInfo::at(url)),
        }
    }
}

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedDriver {
    /// The node binds directly to a driver.
    Driver(DriverInfo),
    /// The node is one part of a composite.
    CompositeDriver(MatchedCompositeInfo),
    /// A match kind this runner does not understand.
    Unknown,
}

/// Matches nodes against the set of available drivers.
pub trait DriverIndex {
    /// Looks up a driver for the node described by `args`.
    fn match_driver(
        &mut self,
        args: NodeAddArgs,
        responder: Responder<Result<MatchedDriver, Status>>,
    );

    /// Answers once the base drivers have been loaded into the index.
    fn wait_for_base_drivers(&mut self, responder: Responder<()>);
}
