//! The orchestrator tying nodes, the driver index, the launcher and driver
//! hosts together.
//!
//! [`DriverRunner`] owns the topology and every piece of bookkeeping that
//! outlives a single request: live driver hosts, driver components, nodes
//! waiting for a fresh match, partially assembled composites and start
//! tokens that have been handed out but not yet redeemed. Collaborators
//! answer through [`crate::Responder`]s and channel ends that post events to
//! the runner's queue; [`DriverRunner::run_until_idle`] applies them.

mod bind;
mod lifecycle;
mod start;

use std::collections::HashMap;

use driver_runner_config::Config;
use tracing::{debug, warn};

use crate::args::NodeAddArgs;
use crate::binding::{NodeControllerServer, NodeServer};
use crate::composite::CompositeArgs;
use crate::dispatch::{Event, EventQueue};
use crate::driver_component::DriverComponents;
use crate::driver_host::DriverHosts;
use crate::error::NodeError;
use crate::index::DriverIndex;
use crate::inspect::{self, InspectNode};
use crate::launcher::ComponentLauncher;
use crate::node::{Node, NodeId, RemovalPlan, Topology};
use crate::token::Koid;

const RUNNER_TARGET: &str = "driver_runner::runner";

/// Orchestrates binding, starting and removal of drivers across the device
/// topology.
#[derive(Debug)]
pub struct DriverRunner<I, L> {
    config: Config,
    index: I,
    launcher: L,
    topology: Topology,
    hosts: DriverHosts,
    drivers: DriverComponents,
    orphaned: Vec<NodeId>,
    composites: CompositeArgs,
    pending_starts: HashMap<Koid, NodeId>,
    queue: EventQueue,
}

impl<I, L> DriverRunner<I, L>
where
    I: DriverIndex,
    L: ComponentLauncher,
{
    /// Creates a runner with an empty topology.
    #[must_use]
    pub fn new(config: Config, index: I, launcher: L) -> Self {
        Self {
            config,
            index,
            launcher,
            topology: Topology::new(),
            hosts: DriverHosts::default(),
            drivers: DriverComponents::default(),
            orphaned: Vec::new(),
            composites: CompositeArgs::default(),
            pending_starts: HashMap::new(),
            queue: EventQueue::new(),
        }
    }

    /// Configuration the runner was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The root node.
    #[must_use]
    pub const fn root_node(&self) -> NodeId {
        self.topology.root()
    }

    /// Looks up a live node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.topology.get(id)
    }

    /// The whole device topology.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Nodes waiting for the driver index to learn about more drivers.
    #[must_use]
    pub fn num_orphaned_nodes(&self) -> usize {
        self.orphaned.len()
    }

    /// Driver host connections currently alive.
    #[must_use]
    pub fn num_driver_hosts(&self) -> usize {
        self.hosts.len()
    }

    /// Drivers currently bound to nodes.
    #[must_use]
    pub fn num_drivers(&self) -> usize {
        self.drivers.len()
    }

    /// Composites still waiting for some of their parts.
    #[must_use]
    pub fn num_pending_composites(&self) -> usize {
        self.composites.len()
    }

    /// Snapshot of the topology for diagnostics.
    #[must_use]
    pub fn inspect(&self) -> InspectNode {
        inspect::snapshot(&self.topology)
    }

    /// Adds a child under `parent`.
    ///
    /// The controller binding is kept for the child's lifetime. When
    /// `node_server` is supplied the caller serves the child itself and
    /// closing it removes the child; otherwise the child is matched against
    /// the driver index.
    ///
    /// # Errors
    ///
    /// Returns the [`NodeError`] describing the first invalid part of the
    /// request. Nothing is changed in that case.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        args: NodeAddArgs,
        controller: Box<dyn NodeControllerServer>,
        node_server: Option<Box<dyn NodeServer>>,
    ) -> Result<NodeId, NodeError> {
        let needs_driver = node_server.is_none();
        let child = self
            .topology
            .add_child(parent, &args, controller, node_server)?;
        if needs_driver {
            self.bind(child, args);
        }
        Ok(child)
    }

    /// Removes `node` and its subtree, stopping drivers as needed.
    pub fn remove_node(&mut self, node: NodeId) {
        let mut plan = RemovalPlan::default();
        self.topology.remove(node, &mut plan);
        for driver in plan.stop_drivers {
            let Some(component) = self.drivers.get_mut(driver) else {
                warn!(
                    target: RUNNER_TARGET,
                    driver = %driver,
                    "node refers to a driver that no longer exists"
                );
                continue;
            };
            component.stop_driver();
        }
    }

    /// Reacts to the client of a node connection hanging up.
    pub fn node_channel_closed(&mut self, node: NodeId) {
        if !self.topology.contains(node) {
            debug!(
                target: RUNNER_TARGET,
                node = %node,
                "node channel closed after the node was released"
            );
            return;
        }
        self.remove_node(node);
    }

    /// Applies queued completions until none are left.
    ///
    /// Returns the number of events applied.
    pub fn run_until_idle(&mut self) -> usize {
        let mut applied = 0_usize;
        while let Some(event) = self.queue.try_next() {
            self.handle_event(event);
            applied = applied.saturating_add(1);
        }
        applied
    }

    pub(crate) fn handle_event(&mut self, event: Event) {
        match event {
            Event::MatchCompleted { node, result } => self.on_match_completed(node, result),
            Event::BaseDriversReady { result } => self.on_base_drivers_ready(result),
            Event::ComponentCreated { component, result } => {
                self.on_component_created(component, result);
            }
            Event::ExposedDirOpened { name, url, result } => {
                Self::on_exposed_dir_opened(&name, &url, result);
            }
            Event::DriverChannelClosed { driver, info } => {
                self.on_driver_channel_closed(driver, info);
            }
            Event::DriverHostClosed { host } => self.on_driver_host_closed(host),
            Event::NodeChannelClosed { node } => self.node_channel_closed(node),
            Event::ControllerUnbound { driver } => self.release_driver(driver),
        }
    }
}
