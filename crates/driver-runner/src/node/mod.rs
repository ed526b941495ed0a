//! Device topology.
//!
//! Nodes live in a generational arena. A [`NodeId`] is a weak handle: once
//! the node it names has been freed the id stops resolving, even if the slot
//! is reused. Parent links are ids; the `children` lists are the owning
//! relation.

mod add_child;
mod removal;

use std::fmt;

use tracing::{error, warn};

use crate::args::{NodeAddArgs, NodeProperty, NodeSymbol};
use crate::binding::{NodeControllerServer, NodeServer};
use crate::driver_component::DriverId;
use crate::driver_host::HostId;
use crate::launcher::Collection;
use crate::offer::{ChildRef, Offer, Ref};

pub(crate) use removal::RemovalPlan;

const NODE_TARGET: &str = "driver_runner::node";

/// Name given to the root of every topology.
pub const ROOT_NODE_NAME: &str = "root";

/// Name given to synthesised composite nodes.
pub const COMPOSITE_NODE_NAME: &str = "composite";

/// Generational handle to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "node#{}v{}", self.index, self.generation)
    }
}

/// Progress of a node's removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Removal {
    #[default]
    NotRequested,
    InProgress,
    Done,
}

/// Externally visible lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No driver is running on the node.
    Unbound,
    /// A driver component is attached to the node.
    DriverBound,
    /// Removal has started but children or a driver are still winding down.
    RemovalInProgress,
    /// Removal finished. Only the root survives in this state.
    Removed,
}

/// A vertex of the device topology.
pub struct Node {
    name: String,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
    offers: Vec<Offer>,
    properties: Vec<NodeProperty>,
    symbols: Vec<NodeSymbol>,
    collection: Collection,
    driver_host: Option<HostId>,
    binder_enabled: bool,
    removal: Removal,
    driver_component: Option<DriverId>,
    controller: Option<Box<dyn NodeControllerServer>>,
    node_server: Option<Box<dyn NodeServer>>,
}

impl Node {
    fn new(name: String, parents: Vec<NodeId>, driver_host: Option<HostId>) -> Self {
        Self {
            name,
            parents,
            children: Vec::new(),
            offers: Vec::new(),
            properties: Vec::new(),
            symbols: Vec::new(),
            collection: Collection::None,
            driver_host,
            binder_enabled: true,
            removal: Removal::NotRequested,
            driver_component: None,
            controller: None,
            node_server: None,
        }
    }

    /// Name, unique among siblings.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parents in declaration order; the first is the primary parent.
    #[must_use]
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Offers routed to the driver bound to this node.
    #[must_use]
    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    /// Match properties.
    #[must_use]
    pub fn properties(&self) -> &[NodeProperty] {
        &self.properties
    }

    /// Symbols this node exports to colocated children.
    #[must_use]
    pub fn exported_symbols(&self) -> &[NodeSymbol] {
        &self.symbols
    }

    /// Collection the node's driver runs in.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Host the node's driver runs in, or would be colocated into.
    #[must_use]
    pub const fn driver_host(&self) -> Option<HostId> {
        self.driver_host
    }

    /// Driver component bound to the node.
    #[must_use]
    pub const fn driver_component(&self) -> Option<DriverId> {
        self.driver_component
    }

    /// Returns `true` for nodes with more than one parent.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.parents.len() > 1
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> NodeState {
        match self.removal {
            Removal::Done => NodeState::Removed,
            Removal::InProgress => NodeState::RemovalInProgress,
            Removal::NotRequested if self.driver_component.is_some() => NodeState::DriverBound,
            Removal::NotRequested => NodeState::Unbound,
        }
    }

    pub(crate) const fn set_collection(&mut self, collection: Collection) {
        self.collection = collection;
    }

    pub(crate) const fn set_driver_host(&mut self, host: Option<HostId>) {
        self.driver_host = host;
    }

    pub(crate) const fn set_driver_component(&mut self, driver: Option<DriverId>) {
        self.driver_component = driver;
    }

    /// Installs the runner-side node server, releasing any previous one.
    pub(crate) fn set_node_server(&mut self, server: Box<dyn NodeServer>) {
        if let Some(mut previous) = self.node_server.replace(server) {
            previous.unbind();
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Node")
            .field("name", &self.name)
            .field("parents", &self.parents)
            .field("children", &self.children)
            .field("collection", &self.collection)
            .field("driver_host", &self.driver_host)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena holding every live node, rooted at a single root node.
#[derive(Debug)]
pub struct Topology {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    /// Creates a topology containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let root_node = Node::new(String::from(ROOT_NODE_NAME), Vec::new(), None);
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root_node),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Resolves `id`, or `None` once the node has been freed.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(usize::try_from(id.index).ok()?)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(usize::try_from(id.index).ok()?)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Returns `true` while `id` names a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Always `false`: the root is never freed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot_index = usize::try_from(index).ok();
            if let Some(slot) = slot_index.and_then(|i| self.slots.get_mut(i)) {
                slot.node = Some(node);
                return NodeId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(usize::try_from(id.index).ok()?)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// First parent of `id`, if any.
    #[must_use]
    pub fn primary_parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parents.first().copied()
    }

    /// Names along the primary-parent chain, root first, joined with `.`.
    #[must_use]
    pub fn topo_name(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current)?;
            names.push(node.name.as_str());
            if names.len() > self.slots.len() {
                break;
            }
            cursor = node.parents.first().copied();
        }
        names.reverse();
        Some(names.join("."))
    }

    /// Symbols visible to the driver bound to `id`.
    ///
    /// Symbols flow only between colocated nodes: when the primary parent
    /// shares this node's host, a composite sees its primary parent's
    /// symbols and any other node sees its own.
    #[must_use]
    pub fn symbols(&self, id: NodeId) -> Vec<NodeSymbol> {
        let host = self.get(id).and_then(Node::driver_host);
        self.symbols_for_host(id, host)
    }

    /// Symbols `id` would see if its driver ran in `host`.
    pub(crate) fn symbols_for_host(&self, id: NodeId, host: Option<HostId>) -> Vec<NodeSymbol> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let Some(primary) = node.parents.first().and_then(|parent| self.get(*parent)) else {
            return Vec::new();
        };
        if primary.driver_host != host {
            return Vec::new();
        }
        if node.is_composite() {
            primary.symbols.clone()
        } else {
            node.symbols.clone()
        }
    }

    /// Nearest node on the primary-parent chain, starting at `start`, that
    /// has a collection.
    fn collection_source(&self, start: NodeId) -> Option<NodeId> {
        let mut cursor = Some(start);
        let mut steps = 0;
        while let Some(current) = cursor {
            let node = self.get(current)?;
            if node.collection != Collection::None {
                return Some(current);
            }
            steps += 1;
            if steps > self.slots.len() {
                return None;
            }
            cursor = node.parents.first().copied();
        }
        None
    }

    /// Routes offers to the driver of `id`.
    ///
    /// An ordinary node routes its own offers; a composite routes each
    /// parent's offers. Each offer's source becomes the nearest ancestor
    /// running in a collection, and the rewrite is kept on the offering
    /// node.
    pub(crate) fn create_offers(&mut self, id: NodeId) -> Vec<Offer> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let parents = node.parents.clone();
        let composite = parents.len() > 1;
        let mut routed = Vec::new();
        for parent in parents {
            let offering = if composite { parent } else { id };
            let source = self.collection_source(parent).and_then(|source| {
                let name = self.topo_name(source)?;
                let collection = self.get(source)?.collection.name().map(str::to_owned);
                Some(Ref::Child(ChildRef { name, collection }))
            });
            let Some(offering_node) = self.get_mut(offering) else {
                continue;
            };
            match source {
                Some(source) => {
                    for offer in &mut offering_node.offers {
                        offer.set_source(source.clone());
                    }
                }
                None if !offering_node.offers.is_empty() => {
                    warn!(
                        target: NODE_TARGET,
                        node = %offering_node.name,
                        "no ancestor runs in a collection, offers left unrouted"
                    );
                }
                None => {}
            }
            routed.extend(offering_node.offers.iter().cloned());
        }
        routed
    }

    /// Rebuilds the add arguments of `id` for a fresh match.
    pub(crate) fn create_add_args(&mut self, id: NodeId) -> Option<NodeAddArgs> {
        let offers = self.create_offers(id);
        let node = self.get(id)?;
        Some(NodeAddArgs {
            name: Some(node.name.clone()),
            offers: Some(offers),
            properties: Some(node.properties.clone()),
            symbols: Some(node.symbols.clone()),
        })
    }

    /// Synthesises a composite node over `parents`, in order.
    pub(crate) fn create_composite(&mut self, parents: Vec<NodeId>) -> NodeId {
        let driver_host = parents
            .first()
            .and_then(|primary| self.get(*primary))
            .and_then(Node::driver_host);
        let composite = self.insert(Node::new(
            String::from(COMPOSITE_NODE_NAME),
            parents,
            driver_host,
        ));
        self.add_to_parents(composite);
        composite
    }

    fn add_to_parents(&mut self, id: NodeId) {
        let parents = self.get(id).map(|node| node.parents.clone()).unwrap_or_default();
        for parent in parents {
            if let Some(parent_node) = self.get_mut(parent) {
                parent_node.children.push(id);
            }
        }
    }

    /// Tells the controller's owner that `id` was bound.
    pub(crate) fn on_bind(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        let Some(controller) = node.controller.as_mut() else {
            return;
        };
        if let Err(transport) = controller.on_bind() {
            error!(
                target: NODE_TARGET,
                node = %node.name,
                error = %transport,
                "failed to send OnBind event"
            );
        }
    }
}
