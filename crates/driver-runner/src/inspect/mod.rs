//! Diagnostic snapshots of the device topology.

use std::collections::HashSet;

use serde::Serialize;

use crate::node::{NodeId, Topology};

/// One entry of a topology snapshot.
///
/// Composite nodes are reachable from several parents. They appear under
/// each of them, but their details are only filled in the first time the
/// walk reaches them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InspectNode {
    /// Node name.
    pub name: String,
    /// Comma-separated offer names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers: Option<String>,
    /// Comma-separated names of the symbols visible to the node's driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<String>,
    /// Children in insertion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl InspectNode {
    /// Finds the first descendant, in pre-order, called `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Renders the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serialiser error if rendering fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Walks `topology` from its root.
pub(crate) fn snapshot(topology: &Topology) -> InspectNode {
    let mut visited = HashSet::new();
    let root = topology.root();
    let name = topology
        .get(root)
        .map(|node| node.name().to_owned())
        .unwrap_or_default();
    describe(topology, root, name, &mut visited)
}

fn describe(
    topology: &Topology,
    id: NodeId,
    name: String,
    visited: &mut HashSet<NodeId>,
) -> InspectNode {
    let mut entry = InspectNode {
        name,
        ..InspectNode::default()
    };
    if !visited.insert(id) {
        return entry;
    }
    let Some(node) = topology.get(id) else {
        return entry;
    };

    if !node.offers().is_empty() {
        let labels: Vec<&str> = node.offers().iter().map(|offer| offer.label()).collect();
        entry.offers = Some(labels.join(", "));
    }
    let symbols = topology.symbols(id);
    if !symbols.is_empty() {
        let names: Vec<&str> = symbols
            .iter()
            .map(|symbol| symbol.name.as_deref().unwrap_or_default())
            .collect();
        entry.symbols = Some(names.join(", "));
    }
    for child in node.children() {
        let child_name = topology
            .get(*child)
            .map(|found| found.name().to_owned())
            .unwrap_or_default();
        entry
            .children
            .push(describe(topology, *child, child_name, visited));
    }
    entry
}
