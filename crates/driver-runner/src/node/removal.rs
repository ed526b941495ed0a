//! Cooperative, bottom-up node removal.

use tracing::debug;

use super::{NODE_TARGET, NodeId, Removal, Topology};
use crate::driver_component::DriverId;

/// Follow-up work collected while removing nodes.
#[derive(Debug, Default)]
pub(crate) struct RemovalPlan {
    /// Drivers that must be asked to stop before their nodes can go.
    pub(crate) stop_drivers: Vec<DriverId>,
}

impl Topology {
    /// Removes `id` and everything below it.
    ///
    /// Children go first. A node with surviving children, or with a driver
    /// still attached, stays in removal until the last child or the driver's
    /// release re-enters this method. Detaching a composite removes every
    /// one of its parents. Re-entering for a node whose removal has finished
    /// does nothing.
    pub(crate) fn remove(&mut self, id: NodeId, plan: &mut RemovalPlan) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if node.removal == Removal::Done {
            return;
        }
        node.removal = Removal::InProgress;
        node.binder_enabled = false;

        let children = node.children.clone();
        for child in children {
            self.remove(child, plan);
        }

        let Some(remaining) = self.get_mut(id) else {
            return;
        };
        if !remaining.children.is_empty() {
            return;
        }
        if let Some(driver) = remaining.driver_component {
            plan.stop_drivers.push(driver);
            return;
        }

        let parents = std::mem::take(&mut remaining.parents);
        let composite = parents.len() > 1;
        for parent in parents {
            let Some(parent_node) = self.get_mut(parent) else {
                continue;
            };
            parent_node.children.retain(|child| *child != id);
            let orphaned_parent =
                parent_node.removal == Removal::InProgress && parent_node.children.is_empty();
            if orphaned_parent || composite {
                self.remove(parent, plan);
            }
        }

        self.finish_removal(id);
    }

    fn finish_removal(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if let Some(mut controller) = node.controller.take() {
            controller.unbind();
        }
        if let Some(mut server) = node.node_server.take() {
            server.unbind();
        }
        node.removal = Removal::Done;
        debug!(target: NODE_TARGET, node = %node.name, "node removed");
        if id != self.root {
            self.release(id);
        }
    }
}
