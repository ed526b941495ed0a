//! Assembly of composite nodes from independently matched parts.
//!
//! Each part of a composite is matched on its own. The collector keeps one
//! entry per partially assembled composite, keyed by the composite driver's
//! URL, with one weak slot per part. The entry is consumed once every slot
//! resolves to a live node at the same time.

use tracing::error;

use crate::error::Status;
use crate::index::MatchedCompositeInfo;
use crate::node::{NodeId, Topology};

const COMPOSITE_TARGET: &str = "driver_runner::composite";

/// Outcome of adding a part to a composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompositeProgress {
    /// Some parts are still missing or have gone away.
    Incomplete,
    /// Every part is live; the parents of the new composite, in order.
    Complete(Vec<NodeId>),
}

#[derive(Debug)]
struct CompositeEntry {
    url: String,
    nodes: Vec<Option<NodeId>>,
}

/// Partially assembled composites, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct CompositeArgs {
    entries: Vec<CompositeEntry>,
}

impl CompositeArgs {
    /// Places `node` into its slot of a composite described by `info`.
    ///
    /// # Errors
    ///
    /// Returns [`Status::InvalidArgs`] when the match is malformed or
    /// disagrees with an existing entry about the number of parts.
    pub(crate) fn add(
        &mut self,
        node: NodeId,
        name: &str,
        info: &MatchedCompositeInfo,
        topology: &Topology,
    ) -> Result<CompositeProgress, Status> {
        let (slot, position) = self.entry_for(name, info, topology)?;
        let Some(entry) = self.entries.get_mut(position) else {
            return Err(Status::Internal);
        };
        let Some(target) = entry.nodes.get_mut(slot) else {
            return Err(Status::InvalidArgs);
        };
        *target = Some(node);

        let resolved: Option<Vec<NodeId>> = entry
            .nodes
            .iter()
            .map(|part| part.filter(|id| topology.contains(*id)))
            .collect();
        let Some(parents) = resolved else {
            return Ok(CompositeProgress::Incomplete);
        };
        self.entries.remove(position);
        Ok(CompositeProgress::Complete(parents))
    }

    /// Finds or creates the entry that should receive the part.
    fn entry_for(
        &mut self,
        name: &str,
        info: &MatchedCompositeInfo,
        topology: &Topology,
    ) -> Result<(usize, usize), Status> {
        let (Some(node_index), Some(num_nodes)) = (info.node_index, info.num_nodes) else {
            error!(
                target: COMPOSITE_TARGET,
                node = name,
                "failed to match node, missing fields for composite driver"
            );
            return Err(Status::InvalidArgs);
        };
        if node_index >= num_nodes {
            error!(
                target: COMPOSITE_TARGET,
                node = name,
                node_index,
                num_nodes,
                "failed to match node, the node index is out of range"
            );
            return Err(Status::InvalidArgs);
        }
        let Some(url) = info.driver_info.as_ref().and_then(|driver| driver.url.as_deref()) else {
            error!(
                target: COMPOSITE_TARGET,
                node = name,
                "failed to match node, missing driver info fields for composite driver"
            );
            return Err(Status::InvalidArgs);
        };
        let slot = usize::try_from(node_index).map_err(|_| Status::InvalidArgs)?;
        let size = usize::try_from(num_nodes).map_err(|_| Status::InvalidArgs)?;

        for (position, entry) in self.entries.iter().enumerate() {
            if entry.url != url {
                continue;
            }
            if entry.nodes.len() != size {
                error!(
                    target: COMPOSITE_TARGET,
                    node = name,
                    url,
                    "failed to match node, the number of nodes does not match"
                );
                return Err(Status::InvalidArgs);
            }
            let vacant = entry
                .nodes
                .get(slot)
                .is_some_and(|part| part.is_none_or(|id| !topology.contains(id)));
            if vacant {
                return Ok((slot, position));
            }
        }

        self.entries.push(CompositeEntry {
            url: url.to_owned(),
            nodes: vec![None; size],
        });
        Ok((slot, self.entries.len().saturating_sub(1)))
    }

    /// Number of composites still being assembled.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
