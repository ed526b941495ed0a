//! Validation and insertion of child nodes.

use std::collections::HashSet;

use tracing::{error, warn};

use super::{NODE_TARGET, Node, NodeId, Topology};
use crate::args::{NodeAddArgs, NodeSymbol};
use crate::binding::{NodeControllerServer, NodeServer};
use crate::error::NodeError;
use crate::offer::Offer;

impl Topology {
    /// Adds a child under `parent` after validating `args`.
    ///
    /// Nothing is changed when validation fails. The caller decides whether
    /// the new child goes to the driver index: it does when no node server
    /// was supplied.
    ///
    /// # Errors
    ///
    /// Returns the first [`NodeError`] the request violates, checked in the
    /// order the variants are declared.
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        args: &NodeAddArgs,
        controller: Box<dyn NodeControllerServer>,
        node_server: Option<Box<dyn NodeServer>>,
    ) -> Result<NodeId, NodeError> {
        let mut child = self.validate_child(parent, args)?;
        child.controller = Some(controller);
        child.node_server = node_server;
        let id = self.insert(child);
        self.add_to_parents(id);
        Ok(id)
    }

    fn validate_child(&self, parent: NodeId, args: &NodeAddArgs) -> Result<Node, NodeError> {
        let Some(parent_node) = self.get(parent).filter(|node| node.binder_enabled) else {
            warn!(
                target: NODE_TARGET,
                parent = %parent,
                "failed to add node, the parent was removed"
            );
            return Err(NodeError::NodeRemoved);
        };
        let Some(name) = args.name.as_deref() else {
            error!(target: NODE_TARGET, "failed to add node, a name must be provided");
            return Err(NodeError::NameMissing);
        };
        if name.contains('.') {
            error!(target: NODE_TARGET, name, "failed to add node, name must not contain '.'");
            return Err(NodeError::NameInvalid);
        }
        let collides = parent_node
            .children
            .iter()
            .filter_map(|child| self.get(*child))
            .any(|sibling| sibling.name == name);
        if collides {
            error!(
                target: NODE_TARGET,
                name,
                "failed to add node, name already exists among siblings"
            );
            return Err(NodeError::NameAlreadyExists);
        }

        let mut child = Node::new(name.to_owned(), vec![parent], parent_node.driver_host);
        if let Some(offers) = &args.offers {
            validate_offers(name, offers)?;
            child.offers.clone_from(offers);
        }
        if let Some(properties) = &args.properties {
            child.properties.clone_from(properties);
        }
        if let Some(symbols) = &args.symbols {
            validate_symbols(name, symbols)?;
            child.symbols.clone_from(symbols);
        }
        Ok(child)
    }
}

fn validate_offers(name: &str, offers: &[Offer]) -> Result<(), NodeError> {
    for offer in offers {
        if !offer.has_source_name() {
            error!(
                target: NODE_TARGET,
                name,
                "failed to add node, an offer must have a source name"
            );
            return Err(NodeError::OfferSourceNameMissing);
        }
        if offer.has_ref() {
            error!(
                target: NODE_TARGET,
                name,
                "failed to add node, an offer must not have a source or target"
            );
            return Err(NodeError::OfferRefExists);
        }
    }
    Ok(())
}

fn validate_symbols(name: &str, symbols: &[NodeSymbol]) -> Result<(), NodeError> {
    let mut seen = HashSet::new();
    for symbol in symbols {
        let Some(symbol_name) = symbol.name.as_deref() else {
            error!(target: NODE_TARGET, name, "failed to add node, a symbol is missing a name");
            return Err(NodeError::SymbolNameMissing);
        };
        if symbol.address.is_none() {
            error!(
                target: NODE_TARGET,
                name,
                symbol = symbol_name,
                "failed to add node, symbol is missing an address"
            );
            return Err(NodeError::SymbolAddressMissing);
        }
        if !seen.insert(symbol_name) {
            error!(
                target: NODE_TARGET,
                name,
                symbol = symbol_name,
                "failed to add node, symbol already exists"
            );
            return Err(NodeError::SymbolAlreadyExists);
        }
    }
    Ok(())
}
