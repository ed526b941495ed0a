//! Matching nodes against the driver index.

use tracing::{error, info, warn};

use super::{DriverRunner, RUNNER_TARGET};
use crate::args::NodeAddArgs;
use crate::composite::CompositeProgress;
use crate::dispatch::{Event, Responder};
use crate::error::{Status, TransportError};
use crate::index::{DriverIndex, MatchedCompositeInfo, MatchedDriver};
use crate::launcher::ComponentLauncher;
use crate::node::NodeId;

impl<I, L> DriverRunner<I, L>
where
    I: DriverIndex,
    L: ComponentLauncher,
{
    /// Asks the driver index for a driver for `node`.
    pub(crate) fn bind(&mut self, node: NodeId, args: NodeAddArgs) {
        let responder = Responder::new(self.queue.sender(), move |result| Event::MatchCompleted {
            node,
            result,
        });
        self.index.match_driver(args, responder);
    }

    /// Re-matches orphaned nodes once the index has loaded its base drivers.
    pub fn schedule_base_drivers_binding(&mut self) {
        let responder = Responder::new(self.queue.sender(), |result| Event::BaseDriversReady {
            result,
        });
        self.index.wait_for_base_drivers(responder);
    }

    pub(super) fn on_base_drivers_ready(&mut self, result: Result<(), TransportError>) {
        if let Err(transport) = result {
            if transport.is_peer_closed() {
                warn!(
                    target: RUNNER_TARGET,
                    "driver index closed before the base drivers were loaded"
                );
            } else {
                error!(
                    target: RUNNER_TARGET,
                    error = %transport,
                    "failed to wait for base drivers"
                );
            }
            return;
        }
        let orphaned = std::mem::take(&mut self.orphaned);
        info!(
            target: RUNNER_TARGET,
            count = orphaned.len(),
            "base drivers loaded, binding orphaned nodes"
        );
        for node in orphaned {
            if let Some(args) = self.topology.create_add_args(node) {
                self.bind(node, args);
            }
        }
    }

    pub(super) fn orphan(&mut self, node: NodeId) {
        self.orphaned.push(node);
    }

    pub(super) fn on_match_completed(
        &mut self,
        node: NodeId,
        result: Result<Result<MatchedDriver, Status>, TransportError>,
    ) {
        let Some(name) = self.topology.get(node).map(|found| found.name().to_owned()) else {
            warn!(
                target: RUNNER_TARGET,
                node = %node,
                "node was freed before it could be bound"
            );
            return;
        };

        let matched = match result {
            Ok(Ok(matched)) => matched,
            Ok(Err(status)) => {
                self.orphan(node);
                warn!(
                    target: RUNNER_TARGET,
                    node = %name,
                    status = %status,
                    "failed to match node"
                );
                return;
            }
            Err(transport) => {
                self.orphan(node);
                error!(
                    target: RUNNER_TARGET,
                    node = %name,
                    error = %transport,
                    "failed to call match driver"
                );
                return;
            }
        };

        let (url, composite) = match matched {
            MatchedDriver::Driver(driver) => (driver.url, None),
            MatchedDriver::CompositeDriver(composite) => {
                let Some(driver) = composite.driver_info.clone() else {
                    self.orphan(node);
                    warn!(
                        target: RUNNER_TARGET,
                        node = %name,
                        "failed to match node, composite match is missing driver info"
                    );
                    return;
                };
                (driver.url, Some(composite))
            }
            MatchedDriver::Unknown => {
                self.orphan(node);
                warn!(
                    target: RUNNER_TARGET,
                    node = %name,
                    "failed to match node, the match is neither a driver nor a composite"
                );
                return;
            }
        };
        let Some(url) = url else {
            self.orphan(node);
            error!(
                target: RUNNER_TARGET,
                node = %name,
                "failed to match node, driver info is missing the url"
            );
            return;
        };

        let mut driver_node = node;
        if let Some(info) = composite {
            let Some(assembled) = self.create_composite_node(node, &name, &info) else {
                return;
            };
            driver_node = assembled;
        }

        if let Err(status) = self.start_driver(driver_node, &url) {
            self.orphan(driver_node);
            error!(
                target: RUNNER_TARGET,
                node = %name,
                url = %url,
                status = %status,
                "failed to start driver"
            );
        }
        self.topology.on_bind(node);
    }

    /// Adds `node` to its composite, returning the composite once complete.
    ///
    /// A malformed composite match orphans the node.
    fn create_composite_node(
        &mut self,
        node: NodeId,
        name: &str,
        info: &MatchedCompositeInfo,
    ) -> Option<NodeId> {
        match self.composites.add(node, name, info, &self.topology) {
            Ok(CompositeProgress::Complete(parents)) => {
                let composite = self.topology.create_composite(parents);
                info!(
                    target: RUNNER_TARGET,
                    node = name,
                    composite = %composite,
                    "assembled composite node"
                );
                Some(composite)
            }
            Ok(CompositeProgress::Incomplete) => None,
            Err(_) => {
                self.orphan(node);
                None
            }
        }
    }
}
