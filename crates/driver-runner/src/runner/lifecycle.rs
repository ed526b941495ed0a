//! Driver component and driver host teardown.

use tracing::{debug, info, warn};

use super::{DriverRunner, RUNNER_TARGET};
use crate::binding::UnbindInfo;
use crate::driver_component::DriverId;
use crate::driver_host::HostId;
use crate::index::DriverIndex;
use crate::launcher::ComponentLauncher;

impl<I, L> DriverRunner<I, L>
where
    I: DriverIndex,
    L: ComponentLauncher,
{
    /// Handles a `Stop` request on a driver's component controller.
    pub fn stop_component(&mut self, driver: DriverId) {
        self.request_driver_stop(driver);
    }

    /// Handles a `Kill` request on a driver's component controller.
    pub fn kill_component(&mut self, driver: DriverId) {
        self.request_driver_stop(driver);
    }

    /// Reacts to the launcher closing a driver's component controller.
    pub fn component_controller_closed(&mut self, driver: DriverId) {
        self.release_driver(driver);
    }

    fn request_driver_stop(&mut self, driver: DriverId) {
        let Some(component) = self.drivers.get(driver) else {
            debug!(
                target: RUNNER_TARGET,
                driver = %driver,
                "stop requested for a driver that is already gone"
            );
            return;
        };
        let node = component.node();
        self.remove_node(node);
    }

    pub(super) fn on_driver_channel_closed(&mut self, driver: DriverId, info: UnbindInfo) {
        let Some(component) = self.drivers.get_mut(driver) else {
            debug!(
                target: RUNNER_TARGET,
                driver = %driver,
                "driver channel closed after the driver was released"
            );
            return;
        };
        component.on_driver_closed(info);
    }

    /// Forgets a driver component and resumes removal of its node.
    pub(super) fn release_driver(&mut self, driver: DriverId) {
        let Some(component) = self.drivers.erase(driver) else {
            return;
        };
        info!(
            target: RUNNER_TARGET,
            url = component.url(),
            driver = %driver,
            "driver released"
        );
        let node = component.node();
        let Some(bound) = self.topology.get_mut(node) else {
            return;
        };
        if bound.driver_component() == Some(driver) {
            bound.set_driver_component(None);
        }
        self.remove_node(node);
    }

    pub(super) fn on_driver_host_closed(&mut self, host: HostId) {
        let Some(component) = self.hosts.erase(host) else {
            warn!(
                target: RUNNER_TARGET,
                host = %host,
                "teardown reported for an unknown driver host"
            );
            return;
        };
        info!(
            target: RUNNER_TARGET,
            host = component.name(),
            "driver host connection closed"
        );
    }
}
