//! Bindings between nodes and running drivers.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error};

use crate::binding::{ComponentControllerServer, UnbindInfo};
use crate::dispatch::{Event, EventSender};
use crate::driver_host::Driver;
use crate::node::NodeId;

const DRIVER_COMPONENT_TARGET: &str = "driver_runner::driver_component";

/// Identifier of a driver component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverId(u64);

impl fmt::Display for DriverId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "driver#{}", self.0)
    }
}

/// A driver running on behalf of a node.
///
/// The component owns the driver's control channel and the controller
/// binding handed over by the launcher. Closing the controller is what
/// eventually releases the component and removes its node.
pub(crate) struct DriverComponent {
    id: DriverId,
    url: String,
    node: NodeId,
    driver: Box<dyn Driver>,
    controller: Option<Box<dyn ComponentControllerServer>>,
    events: EventSender,
    stop_in_progress: bool,
}

impl DriverComponent {
    pub(crate) fn new(
        id: DriverId,
        url: String,
        node: NodeId,
        driver: Box<dyn Driver>,
        controller: Box<dyn ComponentControllerServer>,
        events: EventSender,
    ) -> Self {
        Self {
            id,
            url,
            node,
            driver,
            controller: Some(controller),
            events,
            stop_in_progress: false,
        }
    }

    pub(crate) const fn id(&self) -> DriverId {
        self.id
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) const fn node(&self) -> NodeId {
        self.node
    }

    /// Asks the driver to stop. Only the first call reaches the driver.
    pub(crate) fn stop_driver(&mut self) {
        if self.stop_in_progress {
            return;
        }
        self.stop_in_progress = true;
        if let Err(transport) = self.driver.stop() {
            error!(
                target: DRIVER_COMPONENT_TARGET,
                url = %self.url,
                error = %transport,
                "failed to stop driver"
            );
        }
    }

    /// Reacts to the driver closing its control channel.
    pub(crate) fn on_driver_closed(&mut self, info: UnbindInfo) {
        if !info.is_clean() {
            error!(
                target: DRIVER_COMPONENT_TARGET,
                url = %self.url,
                reason = %info,
                "driver channel closed unexpectedly"
            );
        }
        self.stop_component();
    }

    /// Closes the controller with an OK epitaph, releasing the binding.
    pub(crate) fn stop_component(&mut self) {
        let Some(mut controller) = self.controller.take() else {
            debug!(
                target: DRIVER_COMPONENT_TARGET,
                url = %self.url,
                "controller already closed"
            );
            return;
        };
        controller.close(None);
        self.events
            .post(Event::ControllerUnbound { driver: self.id });
    }
}

impl fmt::Debug for DriverComponent {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DriverComponent")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("node", &self.node)
            .field("stop_in_progress", &self.stop_in_progress)
            .finish_non_exhaustive()
    }
}

/// Driver components owned by the runner.
#[derive(Debug, Default)]
pub(crate) struct DriverComponents {
    drivers: HashMap<DriverId, DriverComponent>,
    next_id: u64,
}

impl DriverComponents {
    /// Allocates the id for a driver about to be started.
    pub(crate) const fn reserve_id(&mut self) -> DriverId {
        let id = DriverId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, component: DriverComponent) {
        self.drivers.insert(component.id(), component);
    }

    pub(crate) fn get(&self, driver: DriverId) -> Option<&DriverComponent> {
        self.drivers.get(&driver)
    }

    pub(crate) fn get_mut(&mut self, driver: DriverId) -> Option<&mut DriverComponent> {
        self.drivers.get_mut(&driver)
    }

    pub(crate) fn erase(&mut self, driver: DriverId) -> Option<DriverComponent> {
        self.drivers.remove(&driver)
    }

    pub(crate) fn len(&self) -> usize {
        self.drivers.len()
    }
}
