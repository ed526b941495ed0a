//! Driver host handles.
//!
//! A driver host is a separate process that loads drivers. The runner keeps
//! one [`DriverHostComponent`] per live host connection and forgets it once
//! the connection tears down.

use std::fmt;

use tracing::error;

use crate::args::NodeSymbol;
use crate::binding::{NodeClientEnd, UnbindInfo};
use crate::dispatch::{Event, EventSender};
use crate::driver_component::DriverId;
use crate::error::{Status, TransportError};
use crate::launcher::{ComponentStartInfo, DirectoryServer, NamespaceEntry, ProgramDictionary};

const DRIVER_HOST_TARGET: &str = "driver_runner::driver_host";

/// Identifier of a driver host connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(u64);

impl HostId {
    /// Instance name of the host component.
    pub(crate) fn component_name(self) -> String {
        format!("driver-host-{}", self.0)
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "host#{}", self.0)
    }
}

/// A running driver, as seen from the runner.
pub trait Driver {
    /// Asks the driver to stop. The driver acknowledges by closing the
    /// [`DriverServerEnd`] it was started with.
    ///
    /// # Errors
    ///
    /// Returns the transport failure when the request could not be sent.
    fn stop(&mut self) -> Result<(), TransportError>;
}

/// Connection to a driver host process.
pub trait DriverHost {
    /// Loads and starts a driver.
    ///
    /// # Errors
    ///
    /// Returns the transport failure reported by the host.
    fn start(&mut self, args: DriverStartArgs) -> Result<Box<dyn Driver>, TransportError>;
}

/// Everything a host needs to start one driver.
#[derive(Debug)]
pub struct DriverStartArgs {
    /// Connection to the node the driver binds to.
    pub node: NodeClientEnd,
    /// Resolved component URL.
    pub url: String,
    /// Program block of the driver's manifest.
    pub program: ProgramDictionary,
    /// Incoming namespace.
    pub ns: Vec<NamespaceEntry>,
    /// Outgoing directory the driver serves.
    pub outgoing_dir: Option<DirectoryServer>,
    /// Symbols inherited from a colocated parent.
    pub symbols: Option<Vec<NodeSymbol>>,
    /// Server end of the driver's control channel.
    pub driver: DriverServerEnd,
}

/// Driver side of the control channel.
#[derive(Debug)]
pub struct DriverServerEnd {
    driver: DriverId,
    events: EventSender,
}

impl DriverServerEnd {
    pub(crate) const fn new(driver: DriverId, events: EventSender) -> Self {
        Self { driver, events }
    }

    /// Driver component this channel belongs to.
    #[must_use]
    pub const fn driver(&self) -> DriverId {
        self.driver
    }

    /// Closes the channel, reporting how it ended.
    pub fn close(self, info: UnbindInfo) {
        self.events.post(Event::DriverChannelClosed {
            driver: self.driver,
            info,
        });
    }
}

/// Notified when a driver host connection goes away.
#[derive(Debug)]
pub struct TeardownObserver {
    host: HostId,
    events: EventSender,
}

impl TeardownObserver {
    pub(crate) const fn new(host: HostId, events: EventSender) -> Self {
        Self { host, events }
    }

    /// Host the observer watches.
    #[must_use]
    pub const fn host(&self) -> HostId {
        self.host
    }

    /// Reports that the connection has torn down.
    pub fn notify(self) {
        self.events.post(Event::DriverHostClosed { host: self.host });
    }
}

/// A live driver host connection.
pub(crate) struct DriverHostComponent {
    id: HostId,
    name: String,
    client: Box<dyn DriverHost>,
}

impl DriverHostComponent {
    pub(crate) fn new(id: HostId, name: String, client: Box<dyn DriverHost>) -> Self {
        Self { id, name, client }
    }

    pub(crate) const fn id(&self) -> HostId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Forwards a start request to the host.
    pub(crate) fn start(
        &mut self,
        node: NodeClientEnd,
        symbols: Vec<NodeSymbol>,
        start_info: ComponentStartInfo,
        driver: DriverServerEnd,
    ) -> Result<Box<dyn Driver>, Status> {
        let binary = start_info
            .program
            .get_str("binary")
            .unwrap_or_default()
            .to_owned();
        let args = DriverStartArgs {
            node,
            url: start_info.resolved_url,
            program: start_info.program,
            ns: start_info.ns,
            outgoing_dir: start_info.outgoing_dir,
            symbols: (!symbols.is_empty()).then_some(symbols),
            driver,
        };
        self.client.start(args).map_err(|transport| {
            error!(
                target: DRIVER_HOST_TARGET,
                host = %self.name,
                binary = %binary,
                error = %transport,
                "failed to start driver in driver host"
            );
            transport.status()
        })
    }
}

impl fmt::Debug for DriverHostComponent {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DriverHostComponent")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Live driver host connections owned by the runner.
#[derive(Debug, Default)]
pub(crate) struct DriverHosts {
    hosts: Vec<DriverHostComponent>,
    next_id: u64,
}

impl DriverHosts {
    /// Allocates the id for a host about to be connected.
    pub(crate) const fn reserve_id(&mut self) -> HostId {
        let id = HostId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, host: DriverHostComponent) {
        self.hosts.push(host);
    }

    pub(crate) fn contains(&self, host: HostId) -> bool {
        self.hosts.iter().any(|entry| entry.id() == host)
    }

    pub(crate) fn get_mut(&mut self, host: HostId) -> Option<&mut DriverHostComponent> {
        self.hosts.iter_mut().find(|entry| entry.id() == host)
    }

    /// Forgets a host whose connection has gone.
    pub(crate) fn erase(&mut self, host: HostId) -> Option<DriverHostComponent> {
        let position = self.hosts.iter().position(|entry| entry.id() == host)?;
        Some(self.hosts.remove(position))
    }

    pub(crate) fn len(&self) -> usize {
        self.hosts.len()
    }
}
