//! Launching driver components and driver hosts.

use tracing::{debug, error, info, warn};

use super::{DriverRunner, RUNNER_TARGET};
use crate::binding::{ComponentControllerServer, node_endpoints};
use crate::dispatch::{Event, PendingComponent, Responder};
use crate::driver_component::{DriverComponent, DriverId};
use crate::driver_host::{DriverHostComponent, DriverServerEnd, HostId, TeardownObserver};
use crate::error::{Status, TransportError};
use crate::index::DriverIndex;
use crate::launcher::{
    ChildDecl, Collection, CollectionRef, ComponentLauncher, ComponentStartInfo, CreateChildArgs,
    DirectoryServer, StartupMode, directory_endpoints,
};
use crate::node::NodeId;
use crate::offer::ChildRef;
use crate::token::{HandleInfo, Koid, TOKEN_ID, Token};

/// What to hand a component when it is created.
#[derive(Default)]
struct ComponentOptions {
    node: Option<NodeId>,
    token: Option<Token>,
    exposed_dir: Option<DirectoryServer>,
}

impl<I, L> DriverRunner<I, L>
where
    I: DriverIndex,
    L: ComponentLauncher,
{
    /// Starts the driver at `url` on the root node.
    ///
    /// # Errors
    ///
    /// Returns [`Status::NotFound`] if the root node has been released.
    pub fn start_root_driver(&mut self, url: &str) -> Result<(), Status> {
        let root = self.topology.root();
        self.start_driver(root, url)
    }

    /// Starts the configured root driver, if one is configured.
    ///
    /// Returns `Ok(false)` when no root driver is configured.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::start_root_driver`].
    pub fn start_configured_root_driver(&mut self) -> Result<bool, Status> {
        let Some(url) = self.config.root_driver_url().map(str::to_owned) else {
            debug!(target: RUNNER_TARGET, "no root driver configured");
            return Ok(false);
        };
        self.start_root_driver(&url)?;
        Ok(true)
    }

    /// Creates the driver component for `node` and remembers its token.
    pub(super) fn start_driver(&mut self, node: NodeId, url: &str) -> Result<(), Status> {
        let collection = if url.starts_with(self.config.boot_scheme()) {
            Collection::Boot
        } else {
            Collection::Package
        };
        let Some(target) = self.topology.get_mut(node) else {
            return Err(Status::NotFound);
        };
        target.set_collection(collection);
        let name = self.topology.topo_name(node).ok_or(Status::NotFound)?;

        let token = Token::create();
        let koid = token.koid();
        self.create_component(
            name,
            collection,
            url.to_owned(),
            ComponentOptions {
                node: Some(node),
                token: Some(token),
                exposed_dir: None,
            },
        );
        self.pending_starts.insert(koid, node);
        Ok(())
    }

    fn create_component(
        &mut self,
        name: String,
        collection: Collection,
        url: String,
        options: ComponentOptions,
    ) {
        let ComponentOptions {
            node,
            token,
            exposed_dir,
        } = options;
        let args = CreateChildArgs {
            dynamic_offers: node.map(|id| self.topology.create_offers(id)),
            numbered_handles: token.map(|start_token| vec![HandleInfo::token(start_token)]),
        };
        let collection_ref = CollectionRef {
            name: collection.name().unwrap_or_default().to_owned(),
        };
        let decl = ChildDecl {
            name: name.clone(),
            url: url.clone(),
            startup: StartupMode::Lazy,
        };
        let pending = PendingComponent {
            name,
            url,
            collection,
            exposed_dir,
        };
        let responder = Responder::new(self.queue.sender(), move |result| Event::ComponentCreated {
            component: pending,
            result,
        });
        self.launcher
            .create_child(collection_ref, decl, args, responder);
    }

    pub(super) fn on_component_created(
        &mut self,
        component: PendingComponent,
        result: Result<Result<(), Status>, TransportError>,
    ) {
        let PendingComponent {
            name,
            url,
            collection,
            exposed_dir,
        } = component;
        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(status)) => Some(status),
            Err(transport) => Some(transport.status()),
        };
        if let Some(status) = failure {
            error!(
                target: RUNNER_TARGET,
                component = %name,
                url = %url,
                status = %status,
                "failed to create component"
            );
            return;
        }
        let Some(directory) = exposed_dir else {
            return;
        };
        let child = ChildRef {
            name: name.clone(),
            collection: collection.name().map(str::to_owned),
        };
        let responder = Responder::new(self.queue.sender(), move |result| Event::ExposedDirOpened {
            name,
            url,
            result,
        });
        self.launcher.open_exposed_dir(child, directory, responder);
    }

    pub(super) fn on_exposed_dir_opened(
        name: &str,
        url: &str,
        result: Result<Result<(), Status>, TransportError>,
    ) {
        let failure = match result {
            Ok(Ok(())) => return,
            Ok(Err(status)) => status,
            Err(transport) => transport.status(),
        };
        error!(
            target: RUNNER_TARGET,
            component = name,
            url,
            status = %failure,
            "failed to open exposed directory"
        );
    }

    /// Launches a new driver host and connects to it.
    fn start_driver_host(&mut self) -> Result<HostId, Status> {
        let host = self.hosts.reserve_id();
        let name = host.component_name();
        let url = self.config.driver_host_url().to_owned();
        let (client, server) = directory_endpoints();
        self.create_component(
            name.clone(),
            Collection::Host,
            url,
            ComponentOptions {
                exposed_dir: Some(server),
                ..ComponentOptions::default()
            },
        );

        let observer = TeardownObserver::new(host, self.queue.sender());
        let connection = self
            .launcher
            .connect_driver_host(client, observer)
            .map_err(|status| {
                error!(
                    target: RUNNER_TARGET,
                    host = %name,
                    status = %status,
                    "failed to connect to driver host"
                );
                status
            })?;
        info!(target: RUNNER_TARGET, host = %name, "driver host started");
        self.hosts
            .insert(DriverHostComponent::new(host, name, connection));
        Ok(host)
    }

    /// Starts a driver component whose creation was requested earlier.
    ///
    /// `start_info` must carry the start token minted for the node. On
    /// success the node is bound to the new driver and the returned id names
    /// its driver component. A failure after the token has been redeemed
    /// leaves the node orphaned.
    ///
    /// # Errors
    ///
    /// - [`Status::InvalidArgs`] when the token is missing or malformed, or
    ///   when the root driver asks to be colocated.
    /// - [`Status::Unavailable`] when the token is unknown or its node is
    ///   gone. Nothing changes in that case.
    /// - [`Status::PeerClosed`] when the host to colocate into has torn down.
    /// - Any status reported while launching a host or starting the driver.
    pub fn start(
        &mut self,
        start_info: ComponentStartInfo,
        controller: Box<dyn ComponentControllerServer>,
    ) -> Result<DriverId, Status> {
        let url = start_info.resolved_url.clone();
        let koid = start_token(&start_info, &url)?;
        let Some(node) = self.pending_starts.remove(&koid) else {
            error!(
                target: RUNNER_TARGET,
                url = %url,
                "failed to start driver, unknown start request"
            );
            return Err(Status::Unavailable);
        };
        if !self.topology.contains(node) {
            warn!(
                target: RUNNER_TARGET,
                url = %url,
                "failed to start driver, the node was removed"
            );
            return Err(Status::Unavailable);
        }

        let result = self.start_on_node(node, start_info, controller);
        if result.is_err() {
            self.orphan(node);
        }
        result
    }

    fn start_on_node(
        &mut self,
        node: NodeId,
        start_info: ComponentStartInfo,
        controller: Box<dyn ComponentControllerServer>,
    ) -> Result<DriverId, Status> {
        let url = start_info.resolved_url.clone();
        let host = self.host_for(node, &start_info, &url)?;

        let driver = self.drivers.reserve_id();
        let (node_client, node_server) = node_endpoints(node, self.queue.sender());
        let symbols = self.topology.symbols_for_host(node, Some(host));
        let driver_server = DriverServerEnd::new(driver, self.queue.sender());
        let Some(host_component) = self.hosts.get_mut(host) else {
            return Err(Status::PeerClosed);
        };
        let client = host_component.start(node_client, symbols, start_info, driver_server)?;

        let Some(bound) = self.topology.get_mut(node) else {
            return Err(Status::Unavailable);
        };
        bound.set_driver_host(Some(host));
        bound.set_node_server(Box::new(node_server));
        bound.set_driver_component(Some(driver));
        self.drivers.insert(DriverComponent::new(
            driver,
            url.clone(),
            node,
            client,
            controller,
            self.queue.sender(),
        ));
        info!(
            target: RUNNER_TARGET,
            url = %url,
            driver = %driver,
            host = %host,
            "started driver"
        );
        Ok(driver)
    }

    /// Picks the host a driver should run in, launching one if needed.
    fn host_for(
        &mut self,
        node: NodeId,
        start_info: &ComponentStartInfo,
        url: &str,
    ) -> Result<HostId, Status> {
        if start_info.program.get_str("colocate") != Some("true") {
            return self.start_driver_host();
        }
        if node == self.topology.root() {
            error!(
                target: RUNNER_TARGET,
                url,
                "failed to start driver, the root driver cannot be colocated"
            );
            return Err(Status::InvalidArgs);
        }
        let current = self.topology.get(node).and_then(|found| found.driver_host());
        match current {
            Some(host) if self.hosts.contains(host) => Ok(host),
            _ => {
                error!(
                    target: RUNNER_TARGET,
                    url,
                    "failed to start driver, the driver host to colocate into is gone"
                );
                Err(Status::PeerClosed)
            }
        }
    }
}

/// Extracts the start token's id from `start_info`.
fn start_token(start_info: &ComponentStartInfo, url: &str) -> Result<Koid, Status> {
    let Some(handles) = start_info.numbered_handles.as_deref() else {
        error!(
            target: RUNNER_TARGET,
            url,
            "failed to start driver, missing start token"
        );
        return Err(Status::InvalidArgs);
    };
    let [single] = handles else {
        error!(
            target: RUNNER_TARGET,
            url,
            count = handles.len(),
            "failed to start driver, expected exactly one numbered handle"
        );
        return Err(Status::InvalidArgs);
    };
    match (&single.handle, single.id) {
        (Some(token), TOKEN_ID) => Ok(token.koid()),
        _ => {
            error!(
                target: RUNNER_TARGET,
                url,
                "failed to start driver, invalid start token"
            );
            Err(Status::InvalidArgs)
        }
    }
}
