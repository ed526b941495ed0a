//! Component launcher double with recording driver hosts.

use std::sync::{Arc, Mutex};

use crate::args::NodeSymbol;
use crate::binding::{NodeClientEnd, UnbindInfo};
use crate::dispatch::Responder;
use crate::driver_host::{Driver, DriverHost, DriverServerEnd, DriverStartArgs, TeardownObserver};
use crate::error::{Status, TransportError};
use crate::launcher::{
    ChildDecl, CollectionRef, ComponentLauncher, ComponentStartInfo, CreateChildArgs,
    DirectoryClient, DirectoryServer, ProgramDictionary,
};
use crate::offer::{ChildRef, Offer};
use crate::token::HandleInfo;

use super::with_state;

/// A `create_child` call as the launcher saw it.
#[derive(Debug)]
pub struct CreatedChild {
    /// Collection name.
    pub collection: String,
    /// Child declaration.
    pub decl: ChildDecl,
    /// Offers routed to the child.
    pub dynamic_offers: Option<Vec<Offer>>,
    /// Handles still held by the launcher; taken when the child starts.
    pub numbered_handles: Option<Vec<HandleInfo>>,
}

/// A driver start request received by one of the hosts.
#[derive(Debug)]
pub struct StartedDriver {
    /// Index of the host, in creation order.
    pub host: usize,
    /// Resolved driver URL.
    pub url: String,
    /// Symbols handed to the driver.
    pub symbols: Option<Vec<NodeSymbol>>,
    /// Node connection handed to the driver.
    pub node: Option<NodeClientEnd>,
    /// Driver end of the control channel.
    pub driver: Option<DriverServerEnd>,
    /// Number of stop requests received.
    pub stops: usize,
}

#[derive(Default)]
struct LauncherState {
    children: Vec<CreatedChild>,
    exposed: Vec<ChildRef>,
    observers: Vec<Option<TeardownObserver>>,
    started: Vec<StartedDriver>,
    create_failure: Option<Status>,
    connect_failure: Option<Status>,
    start_failure: Option<TransportError>,
}

/// Launcher that creates children instantly and hands out recording hosts.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    shared: Arc<Mutex<LauncherState>>,
}

impl FakeLauncher {
    /// Returns a handle for driving and inspecting the launcher.
    pub fn handle(&self) -> LauncherHandle {
        LauncherHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl ComponentLauncher for FakeLauncher {
    fn create_child(
        &mut self,
        collection: CollectionRef,
        decl: ChildDecl,
        args: CreateChildArgs,
        responder: Responder<Result<(), Status>>,
    ) {
        let failure = with_state(&self.shared, |state| {
            state.children.push(CreatedChild {
                collection: collection.name,
                decl,
                dynamic_offers: args.dynamic_offers,
                numbered_handles: args.numbered_handles,
            });
            state.create_failure
        });
        responder.respond(failure.map_or(Ok(()), Err));
    }

    fn open_exposed_dir(
        &mut self,
        child: ChildRef,
        _exposed_dir: DirectoryServer,
        responder: Responder<Result<(), Status>>,
    ) {
        with_state(&self.shared, |state| state.exposed.push(child));
        responder.respond(Ok(()));
    }

    fn connect_driver_host(
        &mut self,
        _exposed_dir: DirectoryClient,
        observer: TeardownObserver,
    ) -> Result<Box<dyn DriverHost>, Status> {
        with_state(&self.shared, |state| {
            if let Some(status) = state.connect_failure {
                return Err(status);
            }
            state.observers.push(Some(observer));
            Ok(Box::new(RecordingDriverHost {
                shared: Arc::clone(&self.shared),
                index: state.observers.len() - 1,
            }) as Box<dyn DriverHost>)
        })
    }
}

struct RecordingDriverHost {
    shared: Arc<Mutex<LauncherState>>,
    index: usize,
}

impl DriverHost for RecordingDriverHost {
    fn start(&mut self, args: DriverStartArgs) -> Result<Box<dyn Driver>, TransportError> {
        with_state(&self.shared, |state| {
            if let Some(error) = state.start_failure {
                return Err(error);
            }
            state.started.push(StartedDriver {
                host: self.index,
                url: args.url,
                symbols: args.symbols,
                node: Some(args.node),
                driver: Some(args.driver),
                stops: 0,
            });
            Ok(Box::new(RecordingDriver {
                shared: Arc::clone(&self.shared),
                index: state.started.len() - 1,
            }) as Box<dyn Driver>)
        })
    }
}

struct RecordingDriver {
    shared: Arc<Mutex<LauncherState>>,
    index: usize,
}

impl Driver for RecordingDriver {
    fn stop(&mut self) -> Result<(), TransportError> {
        with_state(&self.shared, |state| {
            if let Some(started) = state.started.get_mut(self.index) {
                started.stops += 1;
            }
        });
        Ok(())
    }
}

/// Control handle for a [`FakeLauncher`].
#[derive(Clone)]
pub struct LauncherHandle {
    shared: Arc<Mutex<LauncherState>>,
}

impl LauncherHandle {
    /// Makes every later `create_child` fail with `status`.
    pub fn fail_create_child(&self, status: Status) {
        with_state(&self.shared, |state| state.create_failure = Some(status));
    }

    /// Makes every later host connection fail with `status`.
    pub fn fail_connect(&self, status: Status) {
        with_state(&self.shared, |state| state.connect_failure = Some(status));
    }

    /// Makes every later driver start fail with `error`.
    pub fn fail_driver_start(&self, error: TransportError) {
        with_state(&self.shared, |state| state.start_failure = Some(error));
    }

    /// `(collection, name, url)` of every child created, in order.
    pub fn created(&self) -> Vec<(String, String, String)> {
        with_state(&self.shared, |state| {
            state
                .children
                .iter()
                .map(|child| {
                    (
                        child.collection.clone(),
                        child.decl.name.clone(),
                        child.decl.url.clone(),
                    )
                })
                .collect()
        })
    }

    /// Offers routed to the child called `name`.
    pub fn offers_for(&self, name: &str) -> Option<Vec<Offer>> {
        with_state(&self.shared, |state| {
            state
                .children
                .iter()
                .find(|child| child.decl.name == name)
                .and_then(|child| child.dynamic_offers.clone())
        })
    }

    /// Children whose exposed directory was opened.
    pub fn exposed_dirs(&self) -> Vec<ChildRef> {
        with_state(&self.shared, |state| state.exposed.clone())
    }

    /// Builds the start request the component framework would send for the
    /// driver child called `name`, handing over its start token.
    pub fn start_info(&self, name: &str, program: ProgramDictionary) -> ComponentStartInfo {
        with_state(&self.shared, |state| {
            let child = state
                .children
                .iter_mut()
                .rev()
                .find(|child| child.decl.name == name && child.numbered_handles.is_some())
                .unwrap_or_else(|| panic!("no driver component named '{name}'"));
            ComponentStartInfo {
                resolved_url: child.decl.url.clone(),
                program,
                numbered_handles: child.numbered_handles.take(),
                ..ComponentStartInfo::default()
            }
        })
    }

    /// Number of hosts connected so far, including torn-down ones.
    pub fn host_count(&self) -> usize {
        with_state(&self.shared, |state| state.observers.len())
    }

    /// Tears down the connection to host `index`.
    pub fn tear_down_host(&self, index: usize) {
        let observer = with_state(&self.shared, |state| {
            state.observers.get_mut(index).and_then(Option::take)
        });
        observer
            .unwrap_or_else(|| panic!("host {index} is not connected"))
            .notify();
    }

    /// Number of drivers started so far.
    pub fn started_count(&self) -> usize {
        with_state(&self.shared, |state| state.started.len())
    }

    /// Host index, URL and symbol names of started driver `index`.
    pub fn started(&self, index: usize) -> (usize, String, Vec<String>) {
        with_state(&self.shared, |state| {
            let started = state
                .started
                .get(index)
                .unwrap_or_else(|| panic!("driver {index} was never started"));
            let symbols = started
                .symbols
                .iter()
                .flatten()
                .filter_map(|symbol| symbol.name.clone())
                .collect();
            (started.host, started.url.clone(), symbols)
        })
    }

    /// Stop requests received by driver `index`.
    pub fn stop_count(&self, index: usize) -> usize {
        with_state(&self.shared, |state| {
            state.started.get(index).map_or(0, |started| started.stops)
        })
    }

    /// Closes the control channel of driver `index` as the driver would.
    pub fn close_driver(&self, index: usize, info: UnbindInfo) {
        let end = with_state(&self.shared, |state| {
            state
                .started
                .get_mut(index)
                .and_then(|started| started.driver.take())
        });
        end.unwrap_or_else(|| panic!("driver {index} has no open channel"))
            .close(info);
    }

    /// Takes the node connection handed to driver `index`.
    pub fn take_node_client(&self, index: usize) -> NodeClientEnd {
        let client = with_state(&self.shared, |state| {
            state
                .started
                .get_mut(index)
                .and_then(|started| started.node.take())
        });
        client.unwrap_or_else(|| panic!("driver {index} has no node connection"))
    }
}
