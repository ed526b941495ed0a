//! BDD test world wrapping a runner and its doubles.

use std::collections::HashMap;

use driver_runner_config::Config;

use crate::args::NodeAddArgs;
use crate::binding::UnbindInfo;
use crate::error::{NodeError, Status};
use crate::index::{DriverInfo, MatchedCompositeInfo, MatchedDriver};
use crate::launcher::{ComponentStartInfo, ProgramDictionary};
use crate::node::NodeId;
use crate::token::{HandleInfo, Token};
use crate::{DriverRunner, NodeState};

use super::{
    DriverIndexHandle, FakeDriverIndex, FakeLauncher, Harness, LauncherHandle,
    NodeControllerHandle, PACKAGE_URL, RecordingComponentController, RecordingNodeController,
};

/// Shared state exercised by BDD step implementations.
pub struct TestWorld {
    harness: Harness,
    nodes: HashMap<String, NodeId>,
    controllers: HashMap<String, NodeControllerHandle>,
    components: HashMap<String, RecordingComponentController>,
    started: HashMap<String, usize>,
    /// Last `AddChild` rejection.
    pub last_error: Option<NodeError>,
    /// Last status returned by a start request.
    pub last_status: Option<Status>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Builds a world around a runner with the default configuration.
    pub fn new() -> Self {
        let harness = Harness::with_config(Config::default());
        let mut nodes = HashMap::new();
        nodes.insert(String::from("root"), harness.runner.root_node());
        Self {
            harness,
            nodes,
            controllers: HashMap::new(),
            components: HashMap::new(),
            started: HashMap::new(),
            last_error: None,
            last_status: None,
        }
    }

    /// Runner under test.
    pub const fn runner(&self) -> &DriverRunner<FakeDriverIndex, FakeLauncher> {
        &self.harness.runner
    }

    /// Mutable runner under test.
    pub const fn runner_mut(&mut self) -> &mut DriverRunner<FakeDriverIndex, FakeLauncher> {
        &mut self.harness.runner
    }

    /// Driver index double.
    pub const fn index(&self) -> &DriverIndexHandle {
        &self.harness.index
    }

    /// Launcher double.
    pub const fn launcher(&self) -> &LauncherHandle {
        &self.harness.launcher
    }

    /// Applies every queued completion.
    pub fn settle(&mut self) {
        self.harness.runner.run_until_idle();
    }

    /// Id of the node registered as `name`.
    pub fn node(&self, name: &str) -> NodeId {
        *self
            .nodes
            .get(name)
            .unwrap_or_else(|| panic!("unknown node '{name}'"))
    }

    /// Returns `true` while the node registered as `name` is alive.
    pub fn is_alive(&self, name: &str) -> bool {
        self.runner().node(self.node(name)).is_some()
    }

    /// Lifecycle state of the node registered as `name`.
    pub fn state(&self, name: &str) -> Option<NodeState> {
        self.runner().node(self.node(name)).map(crate::Node::state)
    }

    /// Controller handle of the node registered as `name`.
    pub fn controller(&self, name: &str) -> &NodeControllerHandle {
        self.controllers
            .get(name)
            .unwrap_or_else(|| panic!("no controller for '{name}'"))
    }

    /// Component controller handed to the driver component `component`.
    pub fn component_controller(&self, component: &str) -> &RecordingComponentController {
        self.components
            .get(component)
            .unwrap_or_else(|| panic!("component '{component}' was never started"))
    }

    /// Adds `name` under `parent`, remembering the outcome.
    pub fn add_node(&mut self, parent: &str, name: &str) {
        let parent_id = self.node(parent);
        let controller = RecordingNodeController::default();
        let handle = controller.handle();
        let result = self.harness.runner.add_child(
            parent_id,
            NodeAddArgs::named(name),
            Box::new(controller),
            None,
        );
        match result {
            Ok(id) => {
                self.nodes.insert(name.to_owned(), id);
                self.controllers.insert(name.to_owned(), handle);
                self.last_error = None;
            }
            Err(error) => self.last_error = Some(error),
        }
        self.settle();
    }

    /// Answers the pending match for `name` with a plain driver.
    pub fn match_driver(&mut self, name: &str, url: &str) {
        self.index()
            .respond(name, Ok(MatchedDriver::Driver(DriverInfo::at(url))));
        self.settle();
    }

    /// Answers the pending match for `name` with a composite slot.
    pub fn match_composite(&mut self, name: &str, slot: u32, size: u32, url: &str) {
        self.index().respond(
            name,
            Ok(MatchedDriver::CompositeDriver(MatchedCompositeInfo::slot(
                slot, size, url,
            ))),
        );
        self.settle();
    }

    /// Answers the pending match for `name` with "no driver".
    pub fn reject_match(&mut self, name: &str) {
        self.index().respond(name, Err(Status::NotFound));
        self.settle();
    }

    /// Starts the driver component `component` as the framework would.
    pub fn start_component(&mut self, component: &str) {
        let start_info = self
            .launcher()
            .start_info(component, ProgramDictionary::default());
        let controller = RecordingComponentController::default();
        let result = self
            .harness
            .runner
            .start(start_info, Box::new(controller.clone()));
        self.components.insert(component.to_owned(), controller);
        match result {
            Ok(_) => {
                let index = self.launcher().started_count().saturating_sub(1);
                self.started.insert(component.to_owned(), index);
                self.last_status = None;
            }
            Err(status) => self.last_status = Some(status),
        }
        self.settle();
    }

    /// Presents a start token the runner never issued.
    pub fn start_with_unknown_token(&mut self) {
        let start_info = ComponentStartInfo {
            resolved_url: String::from(PACKAGE_URL),
            numbered_handles: Some(vec![HandleInfo::token(Token::create())]),
            ..ComponentStartInfo::default()
        };
        let result = self.harness.runner.start(
            start_info,
            Box::new(RecordingComponentController::default()),
        );
        self.last_status = result.err();
        self.settle();
    }

    /// Index of the driver started for `component` in the launcher's log.
    pub fn started_index(&self, component: &str) -> usize {
        *self
            .started
            .get(component)
            .unwrap_or_else(|| panic!("component '{component}' has no running driver"))
    }

    /// Closes the control channel of the driver behind `component`.
    pub fn close_driver(&mut self, component: &str, info: UnbindInfo) {
        let index = self.started_index(component);
        self.launcher().close_driver(index, info);
        self.settle();
    }

    /// Removes the node registered as `name`.
    pub fn remove(&mut self, name: &str) {
        let id = self.node(name);
        self.harness.runner.remove_node(id);
        self.settle();
    }

    /// Starts `url` on the root node and launches its component.
    pub fn start_root(&mut self, url: &str) {
        if let Err(status) = self.harness.runner.start_root_driver(url) {
            self.last_status = Some(status);
            return;
        }
        self.settle();
        self.start_component("root");
    }
}
