//! Shared doubles and fixtures for runner tests.

mod controllers;
mod index;
mod launcher;
mod world;

use std::sync::{Arc, Mutex};

use driver_runner_config::Config;
use rstest::fixture;

pub use controllers::{
    NodeControllerHandle, RecordingComponentController, RecordingNodeController,
    RecordingNodeServer,
};
pub use index::{DriverIndexHandle, FakeDriverIndex};
pub use launcher::{FakeLauncher, LauncherHandle};
pub use world::TestWorld;

use crate::DriverRunner;

/// URL of a driver packaged outside the boot image.
pub const PACKAGE_URL: &str = "fuchsia-pkg://fuchsia.com/sample#meta/sample.cm";

/// URL of a driver in the boot image.
pub const BOOT_URL: &str = "fuchsia-boot:///#meta/platform-bus.cm";

/// Runs `action` against the state behind `shared`, ignoring poisoning.
pub(crate) fn with_state<T, R>(shared: &Arc<Mutex<T>>, action: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = shared
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    action(&mut guard)
}

/// Runner wired to test doubles, with handles to drive them.
pub struct Harness {
    /// Runner under test.
    pub runner: DriverRunner<FakeDriverIndex, FakeLauncher>,
    /// Handle to the driver index double.
    pub index: DriverIndexHandle,
    /// Handle to the launcher double.
    pub launcher: LauncherHandle,
}

impl Harness {
    /// Builds a runner over fresh doubles using `config`.
    pub fn with_config(config: Config) -> Self {
        let index = FakeDriverIndex::default();
        let launcher = FakeLauncher::default();
        let index_handle = index.handle();
        let launcher_handle = launcher.handle();
        Self {
            runner: DriverRunner::new(config, index, launcher),
            index: index_handle,
            launcher: launcher_handle,
        }
    }
}

/// Runner over fresh doubles with the default configuration.
#[fixture]
pub fn harness() -> Harness {
    Harness::with_config(Config::default())
}
