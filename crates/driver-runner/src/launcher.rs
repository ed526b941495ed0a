//! Component launching contract and the records exchanged with it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::dispatch::Responder;
use crate::driver_host::{DriverHost, TeardownObserver};
use crate::error::Status;
use crate::offer::{ChildRef, Offer};
use crate::token::HandleInfo;

/// Collection holding driver host components.
pub const DRIVER_HOST_COLLECTION: &str = "driver-hosts";
/// Collection holding drivers from the boot image.
pub const BOOT_DRIVER_COLLECTION: &str = "boot-drivers";
/// Collection holding drivers from packages.
pub const PACKAGE_DRIVER_COLLECTION: &str = "pkg-drivers";

/// Collection a node's driver, or a host, is launched into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Not launched by the runner.
    #[default]
    None,
    /// Driver host processes.
    Host,
    /// Boot-image drivers.
    Boot,
    /// Package drivers.
    Package,
}

impl Collection {
    /// Collection name understood by the launcher.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Host => Some(DRIVER_HOST_COLLECTION),
            Self::Boot => Some(BOOT_DRIVER_COLLECTION),
            Self::Package => Some(PACKAGE_DRIVER_COLLECTION),
        }
    }
}

/// Reference to a collection by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    /// Collection name.
    pub name: String,
}

/// When a created component starts running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupMode {
    /// Started on first use.
    Lazy,
    /// Started as soon as it is created.
    Eager,
}

/// Declaration of a dynamic child component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDecl {
    /// Instance name.
    pub name: String,
    /// Component URL.
    pub url: String,
    /// Startup policy.
    pub startup: StartupMode,
}

/// Extra arguments attached to a child creation request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CreateChildArgs {
    /// Capabilities routed to the child.
    pub dynamic_offers: Option<Vec<Offer>>,
    /// Handles delivered to the child when it starts.
    pub numbered_handles: Option<Vec<HandleInfo>>,
}

static NEXT_DIRECTORY: AtomicU64 = AtomicU64::new(1);

/// Client end of a directory channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectoryClient(u64);

/// Server end of a directory channel.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DirectoryServer(u64);

impl DirectoryClient {
    /// Returns `true` when `server` is the other end of this channel.
    #[must_use]
    pub const fn pairs_with(self, server: &DirectoryServer) -> bool {
        self.0 == server.0
    }
}

/// Creates both ends of a fresh directory channel.
#[must_use]
pub fn directory_endpoints() -> (DirectoryClient, DirectoryServer) {
    let id = NEXT_DIRECTORY.fetch_add(1, Ordering::Relaxed);
    (DirectoryClient(id), DirectoryServer(id))
}

/// Value stored in a component's program block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramValue {
    /// Single string.
    Str(String),
    /// List of strings.
    StrVec(Vec<String>),
}

/// The `program` block of a component manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramDictionary {
    entries: Vec<(String, ProgramValue)>,
}

impl ProgramDictionary {
    /// Adds a string entry.
    #[must_use]
    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .push((key.into(), ProgramValue::Str(value.into())));
        self
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ProgramValue> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value)
    }

    /// Looks up a string entry. List entries are ignored.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ProgramValue::Str(value) => Some(value.as_str()),
            ProgramValue::StrVec(_) => None,
        }
    }
}

/// Directory mounted into a component's namespace.
#[derive(Debug, PartialEq, Eq)]
pub struct NamespaceEntry {
    /// Mount path.
    pub path: String,
    /// Directory served at the path.
    pub directory: DirectoryClient,
}

/// Everything the launcher hands over when a driver component starts.
#[derive(Debug, Default)]
pub struct ComponentStartInfo {
    /// URL the component resolved to.
    pub resolved_url: String,
    /// Program block of the manifest.
    pub program: ProgramDictionary,
    /// Incoming namespace.
    pub ns: Vec<NamespaceEntry>,
    /// Outgoing directory to serve.
    pub outgoing_dir: Option<DirectoryServer>,
    /// Handles passed at creation time, including the start token.
    pub numbered_handles: Option<Vec<HandleInfo>>,
}

/// Creates components on the runner's behalf.
///
/// Creation and exposed-directory requests complete asynchronously through
/// their [`Responder`]. Connecting to a driver host is pipelined and answers
/// straight away.
pub trait ComponentLauncher {
    /// Creates a dynamic child in `collection`.
    fn create_child(
        &mut self,
        collection: CollectionRef,
        decl: ChildDecl,
        args: CreateChildArgs,
        responder: Responder<Result<(), Status>>,
    );

    /// Serves the exposed directory of `child` on `exposed_dir`.
    fn open_exposed_dir(
        &mut self,
        child: ChildRef,
        exposed_dir: DirectoryServer,
        responder: Responder<Result<(), Status>>,
    );

    /// Connects to the driver host protocol exposed through `exposed_dir`.
    ///
    /// `observer` must be notified once the connection tears down.
    ///
    /// # Errors
    ///
    /// Returns the status of a connection that could not be established.
    fn connect_driver_host(
        &mut self,
        exposed_dir: DirectoryClient,
        observer: TeardownObserver,
    ) -> Result<Box<dyn DriverHost>, Status>;
}
