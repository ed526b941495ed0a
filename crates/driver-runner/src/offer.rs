//! Capability routing directives carried by nodes.

/// Reference to a component instance inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildRef {
    /// Instance name.
    pub name: String,
    /// Collection holding the instance, if it is dynamic.
    pub collection: Option<String>,
}

/// Endpoint of a routing directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ref {
    /// The parent of the declaring component.
    Parent,
    /// The declaring component itself.
    Myself,
    /// A named child instance.
    Child(ChildRef),
    /// A whole collection.
    Collection(String),
    /// The component framework.
    Framework,
    /// The debug capability namespace.
    Debug,
    /// Routing into nothing.
    Void,
}

/// Source and target naming shared by every offer kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferDecl {
    /// Where the capability comes from. Filled in by the runner.
    pub source: Option<Ref>,
    /// Name of the capability at its source.
    pub source_name: Option<String>,
    /// Where the capability goes. Filled in by the launcher.
    pub target: Option<Ref>,
    /// Name of the capability at its target.
    pub target_name: Option<String>,
}

impl OfferDecl {
    /// Declares a capability by its source name only.
    #[must_use]
    pub fn named(source_name: impl Into<String>) -> Self {
        Self {
            source_name: Some(source_name.into()),
            ..Self::default()
        }
    }

    /// Renames the capability at its target.
    #[must_use]
    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = Some(target_name.into());
        self
    }
}

/// A capability offered from a node to its children's drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    /// Service capability.
    Service(OfferDecl),
    /// Protocol capability.
    Protocol(OfferDecl),
    /// Directory capability.
    Directory(OfferDecl),
    /// Storage capability.
    Storage(OfferDecl),
    /// Runner capability.
    Runner(OfferDecl),
    /// Resolver capability.
    Resolver(OfferDecl),
    /// Event capability.
    Event(OfferDecl),
    /// An offer kind this runner does not understand.
    Unknown,
}

impl Offer {
    /// Shared declaration of a known offer kind.
    #[must_use]
    pub const fn decl(&self) -> Option<&OfferDecl> {
        match self {
            Self::Service(decl)
            | Self::Protocol(decl)
            | Self::Directory(decl)
            | Self::Storage(decl)
            | Self::Runner(decl)
            | Self::Resolver(decl)
            | Self::Event(decl) => Some(decl),
            Self::Unknown => None,
        }
    }

    pub(crate) const fn decl_mut(&mut self) -> Option<&mut OfferDecl> {
        match self {
            Self::Service(decl)
            | Self::Protocol(decl)
            | Self::Directory(decl)
            | Self::Storage(decl)
            | Self::Runner(decl)
            | Self::Resolver(decl)
            | Self::Event(decl) => Some(decl),
            Self::Unknown => None,
        }
    }

    /// Returns `true` when the offer names a source capability.
    #[must_use]
    pub fn has_source_name(&self) -> bool {
        self.decl().is_some_and(|decl| decl.source_name.is_some())
    }

    /// Returns `true` when the offer already names an endpoint.
    #[must_use]
    pub fn has_ref(&self) -> bool {
        self.decl()
            .is_some_and(|decl| decl.source.is_some() || decl.target.is_some())
    }

    /// Points the offer's source at `source`.
    pub(crate) fn set_source(&mut self, source: Ref) {
        if let Some(decl) = self.decl_mut() {
            decl.source = Some(source);
        }
    }

    /// Label used when describing the offer in diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        let Some(decl) = self.decl() else {
            return "unknown";
        };
        decl.target_name
            .as_deref()
            .or(decl.source_name.as_deref())
            .unwrap_or("<missing>")
    }
}
