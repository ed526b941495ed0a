//! Arguments describing a node to be added or matched.

use crate::offer::Offer;

/// Key of a node property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Numeric key from the legacy binding table.
    Int(u32),
    /// Named key.
    Str(String),
}

/// Value of a node property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Integer value.
    Int(u32),
    /// String value.
    Str(String),
    /// Boolean value.
    Bool(bool),
    /// Enumerated value, spelled as its fully qualified name.
    Enum(String),
}

/// Key/value pair the driver index matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProperty {
    /// Property key.
    pub key: PropertyKey,
    /// Property value.
    pub value: PropertyValue,
}

impl NodeProperty {
    /// Builds a named string property.
    #[must_use]
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: PropertyKey::Str(key.into()),
            value: PropertyValue::Str(value.into()),
        }
    }
}

/// Exported symbol made visible to colocated children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSymbol {
    /// Symbol name.
    pub name: Option<String>,
    /// Address of the symbol inside the driver host.
    pub address: Option<u64>,
}

impl NodeSymbol {
    /// Builds a fully populated symbol.
    #[must_use]
    pub fn new(name: impl Into<String>, address: u64) -> Self {
        Self {
            name: Some(name.into()),
            address: Some(address),
        }
    }
}

/// Request payload for adding a child node, and for matching a node.
///
/// Every field is optional on the wire; validation decides which absences
/// are errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAddArgs {
    /// Child name, unique among its siblings.
    pub name: Option<String>,
    /// Capability routing directives offered to the child's driver.
    pub offers: Option<Vec<Offer>>,
    /// Properties used for driver matching.
    pub properties: Option<Vec<NodeProperty>>,
    /// Symbols exported to colocated children.
    pub symbols: Option<Vec<NodeSymbol>>,
}

impl NodeAddArgs {
    /// Starts a request for a child called `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Adds offers to the request.
    #[must_use]
    pub fn with_offers(mut self, offers: Vec<Offer>) -> Self {
        self.offers = Some(offers);
        self
    }

    /// Adds properties to the request.
    #[must_use]
    pub fn with_properties(mut self, properties: Vec<NodeProperty>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Adds symbols to the request.
    #[must_use]
    pub fn with_symbols(mut self, symbols: Vec<NodeSymbol>) -> Self {
        self.symbols = Some(symbols);
        self
    }
}
