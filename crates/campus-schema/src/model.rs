//! Typed schema model

use serde::{Deserialize, Serialize};

/// One declarative role/action rule on a collection or bucket.
///
/// Both fields are optional on purpose: a structurally incomplete rule
/// is skipped by the permission synthesizer rather than rejected, so
/// the model keeps what the source said instead of failing the load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Role label; `"any"` (case-insensitive) denotes public access.
    pub label: Option<String>,
    /// Actions drawn from read/create/update/delete.
    pub actions: Option<Vec<String>>,
}

impl PermissionRule {
    /// Rule granting `actions` to `label`.
    pub fn new(label: impl Into<String>, actions: &[&str]) -> Self {
        Self {
            label: Some(label.into()),
            actions: Some(actions.iter().map(|a| a.to_string()).collect()),
        }
    }
}

/// Resolved attribute type with its creation parameters.
///
/// Closed set: the loader maps the source's `type`/`format` strings
/// onto exactly one of these, so provisioning dispatches on a variant
/// instead of re-interpreting strings at call time.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    /// Plain string with a maximum size.
    PlainString {
        /// Maximum length in characters.
        size: usize,
        /// Default value.
        default: Option<String>,
    },
    /// String restricted to a fixed set of options.
    Enum {
        /// Allowed values, never empty.
        options: Vec<String>,
        /// Default value.
        default: Option<String>,
    },
    /// Email-format string.
    Email {
        /// Default value.
        default: Option<String>,
    },
    /// URL-format string.
    Url {
        /// Default value.
        default: Option<String>,
    },
    /// IP-address-format string.
    Ip {
        /// Default value.
        default: Option<String>,
    },
    /// Integer with optional bounds.
    Integer {
        /// Lower bound.
        min: Option<i64>,
        /// Upper bound.
        max: Option<i64>,
        /// Default value.
        default: Option<i64>,
    },
    /// Double-precision float with optional bounds.
    Float {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
        /// Default value.
        default: Option<f64>,
    },
    /// Boolean.
    Boolean {
        /// Default value.
        default: Option<bool>,
    },
    /// ISO-8601 datetime.
    Datetime {
        /// Default value.
        default: Option<String>,
    },
}

/// One attribute definition on a collection.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    /// Attribute key, unique within the collection.
    pub key: String,
    /// Resolved type and creation parameters.
    pub kind: AttributeKind,
    /// Whether a value is mandatory on every document.
    pub required: bool,
    /// Whether the attribute holds an array of values.
    pub array: bool,
}

/// One index definition on a collection.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    /// Index key, unique within the collection.
    pub key: String,
    /// Platform index type, e.g. `key`, `unique`, `fulltext`.
    pub index_type: String,
    /// Attribute keys the index covers. Each must be declared in the
    /// same collection.
    pub attributes: Vec<String>,
    /// Per-attribute sort orders, parallel to `attributes`.
    pub orders: Vec<String>,
}

/// One collection with its attributes, indexes, and permissions.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    /// Collection id used on the platform.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Declarative permission rules. `None` means the source omitted
    /// the field entirely, which the synthesizer treats differently
    /// from an empty list.
    pub permissions: Option<Vec<PermissionRule>>,
    /// Per-document permission checks in addition to collection-level.
    pub document_security: bool,
    /// Attributes in declared order.
    pub attributes: Vec<AttributeSpec>,
    /// Indexes in declared order, created only after every attribute
    /// is confirmed present.
    pub indexes: Vec<IndexSpec>,
}

/// An immutable, validated schema: the ordered collections to
/// provision for every new tenant.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    /// Collections in declared order.
    pub collections: Vec<CollectionSpec>,
}

impl SchemaDefinition {
    /// Total number of attributes across all collections.
    pub fn attribute_count(&self) -> usize {
        self.collections.iter().map(|c| c.attributes.len()).sum()
    }

    /// Total number of indexes across all collections.
    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }
}
