//! # Campus Schema
//!
//! Declarative resource schema for tenant provisioning. A schema is an
//! ordered list of collection definitions, each carrying its
//! attributes, indexes, and permission rules:
//!
//! ```text
//!   JSON source ──▶ loader ──▶ SchemaDefinition
//!                     │            ├── CollectionSpec
//!                     │            │     ├── AttributeSpec (typed kind)
//!                     │            │     ├── IndexSpec (validated refs)
//!                     │            │     └── PermissionRule
//!                     └── SchemaError on structural problems
//! ```
//!
//! Loading validates structure up front: every index must reference
//! attributes declared in its own collection, and attribute types are
//! resolved into a closed [`AttributeKind`] before any provisioning
//! call is made. Unknown types degrade to a plain string with a logged
//! diagnostic rather than failing the whole schema.

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod loader;
pub mod model;

pub use loader::SchemaError;
pub use model::{
    AttributeKind, AttributeSpec, CollectionSpec, IndexSpec, PermissionRule, SchemaDefinition,
};
