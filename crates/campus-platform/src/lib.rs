//! Campus Platform - Remote Management API Surface
//!
//! Trait-level view of the remote platform every tenant is provisioned
//! onto: database management, content storage, and identities. The
//! provisioning core talks only to these traits, so tests (and local
//! development) can run against the in-memory backend instead of a
//! live deployment.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    REMOTE PLATFORM SURFACE                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │  Databases   │   │   Storage    │   │    Users     │        │
//! │  │ collections  │   │   buckets    │   │  identities  │        │
//! │  │  attributes  │   │    files     │   │ labels/prefs │        │
//! │  │   indexes    │   │              │   │              │        │
//! │  │  documents   │   │              │   │              │        │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘        │
//! │         │                  │                  │                │
//! │  ┌──────▼──────────────────▼──────────────────▼───────┐        │
//! │  │            409 conflict | 404 not found            │        │
//! │  │     load-bearing codes for idempotency/polling     │        │
//! │  └────────────────────────────────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod databases;
pub mod error;
pub mod memory;
pub mod permission;
pub mod query;
pub mod storage;
pub mod users;

pub use databases::{Databases, Document, DocumentList};
pub use error::{PlatformError, PlatformResult};
pub use memory::InMemoryPlatform;
pub use permission::{Action, Grant, Role};
pub use query::Query;
pub use storage::{BucketOptions, FileRef, Storage};
pub use users::{Identity, IdentityList, Users};

/// Generate a unique platform identifier, also used for generated
/// credentials.
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
