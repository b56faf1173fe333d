//! # Campus Provision
//!
//! Tenant provisioning for the campus platform: the orchestrated
//! sequence of idempotent, order-dependent remote operations that
//! turns a declarative schema plus a tenant descriptor into a usable
//! tenant environment on an eventually-consistent platform.
//!
//! ```text
//!                        ┌──────────────────┐
//!   TenantDescriptor ───▶│   orchestrator   │───▶ ProvisionOutcome
//!   SchemaDefinition ───▶│                  │
//!                        └───┬────────┬─────┘
//!                            │        │
//!                  ┌─────────▼──┐  ┌──▼────────────┐
//!                  │ provisioner│  │   directory    │◀── resolver
//!                  │ (+ retry)  │  │ (registry CRUD)│
//!                  └─────┬──────┘  └──┬─────────────┘
//!                        │            │
//!                  Databases     Databases/Storage/Users
//!
//!   saga: parent/student signup with one compensating delete
//!   notify: fire-and-forget credentials mail
//! ```
//!
//! Provisioning is deliberately not transactional. Every create treats
//! "already exists" as success, so a failed run is retried by running
//! it again; only the attribute-availability poll retries internally.

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod directory;
pub mod error;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod permissions;
pub mod provisioner;
pub mod resolver;
pub mod retry;
pub mod saga;

pub use directory::TenantDirectory;
pub use error::{ProvisionError, ProvisionResult};
pub use model::{
    LicenseStatus, LogoFile, ProvisionOutcome, StepRecord, StepSeverity, StepStatus,
    TenantDescriptor, TenantRecord, TenantStatus,
};
pub use notify::{MailError, MailReceipt, MailRequest, Mailer, RecordingMailer};
pub use orchestrator::TenantOrchestrator;
pub use provisioner::CollectionProvisioner;
pub use resolver::{Resolution, ResolutionTier, TenantResolver};
pub use retry::{NoopSleeper, RetryFailure, RetryPolicy, Sleeper, TokioSleeper};
pub use saga::{
    FamilySignupOutcome, FamilySignupRequest, IdentitySaga, SignupOutcome, SignupRequest,
};
