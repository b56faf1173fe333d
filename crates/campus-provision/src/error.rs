//! Provisioning error taxonomy

use campus_platform::PlatformError;
use campus_schema::SchemaError;
use thiserror::Error;

/// Errors surfaced by provisioning, directory, and saga operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Malformed or missing input, detected before any remote call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A tenant record for this domain already exists.
    #[error("tenant domain '{0}' is already provisioned")]
    DomainTaken(String),

    /// A requested record or identity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An attribute never became queryable within the retry budget.
    /// Re-running provisioning for the same domain is safe and will
    /// resume where this run stopped.
    #[error("attribute '{collection}.{attribute}' not queryable after {attempts} attempts: {last_error}")]
    AttributePollTimeout {
        /// Collection the attribute belongs to.
        collection: String,
        /// The attribute that never appeared.
        attribute: String,
        /// Poll attempts consumed.
        attempts: u32,
        /// The final platform response.
        #[source]
        last_error: PlatformError,
    },

    /// The schema source could not be loaded.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Opaque passthrough of a remote platform failure.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl ProvisionError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Convenience alias used across the crate.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
