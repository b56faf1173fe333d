//! Identity service

use crate::{PlatformResult, Query};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An authenticable account record on the remote platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Platform-assigned user id.
    pub id: String,
    /// Login email, unique across the platform.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role labels attached to the identity.
    pub labels: Vec<String>,
    /// Free-form stored preferences.
    pub prefs: Value,
}

/// Page of identities from a list call.
#[derive(Debug, Clone)]
pub struct IdentityList {
    /// Total number of identities matching the predicates.
    pub total: usize,
    /// The returned page.
    pub users: Vec<Identity>,
}

/// Identity management API of the remote platform.
#[async_trait]
pub trait Users: Send + Sync {
    /// Create an identity. 409 if the email is already registered.
    async fn create(
        &self,
        user_id: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
        name: &str,
    ) -> PlatformResult<Identity>;

    /// Delete an identity.
    async fn delete(&self, user_id: &str) -> PlatformResult<()>;

    /// Fetch an identity by id.
    async fn get(&self, user_id: &str) -> PlatformResult<Identity>;

    /// List identities matching the given predicates.
    async fn list(&self, queries: &[Query]) -> PlatformResult<IdentityList>;

    /// Replace the identity's role labels.
    async fn update_labels(&self, user_id: &str, labels: &[String]) -> PlatformResult<()>;

    /// Merge `prefs` into the identity's stored preferences.
    async fn update_prefs(&self, user_id: &str, prefs: Value) -> PlatformResult<()>;

    /// Fetch the identity's stored preferences.
    async fn get_prefs(&self, user_id: &str) -> PlatformResult<Value>;
}
