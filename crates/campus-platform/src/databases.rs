//! Database management service

use crate::{Grant, PlatformResult, Query};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document with platform bookkeeping fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Platform-assigned document id.
    pub id: String,
    /// Creation timestamp, maintained by the platform.
    pub created_at: DateTime<Utc>,
    /// Document body.
    pub data: Value,
}

/// Page of documents from a list call.
#[derive(Debug, Clone)]
pub struct DocumentList {
    /// Total number of documents matching the predicates.
    pub total: usize,
    /// The returned page.
    pub documents: Vec<Document>,
}

/// Database management API of the remote platform.
///
/// Writes are eventually consistent: an attribute-create call returns
/// before the attribute is queryable, and [`get_attribute`] answers
/// 404 until it is. Index creation rejects attributes the platform has
/// not confirmed yet, which is why provisioning polls between the two.
///
/// [`get_attribute`]: Databases::get_attribute
#[async_trait]
pub trait Databases: Send + Sync {
    /// Create a database. 409 if it already exists.
    async fn create_database(&self, database_id: &str, name: &str) -> PlatformResult<()>;

    /// Delete a database and everything in it.
    async fn delete_database(&self, database_id: &str) -> PlatformResult<()>;

    /// Create a collection with its permission grants.
    async fn create_collection(
        &self,
        database_id: &str,
        collection_id: &str,
        name: &str,
        permissions: &[Grant],
        document_security: bool,
    ) -> PlatformResult<()>;

    /// Create a plain string attribute.
    #[allow(clippy::too_many_arguments)]
    async fn create_string_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        size: usize,
        required: bool,
        default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create an enum string attribute restricted to `options`.
    #[allow(clippy::too_many_arguments)]
    async fn create_enum_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        options: &[String],
        required: bool,
        default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create an email-format string attribute.
    async fn create_email_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        required: bool,
        default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create a URL-format string attribute.
    async fn create_url_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        required: bool,
        default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create an IP-format string attribute.
    async fn create_ip_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        required: bool,
        default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create an integer attribute with optional bounds.
    #[allow(clippy::too_many_arguments)]
    async fn create_integer_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        required: bool,
        min: Option<i64>,
        max: Option<i64>,
        default: Option<i64>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create a double attribute with optional bounds.
    #[allow(clippy::too_many_arguments)]
    async fn create_float_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        required: bool,
        min: Option<f64>,
        max: Option<f64>,
        default: Option<f64>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create a boolean attribute.
    async fn create_boolean_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        required: bool,
        default: Option<bool>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Create a datetime attribute.
    async fn create_datetime_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        required: bool,
        default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()>;

    /// Read back one attribute. 404 until the platform has made the
    /// attribute queryable.
    async fn get_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
    ) -> PlatformResult<()>;

    /// Create an index over already-confirmed attributes.
    async fn create_index(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        index_type: &str,
        attributes: &[String],
        orders: &[String],
    ) -> PlatformResult<()>;

    /// Create a document.
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> PlatformResult<Document>;

    /// Fetch a document by id.
    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> PlatformResult<Document>;

    /// Merge `patch` into a document's body.
    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        patch: Value,
    ) -> PlatformResult<Document>;

    /// Delete a document.
    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> PlatformResult<()>;

    /// List documents matching the given predicates.
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> PlatformResult<DocumentList>;
}
