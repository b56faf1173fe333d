//! In-memory platform backend
//!
//! Implements all three service traits against process-local state,
//! with the platform's observable quirks preserved: 409 on duplicate
//! creation, 404 on missing resources, and a configurable visibility
//! lag that makes freshly created attributes answer 404 for the first
//! N reads, the way the real platform's eventual consistency does.
//! Used by every test and usable as a local development backend.

use crate::databases::{Databases, Document, DocumentList};
use crate::error::{PlatformError, PlatformResult};
use crate::permission::Grant;
use crate::query::Query;
use crate::storage::{BucketOptions, FileRef, Storage};
use crate::users::{Identity, IdentityList, Users};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone)]
struct AttributeState {
    kind: &'static str,
    array: bool,
    /// Reads left before the attribute becomes visible.
    remaining_lag: u32,
}

#[derive(Debug, Clone)]
struct IndexState {
    index_type: String,
    attributes: Vec<String>,
    orders: Vec<String>,
}

#[derive(Clone)]
struct CollectionState {
    name: String,
    permissions: Vec<Grant>,
    document_security: bool,
    attributes: HashMap<String, AttributeState>,
    indexes: HashMap<String, IndexState>,
    documents: HashMap<String, Document>,
}

#[derive(Clone)]
struct DatabaseState {
    name: String,
    collections: HashMap<String, CollectionState>,
}

#[derive(Clone)]
struct BucketState {
    name: String,
    permissions: Vec<Grant>,
    options: BucketOptions,
    allowed_extensions: Vec<String>,
    files: HashMap<String, String>,
}

/// In-memory implementation of [`Databases`], [`Storage`], and
/// [`Users`].
#[derive(Default)]
pub struct InMemoryPlatform {
    databases: RwLock<HashMap<String, DatabaseState>>,
    buckets: RwLock<HashMap<String, BucketState>>,
    users: RwLock<HashMap<String, Identity>>,
    /// Reads a new attribute stays invisible for.
    attribute_lag: AtomicU32,
    /// Substrings of emails whose identity creation fails with a 500.
    poisoned_emails: RwLock<Vec<String>>,
}

impl InMemoryPlatform {
    /// Fully consistent backend: attributes are visible immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend where every new attribute answers 404 for `lag` reads
    /// before becoming visible.
    pub fn with_attribute_lag(lag: u32) -> Self {
        let platform = Self::default();
        platform.attribute_lag.store(lag, Ordering::Relaxed);
        platform
    }

    /// Change the visibility lag for attributes created from now on.
    pub fn set_attribute_lag(&self, lag: u32) {
        self.attribute_lag.store(lag, Ordering::Relaxed);
    }

    /// Make identity creation fail with a 500 whenever the email
    /// contains `fragment`. Failure-injection hook for saga tests.
    pub fn fail_user_creates_matching(&self, fragment: impl Into<String>) {
        self.poisoned_emails.write().push(fragment.into());
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.poisoned_emails.write().clear();
    }

    /// Whether a database exists.
    pub fn database_exists(&self, database_id: &str) -> bool {
        self.databases.read().contains_key(database_id)
    }

    /// Whether a collection exists.
    pub fn collection_exists(&self, database_id: &str, collection_id: &str) -> bool {
        self.databases
            .read()
            .get(database_id)
            .is_some_and(|db| db.collections.contains_key(collection_id))
    }

    /// Number of attributes on a collection.
    pub fn attribute_count(&self, database_id: &str, collection_id: &str) -> usize {
        self.databases
            .read()
            .get(database_id)
            .and_then(|db| db.collections.get(collection_id))
            .map_or(0, |coll| coll.attributes.len())
    }

    /// Number of indexes on a collection.
    pub fn index_count(&self, database_id: &str, collection_id: &str) -> usize {
        self.databases
            .read()
            .get(database_id)
            .and_then(|db| db.collections.get(collection_id))
            .map_or(0, |coll| coll.indexes.len())
    }

    /// Whether a bucket exists.
    pub fn bucket_exists(&self, bucket_id: &str) -> bool {
        self.buckets.read().contains_key(bucket_id)
    }

    /// Find an identity by exact email.
    pub fn user_by_email(&self, email: &str) -> Option<Identity> {
        self.users.read().values().find(|u| u.email == email).cloned()
    }

    /// Number of registered identities.
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    fn insert_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        kind: &'static str,
        array: bool,
    ) -> PlatformResult<()> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        if coll.attributes.contains_key(key) {
            return Err(PlatformError::conflict(format!(
                "attribute '{key}' already exists in collection '{collection_id}'"
            )));
        }
        coll.attributes.insert(
            key.to_string(),
            AttributeState {
                kind,
                array,
                remaining_lag: self.attribute_lag.load(Ordering::Relaxed),
            },
        );
        Ok(())
    }
}

fn collection_mut<'a>(
    databases: &'a mut HashMap<String, DatabaseState>,
    database_id: &str,
    collection_id: &str,
) -> PlatformResult<&'a mut CollectionState> {
    databases
        .get_mut(database_id)
        .ok_or_else(|| PlatformError::not_found(format!("database '{database_id}' not found")))?
        .collections
        .get_mut(collection_id)
        .ok_or_else(|| {
            PlatformError::not_found(format!("collection '{collection_id}' not found"))
        })
}

fn field_matches(data: &Value, field: &str, expected: &str) -> bool {
    match data.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

fn field_contains(data: &Value, field: &str, term: &str) -> bool {
    data.get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| s.to_lowercase().contains(&term.to_lowercase()))
}

fn apply_document_queries(mut documents: Vec<Document>, queries: &[Query]) -> DocumentList {
    for query in queries {
        match query {
            Query::Equal(field, value) => {
                documents.retain(|d| field_matches(&d.data, field, value));
            }
            Query::Search(field, term) => {
                documents.retain(|d| field_contains(&d.data, field, term));
            }
            Query::OrderDesc(field) => {
                if field == "$createdAt" {
                    documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                } else {
                    let key = |d: &Document| {
                        d.data
                            .get(field)
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    };
                    documents.sort_by(|a, b| key(b).cmp(&key(a)));
                }
            }
            Query::Limit(_) => {}
        }
    }
    let total = documents.len();
    if let Some(limit) = queries.iter().find_map(|q| match q {
        Query::Limit(n) => Some(*n),
        _ => None,
    }) {
        documents.truncate(limit);
    }
    DocumentList { total, documents }
}

fn merge_object(target: &mut Value, patch: Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

#[async_trait]
impl Databases for InMemoryPlatform {
    async fn create_database(&self, database_id: &str, name: &str) -> PlatformResult<()> {
        let mut databases = self.databases.write();
        if databases.contains_key(database_id) {
            return Err(PlatformError::conflict(format!(
                "database '{database_id}' already exists"
            )));
        }
        databases.insert(
            database_id.to_string(),
            DatabaseState {
                name: name.to_string(),
                collections: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_database(&self, database_id: &str) -> PlatformResult<()> {
        self.databases
            .write()
            .remove(database_id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::not_found(format!("database '{database_id}' not found")))
    }

    async fn create_collection(
        &self,
        database_id: &str,
        collection_id: &str,
        name: &str,
        permissions: &[Grant],
        document_security: bool,
    ) -> PlatformResult<()> {
        let mut databases = self.databases.write();
        let db = databases.get_mut(database_id).ok_or_else(|| {
            PlatformError::not_found(format!("database '{database_id}' not found"))
        })?;
        if db.collections.contains_key(collection_id) {
            return Err(PlatformError::conflict(format!(
                "collection '{collection_id}' already exists"
            )));
        }
        db.collections.insert(
            collection_id.to_string(),
            CollectionState {
                name: name.to_string(),
                permissions: permissions.to_vec(),
                document_security,
                attributes: HashMap::new(),
                indexes: HashMap::new(),
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn create_string_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _size: usize,
        _required: bool,
        _default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "string", array)
    }

    async fn create_enum_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        options: &[String],
        _required: bool,
        _default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()> {
        if options.is_empty() {
            return Err(PlatformError::invalid("enum attribute requires options"));
        }
        self.insert_attribute(database_id, collection_id, key, "enum", array)
    }

    async fn create_email_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _required: bool,
        _default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "email", array)
    }

    async fn create_url_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _required: bool,
        _default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "url", array)
    }

    async fn create_ip_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _required: bool,
        _default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "ip", array)
    }

    async fn create_integer_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _required: bool,
        _min: Option<i64>,
        _max: Option<i64>,
        _default: Option<i64>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "integer", array)
    }

    async fn create_float_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _required: bool,
        _min: Option<f64>,
        _max: Option<f64>,
        _default: Option<f64>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "double", array)
    }

    async fn create_boolean_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _required: bool,
        _default: Option<bool>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "boolean", array)
    }

    async fn create_datetime_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        _required: bool,
        _default: Option<&str>,
        array: bool,
    ) -> PlatformResult<()> {
        self.insert_attribute(database_id, collection_id, key, "datetime", array)
    }

    async fn get_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
    ) -> PlatformResult<()> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        let attr = coll.attributes.get_mut(key).ok_or_else(|| {
            PlatformError::not_found(format!("attribute '{key}' not found"))
        })?;
        if attr.remaining_lag > 0 {
            attr.remaining_lag -= 1;
            return Err(PlatformError::not_found(format!(
                "attribute '{key}' not found"
            )));
        }
        Ok(())
    }

    async fn create_index(
        &self,
        database_id: &str,
        collection_id: &str,
        key: &str,
        index_type: &str,
        attributes: &[String],
        orders: &[String],
    ) -> PlatformResult<()> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        if coll.indexes.contains_key(key) {
            return Err(PlatformError::conflict(format!(
                "index '{key}' already exists"
            )));
        }
        // The platform rejects indexes over attributes it has not
        // confirmed yet, including ones still inside their lag window.
        for attribute in attributes {
            let visible = coll
                .attributes
                .get(attribute)
                .is_some_and(|a| a.remaining_lag == 0);
            if !visible {
                return Err(PlatformError::invalid(format!(
                    "attribute not found: '{attribute}'"
                )));
            }
        }
        coll.indexes.insert(
            key.to_string(),
            IndexState {
                index_type: index_type.to_string(),
                attributes: attributes.to_vec(),
                orders: orders.to_vec(),
            },
        );
        Ok(())
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> PlatformResult<Document> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        if coll.documents.contains_key(document_id) {
            return Err(PlatformError::conflict(format!(
                "document '{document_id}' already exists"
            )));
        }
        let document = Document {
            id: document_id.to_string(),
            created_at: Utc::now(),
            data,
        };
        coll.documents.insert(document_id.to_string(), document.clone());
        Ok(document)
    }

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> PlatformResult<Document> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        coll.documents.get(document_id).cloned().ok_or_else(|| {
            PlatformError::not_found(format!("document '{document_id}' not found"))
        })
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        patch: Value,
    ) -> PlatformResult<Document> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        let document = coll.documents.get_mut(document_id).ok_or_else(|| {
            PlatformError::not_found(format!("document '{document_id}' not found"))
        })?;
        merge_object(&mut document.data, patch);
        Ok(document.clone())
    }

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> PlatformResult<()> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        coll.documents.remove(document_id).map(|_| ()).ok_or_else(|| {
            PlatformError::not_found(format!("document '{document_id}' not found"))
        })
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> PlatformResult<DocumentList> {
        let mut databases = self.databases.write();
        let coll = collection_mut(&mut databases, database_id, collection_id)?;
        let mut documents: Vec<Document> = coll.documents.values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(apply_document_queries(documents, queries))
    }
}

#[async_trait]
impl Storage for InMemoryPlatform {
    async fn create_bucket(
        &self,
        bucket_id: &str,
        name: &str,
        permissions: &[Grant],
        options: &BucketOptions,
        allowed_extensions: &[String],
    ) -> PlatformResult<()> {
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket_id) {
            return Err(PlatformError::conflict(format!(
                "bucket '{bucket_id}' already exists"
            )));
        }
        buckets.insert(
            bucket_id.to_string(),
            BucketState {
                name: name.to_string(),
                permissions: permissions.to_vec(),
                options: options.clone(),
                allowed_extensions: allowed_extensions.to_vec(),
                files: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket_id: &str) -> PlatformResult<()> {
        self.buckets
            .write()
            .remove(bucket_id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::not_found(format!("bucket '{bucket_id}' not found")))
    }

    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        name: &str,
        _contents: Vec<u8>,
    ) -> PlatformResult<FileRef> {
        let mut buckets = self.buckets.write();
        let bucket = buckets.get_mut(bucket_id).ok_or_else(|| {
            PlatformError::not_found(format!("bucket '{bucket_id}' not found"))
        })?;
        let allowed = bucket.allowed_extensions.is_empty()
            || bucket
                .allowed_extensions
                .iter()
                .any(|ext| name.to_lowercase().ends_with(&format!(".{ext}")));
        if !allowed {
            return Err(PlatformError::invalid(format!(
                "file extension not allowed for '{name}'"
            )));
        }
        bucket.files.insert(file_id.to_string(), name.to_string());
        Ok(FileRef {
            id: file_id.to_string(),
        })
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> PlatformResult<()> {
        let mut buckets = self.buckets.write();
        let bucket = buckets.get_mut(bucket_id).ok_or_else(|| {
            PlatformError::not_found(format!("bucket '{bucket_id}' not found"))
        })?;
        bucket.files.remove(file_id).map(|_| ()).ok_or_else(|| {
            PlatformError::not_found(format!("file '{file_id}' not found"))
        })
    }
}

#[async_trait]
impl Users for InMemoryPlatform {
    async fn create(
        &self,
        user_id: &str,
        email: &str,
        _phone: Option<&str>,
        _password: &str,
        name: &str,
    ) -> PlatformResult<Identity> {
        if self
            .poisoned_emails
            .read()
            .iter()
            .any(|fragment| email.contains(fragment.as_str()))
        {
            return Err(PlatformError::internal(format!(
                "injected failure creating user '{email}'"
            )));
        }
        let mut users = self.users.write();
        if users.contains_key(user_id) || users.values().any(|u| u.email == email) {
            return Err(PlatformError::conflict(format!(
                "user with email '{email}' already exists"
            )));
        }
        let identity = Identity {
            id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            labels: Vec::new(),
            prefs: Value::Object(Default::default()),
        };
        users.insert(user_id.to_string(), identity.clone());
        Ok(identity)
    }

    async fn delete(&self, user_id: &str) -> PlatformResult<()> {
        self.users
            .write()
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::not_found(format!("user '{user_id}' not found")))
    }

    async fn get(&self, user_id: &str) -> PlatformResult<Identity> {
        self.users
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("user '{user_id}' not found")))
    }

    async fn list(&self, queries: &[Query]) -> PlatformResult<IdentityList> {
        let mut users: Vec<Identity> = self.users.read().values().cloned().collect();
        for query in queries {
            match query {
                Query::Equal(field, value) if field == "email" => {
                    users.retain(|u| &u.email == value);
                }
                Query::Equal(field, value) if field == "name" => {
                    users.retain(|u| &u.name == value);
                }
                _ => {}
            }
        }
        let total = users.len();
        if let Some(limit) = queries.iter().find_map(|q| match q {
            Query::Limit(n) => Some(*n),
            _ => None,
        }) {
            users.truncate(limit);
        }
        Ok(IdentityList { total, users })
    }

    async fn update_labels(&self, user_id: &str, labels: &[String]) -> PlatformResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| PlatformError::not_found(format!("user '{user_id}' not found")))?;
        user.labels = labels.to_vec();
        Ok(())
    }

    async fn update_prefs(&self, user_id: &str, prefs: Value) -> PlatformResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| PlatformError::not_found(format!("user '{user_id}' not found")))?;
        merge_object(&mut user.prefs, prefs);
        Ok(())
    }

    async fn get_prefs(&self, user_id: &str) -> PlatformResult<Value> {
        self.users
            .read()
            .get(user_id)
            .map(|u| u.prefs.clone())
            .ok_or_else(|| PlatformError::not_found(format!("user '{user_id}' not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_duplicate_database_conflicts() {
        let platform = InMemoryPlatform::new();
        platform.create_database("db_acme.com", "Acme").await.unwrap();
        let err = platform
            .create_database("db_acme.com", "Acme")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_attribute_lag_counts_down() {
        let platform = InMemoryPlatform::with_attribute_lag(2);
        platform.create_database("db", "db").await.unwrap();
        platform
            .create_collection("db", "coll", "coll", &[], true)
            .await
            .unwrap();
        platform
            .create_string_attribute("db", "coll", "title", 255, true, None, false)
            .await
            .unwrap();

        assert!(platform.get_attribute("db", "coll", "title").await.unwrap_err().is_not_found());
        assert!(platform.get_attribute("db", "coll", "title").await.unwrap_err().is_not_found());
        platform.get_attribute("db", "coll", "title").await.unwrap();
    }

    #[tokio::test]
    async fn test_index_rejects_invisible_attribute() {
        let platform = InMemoryPlatform::with_attribute_lag(3);
        platform.create_database("db", "db").await.unwrap();
        platform
            .create_collection("db", "coll", "coll", &[], true)
            .await
            .unwrap();
        platform
            .create_string_attribute("db", "coll", "title", 255, true, None, false)
            .await
            .unwrap();

        let err = platform
            .create_index("db", "coll", "idx_title", "key", &["title".into()], &[])
            .await
            .unwrap_err();
        assert_eq!(err.code, 400);
    }

    #[tokio::test]
    async fn test_document_queries() {
        let platform = InMemoryPlatform::new();
        platform.create_database("db", "db").await.unwrap();
        platform
            .create_collection("db", "meta", "meta", &[], true)
            .await
            .unwrap();
        platform
            .create_document("db", "meta", "a", json!({"domain": "acme.com", "status": "active"}))
            .await
            .unwrap();
        platform
            .create_document("db", "meta", "b", json!({"domain": "beta.com", "status": "expired"}))
            .await
            .unwrap();

        let page = platform
            .list_documents("db", "meta", &[Query::equal("domain", "acme.com"), Query::limit(1)])
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.documents[0].id, "a");

        let none = platform
            .list_documents("db", "meta", &[Query::equal("domain", "gamma.com")])
            .await
            .unwrap();
        assert_eq!(none.total, 0);
    }

    #[tokio::test]
    async fn test_duplicate_user_email_conflicts() {
        let platform = InMemoryPlatform::new();
        platform
            .create("u1", "bob@acme.com", None, "pw", "Bob")
            .await
            .unwrap();
        let err = platform
            .create("u2", "bob@acme.com", None, "pw", "Bob Again")
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_prefs_merge() {
        let platform = InMemoryPlatform::new();
        platform
            .create("u1", "bob@acme.com", None, "pw", "Bob")
            .await
            .unwrap();
        platform
            .update_prefs("u1", json!({"domain": "acme.com"}))
            .await
            .unwrap();
        platform
            .update_prefs("u1", json!({"theme": "dark"}))
            .await
            .unwrap();
        let prefs = platform.get_prefs("u1").await.unwrap();
        assert_eq!(prefs["domain"], "acme.com");
        assert_eq!(prefs["theme"], "dark");
    }
}
