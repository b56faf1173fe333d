//! Collection/attribute/index provisioner
//!
//! Drives one collection definition against the platform in the only
//! order the platform accepts: collection, then each attribute (poll-
//! confirmed before moving on), then each index. "Already exists" is
//! success everywhere; any other error aborts the caller's run.

use crate::error::{ProvisionError, ProvisionResult};
use crate::permissions;
use crate::retry::{RetryFailure, RetryPolicy, Sleeper, TokioSleeper};
use campus_platform::{Databases, PlatformError};
use campus_schema::{AttributeKind, AttributeSpec, CollectionSpec, IndexSpec};
use std::sync::Arc;
use std::time::Duration;

/// Pause after a successful index create, absorbing index-build lag
/// before the next operation.
const INDEX_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Provisions one collection at a time against a tenant database.
pub struct CollectionProvisioner {
    databases: Arc<dyn Databases>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CollectionProvisioner {
    /// Provisioner with the default poll policy and real delays.
    pub fn new(databases: Arc<dyn Databases>) -> Self {
        Self {
            databases,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the delay source. Tests pass a no-op sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the poll policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create the collection, its attributes, and its indexes.
    /// Sequential by design: indexes have a hard dependency on
    /// attribute readiness, and concurrent mutating calls against an
    /// eventually-consistent platform invite spurious races.
    pub async fn provision(&self, db_id: &str, spec: &CollectionSpec) -> ProvisionResult<()> {
        self.create_collection(db_id, spec).await?;
        for attribute in &spec.attributes {
            self.create_attribute(db_id, &spec.id, attribute).await?;
        }
        for index in &spec.indexes {
            self.create_index(db_id, &spec.id, index).await?;
        }
        Ok(())
    }

    async fn create_collection(&self, db_id: &str, spec: &CollectionSpec) -> ProvisionResult<()> {
        let grants = permissions::synthesize(spec.permissions.as_deref(), &spec.id);
        match self
            .databases
            .create_collection(db_id, &spec.id, &spec.name, &grants, spec.document_security)
            .await
        {
            Ok(()) => {
                tracing::info!(db_id, collection = %spec.id, "created collection");
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                tracing::info!(db_id, collection = %spec.id, "collection already exists, skipping");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_attribute(
        &self,
        db_id: &str,
        collection_id: &str,
        spec: &AttributeSpec,
    ) -> ProvisionResult<()> {
        let result = self.issue_attribute_create(db_id, collection_id, spec).await;
        match result {
            Ok(()) => {
                tracing::info!(db_id, collection_id, attribute = %spec.key, "created attribute");
            }
            Err(e) if e.is_conflict() => {
                // May belong to an earlier partial run, so it still
                // gets poll-confirmed below.
                tracing::info!(db_id, collection_id, attribute = %spec.key, "attribute already exists, skipping");
            }
            Err(e) => return Err(e.into()),
        }
        self.wait_for_attribute(db_id, collection_id, &spec.key).await
    }

    async fn issue_attribute_create(
        &self,
        db_id: &str,
        coll: &str,
        spec: &AttributeSpec,
    ) -> Result<(), PlatformError> {
        let key = spec.key.as_str();
        match &spec.kind {
            AttributeKind::PlainString { size, default } => {
                self.databases
                    .create_string_attribute(db_id, coll, key, *size, spec.required, default.as_deref(), spec.array)
                    .await
            }
            AttributeKind::Enum { options, default } => {
                self.databases
                    .create_enum_attribute(db_id, coll, key, options, spec.required, default.as_deref(), spec.array)
                    .await
            }
            AttributeKind::Email { default } => {
                self.databases
                    .create_email_attribute(db_id, coll, key, spec.required, default.as_deref(), spec.array)
                    .await
            }
            AttributeKind::Url { default } => {
                self.databases
                    .create_url_attribute(db_id, coll, key, spec.required, default.as_deref(), spec.array)
                    .await
            }
            AttributeKind::Ip { default } => {
                self.databases
                    .create_ip_attribute(db_id, coll, key, spec.required, default.as_deref(), spec.array)
                    .await
            }
            AttributeKind::Integer { min, max, default } => {
                self.databases
                    .create_integer_attribute(db_id, coll, key, spec.required, *min, *max, *default, spec.array)
                    .await
            }
            AttributeKind::Float { min, max, default } => {
                self.databases
                    .create_float_attribute(db_id, coll, key, spec.required, *min, *max, *default, spec.array)
                    .await
            }
            AttributeKind::Boolean { default } => {
                self.databases
                    .create_boolean_attribute(db_id, coll, key, spec.required, *default, spec.array)
                    .await
            }
            AttributeKind::Datetime { default } => {
                self.databases
                    .create_datetime_attribute(db_id, coll, key, spec.required, default.as_deref(), spec.array)
                    .await
            }
        }
    }

    /// Poll until the attribute is queryable. 404 means the platform
    /// has not caught up yet and is worth another attempt; anything
    /// else propagates immediately.
    pub async fn wait_for_attribute(
        &self,
        db_id: &str,
        collection_id: &str,
        key: &str,
    ) -> ProvisionResult<()> {
        let outcome = self
            .policy
            .run(
                self.sleeper.as_ref(),
                || self.databases.get_attribute(db_id, collection_id, key),
                PlatformError::is_not_found,
            )
            .await;
        match outcome {
            Ok(()) => Ok(()),
            Err(RetryFailure::Exhausted { attempts, last_error }) => {
                Err(ProvisionError::AttributePollTimeout {
                    collection: collection_id.to_string(),
                    attribute: key.to_string(),
                    attempts,
                    last_error,
                })
            }
            Err(RetryFailure::NonRetryable(e)) => Err(e.into()),
        }
    }

    async fn create_index(
        &self,
        db_id: &str,
        collection_id: &str,
        spec: &IndexSpec,
    ) -> ProvisionResult<()> {
        match self
            .databases
            .create_index(db_id, collection_id, &spec.key, &spec.index_type, &spec.attributes, &spec.orders)
            .await
        {
            Ok(()) => {
                tracing::info!(db_id, collection_id, index = %spec.key, "created index");
                self.sleeper.sleep(INDEX_SETTLE_DELAY).await;
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                tracing::info!(db_id, collection_id, index = %spec.key, "index already exists, skipping");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::NoopSleeper;
    use campus_platform::InMemoryPlatform;
    use campus_schema::SchemaDefinition;

    const SCHEMA: &str = r#"[
        {
            "collection": {"id": "students", "name": "Students"},
            "attributes": [
                {"key": "fullName", "type": "string", "required": true},
                {"key": "grade", "type": "integer", "min": 1, "max": 12}
            ],
            "indexes": [{"key": "idx_name", "attributes": ["fullName"]}]
        }
    ]"#;

    fn provisioner(platform: Arc<InMemoryPlatform>) -> CollectionProvisioner {
        CollectionProvisioner::new(platform).with_sleeper(Arc::new(NoopSleeper))
    }

    #[tokio::test]
    async fn test_provisions_despite_attribute_lag() {
        let platform = Arc::new(InMemoryPlatform::with_attribute_lag(3));
        platform.create_database("db", "db").await.unwrap();
        let schema = SchemaDefinition::from_json(SCHEMA).unwrap();

        provisioner(platform.clone())
            .provision("db", &schema.collections[0])
            .await
            .unwrap();

        assert!(platform.collection_exists("db", "students"));
        assert_eq!(platform.attribute_count("db", "students"), 2);
        assert_eq!(platform.index_count("db", "students"), 1);
    }

    #[tokio::test]
    async fn test_reprovision_is_idempotent() {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.create_database("db", "db").await.unwrap();
        let schema = SchemaDefinition::from_json(SCHEMA).unwrap();
        let provisioner = provisioner(platform.clone());

        provisioner.provision("db", &schema.collections[0]).await.unwrap();
        provisioner.provision("db", &schema.collections[0]).await.unwrap();

        assert_eq!(platform.attribute_count("db", "students"), 2);
        assert_eq!(platform.index_count("db", "students"), 1);
    }

    #[tokio::test]
    async fn test_poll_exhaustion_surfaces_timeout() {
        // Lag far beyond the attempt budget
        let platform = Arc::new(InMemoryPlatform::with_attribute_lag(100));
        platform.create_database("db", "db").await.unwrap();
        let schema = SchemaDefinition::from_json(SCHEMA).unwrap();

        let err = provisioner(platform)
            .provision("db", &schema.collections[0])
            .await
            .unwrap_err();
        match err {
            ProvisionError::AttributePollTimeout { collection, attribute, attempts, .. } => {
                assert_eq!(collection, "students");
                assert_eq!(attribute, "fullName");
                assert_eq!(attempts, 7);
            }
            other => panic!("expected poll timeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_database_is_fatal() {
        let platform = Arc::new(InMemoryPlatform::new());
        let schema = SchemaDefinition::from_json(SCHEMA).unwrap();
        let err = provisioner(platform)
            .provision("db", &schema.collections[0])
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Platform(ref e) if e.is_not_found()));
    }
}
