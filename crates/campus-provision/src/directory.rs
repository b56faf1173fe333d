//! Tenant directory
//!
//! Read/update surface over the cross-tenant registry: one metadata
//! document per tenant in the core database. Shared by the resolver
//! and the administrative HTTP layer.

use crate::error::{ProvisionError, ProvisionResult};
use crate::model::{
    LicenseStatus, TenantRecord, TenantStatus, CORE_DATABASE_ID, LOGO_BUCKET_ID,
    TENANTS_COLLECTION_ID,
};
use campus_platform::{unique_id, Databases, Query, Storage, Users};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Registry of tenant metadata records.
#[derive(Clone)]
pub struct TenantDirectory {
    databases: Arc<dyn Databases>,
    storage: Arc<dyn Storage>,
    users: Arc<dyn Users>,
}

impl TenantDirectory {
    /// Directory over the given platform services.
    pub fn new(
        databases: Arc<dyn Databases>,
        storage: Arc<dyn Storage>,
        users: Arc<dyn Users>,
    ) -> Self {
        Self {
            databases,
            storage,
            users,
        }
    }

    /// Create the registry database, collection, and logo bucket if
    /// they do not exist yet. The registry is reachable with server
    /// credentials only, so the collection carries no grants.
    pub async fn ensure_registry(&self) -> ProvisionResult<()> {
        match self.databases.create_database(CORE_DATABASE_ID, "Core").await {
            Ok(()) => tracing::info!("created core registry database"),
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e.into()),
        }
        match self
            .databases
            .create_collection(CORE_DATABASE_ID, TENANTS_COLLECTION_ID, "Tenants", &[], false)
            .await
        {
            Ok(()) => tracing::info!("created tenant registry collection"),
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e.into()),
        }
        let logo_extensions: Vec<String> = ["jpg", "jpeg", "png", "gif", "webp", "svg"]
            .iter()
            .map(|e| e.to_string())
            .collect();
        match self
            .storage
            .create_bucket(LOGO_BUCKET_ID, "Tenant Logos", &[], &Default::default(), &logo_extensions)
            .await
        {
            Ok(()) => tracing::info!("created tenant logo bucket"),
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Whether the registry collection is reachable. Health probes
    /// call this; a false answer means [`ensure_registry`] has not
    /// run or the platform is down.
    ///
    /// [`ensure_registry`]: TenantDirectory::ensure_registry
    pub async fn registry_ready(&self) -> bool {
        self.databases
            .list_documents(CORE_DATABASE_ID, TENANTS_COLLECTION_ID, &[Query::limit(1)])
            .await
            .is_ok()
    }

    /// Persist a new tenant record, returning it with its assigned id.
    pub async fn create_record(&self, record: &TenantRecord) -> ProvisionResult<TenantRecord> {
        let data = serde_json::to_value(record)
            .map_err(|e| ProvisionError::validation(format!("unserializable record: {e}")))?;
        let document = self
            .databases
            .create_document(CORE_DATABASE_ID, TENANTS_COLLECTION_ID, &unique_id(), data)
            .await?;
        TenantRecord::from_document(&document)
    }

    /// Find a tenant by exact domain, deriving its license status at
    /// read time: the persisted status field is not consulted.
    pub async fn find_by_domain(
        &self,
        domain: &str,
    ) -> ProvisionResult<Option<(TenantRecord, LicenseStatus)>> {
        let page = self
            .databases
            .list_documents(
                CORE_DATABASE_ID,
                TENANTS_COLLECTION_ID,
                &[Query::equal("domain", domain), Query::limit(1)],
            )
            .await?;
        let Some(document) = page.documents.first() else {
            return Ok(None);
        };
        let record = TenantRecord::from_document(document)?;
        let status = license_status_now(&record);
        Ok(Some((record, status)))
    }

    /// List tenants, newest first, optionally filtered by a name
    /// substring and a lifecycle status.
    pub async fn list(
        &self,
        name: Option<&str>,
        status: Option<TenantStatus>,
    ) -> ProvisionResult<Vec<TenantRecord>> {
        let mut queries = vec![Query::order_desc("$createdAt")];
        if let Some(name) = name {
            queries.push(Query::search("name", name));
        }
        if let Some(status) = status {
            queries.push(Query::equal("status", status.as_str()));
        }
        let page = self
            .databases
            .list_documents(CORE_DATABASE_ID, TENANTS_COLLECTION_ID, &queries)
            .await?;
        page.documents.iter().map(TenantRecord::from_document).collect()
    }

    /// Fetch one tenant record by registry id.
    pub async fn get(&self, id: &str) -> ProvisionResult<TenantRecord> {
        let document = self
            .databases
            .get_document(CORE_DATABASE_ID, TENANTS_COLLECTION_ID, id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ProvisionError::NotFound(format!("tenant '{id}'"))
                } else {
                    e.into()
                }
            })?;
        TenantRecord::from_document(&document)
    }

    /// Update a tenant's display name and description.
    pub async fn update_basic(
        &self,
        id: &str,
        name: Option<&str>,
        desc: Option<&str>,
    ) -> ProvisionResult<TenantRecord> {
        let mut patch = serde_json::Map::new();
        if let Some(name) = name {
            patch.insert("name".into(), name.into());
        }
        if let Some(desc) = desc {
            patch.insert("desc".into(), desc.into());
        }
        self.patch(id, patch.into()).await
    }

    /// Set a new license date and recompute the status from it at
    /// date granularity: a date of today or later is active, anything
    /// earlier is expired. Time of day is ignored.
    pub async fn update_license(&self, id: &str, new_date: NaiveDate) -> ProvisionResult<TenantRecord> {
        let status = if new_date >= Utc::now().date_naive() {
            TenantStatus::Active
        } else {
            TenantStatus::Expired
        };
        tracing::info!(tenant = id, date = %new_date, status = status.as_str(), "updating license");
        self.patch(
            id,
            serde_json::json!({
                "license_date": new_date.format("%Y-%m-%d").to_string(),
                "status": status.as_str(),
            }),
        )
        .await
    }

    /// Force a lifecycle status regardless of the license date.
    /// Operator override for suspensions and manual reinstatement.
    pub async fn force_status(&self, id: &str, status: TenantStatus) -> ProvisionResult<TenantRecord> {
        tracing::info!(tenant = id, status = status.as_str(), "forcing tenant status");
        self.patch(id, serde_json::json!({ "status": status.as_str() })).await
    }

    /// Append one note, prefixed with a timestamp and the author. The
    /// notes list is append-only.
    pub async fn append_note(
        &self,
        id: &str,
        author: &str,
        text: &str,
    ) -> ProvisionResult<TenantRecord> {
        let record = self.get(id).await?;
        let mut notes = record.notes;
        notes.push(format!(
            "[{}] {author}: {text}",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
        ));
        self.patch(id, serde_json::json!({ "notes": notes })).await
    }

    /// Remove a tenant and everything it owns. Resource deletions are
    /// best-effort so a half-torn-down tenant can be torn down again;
    /// only the final record delete is fatal.
    pub async fn teardown(&self, id: &str) -> ProvisionResult<()> {
        let record = self.get(id).await?;
        tracing::info!(tenant = id, domain = %record.domain, "tearing down tenant");

        for bucket_id in [
            &record.gallery_bucket_id,
            &record.assignment_bucket_id,
            &record.notes_bucket_id,
        ] {
            if let Err(e) = self.storage.delete_bucket(bucket_id).await {
                tracing::warn!(bucket = %bucket_id, error = %e, "bucket deletion failed, continuing");
            }
        }
        if let Err(e) = self.databases.delete_database(&record.db_id).await {
            tracing::warn!(db = %record.db_id, error = %e, "database deletion failed, continuing");
        }
        if !record.client_admin_user_id.is_empty() {
            if let Err(e) = self.users.delete(&record.client_admin_user_id).await {
                tracing::warn!(user = %record.client_admin_user_id, error = %e, "admin identity deletion failed, continuing");
            }
        }
        if let Some(logo_id) = &record.logo_image_id {
            if let Err(e) = self.storage.delete_file(LOGO_BUCKET_ID, logo_id).await {
                tracing::warn!(file = %logo_id, error = %e, "logo deletion failed, continuing");
            }
        }

        self.databases
            .delete_document(CORE_DATABASE_ID, TENANTS_COLLECTION_ID, id)
            .await?;
        Ok(())
    }

    async fn patch(&self, id: &str, patch: serde_json::Value) -> ProvisionResult<TenantRecord> {
        let document = self
            .databases
            .update_document(CORE_DATABASE_ID, TENANTS_COLLECTION_ID, id, patch)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ProvisionError::NotFound(format!("tenant '{id}'"))
                } else {
                    e.into()
                }
            })?;
        TenantRecord::from_document(&document)
    }
}

/// License status against the current instant: a license date strictly
/// before now is expired.
fn license_status_now(record: &TenantRecord) -> LicenseStatus {
    match record.license_expiry() {
        Some(date) => {
            let expiry = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
            match expiry {
                Some(expiry) if expiry < Utc::now() => LicenseStatus::Expired,
                Some(_) => LicenseStatus::Valid,
                None => LicenseStatus::Expired,
            }
        }
        None => LicenseStatus::Expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_platform::InMemoryPlatform;
    use chrono::Duration;

    fn record(domain: &str, license_date: &str) -> TenantRecord {
        TenantRecord {
            id: String::new(),
            name: "Acme Academy".into(),
            desc: String::new(),
            admin_name: "bob".into(),
            domain: domain.into(),
            db_id: crate::model::database_id(domain),
            gallery_bucket_id: crate::model::gallery_bucket_id(domain),
            assignment_bucket_id: crate::model::assignment_bucket_id(domain),
            notes_bucket_id: crate::model::notes_bucket_id(domain),
            created_by: "op-1".into(),
            license_date: license_date.into(),
            logo_image_id: None,
            status: TenantStatus::Active,
            client_admin_user_id: String::new(),
            notes: Vec::new(),
            by_name: String::new(),
            by_contact: String::new(),
        }
    }

    fn directory() -> (Arc<InMemoryPlatform>, TenantDirectory) {
        let platform = Arc::new(InMemoryPlatform::new());
        let directory = TenantDirectory::new(platform.clone(), platform.clone(), platform.clone());
        (platform, directory)
    }

    #[tokio::test]
    async fn test_registry_ready_after_ensure() {
        let (_, directory) = directory();
        assert!(!directory.registry_ready().await);
        directory.ensure_registry().await.unwrap();
        assert!(directory.registry_ready().await);
    }

    #[tokio::test]
    async fn test_create_and_find_by_domain() {
        let (_, directory) = directory();
        directory.ensure_registry().await.unwrap();
        directory.create_record(&record("acme.com", "2099-01-01")).await.unwrap();

        let (found, status) = directory.find_by_domain("acme.com").await.unwrap().unwrap();
        assert_eq!(found.domain, "acme.com");
        assert!(!found.id.is_empty());
        assert_eq!(status, LicenseStatus::Valid);

        assert!(directory.find_by_domain("other.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_past_license_reads_as_expired() {
        let (_, directory) = directory();
        directory.ensure_registry().await.unwrap();
        directory.create_record(&record("old.com", "2020-01-01")).await.unwrap();

        let (_, status) = directory.find_by_domain("old.com").await.unwrap().unwrap();
        assert_eq!(status, LicenseStatus::Expired);
    }

    #[tokio::test]
    async fn test_license_update_recomputes_status_at_date_granularity() {
        let (_, directory) = directory();
        directory.ensure_registry().await.unwrap();
        let created = directory.create_record(&record("acme.com", "2020-01-01")).await.unwrap();

        let today = Utc::now().date_naive();
        let updated = directory.update_license(&created.id, today).await.unwrap();
        assert_eq!(updated.status, TenantStatus::Active);

        let yesterday = today - Duration::days(1);
        let updated = directory.update_license(&created.id, yesterday).await.unwrap();
        assert_eq!(updated.status, TenantStatus::Expired);
    }

    #[tokio::test]
    async fn test_force_status_overrides() {
        let (_, directory) = directory();
        directory.ensure_registry().await.unwrap();
        let created = directory.create_record(&record("acme.com", "2099-01-01")).await.unwrap();

        let updated = directory.force_status(&created.id, TenantStatus::Suspended).await.unwrap();
        assert_eq!(updated.status, TenantStatus::Suspended);
    }

    #[tokio::test]
    async fn test_notes_are_append_only() {
        let (_, directory) = directory();
        directory.ensure_registry().await.unwrap();
        let created = directory.create_record(&record("acme.com", "2099-01-01")).await.unwrap();

        directory.append_note(&created.id, "op-1", "called the principal").await.unwrap();
        let updated = directory.append_note(&created.id, "op-2", "license renewed").await.unwrap();
        assert_eq!(updated.notes.len(), 2);
        assert!(updated.notes[0].contains("op-1: called the principal"));
        assert!(updated.notes[1].contains("op-2: license renewed"));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let (_, directory) = directory();
        directory.ensure_registry().await.unwrap();
        directory.create_record(&record("acme.com", "2099-01-01")).await.unwrap();
        let mut other = record("beta.com", "2099-01-01");
        other.name = "Beta School".into();
        other.status = TenantStatus::Suspended;
        directory.create_record(&other).await.unwrap();

        let all = directory.list(None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_name = directory.list(Some("beta"), None).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].domain, "beta.com");

        let suspended = directory.list(None, Some(TenantStatus::Suspended)).await.unwrap();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].domain, "beta.com");
    }

    #[tokio::test]
    async fn test_teardown_removes_resources_and_tolerates_missing() {
        let (platform, directory) = directory();
        directory.ensure_registry().await.unwrap();

        platform.create_database("db_acme.com", "Acme").await.unwrap();
        platform
            .create_bucket("gall-acme.com", "Gallery", &[], &Default::default(), &[])
            .await
            .unwrap();
        let admin = platform.create("admin-1", "bob@acme.com", None, "pw", "bob").await.unwrap();

        let mut rec = record("acme.com", "2099-01-01");
        rec.client_admin_user_id = admin.id;
        let created = directory.create_record(&rec).await.unwrap();

        // assignment/notes buckets never existed; teardown still completes
        directory.teardown(&created.id).await.unwrap();

        assert!(!platform.database_exists("db_acme.com"));
        assert!(!platform.bucket_exists("gall-acme.com"));
        assert!(platform.user_by_email("bob@acme.com").is_none());
        assert!(directory.find_by_domain("acme.com").await.unwrap().is_none());

        let err = directory.teardown(&created.id).await.unwrap_err();
        assert!(matches!(err, ProvisionError::NotFound(_)));
    }
}
