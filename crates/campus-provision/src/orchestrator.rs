//! Tenant resource orchestrator
//!
//! The top-level sequence that turns a tenant descriptor plus a schema
//! into a usable tenant environment:
//!
//! ```text
//!   validate ─▶ domain check ─▶ logo ─▶ database ─▶ collections
//!                                │                      │
//!                            best-effort        fatal, poll-confirmed
//!                                                       ▼
//!            metadata ◀─ identities ◀─ buckets (best-effort)
//! ```
//!
//! Each step is an explicit entry in the run's step log with its own
//! fatal/best-effort classification. There is no rollback: a fatal
//! failure aborts the run and a later retry of the same domain resumes
//! by idempotently skipping what already exists.

use crate::directory::TenantDirectory;
use crate::error::{ProvisionError, ProvisionResult};
use crate::model::{
    assignment_bucket_id, database_id, gallery_bucket_id, notes_bucket_id, LogoFile,
    ProvisionOutcome, StepRecord, StepSeverity, StepStatus, TenantDescriptor, TenantRecord,
    TenantStatus, LOGO_BUCKET_ID,
};
use crate::provisioner::CollectionProvisioner;
use campus_platform::{
    unique_id, Action, BucketOptions, Databases, Grant, Role, Storage, Users,
};
use campus_schema::SchemaDefinition;
use std::sync::Arc;

const GALLERY_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const ASSIGNMENT_EXTENSIONS: &[&str] =
    &["pdf", "doc", "docx", "txt", "xls", "xlsx", "ppt", "pptx", "zip"];
const NOTES_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "md", "png", "jpg", "jpeg"];

/// Fixed role matrix applied to every tenant bucket.
fn bucket_grants() -> Vec<Grant> {
    let mut grants = Grant::full_crud(&Role::label("admin"));
    for action in [Action::Read, Action::Create] {
        grants.push(Grant::new(Role::label("student"), action));
    }
    for action in [Action::Read, Action::Create, Action::Update] {
        grants.push(Grant::new(Role::label("teacher"), action));
    }
    grants.push(Grant::new(Role::label("parent"), Action::Read));
    grants
}

/// Sequences one provisioning run. Holds explicit service handles so
/// tests substitute fakes without global state.
pub struct TenantOrchestrator {
    databases: Arc<dyn Databases>,
    storage: Arc<dyn Storage>,
    users: Arc<dyn Users>,
    directory: TenantDirectory,
    provisioner: CollectionProvisioner,
}

impl TenantOrchestrator {
    /// Orchestrator over the given platform services.
    pub fn new(
        databases: Arc<dyn Databases>,
        storage: Arc<dyn Storage>,
        users: Arc<dyn Users>,
        directory: TenantDirectory,
        provisioner: CollectionProvisioner,
    ) -> Self {
        Self {
            databases,
            storage,
            users,
            directory,
            provisioner,
        }
    }

    /// Run the full provisioning sequence for one tenant.
    pub async fn provision(
        &self,
        descriptor: &TenantDescriptor,
        schema: &SchemaDefinition,
    ) -> ProvisionResult<ProvisionOutcome> {
        let mut steps = Vec::new();

        descriptor.validate()?;
        steps.push(completed("validate", StepSeverity::Fatal));

        let domain = descriptor.domain.as_str();
        if self.directory.find_by_domain(domain).await?.is_some() {
            return Err(ProvisionError::DomainTaken(domain.to_string()));
        }
        steps.push(completed("domain_check", StepSeverity::Fatal));
        tracing::info!(domain, "provisioning tenant");

        let logo_image_id = self.upload_logo(descriptor.logo.as_ref(), &mut steps).await;

        let db_id = database_id(domain);
        match self.databases.create_database(&db_id, &descriptor.name).await {
            Ok(()) => steps.push(completed("database", StepSeverity::Fatal)),
            Err(e) if e.is_conflict() => {
                tracing::info!(db_id, "database already exists, skipping");
                steps.push(StepRecord {
                    name: "database",
                    severity: StepSeverity::Fatal,
                    status: StepStatus::Skipped,
                });
            }
            Err(e) => return Err(e.into()),
        }

        for collection in &schema.collections {
            self.provisioner.provision(&db_id, collection).await?;
        }
        steps.push(completed("collections", StepSeverity::Fatal));

        self.create_buckets(domain, &mut steps).await;

        let admin_email = format!("{}@{}", descriptor.admin_name, domain);
        let admin_password = unique_id();
        let admin = self
            .users
            .create(&unique_id(), &admin_email, None, &admin_password, &descriptor.admin_name)
            .await?;
        let lib_email = format!("library@{domain}");
        let lib_password = unique_id();
        let library = self
            .users
            .create(&unique_id(), &lib_email, None, &lib_password, "library")
            .await?;
        steps.push(completed("identities", StepSeverity::Fatal));

        self.apply_label(&admin.id, "admin").await;
        self.apply_label(&library.id, "library").await;

        let record = TenantRecord {
            id: String::new(),
            name: descriptor.name.clone(),
            desc: descriptor.desc.clone().unwrap_or_default(),
            admin_name: descriptor.admin_name.clone(),
            domain: domain.to_string(),
            db_id,
            gallery_bucket_id: gallery_bucket_id(domain),
            assignment_bucket_id: assignment_bucket_id(domain),
            notes_bucket_id: notes_bucket_id(domain),
            created_by: descriptor.creator_id.clone(),
            license_date: descriptor.license_date.clone(),
            logo_image_id,
            status: TenantStatus::Active,
            client_admin_user_id: admin.id.clone(),
            notes: Vec::new(),
            by_name: descriptor.by_name.clone().unwrap_or_default(),
            by_contact: descriptor.by_contact.clone().unwrap_or_default(),
        };
        let tenant = self.directory.create_record(&record).await?;
        steps.push(completed("metadata", StepSeverity::Fatal));
        tracing::info!(domain, tenant = %tenant.id, "tenant provisioned");

        Ok(ProvisionOutcome {
            tenant,
            admin_password,
            lib_password,
            steps,
        })
    }

    /// A missing logo is fine and a failed upload is not worth losing
    /// the tenant over.
    async fn upload_logo(
        &self,
        logo: Option<&LogoFile>,
        steps: &mut Vec<StepRecord>,
    ) -> Option<String> {
        let Some(logo) = logo else {
            steps.push(StepRecord {
                name: "logo_upload",
                severity: StepSeverity::BestEffort,
                status: StepStatus::Skipped,
            });
            return None;
        };
        let file_id = unique_id();
        match self
            .storage
            .create_file(LOGO_BUCKET_ID, &file_id, &logo.filename, logo.bytes.clone())
            .await
        {
            Ok(file) => {
                steps.push(completed("logo_upload", StepSeverity::BestEffort));
                Some(file.id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "logo upload failed, continuing without logo");
                steps.push(StepRecord {
                    name: "logo_upload",
                    severity: StepSeverity::BestEffort,
                    status: StepStatus::Failed(e.to_string()),
                });
                None
            }
        }
    }

    async fn create_buckets(&self, domain: &str, steps: &mut Vec<StepRecord>) {
        let grants = bucket_grants();
        let options = BucketOptions::default();
        let buckets: [(&'static str, String, &str, &[&str]); 3] = [
            ("gallery_bucket", gallery_bucket_id(domain), "Gallery", GALLERY_EXTENSIONS),
            ("assignment_bucket", assignment_bucket_id(domain), "Assignments", ASSIGNMENT_EXTENSIONS),
            ("notes_bucket", notes_bucket_id(domain), "Notes", NOTES_EXTENSIONS),
        ];
        for (step, bucket_id, name, extensions) in buckets {
            let extensions: Vec<String> = extensions.iter().map(|e| e.to_string()).collect();
            let status = match self
                .storage
                .create_bucket(&bucket_id, name, &grants, &options, &extensions)
                .await
            {
                Ok(()) => StepStatus::Completed,
                Err(e) if e.is_conflict() => {
                    tracing::info!(bucket = %bucket_id, "bucket already exists, skipping");
                    StepStatus::Skipped
                }
                Err(e) => {
                    tracing::warn!(bucket = %bucket_id, error = %e, "bucket creation failed, tenant continues without it");
                    StepStatus::Failed(e.to_string())
                }
            };
            steps.push(StepRecord {
                name: step,
                severity: StepSeverity::BestEffort,
                status,
            });
        }
    }

    async fn apply_label(&self, user_id: &str, label: &str) {
        if let Err(e) = self.users.update_labels(user_id, &[label.to_string()]).await {
            tracing::warn!(user = user_id, label, error = %e, "label update failed, continuing");
        }
    }
}

fn completed(name: &'static str, severity: StepSeverity) -> StepRecord {
    StepRecord {
        name,
        severity,
        status: StepStatus::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::NoopSleeper;
    use campus_platform::InMemoryPlatform;

    const ACME_SCHEMA: &str = r#"[
        {
            "collection": {"id": "students", "name": "Students"},
            "attributes": [{"key": "fullName", "type": "string", "required": true}],
            "indexes": [{"key": "idx_name", "attributes": ["fullName"]}]
        }
    ]"#;

    fn descriptor() -> TenantDescriptor {
        TenantDescriptor {
            name: "Acme Academy".into(),
            desc: Some("A school".into()),
            domain: "acme.com".into(),
            admin_name: "bob".into(),
            license_date: "2099-01-01".into(),
            creator_id: "op-1".into(),
            by_name: None,
            by_contact: None,
            logo: None,
        }
    }

    async fn orchestrator(platform: &Arc<InMemoryPlatform>) -> TenantOrchestrator {
        let directory =
            TenantDirectory::new(platform.clone(), platform.clone(), platform.clone());
        directory.ensure_registry().await.unwrap();
        let provisioner =
            CollectionProvisioner::new(platform.clone()).with_sleeper(Arc::new(NoopSleeper));
        TenantOrchestrator::new(
            platform.clone(),
            platform.clone(),
            platform.clone(),
            directory,
            provisioner,
        )
    }

    #[tokio::test]
    async fn test_end_to_end_provisioning() {
        let platform = Arc::new(InMemoryPlatform::with_attribute_lag(2));
        let orchestrator = orchestrator(&platform).await;
        let schema = SchemaDefinition::from_json(ACME_SCHEMA).unwrap();

        let outcome = orchestrator.provision(&descriptor(), &schema).await.unwrap();

        assert!(platform.database_exists("db_acme.com"));
        assert!(platform.collection_exists("db_acme.com", "students"));
        assert_eq!(platform.attribute_count("db_acme.com", "students"), 1);
        assert_eq!(platform.index_count("db_acme.com", "students"), 1);
        for bucket in ["gall-acme.com", "assignment-acme.com", "notes-acme.com"] {
            assert!(platform.bucket_exists(bucket));
        }
        let admin = platform.user_by_email("bob@acme.com").unwrap();
        assert_eq!(admin.labels, vec!["admin"]);
        let library = platform.user_by_email("library@acme.com").unwrap();
        assert_eq!(library.labels, vec!["library"]);

        assert_eq!(outcome.tenant.status, TenantStatus::Active);
        assert_eq!(outcome.tenant.client_admin_user_id, admin.id);
        assert!(!outcome.admin_password.is_empty());
        assert!(!outcome.lib_password.is_empty());
        assert!(outcome
            .steps
            .iter()
            .all(|s| !matches!(s.status, StepStatus::Failed(_))));
    }

    #[tokio::test]
    async fn test_duplicate_domain_is_rejected() {
        let platform = Arc::new(InMemoryPlatform::new());
        let orchestrator = orchestrator(&platform).await;
        let schema = SchemaDefinition::from_json(ACME_SCHEMA).unwrap();

        orchestrator.provision(&descriptor(), &schema).await.unwrap();
        let err = orchestrator.provision(&descriptor(), &schema).await.unwrap_err();
        assert!(matches!(err, ProvisionError::DomainTaken(ref d) if d == "acme.com"));
    }

    #[tokio::test]
    async fn test_validation_short_circuits_before_remote_calls() {
        let platform = Arc::new(InMemoryPlatform::new());
        let orchestrator = orchestrator(&platform).await;
        let schema = SchemaDefinition::from_json(ACME_SCHEMA).unwrap();

        let mut bad = descriptor();
        bad.license_date = "soon".into();
        let err = orchestrator.provision(&bad, &schema).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Validation(_)));
        assert!(!platform.database_exists("db_acme.com"));
        assert_eq!(platform.user_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_after_fatal_failure_resumes_idempotently() {
        let platform = Arc::new(InMemoryPlatform::new());
        let orchestrator = orchestrator(&platform).await;
        let schema = SchemaDefinition::from_json(ACME_SCHEMA).unwrap();

        // First run dies at identity creation, after the database,
        // collection, and buckets already exist.
        platform.fail_user_creates_matching("bob@acme.com");
        let err = orchestrator.provision(&descriptor(), &schema).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Platform(_)));
        assert!(platform.database_exists("db_acme.com"));
        assert!(orchestrator.directory.find_by_domain("acme.com").await.unwrap().is_none());

        // Second run skips what exists and finishes the job.
        platform.clear_failures();
        let outcome = orchestrator.provision(&descriptor(), &schema).await.unwrap();
        assert_eq!(platform.attribute_count("db_acme.com", "students"), 1);
        assert_eq!(platform.index_count("db_acme.com", "students"), 1);
        let skipped: Vec<&str> = outcome
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Skipped)
            .map(|s| s.name)
            .collect();
        assert!(skipped.contains(&"database"));
        assert!(skipped.contains(&"gallery_bucket"));
        assert!(orchestrator.directory.find_by_domain("acme.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logo_upload_failure_is_non_fatal() {
        let platform = Arc::new(InMemoryPlatform::new());
        let orchestrator = orchestrator(&platform).await;
        let schema = SchemaDefinition::from_json(ACME_SCHEMA).unwrap();

        let mut with_logo = descriptor();
        // Executable uploads are outside every bucket's allow-list
        with_logo.logo = Some(LogoFile {
            filename: "logo.exe".into(),
            bytes: vec![1, 2, 3],
        });
        let outcome = orchestrator.provision(&with_logo, &schema).await.unwrap();
        assert!(outcome.tenant.logo_image_id.is_none());
        let logo_step = outcome.steps.iter().find(|s| s.name == "logo_upload").unwrap();
        assert!(matches!(logo_step.status, StepStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_logo_upload_records_file_id() {
        let platform = Arc::new(InMemoryPlatform::new());
        let orchestrator = orchestrator(&platform).await;
        let schema = SchemaDefinition::from_json(ACME_SCHEMA).unwrap();

        let mut with_logo = descriptor();
        with_logo.logo = Some(LogoFile {
            filename: "logo.png".into(),
            bytes: vec![1, 2, 3],
        });
        let outcome = orchestrator.provision(&with_logo, &schema).await.unwrap();
        assert!(outcome.tenant.logo_image_id.is_some());
    }

    #[tokio::test]
    async fn test_poll_timeout_aborts_run() {
        let platform = Arc::new(InMemoryPlatform::with_attribute_lag(50));
        let orchestrator = orchestrator(&platform).await;
        let schema = SchemaDefinition::from_json(ACME_SCHEMA).unwrap();

        let err = orchestrator.provision(&descriptor(), &schema).await.unwrap_err();
        assert!(matches!(err, ProvisionError::AttributePollTimeout { .. }));
        // no metadata record was written for the aborted run
        assert!(orchestrator.directory.find_by_domain("acme.com").await.unwrap().is_none());
        assert_eq!(platform.user_count(), 0);
    }
}
