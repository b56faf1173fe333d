//! Tenant records, descriptors, and derived identifiers

use crate::error::{ProvisionError, ProvisionResult};
use campus_platform::Document;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Database holding the cross-tenant registry.
pub const CORE_DATABASE_ID: &str = "core";
/// Collection holding one metadata record per tenant.
pub const TENANTS_COLLECTION_ID: &str = "tenants";
/// Shared bucket for tenant logo assets.
pub const LOGO_BUCKET_ID: &str = "tenant-logos";

/// Deterministic tenant database id. Re-running provisioning for the
/// same domain targets the same database.
pub fn database_id(domain: &str) -> String {
    format!("db_{domain}")
}

/// Deterministic gallery bucket id for a domain.
pub fn gallery_bucket_id(domain: &str) -> String {
    format!("gall-{domain}")
}

/// Deterministic assignment bucket id for a domain.
pub fn assignment_bucket_id(domain: &str) -> String {
    format!("assignment-{domain}")
}

/// Deterministic notes bucket id for a domain.
pub fn notes_bucket_id(domain: &str) -> String {
    format!("notes-{domain}")
}

/// Tenant lifecycle status persisted on the metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    /// Licensed and operating.
    Active,
    /// License date has passed.
    Expired,
    /// Record exists but provisioning has not finished.
    PendingSetup,
    /// Provisioning aborted partway.
    SetupFailed,
    /// Manually disabled by an operator.
    Suspended,
}

impl TenantStatus {
    /// Stable string form, matching the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::PendingSetup => "pending_setup",
            Self::SetupFailed => "setup_failed",
            Self::Suspended => "suspended",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            "pending_setup" => Some(Self::PendingSetup),
            "setup_failed" => Some(Self::SetupFailed),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// License state derived at read time from the stored license date,
/// never trusted from the persisted status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    /// License date has not passed yet.
    Valid,
    /// License date is strictly in the past.
    Expired,
}

/// Optional logo asset supplied with a provisioning request.
#[derive(Debug, Clone)]
pub struct LogoFile {
    /// Original file name, used for the extension check.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Input for one provisioning run. Transient, supplied once per call.
#[derive(Debug, Clone)]
pub struct TenantDescriptor {
    /// Tenant display name.
    pub name: String,
    /// Free-form description.
    pub desc: Option<String>,
    /// Unique tenant domain, e.g. `acme.com`.
    pub domain: String,
    /// Local part of the administrator identity's email.
    pub admin_name: String,
    /// License expiry date, `YYYY-MM-DD`.
    pub license_date: String,
    /// Identity of the operator performing the provisioning.
    pub creator_id: String,
    /// Billing contact name.
    pub by_name: Option<String>,
    /// Billing contact details.
    pub by_contact: Option<String>,
    /// Optional logo asset.
    pub logo: Option<LogoFile>,
}

fn valid_domain(domain: &str) -> bool {
    domain.contains('.')
        && domain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

fn valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

fn valid_display_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " .-_'&".contains(c))
}

impl TenantDescriptor {
    /// Check required fields and parse the license date. Runs before
    /// any remote call.
    pub fn validate(&self) -> ProvisionResult<NaiveDate> {
        if !valid_display_name(&self.name) {
            return Err(ProvisionError::validation(
                "tenant name is empty or contains illegal characters",
            ));
        }
        if !valid_domain(&self.domain) {
            return Err(ProvisionError::validation(format!(
                "'{}' is not a valid tenant domain",
                self.domain
            )));
        }
        if !valid_handle(&self.admin_name) {
            return Err(ProvisionError::validation(
                "admin name is empty or contains illegal characters",
            ));
        }
        if self.creator_id.trim().is_empty() {
            return Err(ProvisionError::validation("creator id is required"));
        }
        NaiveDate::parse_from_str(&self.license_date, "%Y-%m-%d").map_err(|_| {
            ProvisionError::validation(format!(
                "'{}' is not a valid license date (expected YYYY-MM-DD)",
                self.license_date
            ))
        })
    }
}

/// Persisted metadata record, one per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Registry document id. Assigned on write, not persisted in the
    /// document body.
    #[serde(default, skip_serializing)]
    pub id: String,
    /// Tenant display name.
    pub name: String,
    /// Free-form description.
    pub desc: String,
    /// Local part of the administrator email.
    pub admin_name: String,
    /// Unique tenant domain.
    pub domain: String,
    /// Tenant database id.
    pub db_id: String,
    /// Gallery bucket id.
    pub gallery_bucket_id: String,
    /// Assignment bucket id.
    pub assignment_bucket_id: String,
    /// Notes bucket id.
    pub notes_bucket_id: String,
    /// Operator who provisioned the tenant.
    pub created_by: String,
    /// License expiry date, `YYYY-MM-DD`.
    pub license_date: String,
    /// Logo file id in the shared logo bucket, when one was uploaded.
    pub logo_image_id: Option<String>,
    /// Lifecycle status.
    pub status: TenantStatus,
    /// Platform user id of the tenant administrator identity.
    pub client_admin_user_id: String,
    /// Append-only operator notes, oldest first.
    pub notes: Vec<String>,
    /// Billing contact name.
    pub by_name: String,
    /// Billing contact details.
    pub by_contact: String,
}

impl TenantRecord {
    /// Rebuild a record from its registry document.
    pub fn from_document(document: &Document) -> ProvisionResult<Self> {
        let mut record: TenantRecord = serde_json::from_value(document.data.clone())
            .map_err(|e| {
                ProvisionError::Platform(campus_platform::PlatformError::internal(format!(
                    "malformed tenant record '{}': {e}",
                    document.id
                )))
            })?;
        record.id = document.id.clone();
        Ok(record)
    }

    /// Parsed license expiry date.
    pub fn license_expiry(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.license_date, "%Y-%m-%d").ok()
    }
}

/// Whether an orchestration step may abort the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSeverity {
    /// Failure aborts the run.
    Fatal,
    /// Failure is logged and the run continues.
    BestEffort,
}

/// Outcome of one orchestration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum StepStatus {
    /// The step ran and succeeded.
    Completed,
    /// The resource already existed; nothing to do.
    Skipped,
    /// The step failed. Only possible in the outcome for best-effort
    /// steps; a fatal failure aborts the run instead.
    Failed(String),
}

/// One entry in a provisioning run's step log.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step name.
    pub name: &'static str,
    /// Whether failure would have aborted the run.
    pub severity: StepSeverity,
    /// What happened.
    pub status: StepStatus,
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    /// The persisted tenant record.
    pub tenant: TenantRecord,
    /// Generated administrator credential. Never persisted.
    pub admin_password: String,
    /// Generated library-account credential. Never persisted.
    pub lib_password: String,
    /// Per-step log of the run.
    pub steps: Vec<StepRecord>,
}
