//! API Models

use campus_provision::{
    FamilySignupOutcome, LicenseStatus, ProvisionOutcome, ResolutionTier, TenantRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Tenant metadata as returned to operators
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantView {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub admin_name: String,
    pub domain: String,
    pub db_id: String,
    pub gallery_bucket_id: String,
    pub assignment_bucket_id: String,
    pub notes_bucket_id: String,
    pub created_by: String,
    pub license_date: String,
    pub logo_image_id: Option<String>,
    pub status: String,
    pub notes: Vec<String>,
    pub by_name: String,
    pub by_contact: String,
}

impl From<TenantRecord> for TenantView {
    fn from(record: TenantRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            desc: record.desc,
            admin_name: record.admin_name,
            domain: record.domain,
            db_id: record.db_id,
            gallery_bucket_id: record.gallery_bucket_id,
            assignment_bucket_id: record.assignment_bucket_id,
            notes_bucket_id: record.notes_bucket_id,
            created_by: record.created_by,
            license_date: record.license_date,
            logo_image_id: record.logo_image_id,
            status: record.status.as_str().to_string(),
            notes: record.notes,
            by_name: record.by_name,
            by_contact: record.by_contact,
        }
    }
}

/// Response for a completed provisioning run. Generated credentials
/// appear here once and are never stored.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedTenant {
    pub tenant: TenantView,
    pub admin_password: String,
    pub lib_password: String,
}

impl From<ProvisionOutcome> for ProvisionedTenant {
    fn from(outcome: ProvisionOutcome) -> Self {
        Self {
            tenant: outcome.tenant.into(),
            admin_password: outcome.admin_password,
            lib_password: outcome.lib_password,
        }
    }
}

/// Tenant name/description update
#[derive(Debug, Deserialize, ToSchema)]
pub struct TenantUpdateBody {
    pub name: Option<String>,
    pub desc: Option<String>,
}

/// License date update
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseUpdateBody {
    /// New license expiry date, `YYYY-MM-DD`
    pub license_date: String,
}

/// Status override
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateBody {
    pub status: String,
}

/// Note append request
#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteBody {
    pub author: String,
    pub text: String,
}

/// Tenant resolution request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveBody {
    pub email: String,
}

/// Tenant resolution result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub tenant: TenantView,
    pub license_status: String,
    pub tier: String,
}

impl ResolveResponse {
    pub fn new(resolution: campus_provision::Resolution) -> Self {
        Self {
            tenant: resolution.tenant.into(),
            license_status: match resolution.license_status {
                LicenseStatus::Valid => "valid".to_string(),
                LicenseStatus::Expired => "expired".to_string(),
            },
            tier: match resolution.tier {
                ResolutionTier::EmailDomain => "email_domain".to_string(),
                ResolutionTier::StoredPreference => "stored_preference".to_string(),
            },
        }
    }
}

/// Family signup request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FamilySignupBody {
    pub parent_name: String,
    pub parent_email: String,
    pub parent_phone: Option<String>,
    pub student_name: String,
    pub student_email: String,
    pub domain: Option<String>,
    #[serde(default)]
    pub parent_exists: bool,
}

/// Family signup result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FamilySignupResponse {
    pub parent_id: String,
    pub student_id: String,
    pub parent_created: bool,
    pub parent_password: Option<String>,
    pub student_password: String,
}

impl From<FamilySignupOutcome> for FamilySignupResponse {
    fn from(outcome: FamilySignupOutcome) -> Self {
        Self {
            parent_id: outcome.parent.id,
            student_id: outcome.student.id,
            parent_created: outcome.parent_created,
            parent_password: outcome.parent_password,
            student_password: outcome.student_password,
        }
    }
}

/// Standalone signup request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupBody {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub domain: Option<String>,
}

/// Standalone signup result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: String,
    pub email: String,
    pub password: String,
}
