//! Tenant resolver
//!
//! Read-only, two-tier lookup used by client applications to discover
//! which tenant an email address belongs to. Tier one matches the
//! email's domain suffix against the registry; tier two falls back to
//! a `domain` preference stored on the identity owning the email. Both
//! tiers go through the directory's find-by-domain primitive, so the
//! license status in the answer is always derived at read time.

use crate::directory::TenantDirectory;
use crate::error::{ProvisionError, ProvisionResult};
use crate::model::{LicenseStatus, TenantRecord};
use campus_platform::{Query, Users};
use serde::Serialize;
use std::sync::Arc;

/// Which lookup tier produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// The email's own domain suffix matched a tenant.
    EmailDomain,
    /// The identity's stored `domain` preference matched a tenant.
    StoredPreference,
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The matched tenant record.
    pub tenant: TenantRecord,
    /// License status derived at read time.
    pub license_status: LicenseStatus,
    /// The tier that matched.
    pub tier: ResolutionTier,
}

/// Resolves emails to tenants.
#[derive(Clone)]
pub struct TenantResolver {
    directory: TenantDirectory,
    users: Arc<dyn Users>,
}

impl TenantResolver {
    /// Resolver over the registry and identity service.
    pub fn new(directory: TenantDirectory, users: Arc<dyn Users>) -> Self {
        Self { directory, users }
    }

    /// Resolve an email to its tenant, reporting which tier matched.
    /// Domains are matched case-insensitively; registered domains are
    /// always lowercase.
    pub async fn resolve(&self, email: &str) -> ProvisionResult<Resolution> {
        let domain = email
            .rsplit_once('@')
            .map(|(_, d)| d.to_ascii_lowercase())
            .ok_or_else(|| {
                ProvisionError::validation(format!("'{email}' is not an email address"))
            })?;

        if let Some((tenant, license_status)) = self.directory.find_by_domain(&domain).await? {
            return Ok(Resolution {
                tenant,
                license_status,
                tier: ResolutionTier::EmailDomain,
            });
        }
        tracing::debug!(email, domain, "no tenant for email domain, trying stored preference");

        if let Some(preferred) = self.preferred_domain(email).await? {
            if let Some((tenant, license_status)) = self.directory.find_by_domain(&preferred).await? {
                return Ok(Resolution {
                    tenant,
                    license_status,
                    tier: ResolutionTier::StoredPreference,
                });
            }
        }

        Err(ProvisionError::NotFound(format!("no tenant for '{email}'")))
    }

    async fn preferred_domain(&self, email: &str) -> ProvisionResult<Option<String>> {
        let page = self
            .users
            .list(&[Query::equal("email", email), Query::limit(1)])
            .await?;
        let Some(identity) = page.users.first() else {
            return Ok(None);
        };
        let prefs = self.users.get_prefs(&identity.id).await?;
        Ok(prefs
            .get("domain")
            .and_then(|v| v.as_str())
            .map(str::to_ascii_lowercase))
    }
}
