//! Identity signup flows
//!
//! The family signup is a two-identity saga: create (or reuse) a
//! parent, then create a student. The one compensating action in the
//! whole system lives here: a parent created in this invocation is
//! deleted again when the student create fails, so a failed signup
//! leaves no half-linked family behind. A pre-existing parent is never
//! touched. Label and preference updates and the credentials mail are
//! best-effort on top.

use crate::error::{ProvisionError, ProvisionResult};
use crate::notify::{MailRequest, Mailer};
use campus_platform::{unique_id, Identity, Query, Users};
use std::sync::Arc;

/// Input for a family signup.
#[derive(Debug, Clone)]
pub struct FamilySignupRequest {
    /// Parent display name.
    pub parent_name: String,
    /// Parent login email.
    pub parent_email: String,
    /// Parent phone number.
    pub parent_phone: Option<String>,
    /// Student display name.
    pub student_name: String,
    /// Student login email.
    pub student_email: String,
    /// Tenant domain stored as a preference on both identities.
    pub domain: Option<String>,
    /// Caller asserts the parent identity already exists and should
    /// be reused by email lookup instead of created.
    pub parent_exists: bool,
}

/// Input for a standalone identity signup.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Caller-chosen password; generated when absent.
    pub password: Option<String>,
    /// Role labels to attach.
    pub labels: Vec<String>,
    /// Tenant domain stored as a preference.
    pub domain: Option<String>,
}

/// Result of a successful family signup.
#[derive(Debug, Clone)]
pub struct FamilySignupOutcome {
    /// The parent identity, created or reused.
    pub parent: Identity,
    /// The student identity.
    pub student: Identity,
    /// Whether the parent was created in this invocation.
    pub parent_created: bool,
    /// Generated parent credential, absent when the parent was reused.
    pub parent_password: Option<String>,
    /// Generated student credential.
    pub student_password: String,
}

/// Result of a standalone signup.
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    /// The created identity.
    pub identity: Identity,
    /// The credential in effect, echoed back when it was generated.
    pub password: String,
}

/// Runs the signup flows against the identity service.
#[derive(Clone)]
pub struct IdentitySaga {
    users: Arc<dyn Users>,
    mailer: Arc<dyn Mailer>,
}

impl IdentitySaga {
    /// Saga over the given identity service and mail transport.
    pub fn new(users: Arc<dyn Users>, mailer: Arc<dyn Mailer>) -> Self {
        Self { users, mailer }
    }

    /// Create a linked parent/student pair.
    pub async fn family_signup(
        &self,
        request: &FamilySignupRequest,
    ) -> ProvisionResult<FamilySignupOutcome> {
        let (parent, parent_created, parent_password) = if request.parent_exists {
            (self.find_parent(&request.parent_email).await?, false, None)
        } else {
            let password = unique_id();
            let parent = self
                .users
                .create(
                    &unique_id(),
                    &request.parent_email,
                    request.parent_phone.as_deref(),
                    &password,
                    &request.parent_name,
                )
                .await?;
            tracing::info!(parent = %parent.email, "created parent identity");
            (parent, true, Some(password))
        };

        let student_password = unique_id();
        let student = match self
            .users
            .create(
                &unique_id(),
                &request.student_email,
                None,
                &student_password,
                &request.student_name,
            )
            .await
        {
            Ok(student) => student,
            Err(e) => {
                if parent_created {
                    tracing::warn!(
                        parent = %parent.email,
                        "student creation failed, removing parent created this invocation"
                    );
                    if let Err(delete_err) = self.users.delete(&parent.id).await {
                        tracing::error!(parent = %parent.id, error = %delete_err, "compensation failed");
                    }
                }
                return Err(e.into());
            }
        };
        tracing::info!(student = %student.email, "created student identity");

        self.apply_profile(&parent.id, &["parent"], request.domain.as_deref()).await;
        self.apply_profile(&student.id, &["student"], request.domain.as_deref()).await;

        self.send_credentials_mail(request, &parent, parent_password.as_deref(), &student_password)
            .await;

        Ok(FamilySignupOutcome {
            parent,
            student,
            parent_created,
            parent_password,
            student_password,
        })
    }

    /// Create one identity with labels, a stored domain preference,
    /// and a best-effort welcome mail.
    pub async fn signup(&self, request: &SignupRequest) -> ProvisionResult<SignupOutcome> {
        let password = request.password.clone().unwrap_or_else(unique_id);
        let identity = self
            .users
            .create(
                &unique_id(),
                &request.email,
                request.phone.as_deref(),
                &password,
                &request.name,
            )
            .await?;
        tracing::info!(user = %identity.email, "created identity");

        let labels: Vec<&str> = request.labels.iter().map(String::as_str).collect();
        self.apply_profile(&identity.id, &labels, request.domain.as_deref()).await;

        let mail = MailRequest {
            recipient: identity.email.clone(),
            subject: "Welcome to your campus account".into(),
            html: None,
            text: Some(format!(
                "Hello {},\n\nYour account {} is ready.\n",
                identity.name, identity.email
            )),
        };
        if let Err(e) = self.mailer.send(&mail).await {
            tracing::warn!(recipient = %identity.email, error = %e, "welcome mail failed, continuing");
        }

        Ok(SignupOutcome { identity, password })
    }

    async fn find_parent(&self, email: &str) -> ProvisionResult<Identity> {
        let page = self
            .users
            .list(&[Query::equal("email", email), Query::limit(1)])
            .await?;
        page.users
            .into_iter()
            .next()
            .ok_or_else(|| ProvisionError::NotFound(format!("parent identity '{email}'")))
    }

    /// Labels and the domain preference are not worth failing a signup
    /// over once the identities exist.
    async fn apply_profile(&self, user_id: &str, labels: &[&str], domain: Option<&str>) {
        let labels: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        if let Err(e) = self.users.update_labels(user_id, &labels).await {
            tracing::warn!(user = user_id, error = %e, "label update failed, continuing");
        }
        if let Some(domain) = domain {
            let prefs = serde_json::json!({ "domain": domain });
            if let Err(e) = self.users.update_prefs(user_id, prefs).await {
                tracing::warn!(user = user_id, error = %e, "preference update failed, continuing");
            }
        }
    }

    async fn send_credentials_mail(
        &self,
        request: &FamilySignupRequest,
        parent: &Identity,
        parent_password: Option<&str>,
        student_password: &str,
    ) {
        let mut text = format!(
            "Hello {},\n\nYour family accounts are ready.\n\nStudent: {}\nStudent password: {}\n",
            parent.name, request.student_email, student_password
        );
        if let Some(password) = parent_password {
            text.push_str(&format!("\nParent: {}\nParent password: {}\n", parent.email, password));
        }
        let mail = MailRequest {
            recipient: parent.email.clone(),
            subject: "Your campus family accounts".into(),
            html: None,
            text: Some(text),
        };
        if let Err(e) = self.mailer.send(&mail).await {
            tracing::warn!(recipient = %parent.email, error = %e, "credentials mail failed, continuing");
        }
    }
}
