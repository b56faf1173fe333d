//! Campus Administrative API
//!
//! REST surface for tenant provisioning and operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ADMINISTRATIVE API                          │
//! │                                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │                      REST API                              │ │
//! │  │        OpenAPI 3.1 | CORS | multipart uploads              │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │   tenants    │  │   signup     │  │    health    │          │
//! │  │ provision /  │  │ family saga  │  │              │          │
//! │  │ CRUD / notes │  │ standalone   │  │              │          │
//! │  │ resolve      │  │              │  │              │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────┘          │
//! │         │                 │                                     │
//! │  ┌──────▼─────────────────▼──────────────────────────────────┐ │
//! │  │   orchestrator | directory | resolver | identity saga     │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod error;
pub mod models;
pub mod routes;

use axum::{routing::get, Router};
use campus_platform::{Databases, InMemoryPlatform, Storage, Users};
use campus_provision::{
    CollectionProvisioner, IdentitySaga, Mailer, NoopSleeper, ProvisionResult, RecordingMailer,
    Sleeper, TenantDirectory, TenantOrchestrator, TenantResolver, TokioSleeper,
};
use campus_schema::SchemaDefinition;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use models::*;

/// API state: the provisioning core plus the schema every new tenant
/// is provisioned with.
pub struct ApiState {
    /// Schema applied to every provisioning run.
    pub schema: Arc<SchemaDefinition>,
    /// Tenant registry surface.
    pub directory: TenantDirectory,
    /// Provisioning sequencer.
    pub orchestrator: Arc<TenantOrchestrator>,
    /// Email-to-tenant resolver.
    pub resolver: TenantResolver,
    /// Identity signup flows.
    pub saga: IdentitySaga,
}

impl ApiState {
    /// State over the given platform services, using real backoff
    /// delays. Call [`TenantDirectory::ensure_registry`] once at
    /// startup before serving.
    pub fn new(
        databases: Arc<dyn Databases>,
        storage: Arc<dyn Storage>,
        users: Arc<dyn Users>,
        mailer: Arc<dyn Mailer>,
        schema: SchemaDefinition,
    ) -> Self {
        Self::with_sleeper(databases, storage, users, mailer, schema, Arc::new(TokioSleeper))
    }

    /// State with an injected delay source.
    pub fn with_sleeper(
        databases: Arc<dyn Databases>,
        storage: Arc<dyn Storage>,
        users: Arc<dyn Users>,
        mailer: Arc<dyn Mailer>,
        schema: SchemaDefinition,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let directory = TenantDirectory::new(databases.clone(), storage.clone(), users.clone());
        let provisioner = CollectionProvisioner::new(databases.clone()).with_sleeper(sleeper);
        let orchestrator = Arc::new(TenantOrchestrator::new(
            databases,
            storage,
            users.clone(),
            directory.clone(),
            provisioner,
        ));
        let resolver = TenantResolver::new(directory.clone(), users.clone());
        let saga = IdentitySaga::new(users, mailer);
        Self {
            schema: Arc::new(schema),
            directory,
            orchestrator,
            resolver,
            saga,
        }
    }

    /// Self-contained state over the in-memory backend with the
    /// bundled schema and a recording mailer. Registry is ready on
    /// return. For tests and local development.
    pub async fn in_memory(
    ) -> ProvisionResult<(Self, Arc<InMemoryPlatform>, Arc<RecordingMailer>)> {
        let platform = Arc::new(InMemoryPlatform::new());
        let mailer = Arc::new(RecordingMailer::new());
        let state = Self::with_sleeper(
            platform.clone(),
            platform.clone(),
            platform.clone(),
            mailer.clone(),
            SchemaDefinition::campus_default()?,
            Arc::new(NoopSleeper),
        );
        state.directory.ensure_registry().await?;
        Ok((state, platform, mailer))
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus API",
        version = "1.0.0",
        description = "Campus administrative API - multi-tenant provisioning and operations",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::tenants::create_tenant,
        routes::tenants::list_tenants,
        routes::tenants::get_tenant,
        routes::tenants::update_tenant,
        routes::tenants::delete_tenant,
        routes::tenants::update_license,
        routes::tenants::force_status,
        routes::tenants::append_note,
        routes::tenants::resolve_tenant,
        routes::signup::family_signup,
        routes::signup::signup,
    ),
    components(
        schemas(
            ErrorResponse,
            TenantView, ProvisionedTenant, TenantUpdateBody,
            LicenseUpdateBody, StatusUpdateBody, NoteBody,
            ResolveBody, ResolveResponse,
            FamilySignupBody, FamilySignupResponse,
            SignupBody, SignupResponse,
            routes::health::HealthResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tenants", description = "Tenant provisioning and operations"),
        (name = "signup", description = "Identity signup flows")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api_routes())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .nest("/tenants", routes::tenants::router())
        .nest("/signup", routes::signup::router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    const BOUNDARY: &str = "------------------------campusboundary";

    fn multipart_body(fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body.into_bytes()
    }

    fn acme_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("name", "Acme Academy"),
            ("domain", "acme.com"),
            ("adminName", "bob"),
            ("licenseDate", "2099-01-01"),
            ("creatorId", "op-1"),
            ("byName", "Jo Billing"),
            ("byContact", "jo@billing.example"),
        ]
    }

    async fn server() -> (TestServer, Arc<campus_platform::InMemoryPlatform>) {
        let (state, platform, _) = ApiState::in_memory().await.unwrap();
        (TestServer::new(build_router(state)).unwrap(), platform)
    }

    async fn provision_acme(server: &TestServer) -> Value {
        let response = server
            .post("/api/v1/tenants")
            .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
            .bytes(multipart_body(&acme_fields()).into())
            .await;
        assert_eq!(response.status_code(), 201);
        response.json::<Value>()
    }

    #[tokio::test]
    async fn test_health() {
        let (server, _) = server().await;
        let response = server.get("/health").await;
        assert_eq!(response.status_code(), 200);
        let body = response.json::<Value>();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["registry"], "ready");
    }

    #[tokio::test]
    async fn test_provision_tenant_end_to_end() {
        let (server, platform) = server().await;
        let body = provision_acme(&server).await;

        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["tenant"]["domain"], "acme.com");
        assert_eq!(data["tenant"]["status"], "active");
        assert!(!data["adminPassword"].as_str().unwrap().is_empty());
        assert!(!data["libPassword"].as_str().unwrap().is_empty());

        assert!(platform.database_exists("db_acme.com"));
        assert!(platform.collection_exists("db_acme.com", "students"));
        assert!(platform.bucket_exists("gall-acme.com"));
        assert!(platform.user_by_email("bob@acme.com").is_some());
        assert!(platform.user_by_email("library@acme.com").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_domain_conflicts() {
        let (server, _) = server().await;
        provision_acme(&server).await;

        let response = server
            .post("/api/v1/tenants")
            .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
            .bytes(multipart_body(&acme_fields()).into())
            .await;
        assert_eq!(response.status_code(), 409);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "domain_taken");
    }

    #[tokio::test]
    async fn test_missing_field_is_rejected() {
        let (server, platform) = server().await;
        let response = server
            .post("/api/v1/tenants")
            .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
            .bytes(multipart_body(&[("name", "Acme Academy")]).into())
            .await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(platform.user_count(), 0);
    }

    #[tokio::test]
    async fn test_list_get_and_update() {
        let (server, _) = server().await;
        let body = provision_acme(&server).await;
        let id = body["data"]["tenant"]["id"].as_str().unwrap().to_string();

        let list = server.get("/api/v1/tenants").await.json::<Value>();
        assert_eq!(list["data"].as_array().unwrap().len(), 1);

        let one = server.get(&format!("/api/v1/tenants/{id}")).await;
        assert_eq!(one.status_code(), 200);
        assert_eq!(one.json::<Value>()["data"]["name"], "Acme Academy");

        let updated = server
            .put(&format!("/api/v1/tenants/{id}"))
            .json(&json!({"name": "Acme School", "desc": "renamed"}))
            .await
            .json::<Value>();
        assert_eq!(updated["data"]["name"], "Acme School");
        assert_eq!(updated["data"]["desc"], "renamed");

        let missing = server.get("/api/v1/tenants/does-not-exist").await;
        assert_eq!(missing.status_code(), 404);
    }

    #[tokio::test]
    async fn test_license_update_recomputes_status() {
        let (server, _) = server().await;
        let body = provision_acme(&server).await;
        let id = body["data"]["tenant"]["id"].as_str().unwrap().to_string();

        let expired = server
            .put(&format!("/api/v1/tenants/{id}/license"))
            .json(&json!({"licenseDate": "2020-01-01"}))
            .await
            .json::<Value>();
        assert_eq!(expired["data"]["status"], "expired");

        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let active = server
            .put(&format!("/api/v1/tenants/{id}/license"))
            .json(&json!({"licenseDate": today}))
            .await
            .json::<Value>();
        assert_eq!(active["data"]["status"], "active");
    }

    #[tokio::test]
    async fn test_status_override_and_notes() {
        let (server, _) = server().await;
        let body = provision_acme(&server).await;
        let id = body["data"]["tenant"]["id"].as_str().unwrap().to_string();

        let suspended = server
            .put(&format!("/api/v1/tenants/{id}/status"))
            .json(&json!({"status": "suspended"}))
            .await
            .json::<Value>();
        assert_eq!(suspended["data"]["status"], "suspended");

        let bad = server
            .put(&format!("/api/v1/tenants/{id}/status"))
            .json(&json!({"status": "vaporized"}))
            .await;
        assert_eq!(bad.status_code(), 400);

        let noted = server
            .post(&format!("/api/v1/tenants/{id}/notes"))
            .json(&json!({"author": "op-1", "text": "suspended for non-payment"}))
            .await
            .json::<Value>();
        let notes = noted["data"]["notes"].as_array().unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].as_str().unwrap().contains("op-1: suspended for non-payment"));
    }

    #[tokio::test]
    async fn test_teardown_removes_tenant() {
        let (server, platform) = server().await;
        let body = provision_acme(&server).await;
        let id = body["data"]["tenant"]["id"].as_str().unwrap().to_string();

        let response = server.delete(&format!("/api/v1/tenants/{id}")).await;
        assert_eq!(response.status_code(), 200);
        assert!(!platform.database_exists("db_acme.com"));
        assert!(!platform.bucket_exists("gall-acme.com"));

        let list = server.get("/api/v1/tenants").await.json::<Value>();
        assert!(list["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_reports_tier() {
        let (server, platform) = server().await;
        provision_acme(&server).await;

        let direct = server
            .post("/api/v1/tenants/resolve")
            .json(&json!({"email": "user@acme.com"}))
            .await
            .json::<Value>();
        assert_eq!(direct["data"]["tenant"]["domain"], "acme.com");
        assert_eq!(direct["data"]["tier"], "email_domain");
        assert_eq!(direct["data"]["licenseStatus"], "valid");

        let user = platform
            .create("u1", "user@elsewhere.org", None, "pw", "User")
            .await
            .unwrap();
        platform
            .update_prefs(&user.id, json!({"domain": "acme.com"}))
            .await
            .unwrap();
        let via_pref = server
            .post("/api/v1/tenants/resolve")
            .json(&json!({"email": "user@elsewhere.org"}))
            .await
            .json::<Value>();
        assert_eq!(via_pref["data"]["tier"], "stored_preference");

        let miss = server
            .post("/api/v1/tenants/resolve")
            .json(&json!({"email": "user@unknown.net"}))
            .await;
        assert_eq!(miss.status_code(), 404);
    }

    #[tokio::test]
    async fn test_family_signup_endpoint() {
        let (server, platform) = server().await;
        let response = server
            .post("/api/v1/signup/family")
            .json(&json!({
                "parentName": "Pat Parent",
                "parentEmail": "pat@acme.com",
                "studentName": "Sam Student",
                "studentEmail": "sam@acme.com",
                "domain": "acme.com"
            }))
            .await;
        assert_eq!(response.status_code(), 201);
        let body = response.json::<Value>();
        assert_eq!(body["data"]["parentCreated"], true);
        assert!(platform.user_by_email("sam@acme.com").is_some());

        // same emails again conflict
        let again = server
            .post("/api/v1/signup/family")
            .json(&json!({
                "parentName": "Pat Parent",
                "parentEmail": "pat@acme.com",
                "studentName": "Sam Student",
                "studentEmail": "sam@acme.com"
            }))
            .await;
        assert_eq!(again.status_code(), 409);
    }

    #[tokio::test]
    async fn test_standalone_signup_endpoint() {
        let (server, platform) = server().await;
        let response = server
            .post("/api/v1/signup")
            .json(&json!({
                "name": "Terry Teacher",
                "email": "terry@acme.com",
                "labels": ["teacher"],
                "domain": "acme.com"
            }))
            .await;
        assert_eq!(response.status_code(), 201);
        let identity = platform.user_by_email("terry@acme.com").unwrap();
        assert_eq!(identity.labels, vec!["teacher"]);
    }
}
