//! Tenant provisioning and operations endpoints

use crate::error::{bad_request, ApiError};
use crate::{ApiState, models::*};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use campus_provision::{LogoFile, TenantDescriptor, TenantStatus};
use chrono::NaiveDate;
use std::sync::Arc;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", post(create_tenant).get(list_tenants))
        .route("/resolve", post(resolve_tenant))
        .route("/:id", get(get_tenant).put(update_tenant).delete(delete_tenant))
        .route("/:id/license", put(update_license))
        .route("/:id/status", put(force_status))
        .route("/:id/notes", post(append_note))
}

/// Provision a new tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Fields: name, desc, domain, adminName, licenseDate, creatorId, byName, byContact, optional logo file"),
    responses(
        (status = 201, description = "Tenant provisioned, response carries generated credentials"),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "Domain already provisioned"),
        (status = 500, description = "Upstream platform failure")
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ProvisionedTenant>>), ApiError> {
    let mut name = None;
    let mut desc = None;
    let mut domain = None;
    let mut admin_name = None;
    let mut license_date = None;
    let mut creator_id = None;
    let mut by_name = None;
    let mut by_contact = None;
    let mut logo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("logo") => {
                let filename = field.file_name().unwrap_or("logo").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("unreadable logo upload: {e}")))?;
                logo = Some(LogoFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some(text_field) => {
                let text_field = text_field.to_string();
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("unreadable field '{text_field}': {e}")))?;
                match text_field.as_str() {
                    "name" => name = Some(value),
                    "desc" => desc = Some(value),
                    "domain" => domain = Some(value),
                    "adminName" => admin_name = Some(value),
                    "licenseDate" => license_date = Some(value),
                    "creatorId" => creator_id = Some(value),
                    "byName" => by_name = Some(value),
                    "byContact" => by_contact = Some(value),
                    _ => {}
                }
            }
            None => {}
        }
    }

    let descriptor = TenantDescriptor {
        name: name.ok_or_else(|| bad_request("field 'name' is required"))?,
        desc,
        domain: domain.ok_or_else(|| bad_request("field 'domain' is required"))?,
        admin_name: admin_name.ok_or_else(|| bad_request("field 'adminName' is required"))?,
        license_date: license_date
            .ok_or_else(|| bad_request("field 'licenseDate' is required"))?,
        creator_id: creator_id.ok_or_else(|| bad_request("field 'creatorId' is required"))?,
        by_name,
        by_contact,
        logo,
    };

    let outcome = state.orchestrator.provision(&descriptor, &state.schema).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(outcome.into())),
    ))
}

#[derive(serde::Deserialize)]
pub struct ListParams {
    name: Option<String>,
    status: Option<String>,
}

/// List tenants, newest first
#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    params(
        ("name" = Option<String>, Query, description = "Filter by name substring"),
        ("status" = Option<String>, Query, description = "Filter by lifecycle status")
    ),
    responses(
        (status = 200, description = "Tenant records, newest first"),
        (status = 400, description = "Unknown status filter")
    ),
    tag = "tenants"
)]
pub async fn list_tenants(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<TenantView>>>, ApiError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(
            TenantStatus::parse(raw)
                .ok_or_else(|| bad_request(format!("unknown status '{raw}'")))?,
        ),
        None => None,
    };
    let records = state.directory.list(params.name.as_deref(), status).await?;
    let views = records.into_iter().map(TenantView::from).collect();
    Ok(Json(ApiResponse::success(views)))
}

/// Get one tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{id}",
    params(("id" = String, Path, description = "Tenant record id")),
    responses(
        (status = 200, description = "Tenant record"),
        (status = 404, description = "No such tenant")
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TenantView>>, ApiError> {
    let record = state.directory.get(&id).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

/// Update tenant name/description
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}",
    params(("id" = String, Path, description = "Tenant record id")),
    request_body = TenantUpdateBody,
    responses(
        (status = 200, description = "Updated tenant record"),
        (status = 404, description = "No such tenant")
    ),
    tag = "tenants"
)]
pub async fn update_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<TenantUpdateBody>,
) -> Result<Json<ApiResponse<TenantView>>, ApiError> {
    let record = state
        .directory
        .update_basic(&id, body.name.as_deref(), body.desc.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(record.into())))
}

/// Tear down a tenant and its resources
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{id}",
    params(("id" = String, Path, description = "Tenant record id")),
    responses(
        (status = 200, description = "Tenant removed"),
        (status = 404, description = "No such tenant")
    ),
    tag = "tenants"
)]
pub async fn delete_tenant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.directory.teardown(&id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// Update the license date, recomputing status
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}/license",
    params(("id" = String, Path, description = "Tenant record id")),
    request_body = LicenseUpdateBody,
    responses(
        (status = 200, description = "Updated tenant record with recomputed status"),
        (status = 400, description = "Malformed date"),
        (status = 404, description = "No such tenant")
    ),
    tag = "tenants"
)]
pub async fn update_license(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<LicenseUpdateBody>,
) -> Result<Json<ApiResponse<TenantView>>, ApiError> {
    let date = NaiveDate::parse_from_str(&body.license_date, "%Y-%m-%d").map_err(|_| {
        bad_request(format!(
            "'{}' is not a valid license date (expected YYYY-MM-DD)",
            body.license_date
        ))
    })?;
    let record = state.directory.update_license(&id, date).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

/// Force a lifecycle status
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{id}/status",
    params(("id" = String, Path, description = "Tenant record id")),
    request_body = StatusUpdateBody,
    responses(
        (status = 200, description = "Updated tenant record"),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "No such tenant")
    ),
    tag = "tenants"
)]
pub async fn force_status(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateBody>,
) -> Result<Json<ApiResponse<TenantView>>, ApiError> {
    let status = TenantStatus::parse(&body.status)
        .ok_or_else(|| bad_request(format!("unknown status '{}'", body.status)))?;
    let record = state.directory.force_status(&id, status).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

/// Append an operator note
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{id}/notes",
    params(("id" = String, Path, description = "Tenant record id")),
    request_body = NoteBody,
    responses(
        (status = 200, description = "Updated tenant record with the appended note"),
        (status = 404, description = "No such tenant")
    ),
    tag = "tenants"
)]
pub async fn append_note(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<NoteBody>,
) -> Result<Json<ApiResponse<TenantView>>, ApiError> {
    let record = state.directory.append_note(&id, &body.author, &body.text).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

/// Resolve an email to its tenant
#[utoipa::path(
    post,
    path = "/api/v1/tenants/resolve",
    request_body = ResolveBody,
    responses(
        (status = 200, description = "Matched tenant, with the tier that resolved it"),
        (status = 404, description = "No tenant for this email")
    ),
    tag = "tenants"
)]
pub async fn resolve_tenant(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<ApiResponse<ResolveResponse>>, ApiError> {
    let resolution = state.resolver.resolve(&body.email).await?;
    Ok(Json(ApiResponse::success(ResolveResponse::new(resolution))))
}
