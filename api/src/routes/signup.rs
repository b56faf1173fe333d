//! Identity signup endpoints

use crate::error::ApiError;
use crate::{ApiState, models::*};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use campus_provision::{FamilySignupRequest, SignupRequest};
use std::sync::Arc;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", post(signup))
        .route("/family", post(family_signup))
}

/// Create a linked parent/student pair
#[utoipa::path(
    post,
    path = "/api/v1/signup/family",
    request_body = FamilySignupBody,
    responses(
        (status = 201, description = "Both identities created, credentials returned"),
        (status = 404, description = "Parent marked as existing was not found"),
        (status = 409, description = "An email is already registered"),
        (status = 500, description = "Identity service failure")
    ),
    tag = "signup"
)]
pub async fn family_signup(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<FamilySignupBody>,
) -> Result<(StatusCode, Json<ApiResponse<FamilySignupResponse>>), ApiError> {
    let request = FamilySignupRequest {
        parent_name: body.parent_name,
        parent_email: body.parent_email,
        parent_phone: body.parent_phone,
        student_name: body.student_name,
        student_email: body.student_email,
        domain: body.domain,
        parent_exists: body.parent_exists,
    };
    let outcome = state.saga.family_signup(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(outcome.into())),
    ))
}

/// Create a single identity
#[utoipa::path(
    post,
    path = "/api/v1/signup",
    request_body = SignupBody,
    responses(
        (status = 201, description = "Identity created"),
        (status = 409, description = "Email already registered")
    ),
    tag = "signup"
)]
pub async fn signup(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<SignupBody>,
) -> Result<(StatusCode, Json<ApiResponse<SignupResponse>>), ApiError> {
    let request = SignupRequest {
        name: body.name,
        email: body.email,
        phone: body.phone,
        password: body.password,
        labels: body.labels,
        domain: body.domain,
    };
    let outcome = state.saga.signup(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SignupResponse {
            user_id: outcome.identity.id,
            email: outcome.identity.email,
            password: outcome.password,
        })),
    ))
}
