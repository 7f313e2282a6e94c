//! Account endpoints: registration, OTP verification, login and password reset

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use crate::middleware::CurrentUser;
use crate::models::user::{UpdateUserRequest, UserProfile};
use crate::server::AppState;
use crate::services::auth::{
    EmailRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest, VerifyOtpRequest,
};
use crate::utils::errors::PortalError;

/// Acknowledgement body for endpoints without a payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

/// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), PortalError> {
    let profile = state.services.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// POST /api/auth/verify-otp
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<UserProfile>, PortalError> {
    Ok(Json(state.services.auth_service.verify_email(req).await?))
}

/// POST /api/auth/resend-otp
async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, PortalError> {
    state.services.auth_service.resend_otp(req).await?;
    Ok(MessageResponse::new("if the account exists, a new code has been sent"))
}

/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, PortalError> {
    Ok(Json(state.services.auth_service.login(req).await?))
}

/// POST /api/auth/forgot-password
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, PortalError> {
    state.services.auth_service.forgot_password(req).await?;
    Ok(MessageResponse::new("if the account exists, a reset code has been sent"))
}

/// POST /api/auth/reset-password
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, PortalError> {
    state.services.auth_service.reset_password(req).await?;
    Ok(MessageResponse::new("password updated"))
}

/// GET /api/auth/me
async fn me(State(state): State<Arc<AppState>>, user: CurrentUser) -> Result<Json<UserProfile>, PortalError> {
    Ok(Json(state.services.auth_service.me(user.id).await?))
}

/// PUT /api/auth/me
async fn update_me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, PortalError> {
    Ok(Json(state.services.user_service.update_profile(&user.actor(), req).await?))
}

/// Account routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/resend-otp", post(resend_otp))
        .route("/api/auth/login", post(login))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/me", get(me).put(update_me))
}
