//! Moderation queue and account administration
//!
//! Moderation needs rep_admin or above; everything touching accounts,
//! statistics or payments needs admin or above.

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use crate::middleware::auth::{Admin, RepAdmin};
use crate::middleware::Authorized;
use crate::models::content::{ContentFilter, ContentView};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::models::user::{Role, UserProfile};
use crate::models::DashboardStats;
use crate::server::AppState;
use crate::utils::errors::PortalError;
use crate::utils::helpers::{Paginated, PaginationParams};

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<TransactionStatus>,
}

/// GET /api/admin/content
async fn moderation_queue(
    State(state): State<Arc<AppState>>,
    _moderator: Authorized<RepAdmin>,
    Query(filter): Query<ContentFilter>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<ContentView>>, PortalError> {
    Ok(Json(state.services.content_service.moderation_queue(filter, page.into()).await?))
}

/// POST /api/admin/content/{id}/approve
async fn approve_content(
    State(state): State<Arc<AppState>>,
    moderator: Authorized<RepAdmin>,
    Path(id): Path<i64>,
) -> Result<Json<ContentView>, PortalError> {
    Ok(Json(state.services.content_service.approve(&moderator.actor(), id).await?))
}

/// POST /api/admin/content/{id}/reject; `{}` rejects without a reason
async fn reject_content(
    State(state): State<Arc<AppState>>,
    moderator: Authorized<RepAdmin>,
    Path(id): Path<i64>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<ContentView>, PortalError> {
    Ok(Json(state.services.content_service.reject(&moderator.actor(), id, req.reason).await?))
}

/// GET /api/admin/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: Authorized<Admin>,
    Query(query): Query<RoleQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<UserProfile>>, PortalError> {
    Ok(Json(state.services.user_service.list(query.role, page.into()).await?))
}

/// PUT /api/admin/users/{id}/role
async fn change_role(
    State(state): State<Arc<AppState>>,
    admin: Authorized<Admin>,
    Path(id): Path<i64>,
    Json(req): Json<RoleChangeRequest>,
) -> Result<Json<UserProfile>, PortalError> {
    let profile = state
        .services
        .user_service
        .change_role(&admin.actor(), id, req.role)
        .await?;
    Ok(Json(profile))
}

/// DELETE /api/admin/users/{id}
async fn delete_user(
    State(state): State<Arc<AppState>>,
    admin: Authorized<Admin>,
    Path(id): Path<i64>,
) -> Result<StatusCode, PortalError> {
    state.services.user_service.delete(&admin.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/stats
async fn stats(
    State(state): State<Arc<AppState>>,
    _admin: Authorized<Admin>,
) -> Result<Json<DashboardStats>, PortalError> {
    Ok(Json(state.services.database().dashboard_stats().await?))
}

/// GET /api/admin/transactions
async fn list_transactions(
    State(state): State<Arc<AppState>>,
    _admin: Authorized<Admin>,
    Query(query): Query<StatusQuery>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<Transaction>>, PortalError> {
    Ok(Json(state.services.payment_service.list_all(query.status, page.into()).await?))
}

/// Admin routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/content", get(moderation_queue))
        .route("/api/admin/content/{id}/approve", post(approve_content))
        .route("/api/admin/content/{id}/reject", post(reject_content))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}/role", put(change_role))
        .route("/api/admin/users/{id}", delete(delete_user))
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/transactions", get(list_transactions))
}
