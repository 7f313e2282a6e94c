//! Payment stub endpoints

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use crate::middleware::CurrentUser;
use crate::models::transaction::{CreateTransactionRequest, Transaction};
use crate::server::AppState;
use crate::utils::errors::PortalError;
use crate::utils::helpers::{Paginated, PaginationParams};

/// GET /api/payments
async fn list_payments(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<Transaction>>, PortalError> {
    Ok(Json(state.services.payment_service.list_for_user(&user.actor(), page.into()).await?))
}

/// POST /api/payments
async fn create_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), PortalError> {
    let transaction = state.services.payment_service.create(&user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// POST /api/payments/{id}/confirm
async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, PortalError> {
    Ok(Json(state.services.payment_service.confirm(&user.actor(), id).await?))
}

/// POST /api/payments/{id}/cancel
async fn cancel_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, PortalError> {
    Ok(Json(state.services.payment_service.cancel(&user.actor(), id).await?))
}

/// Payment routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/payments", get(list_payments).post(create_payment))
        .route("/api/payments/{id}/confirm", post(confirm_payment))
        .route("/api/payments/{id}/cancel", post(cancel_payment))
}
