//! Public event gallery

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use crate::models::content::{Album, ContentFilter, ContentKind, ContentView};
use crate::server::AppState;
use crate::utils::errors::PortalError;
use crate::utils::helpers::{Paginated, PaginationParams};

/// `?year=2019`
#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

/// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(mut filter): Query<ContentFilter>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<ContentView>>, PortalError> {
    filter.kind = Some(ContentKind::Event);
    let events = state.services.content_service.list_public(filter, page.into()).await?;
    Ok(Json(events))
}

/// GET /api/events/albums
async fn event_albums(
    State(state): State<Arc<AppState>>,
    Query(query): Query<YearQuery>,
) -> Result<Json<Vec<Album>>, PortalError> {
    let albums = state.services.content_service.albums(ContentKind::Event, query.year).await?;
    Ok(Json(albums))
}

/// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ContentView>, PortalError> {
    let event = state.services.content_service.get_public(id, Some(ContentKind::Event)).await?;
    Ok(Json(event))
}

/// Event routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/albums", get(event_albums))
        .route("/api/events/{id}", get(get_event))
}
