//! Content submission, public galleries and owner management

use std::sync::Arc;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use crate::middleware::CurrentUser;
use crate::models::content::{
    Album, ContentFilter, ContentKind, ContentView, CreateContentRequest, PhotoView, UpdateContentRequest,
};
use crate::server::AppState;
use crate::services::storage::MultipartForm;
use crate::utils::errors::PortalError;
use crate::utils::helpers::{Paginated, PaginationParams};

/// `?kind=reunion&year=2015`
#[derive(Debug, Default, Deserialize)]
pub struct AlbumQuery {
    pub kind: Option<ContentKind>,
    pub year: Option<i32>,
}

/// Build a submission from the text parts of a multipart form
pub fn draft_from_form(form: &MultipartForm) -> Result<CreateContentRequest, PortalError> {
    let kind = form
        .field("kind")
        .map(|kind| kind.parse::<ContentKind>())
        .transpose()
        .map_err(|e| PortalError::InvalidInput(e.to_string()))?;

    let title = form
        .field("title")
        .ok_or_else(|| PortalError::InvalidInput("title is required".to_string()))?;

    let year = form
        .field("year")
        .map(|year| year.parse::<i32>())
        .transpose()
        .map_err(|_| PortalError::InvalidInput("year must be a number".to_string()))?;

    Ok(CreateContentRequest {
        kind,
        section: form.field("section").map(str::to_string),
        title: title.to_string(),
        description: form.field("description").map(str::to_string),
        year,
        video_url: form.field("video_url").map(str::to_string),
    })
}

/// GET /api/content
async fn list_content(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ContentFilter>,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<ContentView>>, PortalError> {
    Ok(Json(state.services.content_service.list_public(filter, page.into()).await?))
}

/// POST /api/content (multipart)
async fn create_content(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ContentView>), PortalError> {
    let form = state.services.storage_service.read_form(multipart).await?;
    let draft = draft_from_form(&form)?;

    let content = state
        .services
        .content_service
        .create(&user.actor(), draft, form.files)
        .await?;

    Ok((StatusCode::CREATED, Json(content)))
}

/// GET /api/content/albums
async fn content_albums(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlbumQuery>,
) -> Result<Json<Vec<Album>>, PortalError> {
    let kind = query.kind.unwrap_or(ContentKind::General);
    Ok(Json(state.services.content_service.albums(kind, query.year).await?))
}

/// GET /api/content/{slug}
async fn get_content(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ContentView>, PortalError> {
    Ok(Json(state.services.content_service.get_public_by_slug(&slug).await?))
}

/// PUT /api/content/{id}
async fn update_content(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Json<ContentView>, PortalError> {
    Ok(Json(state.services.content_service.update(&user.actor(), id, req).await?))
}

/// DELETE /api/content/{id}
async fn delete_content(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, PortalError> {
    state.services.content_service.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/content/{id}/photos (multipart)
async fn add_photos(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<PhotoView>>), PortalError> {
    let form = state.services.storage_service.read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(PortalError::InvalidInput("no photos in upload".to_string()));
    }

    let photos = state
        .services
        .content_service
        .add_photos(&user.actor(), id, form.files)
        .await?;

    Ok((StatusCode::CREATED, Json(photos)))
}

/// DELETE /api/content/{id}/photos/{photo_id}
async fn remove_photo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((id, photo_id)): Path<(i64, i64)>,
) -> Result<StatusCode, PortalError> {
    state.services.content_service.remove_photo(&user.actor(), id, photo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/me/content
async fn my_content(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(page): Query<PaginationParams>,
) -> Result<Json<Paginated<ContentView>>, PortalError> {
    Ok(Json(state.services.content_service.list_for_owner(&user.actor(), page.into()).await?))
}

/// Content routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/content", get(list_content).post(create_content))
        .route("/api/content/albums", get(content_albums))
        .route(
            "/api/content/{id}",
            get(get_content).put(update_content).delete(delete_content),
        )
        .route("/api/content/{id}/photos", post(add_photos))
        .route("/api/content/{id}/photos/{photo_id}", delete(remove_photo))
        .route("/api/me/content", get(my_content))
}
