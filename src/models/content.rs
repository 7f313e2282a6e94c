//! Content model: events, reunions, videos and general gallery posts

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

text_enum! {
    /// Gallery a content row belongs to
    ContentKind {
        Event => "event",
        Reunion => "reunion",
        Video => "video",
        General => "general",
    }
}

text_enum! {
    /// Moderation status
    ContentStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl ContentStatus {
    /// Allowed status changes. Moderators move rows between approved and
    /// rejected; an owner edit sends a rejected row back to pending.
    pub fn can_transition_to(&self, next: ContentStatus) -> bool {
        matches!(
            (self, next),
            (ContentStatus::Pending, ContentStatus::Approved)
                | (ContentStatus::Pending, ContentStatus::Rejected)
                | (ContentStatus::Rejected, ContentStatus::Approved)
                | (ContentStatus::Approved, ContentStatus::Rejected)
                | (ContentStatus::Rejected, ContentStatus::Pending)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Content {
    pub id: i64,
    pub owner_id: i64,
    #[sqlx(try_from = "String")]
    pub kind: ContentKind,
    pub section: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub video_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ContentStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentPhoto {
    pub id: i64,
    pub content_id: i64,
    pub file_name: String,
    pub original_name: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when submitting content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateContentRequest {
    pub kind: Option<ContentKind>,
    pub section: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub video_url: Option<String>,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContentRequest {
    pub section: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub video_url: Option<String>,
}

/// Photo metadata recorded after the file has been written
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub file_name: String,
    pub original_name: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Listing filter for content queries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentFilter {
    pub kind: Option<ContentKind>,
    pub status: Option<ContentStatus>,
    pub year: Option<i32>,
    pub section: Option<String>,
    pub owner_id: Option<i64>,
}

/// Photo as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoView {
    pub id: i64,
    pub content_id: i64,
    pub url: String,
    pub original_name: Option<String>,
    pub mime_type: String,
    pub size_bytes: i64,
    pub position: i32,
}

impl PhotoView {
    pub fn from_photo(photo: &ContentPhoto, base_url: &str) -> Self {
        Self {
            id: photo.id,
            content_id: photo.content_id,
            url: format!(
                "{}/uploads/{}/{}",
                base_url.trim_end_matches('/'),
                photo.content_id,
                photo.file_name
            ),
            original_name: photo.original_name.clone(),
            mime_type: photo.mime_type.clone(),
            size_bytes: photo.size_bytes,
            position: photo.position,
        }
    }
}

/// Content row together with its photos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentView {
    #[serde(flatten)]
    pub content: Content,
    pub photos: Vec<PhotoView>,
}

/// Approved rows sharing a (normalised title, year) key, shown as one gallery album
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub key: String,
    pub title: String,
    pub year: Option<i32>,
    pub kind: ContentKind,
    pub content_ids: Vec<i64>,
    pub cover_url: Option<String>,
    pub photos: Vec<PhotoView>,
}
