//! Content service implementation
//!
//! Submission, editing and moderation of events, reunions, videos and
//! gallery posts, plus grouping of approved rows into albums.

use std::collections::HashMap;
use tracing::{info, warn, debug};
use crate::config::Settings;
use crate::database::repositories::{ContentRepository, NewContent};
use crate::models::content::{
    Album, Content, ContentFilter, ContentKind, ContentPhoto, ContentStatus, ContentView,
    CreateContentRequest, PhotoView, UpdateContentRequest,
};
use crate::models::user::Actor;
use crate::services::cache::CacheService;
use crate::services::storage::{StorageService, UploadedFile};
use crate::utils::errors::{PortalError, Result};
use crate::utils::helpers::{album_key, generate_random_string, is_valid_year, slugify, Paginated, Pagination};
use crate::utils::logging::log_content_action;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 5000;
const MAX_SECTION_LENGTH: usize = 50;
const DEFAULT_SECTION: &str = "gallery";
const ALBUM_CACHE_PREFIX: &str = "albums:";

fn invalid(message: impl Into<String>) -> PortalError {
    PortalError::InvalidInput(message.into())
}

fn check_title(title: &str) -> Result<()> {
    let len = title.trim().chars().count();
    if len == 0 || len > MAX_TITLE_LENGTH {
        return Err(invalid(format!("title must be between 1 and {MAX_TITLE_LENGTH} characters")));
    }
    Ok(())
}

fn check_video_url(video_url: &str) -> Result<()> {
    let parsed = url::Url::parse(video_url.trim()).map_err(|_| invalid("invalid video URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("video URL must use http or https"));
    }
    Ok(())
}

fn check_optional_fields(description: Option<&str>, year: Option<i32>, section: Option<&str>) -> Result<()> {
    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(invalid(format!("description is limited to {MAX_DESCRIPTION_LENGTH} characters")));
        }
    }

    if let Some(year) = year {
        if !is_valid_year(year) {
            return Err(invalid(format!("invalid year {year}")));
        }
    }

    if let Some(section) = section {
        let section = section.trim();
        if section.is_empty()
            || section.len() > MAX_SECTION_LENGTH
            || !section.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("section must be a short identifier"));
        }
    }

    Ok(())
}

/// Check a new submission; returns the kind it will be stored as
pub fn validate_draft(draft: &CreateContentRequest) -> Result<ContentKind> {
    let kind = draft.kind.unwrap_or(ContentKind::General);
    check_title(&draft.title)?;
    check_optional_fields(draft.description.as_deref(), draft.year, draft.section.as_deref())?;

    match (&draft.video_url, kind) {
        (Some(video_url), _) => check_video_url(video_url)?,
        (None, ContentKind::Video) => return Err(invalid("video_url is required for videos")),
        (None, _) => {}
    }

    Ok(kind)
}

/// Check a partial update against the row it applies to
pub fn validate_patch(content: &Content, patch: &UpdateContentRequest) -> Result<()> {
    if let Some(title) = &patch.title {
        check_title(title)?;
    }
    check_optional_fields(patch.description.as_deref(), patch.year, patch.section.as_deref())?;

    if let Some(video_url) = &patch.video_url {
        check_video_url(video_url)?;
    } else if content.kind == ContentKind::Video && content.video_url.is_none() {
        return Err(invalid("video_url is required for videos"));
    }

    Ok(())
}

/// Whether `actor` may edit, delete or change photos of `content`
pub fn ensure_can_edit(actor: &Actor, content: &Content) -> Result<()> {
    if actor.is_staff() {
        return Ok(());
    }

    if content.owner_id != actor.id {
        return Err(PortalError::PermissionDenied("not the owner of this content".to_string()));
    }

    if content.status == ContentStatus::Approved {
        return Err(PortalError::PermissionDenied(
            "approved content can only be changed by a moderator".to_string(),
        ));
    }

    Ok(())
}

/// Status an edit by `actor` moves `content` to, if it changes
pub fn status_after_edit(actor: &Actor, content: &Content) -> Option<ContentStatus> {
    if actor.is_staff() {
        return None;
    }

    (content.status == ContentStatus::Rejected
        && content.status.can_transition_to(ContentStatus::Pending))
    .then_some(ContentStatus::Pending)
}

/// Group approved rows into albums keyed by (normalised title, year).
///
/// `rows` must be in display order; `photos` may be in any row order but
/// must be sorted by position within a row.
pub fn group_into_albums(rows: &[Content], photos: &[ContentPhoto], base_url: &str) -> Vec<Album> {
    let mut photos_by_row: HashMap<i64, Vec<&ContentPhoto>> = HashMap::new();
    for photo in photos {
        photos_by_row.entry(photo.content_id).or_default().push(photo);
    }

    let mut albums: Vec<Album> = Vec::new();
    let mut index: HashMap<(String, Option<i32>), usize> = HashMap::new();

    for row in rows {
        let title_key = album_key(&row.title);
        let slot = *index.entry((title_key.clone(), row.year)).or_insert_with(|| {
            let key = match row.year {
                Some(year) => format!("{year}:{title_key}"),
                None => format!("undated:{title_key}"),
            };
            albums.push(Album {
                key,
                title: row.title.trim().to_string(),
                year: row.year,
                kind: row.kind,
                content_ids: Vec::new(),
                cover_url: None,
                photos: Vec::new(),
            });
            albums.len() - 1
        });

        let album = &mut albums[slot];
        album.content_ids.push(row.id);
        if let Some(row_photos) = photos_by_row.get(&row.id) {
            album
                .photos
                .extend(row_photos.iter().map(|photo| PhotoView::from_photo(photo, base_url)));
        }
    }

    for album in &mut albums {
        album.cover_url = album.photos.first().map(|photo| photo.url.clone());
    }

    albums.sort_by(|a, b| {
        let by_year = match (a.year, b.year) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_year.then_with(|| album_key(&a.title).cmp(&album_key(&b.title)))
    });

    albums
}

fn new_slug(title: &str) -> String {
    let base = slugify(title);
    let base = if base.is_empty() { "content".to_string() } else { base };
    format!("{}-{}", base, generate_random_string(6))
}

/// Content service
#[derive(Clone)]
#[derive(Debug)]
pub struct ContentService {
    contents: ContentRepository,
    storage: StorageService,
    cache: CacheService,
    settings: Settings,
}

impl ContentService {
    pub fn new(contents: ContentRepository, storage: StorageService, cache: CacheService, settings: Settings) -> Self {
        Self {
            contents,
            storage,
            cache,
            settings,
        }
    }

    fn base_url(&self) -> &str {
        &self.settings.server.public_base_url
    }

    async fn find(&self, id: i64) -> Result<Content> {
        self.contents
            .find_by_id(id)
            .await?
            .ok_or_else(|| PortalError::ContentNotFound(id.to_string()))
    }

    async fn invalidate_albums(&self) {
        self.cache.invalidate_prefix(ALBUM_CACHE_PREFIX).await;
    }

    /// Attach photos to one row
    pub async fn view(&self, content: Content) -> Result<ContentView> {
        let photos = self.contents.photos_for(content.id).await?;
        let photos = photos
            .iter()
            .map(|photo| PhotoView::from_photo(photo, self.base_url()))
            .collect();

        Ok(ContentView { content, photos })
    }

    /// Attach photos to many rows with a single photo query
    pub async fn views(&self, contents: Vec<Content>) -> Result<Vec<ContentView>> {
        let ids: Vec<i64> = contents.iter().map(|c| c.id).collect();
        let mut by_row: HashMap<i64, Vec<PhotoView>> = HashMap::new();
        for photo in self.contents.photos_for_many(&ids).await? {
            by_row
                .entry(photo.content_id)
                .or_default()
                .push(PhotoView::from_photo(&photo, self.base_url()));
        }

        Ok(contents
            .into_iter()
            .map(|content| {
                let photos = by_row.remove(&content.id).unwrap_or_default();
                ContentView { content, photos }
            })
            .collect())
    }

    async fn page(&self, filter: &ContentFilter, page: Pagination) -> Result<Paginated<ContentView>> {
        let (items, total) = self.contents.list(filter, page).await?;
        let items = self.views(items).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Submit new content with optional photos
    pub async fn create(&self, actor: &Actor, draft: CreateContentRequest, files: Vec<UploadedFile>) -> Result<ContentView> {
        let kind = validate_draft(&draft)?;
        for file in &files {
            self.storage.validate_file(file)?;
        }

        let auto_approve = self.settings.features.auto_approve_staff_uploads && actor.is_staff();
        let status = if auto_approve {
            ContentStatus::Approved
        } else {
            ContentStatus::Pending
        };

        let content = self
            .contents
            .create(NewContent {
                owner_id: actor.id,
                kind,
                section: draft
                    .section
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|| DEFAULT_SECTION.to_string()),
                slug: new_slug(&draft.title),
                title: draft.title.trim().to_string(),
                description: draft.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
                year: draft.year,
                video_url: draft.video_url.map(|v| v.trim().to_string()),
                status,
                reviewed_by: auto_approve.then_some(actor.id),
            })
            .await?;

        if !files.is_empty() {
            if let Err(e) = self.store_photos(content.id, &files).await {
                warn!(content_id = content.id, error = %e, "Photo upload failed, discarding submission");
                self.contents.delete(content.id).await?;
                self.storage.remove_content(content.id).await;
                return Err(e);
            }
        }

        if status == ContentStatus::Approved {
            self.invalidate_albums().await;
        }

        log_content_action(content.id, "create", actor.id, Some(status.as_str()));
        self.view(content).await
    }

    async fn store_photos(&self, content_id: i64, files: &[UploadedFile]) -> Result<Vec<ContentPhoto>> {
        let saved = self.storage.save(content_id, files).await?;
        match self.contents.add_photos(content_id, &saved).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                for photo in &saved {
                    self.storage.remove_file(content_id, &photo.file_name).await;
                }
                Err(e)
            }
        }
    }

    /// Approved content, newest first
    pub async fn list_public(&self, mut filter: ContentFilter, page: Pagination) -> Result<Paginated<ContentView>> {
        filter.status = Some(ContentStatus::Approved);
        filter.owner_id = None;
        self.page(&filter, page).await
    }

    /// Approved content by slug
    pub async fn get_public_by_slug(&self, slug: &str) -> Result<ContentView> {
        match self.contents.find_by_slug(slug).await? {
            Some(content) if content.status == ContentStatus::Approved => self.view(content).await,
            _ => Err(PortalError::ContentNotFound(slug.to_string())),
        }
    }

    /// Approved content by id, optionally restricted to a kind
    pub async fn get_public(&self, id: i64, kind: Option<ContentKind>) -> Result<ContentView> {
        match self.contents.find_by_id(id).await? {
            Some(content)
                if content.status == ContentStatus::Approved
                    && kind.map_or(true, |k| k == content.kind) =>
            {
                self.view(content).await
            }
            _ => Err(PortalError::ContentNotFound(id.to_string())),
        }
    }

    /// The caller's own submissions in every status
    pub async fn list_for_owner(&self, actor: &Actor, page: Pagination) -> Result<Paginated<ContentView>> {
        let filter = ContentFilter {
            owner_id: Some(actor.id),
            ..ContentFilter::default()
        };
        self.page(&filter, page).await
    }

    /// Edit a row; an owner edit of rejected content re-enters moderation
    pub async fn update(&self, actor: &Actor, id: i64, patch: UpdateContentRequest) -> Result<ContentView> {
        let content = self.find(id).await?;
        ensure_can_edit(actor, &content)?;
        validate_patch(&content, &patch)?;

        let next_status = status_after_edit(actor, &content);
        let was_public = content.status == ContentStatus::Approved;

        let patch = UpdateContentRequest {
            section: patch.section.map(|s| s.trim().to_string()),
            title: patch.title.map(|t| t.trim().to_string()),
            description: patch.description.map(|d| d.trim().to_string()),
            year: patch.year,
            video_url: patch.video_url.map(|v| v.trim().to_string()),
        };

        let updated = self.contents.update(id, patch, content.status, next_status).await?;
        if was_public {
            self.invalidate_albums().await;
        }

        log_content_action(id, "update", actor.id, next_status.map(|s| s.as_str()));
        self.view(updated).await
    }

    /// Delete a row together with its files
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<()> {
        let content = self.find(id).await?;
        ensure_can_edit(actor, &content)?;

        self.contents.delete(id).await?;
        self.storage.remove_content(id).await;

        if content.status == ContentStatus::Approved {
            self.invalidate_albums().await;
        }

        log_content_action(id, "delete", actor.id, None);
        Ok(())
    }

    /// Append photos to an existing row
    pub async fn add_photos(&self, actor: &Actor, id: i64, files: Vec<UploadedFile>) -> Result<Vec<PhotoView>> {
        let content = self.find(id).await?;
        ensure_can_edit(actor, &content)?;

        if files.is_empty() {
            return Err(invalid("no photos in upload"));
        }

        let rows = self.store_photos(id, &files).await?;
        if content.status == ContentStatus::Approved {
            self.invalidate_albums().await;
        }

        log_content_action(id, "add_photos", actor.id, Some(&rows.len().to_string()));
        Ok(rows
            .iter()
            .map(|photo| PhotoView::from_photo(photo, self.base_url()))
            .collect())
    }

    /// Remove one photo and its file
    pub async fn remove_photo(&self, actor: &Actor, id: i64, photo_id: i64) -> Result<()> {
        let content = self.find(id).await?;
        ensure_can_edit(actor, &content)?;

        let photo = self
            .contents
            .find_photo(id, photo_id)
            .await?
            .ok_or(PortalError::PhotoNotFound { photo_id })?;

        self.contents.delete_photo(photo.id).await?;
        self.storage.remove_file(id, &photo.file_name).await;

        if content.status == ContentStatus::Approved {
            self.invalidate_albums().await;
        }

        log_content_action(id, "remove_photo", actor.id, Some(&photo_id.to_string()));
        Ok(())
    }

    async fn moderate(&self, reviewer: &Actor, id: i64, target: ContentStatus, reason: Option<String>) -> Result<ContentView> {
        if !reviewer.is_staff() {
            return Err(PortalError::PermissionDenied("moderation requires rep_admin".to_string()));
        }

        let content = self.find(id).await?;
        if !content.status.can_transition_to(target) {
            return Err(PortalError::InvalidStateTransition {
                from: content.status.to_string(),
                to: target.to_string(),
            });
        }

        let updated = self
            .contents
            .set_status(id, content.status, target, reviewer.id, reason)
            .await?;
        self.invalidate_albums().await;

        info!(content_id = id, reviewer_id = reviewer.id, from = %content.status, to = %target, "Content moderated");
        log_content_action(id, target.as_str(), reviewer.id, updated.rejection_reason.as_deref());
        self.view(updated).await
    }

    /// Publish a pending or rejected row
    pub async fn approve(&self, reviewer: &Actor, id: i64) -> Result<ContentView> {
        self.moderate(reviewer, id, ContentStatus::Approved, None).await
    }

    /// Reject a pending or approved row
    pub async fn reject(&self, reviewer: &Actor, id: i64, reason: Option<String>) -> Result<ContentView> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if let Some(reason) = &reason {
            if reason.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(invalid("rejection reason is too long"));
            }
        }
        self.moderate(reviewer, id, ContentStatus::Rejected, reason).await
    }

    /// Rows awaiting (or past) moderation; defaults to pending
    pub async fn moderation_queue(&self, mut filter: ContentFilter, page: Pagination) -> Result<Paginated<ContentView>> {
        filter.status = Some(filter.status.unwrap_or(ContentStatus::Pending));
        self.page(&filter, page).await
    }

    /// Approved rows of `kind` grouped into albums
    pub async fn albums(&self, kind: ContentKind, year: Option<i32>) -> Result<Vec<Album>> {
        let cache_key = format!(
            "{ALBUM_CACHE_PREFIX}{}:{}",
            kind,
            year.map_or_else(|| "all".to_string(), |y| y.to_string())
        );

        if let Some(albums) = self.cache.get::<Vec<Album>>(&cache_key).await {
            return Ok(albums);
        }

        let rows = self.contents.list_approved(kind, year).await?;
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let photos = self.contents.photos_for_many(&ids).await?;
        let albums = group_into_albums(&rows, &photos, self.base_url());

        debug!(kind = %kind, rows = rows.len(), albums = albums.len(), "Albums built");
        self.cache.set(&cache_key, &albums).await;
        Ok(albums)
    }
}
