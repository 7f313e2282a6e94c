//! Content repository implementation: events, reunions, videos and their photos

use sqlx::{PgPool, Postgres, QueryBuilder};
use chrono::Utc;
use crate::models::content::{
    Content, ContentPhoto, ContentKind, ContentStatus, ContentFilter, UpdateContentRequest, NewPhoto,
};
use crate::utils::errors::PortalError;
use crate::utils::helpers::Pagination;

const CONTENT_COLUMNS: &str = "id, owner_id, kind, section, slug, title, description, year, video_url, \
    status, rejection_reason, reviewed_by, reviewed_at, created_at, updated_at";

const PHOTO_COLUMNS: &str = "id, content_id, file_name, original_name, mime_type, size_bytes, position, created_at";

/// Row values for a new content record
#[derive(Debug, Clone)]
pub struct NewContent {
    pub owner_id: i64,
    pub kind: ContentKind,
    pub section: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub video_url: Option<String>,
    pub status: ContentStatus,
    pub reviewed_by: Option<i64>,
}

#[derive(Clone)]
#[derive(Debug)]
pub struct ContentRepository {
    pool: PgPool,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ContentFilter) {
    builder.push(" WHERE TRUE");

    if let Some(kind) = filter.kind {
        builder.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }
    if let Some(section) = &filter.section {
        builder.push(" AND section = ").push_bind(section.clone());
    }
    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id);
    }
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new content row; a duplicate slug becomes `Conflict`
    pub async fn create(&self, new: NewContent) -> Result<Content, PortalError> {
        let reviewed_at = new.reviewed_by.map(|_| Utc::now());
        let sql = format!(
            r#"
            INSERT INTO contents (owner_id, kind, section, slug, title, description, year, video_url,
                                  status, reviewed_by, reviewed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {CONTENT_COLUMNS}
            "#
        );

        let result = sqlx::query_as::<_, Content>(&sql)
            .bind(new.owner_id)
            .bind(new.kind.as_str())
            .bind(new.section)
            .bind(&new.slug)
            .bind(new.title)
            .bind(new.description)
            .bind(new.year)
            .bind(new.video_url)
            .bind(new.status.as_str())
            .bind(new.reviewed_by)
            .bind(reviewed_at)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(content) => Ok(content),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(PortalError::Conflict(format!("slug {} is already taken", new.slug)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find content by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Content>, PortalError> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM contents WHERE id = $1");
        let content = sqlx::query_as::<_, Content>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(content)
    }

    /// Find content by slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Content>, PortalError> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM contents WHERE slug = $1");
        let content = sqlx::query_as::<_, Content>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(content)
    }

    /// List content matching a filter, newest year first, with the total count
    pub async fn list(&self, filter: &ContentFilter, page: Pagination) -> Result<(Vec<Content>, i64), PortalError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {CONTENT_COLUMNS} FROM contents"));
        push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY year DESC NULLS LAST, created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = builder
            .build_query_as::<Content>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM contents");
        push_filters(&mut count, filter);
        let total: (i64,) = count
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total.0))
    }

    /// Every approved row of a kind, oldest first, for album grouping
    pub async fn list_approved(&self, kind: ContentKind, year: Option<i32>) -> Result<Vec<Content>, PortalError> {
        let sql = format!(
            r#"
            SELECT {CONTENT_COLUMNS} FROM contents
            WHERE status = 'approved' AND kind = $1 AND ($2::INTEGER IS NULL OR year = $2)
            ORDER BY created_at ASC, id ASC
            "#
        );

        let items = sqlx::query_as::<_, Content>(&sql)
            .bind(kind.as_str())
            .bind(year)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Update editable fields; `status` is only written when given. The
    /// update only applies while the row still has `expected` status, so an
    /// edit cannot undo a moderation decision made in the meantime.
    pub async fn update(
        &self,
        id: i64,
        request: UpdateContentRequest,
        expected: ContentStatus,
        status: Option<ContentStatus>,
    ) -> Result<Content, PortalError> {
        let sql = format!(
            r#"
            UPDATE contents
            SET section = COALESCE($2, section),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                year = COALESCE($5, year),
                video_url = COALESCE($6, video_url),
                status = COALESCE($7, status),
                rejection_reason = CASE WHEN $7::TEXT IS NULL THEN rejection_reason ELSE NULL END,
                updated_at = $8
            WHERE id = $1 AND status = $9
            RETURNING {CONTENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Content>(&sql)
            .bind(id)
            .bind(request.section)
            .bind(request.title)
            .bind(request.description)
            .bind(request.year)
            .bind(request.video_url)
            .bind(status.map(|s| s.as_str()))
            .bind(Utc::now())
            .bind(expected.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PortalError::InvalidStateTransition {
                from: expected.to_string(),
                to: status.unwrap_or(expected).to_string(),
            })
    }

    /// Record a moderation decision. The update only applies while the row
    /// still has `expected` status, so concurrent reviews cannot both win.
    pub async fn set_status(
        &self,
        id: i64,
        expected: ContentStatus,
        status: ContentStatus,
        reviewer_id: i64,
        reason: Option<String>,
    ) -> Result<Content, PortalError> {
        let sql = format!(
            r#"
            UPDATE contents
            SET status = $3, reviewed_by = $4, reviewed_at = $5, rejection_reason = $6, updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING {CONTENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Content>(&sql)
            .bind(id)
            .bind(expected.as_str())
            .bind(status.as_str())
            .bind(reviewer_id)
            .bind(Utc::now())
            .bind(reason)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PortalError::InvalidStateTransition {
                from: expected.to_string(),
                to: status.to_string(),
            })
    }

    /// Delete content (photos cascade)
    pub async fn delete(&self, id: i64) -> Result<(), PortalError> {
        let result = sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::ContentNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Ids of every row owned by a user
    pub async fn ids_for_owner(&self, owner_id: i64) -> Result<Vec<i64>, PortalError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM contents WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Number of rows per moderation status
    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>, PortalError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM contents GROUP BY status ORDER BY status"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Append photos after the current last position
    pub async fn add_photos(&self, content_id: i64, photos: &[NewPhoto]) -> Result<Vec<ContentPhoto>, PortalError> {
        let mut tx = self.pool.begin().await?;

        let next: (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM content_photos WHERE content_id = $1"
        )
        .bind(content_id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = format!(
            r#"
            INSERT INTO content_photos (content_id, file_name, original_name, mime_type, size_bytes, position, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PHOTO_COLUMNS}
            "#
        );

        let mut stored = Vec::with_capacity(photos.len());
        for (offset, photo) in photos.iter().enumerate() {
            let row = sqlx::query_as::<_, ContentPhoto>(&sql)
                .bind(content_id)
                .bind(&photo.file_name)
                .bind(&photo.original_name)
                .bind(&photo.mime_type)
                .bind(photo.size_bytes)
                .bind(next.0 + offset as i32)
                .bind(Utc::now())
                .fetch_one(&mut *tx)
                .await?;
            stored.push(row);
        }

        tx.commit().await?;
        Ok(stored)
    }

    /// Photos of one content row in display order
    pub async fn photos_for(&self, content_id: i64) -> Result<Vec<ContentPhoto>, PortalError> {
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM content_photos WHERE content_id = $1 ORDER BY position ASC, id ASC"
        );

        let photos = sqlx::query_as::<_, ContentPhoto>(&sql)
            .bind(content_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(photos)
    }

    /// Photos of several content rows in one query
    pub async fn photos_for_many(&self, content_ids: &[i64]) -> Result<Vec<ContentPhoto>, PortalError> {
        if content_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM content_photos WHERE content_id = ANY($1) ORDER BY content_id, position ASC, id ASC"
        );

        let photos = sqlx::query_as::<_, ContentPhoto>(&sql)
            .bind(content_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(photos)
    }

    /// Find a photo belonging to a content row
    pub async fn find_photo(&self, content_id: i64, photo_id: i64) -> Result<Option<ContentPhoto>, PortalError> {
        let sql = format!("SELECT {PHOTO_COLUMNS} FROM content_photos WHERE id = $1 AND content_id = $2");
        let photo = sqlx::query_as::<_, ContentPhoto>(&sql)
            .bind(photo_id)
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(photo)
    }

    /// Delete a photo row
    pub async fn delete_photo(&self, photo_id: i64) -> Result<(), PortalError> {
        sqlx::query("DELETE FROM content_photos WHERE id = $1")
            .bind(photo_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
