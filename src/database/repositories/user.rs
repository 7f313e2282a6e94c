//! User repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::user::{User, Role, OtpPurpose, CreateUserRequest, UpdateUserRequest};
use crate::utils::errors::PortalError;
use crate::utils::helpers::{normalize_email, Pagination};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, batch_year, phone, is_verified, \
    otp_hash, otp_purpose, otp_expires_at, otp_attempts, otp_sent_at, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user; a taken email becomes `Conflict`
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, PortalError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, batch_year, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        );

        let result = sqlx::query_as::<_, User>(&sql)
            .bind(request.name)
            .bind(&request.email)
            .bind(request.password_hash)
            .bind(request.role.as_str())
            .bind(request.batch_year)
            .bind(request.phone)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                PortalError::Conflict(format!("email {} is already registered", request.email)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, PortalError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by (already normalised) email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, PortalError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update profile fields
    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> Result<User, PortalError> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                batch_year = COALESCE($3, batch_year),
                phone = COALESCE($4, phone),
                updated_at = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(request.name)
            .bind(request.batch_year)
            .bind(request.phone)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PortalError::UserNotFound { user_id: id })
    }

    /// Change a user's role
    pub async fn set_role(&self, id: i64, role: Role) -> Result<User, PortalError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role.as_str())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PortalError::UserNotFound { user_id: id })
    }

    /// Promote every listed, existing account to super admin
    pub async fn promote_super_admins(&self, emails: &[String]) -> Result<u64, PortalError> {
        if emails.is_empty() {
            return Ok(0);
        }

        let emails: Vec<String> = emails.iter().map(|email| normalize_email(email)).collect();

        let result = sqlx::query(
            "UPDATE users SET role = 'super_admin', updated_at = $2 WHERE email = ANY($1) AND role <> 'super_admin'"
        )
        .bind(&emails)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Replace the password hash
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), PortalError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark the email address as verified
    pub async fn mark_verified(&self, id: i64) -> Result<User, PortalError> {
        let sql = format!(
            "UPDATE users SET is_verified = TRUE, updated_at = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PortalError::UserNotFound { user_id: id })
    }

    /// Store a freshly issued OTP, resetting the attempt counter
    pub async fn store_otp(
        &self,
        id: i64,
        otp_hash: &str,
        purpose: OtpPurpose,
        expires_at: DateTime<Utc>,
        sent_at: DateTime<Utc>,
    ) -> Result<(), PortalError> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp_hash = $2, otp_purpose = $3, otp_expires_at = $4,
                otp_attempts = 0, otp_sent_at = $5, updated_at = $5
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(otp_hash)
        .bind(purpose.as_str())
        .bind(expires_at)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Claim one verification attempt on the pending `purpose` code.
    ///
    /// Returns the new attempt count, or `None` when `max_attempts` are used
    /// up or no such code is pending. The check and the increment are one
    /// statement, so concurrent guesses cannot share an attempt.
    pub async fn reserve_otp_attempt(
        &self,
        id: i64,
        purpose: OtpPurpose,
        max_attempts: i32,
    ) -> Result<Option<i32>, PortalError> {
        let attempts: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE users SET otp_attempts = otp_attempts + 1
            WHERE id = $1 AND otp_purpose = $2 AND otp_attempts < $3
            RETURNING otp_attempts
            "#
        )
        .bind(id)
        .bind(purpose.as_str())
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempts.map(|(count,)| count))
    }

    /// Remove the pending OTP if it is still `otp_hash`. Returns false when
    /// another request already consumed or replaced it.
    pub async fn take_otp(&self, id: i64, otp_hash: &str) -> Result<bool, PortalError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET otp_hash = NULL, otp_purpose = NULL, otp_expires_at = NULL, otp_attempts = 0
            WHERE id = $1 AND otp_hash = $2
            "#
        )
        .bind(id)
        .bind(otp_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Drop any pending OTP (the send time is kept for the resend cooldown)
    pub async fn clear_otp(&self, id: i64) -> Result<(), PortalError> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp_hash = NULL, otp_purpose = NULL, otp_expires_at = NULL, otp_attempts = 0
            WHERE id = $1
            "#
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete user
    pub async fn delete(&self, id: i64) -> Result<(), PortalError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::UserNotFound { user_id: id });
        }

        Ok(())
    }

    /// List users with pagination, optionally restricted to one role
    pub async fn list(&self, role: Option<Role>, page: Pagination) -> Result<(Vec<User>, i64), PortalError> {
        let role = role.map(|r| r.as_str());
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE ($1::TEXT IS NULL OR role = $1) ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR role = $1)")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total.0))
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, PortalError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Number of users per role
    pub async fn count_by_role(&self) -> Result<Vec<(String, i64)>, PortalError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
