//! User model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

text_enum! {
    /// Account role, ordered super_admin > admin > rep_admin > user
    Role {
        SuperAdmin => "super_admin",
        Admin => "admin",
        /// Batch / chapter representative with moderation rights
        RepAdmin => "rep_admin",
        User => "user",
    }
}

impl Role {
    /// Position in the hierarchy; higher outranks lower
    pub fn rank(&self) -> u8 {
        match self {
            Role::User => 0,
            Role::RepAdmin => 1,
            Role::Admin => 2,
            Role::SuperAdmin => 3,
        }
    }

    /// Whether this role satisfies a route that requires `required`
    pub fn includes(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Whether this role may change or delete an account holding `target`
    pub fn can_manage(&self, target: Role) -> bool {
        self.includes(Role::Admin) && self.rank() > target.rank()
    }

    /// Whether this role may hand out `role` to someone else
    pub fn can_grant(&self, role: Role) -> bool {
        match self {
            Role::SuperAdmin => true,
            Role::Admin => role.rank() < self.rank(),
            _ => false,
        }
    }
}

text_enum! {
    /// What a pending one-time password was issued for
    OtpPurpose {
        VerifyEmail => "verify_email",
        ResetPassword => "reset_password",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub batch_year: Option<i32>,
    pub phone: Option<String>,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub otp_hash: Option<String>,
    #[serde(skip_serializing)]
    pub otp_purpose: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_attempts: i32,
    #[serde(skip_serializing)]
    pub otp_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Purpose of the pending OTP, if any and if it parses
    pub fn otp_purpose(&self) -> Option<OtpPurpose> {
        self.otp_purpose.as_deref().and_then(|p| p.parse().ok())
    }
}

/// Public view of an account, safe to return from the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub batch_year: Option<i32>,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            batch_year: user.batch_year,
            phone: user.phone.clone(),
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile::from(&user)
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub batch_year: Option<i32>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub batch_year: Option<i32>,
    pub phone: Option<String>,
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    /// Rep admins and above moderate and edit any content
    pub fn is_staff(&self) -> bool {
        self.role.includes(Role::RepAdmin)
    }
}
