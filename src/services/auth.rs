//! Authentication service implementation
//!
//! Registration, email verification by one-time code, password login with
//! signed JWT bearer tokens, and password reset.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use std::sync::OnceLock;
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, error, debug};
use crate::config::Settings;
use crate::database::repositories::UserRepository;
use crate::middleware::rate_limit::RateLimiter;
use crate::models::user::{CreateUserRequest, OtpPurpose, Role, User, UserProfile};
use crate::services::mailer::Mailer;
use crate::services::otp::{OtpCheck, OtpService, PendingOtp};
use crate::utils::errors::{PortalError, Result};
use crate::utils::helpers::{is_valid_email, is_valid_phone, is_valid_year, normalize_email};
use crate::utils::logging::log_auth_event;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 100;
const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Hash a password or one-time code with argon2id
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortalError::Internal(format!("failed to hash secret: {e}")))
}

/// Check a secret against a stored PHC hash string
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored hash is not a valid PHC string");
            false
        }
    }
}

/// A real argon2 hash of a random secret, built once, for password checks
/// against accounts that do not exist
fn dummy_password_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| {
        let secret = uuid::Uuid::new_v4().to_string();
        hash_secret(&secret).unwrap_or_default()
    })
}

/// JWT claims carried by every bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Sign a token for `user`
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub batch_year: Option<i32>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PortalError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Check and trim the registration fields that do not need the database
pub fn validate_registration(request: &RegisterRequest) -> Result<(String, String)> {
    let name = request.name.trim().to_string();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(PortalError::InvalidInput(format!(
            "name must be between 1 and {MAX_NAME_LENGTH} characters"
        )));
    }

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(PortalError::InvalidInput("invalid email address".to_string()));
    }

    validate_password(&request.password)?;

    if let Some(year) = request.batch_year {
        if !is_valid_year(year) {
            return Err(PortalError::InvalidInput(format!("invalid batch year {year}")));
        }
    }

    if let Some(phone) = &request.phone {
        if !is_valid_phone(phone) {
            return Err(PortalError::InvalidInput("invalid phone number".to_string()));
        }
    }

    Ok((name, email))
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    otp: OtpService,
    mailer: Mailer,
    tokens: TokenService,
    limiter: RateLimiter,
    settings: Settings,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        mailer: Mailer,
        limiter: RateLimiter,
        settings: Settings,
    ) -> Self {
        Self {
            otp: OtpService::new(settings.auth.otp.clone()),
            tokens: TokenService::new(&settings.auth.jwt_secret, settings.auth.token_ttl_hours),
            users,
            mailer,
            limiter,
            settings,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Whether `email` is configured to become a super admin
    pub fn is_super_admin_email(&self, email: &str) -> bool {
        self.settings
            .auth
            .super_admin_emails
            .iter()
            .any(|configured| normalize_email(configured) == email)
    }

    /// Create an unverified account and mail it a verification code
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile> {
        if !self.settings.features.registration_open {
            return Err(PortalError::PermissionDenied("registration is closed".to_string()));
        }

        let (name, email) = validate_registration(&request)?;
        self.limiter.check(&format!("register:{email}"))?;

        if self.users.find_by_email(&email).await?.is_some() {
            log_auth_event(&email, "register", false, Some("email already registered"));
            return Err(PortalError::Conflict(format!("email {email} is already registered")));
        }

        let role = if self.is_super_admin_email(&email) {
            Role::SuperAdmin
        } else {
            Role::User
        };

        let user = self
            .users
            .create(CreateUserRequest {
                name,
                email: email.clone(),
                password_hash: hash_secret(&request.password)?,
                role,
                batch_year: request.batch_year,
                phone: request.phone.map(|p| p.trim().to_string()),
            })
            .await?;

        // The account exists either way; the user can ask for another code
        if let Err(e) = self.issue_otp(&user, OtpPurpose::VerifyEmail).await {
            error!(user_id = user.id, error = %e, "Failed to send verification code");
        }

        log_auth_event(&email, "register", true, Some(role.as_str()));
        Ok(UserProfile::from(user))
    }

    /// Confirm an email address with the code sent at registration
    pub async fn verify_email(&self, request: VerifyOtpRequest) -> Result<UserProfile> {
        let email = normalize_email(&request.email);
        self.limiter.check(&format!("verify:{email}"))?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| PortalError::InvalidInput("no pending verification code".to_string()))?;

        if user.is_verified {
            return Err(PortalError::Conflict("email is already verified".to_string()));
        }

        self.consume_otp(&user, OtpPurpose::VerifyEmail, &request.code).await?;
        let user = self.users.mark_verified(user.id).await?;

        log_auth_event(&email, "verify_email", true, None);
        Ok(UserProfile::from(user))
    }

    /// Send a fresh code for whatever the account is waiting on
    pub async fn resend_otp(&self, request: EmailRequest) -> Result<()> {
        let email = normalize_email(&request.email);
        self.limiter.check(&format!("resend:{email}"))?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!(email = %email, "Resend requested for unknown email");
            return Ok(());
        };

        let purpose = if !user.is_verified {
            OtpPurpose::VerifyEmail
        } else if user.otp_purpose() == Some(OtpPurpose::ResetPassword) {
            OtpPurpose::ResetPassword
        } else {
            return Ok(());
        };

        if let Some(remaining) = self.otp.cooldown_remaining(user.otp_sent_at, Utc::now()) {
            debug!(email = %email, remaining = remaining, "Resend inside cooldown");
            return Err(PortalError::RateLimitExceeded);
        }

        self.issue_otp(&user, purpose).await
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let email = normalize_email(&request.email);
        let limit_key = format!("login:{email}");
        self.limiter.check(&limit_key)?;

        // Unknown addresses are checked against a throwaway hash so both
        // paths cost one argon2 verification
        let user = self.users.find_by_email(&email).await?;
        let stored_hash = match &user {
            Some(user) => user.password_hash.as_str(),
            None => dummy_password_hash(),
        };
        let password_matches = verify_secret(&request.password, stored_hash);

        let user = match user {
            Some(user) if password_matches => user,
            _ => {
                log_auth_event(&email, "login", false, Some(INVALID_CREDENTIALS));
                return Err(PortalError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !user.is_verified {
            log_auth_event(&email, "login", false, Some("email not verified"));
            return Err(PortalError::PermissionDenied("email not verified".to_string()));
        }

        self.limiter.reset(&limit_key);
        let token = self.tokens.issue(&user)?;
        log_auth_event(&email, "login", true, None);

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_seconds(),
            user: UserProfile::from(user),
        })
    }

    /// Mail a reset code. Unknown emails get the same empty success.
    pub async fn forgot_password(&self, request: EmailRequest) -> Result<()> {
        let email = normalize_email(&request.email);
        self.limiter.check(&format!("forgot:{email}"))?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!(email = %email, "Password reset requested for unknown email");
            return Ok(());
        };

        if self.otp.cooldown_remaining(user.otp_sent_at, Utc::now()).is_some() {
            debug!(email = %email, "Password reset requested inside cooldown");
            return Ok(());
        }

        self.issue_otp(&user, OtpPurpose::ResetPassword).await?;
        log_auth_event(&email, "forgot_password", true, None);
        Ok(())
    }

    /// Set a new password using a reset code
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<()> {
        validate_password(&request.new_password)?;

        let email = normalize_email(&request.email);
        self.limiter.check(&format!("reset:{email}"))?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| PortalError::InvalidInput("no pending verification code".to_string()))?;

        self.consume_otp(&user, OtpPurpose::ResetPassword, &request.code).await?;
        self.users.set_password(user.id, &hash_secret(&request.new_password)?).await?;

        // Receiving the code proves the address
        if !user.is_verified {
            self.users.mark_verified(user.id).await?;
        }

        log_auth_event(&email, "reset_password", true, None);
        Ok(())
    }

    /// Profile of the token holder
    pub async fn me(&self, user_id: i64) -> Result<UserProfile> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(PortalError::UserNotFound { user_id })?;

        Ok(UserProfile::from(user))
    }

    /// Verify a bearer token
    pub fn authenticate(&self, token: &str) -> Result<Claims> {
        self.tokens.verify(token)
    }

    /// The stored account behind verified claims. Deleted accounts fail
    /// authentication even while their token is unexpired.
    pub async fn account_for(&self, claims: &Claims) -> Result<User> {
        match self.users.find_by_id(claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                debug!(user_id = claims.sub, "Token for a deleted account");
                Err(PortalError::Authentication("account no longer exists".to_string()))
            }
        }
    }

    async fn issue_otp(&self, user: &User, purpose: OtpPurpose) -> Result<()> {
        let issued = self.otp.issue(purpose, Utc::now())?;
        self.users
            .store_otp(user.id, &issued.hash, purpose, issued.expires_at, issued.sent_at)
            .await?;

        let message = self.mailer.otp_message(
            &user.email,
            &user.name,
            purpose,
            &issued.code,
            self.otp.config().ttl_minutes,
        );
        self.mailer.send(&message).await?;

        info!(user_id = user.id, purpose = %purpose, "One-time code issued");
        Ok(())
    }

    async fn consume_otp(&self, user: &User, purpose: OtpPurpose, code: &str) -> Result<()> {
        let pending = PendingOtp::from_user(user);
        let mut outcome = self.otp.check(pending.as_ref(), purpose, code, Utc::now());

        // `user` may be stale. A verdict on the code only counts once it has
        // claimed one of the remaining attempts in the database.
        if matches!(outcome, OtpCheck::Accepted | OtpCheck::Invalid) {
            let max_attempts = self.otp.config().max_attempts;
            match self.users.reserve_otp_attempt(user.id, purpose, max_attempts).await? {
                None => outcome = OtpCheck::TooManyAttempts,
                Some(attempts) if outcome == OtpCheck::Invalid => {
                    warn!(user_id = user.id, attempts = attempts, "Invalid one-time code");
                }
                Some(_) => {}
            }
        }

        if outcome == OtpCheck::Accepted {
            // Single use: only the request that removes this exact code wins
            let hash = pending.as_ref().map(|p| p.hash.as_str()).unwrap_or_default();
            if !self.users.take_otp(user.id, hash).await? {
                outcome = OtpCheck::NoPendingCode;
            }
        } else if outcome.clears_code() {
            self.users.clear_otp(user.id).await?;
        }

        match outcome.into_error() {
            Some(err) => {
                log_auth_event(&user.email, purpose.as_str(), false, Some(&err.to_string()));
                Err(err)
            }
            None => Ok(()),
        }
    }
}
