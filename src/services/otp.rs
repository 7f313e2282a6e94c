//! One-time password generation and checking
//!
//! Codes are decimal strings that keep their leading zeroes. Only an argon2
//! hash of the code is stored, next to its purpose, expiry and attempt count.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use crate::config::OtpConfig;
use crate::models::user::{OtpPurpose, User};
use crate::services::auth::{hash_secret, verify_secret};
use crate::utils::errors::{PortalError, Result};

/// A code that has been generated but not stored yet
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub sent_at: DateTime<Utc>,
}

/// Snapshot of the OTP columns of a user row
#[derive(Debug, Clone)]
pub struct PendingOtp {
    pub hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
}

impl PendingOtp {
    pub fn from_user(user: &User) -> Option<Self> {
        Some(Self {
            hash: user.otp_hash.clone()?,
            purpose: user.otp_purpose()?,
            expires_at: user.otp_expires_at?,
            attempts: user.otp_attempts,
        })
    }
}

/// Result of comparing a submitted code with the pending one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Accepted,
    NoPendingCode,
    Expired,
    TooManyAttempts,
    Invalid,
}

impl OtpCheck {
    /// Whether the stored code must be dropped after this outcome
    pub fn clears_code(&self) -> bool {
        matches!(self, OtpCheck::Accepted | OtpCheck::Expired | OtpCheck::TooManyAttempts)
    }

    /// Client-facing error for a rejected code
    pub fn into_error(self) -> Option<PortalError> {
        let message = match self {
            OtpCheck::Accepted => return None,
            OtpCheck::NoPendingCode => "no pending verification code",
            OtpCheck::Expired => "verification code has expired",
            OtpCheck::TooManyAttempts => "too many attempts, request a new code",
            OtpCheck::Invalid => "invalid verification code",
        };
        Some(PortalError::InvalidInput(message.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct OtpService {
    config: OtpConfig,
}

impl OtpService {
    pub fn new(config: OtpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Random zero-padded decimal code of the configured length
    pub fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.config.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// Generate and hash a new code for `purpose`
    pub fn issue(&self, purpose: OtpPurpose, now: DateTime<Utc>) -> Result<IssuedOtp> {
        let code = self.generate_code();
        let hash = hash_secret(&code)?;

        Ok(IssuedOtp {
            code,
            hash,
            purpose,
            expires_at: now + Duration::minutes(self.config.ttl_minutes),
            sent_at: now,
        })
    }

    /// Compare `code` with the pending OTP at time `now`
    pub fn check(&self, pending: Option<&PendingOtp>, purpose: OtpPurpose, code: &str, now: DateTime<Utc>) -> OtpCheck {
        let pending = match pending {
            Some(pending) if pending.purpose == purpose => pending,
            _ => return OtpCheck::NoPendingCode,
        };

        if now > pending.expires_at {
            return OtpCheck::Expired;
        }

        if pending.attempts >= self.config.max_attempts {
            return OtpCheck::TooManyAttempts;
        }

        if verify_secret(code.trim(), &pending.hash) {
            OtpCheck::Accepted
        } else {
            OtpCheck::Invalid
        }
    }

    /// Seconds left before another code may be sent, if any
    pub fn cooldown_remaining(&self, last_sent: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
        let last_sent = last_sent?;
        let ready_at = last_sent + Duration::seconds(self.config.resend_cooldown_seconds);
        let remaining = (ready_at - now).num_seconds();
        (remaining > 0).then_some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OtpService {
        OtpService::new(OtpConfig {
            length: 6,
            ttl_minutes: 10,
            max_attempts: 3,
            resend_cooldown_seconds: 60,
        })
    }

    fn pending(issued: &IssuedOtp, attempts: i32) -> PendingOtp {
        PendingOtp {
            hash: issued.hash.clone(),
            purpose: issued.purpose,
            expires_at: issued.expires_at,
            attempts,
        }
    }

    #[test]
    fn test_generated_code_shape() {
        let service = service();
        for _ in 0..50 {
            let code = service.generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_correct_code_is_accepted() {
        let service = service();
        let now = Utc::now();
        let issued = service.issue(OtpPurpose::VerifyEmail, now).unwrap();
        let pending = pending(&issued, 0);

        let outcome = service.check(Some(&pending), OtpPurpose::VerifyEmail, &issued.code, now);
        assert_eq!(outcome, OtpCheck::Accepted);
        assert!(outcome.clears_code());
    }

    #[test]
    fn test_code_expires_after_window() {
        let service = service();
        let now = Utc::now();
        let issued = service.issue(OtpPurpose::VerifyEmail, now).unwrap();
        let pending = pending(&issued, 0);

        let just_inside = now + Duration::minutes(10);
        assert_eq!(
            service.check(Some(&pending), OtpPurpose::VerifyEmail, &issued.code, just_inside),
            OtpCheck::Accepted
        );

        let after = now + Duration::minutes(10) + Duration::seconds(1);
        let outcome = service.check(Some(&pending), OtpPurpose::VerifyEmail, &issued.code, after);
        assert_eq!(outcome, OtpCheck::Expired);
        assert!(outcome.clears_code());
    }

    #[test]
    fn test_wrong_code_and_lockout() {
        let service = service();
        let now = Utc::now();
        let issued = service.issue(OtpPurpose::ResetPassword, now).unwrap();
        let wrong = if issued.code == "000000" { "111111" } else { "000000" };

        let outcome = service.check(Some(&pending(&issued, 0)), OtpPurpose::ResetPassword, wrong, now);
        assert_eq!(outcome, OtpCheck::Invalid);
        assert!(!outcome.clears_code());

        // Even the right code is refused once attempts are used up
        let outcome = service.check(Some(&pending(&issued, 3)), OtpPurpose::ResetPassword, &issued.code, now);
        assert_eq!(outcome, OtpCheck::TooManyAttempts);
    }

    #[test]
    fn test_purpose_must_match() {
        let service = service();
        let now = Utc::now();
        let issued = service.issue(OtpPurpose::ResetPassword, now).unwrap();

        assert_eq!(
            service.check(Some(&pending(&issued, 0)), OtpPurpose::VerifyEmail, &issued.code, now),
            OtpCheck::NoPendingCode
        );
        assert_eq!(
            service.check(None, OtpPurpose::VerifyEmail, &issued.code, now),
            OtpCheck::NoPendingCode
        );
    }

    #[test]
    fn test_resend_cooldown() {
        let service = service();
        let now = Utc::now();

        assert_eq!(service.cooldown_remaining(None, now), None);
        assert_eq!(service.cooldown_remaining(Some(now - Duration::seconds(61)), now), None);
        assert_eq!(service.cooldown_remaining(Some(now - Duration::seconds(20)), now), Some(40));
    }

    #[test]
    fn test_rejections_map_to_errors() {
        assert!(OtpCheck::Accepted.into_error().is_none());
        let err = OtpCheck::Expired.into_error().unwrap();
        assert_eq!(err.to_string(), "Invalid input: verification code has expired");
    }
}
