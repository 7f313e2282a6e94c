//! Test data helpers
//!
//! Builders for settings, accounts and request bodies used across tests.

use std::path::Path;
use chrono::Utc;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::{json, Value};
use alumni_portal::config::Settings;
use alumni_portal::models::user::{Role, User};

pub fn fake_name() -> String {
    Name().fake()
}

/// A random email that will not collide between tests
pub fn unique_email() -> String {
    let email: String = SafeEmail().fake();
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    format!("{suffix}.{}", email.to_lowercase())
}

/// Settings for tests: uploads under `upload_dir`, Redis off, mail to the log
pub fn test_settings(upload_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.uploads.dir = upload_dir.to_string_lossy().into_owned();
    settings.redis.enabled = false;
    settings.rate_limit.max_requests = 1_000;
    settings.rate_limit.burst_allowance = 0;
    settings.auth.jwt_secret = "integration-test-secret-0123456789abcdef".to_string();
    settings.auth.super_admin_emails = vec!["founder@alumni.test".to_string()];
    settings.server.public_base_url = "http://portal.test".to_string();
    settings
}

/// An account as the token service sees it
pub fn user_fixture(id: i64, role: Role) -> User {
    User {
        id,
        name: format!("Member {id}"),
        email: format!("member{id}@alumni.test"),
        password_hash: String::new(),
        role,
        batch_year: Some(2008),
        phone: None,
        is_verified: true,
        otp_hash: None,
        otp_purpose: None,
        otp_expires_at: None,
        otp_attempts: 0,
        otp_sent_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn registration_body(email: &str, password: &str) -> Value {
    json!({
        "name": fake_name(),
        "email": email,
        "password": password,
        "batch_year": 2012,
    })
}

/// A minimal multipart body; `files` are (content type, bytes) pairs sent as `photos`
pub fn multipart_body(boundary: &str, fields: &[(&str, &str)], files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }

    for (index, (content_type, data)) in files.iter().enumerate() {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"photos\"; filename=\"photo{index}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// The first run of ASCII digits of `length` in `text`
pub fn extract_code(text: &str, length: usize) -> Option<String> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == length)
        .map(str::to_string)
}
