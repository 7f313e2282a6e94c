//! End-to-end flows against PostgreSQL
//!
//! Run with Docker available (or TEST_DATABASE_URL set):
//! `cargo test --test integration_test -- --ignored`

mod helpers;

use axum::http::StatusCode;
use futures::future::join_all;
use helpers::*;
use serde_json::{json, Value};
use serial_test::serial;
use tokio_test::assert_ok;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};
use alumni_portal::config::MailTransport;
use alumni_portal::database::{ContentRepository, UserRepository};
use alumni_portal::models::content::{ContentStatus, UpdateContentRequest};
use alumni_portal::models::user::Role;
use alumni_portal::PortalError;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image data";
const BOUNDARY: &str = "portal-integration-boundary";

/// Mail API mock that accepts everything
async fn mail_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

async fn context_with_mail(server: &MockServer) -> TestContext {
    context_with_mail_and(server, |_| {}).await
}

async fn context_with_mail_and(
    server: &MockServer,
    configure: impl FnOnce(&mut alumni_portal::Settings),
) -> TestContext {
    let url = format!("{}/send", server.uri());
    TestContext::with_database(move |s| {
        s.mail.transport = MailTransport::Http;
        s.mail.api_url = Some(url);
        configure(s);
    })
    .await
}

/// Register `email` and return the code mailed to it
async fn register_and_read_code(ctx: &TestContext, mail: &MockServer, email: &str) -> String {
    let response = ctx
        .post_json("/api/auth/register", None, &registration_body(email, "a long enough password"))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    last_code_for(mail, email).await
}

fn wrong_code(code: &str) -> &'static str {
    if code == "000000" { "111111" } else { "000000" }
}

/// Code from the most recent mail sent to `email`
async fn last_code_for(server: &MockServer, email: &str) -> String {
    let requests = server.received_requests().await.expect("recorded requests");
    requests
        .iter()
        .rev()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .find(|body| body["to"] == email)
        .and_then(|body| body["text"].as_str().and_then(|text| extract_code(text, 6)))
        .expect("mail with a code")
}

async fn create_content(ctx: &TestContext, token: &str, kind: &str, title: &str, year: &str) -> Value {
    let body = multipart_body(BOUNDARY, &[("kind", kind), ("title", title), ("year", year)], &[("image/png", PNG)]);
    let response = ctx.post_multipart("/api/content", Some(token), BOUNDARY, body).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_registration_verification_and_login() {
    let mail = mail_server().await;
    let ctx = context_with_mail(&mail).await;
    let email = unique_email();
    let password = "a long enough password";

    let response = ctx.post_json("/api/auth/register", None, &registration_body(&email, password)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["role"], "user");
    assert_eq!(response.body["is_verified"], false);
    assert!(response.body.get("password_hash").is_none());

    // Duplicate address
    let response = ctx.post_json("/api/auth/register", None, &registration_body(&email, password)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Unverified accounts cannot log in
    let login = json!({ "email": email, "password": password });
    let response = ctx.post_json("/api/auth/login", None, &login).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let code = last_code_for(&mail, &email).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let response = ctx
        .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": wrong }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["is_verified"], true);

    let response = ctx
        .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx.post_json("/api/auth/login", None, &login).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "Bearer");
    let token = response.body["token"].as_str().unwrap().to_string();

    let response = ctx.get("/api/auth/me", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["email"], email.as_str());

    let response = ctx
        .post_json("/api/auth/login", None, &json!({ "email": email, "password": "wrong password" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "invalid email or password");

    let response = ctx
        .post_json("/api/auth/login", None, &json!({ "email": "nobody@alumni.test", "password": password }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "invalid email or password");
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_configured_email_registers_as_super_admin() {
    let mail = mail_server().await;
    let ctx = context_with_mail(&mail).await;

    let response = ctx
        .post_json("/api/auth/register", None, &registration_body("Founder@Alumni.test", "a long enough password"))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["email"], "founder@alumni.test");
    assert_eq!(response.body["role"], "super_admin");
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_password_reset() {
    let mail = mail_server().await;
    let ctx = context_with_mail(&mail).await;
    let email = unique_email();
    ctx.db().insert_user(&email, Role::User, true).await;

    // Unknown addresses get the same answer
    let response = ctx
        .post_json("/api/auth/forgot-password", None, &json!({ "email": "ghost@alumni.test" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.post_json("/api/auth/forgot-password", None, &json!({ "email": email })).await;
    assert_eq!(response.status, StatusCode::OK);

    let code = last_code_for(&mail, &email).await;
    let response = ctx
        .post_json(
            "/api/auth/reset-password",
            None,
            &json!({ "email": email, "code": code, "new_password": "a brand new password" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let old = json!({ "email": email, "password": TEST_PASSWORD });
    assert_eq!(ctx.post_json("/api/auth/login", None, &old).await.status, StatusCode::UNAUTHORIZED);

    let new = json!({ "email": email, "password": "a brand new password" });
    assert_eq!(ctx.post_json("/api/auth/login", None, &new).await.status, StatusCode::OK);

    // The code is single use
    let response = ctx
        .post_json(
            "/api/auth/reset-password",
            None,
            &json!({ "email": email, "code": code, "new_password": "yet another password" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_moderation_controls_public_galleries() {
    let ctx = TestContext::with_database(|_| {}).await;
    let member = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let moderator = ctx.db().insert_user(&unique_email(), Role::RepAdmin, true).await;
    let member_token = ctx.token_for(&member);
    let moderator_token = ctx.token_for(&moderator);

    let event = create_content(&ctx, &member_token, "event", "Spring Gala", "2019").await;
    assert_eq!(event["status"], "pending");
    assert_eq!(event["photos"].as_array().unwrap().len(), 1);
    let id = event["id"].as_i64().unwrap();
    let slug = event["slug"].as_str().unwrap().to_string();
    assert!(slug.starts_with("spring-gala-"));

    // Pending content is invisible
    let response = ctx.get("/api/events", None).await;
    assert_eq!(response.body["total"], 0);
    assert_eq!(ctx.get(&format!("/api/events/{id}"), None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.get(&format!("/api/content/{slug}"), None).await.status, StatusCode::NOT_FOUND);

    let queue = ctx.get("/api/admin/content", Some(&moderator_token)).await;
    assert_eq!(queue.status, StatusCode::OK);
    assert_eq!(queue.body["total"], 1);

    let response = ctx
        .post_json(&format!("/api/admin/content/{id}/approve"), Some(&moderator_token), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "approved");
    assert_eq!(response.body["reviewed_by"], moderator.id);

    // Approving twice is not a valid transition
    let response = ctx
        .post_json(&format!("/api/admin/content/{id}/approve"), Some(&moderator_token), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx.get("/api/events?year=2019", None).await;
    assert_eq!(response.body["total"], 1);
    let photo_url = response.body["items"][0]["photos"][0]["url"].as_str().unwrap();
    assert!(photo_url.starts_with(&format!("http://portal.test/uploads/{id}/")));
    assert_eq!(ctx.get(&format!("/api/content/{slug}"), None).await.status, StatusCode::OK);

    let albums = ctx.get("/api/events/albums", None).await;
    assert_eq!(albums.status, StatusCode::OK);
    assert_eq!(albums.body.as_array().unwrap().len(), 1);
    assert_eq!(albums.body[0]["year"], 2019);

    // Owners cannot touch approved content
    let response = ctx
        .put_json(&format!("/api/content/{id}"), Some(&member_token), &json!({ "title": "Spring Gala!" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .post_json(
            &format!("/api/admin/content/{id}/reject"),
            Some(&moderator_token),
            &json!({ "reason": "blurry photos" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["rejection_reason"], "blurry photos");
    assert_eq!(ctx.get("/api/events", None).await.body["total"], 0);

    // An owner edit sends rejected content back to the queue
    let response = ctx
        .put_json(&format!("/api/content/{id}"), Some(&member_token), &json!({ "title": "Spring Gala 2019" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "pending");
    assert_eq!(response.body["rejection_reason"], Value::Null);

    let mine = ctx.get("/api/me/content", Some(&member_token)).await;
    assert_eq!(mine.body["total"], 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_content_ownership_and_photos() {
    let ctx = TestContext::with_database(|_| {}).await;
    let owner = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let stranger = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let staff = ctx.db().insert_user(&unique_email(), Role::Admin, true).await;
    let owner_token = ctx.token_for(&owner);
    let stranger_token = ctx.token_for(&stranger);

    // Staff uploads skip moderation
    let staff_post = create_content(&ctx, &ctx.token_for(&staff), "reunion", "Class of 1999", "2024").await;
    assert_eq!(staff_post["status"], "approved");

    let post = create_content(&ctx, &owner_token, "general", "Campus walk", "2021").await;
    let id = post["id"].as_i64().unwrap();

    let response = ctx
        .put_json(&format!("/api/content/{id}"), Some(&stranger_token), &json!({ "title": "Mine now" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let body = multipart_body(BOUNDARY, &[], &[("image/png", PNG), ("image/png", PNG)]);
    let response = ctx
        .post_multipart(&format!("/api/content/{id}/photos"), Some(&owner_token), BOUNDARY, body)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let photos = response.body.as_array().unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["position"], 1);
    assert_eq!(photos[1]["position"], 2);

    let photo_id = photos[0]["id"].as_i64().unwrap();
    let response = ctx
        .delete(&format!("/api/content/{id}/photos/{photo_id}"), Some(&owner_token))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(ctx.db().count_records("content_photos").await.unwrap(), 3);

    assert_eq!(
        ctx.delete(&format!("/api/content/{id}"), Some(&stranger_token)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        ctx.delete(&format!("/api/content/{id}"), Some(&owner_token)).await.status,
        StatusCode::NO_CONTENT
    );
    assert!(!ctx.temp_dir.path().join(id.to_string()).exists());
    assert_eq!(ctx.db().count_records("content_photos").await.unwrap(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_payment_lifecycle() {
    let ctx = TestContext::with_database(|_| {}).await;
    let payer = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let other = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let admin = ctx.db().insert_user(&unique_email(), Role::Admin, true).await;
    let payer_token = ctx.token_for(&payer);

    let response = ctx
        .post_json(
            "/api/payments",
            Some(&payer_token),
            &json!({ "amount": 250000, "kind": "donation", "note": "for the library" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["status"], "pending");
    assert_eq!(response.body["currency"], "INR");
    assert!(response.body["provider_ref"].as_str().unwrap().starts_with("stub_"));
    let id = response.body["id"].as_i64().unwrap();

    // Someone else's payment looks absent
    let response = ctx
        .post_json(&format!("/api/payments/{id}/cancel"), Some(&ctx.token_for(&other)), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx
        .post_json(&format!("/api/payments/{id}/confirm"), Some(&payer_token), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "completed");

    let response = ctx
        .post_json(&format!("/api/payments/{id}/cancel"), Some(&payer_token), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(ctx.get("/api/payments", Some(&payer_token)).await.body["total"], 1);

    let admin_token = ctx.token_for(&admin);
    let listing = ctx.get("/api/admin/transactions?status=completed", Some(&admin_token)).await;
    assert_eq!(listing.body["total"], 1);

    let stats = ctx.get("/api/admin/stats", Some(&admin_token)).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["total_users"], 3);
    assert_eq!(stats.body["completed_payments"], 1);
    assert_eq!(stats.body["completed_amounts"]["INR"], 250000);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_role_management() {
    let ctx = TestContext::with_database(|_| {}).await;
    let root = ctx.db().insert_user(&unique_email(), Role::SuperAdmin, true).await;
    let member = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let other = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let root_token = ctx.token_for(&root);

    let response = ctx
        .put_json(&format!("/api/admin/users/{}/role", member.id), Some(&root_token), &json!({ "role": "admin" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["role"], "admin");

    // The promoted admin needs a fresh token to act as admin
    let mut promoted = member.clone();
    promoted.role = Role::Admin;
    let admin_token = ctx.token_for(&promoted);

    let response = ctx
        .put_json(&format!("/api/admin/users/{}/role", other.id), Some(&admin_token), &json!({ "role": "admin" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx
        .put_json(&format!("/api/admin/users/{}/role", root.id), Some(&admin_token), &json!({ "role": "user" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let listing = ctx.get("/api/admin/users?role=user", Some(&admin_token)).await;
    assert_eq!(listing.body["total"], 1);

    assert_eq!(
        ctx.delete(&format!("/api/admin/users/{}", other.id), Some(&admin_token)).await.status,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        ctx.delete(&format!("/api/admin/users/{}", other.id), Some(&admin_token)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_ok!(ctx.db().cleanup().await);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_otp_lockout_after_max_attempts() {
    let mail = mail_server().await;
    let ctx = context_with_mail_and(&mail, |s| s.auth.otp.max_attempts = 3).await;
    let email = unique_email();
    let code = register_and_read_code(&ctx, &mail, &email).await;

    for _ in 0..3 {
        let response = ctx
            .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": wrong_code(&code) }))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "invalid verification code");
    }

    // Even the right code is refused once the attempts are spent
    let response = ctx
        .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "too many attempts, request a new code");

    let response = ctx
        .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.body["error"], "no pending verification code");
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_concurrent_guesses_share_the_attempt_limit() {
    let mail = mail_server().await;
    let ctx = context_with_mail_and(&mail, |s| s.auth.otp.max_attempts = 3).await;
    let email = unique_email();
    let code = register_and_read_code(&ctx, &mail, &email).await;
    let guess = json!({ "email": email, "code": wrong_code(&code) });

    let responses = join_all((0..12).map(|_| ctx.post_json("/api/auth/verify-otp", None, &guess))).await;

    let checked = responses
        .iter()
        .filter(|r| r.body["error"] == "invalid verification code")
        .count();
    let locked = responses
        .iter()
        .filter(|r| r.body["error"] == "too many attempts, request a new code")
        .count();
    assert!(responses.iter().all(|r| r.status == StatusCode::BAD_REQUEST));
    assert!(checked <= 3, "{checked} guesses were checked against the code");
    assert!(locked >= 1);

    let response = ctx
        .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let attempts: i32 = sqlx::query_scalar("SELECT otp_attempts FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&ctx.db().pool)
        .await
        .unwrap();
    assert!(attempts <= 3);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_expired_code_is_refused() {
    let mail = mail_server().await;
    let ctx = context_with_mail(&mail).await;
    let email = unique_email();
    let code = register_and_read_code(&ctx, &mail, &email).await;

    sqlx::query("UPDATE users SET otp_expires_at = NOW() - INTERVAL '1 minute' WHERE email = $1")
        .bind(&email)
        .execute(&ctx.db().pool)
        .await
        .unwrap();

    let response = ctx
        .post_json("/api/auth/verify-otp", None, &json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "verification code has expired");

    let login = json!({ "email": email, "password": "a long enough password" });
    assert_eq!(ctx.post_json("/api/auth/login", None, &login).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_auth_requests_are_rate_limited() {
    let mail = mail_server().await;
    let ctx = context_with_mail_and(&mail, |s| s.rate_limit.max_requests = 2).await;
    let email = unique_email();
    let body = registration_body(&email, "a long enough password");

    assert_eq!(ctx.post_json("/api/auth/register", None, &body).await.status, StatusCode::CREATED);
    assert_eq!(ctx.post_json("/api/auth/register", None, &body).await.status, StatusCode::CONFLICT);
    assert_eq!(
        ctx.post_json("/api/auth/register", None, &body).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    let code = last_code_for(&mail, &email).await;
    let guess = json!({ "email": email, "code": wrong_code(&code) });
    for _ in 0..2 {
        let response = ctx.post_json("/api/auth/verify-otp", None, &guess).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
    let response = ctx.post_json("/api/auth/verify-otp", None, &guess).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    // Limits are per address
    let other = registration_body(&unique_email(), "a long enough password");
    assert_eq!(ctx.post_json("/api/auth/register", None, &other).await.status, StatusCode::CREATED);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_tokens_follow_the_stored_account() {
    let ctx = TestContext::with_database(|_| {}).await;
    let (_, root_token) = ctx.account(Role::SuperAdmin).await;
    let (admin, admin_token) = ctx.account(Role::Admin).await;
    let (member, member_token) = ctx.account(Role::User).await;

    assert_eq!(ctx.get("/api/admin/users", Some(&admin_token)).await.status, StatusCode::OK);

    // A demotion applies to tokens issued before it
    let response = ctx
        .put_json(&format!("/api/admin/users/{}/role", admin.id), Some(&root_token), &json!({ "role": "user" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(ctx.get("/api/admin/users", Some(&admin_token)).await.status, StatusCode::FORBIDDEN);

    let response = ctx.get("/api/auth/me", Some(&admin_token)).await;
    assert_eq!(response.body["role"], "user");

    // A deleted account's token no longer authenticates
    assert_eq!(
        ctx.delete(&format!("/api/admin/users/{}", member.id), Some(&root_token)).await.status,
        StatusCode::NO_CONTENT
    );

    let response = ctx
        .post_json("/api/payments", Some(&member_token), &json!({ "amount": 500, "kind": "donation" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "account no longer exists");

    let body = multipart_body(BOUNDARY, &[("title", "Ghost post")], &[("image/png", PNG)]);
    let response = ctx.post_multipart("/api/content", Some(&member_token), BOUNDARY, body).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert_eq!(ctx.get("/api/auth/me", Some(&member_token)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.db().count_records("transactions").await.unwrap(), 0);
    assert_eq!(ctx.get("/api/admin/users", Some(&root_token)).await.body["total"], 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_owner_edit_does_not_undo_a_review() {
    let ctx = TestContext::with_database(|_| {}).await;
    let (_, member_token) = ctx.account(Role::User).await;
    let (_, moderator_token) = ctx.account(Role::RepAdmin).await;

    let post = create_content(&ctx, &member_token, "event", "Alumni Meet", "2022").await;
    let id = post["id"].as_i64().unwrap();
    let response = ctx
        .post_json(&format!("/api/admin/content/{id}/reject"), Some(&moderator_token), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // The owner read the row while it was rejected; a moderator approves
    // it before the edit is written
    let contents = ContentRepository::new(ctx.db().pool.clone());
    sqlx::query("UPDATE contents SET status = 'approved' WHERE id = $1")
        .bind(id)
        .execute(&ctx.db().pool)
        .await
        .unwrap();

    let patch = UpdateContentRequest {
        title: Some("Alumni Meet 2022".to_string()),
        ..UpdateContentRequest::default()
    };
    let result = contents
        .update(id, patch, ContentStatus::Rejected, Some(ContentStatus::Pending))
        .await;
    assert!(matches!(result, Err(PortalError::InvalidStateTransition { .. })));

    let stored = contents.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::Approved);
    assert_eq!(stored.title, "Alumni Meet");
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker or TEST_DATABASE_URL"]
async fn test_configured_super_admins_are_promoted_at_startup() {
    let ctx = TestContext::with_database(|_| {}).await;
    let chair = ctx.db().insert_user("chair@alumni.test", Role::User, true).await;
    let member = ctx.db().insert_user(&unique_email(), Role::User, true).await;
    let users = UserRepository::new(ctx.db().pool.clone());

    let promoted = users
        .promote_super_admins(&["  Chair@Alumni.TEST ".to_string(), "nobody@alumni.test".to_string()])
        .await
        .unwrap();
    assert_eq!(promoted, 1);

    assert_eq!(users.find_by_id(chair.id).await.unwrap().unwrap().role, Role::SuperAdmin);
    assert_eq!(users.find_by_id(member.id).await.unwrap().unwrap().role, Role::User);
}
