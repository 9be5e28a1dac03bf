mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use clubhouse::models::session::Session;
use clubhouse::util;
use common::*;
use serde_json::{json, Value};
use time::Duration;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn login_creates_a_day_long_session() {
    let app = spawn_app().await;
    seed_admin(&app.pool, "Admin").await;

    let response = app
        .server
        .post("/api/admin/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["email"], json!(ADMIN_EMAIL));
    assert!(body["user"]["pass_hash"].is_null());

    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let session = Session::with_token(token, &app.pool)
        .await
        .unwrap()
        .expect("session row");
    let ttl = session.expires_at - util::now();
    assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));
}

#[tokio::test]
async fn login_failures_are_generic_and_create_no_session() {
    let app = spawn_app().await;
    seed_admin(&app.pool, "Admin").await;
    seed_user(&app.pool, "dormant", "dormant@example.org", "Admin", "Inactive").await;

    for (email, password) in [
        (ADMIN_EMAIL, "wrong-password"),
        ("dormant@example.org", ADMIN_PASSWORD),
        ("nobody@example.org", ADMIN_PASSWORD),
    ] {
        let response = app
            .server
            .post("/api/admin/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], json!("Invalid email or password"));
    }

    assert_eq!(count_rows(&app.pool, "sessions").await, 0);
}

#[tokio::test]
async fn login_without_fields_is_a_bad_request() {
    let app = spawn_app().await;
    let response = app
        .server
        .post("/api/admin/login")
        .json(&json!({ "email": ADMIN_EMAIL }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_deletes_the_session_and_always_succeeds() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;
    assert_eq!(count_rows(&app.pool, "sessions").await, 1);

    let response = app
        .server
        .post("/api/admin/logout")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    assert_eq!(count_rows(&app.pool, "sessions").await, 0);

    // A second logout with the now-dead token still reports success.
    let response = app
        .server
        .post("/api/admin/logout")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn expired_sessions_stop_working_but_the_row_survives() {
    let app = spawn_app().await;
    let user_id = seed_admin(&app.pool, "Admin").await;

    let token = Session::generate_token();
    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(util::now() - Duration::hours(25))
        .bind(util::now() - Duration::hours(1))
        .execute(&app.pool)
        .await
        .unwrap();

    let response = app
        .server
        .get("/api/admin/dashboard")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // No active purge: the expired row is still physically there.
    assert_eq!(count_rows(&app.pool, "sessions").await, 1);
}

#[tokio::test]
#[traced_test]
async fn notice_round_trip() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let response = app
        .server
        .post("/api/admin/notices")
        .authorization_bearer(&token)
        .json(&json!({ "title": "T", "content": "C" }))
        .await;
    response.assert_status_ok();
    let created: Value = response.json();
    assert_eq!(created["title"], json!("T"));
    assert_eq!(created["content"], json!("C"));
    assert_eq!(created["status"], json!("Published"));
    assert!(!created["created_at"].is_null());
    assert_eq!(created["created_by_name"], json!("admin"));

    let response = app.server.get("/api/admin/notices").await;
    response.assert_status_ok();
    let listed: Value = response.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["notice_id"], created["notice_id"]);
}

#[tokio::test]
async fn protected_writes_reject_missing_and_garbage_tokens() {
    let app = spawn_app().await;
    seed_admin(&app.pool, "Admin").await;

    let response = app
        .server
        .post("/api/admin/notices")
        .json(&json!({ "title": "T", "content": "C" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/admin/notices")
        .authorization_bearer("deadbeef")
        .json(&json!({ "title": "T", "content": "C" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(count_rows(&app.pool, "notices").await, 0);
}

#[tokio::test]
async fn notice_creation_validates_required_fields() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let response = app
        .server
        .post("/api/admin/notices")
        .authorization_bearer(&token)
        .json(&json!({ "title": "missing content" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // A malformed body is tolerated as an empty object, which then fails
    // the same required-field check.
    let response = app
        .server
        .post("/api/admin/notices")
        .authorization_bearer(&token)
        .text("{not json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notice_delete_handles_unknown_ids() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let response = app
        .server
        .delete("/api/admin/notices")
        .authorization_bearer(&token)
        .json(&json!({ "notice_id": 42 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let created: Value = app
        .server
        .post("/api/admin/notices")
        .authorization_bearer(&token)
        .json(&json!({ "title": "T", "content": "C" }))
        .await
        .json();
    let response = app
        .server
        .delete("/api/admin/notices")
        .authorization_bearer(&token)
        .json(&json!({ "notice_id": created["notice_id"] }))
        .await;
    response.assert_status_ok();
    assert_eq!(count_rows(&app.pool, "notices").await, 0);
}

#[tokio::test]
async fn event_creation_accepts_date_and_time_fallbacks() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let response = app
        .server
        .post("/api/admin/events")
        .authorization_bearer(&token)
        .json(&json!({
            "name": "Spring Picnic",
            "date": "2030-05-01",
            "time": "10:00:00",
            "location": "Riverside Park",
        }))
        .await;
    response.assert_status_ok();
    let event: Value = response.json();
    assert_eq!(event["title"], json!("Spring Picnic"));
    assert_eq!(event["status"], json!("Upcoming"));
    assert_eq!(event["rsvp_count"], json!(0));
    assert!(event["start_date"].as_str().unwrap().starts_with("2030-05-01"));
    assert!(event["end_date"].as_str().unwrap().contains("23:59:59"));

    let response = app
        .server
        .post("/api/admin/events")
        .authorization_bearer(&token)
        .json(&json!({ "location": "nowhere" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn member_creation_and_listing() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let response = app
        .server
        .post("/api/admin/members")
        .authorization_bearer(&token)
        .json(&json!({ "full_name": "Jo River", "email": "jo@example.org" }))
        .await;
    response.assert_status_ok();
    let member: Value = response.json();
    assert_eq!(member["membership_type"], json!("General"));
    assert_eq!(member["status"], json!("Active"));

    let listed: Value = app.server.get("/api/admin/members").await.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["full_name"], json!("Jo River"));
}

#[tokio::test]
async fn admin_creation_is_super_admin_only() {
    let app = spawn_app().await;
    seed_admin(&app.pool, "Admin").await;
    let token = login_as(&app.server, ADMIN_EMAIL).await;

    let response = app
        .server
        .post("/api/admin/admins")
        .authorization_bearer(&token)
        .json(&json!({
            "username": "newbie",
            "email": "newbie@example.org",
            "password": "s3cret",
            "full_name": "New B.",
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_creation_creates_member_and_account_together() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let response = app
        .server
        .post("/api/admin/admins")
        .authorization_bearer(&token)
        .json(&json!({
            "username": "organizer",
            "email": "organizer@example.org",
            "password": "s3cret",
            "full_name": "Orla Ganizer",
        }))
        .await;
    response.assert_status_ok();
    let admin: Value = response.json();
    assert_eq!(admin["role"], json!("Admin"));
    assert_eq!(admin["full_name"], json!("Orla Ganizer"));
    assert!(admin["member_id"].as_i64().is_some());
    assert_eq!(count_rows(&app.pool, "members").await, 1);

    // The new account can log in right away.
    let new_token = login_as(&app.server, "organizer@example.org").await;
    assert_eq!(new_token.len(), 64);

    let listed: Value = app.server.get("/api/admin/admins").await.json();
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn user_listing_requires_a_dashboard_role() {
    let app = spawn_app().await;
    seed_user(&app.pool, "plain", "plain@example.org", "Member", "Active").await;
    let token = login_as(&app.server, "plain@example.org").await;

    let response = app
        .server
        .get("/api/admin/users")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    seed_admin(&app.pool, "Admin").await;
    let token = login_as(&app.server, ADMIN_EMAIL).await;
    let response = app
        .server
        .get("/api/admin/users")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let users: Value = response.json();
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn payments_listing_is_a_stub() {
    let app = spawn_app().await;
    let response = app.server.get("/api/admin/payments").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn dashboard_serves_the_empty_shape_on_a_fresh_database() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let stats: Value = app
        .server
        .get("/api/admin/dashboard")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(stats["total_members"], json!(0));
    assert_eq!(stats["total_events"], json!(0));
    assert_eq!(stats["total_notices"], json!(0));
    assert_eq!(stats["upcoming_events"], json!([]));
    // The login itself is already on the audit trail.
    assert_eq!(
        stats["recent_activities"][0]["action"],
        json!("User logged in")
    );
}

#[tokio::test]
async fn activity_log_records_writes_with_username() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    app.server
        .post("/api/admin/notices")
        .authorization_bearer(&token)
        .json(&json!({ "title": "T", "content": "C" }))
        .await
        .assert_status_ok();

    let logs: Value = app
        .server
        .get("/api/admin/activity-logs")
        .authorization_bearer(&token)
        .await
        .json();
    let actions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"Created notice: T"));
    assert_eq!(logs[0]["username"], json!("admin"));
}

#[tokio::test]
#[traced_test]
async fn gallery_upload_stores_the_file_and_the_row() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let form = MultipartForm::new()
        .add_text("title", "Summer Fair")
        .add_text("description", "crowd shot")
        .add_part(
            "image",
            Part::bytes(png_bytes())
                .file_name("fair.png")
                .mime_type("image/png"),
        );
    let response = app
        .server
        .post("/api/admin/gallery")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));

    let image_path = body["data"]["image_path"].as_str().unwrap();
    assert!(image_path.starts_with("gallery/"));
    assert!(app.config.upload_dir.join(image_path).exists());

    let listed: Value = app.server.get("/api/admin/gallery").await.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["uploaded_by_name"], json!("admin"));

    let response = app
        .server
        .delete("/api/admin/gallery")
        .authorization_bearer(&token)
        .json(&json!({ "image_id": body["data"]["image_id"] }))
        .await;
    response.assert_status_ok();
    assert_eq!(count_rows(&app.pool, "image_gallery").await, 0);
}

#[tokio::test]
async fn gallery_upload_requires_a_file() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let form = MultipartForm::new().add_text("title", "no file");
    let response = app
        .server
        .post("/api/admin/gallery")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gallery_upload_rejects_content_that_is_not_what_it_claims() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let form = MultipartForm::new().add_part(
        "image",
        Part::bytes(b"<script>alert(1)</script>".to_vec())
            .file_name("totally-a-picture.png")
            .mime_type("image/png"),
    );
    let response = app
        .server
        .post("/api/admin/gallery")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(count_rows(&app.pool, "image_gallery").await, 0);
}

async fn upload_banner(app: &TestApp, token: &str, title: &str) -> Value {
    let form = MultipartForm::new().add_text("title", title).add_part(
        "image",
        Part::bytes(png_bytes())
            .file_name("banner.png")
            .mime_type("image/png"),
    );
    let response = app
        .server
        .post("/api/admin/banners")
        .authorization_bearer(token)
        .multipart(form)
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn activating_a_banner_deactivates_every_other_one() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let first = upload_banner(&app, &token, "first").await;
    let second = upload_banner(&app, &token, "second").await;
    assert_eq!(first["status"], json!("inactive"));

    let response = app
        .server
        .put("/api/admin/banners")
        .authorization_bearer(&token)
        .json(&json!({ "banner_id": first["banner_id"], "status": "active" }))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .put("/api/admin/banners")
        .authorization_bearer(&token)
        .json(&json!({ "banner_id": second["banner_id"], "status": "active" }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["status"], json!("active"));

    let active_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM banners WHERE status = 'active'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(active_count, 1);

    let active = clubhouse::models::banner::Banner::active(&app.pool)
        .await
        .unwrap()
        .expect("one active banner");
    assert_eq!(Some(active.banner_id), second["banner_id"].as_i64());
}

#[tokio::test]
async fn banner_update_keeps_absent_fields() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let banner = upload_banner(&app, &token, "original title").await;
    let response = app
        .server
        .put("/api/admin/banners")
        .authorization_bearer(&token)
        .json(&json!({ "banner_id": banner["banner_id"], "status": "active" }))
        .await;
    let updated: Value = response.json();
    assert_eq!(updated["title"], json!("original title"));
    assert_eq!(updated["image_path"], banner["image_path"]);

    let response = app
        .server
        .put("/api/admin/banners")
        .authorization_bearer(&token)
        .json(&json!({ "banner_id": 9999, "status": "active" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn application_review_stamps_transitions() {
    let app = spawn_app().await;
    let token = seed_and_login(&app).await;

    let created: Value = app
        .server
        .post("/api/admin/membership-applications")
        .json(&json!({ "full_name": "Appli Cant", "email": "appli@example.org" }))
        .await
        .json();
    assert_eq!(created["status"], json!("pending"));
    assert!(created["member_code"].as_str().unwrap().starts_with("MBR"));

    let response = app
        .server
        .put("/api/admin/membership-applications")
        .authorization_bearer(&token)
        .json(&json!({
            "application_id": created["application_id"],
            "status": "verified",
            "notes": "payment confirmed",
        }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["status"], json!("verified"));
    assert_eq!(updated["notes"], json!("payment confirmed"));
    assert!(!updated["verified_date"].is_null());
    assert!(updated["rejected_date"].is_null());

    let response = app
        .server
        .put("/api/admin/membership-applications")
        .authorization_bearer(&token)
        .json(&json!({ "application_id": 777, "status": "rejected" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_endpoints_and_methods_answer_with_json_errors() {
    let app = spawn_app().await;

    let response = app.server.get("/api/admin/frobnicate").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Endpoint not found"));

    let response = app.server.put("/api/admin/notices").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"], json!("Method not allowed"));
}
