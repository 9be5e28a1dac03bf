//! Shared setup for the API tests: an in-memory database, a migrated
//! schema, a `TestServer` over the real router, and account seeding.

use axum_test::TestServer;
use clubhouse::{app, db, util, AppConfig};
use sqlx::SqlitePool;

pub const ADMIN_EMAIL: &str = "admin@example.org";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub server: TestServer,
    pub pool: SqlitePool,
    pub config: AppConfig,
}

pub async fn spawn_app() -> TestApp {
    let config = AppConfig {
        database_url: "sqlite::memory:".to_owned(),
        upload_dir: std::env::temp_dir().join(format!("clubhouse-test-{}", uuid::Uuid::new_v4())),
        ..AppConfig::default()
    };

    let pool = db::connect(&config.database_url).await.expect("connect");
    db::migrate(&pool).await.expect("migrate");

    let server = TestServer::new(app(config.clone(), pool.clone())).expect("test server");
    TestApp {
        server,
        pool,
        config,
    }
}

/// Inserts an active user with the given role and the well-known test
/// credentials. No member record is linked.
pub async fn seed_admin(pool: &SqlitePool, role: &str) -> i64 {
    seed_user(pool, "admin", ADMIN_EMAIL, role, "Active").await
}

pub async fn seed_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    role: &str,
    status: &str,
) -> i64 {
    // Low bcrypt cost to keep the suite fast.
    let pass_hash = bcrypt::hash(ADMIN_PASSWORD, 4).expect("hash");
    let result = sqlx::query(
        "INSERT INTO users (username, email, pass_hash, role, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(pass_hash)
    .bind(role)
    .bind(status)
    .bind(util::now())
    .execute(pool)
    .await
    .expect("seed user");
    result.last_insert_rowid()
}

pub async fn login_as(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/admin/login")
        .json(&serde_json::json!({ "email": email, "password": ADMIN_PASSWORD }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["token"].as_str().expect("login token").to_owned()
}

/// Seeds a Super Admin and logs in, returning the bearer token.
pub async fn seed_and_login(app: &TestApp) -> String {
    seed_admin(&app.pool, "Super Admin").await;
    login_as(&app.server, ADMIN_EMAIL).await
}

/// A tiny but genuine PNG header followed by padding, enough to pass the
/// magic-byte check.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0; 64]);
    bytes
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
