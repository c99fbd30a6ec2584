use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use sensorgate::config::Config;
use sensorgate::email::Mailer;
use sensorgate::service::AuthService;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";

/// Captures outbound mail instead of delivering it.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Pull the reset token out of the most recent email body.
    pub fn last_reset_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let mail = sent.last()?;
        mail.body
            .lines()
            .find_map(|line| line.strip_prefix("Reset token: "))
            .map(|t| t.trim().to_string())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Peek at a user's ledger rows: (token_hash, expires_at), newest first.
pub async fn reset_token_rows(
    pool: &PgPool,
    user_id: Uuid,
) -> Vec<(String, chrono::DateTime<chrono::Utc>)> {
    sqlx::query_as(
        "SELECT token_hash, expires_at FROM password_reset_tokens
         WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .expect("ledger query failed")
}

/// An AuthService wired to a dedicated throwaway test database.
pub struct TestCtx {
    pub service: AuthService,
    pub pool: PgPool,
    pub mailer: Arc<RecordingMailer>,
    pub db_name: String,
}

/// Spawn a test context with a fresh database, or None when DATABASE_URL is
/// not set (lets the suite run without a Postgres instance around).
pub async fn spawn_ctx() -> Option<TestCtx> {
    spawn_ctx_with_ttls(Duration::seconds(900), Duration::seconds(900)).await
}

pub async fn spawn_ctx_with_ttls(
    access_token_ttl: Duration,
    reset_token_ttl: Duration,
) -> Option<TestCtx> {
    let _ = dotenvy::dotenv();

    let base_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };

    // Create a unique test database
    let db_name = format!(
        "sensorgate_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        access_token_ttl,
        reset_token_ttl,
        sweep_interval: std::time::Duration::from_secs(86400),
        log_level: "warn".to_string(),
        smtp: None,
    };

    let mailer = RecordingMailer::new();
    let service = AuthService::new(pool.clone(), config, Some(mailer.clone()));

    Some(TestCtx {
        service,
        pool,
        mailer,
        db_name,
    })
}

/// Drop the test database after the test completes.
pub async fn cleanup(ctx: TestCtx) {
    let db_name = ctx.db_name.clone();
    drop(ctx.service);
    ctx.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"
    ))
    .execute(&admin_pool)
    .await;

    admin_pool.close().await;
}
