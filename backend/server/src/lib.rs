//! Documentation of the MindBattle quiz contest backend.
//!
//!
//!
//! # General Infrastructure
//! - Contest listings are read from a relational database holding one table per format
//! - Wallets, contests in play, settings and the audit log live in JSON documents under `DATA_DIR`
//! - A background task advances contest statuses on a fixed interval
//! - The admin CLI (`process`) works on the same documents while the server is stopped
//!
//!
//!
//! # Listing Fallback
//!
//! The database pool is opened lazily. When it cannot be reached, or its rows
//! cannot be read, `GET /contests` serves the contests bundled with the binary
//! instead of an error, so the frontend always has something to render.
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path                     | Response                                   |
//! |--------|--------------------------|--------------------------------------------|
//! | GET    | `/health`                | `ok`                                       |
//! | GET    | `/contests`              | every contest, ordered by start date       |
//! | GET    | `/contests/{id}`         | one contest, 404 when unknown              |
//! | GET    | `/leaderboard`           | users by points with their rank tier       |
//! | GET    | `/users/{email}/wallet`  | balance, available balance, transactions   |
//!
//!
//!
//! # Environment
//!
//! | Variable              | Default                               |
//! |-----------------------|---------------------------------------|
//! | `RUST_PORT`           | `8080`                                |
//! | `DATABASE_URL`        | `sqlite://data/contests.db?mode=rwc`  |
//! | `DATA_DIR`            | `data`                                |
//! | `SWEEP_INTERVAL_SECS` | `5`                                   |
//! | `RUST_LOG`            | unset                                 |
//!
//! A Docker secret mounted at `/run/secrets/DATABASE_URL` takes precedence.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run the server with debug logs.
//! ```sh
//! RUST_LOG=debug cargo run -p mindbattle
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod utils;

use routes::{contest_handler, contests_handler, health_handler, leaderboard_handler, wallet_handler};
use state::State;
use sweeper::spawn_sweeper;

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/contests", get(contests_handler))
        .route("/contests/{id}", get(contest_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/users/{email}/wallet", get(wallet_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await?;

    let sweeper = spawn_sweeper(state.clone());

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Cannot bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use bank::{
        Service,
        models::{Contest, ContestFormat, ContestStatus, Difficulty, TimerType},
        store::FileStore,
    };
    use serde_json::Value;
    use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::{config::Config, database::init_schema, sweeper::run_sweep};

    const NOW: i64 = 1_700_000_000_000;
    const HOUR: i64 = 60 * 60 * 1000;
    const ADMIN: &str = "root@mindbattle.io";

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn test_state(dir: &TempDir, pool: SqlitePool) -> Arc<State> {
        let config = Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            data_dir: dir.path().to_string_lossy().into_owned(),
            sweep_interval: Duration::from_secs(5),
        };

        let mut service = Service::open(FileStore::open(dir.path()).unwrap()).unwrap();
        service.seed_super_admin("Root", ADMIN, "pw", NOW).unwrap();
        service.register_user("Asha", "asha@example.com", "pw", NOW).unwrap();

        State::from_parts(config, pool, service).unwrap()
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let response = app(test_state(&dir, memory_pool().await))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_contests_fall_back_without_tables() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(test_state(&dir, memory_pool().await)), "/contests").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 4);
        assert!(body[0]["contestStartDate"].is_i64());
    }

    #[tokio::test]
    async fn test_contests_from_database() {
        let dir = TempDir::new().unwrap();
        let pool = memory_pool().await;
        init_schema(&pool).await.unwrap();
        sqlx::raw_sql(
            r#"
            INSERT INTO kbc_contests
                (id, title, category, difficulty, status, entry_fee, max_participants, prize_ladder,
                 registration_start_date, registration_end_date, contest_start_date)
            VALUES
                (3, 'Night Quiz', 'History', 'Easy', 'Upcoming', 10, 50, '[10,20]',
                 '2025-01-01 00:00:00', '2025-01-02 00:00:00', '2025-01-03 00:00:00');
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let router = app(test_state(&dir, pool));

        let (status, body) = get_json(router.clone(), "/contests").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "kbc-3");
        assert_eq!(body[0]["format"], "KBC");
        assert_eq!(body[0]["timerType"], "per_question");

        let (status, body) = get_json(router.clone(), "/contests/kbc-3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Night Quiz");

        let (status, _) = get_json(router, "/contests/ff-3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wallet() {
        let dir = TempDir::new().unwrap();
        let router = app(test_state(&dir, memory_pool().await));

        let (status, body) = get_json(router.clone(), "/users/ASHA@example.com/wallet").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "asha@example.com");
        assert_eq!(body["walletBalance"], 100);
        assert_eq!(body["availableBalance"], 100);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 1);

        let (status, _) = get_json(router, "/users/nobody@example.com/wallet").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(test_state(&dir, memory_pool().await)), "/leaderboard").await;

        assert_eq!(status, StatusCode::OK);
        let standings = body.as_array().unwrap();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0]["rank"], "Beginner");
        assert_eq!(standings[0]["points"], 0);
    }

    #[tokio::test]
    async fn test_sweep_persists() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, memory_pool().await);

        {
            let mut service = state.service.lock().await;
            let draft = Contest {
                id: "kbc-9".to_string(),
                title: "Sweep".to_string(),
                category: "General".to_string(),
                difficulty: Difficulty::Easy,
                status: ContestStatus::Draft,
                registration_start_date: NOW - 2 * HOUR,
                registration_end_date: NOW - HOUR,
                contest_start_date: NOW - HOUR / 2,
                participants: Vec::new(),
                entry_fee: 0,
                max_participants: 10,
                format: ContestFormat::Kbc,
                timer_type: TimerType::PerQuestion,
                total_contest_time: None,
                prizes: Vec::new(),
                created_by: String::new(),
                settled: false,
            };
            service.create_contest(ADMIN, draft, NOW).unwrap();
            service.submit_contest(ADMIN, "kbc-9", NOW).unwrap();
            service.approve_contest(ADMIN, "kbc-9", NOW).unwrap();
        }

        assert_eq!(run_sweep(state.clone(), NOW).await, 1);
        assert_eq!(run_sweep(state.clone(), NOW).await, 0);

        let reopened = Service::open(FileStore::open(dir.path()).unwrap()).unwrap();
        assert_eq!(reopened.contest("kbc-9").unwrap().status, ContestStatus::Live);
    }
}
