use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use split_ledger::{
    api::{create_router, AppState, RateLimiter},
    config::Config,
    db::{self, SessionRepository},
    error::AppError,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,split_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting split-ledger server v{}...", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::from_env()?);
    tracing::info!("Configuration loaded");

    let db = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connected: {}", config.database_url);

    db::run_migrations(&db).await?;
    tracing::info!("Database migrations completed");

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window_secs,
    ));
    tracing::info!(
        "Rate limiter configured ({} req per {}s per IP)",
        config.rate_limit_max_requests,
        config.rate_limit_window_secs
    );

    let state = AppState {
        db: db.clone(),
        config: config.clone(),
    };

    // Spawn background task for session cleanup
    {
        let db_clone = db.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600)); // Every hour
            loop {
                interval.tick().await;
                match SessionRepository::cleanup_expired(&db_clone).await {
                    Ok(removed) => tracing::debug!("Expired sessions cleaned up ({} removed)", removed),
                    Err(e) => tracing::error!("Session cleanup failed: {}", e),
                }
            }
        });
        tracing::info!("Session cleanup task started (runs hourly)");
    }

    // Spawn background task for rate limiter cleanup
    {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // Every 5 minutes
            loop {
                interval.tick().await;
                let tracked = limiter.cleanup().await;
                tracing::debug!("Rate limiter cache cleaned up ({} clients tracked)", tracked);
            }
        });
        tracing::info!("Rate limiter cleanup task started");
    }

    let app = create_router(state, rate_limiter);

    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/api/health", addr);
    tracing::info!("API Endpoints:");
    tracing::info!("  POST /api/auth/register              - Register with email and password");
    tracing::info!("  POST /api/auth/login                 - Start a session");
    tracing::info!("  PUT  /api/auth/profile               - Set name and username");
    tracing::info!("  GET  /api/users/search?q=            - Find people to add");
    tracing::info!("  GET  /api/friends                    - Friends, balances and requests");
    tracing::info!("  POST /api/friends/:id/expenses       - Record an expense with a friend");
    tracing::info!("  POST /api/expenses/:id/settle        - Settle an expense");
    tracing::info!("  GET  /api/groups                     - Groups and invitations");
    tracing::info!("  GET  /api/groups/:id                 - Group ledger and settle-up plan");
    tracing::info!("  POST /api/calculator/split           - Split a tax amount");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
