pub mod auth;
pub mod calculator;
pub mod friends;
pub mod groups;
pub mod middleware;
pub mod state;
pub mod users;


pub use middleware::RateLimiter;
pub use state::{AppState, AuthUser};

use axum::{
    Router,
    routing::{delete, get, post, put},
    middleware as axum_middleware,
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    timeout::TimeoutLayer,
};
use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;

use crate::error::AppError;

/// Longest description accepted for a friend or group expense.
pub const MAX_EXPENSE_DESCRIPTION_LEN: usize = 140;

/// Trimmed, non-empty expense description within the length cap.
pub(crate) fn expense_description(raw: &str) -> Result<&str, AppError> {
    let description = raw.trim();
    if description.is_empty() {
        return Err(AppError::Validation("Please fill in all fields".to_string()));
    }
    if description.chars().count() > MAX_EXPENSE_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be at most {} characters",
            MAX_EXPENSE_DESCRIPTION_LEN
        )));
    }
    Ok(description)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let protected = Router::new()
        // Account
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/profile", put(auth::complete_profile))
        .route("/api/users/search", get(users::search))

        // Friends and the pairwise ledger
        .route("/api/friends", get(friends::list_friends))
        .route("/api/friends/requests", post(friends::send_request))
        .route("/api/friends/requests/:id", delete(friends::decline_request))
        .route("/api/friends/requests/:id/accept", post(friends::accept_request))
        .route("/api/friends/:friend_id", get(friends::friend_profile))
        .route("/api/friends/:friend_id/expenses", post(friends::add_expense))
        .route("/api/friends/:friend_id/reconcile", post(friends::reconcile))
        .route("/api/expenses/:id/settle", post(friends::settle_expense))

        // Groups
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route("/api/groups/:id", get(groups::group_detail))
        .route("/api/groups/:id/members", post(groups::invite_members))
        .route("/api/groups/:id/invite/accept", post(groups::accept_invite))
        .route("/api/groups/:id/invite/decline", post(groups::decline_invite))
        .route("/api/groups/:id/expenses", post(groups::add_group_expense))
        .route("/api/groups/:id/settlements", post(groups::settle_up))

        // Calculator
        .route("/api/calculator/split", post(calculator::split))
        .route(
            "/api/calculator/draft",
            get(calculator::get_draft)
                .put(calculator::save_draft)
                .delete(calculator::clear_draft),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        // Health check
        .route("/api/health", get(health))

        // Authentication endpoints
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))

        .merge(protected)

        // Add rate limiting middleware
        .layer(axum_middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            middleware::rate_limit_middleware(limiter, req, next)
        }))
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
