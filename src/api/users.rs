use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::api::state::{AppState, AuthUser};
use crate::db::{UserRepository, UserSummary};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/users/search?q= (requires auth)
pub async fn search(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let users = UserRepository::search(&state.db, q, &user_id).await?;
    Ok(Json(users))
}
