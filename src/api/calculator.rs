use axum::{
    extract::State,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::state::{AppState, AuthUser};
use crate::db::CalculatorRepository;
use crate::error::AppError;
use crate::ledger::{self, Cents};

pub const MAX_PEOPLE: usize = 100;
pub const MAX_DRAFT_BYTES: usize = 16 * 1024;

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub tax: String,
    pub people: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitResponse {
    pub total: Cents,
    pub shares: Vec<Cents>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DraftResponse {
    pub data: Option<serde_json::Value>,
    pub updated_at: Option<i64>,
}

/// POST /api/calculator/split (requires auth)
pub async fn split(Json(req): Json<SplitRequest>) -> Result<Json<SplitResponse>, AppError> {
    if req.people == 0 || req.people > MAX_PEOPLE {
        return Err(AppError::Validation(format!(
            "Number of people must be between 1 and {}",
            MAX_PEOPLE
        )));
    }

    let total = ledger::parse_non_negative(&req.tax)?;
    let shares = ledger::split_evenly(total, req.people)?;

    Ok(Json(SplitResponse { total, shares }))
}

/// GET /api/calculator/draft (requires auth)
pub async fn get_draft(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<DraftResponse>, AppError> {
    let response = match CalculatorRepository::get(&state.db, &user_id).await? {
        Some(draft) => DraftResponse {
            data: Some(serde_json::from_str(&draft.data)?),
            updated_at: Some(draft.updated_at),
        },
        None => DraftResponse {
            data: None,
            updated_at: None,
        },
    };

    Ok(Json(response))
}

/// PUT /api/calculator/draft (requires auth)
pub async fn save_draft(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(data): Json<serde_json::Value>,
) -> Result<Json<DraftResponse>, AppError> {
    if !data.is_object() {
        return Err(AppError::Validation("Calculator data must be a JSON object".to_string()));
    }
    let serialized = serde_json::to_string(&data)?;
    if serialized.len() > MAX_DRAFT_BYTES {
        return Err(AppError::Validation("Calculator data is too large".to_string()));
    }

    let draft = CalculatorRepository::upsert(&state.db, &user_id, &serialized).await?;

    Ok(Json(DraftResponse {
        data: Some(data),
        updated_at: Some(draft.updated_at),
    }))
}

/// DELETE /api/calculator/draft (requires auth)
pub async fn clear_draft(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    CalculatorRepository::delete(&state.db, &user_id).await?;
    Ok(Json(serde_json::json!({"success": true})))
}
