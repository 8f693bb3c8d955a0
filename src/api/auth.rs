use axum::{
    extract::State,
    http::HeaderMap,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::bearer_token;
use crate::api::state::{AppState, AuthUser};
use crate::crypto::{generate_salt, hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::db::{SessionRepository, User, UserRepository};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub profile_is_completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub expires_at: i64,
    pub user_id: String,
    pub profile_is_completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompleteProfileRequest {
    pub name: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub profile_is_completed: bool,
}

impl From<User> for UserInfoResponse {
    fn from(user: User) -> Self {
        UserInfoResponse {
            user_id: user.id,
            email: user.email,
            name: user.name,
            username: user.username,
            profile_is_completed: user.profile_is_completed,
        }
    }
}

/// Trim, lower-case and sanity check an email address
fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();

    let valid = email.len() >= 3
        && email.len() <= 254
        && !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };

    if !valid {
        return Err(AppError::Validation("Please enter a valid email address".to_string()));
    }
    Ok(email)
}

/// Validate and sanitize username
pub fn validate_username(username: &str) -> Result<String, AppError> {
    let trimmed = username.trim();

    if trimmed.len() < 3 || trimmed.len() > 32 {
        return Err(AppError::Validation("Username must be 3-32 characters".to_string()));
    }

    if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Username must be alphanumeric, underscore, or hyphen".to_string(),
        ));
    }

    Ok(trimmed.to_lowercase())
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let email = validate_email(&req.email)?;

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if UserRepository::get_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let salt = generate_salt();
    let password_hash = hash_password(&req.password, &salt)?;

    let user = UserRepository::create(&state.db, &email, &password_hash, &salt).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(RegisterResponse {
        user_id: user.id,
        profile_is_completed: user.profile_is_completed,
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::Auth("Invalid credentials".to_string());
    let email = validate_email(&req.email).map_err(|_| invalid())?;

    let user = UserRepository::get_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash, &user.password_salt)? {
        return Err(invalid());
    }

    let session = SessionRepository::create(
        &state.db,
        &user.id,
        state.config.session_expiry_hours,
    ).await?;

    Ok(Json(LoginResponse {
        session_token: session.token,
        expires_at: session.expires_at,
        user_id: user.id,
        profile_is_completed: user.profile_is_completed,
    }))
}

/// POST /api/auth/logout (requires auth)
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer_token(&headers)?;
    SessionRepository::delete(&state.db, token).await?;

    Ok(Json(serde_json::json!({"success": true})))
}

/// GET /api/auth/me (requires auth)
pub async fn me(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<UserInfoResponse>, AppError> {
    let user = UserRepository::get_by_id(&state.db, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// PUT /api/auth/profile (requires auth)
pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CompleteProfileRequest>,
) -> Result<Json<UserInfoResponse>, AppError> {
    let name = req.name.trim();
    if name.is_empty() || req.username.trim().is_empty() {
        return Err(AppError::Validation("All fields are required.".to_string()));
    }
    if name.chars().count() > 64 {
        return Err(AppError::Validation("Name must be at most 64 characters".to_string()));
    }
    let username = validate_username(&req.username)?;

    let user = UserRepository::complete_profile(&state.db, &user_id, name, &username).await?;

    Ok(Json(user.into()))
}
