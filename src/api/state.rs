use std::sync::Arc;
use sqlx::{Pool, Sqlite};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub config: Arc<Config>,
}

/// Id of the user behind the bearer token, set by the auth middleware.
#[derive(Clone, Debug)]
pub struct AuthUser(pub String);
