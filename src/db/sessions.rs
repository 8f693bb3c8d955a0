use sqlx::{Pool, Sqlite};
use uuid::Uuid;
use crate::crypto::generate_session_token;
use crate::db::models::Session;
use crate::error::AppError;

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        user_id: &str,
        expiry_hours: i64,
    ) -> Result<Session, AppError> {
        let id = Uuid::new_v4().to_string();
        let token = generate_session_token();
        let created_at = chrono::Utc::now().timestamp();
        let expires_at = created_at + (expiry_hours * 3600);

        let session = sqlx::query_as::<_, Session>(
            r#"
INSERT INTO sessions (id, user_id, token, expires_at, created_at)
VALUES (?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&token)
        .bind(expires_at)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    pub async fn get_by_token(
        pool: &Pool<Sqlite>,
        token: &str,
    ) -> Result<Option<Session>, AppError> {
        let now = chrono::Utc::now().timestamp();

        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token = ? AND expires_at > ?"
        )
        .bind(token)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    pub async fn delete(
        pool: &Pool<Sqlite>,
        token: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Returns how many sessions were removed.
    pub async fn cleanup_expired(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool};

    #[tokio::test]
    async fn test_session_lifecycle() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "maria").await;

        let session = SessionRepository::create(&pool, &user.id, 1).await.unwrap();
        let found = SessionRepository::get_by_token(&pool, &session.token).await.unwrap();
        assert_eq!(found.unwrap().user_id, user.id);

        SessionRepository::delete(&pool, &session.token).await.unwrap();
        assert!(SessionRepository::get_by_token(&pool, &session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_invisible_and_swept() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "maria").await;

        let expired = SessionRepository::create(&pool, &user.id, -1).await.unwrap();
        SessionRepository::create(&pool, &user.id, 1).await.unwrap();

        assert!(SessionRepository::get_by_token(&pool, &expired.token).await.unwrap().is_none());
        assert_eq!(SessionRepository::cleanup_expired(&pool).await.unwrap(), 1);
    }
}
