use sqlx::{Pool, Sqlite};
use uuid::Uuid;
use crate::db::models::{User, UserSummary};
use crate::error::AppError;

pub const SEARCH_LIMIT: i64 = 10;

pub struct UserRepository;

impl UserRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        email: &str,
        password_hash: &[u8; 32],
        password_salt: &[u8; 32],
    ) -> Result<User, AppError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let user = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (id, email, profile_is_completed, password_hash, password_salt, created_at)
VALUES (?, ?, 0, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash.as_slice())
        .bind(password_salt.as_slice())
        .bind(created_at)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Email is already registered"))?;

        Ok(user)
    }

    pub async fn get_by_email(
        pool: &Pool<Sqlite>,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = ?"
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_summaries(
        pool: &Pool<Sqlite>,
        ids: &[String],
    ) -> Result<Vec<UserSummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = sqlx::QueryBuilder::<Sqlite>::new(
            "SELECT id, name, username FROM users WHERE id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let users = builder
            .build_query_as::<UserSummary>()
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    pub async fn complete_profile(
        pool: &Pool<Sqlite>,
        id: &str,
        name: &str,
        username: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
UPDATE users
SET name = ?, username = ?, profile_is_completed = 1
WHERE id = ?
RETURNING *
            "#,
        )
        .bind(name)
        .bind(username)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Username is already taken"))?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    /// Case-insensitive substring search over name, email and username.
    pub async fn search(
        pool: &Pool<Sqlite>,
        query: &str,
        exclude_id: &str,
    ) -> Result<Vec<UserSummary>, AppError> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        let users = sqlx::query_as::<_, UserSummary>(
            r#"
SELECT id, name, username
FROM users
WHERE id <> ?
  AND (LOWER(COALESCE(name, '')) LIKE ? ESCAPE '\'
    OR LOWER(email) LIKE ? ESCAPE '\'
    OR LOWER(COALESCE(username, '')) LIKE ? ESCAPE '\')
ORDER BY COALESCE(username, email)
LIMIT ?
            "#,
        )
        .bind(exclude_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool};

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let pool = test_pool().await;
        UserRepository::create(&pool, "a@example.com", &[1; 32], &[2; 32]).await.unwrap();
        let err = UserRepository::create(&pool, "a@example.com", &[1; 32], &[2; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complete_profile_sets_flag() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "maria").await;
        assert!(user.profile_is_completed);
        assert_eq!(user.username.as_deref(), Some("maria"));
        assert_eq!(user.name.as_deref(), Some("MARIA"));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let pool = test_pool().await;
        seed_user(&pool, "maria").await;
        let other = UserRepository::create(&pool, "other@example.com", &[1; 32], &[2; 32])
            .await
            .unwrap();
        let err = UserRepository::complete_profile(&pool, &other.id, "Other", "maria")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_search_matches_and_excludes_caller() {
        let pool = test_pool().await;
        let maria = seed_user(&pool, "maria").await;
        let mario = seed_user(&pool, "mario").await;
        seed_user(&pool, "zoe").await;

        let found = UserRepository::search(&pool, "MAR", &maria.id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, mario.id);

        let by_email = UserRepository::search(&pool, "mario@example", &maria.id).await.unwrap();
        assert_eq!(by_email, found);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let pool = test_pool().await;
        let maria = seed_user(&pool, "maria").await;
        seed_user(&pool, "mario").await;

        let found = UserRepository::search(&pool, "%", &maria.id).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_get_summaries() {
        let pool = test_pool().await;
        let a = seed_user(&pool, "alpha").await;
        let b = seed_user(&pool, "beta").await;

        let found = UserRepository::get_summaries(&pool, &[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(UserRepository::get_summaries(&pool, &[]).await.unwrap().is_empty());
    }
}
