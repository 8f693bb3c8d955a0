use sqlx::{Pool, Sqlite};
use uuid::Uuid;
use crate::db::models::{Friendship, STATUS_ACCEPTED, STATUS_PENDING};
use crate::error::AppError;

pub struct FriendshipRepository;

impl FriendshipRepository {
    /// Inserts a pending request from `requester_id` to `recipient_id`.
    pub async fn create_request(
        pool: &Pool<Sqlite>,
        requester_id: &str,
        recipient_id: &str,
    ) -> Result<Friendship, AppError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let friendship = sqlx::query_as::<_, Friendship>(
            r#"
INSERT INTO friendships (id, requester_id, recipient_id, status, total_owed, created_at)
VALUES (?, ?, ?, ?, 0, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(requester_id)
        .bind(recipient_id)
        .bind(STATUS_PENDING)
        .bind(created_at)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Friend request already exists"))?;

        Ok(friendship)
    }

    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<Option<Friendship>, AppError> {
        let friendship = sqlx::query_as::<_, Friendship>(
            "SELECT * FROM friendships WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(friendship)
    }

    /// The friendship between two users regardless of who sent the request.
    pub async fn get_between(
        pool: &Pool<Sqlite>,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Friendship>, AppError> {
        let friendship = sqlx::query_as::<_, Friendship>(
            r#"
SELECT * FROM friendships
WHERE (requester_id = ? AND recipient_id = ?)
   OR (requester_id = ? AND recipient_id = ?)
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_optional(pool)
        .await?;

        Ok(friendship)
    }

    pub async fn list_for_user(
        pool: &Pool<Sqlite>,
        user_id: &str,
    ) -> Result<Vec<Friendship>, AppError> {
        let friendships = sqlx::query_as::<_, Friendship>(
            r#"
SELECT * FROM friendships
WHERE requester_id = ? OR recipient_id = ?
ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(friendships)
    }

    /// Flips a pending request to accepted. Returns `None` when the row was
    /// not pending any more.
    pub async fn accept(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<Option<Friendship>, AppError> {
        let friendship = sqlx::query_as::<_, Friendship>(
            r#"
UPDATE friendships SET status = ?
WHERE id = ? AND status = ?
RETURNING *
            "#,
        )
        .bind(STATUS_ACCEPTED)
        .bind(id)
        .bind(STATUS_PENDING)
        .fetch_optional(pool)
        .await?;

        Ok(friendship)
    }

    /// Deletes a request only while it is still pending.
    pub async fn delete_pending(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM friendships WHERE id = ? AND status = ?")
            .bind(id)
            .bind(STATUS_PENDING)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool};

    #[tokio::test]
    async fn test_one_friendship_per_pair() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;

        FriendshipRepository::create_request(&pool, &ana.id, &ben.id).await.unwrap();
        let err = FriendshipRepository::create_request(&pool, &ben.id, &ana.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_between_is_symmetric() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;

        let created = FriendshipRepository::create_request(&pool, &ana.id, &ben.id).await.unwrap();
        let found = FriendshipRepository::get_between(&pool, &ben.id, &ana.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.other_party(&ben.id), ana.id);
    }

    #[tokio::test]
    async fn test_accept_only_once() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;

        let request = FriendshipRepository::create_request(&pool, &ana.id, &ben.id).await.unwrap();
        let accepted = FriendshipRepository::accept(&pool, &request.id).await.unwrap().unwrap();
        assert!(accepted.is_accepted());
        assert!(FriendshipRepository::accept(&pool, &request.id).await.unwrap().is_none());
        assert!(!FriendshipRepository::delete_pending(&pool, &request.id).await.unwrap());
    }
}
