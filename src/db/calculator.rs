use sqlx::{Pool, Sqlite};
use crate::db::models::CalculatorDraft;
use crate::error::AppError;

pub struct CalculatorRepository;

impl CalculatorRepository {
    pub async fn upsert(
        pool: &Pool<Sqlite>,
        user_id: &str,
        data: &str,
    ) -> Result<CalculatorDraft, AppError> {
        let updated_at = chrono::Utc::now().timestamp();

        let draft = sqlx::query_as::<_, CalculatorDraft>(
            r#"
INSERT INTO calculator_drafts (user_id, data, updated_at)
VALUES (?, ?, ?)
ON CONFLICT (user_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data)
        .bind(updated_at)
        .fetch_one(pool)
        .await?;

        Ok(draft)
    }

    pub async fn get(
        pool: &Pool<Sqlite>,
        user_id: &str,
    ) -> Result<Option<CalculatorDraft>, AppError> {
        let draft = sqlx::query_as::<_, CalculatorDraft>(
            "SELECT * FROM calculator_drafts WHERE user_id = ?"
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(draft)
    }

    pub async fn delete(
        pool: &Pool<Sqlite>,
        user_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM calculator_drafts WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool};

    #[tokio::test]
    async fn test_upsert_replaces_previous_draft() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "ana").await;

        CalculatorRepository::upsert(&pool, &user.id, r#"{"tax":"1"}"#).await.unwrap();
        CalculatorRepository::upsert(&pool, &user.id, r#"{"tax":"2"}"#).await.unwrap();

        let draft = CalculatorRepository::get(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(draft.data, r#"{"tax":"2"}"#);

        CalculatorRepository::delete(&pool, &user.id).await.unwrap();
        assert!(CalculatorRepository::get(&pool, &user.id).await.unwrap().is_none());
    }
}
