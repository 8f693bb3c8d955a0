use sqlx::{Pool, Sqlite};
use uuid::Uuid;
use crate::db::models::{Expense, Friendship};
use crate::error::AppError;
use crate::ledger::{self, Cents};

pub struct ExpenseRepository;

/// Expense together with the friendship row as it stands after the write.
#[derive(Debug, Clone)]
pub struct SettledExpense {
    pub expense: Expense,
    pub friendship: Friendship,
}

/// Outcome of recomputing a friendship balance from its expense rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub stored: Cents,
    pub expected: Cents,
}

impl Reconciliation {
    pub fn repaired(&self) -> bool {
        self.stored != self.expected
    }
}

impl ExpenseRepository {
    /// Inserts the expense row and applies its delta to the friendship balance
    /// in one transaction.
    pub async fn record(
        pool: &Pool<Sqlite>,
        friendship: &Friendship,
        description: &str,
        amount: Cents,
        payer_id: &str,
    ) -> Result<SettledExpense, AppError> {
        let receiver_id = friendship.other_party(payer_id).to_string();
        let delta = ledger::expense_delta(&friendship.requester_id, payer_id, amount);
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await?;

        let expense = sqlx::query_as::<_, Expense>(
            r#"
INSERT INTO expenses (id, friendship_id, description, amount, payer_id, receiver_id, payed, created_at)
VALUES (?, ?, ?, ?, ?, ?, 0, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&friendship.id)
        .bind(description)
        .bind(amount)
        .bind(payer_id)
        .bind(&receiver_id)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        let friendship = sqlx::query_as::<_, Friendship>(
            "UPDATE friendships SET total_owed = total_owed + ? WHERE id = ? RETURNING *"
        )
        .bind(delta)
        .bind(&friendship.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SettledExpense { expense, friendship })
    }

    /// Marks an expense as payed and reverses its delta, in one transaction.
    /// An expense can only be settled once.
    pub async fn settle(
        pool: &Pool<Sqlite>,
        expense_id: &str,
    ) -> Result<SettledExpense, AppError> {
        let settled_at = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await?;

        let expense = sqlx::query_as::<_, Expense>(
            r#"
UPDATE expenses SET payed = 1, settled_at = ?
WHERE id = ? AND payed = 0
RETURNING *
            "#,
        )
        .bind(settled_at)
        .bind(expense_id)
        .fetch_optional(&mut *tx)
        .await?;

        let expense = match expense {
            Some(expense) => expense,
            None => {
                let exists: Option<(String,)> =
                    sqlx::query_as("SELECT id FROM expenses WHERE id = ?")
                        .bind(expense_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match exists {
                    Some(_) => AppError::Conflict("Expense is already settled".to_string()),
                    None => AppError::NotFound("Expense not found".to_string()),
                });
            }
        };

        let (requester_id,): (String,) =
            sqlx::query_as("SELECT requester_id FROM friendships WHERE id = ?")
                .bind(&expense.friendship_id)
                .fetch_one(&mut *tx)
                .await?;
        let delta = ledger::expense_delta(&requester_id, &expense.payer_id, expense.amount);

        let friendship = sqlx::query_as::<_, Friendship>(
            "UPDATE friendships SET total_owed = total_owed - ? WHERE id = ? RETURNING *"
        )
        .bind(delta)
        .bind(&expense.friendship_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SettledExpense { expense, friendship })
    }

    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<Option<Expense>, AppError> {
        let expense = sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(expense)
    }

    /// All expenses of a friendship, newest first.
    pub async fn list_for_friendship(
        pool: &Pool<Sqlite>,
        friendship_id: &str,
    ) -> Result<Vec<Expense>, AppError> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
SELECT * FROM expenses
WHERE friendship_id = ?
ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(friendship_id)
        .fetch_all(pool)
        .await?;

        Ok(expenses)
    }

    /// Recomputes `total_owed` from the unsettled rows and overwrites the stored
    /// counter when the two disagree.
    pub async fn reconcile(
        pool: &Pool<Sqlite>,
        friendship_id: &str,
    ) -> Result<Reconciliation, AppError> {
        let mut tx = pool.begin().await?;

        let friendship = sqlx::query_as::<_, Friendship>(
            "SELECT * FROM friendships WHERE id = ?"
        )
        .bind(friendship_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Friendship not found".to_string()))?;

        let unsettled: Vec<(String, i64)> = sqlx::query_as(
            "SELECT payer_id, amount FROM expenses WHERE friendship_id = ? AND payed = 0"
        )
        .bind(friendship_id)
        .fetch_all(&mut *tx)
        .await?;

        let expected = ledger::expected_total_owed(
            &friendship.requester_id,
            unsettled.iter().map(|(payer, amount)| (payer.as_str(), *amount)),
        );
        let reconciliation = Reconciliation {
            stored: friendship.total_owed,
            expected,
        };

        if reconciliation.repaired() {
            sqlx::query("UPDATE friendships SET total_owed = ? WHERE id = ?")
                .bind(expected)
                .bind(friendship_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(reconciliation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_user, test_pool, FriendshipRepository};

    async fn friends(pool: &Pool<Sqlite>) -> (String, String, Friendship) {
        let ana = seed_user(pool, "ana").await;
        let ben = seed_user(pool, "ben").await;
        let request = FriendshipRepository::create_request(pool, &ana.id, &ben.id).await.unwrap();
        let friendship = FriendshipRepository::accept(pool, &request.id).await.unwrap().unwrap();
        (ana.id, ben.id, friendship)
    }

    #[tokio::test]
    async fn test_record_updates_balance() {
        let pool = test_pool().await;
        let (ana, ben, friendship) = friends(&pool).await;

        let first = ExpenseRepository::record(&pool, &friendship, "Dinner", 3000, &ana).await.unwrap();
        assert_eq!(first.friendship.total_owed, 3000);
        assert_eq!(first.expense.receiver_id, ben);

        let second = ExpenseRepository::record(&pool, &friendship, "Taxi", 1200, &ben).await.unwrap();
        assert_eq!(second.friendship.total_owed, 1800);
        assert_eq!(second.expense.receiver_id, ana);
    }

    #[tokio::test]
    async fn test_settle_reverses_once() {
        let pool = test_pool().await;
        let (_ana, ben, friendship) = friends(&pool).await;

        let recorded = ExpenseRepository::record(&pool, &friendship, "Lunch", 800, &ben).await.unwrap();
        assert_eq!(recorded.friendship.total_owed, -800);

        let settled = ExpenseRepository::settle(&pool, &recorded.expense.id).await.unwrap();
        assert!(settled.expense.payed);
        assert!(settled.expense.settled_at.is_some());
        assert_eq!(settled.friendship.total_owed, 0);

        let err = ExpenseRepository::settle(&pool, &recorded.expense.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let friendship = FriendshipRepository::get_by_id(&pool, &friendship.id).await.unwrap().unwrap();
        assert_eq!(friendship.total_owed, 0);
    }

    #[tokio::test]
    async fn test_settle_unknown_expense() {
        let pool = test_pool().await;
        let err = ExpenseRepository::settle(&pool, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let pool = test_pool().await;
        let (ana, ben, friendship) = friends(&pool).await;

        ExpenseRepository::record(&pool, &friendship, "Rent", 50000, &ana).await.unwrap();
        let taxi = ExpenseRepository::record(&pool, &friendship, "Taxi", 1500, &ben).await.unwrap();
        ExpenseRepository::settle(&pool, &taxi.expense.id).await.unwrap();

        let clean = ExpenseRepository::reconcile(&pool, &friendship.id).await.unwrap();
        assert_eq!(clean, Reconciliation { stored: 50000, expected: 50000 });
        assert!(!clean.repaired());

        // simulate a counter that drifted from its rows
        sqlx::query("UPDATE friendships SET total_owed = 12 WHERE id = ?")
            .bind(&friendship.id)
            .execute(&pool)
            .await
            .unwrap();
        let repaired = ExpenseRepository::reconcile(&pool, &friendship.id).await.unwrap();
        assert!(repaired.repaired());
        assert_eq!(repaired.stored, 12);

        let friendship = FriendshipRepository::get_by_id(&pool, &friendship.id).await.unwrap().unwrap();
        assert_eq!(friendship.total_owed, 50000);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let pool = test_pool().await;
        let (ana, _ben, friendship) = friends(&pool).await;

        ExpenseRepository::record(&pool, &friendship, "First", 100, &ana).await.unwrap();
        ExpenseRepository::record(&pool, &friendship, "Second", 200, &ana).await.unwrap();

        let expenses = ExpenseRepository::list_for_friendship(&pool, &friendship.id).await.unwrap();
        let descriptions: Vec<_> = expenses.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Second", "First"]);
    }
}
