pub mod calculator;
pub mod expenses;
pub mod friendships;
pub mod groups;
pub mod models;
pub mod sessions;
pub mod users;

pub use calculator::CalculatorRepository;
pub use expenses::{ExpenseRepository, Reconciliation, SettledExpense};
pub use friendships::FriendshipRepository;
pub use groups::{GroupRepository, NewGroup, NewGroupExpense};
pub use models::{
    CalculatorDraft, Expense, Friendship, Group, GroupExpense, GroupExpenseShare, GroupInvite,
    GroupMember, GroupMemberProfile, MemberGroup, Session, User, UserSummary,
};
pub use sessions::SessionRepository;
pub use users::UserRepository;

use sqlx::{Pool, Sqlite};

use crate::error::AppError;

pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Fresh in-memory database with the schema applied.
#[cfg(test)]
pub async fn test_pool() -> Pool<Sqlite> {
    // A single connection, otherwise each one sees its own empty database
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

/// Inserts a user with a completed profile, bypassing password hashing.
#[cfg(test)]
pub async fn seed_user(pool: &Pool<Sqlite>, username: &str) -> User {
    let user = UserRepository::create(
        pool,
        &format!("{}@example.com", username),
        &[0u8; 32],
        &[0u8; 32],
    )
    .await
    .expect("create user");
    UserRepository::complete_profile(pool, &user.id, &username.to_uppercase(), username)
        .await
        .expect("complete profile")
}
