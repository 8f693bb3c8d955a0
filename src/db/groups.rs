use sqlx::{Pool, Sqlite};
use uuid::Uuid;
use crate::db::models::{
    Group, GroupExpense, GroupExpenseShare, GroupInvite, GroupMember, GroupMemberProfile,
    MemberGroup, ROLE_ADMIN, ROLE_MEMBER, STATUS_ACCEPTED, STATUS_PENDING,
};
use crate::error::AppError;
use crate::ledger::Cents;

/// Fields of a group as chosen by its creator.
#[derive(Debug, Clone)]
pub struct NewGroup<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub color: &'a str,
    pub icon: &'a str,
}

/// A group expense or settlement with its per-member shares.
#[derive(Debug, Clone)]
pub struct NewGroupExpense<'a> {
    pub kind: &'a str,
    pub description: &'a str,
    pub amount: Cents,
    pub payer_id: &'a str,
    pub created_by: &'a str,
    pub shares: &'a [(String, Cents)],
}

pub struct GroupRepository;

impl GroupRepository {
    /// Creates the group, its admin membership and the pending invitations in
    /// one transaction.
    pub async fn create(
        pool: &Pool<Sqlite>,
        created_by: &str,
        group: NewGroup<'_>,
        invitees: &[String],
    ) -> Result<Group, AppError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await?;

        let created = sqlx::query_as::<_, Group>(
            r#"
INSERT INTO user_groups (id, name, description, color, icon, created_by, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(group.name)
        .bind(group.description)
        .bind(group.color)
        .bind(group.icon)
        .bind(created_by)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
INSERT INTO group_members (id, group_id, member_id, role, status, joined_at, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(created_by)
        .bind(ROLE_ADMIN)
        .bind(STATUS_ACCEPTED)
        .bind(created_at)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        for member_id in invitees {
            sqlx::query(
                r#"
INSERT OR IGNORE INTO group_members (id, group_id, member_id, role, status, created_at)
VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(member_id)
            .bind(ROLE_MEMBER)
            .bind(STATUS_PENDING)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    pub async fn get_by_id(
        pool: &Pool<Sqlite>,
        id: &str,
    ) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT * FROM user_groups WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(group)
    }

    pub async fn get_membership(
        pool: &Pool<Sqlite>,
        group_id: &str,
        member_id: &str,
    ) -> Result<Option<GroupMember>, AppError> {
        let member = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = ? AND member_id = ?"
        )
        .bind(group_id)
        .bind(member_id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Groups the user has joined.
    pub async fn list_for_member(
        pool: &Pool<Sqlite>,
        member_id: &str,
    ) -> Result<Vec<MemberGroup>, AppError> {
        let groups = sqlx::query_as::<_, MemberGroup>(
            r#"
SELECT g.id AS group_id, g.name, g.description, g.color, g.icon,
       gm.role, gm.joined_at, g.created_at
FROM group_members gm
JOIN user_groups g ON g.id = gm.group_id
WHERE gm.member_id = ? AND gm.status = ?
ORDER BY g.created_at DESC
            "#,
        )
        .bind(member_id)
        .bind(STATUS_ACCEPTED)
        .fetch_all(pool)
        .await?;

        Ok(groups)
    }

    pub async fn list_invites(
        pool: &Pool<Sqlite>,
        member_id: &str,
    ) -> Result<Vec<GroupInvite>, AppError> {
        let invites = sqlx::query_as::<_, GroupInvite>(
            r#"
SELECT g.id AS group_id, g.name, g.description, g.color, g.icon,
       g.created_by AS invited_by, u.name AS invited_by_name, gm.created_at
FROM group_members gm
JOIN user_groups g ON g.id = gm.group_id
JOIN users u ON u.id = g.created_by
WHERE gm.member_id = ? AND gm.status = ?
ORDER BY gm.created_at DESC
            "#,
        )
        .bind(member_id)
        .bind(STATUS_PENDING)
        .fetch_all(pool)
        .await?;

        Ok(invites)
    }

    /// Accepts the user's pending invitation. `None` when there is none.
    pub async fn accept_invite(
        pool: &Pool<Sqlite>,
        group_id: &str,
        member_id: &str,
    ) -> Result<Option<GroupMember>, AppError> {
        let joined_at = chrono::Utc::now().timestamp();

        let member = sqlx::query_as::<_, GroupMember>(
            r#"
UPDATE group_members SET status = ?, joined_at = ?
WHERE group_id = ? AND member_id = ? AND status = ?
RETURNING *
            "#,
        )
        .bind(STATUS_ACCEPTED)
        .bind(joined_at)
        .bind(group_id)
        .bind(member_id)
        .bind(STATUS_PENDING)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    pub async fn decline_invite(
        pool: &Pool<Sqlite>,
        group_id: &str,
        member_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM group_members WHERE group_id = ? AND member_id = ? AND status = ?"
        )
        .bind(group_id)
        .bind(member_id)
        .bind(STATUS_PENDING)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Invites users who are not yet members. Returns the ids actually invited.
    pub async fn invite(
        pool: &Pool<Sqlite>,
        group_id: &str,
        member_ids: &[String],
    ) -> Result<Vec<String>, AppError> {
        let created_at = chrono::Utc::now().timestamp();
        let mut invited = Vec::new();

        let mut tx = pool.begin().await?;
        for member_id in member_ids {
            let result = sqlx::query(
                r#"
INSERT OR IGNORE INTO group_members (id, group_id, member_id, role, status, created_at)
VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(group_id)
            .bind(member_id)
            .bind(ROLE_MEMBER)
            .bind(STATUS_PENDING)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                invited.push(member_id.clone());
            }
        }
        tx.commit().await?;

        Ok(invited)
    }

    pub async fn list_members(
        pool: &Pool<Sqlite>,
        group_id: &str,
    ) -> Result<Vec<GroupMemberProfile>, AppError> {
        let members = sqlx::query_as::<_, GroupMemberProfile>(
            r#"
SELECT gm.member_id, u.name, u.username, gm.role, gm.status, gm.joined_at
FROM group_members gm
JOIN users u ON u.id = gm.member_id
WHERE gm.group_id = ?
ORDER BY gm.role = 'admin' DESC, gm.created_at, u.username
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Writes a group expense and its shares in one transaction.
    pub async fn add_expense(
        pool: &Pool<Sqlite>,
        group_id: &str,
        expense: NewGroupExpense<'_>,
    ) -> Result<GroupExpense, AppError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await?;

        let created = sqlx::query_as::<_, GroupExpense>(
            r#"
INSERT INTO group_expenses (id, group_id, kind, description, amount, payer_id, created_by, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(group_id)
        .bind(expense.kind)
        .bind(expense.description)
        .bind(expense.amount)
        .bind(expense.payer_id)
        .bind(expense.created_by)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        for (member_id, share) in expense.shares {
            sqlx::query(
                "INSERT INTO group_expense_shares (expense_id, member_id, share) VALUES (?, ?, ?)"
            )
            .bind(&id)
            .bind(member_id)
            .bind(*share)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    /// Expenses and settlements of a group, newest first.
    pub async fn list_expenses(
        pool: &Pool<Sqlite>,
        group_id: &str,
    ) -> Result<Vec<GroupExpense>, AppError> {
        let expenses = sqlx::query_as::<_, GroupExpense>(
            r#"
SELECT * FROM group_expenses
WHERE group_id = ?
ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(expenses)
    }

    pub async fn list_shares(
        pool: &Pool<Sqlite>,
        group_id: &str,
    ) -> Result<Vec<GroupExpenseShare>, AppError> {
        let shares = sqlx::query_as::<_, GroupExpenseShare>(
            r#"
SELECT s.expense_id, s.member_id, s.share
FROM group_expense_shares s
JOIN group_expenses e ON e.id = s.expense_id
WHERE e.group_id = ?
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(shares)
    }

    /// Expenses of every group the member has joined, newest first.
    pub async fn list_expenses_for_member(
        pool: &Pool<Sqlite>,
        member_id: &str,
    ) -> Result<Vec<GroupExpense>, AppError> {
        let expenses = sqlx::query_as::<_, GroupExpense>(
            r#"
SELECT e.*
FROM group_expenses e
JOIN group_members gm ON gm.group_id = e.group_id
WHERE gm.member_id = ? AND gm.status = ?
ORDER BY e.created_at DESC, e.rowid DESC
            "#,
        )
        .bind(member_id)
        .bind(STATUS_ACCEPTED)
        .fetch_all(pool)
        .await?;

        Ok(expenses)
    }

    pub async fn list_shares_for_member(
        pool: &Pool<Sqlite>,
        member_id: &str,
    ) -> Result<Vec<GroupExpenseShare>, AppError> {
        let shares = sqlx::query_as::<_, GroupExpenseShare>(
            r#"
SELECT s.expense_id, s.member_id, s.share
FROM group_expense_shares s
JOIN group_expenses e ON e.id = s.expense_id
JOIN group_members gm ON gm.group_id = e.group_id
WHERE gm.member_id = ? AND gm.status = ?
            "#,
        )
        .bind(member_id)
        .bind(STATUS_ACCEPTED)
        .fetch_all(pool)
        .await?;

        Ok(shares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::KIND_EXPENSE;
    use crate::db::{seed_user, test_pool};

    fn trip() -> NewGroup<'static> {
        NewGroup {
            name: "Trip",
            description: "Lisbon",
            color: "#FF6B6B",
            icon: "✈️",
        }
    }

    #[tokio::test]
    async fn test_create_adds_admin_and_invites() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;

        let group = GroupRepository::create(&pool, &ana.id, trip(), &[ben.id.clone()]).await.unwrap();

        let admin = GroupRepository::get_membership(&pool, &group.id, &ana.id).await.unwrap().unwrap();
        assert_eq!(admin.role, ROLE_ADMIN);
        assert_eq!(admin.status, STATUS_ACCEPTED);
        assert!(admin.joined_at.is_some());

        let invites = GroupRepository::list_invites(&pool, &ben.id).await.unwrap();
        assert_eq!(invites.len(), 1);
        assert_eq!(invites[0].invited_by, ana.id);
        assert!(GroupRepository::list_for_member(&pool, &ben.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_and_decline_invites() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;
        let cat = seed_user(&pool, "cat").await;

        let group = GroupRepository::create(&pool, &ana.id, trip(), &[ben.id.clone(), cat.id.clone()])
            .await
            .unwrap();

        let joined = GroupRepository::accept_invite(&pool, &group.id, &ben.id).await.unwrap().unwrap();
        assert_eq!(joined.status, STATUS_ACCEPTED);
        assert!(GroupRepository::accept_invite(&pool, &group.id, &ben.id).await.unwrap().is_none());
        assert_eq!(GroupRepository::list_for_member(&pool, &ben.id).await.unwrap().len(), 1);

        assert!(GroupRepository::decline_invite(&pool, &group.id, &cat.id).await.unwrap());
        assert!(GroupRepository::get_membership(&pool, &group.id, &cat.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invite_skips_existing_members() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;
        let cat = seed_user(&pool, "cat").await;

        let group = GroupRepository::create(&pool, &ana.id, trip(), &[ben.id.clone()]).await.unwrap();
        let invited = GroupRepository::invite(&pool, &group.id, &[ana.id.clone(), ben.id.clone(), cat.id.clone()])
            .await
            .unwrap();
        assert_eq!(invited, vec![cat.id]);
        assert_eq!(GroupRepository::list_members(&pool, &group.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_expense_with_shares() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;
        let group = GroupRepository::create(&pool, &ana.id, trip(), &[ben.id.clone()]).await.unwrap();

        let shares = vec![(ana.id.clone(), 500), (ben.id.clone(), 500)];
        let expense = GroupRepository::add_expense(
            &pool,
            &group.id,
            NewGroupExpense {
                kind: KIND_EXPENSE,
                description: "Hotel",
                amount: 1000,
                payer_id: &ana.id,
                created_by: &ana.id,
                shares: &shares,
            },
        )
        .await
        .unwrap();

        assert_eq!(GroupRepository::list_expenses(&pool, &group.id).await.unwrap()[0].id, expense.id);
        let stored = GroupRepository::list_shares(&pool, &group.id).await.unwrap();
        assert_eq!(stored.iter().map(|s| s.share).sum::<i64>(), 1000);
    }

    #[tokio::test]
    async fn test_member_wide_listing_skips_unjoined_groups() {
        let pool = test_pool().await;
        let ana = seed_user(&pool, "ana").await;
        let ben = seed_user(&pool, "ben").await;
        let joined = GroupRepository::create(&pool, &ana.id, trip(), &[ben.id.clone()]).await.unwrap();
        let invited = GroupRepository::create(&pool, &ana.id, trip(), &[ben.id.clone()]).await.unwrap();
        GroupRepository::accept_invite(&pool, &joined.id, &ben.id).await.unwrap();

        let shares = vec![(ana.id.clone(), 300), (ben.id.clone(), 300)];
        for group_id in [&joined.id, &invited.id] {
            GroupRepository::add_expense(
                &pool,
                group_id,
                NewGroupExpense {
                    kind: KIND_EXPENSE,
                    description: "Fuel",
                    amount: 600,
                    payer_id: &ana.id,
                    created_by: &ana.id,
                    shares: &shares,
                },
            )
            .await
            .unwrap();
        }

        let expenses = GroupRepository::list_expenses_for_member(&pool, &ben.id).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].group_id, joined.id);
        assert_eq!(GroupRepository::list_shares_for_member(&pool, &ben.id).await.unwrap().len(), 2);
        assert_eq!(GroupRepository::list_expenses_for_member(&pool, &ana.id).await.unwrap().len(), 2);
    }
}
