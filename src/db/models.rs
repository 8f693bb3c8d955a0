use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub profile_is_completed: bool,
    #[serde(skip_serializing)]
    pub password_hash: Vec<u8>,
    #[serde(skip_serializing)]
    pub password_salt: Vec<u8>,
    pub created_at: i64,
}

/// Public view of another user, as returned by search and friend lists.
/// Email stays private to its owner.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: i64,
    pub created_at: i64,
}

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

pub const KIND_EXPENSE: &str = "expense";
pub const KIND_SETTLEMENT: &str = "settlement";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Friendship {
    pub id: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: String,
    /// Cents, from the requester's point of view
    pub total_owed: i64,
    pub created_at: i64,
}

impl Friendship {
    pub fn is_accepted(&self) -> bool {
        self.status == STATUS_ACCEPTED
    }

    pub fn other_party(&self, user_id: &str) -> &str {
        if self.requester_id == user_id {
            &self.recipient_id
        } else {
            &self.requester_id
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: String,
    pub friendship_id: String,
    pub description: String,
    pub amount: i64,
    pub payer_id: String,
    pub receiver_id: String,
    pub payed: bool,
    pub settled_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    pub group_id: String,
    pub member_id: String,
    pub role: String,
    pub status: String,
    pub joined_at: Option<i64>,
    pub created_at: i64,
}

/// Membership row joined with the member's profile.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupMemberProfile {
    pub member_id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub role: String,
    pub status: String,
    pub joined_at: Option<i64>,
}

/// Pending invitation joined with its group and the group's creator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupInvite {
    pub group_id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub invited_by: String,
    pub invited_by_name: Option<String>,
    pub created_at: i64,
}

/// Accepted membership joined with its group.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberGroup {
    pub group_id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub role: String,
    pub joined_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupExpense {
    pub id: String,
    pub group_id: String,
    pub kind: String,
    pub description: String,
    pub amount: i64,
    pub payer_id: String,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupExpenseShare {
    pub expense_id: String,
    pub member_id: String,
    pub share: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct CalculatorDraft {
    pub user_id: String,
    pub data: String,
    pub updated_at: i64,
}
