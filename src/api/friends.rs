use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::expense_description;
use crate::api::state::{AppState, AuthUser};
use crate::db::{
    Expense, ExpenseRepository, Friendship, FriendshipRepository, UserRepository, UserSummary,
};
use crate::error::AppError;
use crate::ledger::{self, Cents};

const UNKNOWN_USER: &str = "Unknown User";

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    pub friend_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendEntry {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub friendship_id: String,
    /// Positive when the friend owes the caller
    pub balance: Cents,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestEntry {
    pub friendship_id: String,
    pub user_id: String,
    pub name: String,
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendsResponse {
    pub friends: Vec<FriendEntry>,
    pub incoming: Vec<RequestEntry>,
    pub outgoing: Vec<RequestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendProfileResponse {
    pub friendship_id: String,
    pub friend: UserSummary,
    pub balance: Cents,
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Deserialize)]
pub struct AddExpenseRequest {
    pub description: String,
    pub amount: String,
    /// Defaults to the caller
    pub paid_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpenseResponse {
    pub expense: Expense,
    pub balance: Cents,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub friendship_id: String,
    pub previous_balance: Cents,
    pub balance: Cents,
    pub repaired: bool,
}

fn display_name(user: Option<&UserSummary>) -> String {
    user.and_then(|u| u.name.clone())
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

fn request_entry(
    friendship: &Friendship,
    other_id: &str,
    users: &HashMap<String, UserSummary>,
) -> RequestEntry {
    let other = users.get(other_id);
    RequestEntry {
        friendship_id: friendship.id.clone(),
        user_id: other_id.to_string(),
        name: display_name(other),
        username: other.and_then(|u| u.username.clone()),
    }
}

/// Accepted friendship between the caller and `friend_id`.
async fn accepted_friendship(
    state: &AppState,
    user_id: &str,
    friend_id: &str,
) -> Result<Friendship, AppError> {
    FriendshipRepository::get_between(&state.db, user_id, friend_id)
        .await?
        .filter(Friendship::is_accepted)
        .ok_or_else(|| AppError::NotFound("Friendship not found".to_string()))
}

/// GET /api/friends (requires auth)
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<FriendsResponse>, AppError> {
    let friendships = FriendshipRepository::list_for_user(&state.db, &user_id).await?;

    let other_ids: Vec<String> = friendships
        .iter()
        .map(|f| f.other_party(&user_id).to_string())
        .collect();
    let users: HashMap<String, UserSummary> = UserRepository::get_summaries(&state.db, &other_ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    let mut response = FriendsResponse {
        friends: Vec::new(),
        incoming: Vec::new(),
        outgoing: Vec::new(),
    };

    for friendship in &friendships {
        let other_id = friendship.other_party(&user_id);
        if friendship.is_accepted() {
            let friend = users.get(other_id);
            response.friends.push(FriendEntry {
                id: other_id.to_string(),
                name: display_name(friend),
                username: friend.and_then(|u| u.username.clone()),
                friendship_id: friendship.id.clone(),
                balance: ledger::balance_for(&user_id, &friendship.requester_id, friendship.total_owed),
            });
        } else if friendship.recipient_id == user_id {
            response.incoming.push(request_entry(friendship, other_id, &users));
        } else {
            response.outgoing.push(request_entry(friendship, other_id, &users));
        }
    }

    Ok(Json(response))
}

/// POST /api/friends/requests (requires auth)
pub async fn send_request(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<FriendRequestBody>,
) -> Result<Json<Friendship>, AppError> {
    let friend_id = req.friend_id.trim();
    if friend_id == user_id {
        return Err(AppError::Validation("You cannot add yourself as a friend".to_string()));
    }

    UserRepository::get_by_id(&state.db, friend_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(existing) = FriendshipRepository::get_between(&state.db, &user_id, friend_id).await? {
        return Err(AppError::Conflict(if existing.is_accepted() {
            "You are already friends".to_string()
        } else {
            "Friend request already pending".to_string()
        }));
    }

    let friendship = FriendshipRepository::create_request(&state.db, &user_id, friend_id).await?;
    tracing::info!(friendship_id = %friendship.id, "friend request sent");

    Ok(Json(friendship))
}

/// POST /api/friends/requests/:id/accept (requires auth)
pub async fn accept_request(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(friendship_id): Path<String>,
) -> Result<Json<Friendship>, AppError> {
    let friendship = FriendshipRepository::get_by_id(&state.db, &friendship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

    if friendship.recipient_id != user_id {
        return Err(AppError::Forbidden(
            "Only the recipient can accept a friend request".to_string(),
        ));
    }

    let accepted = FriendshipRepository::accept(&state.db, &friendship_id)
        .await?
        .ok_or_else(|| AppError::Conflict("Friend request was already accepted".to_string()))?;

    Ok(Json(accepted))
}

/// DELETE /api/friends/requests/:id (requires auth)
pub async fn decline_request(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(friendship_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let friendship = FriendshipRepository::get_by_id(&state.db, &friendship_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

    if friendship.recipient_id != user_id && friendship.requester_id != user_id {
        return Err(AppError::Forbidden("Not your friend request".to_string()));
    }

    if !FriendshipRepository::delete_pending(&state.db, &friendship_id).await? {
        return Err(AppError::Conflict("Friendship is no longer pending".to_string()));
    }

    Ok(Json(serde_json::json!({"success": true})))
}

/// GET /api/friends/:friend_id (requires auth)
pub async fn friend_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(friend_id): Path<String>,
) -> Result<Json<FriendProfileResponse>, AppError> {
    let friendship = accepted_friendship(&state, &user_id, &friend_id).await?;

    let friend = UserRepository::get_summaries(&state.db, &[friend_id])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let expenses = ExpenseRepository::list_for_friendship(&state.db, &friendship.id).await?;

    Ok(Json(FriendProfileResponse {
        balance: ledger::balance_for(&user_id, &friendship.requester_id, friendship.total_owed),
        friendship_id: friendship.id,
        friend,
        expenses,
    }))
}

/// POST /api/friends/:friend_id/expenses (requires auth)
pub async fn add_expense(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(friend_id): Path<String>,
    Json(req): Json<AddExpenseRequest>,
) -> Result<Json<ExpenseResponse>, AppError> {
    if req.amount.trim().is_empty() {
        return Err(AppError::Validation("Please fill in all fields".to_string()));
    }
    let description = expense_description(&req.description)?;
    let amount = ledger::parse_amount(&req.amount)?;

    let payer_id = req.paid_by.unwrap_or_else(|| user_id.clone());
    if payer_id != user_id && payer_id != friend_id {
        return Err(AppError::Validation(
            "An expense must be paid by you or your friend".to_string(),
        ));
    }

    let friendship = accepted_friendship(&state, &user_id, &friend_id).await?;
    let recorded =
        ExpenseRepository::record(&state.db, &friendship, description, amount, &payer_id).await?;

    tracing::info!(
        expense_id = %recorded.expense.id,
        friendship_id = %friendship.id,
        amount = %ledger::format_cents(amount),
        "expense recorded"
    );

    Ok(Json(ExpenseResponse {
        balance: ledger::balance_for(
            &user_id,
            &recorded.friendship.requester_id,
            recorded.friendship.total_owed,
        ),
        expense: recorded.expense,
    }))
}

/// POST /api/expenses/:id/settle (requires auth)
pub async fn settle_expense(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(expense_id): Path<String>,
) -> Result<Json<ExpenseResponse>, AppError> {
    let expense = ExpenseRepository::get_by_id(&state.db, &expense_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

    if expense.payer_id != user_id && expense.receiver_id != user_id {
        return Err(AppError::Forbidden("Not your expense".to_string()));
    }

    let settled = ExpenseRepository::settle(&state.db, &expense_id).await?;
    tracing::info!(expense_id = %expense_id, "expense settled");

    Ok(Json(ExpenseResponse {
        balance: ledger::balance_for(
            &user_id,
            &settled.friendship.requester_id,
            settled.friendship.total_owed,
        ),
        expense: settled.expense,
    }))
}

/// POST /api/friends/:friend_id/reconcile (requires auth)
pub async fn reconcile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(friend_id): Path<String>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let friendship = accepted_friendship(&state, &user_id, &friend_id).await?;
    let result = ExpenseRepository::reconcile(&state.db, &friendship.id).await?;

    if result.repaired() {
        tracing::warn!(
            friendship_id = %friendship.id,
            stored = result.stored,
            expected = result.expected,
            "friendship balance drifted from its expenses, repaired"
        );
    }

    let view = |total: Cents| ledger::balance_for(&user_id, &friendship.requester_id, total);
    Ok(Json(ReconcileResponse {
        previous_balance: view(result.stored),
        balance: view(result.expected),
        repaired: result.repaired(),
        friendship_id: friendship.id.clone(),
    }))
}
