use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::api::expense_description;
use crate::api::state::{AppState, AuthUser};
use crate::db::models::{KIND_EXPENSE, KIND_SETTLEMENT, ROLE_ADMIN, STATUS_ACCEPTED};
use crate::db::{
    Group, GroupExpense, GroupExpenseShare, GroupInvite, GroupMember, GroupMemberProfile,
    GroupRepository, MemberGroup, NewGroup, NewGroupExpense, UserRepository,
};
use crate::error::AppError;
use crate::ledger::{self, Balances, Cents, Exchange, SharedExpense};

pub const GROUP_COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7",
    "#DDA0DD", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E9",
];

pub const GROUP_ICONS: [&str; 10] = [
    "🏠", "✈️", "🍔", "🎉", "💼", "🍻", "📚", "🚗", "🎮", "🛒",
];

const MAX_NAME_LEN: usize = 64;
const MAX_GROUP_DESCRIPTION_LEN: usize = 280;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: MemberGroup,
    /// Caller's net position; positive means the group owes them
    pub balance: Cents,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupsResponse {
    pub groups: Vec<GroupSummary>,
    pub invites: Vec<GroupInvite>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub member_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InviteResponse {
    pub invited: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupExpenseView {
    #[serde(flatten)]
    pub expense: GroupExpense,
    pub shares: BTreeMap<String, Cents>,
}

#[derive(Debug, Serialize)]
pub struct GroupDetailResponse {
    pub group: Group,
    pub members: Vec<GroupMemberProfile>,
    pub expenses: Vec<GroupExpenseView>,
    pub balances: Balances,
    pub settle_up: Vec<Exchange>,
}

#[derive(Debug, Deserialize)]
pub struct AddGroupExpenseRequest {
    pub description: String,
    pub amount: String,
    pub paid_by: Option<String>,
    /// Defaults to every accepted member
    pub participants: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SettleUpRequest {
    pub to: String,
    pub amount: String,
}

fn pick<'a>(choice: Option<&'a str>, allowed: &[&'a str], what: &str) -> Result<&'a str, AppError> {
    match choice.map(str::trim) {
        None | Some("") => Ok(allowed[0]),
        Some(value) => allowed
            .iter()
            .copied()
            .find(|candidate| *candidate == value)
            .ok_or_else(|| AppError::Validation(format!("Unknown group {}", what))),
    }
}

/// Deduplicated invitees, minus the caller, each of which must exist.
async fn resolve_invitees(
    state: &AppState,
    user_id: &str,
    ids: &[String],
) -> Result<Vec<String>, AppError> {
    let unique: BTreeSet<String> = ids
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && id != user_id)
        .collect();
    let unique: Vec<String> = unique.into_iter().collect();

    let found = UserRepository::get_summaries(&state.db, &unique).await?;
    if found.len() != unique.len() {
        return Err(AppError::NotFound("One or more invited users do not exist".to_string()));
    }

    Ok(unique)
}

/// The caller's membership, which must be accepted.
async fn require_member(
    state: &AppState,
    group_id: &str,
    user_id: &str,
) -> Result<GroupMember, AppError> {
    GroupRepository::get_by_id(&state.db, group_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    GroupRepository::get_membership(&state.db, group_id, user_id)
        .await?
        .filter(|m| m.status == STATUS_ACCEPTED)
        .ok_or_else(|| AppError::Forbidden("You are not a member of this group".to_string()))
}

async fn accepted_member_ids(state: &AppState, group_id: &str) -> Result<Vec<String>, AppError> {
    Ok(GroupRepository::list_members(&state.db, group_id)
        .await?
        .into_iter()
        .filter(|m| m.status == STATUS_ACCEPTED)
        .map(|m| m.member_id)
        .collect())
}

/// Shares keyed by the expense they belong to.
fn index_shares(rows: Vec<GroupExpenseShare>) -> HashMap<String, Vec<(String, Cents)>> {
    let mut shares: HashMap<String, Vec<(String, Cents)>> = HashMap::new();
    for share in rows {
        shares
            .entry(share.expense_id)
            .or_default()
            .push((share.member_id, share.share));
    }
    shares
}

async fn shared_expenses(
    state: &AppState,
    group_id: &str,
) -> Result<(Vec<GroupExpense>, HashMap<String, Vec<(String, Cents)>>), AppError> {
    let expenses = GroupRepository::list_expenses(&state.db, group_id).await?;
    let shares = index_shares(GroupRepository::list_shares(&state.db, group_id).await?);
    Ok((expenses, shares))
}

/// Net balance of every accepted member, zero for those with no activity yet.
fn member_balances(members: &[GroupMemberProfile], ledger_rows: &[SharedExpense]) -> Balances {
    let mut balances: Balances = members
        .iter()
        .filter(|m| m.status == STATUS_ACCEPTED)
        .map(|m| (m.member_id.clone(), 0))
        .collect();
    for (member_id, amount) in ledger::compute_balances(ledger_rows) {
        *balances.entry(member_id).or_insert(0) += amount;
    }
    balances
}

fn to_ledger(
    expenses: &[GroupExpense],
    shares: &HashMap<String, Vec<(String, Cents)>>,
) -> Vec<SharedExpense> {
    expenses
        .iter()
        .map(|e| SharedExpense {
            payer: e.payer_id.clone(),
            amount: e.amount,
            shares: shares.get(&e.id).cloned().unwrap_or_default(),
        })
        .collect()
}

/// GET /api/groups (requires auth)
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<GroupsResponse>, AppError> {
    let memberships = GroupRepository::list_for_member(&state.db, &user_id).await?;
    let shares = index_shares(GroupRepository::list_shares_for_member(&state.db, &user_id).await?);

    let mut expenses_by_group: HashMap<String, Vec<GroupExpense>> = HashMap::new();
    for expense in GroupRepository::list_expenses_for_member(&state.db, &user_id).await? {
        expenses_by_group
            .entry(expense.group_id.clone())
            .or_default()
            .push(expense);
    }

    let groups = memberships
        .into_iter()
        .map(|group| {
            let balance = expenses_by_group
                .get(&group.group_id)
                .and_then(|expenses| {
                    ledger::compute_balances(&to_ledger(expenses, &shares))
                        .get(&user_id)
                        .copied()
                })
                .unwrap_or(0);
            GroupSummary { balance, group }
        })
        .collect();

    let invites = GroupRepository::list_invites(&state.db, &user_id).await?;

    Ok(Json(GroupsResponse { groups, invites }))
}

/// POST /api/groups (requires auth)
pub async fn create_group(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Json<Group>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Please enter a group name".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Group name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    let description = req.description.trim();
    if description.chars().count() > MAX_GROUP_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be at most {} characters",
            MAX_GROUP_DESCRIPTION_LEN
        )));
    }
    let color = pick(req.color.as_deref(), &GROUP_COLORS, "color")?;
    let icon = pick(req.icon.as_deref(), &GROUP_ICONS, "icon")?;

    let invitees = resolve_invitees(&state, &user_id, &req.member_ids).await?;

    let group = GroupRepository::create(
        &state.db,
        &user_id,
        NewGroup { name, description, color, icon },
        &invitees,
    )
    .await?;

    tracing::info!(group_id = %group.id, invited = invitees.len(), "group created");

    Ok(Json(group))
}

/// GET /api/groups/:id (requires auth)
pub async fn group_detail(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupDetailResponse>, AppError> {
    require_member(&state, &group_id, &user_id).await?;

    let group = GroupRepository::get_by_id(&state.db, &group_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;
    let members = GroupRepository::list_members(&state.db, &group_id).await?;
    let (expenses, mut shares) = shared_expenses(&state, &group_id).await?;

    let ledger_rows = to_ledger(&expenses, &shares);
    let balances = member_balances(&members, &ledger_rows);
    let settle_up = ledger::settle_up_plan(&ledger_rows);

    let expenses = expenses
        .into_iter()
        .map(|expense| GroupExpenseView {
            shares: shares.remove(&expense.id).unwrap_or_default().into_iter().collect(),
            expense,
        })
        .collect();

    Ok(Json(GroupDetailResponse {
        group,
        members,
        expenses,
        balances,
        settle_up,
    }))
}

/// POST /api/groups/:id/members (requires auth, admins only)
pub async fn invite_members(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(group_id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteResponse>, AppError> {
    let membership = require_member(&state, &group_id, &user_id).await?;
    if membership.role != ROLE_ADMIN {
        return Err(AppError::Forbidden("Only group admins can invite members".to_string()));
    }

    let invitees = resolve_invitees(&state, &user_id, &req.member_ids).await?;
    let invited = GroupRepository::invite(&state.db, &group_id, &invitees).await?;

    Ok(Json(InviteResponse { invited }))
}

/// POST /api/groups/:id/invite/accept (requires auth)
pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupMember>, AppError> {
    let member = GroupRepository::accept_invite(&state.db, &group_id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group invitation not found".to_string()))?;

    tracing::info!(group_id = %group_id, "group invitation accepted");
    Ok(Json(member))
}

/// POST /api/groups/:id/invite/decline (requires auth)
pub async fn decline_invite(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !GroupRepository::decline_invite(&state.db, &group_id, &user_id).await? {
        return Err(AppError::NotFound("Group invitation not found".to_string()));
    }

    Ok(Json(serde_json::json!({"success": true})))
}

/// POST /api/groups/:id/expenses (requires auth)
pub async fn add_group_expense(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(group_id): Path<String>,
    Json(req): Json<AddGroupExpenseRequest>,
) -> Result<Json<GroupExpenseView>, AppError> {
    require_member(&state, &group_id, &user_id).await?;

    let description = expense_description(&req.description)?;
    let amount = ledger::parse_amount(&req.amount)?;

    let members = accepted_member_ids(&state, &group_id).await?;
    let payer_id = req.paid_by.unwrap_or_else(|| user_id.clone());
    if !members.contains(&payer_id) {
        return Err(AppError::Validation("The payer must be a group member".to_string()));
    }

    let participants: Vec<String> = match req.participants {
        Some(ids) => {
            let unique: BTreeSet<String> = ids.into_iter().collect();
            if unique.iter().any(|id| !members.contains(id)) {
                return Err(AppError::Validation(
                    "Every participant must be a group member".to_string(),
                ));
            }
            unique.into_iter().collect()
        }
        None => members,
    };

    if participants.is_empty() {
        return Err(AppError::Validation("An expense needs at least one participant".to_string()));
    }
    let split = ledger::split_evenly(amount, participants.len())?;
    let shares: Vec<(String, Cents)> = participants.into_iter().zip(split).collect();

    let expense = GroupRepository::add_expense(
        &state.db,
        &group_id,
        NewGroupExpense {
            kind: KIND_EXPENSE,
            description,
            amount,
            payer_id: &payer_id,
            created_by: &user_id,
            shares: &shares,
        },
    )
    .await?;

    tracing::info!(group_id = %group_id, expense_id = %expense.id, amount = %ledger::format_cents(amount), "group expense recorded");

    Ok(Json(GroupExpenseView {
        expense,
        shares: shares.into_iter().collect(),
    }))
}

/// POST /api/groups/:id/settlements (requires auth)
///
/// Records that the caller paid `to` back; it enters the group ledger as an
/// expense of the caller whose only share belongs to `to`.
pub async fn settle_up(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(group_id): Path<String>,
    Json(req): Json<SettleUpRequest>,
) -> Result<Json<GroupExpenseView>, AppError> {
    require_member(&state, &group_id, &user_id).await?;

    let amount = ledger::parse_amount(&req.amount)?;
    let to = req.to.trim();
    if to == user_id {
        return Err(AppError::Validation("You cannot settle up with yourself".to_string()));
    }
    let members = accepted_member_ids(&state, &group_id).await?;
    if !members.iter().any(|m| m == to) {
        return Err(AppError::Validation("The recipient must be a group member".to_string()));
    }

    let shares = vec![(to.to_string(), amount)];
    let expense = GroupRepository::add_expense(
        &state.db,
        &group_id,
        NewGroupExpense {
            kind: KIND_SETTLEMENT,
            description: "Settlement",
            amount,
            payer_id: &user_id,
            created_by: &user_id,
            shares: &shares,
        },
    )
    .await?;

    tracing::info!(group_id = %group_id, expense_id = %expense.id, amount = %ledger::format_cents(amount), "group settlement recorded");

    Ok(Json(GroupExpenseView {
        expense,
        shares: shares.into_iter().collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_defaults_to_first_choice() {
        assert_eq!(pick(None, &GROUP_COLORS, "color").unwrap(), "#FF6B6B");
        assert_eq!(pick(Some("  "), &GROUP_ICONS, "icon").unwrap(), "🏠");
    }

    fn profile(member_id: &str, status: &str) -> GroupMemberProfile {
        GroupMemberProfile {
            member_id: member_id.to_string(),
            name: None,
            username: None,
            role: "member".to_string(),
            status: status.to_string(),
            joined_at: None,
        }
    }

    #[test]
    fn test_member_balances_include_idle_members() {
        let members = vec![
            profile("ana", STATUS_ACCEPTED),
            profile("ben", STATUS_ACCEPTED),
            profile("cat", STATUS_ACCEPTED),
            profile("dan", "pending"),
        ];
        let rows = vec![SharedExpense {
            payer: "ana".to_string(),
            amount: 1000,
            shares: vec![("ana".to_string(), 500), ("ben".to_string(), 500)],
        }];

        let balances = member_balances(&members, &rows);
        assert_eq!(balances.get("ana"), Some(&500));
        assert_eq!(balances.get("ben"), Some(&-500));
        assert_eq!(balances.get("cat"), Some(&0));
        assert!(!balances.contains_key("dan"));
    }

    #[test]
    fn test_pick_rejects_unknown_choice() {
        assert_eq!(pick(Some("#45B7D1"), &GROUP_COLORS, "color").unwrap(), "#45B7D1");
        assert!(matches!(
            pick(Some("#000000"), &GROUP_COLORS, "color"),
            Err(AppError::Validation(_))
        ));
    }
}
