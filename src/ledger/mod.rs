//! Balance arithmetic shared by the friend and group ledgers. Nothing here
//! touches the database.

pub mod friendship;
pub mod money;
pub mod settle;
pub mod split;

pub use friendship::{balance_for, expected_total_owed, expense_delta};
pub use money::{format_cents, parse_amount, parse_non_negative, Cents};
pub use settle::{compute_balances, settle_up_plan, Balances, Exchange, SharedExpense};
pub use split::split_evenly;
