//! Expense-splitting backend: accounts, friendships with a running pairwise
//! balance, groups with a shared ledger, and a small tax-split calculator.

pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod ledger;
