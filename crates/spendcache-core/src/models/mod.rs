//! Data models for expense records.
//!
//! - `Expense`: a record as stored by the remote service
//! - `NewExpense`: the body submitted when creating a record
//! - `ExpenseDraft`: validated user input for a new record
//! - `DateRange`: inclusive date filter applied to cached or fetched lists

pub mod expense;

pub use expense::{
    filter_by_date, parse_amount, parse_wire_date, total_amount, DateRange, Expense,
    ExpenseDraft, NewExpense, WIRE_DATE_FORMAT,
};
