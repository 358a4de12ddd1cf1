//! Error types for the expense access layer.
//!
//! Transport failures come from [`ApiError`]; input that is rejected before
//! any network call is a [`ValidationError`]. [`ExpenseError`] wraps both so
//! callers match on one type.

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("No user id supplied")]
    MissingUser,

    #[error("No expense id supplied")]
    MissingExpenseId,
}

#[derive(Error, Debug)]
pub enum ExpenseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type ExpenseResult<T> = Result<T, ExpenseError>;
