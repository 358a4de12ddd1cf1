//! REST API module for the remote expense store.
//!
//! This module provides the `ExpenseBackend` trait that the access layer
//! talks to, and `ApiClient`, its HTTP implementation over the store's
//! `/expenses` resource collection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Expense, NewExpense};

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

/// The remote source of truth for expenses.
#[async_trait]
pub trait ExpenseBackend: Send + Sync {
    /// All expenses owned by `user_id`. A missing collection is `ApiError::NotFound`.
    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, ApiError>;

    /// Create an expense and return it with its assigned id.
    async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, ApiError>;

    /// Delete by id and return the record as the store last held it.
    async fn delete_expense(&self, expense_id: &str) -> Result<Expense, ApiError>;
}

#[async_trait]
impl<T: ExpenseBackend + ?Sized> ExpenseBackend for Arc<T> {
    async fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>, ApiError> {
        (**self).list_expenses(user_id).await
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, ApiError> {
        (**self).create_expense(expense).await
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<Expense, ApiError> {
        (**self).delete_expense(expense_id).await
    }
}
