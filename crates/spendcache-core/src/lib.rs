//! spendcache core: a per-user, time-to-live read-through cache in front of a
//! remote REST expense store.
//!
//! The entry point is [`ExpenseService`]. It serves reads from the cache
//! while entries are fresh and sends writes to the store, invalidating
//! cached lists once the store has accepted them.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod utils;

pub use api::{ApiClient, ApiError, ExpenseBackend};
pub use auth::{AuthStatus, Session};
pub use cache::{CacheEntry, CacheStore};
pub use config::Config;
pub use error::{ExpenseError, ExpenseResult, ValidationError};
pub use models::{DateRange, Expense, ExpenseDraft, NewExpense};
pub use service::{Clock, DeletePolicy, ExpenseService, SystemClock};
