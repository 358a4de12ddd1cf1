//! Expense access layer.
//!
//! `ExpenseService` is the only thing callers talk to. Reads go through the
//! per-user cache; additions and deletions go to the remote store first and
//! invalidate the affected cache entries only once the store has accepted
//! them. Errors are never masked by serving cached data, and nothing here
//! retries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{ApiError, ExpenseBackend};
use crate::cache::{CacheEntry, CacheStore, DEFAULT_TTL_SECS};
use crate::error::{ExpenseResult, ValidationError};
use crate::models::{filter_by_date, total_amount, DateRange, Expense, ExpenseDraft};

/// Source of "now" for TTL checks and `createdAt` stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Which cache entries a successful delete invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Only the owner named in the deleted record; everything if the owner is unknown
    #[default]
    OwnerOnly,
    /// Every user's entry
    InvalidateAll,
}

pub struct ExpenseService<B> {
    backend: B,
    cache: Mutex<CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    delete_policy: DeletePolicy,
}

impl<B: ExpenseBackend> ExpenseService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: Mutex::new(CacheStore::new()),
            clock: Arc::new(SystemClock),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            delete_policy: DeletePolicy::default(),
        }
    }

    /// Start from an existing cache store instead of an empty one.
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Mutex::new(cache);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Cache operations never suspend, so a poisoned lock still holds a
    /// consistent store.
    fn cache(&self) -> MutexGuard<'_, CacheStore> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expenses for `user_id`, filtered to `[start, end]` when both bounds are given.
    ///
    /// Served from the cache when a fresh entry exists and `force_refresh` is
    /// false. Otherwise the full list is fetched, cached unfiltered, and then
    /// filtered. A 404 from the store is an empty list and is not cached.
    pub async fn fetch_expenses(
        &self,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        force_refresh: bool,
    ) -> ExpenseResult<Vec<Expense>> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::MissingUser.into());
        }
        let range = DateRange::from_bounds(start, end);
        let now = self.clock.now();

        let ticket = {
            let mut cache = self.cache();
            if !force_refresh {
                if let Some(entry) = cache.get(user_id) {
                    if entry.is_fresh(now, self.ttl) {
                        debug!(user_id, count = entry.data.len(), "Using cached expense data");
                        return Ok(filter_by_date(&entry.data, range));
                    }
                }
            }
            cache.begin_fetch(user_id)
        };

        let expenses = match self.backend.list_expenses(user_id).await {
            Ok(expenses) => expenses,
            Err(e) if e.is_not_found() => {
                debug!(user_id, "No expenses found for this user");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(user_id, error = %e, "Error fetching expenses");
                return Err(e.into());
            }
        };

        let filtered = filter_by_date(&expenses, range);
        if self.cache().put_if_current(&ticket, expenses, now) {
            debug!(user_id, seq = ticket.seq(), "Cached expense list");
        } else {
            debug!(user_id, seq = ticket.seq(), "Fetch superseded, not cached");
        }
        Ok(filtered)
    }

    /// Submit a new expense and return the id the store assigned.
    pub async fn add_expense(&self, user_id: &str, draft: ExpenseDraft) -> ExpenseResult<String> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::MissingUser.into());
        }
        let body = draft.into_new_expense(user_id, self.clock.now());

        match self.backend.create_expense(&body).await {
            Ok(created) => {
                self.cache().invalidate(user_id);
                info!(user_id, expense_id = %created.id, "Expense added");
                Ok(created.id)
            }
            Err(e @ ApiError::Decode(_)) => {
                // Accepted by the store even though the reply was unreadable
                self.cache().invalidate(user_id);
                warn!(user_id, error = %e, "Expense added but response could not be read");
                Err(e.into())
            }
            Err(e) => {
                warn!(user_id, error = %e, "Error adding expense");
                Err(e.into())
            }
        }
    }

    /// Delete an expense by id and return the record the store removed.
    pub async fn delete_expense(&self, expense_id: &str) -> ExpenseResult<Expense> {
        if expense_id.trim().is_empty() {
            return Err(ValidationError::MissingExpenseId.into());
        }

        match self.backend.delete_expense(expense_id).await {
            Ok(deleted) => {
                self.invalidate_after_delete(&deleted);
                info!(expense_id, user_id = %deleted.user_id, "Expense deleted");
                Ok(deleted)
            }
            Err(e @ ApiError::Decode(_)) => {
                // Owner unknown, so nothing cached can be trusted
                self.cache().invalidate_all();
                warn!(expense_id, error = %e, "Expense deleted but response could not be read");
                Err(e.into())
            }
            Err(e) => {
                warn!(expense_id, error = %e, "Error deleting expense");
                Err(e.into())
            }
        }
    }

    fn invalidate_after_delete(&self, deleted: &Expense) {
        let mut cache = self.cache();
        match self.delete_policy {
            DeletePolicy::OwnerOnly if !deleted.user_id.is_empty() => {
                cache.invalidate(&deleted.user_id)
            }
            _ => cache.invalidate_all(),
        }
    }

    /// Drop the entry for `user_id`, or every entry when `None`.
    pub fn invalidate_cache(&self, user_id: Option<&str>) {
        let mut cache = self.cache();
        match user_id {
            Some(user_id) => cache.invalidate(user_id),
            None => cache.invalidate_all(),
        }
        debug!(user_id = ?user_id, "Cache invalidated");
    }

    /// Running total of the user's expenses in the optional range.
    pub async fn total_for(
        &self,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ExpenseResult<BigDecimal> {
        let expenses = self.fetch_expenses(user_id, start, end, false).await?;
        Ok(total_amount(&expenses))
    }

    /// Snapshot of the cached entry for `user_id`, fresh or not.
    pub fn cached_entry(&self, user_id: &str) -> Option<CacheEntry> {
        self.cache().get(user_id).cloned()
    }

    pub fn cached_user_count(&self) -> usize {
        self.cache().len()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
