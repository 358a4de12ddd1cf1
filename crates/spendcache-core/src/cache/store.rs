use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::Expense;

/// Cached lists expire after 5 minutes.
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Expenses in the order the store returned them
    pub data: Vec<Expense>,
    pub fetched_at: DateTime<Utc>,
    /// Sequence number of the write that produced this entry
    pub version: u64,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let seconds = self.age(now).num_seconds();
        if seconds < 60 {
            // Also covers clock skew
            "just now".to_string()
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else {
            format!("{}h ago", seconds / 3600)
        }
    }
}

/// Issued when a fetch starts; presented again when its result is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    user_id: String,
    seq: u64,
}

impl FetchTicket {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Zero or one cached expense list per user.
///
/// Every write and invalidation draws from one monotonically increasing
/// sequence. An invalidation records the next unissued sequence number as a
/// floor; tickets below the floor were issued before the invalidation and
/// their results are dropped. A per-user floor is only recorded when a
/// ticket for that user was issued since the last global floor.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
    // Latest ticket per user not yet covered by a floor
    issued: HashMap<String, u64>,
    user_floors: HashMap<String, u64>,
    global_floor: u64,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `user_id` regardless of age.
    pub fn get(&self, user_id: &str) -> Option<&CacheEntry> {
        self.entries.get(user_id)
    }

    /// Overwrite the entry for `user_id` unconditionally.
    pub fn put(&mut self, user_id: &str, data: Vec<Expense>, fetched_at: DateTime<Utc>) {
        let version = self.next_seq();
        self.entries.insert(
            user_id.to_string(),
            CacheEntry {
                data,
                fetched_at,
                version,
            },
        );
    }

    pub fn begin_fetch(&mut self, user_id: &str) -> FetchTicket {
        let seq = self.next_seq();
        self.issued.insert(user_id.to_string(), seq);
        FetchTicket {
            user_id: user_id.to_string(),
            seq,
        }
    }

    /// Store a fetch result unless something newer has been observed for
    /// that user since the ticket was issued. Returns whether it was stored.
    pub fn put_if_current(
        &mut self,
        ticket: &FetchTicket,
        data: Vec<Expense>,
        fetched_at: DateTime<Utc>,
    ) -> bool {
        let floor = self
            .user_floors
            .get(&ticket.user_id)
            .copied()
            .unwrap_or(0)
            .max(self.global_floor);
        if ticket.seq < floor {
            debug!(user_id = %ticket.user_id, seq = ticket.seq, floor, "Dropping fetch result issued before invalidation");
            return false;
        }
        if let Some(existing) = self.entries.get(&ticket.user_id) {
            if existing.version > ticket.seq {
                debug!(user_id = %ticket.user_id, seq = ticket.seq, current = existing.version, "Dropping fetch result older than cached entry");
                return false;
            }
        }
        self.entries.insert(
            ticket.user_id.clone(),
            CacheEntry {
                data,
                fetched_at,
                version: ticket.seq,
            },
        );
        true
    }

    pub fn invalidate(&mut self, user_id: &str) {
        self.entries.remove(user_id);
        // Tickets issued before an earlier floor are already rejected by it
        if self.issued.remove(user_id).is_some() {
            let floor = self.next_seq;
            self.user_floors.insert(user_id.to_string(), floor);
        }
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        // The global floor supersedes every per-user floor
        self.user_floors.clear();
        self.issued.clear();
        self.global_floor = self.next_seq;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
