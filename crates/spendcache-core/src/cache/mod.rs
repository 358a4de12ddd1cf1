//! In-memory caching of per-user expense lists.
//!
//! This module provides the `CacheStore` holding at most one snapshot per
//! user. Snapshots are considered stale after 5 minutes; staleness is checked
//! lazily by the reader, never by a background task.
//!
//! Writes coming back from the network go through `FetchTicket`s so that a
//! fetch which started before an invalidation cannot resurrect pre-mutation
//! data.

pub mod store;

pub use store::{CacheEntry, CacheStore, FetchTicket, DEFAULT_TTL_SECS};
