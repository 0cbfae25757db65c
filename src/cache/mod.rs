//! In-memory snapshot caching: a keyed store plus single-flight refresh
//! coordination.
//!
//! This module provides the shared mutable core of the dashboard:
//! - At most one computed snapshot per user key, replaced atomically
//! - Lazy staleness classification against a configured TTL
//! - One in-flight refresh per key, with sticky failure reporting
//!
//! Nothing is persisted; the cache rebuilds from upstream on restart.

mod refresh;
mod store;

pub use refresh::{RefreshScheduler, RefreshTicket};
pub use store::{classify_staleness, Freshness, SnapshotStore};
