//! Sliding-window rate limiting for authentication attempts.
//!
//! Attempts are tracked as timestamp lists keyed by an opaque identifier
//! (e.g. `login_<ip>`). A new attempt is admitted while fewer than `limit`
//! admitted attempts fall inside the trailing `window`; rejected attempts
//! are never recorded, so a caller stuck at the limit does not extend their
//! own lockout. Entries outside the window are evicted lazily on the next
//! check for that identifier.
//!
//! Storage lives behind [`AttemptStore`] so the backend can be swapped
//! (e.g. for an external store in a multi-instance deployment) without
//! touching the window algorithm. The in-memory store serializes the whole
//! read-filter-append-write sequence under a lock, so `check_and_record`
//! is atomic across concurrent callers sharing an identifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use time::OffsetDateTime;

/// Storage backend for attempt timestamps.
///
/// Implementations must make each [`check_and_record`](Self::check_and_record)
/// call atomic per key: two concurrent calls for the same key must observe
/// each other's admitted attempts.
pub trait AttemptStore: Send + Sync {
    /// Applies the sliding-window admission rule for `key` at time `now`
    /// (unix seconds) and returns whether the attempt was admitted.
    fn check_and_record(&self, key: &str, limit: usize, window: Duration, now: i64) -> bool;
}

/// The sliding-window admission rule, shared by all store backends.
///
/// Evicts timestamps outside the window, rejects without recording when the
/// remaining count has reached `limit`, otherwise records `now` and admits.
pub fn admit(attempts: &mut Vec<i64>, limit: usize, window: Duration, now: i64) -> bool {
    let window_secs = window.as_secs() as i64;
    attempts.retain(|&t| now - t < window_secs);

    if attempts.len() >= limit {
        return false;
    }

    attempts.push(now);
    true
}

/// In-memory attempt store backed by a locked map.
#[derive(Default)]
pub struct MemoryAttemptStore {
    attempts: Mutex<HashMap<String, Vec<i64>>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers currently tracked (post-eviction entries only).
    pub fn tracked_identifiers(&self) -> usize {
        self.attempts.lock().len()
    }
}

impl AttemptStore for MemoryAttemptStore {
    fn check_and_record(&self, key: &str, limit: usize, window: Duration, now: i64) -> bool {
        let mut map = self.attempts.lock();
        let attempts = map.entry(key.to_owned()).or_default();
        let allowed = admit(attempts, limit, window, now);

        // Drop identifiers whose every attempt has aged out, to bound storage.
        if attempts.is_empty() {
            map.remove(key);
        }

        allowed
    }
}

/// Rate limiter shared across request handlers.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn AttemptStore>,
}

impl RateLimiter {
    /// Creates a limiter over the in-memory store. Suitable for
    /// single-instance deployments.
    pub fn new_in_memory() -> Self {
        Self {
            store: Arc::new(MemoryAttemptStore::new()),
        }
    }

    /// Creates a limiter over a caller-provided store backend.
    pub fn with_store(store: Arc<dyn AttemptStore>) -> Self {
        Self { store }
    }

    /// Admits or rejects an attempt for `identifier` against the current
    /// wall clock.
    pub fn check_and_record(&self, identifier: &str, limit: usize, window: Duration) -> bool {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let allowed = self.check_and_record_at(identifier, limit, window, now);

        if !allowed {
            tracing::warn!(identifier = %identifier, limit, "rate limit exceeded");
        }

        allowed
    }

    /// Explicit-clock variant of [`check_and_record`](Self::check_and_record).
    pub fn check_and_record_at(
        &self,
        identifier: &str,
        limit: usize,
        window: Duration,
        now: i64,
    ) -> bool {
        self.store.check_and_record(identifier, limit, window, now)
    }
}
