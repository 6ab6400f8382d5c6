use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use safepoint_core::{QuotaUsage, RateLimitRecord};

pub const IDLE_EXPIRY_SECONDS: i64 = 3_600;

/// Records idle for longer than this are treated as absent regardless of
/// their `remaining`/`reset_at` values.
pub fn idle_expiry() -> Duration {
    Duration::seconds(IDLE_EXPIRY_SECONDS)
}

/// Per-user upstream-quota bookkeeping. One record per user key; writes
/// overwrite the single existing record. Expiry is passive: a record whose
/// `last_updated` is older than [`idle_expiry`] is dropped at read time,
/// and `purge_idle` sweeps the same predicate.
#[derive(Debug, Clone, Default)]
pub struct QuotaStore {
    inner: Arc<RwLock<HashMap<String, RateLimitRecord>>>,
}

impl QuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing or stale records mean "not yet tracked", never "exhausted".
    pub fn get(&self, user_id: &str) -> Option<RateLimitRecord> {
        self.get_at(user_id, Utc::now())
    }

    pub fn upsert(&self, user_id: &str, usage: QuotaUsage) {
        self.upsert_at(user_id, usage, Utc::now());
    }

    /// Drops every idle record, returning how many were removed.
    pub fn purge_idle(&self) -> u64 {
        self.purge_idle_at(Utc::now())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    fn get_at(&self, user_id: &str, now: DateTime<Utc>) -> Option<RateLimitRecord> {
        let mut guard = self.inner.write();
        let fresh = guard
            .get(user_id)
            .filter(|record| now - record.last_updated <= idle_expiry())
            .cloned();
        if fresh.is_none() {
            guard.remove(user_id);
        }

        fresh
    }

    fn upsert_at(&self, user_id: &str, usage: QuotaUsage, now: DateTime<Utc>) {
        self.inner.write().insert(
            user_id.to_string(),
            RateLimitRecord {
                user_id: user_id.to_string(),
                limit: usage.limit,
                remaining: usage.remaining,
                reset_at: usage.reset_at,
                last_updated: now,
            },
        );
    }

    fn purge_idle_at(&self, now: DateTime<Utc>) -> u64 {
        let mut removed = 0_u64;
        self.inner.write().retain(|_, record| {
            let keep = now - record.last_updated <= idle_expiry();
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }
}
