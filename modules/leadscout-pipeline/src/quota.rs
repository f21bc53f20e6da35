use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

/// Daily allowance of paid web-search queries.
/// Thread-safe via atomics; shared between the web-search adapter and the
/// autopilot loop that resets it at the start of each day.
pub struct SearchQuota {
    /// Queries allowed per day. 0 = unlimited.
    daily_limit: u64,
    used: AtomicU64,
}

impl SearchQuota {
    pub fn new(daily_limit: u64) -> Self {
        Self {
            daily_limit,
            used: AtomicU64::new(0),
        }
    }

    /// Claim one query. Returns false (and claims nothing) once the day's
    /// allowance is spent.
    pub fn try_acquire(&self) -> bool {
        if self.daily_limit == 0 {
            self.used.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        let claimed = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                (used < self.daily_limit).then_some(used + 1)
            });
        if claimed.is_err() {
            warn!(limit = self.daily_limit, "Daily search quota exhausted");
        }
        claimed.is_ok()
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    pub fn limit(&self) -> u64 {
        self.daily_limit
    }

    /// Queries left today (`u64::MAX` if unlimited).
    pub fn remaining(&self) -> u64 {
        if self.daily_limit == 0 {
            return u64::MAX;
        }
        self.daily_limit.saturating_sub(self.used())
    }

    pub fn reset_daily_counter(&self) {
        let previous = self.used.swap(0, Ordering::Relaxed);
        info!(previous, limit = self.daily_limit, "Daily search quota reset");
    }
}
