//! State shared between crawler threads: cancellation, ingest counters and the
//! request budget table.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::api::RateLimits;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cloneable cancellation token. Workers check it between units of work; in-flight
/// requests are not interrupted.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Sleep for `d`, waking early on cancellation. Returns false when cancelled.
    pub fn sleep(&self, d: Duration) -> bool {
        let until = Instant::now() + d;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= until {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(until - now));
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CrawlCounts {
    /// Posts handed to the store, duplicates included.
    pub received: u64,
    pub duplicates: u64,
}

#[derive(Debug, Default)]
pub struct CrawlState {
    received: AtomicU64,
    duplicates: AtomicU64,
}

impl CrawlState {
    pub fn record(&self, duplicate: bool) {
        self.received.fetch_add(1, Ordering::Relaxed);
        if duplicate {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CrawlCounts {
        CrawlCounts {
            received: self.received.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
        }
    }
}

/// Remaining requests per endpoint family, refreshed by the poller. Reads may be one
/// poll stale; all budgets start at zero until the first poll lands.
#[derive(Debug, Default)]
pub struct RateBudget {
    search: AtomicU64,
    user_timeline: AtomicU64,
    followers: AtomicU64,
}

impl RateBudget {
    pub fn update(&self, limits: &RateLimits) {
        self.search.store(limits.search, Ordering::Relaxed);
        self.user_timeline.store(limits.user_timeline, Ordering::Relaxed);
        self.followers.store(limits.followers, Ordering::Relaxed);
    }

    pub fn search(&self) -> u64 {
        self.search.load(Ordering::Relaxed)
    }

    pub fn user_timeline(&self) -> u64 {
        self.user_timeline.load(Ordering::Relaxed)
    }

    pub fn followers(&self) -> u64 {
        self.followers.load(Ordering::Relaxed)
    }
}
