// Performance metrics module
//
// Lightweight counters for the review session: autosave traffic and keyboard dispatch

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Session metrics
///
/// Uses atomic operations for thread-safe tracking without locks.
/// Logged on shutdown (or periodically) for diagnostics.
#[derive(Debug)]
pub struct Metrics {
    /// Save calls actually handed to the persistence function
    pub saves_attempted: AtomicU64,

    /// Saves that completed successfully
    pub saves_succeeded: AtomicU64,

    /// Saves whose persistence function returned an error
    pub saves_failed: AtomicU64,

    /// Save triggers dropped because another save was in flight
    pub saves_dropped: AtomicU64,

    /// Debounce timers superseded by a newer change or flushed by save-now
    pub debounce_cancelled: AtomicU64,

    /// Key events delivered through the keyboard hub
    pub keys_dispatched: AtomicU64,

    /// Key events that matched no binding in any component
    pub keys_ignored: AtomicU64,

    /// Document selections made by the navigator
    pub navigations: AtomicU64,

    /// Session start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            saves_attempted: AtomicU64::new(0),
            saves_succeeded: AtomicU64::new(0),
            saves_failed: AtomicU64::new(0),
            saves_dropped: AtomicU64::new(0),
            debounce_cancelled: AtomicU64::new(0),
            keys_dispatched: AtomicU64::new(0),
            keys_ignored: AtomicU64::new(0),
            navigations: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_save_attempted(&self) {
        self.saves_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save_succeeded(&self) {
        self.saves_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save_failed(&self) {
        self.saves_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save_dropped(&self) {
        self.saves_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_debounce_cancelled(&self) {
        self.debounce_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_dispatched(&self) {
        self.keys_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_ignored(&self) {
        self.keys_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_navigation(&self) {
        self.navigations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of attempted saves that succeeded (1.0 when nothing was attempted)
    pub fn save_success_rate(&self) -> f64 {
        let attempted = self.saves_attempted.load(Ordering::Relaxed);
        let succeeded = self.saves_succeeded.load(Ordering::Relaxed);
        if attempted > 0 {
            succeeded as f64 / attempted as f64
        } else {
            1.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Review Session Metrics ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Saves: {} attempted, {} succeeded, {} failed, {} dropped in flight ({:.0}% success)",
            self.saves_attempted.load(Ordering::Relaxed),
            self.saves_succeeded.load(Ordering::Relaxed),
            self.saves_failed.load(Ordering::Relaxed),
            self.saves_dropped.load(Ordering::Relaxed),
            self.save_success_rate() * 100.0
        );
        tracing::info!(
            "Debounce timers cancelled: {}",
            self.debounce_cancelled.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Keys: {} dispatched, {} ignored; navigations: {}",
            self.keys_dispatched.load(Ordering::Relaxed),
            self.keys_ignored.load(Ordering::Relaxed),
            self.navigations.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
