use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Счётчики Bus.
#[derive(Debug, Default)]
pub struct BusMetrics {
    /// Успешные вызовы колбэков
    pub delivered: AtomicU64,
    pub callback_failures: AtomicU64,
    pub subscribes_sent: AtomicU64,
    pub unsubscribes_sent: AtomicU64,
    /// PUBLISH, SEND_TO_AGENT и неявные конверты, ушедшие к Agent-у
    pub published: AtomicU64,
}

/// Снимок счётчиков Bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub delivered: u64,
    pub callback_failures: u64,
    pub subscribes_sent: u64,
    pub unsubscribes_sent: u64,
    pub published: u64,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivery(
        &self,
        delivered: usize,
        failed: usize,
    ) {
        self.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.callback_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_subscribe(&self) {
        self.subscribes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsubscribe(&self) {
        self.unsubscribes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> BusStats {
        BusStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            subscribes_sent: self.subscribes_sent.load(Ordering::Relaxed),
            unsubscribes_sent: self.unsubscribes_sent.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
        }
    }
}
