use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Счётчики Agent-а.
#[derive(Debug, Default)]
pub struct AgentMetrics {
    /// Принятые SUBSCRIBE
    pub subscribes: AtomicU64,
    /// Принятые UNSUBSCRIBE
    pub unsubscribes: AtomicU64,
    /// Принятые PUBLISH
    pub publishes: AtomicU64,
    /// Отправленные подписчикам конверты
    pub forwarded: AtomicU64,
    pub local_deliveries: AtomicU64,
    pub local_failures: AtomicU64,
    /// Неразобранные и бесполезные сообщения
    pub dropped: AtomicU64,
}

/// Снимок счётчиков Agent-а.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub subscribes: u64,
    pub unsubscribes: u64,
    pub publishes: u64,
    pub forwarded: u64,
    pub local_deliveries: u64,
    pub local_failures: u64,
    pub dropped: u64,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_subscribe(&self) {
        self.subscribes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsubscribe(&self) {
        self.unsubscribes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish(
        &self,
        forwarded: usize,
    ) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
        self.forwarded.fetch_add(forwarded as u64, Ordering::Relaxed);
    }

    pub fn record_local(
        &self,
        delivered: usize,
        failed: usize,
    ) {
        self.local_deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.local_failures.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> AgentStats {
        AgentStats {
            subscribes: self.subscribes.load(Ordering::Relaxed),
            unsubscribes: self.unsubscribes.load(Ordering::Relaxed),
            publishes: self.publishes.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            local_deliveries: self.local_deliveries.load(Ordering::Relaxed),
            local_failures: self.local_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
