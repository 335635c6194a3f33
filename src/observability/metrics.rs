use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for one hosted block, shared between its task and its handles
#[derive(Debug)]
pub struct SlotMetrics {
    block: String,
    calls: AtomicU64,
    errors_count: AtomicU64,
    emissions: AtomicU64,
    total_latency_us: AtomicU64,
    latency_samples: AtomicU64,
}

/// Point-in-time copy of [`SlotMetrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub block: String,
    pub calls: u64,
    pub errors_count: u64,
    pub emissions: u64,
    pub avg_latency_us: u64,
}

impl SlotMetrics {
    pub fn new(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            calls: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
            emissions: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
        }
    }

    pub fn block(&self) -> &str {
        &self.block
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn errors_count(&self) -> u64 {
        self.errors_count.load(Ordering::Relaxed)
    }

    pub fn emissions(&self) -> u64 {
        self.emissions.load(Ordering::Relaxed)
    }

    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_emissions(&self, count: u64) {
        self.emissions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn start_call(&self) -> Instant {
        Instant::now()
    }

    pub fn finish_call(&self, start: Instant) {
        let latency_us = start.elapsed().as_micros() as u64;
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_us(&self) -> u64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0;
        }
        self.total_latency_us.load(Ordering::Relaxed) / samples
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            block: self.block.clone(),
            calls: self.calls(),
            errors_count: self.errors_count(),
            emissions: self.emissions(),
            avg_latency_us: self.avg_latency_us(),
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] calls: {}, errors: {}, emissions: {}, avg latency: {}μs",
            self.block, self.calls, self.errors_count, self.emissions, self.avg_latency_us
        )
    }
}
