//! Per-provider success/failure counters fed by chain telemetry.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use xrate_bus::{BusError, BusResult, Event, Listener, Payload};

#[derive(Debug, Default)]
struct Counters {
    fetched: AtomicU64,
    failed: AtomicU64,
}

/// Counts `ProviderFetched` / `ProviderFailed` events per provider.
#[derive(Debug, Default)]
pub struct ProviderStats {
    providers: DashMap<String, Counters>,
}

/// Point-in-time counters of one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderCounts {
    pub fetched: u64,
    pub failed: u64,
}

impl ProviderCounts {
    /// Share of successful attempts, `None` before the first attempt.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.fetched + self.failed;
        (total > 0).then(|| self.fetched as f64 / total as f64)
    }
}

impl ProviderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetched(&self, provider: &str) {
        self.providers
            .entry(provider.to_string())
            .or_default()
            .fetched
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self, provider: &str) {
        self.providers
            .entry(provider.to_string())
            .or_default()
            .failed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, provider: &str) -> ProviderCounts {
        self.providers
            .get(provider)
            .map(|c| ProviderCounts {
                fetched: c.fetched.load(Ordering::Relaxed),
                failed: c.failed.load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }

    /// Current counters, ordered by provider name.
    pub fn snapshot(&self) -> BTreeMap<String, ProviderCounts> {
        self.providers
            .iter()
            .map(|entry| {
                let counts = ProviderCounts {
                    fetched: entry.fetched.load(Ordering::Relaxed),
                    failed: entry.failed.load(Ordering::Relaxed),
                };
                (entry.key().clone(), counts)
            })
            .collect()
    }
}

#[async_trait]
impl Listener for ProviderStats {
    async fn handle(&self, event: &Event) -> BusResult<()> {
        match &event.payload {
            Payload::ProviderFetched { provider, .. } => self.record_fetched(provider),
            Payload::ProviderFailed { provider, .. } => self.record_failed(provider),
            _ => {
                return Err(BusError::invalid_event(
                    "ProviderFetched or ProviderFailed",
                    event.kind,
                ))
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "provider_stats"
    }
}
