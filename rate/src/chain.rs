//! Ordered fallback over exchange-rate providers.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use xrate_bus::{Event, EventBus, Payload};
use xrate_common::{CurrencyPair, ExchangeRate};

use crate::error::{RateError, RateResult};
use crate::provider::ExchangeRateProvider;

/// Event source used for chain telemetry.
pub const CHAIN_SOURCE: &str = "rate.chain";

/// Tries providers in construction order and returns the first success.
///
/// After every attempt a `ProviderFetched` or `ProviderFailed` event is
/// published on the bus. Providers are never reordered or skipped.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Arc<[Arc<dyn ExchangeRateProvider>]>,
    offset: usize,
    bus: EventBus,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl ProviderChain {
    /// Create a chain over `providers`, publishing telemetry on `bus`.
    pub fn new(providers: Vec<Arc<dyn ExchangeRateProvider>>, bus: EventBus) -> Self {
        Self {
            providers: providers.into(),
            offset: 0,
            bus,
        }
    }

    /// Providers this chain will try, in order.
    pub fn links(&self) -> &[Arc<dyn ExchangeRateProvider>] {
        self.providers.get(self.offset..).unwrap_or(&[])
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.links().iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.links().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links().is_empty()
    }

    /// The rest of the chain after its head, sharing the same providers.
    pub fn next_link(&self) -> ProviderChain {
        Self {
            providers: Arc::clone(&self.providers),
            offset: (self.offset + 1).min(self.providers.len()),
            bus: self.bus.clone(),
        }
    }

    async fn publish(&self, payload: Payload) {
        let event = Event::from_payload(CHAIN_SOURCE, payload);
        if let Err(e) = self.bus.publish(&event).await {
            warn!(kind = %event.kind, error = %e, "Failed to publish provider telemetry");
        }
    }

    /// Get a rate from the first provider that succeeds.
    #[instrument(skip(self, pair), fields(pair = %pair, providers = self.len()))]
    pub async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
        pair.validate()?;

        let mut last: Option<(String, RateError)> = None;

        for provider in self.links() {
            let name = provider.name().to_string();

            match provider.get_exchange_rate(pair).await {
                Ok(rate) => {
                    debug!(provider = %name, rate = rate.value, "Got rate from provider");
                    self.publish(Payload::ProviderFetched {
                        provider: name,
                        rate: rate.clone(),
                    })
                    .await;
                    return Ok(rate);
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Provider failed to return rate");
                    self.publish(Payload::ProviderFailed {
                        provider: name.clone(),
                        pair: pair.clone(),
                        error: e.to_string(),
                    })
                    .await;
                    last = Some((name, e));
                }
            }
        }

        match last {
            Some((provider, source)) => Err(RateError::ProviderUnavailable {
                provider,
                source: Box::new(source),
            }),
            None => Err(RateError::NoProviders),
        }
    }
}

#[async_trait]
impl ExchangeRateProvider for ProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
        ProviderChain::get_exchange_rate(self, pair).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockRateProvider;
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};
    use xrate_bus::{listener_fn, EventKind};

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "UAH")
    }

    /// Records every telemetry payload published on `bus`.
    fn record_telemetry(bus: &EventBus) -> Arc<Mutex<Vec<Payload>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::ProviderFetched, EventKind::ProviderFailed] {
            let seen = seen.clone();
            bus.register(
                kind,
                listener_fn("recorder", move |event| {
                    seen.lock().push(event.payload.clone());
                    Box::pin(async { Ok(()) })
                }),
            );
        }
        seen
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_success() {
        let bus = EventBus::new();
        let seen = record_telemetry(&bus);

        let p1 = Arc::new(MockRateProvider::failing("p1"));
        let p2 = Arc::new(MockRateProvider::returning("p2", 42.0));
        let p3 = Arc::new(MockRateProvider::returning("p3", 7.0));
        let chain = ProviderChain::new(vec![p1.clone(), p2.clone(), p3.clone()], bus);

        let rate = assert_ok!(chain.get_exchange_rate(&pair()).await);

        assert_eq!(rate.value, 42.0);
        assert_eq!((p1.calls(), p2.calls(), p3.calls()), (1, 1, 0));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[0], Payload::ProviderFailed { provider, .. } if provider == "p1"));
        assert!(matches!(&seen[1], Payload::ProviderFetched { provider, .. } if provider == "p2"));
    }

    #[tokio::test]
    async fn test_total_failure_references_last_provider() {
        let bus = EventBus::new();
        let seen = record_telemetry(&bus);

        let chain = ProviderChain::new(
            vec![
                Arc::new(MockRateProvider::failing("p1")),
                Arc::new(MockRateProvider::failing("p2")),
                Arc::new(MockRateProvider::failing("p3")),
            ],
            bus,
        );

        let err = assert_err!(chain.get_exchange_rate(&pair()).await);

        match err {
            RateError::ProviderUnavailable { provider, source } => {
                assert_eq!(provider, "p3");
                assert!(matches!(*source, RateError::Status { status: 503, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        let failed: Vec<_> = seen
            .lock()
            .iter()
            .filter_map(|p| match p {
                Payload::ProviderFailed { provider, .. } => Some(provider.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_invalid_pair_fails_fast() {
        let bus = EventBus::new();
        let seen = record_telemetry(&bus);
        let p1 = Arc::new(MockRateProvider::returning("p1", 1.0));
        let chain = ProviderChain::new(vec![p1.clone()], bus);

        let err = chain
            .get_exchange_rate(&CurrencyPair::new("", "UAH"))
            .await
            .unwrap_err();

        assert!(matches!(err, RateError::InvalidCurrency(_)));
        assert_eq!(p1.calls(), 0);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain = ProviderChain::new(Vec::new(), EventBus::new());
        assert!(matches!(
            chain.get_exchange_rate(&pair()).await,
            Err(RateError::NoProviders)
        ));
    }

    #[tokio::test]
    async fn test_next_link_skips_head() {
        let p1 = Arc::new(MockRateProvider::returning("p1", 1.0));
        let p2 = Arc::new(MockRateProvider::returning("p2", 2.0));
        let chain = ProviderChain::new(vec![p1.clone(), p2.clone()], EventBus::new());

        let rest = chain.next_link();
        assert_eq!(rest.provider_names(), vec!["p2"]);
        assert_eq!(rest.get_exchange_rate(&pair()).await.unwrap().value, 2.0);
        assert_eq!(p1.calls(), 0);

        let end = rest.next_link().next_link();
        assert!(end.is_empty());
        assert!(matches!(
            end.get_exchange_rate(&pair()).await,
            Err(RateError::NoProviders)
        ));
    }

    #[tokio::test]
    async fn test_telemetry_failure_does_not_change_result() {
        let bus = EventBus::new();
        bus.register(
            EventKind::ProviderFetched,
            listener_fn("broken", |event| {
                let kind = event.kind;
                Box::pin(async move { Err(xrate_bus::BusError::invalid_event("nothing", kind)) })
            }),
        );
        let chain = ProviderChain::new(vec![Arc::new(MockRateProvider::returning("p1", 3.0))], bus);

        assert_eq!(chain.get_exchange_rate(&pair()).await.unwrap().value, 3.0);
    }

    #[tokio::test]
    async fn test_chain_nests_as_provider() {
        let inner = ProviderChain::new(
            vec![Arc::new(MockRateProvider::returning("inner", 5.0))],
            EventBus::new(),
        );
        let outer = ProviderChain::new(
            vec![
                Arc::new(MockRateProvider::failing("p1")) as Arc<dyn ExchangeRateProvider>,
                Arc::new(inner),
            ],
            EventBus::new(),
        );

        assert_eq!(outer.get_exchange_rate(&pair()).await.unwrap().value, 5.0);
    }
}
