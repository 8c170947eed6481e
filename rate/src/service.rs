//! Bus listeners exposing the provider chain to the rest of the application.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use xrate_bus::{BusError, BusResult, Event, EventBus, EventKind, Listener, Payload};
use xrate_common::{CurrencyPair, ExchangeRate};

use crate::error::RateResult;
use crate::provider::ExchangeRateProvider;
use crate::stats::ProviderStats;

/// Event source of rate answers.
pub const RATE_SOURCE: &str = "rate";

/// Answer a `RateRequested` event with the rate from `provider`.
pub async fn respond_exchange_rate(
    provider: &dyn ExchangeRateProvider,
    event: &Event,
) -> BusResult<()> {
    let Payload::RateRequested { pair } = &event.payload else {
        return Err(BusError::invalid_event("RateRequested", event.kind));
    };
    if event.response.is_none() {
        return Err(BusError::InvalidChannel);
    }

    let rate = provider
        .get_exchange_rate(pair)
        .await
        .map_err(BusError::listener)?;

    event.respond(RATE_SOURCE, Payload::RateResponded { rate })
}

/// Write provider telemetry to the log.
pub fn log_exchange_rate(event: &Event) -> BusResult<()> {
    match &event.payload {
        Payload::ProviderFetched { provider, rate } => {
            info!(
                provider = %provider,
                pair = %rate.pair,
                rate = rate.value,
                "Provider returned rate"
            );
            Ok(())
        }
        Payload::ProviderFailed {
            provider,
            pair,
            error,
        } => {
            warn!(provider = %provider, pair = %pair, error = %error, "Provider failed");
            Ok(())
        }
        _ => Err(BusError::invalid_event(
            "ProviderFetched or ProviderFailed",
            event.kind,
        )),
    }
}

/// Listener form of [`respond_exchange_rate`].
pub struct RateResponder {
    provider: Arc<dyn ExchangeRateProvider>,
}

impl RateResponder {
    pub fn new(provider: Arc<dyn ExchangeRateProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Listener for RateResponder {
    async fn handle(&self, event: &Event) -> BusResult<()> {
        respond_exchange_rate(self.provider.as_ref(), event).await
    }

    fn name(&self) -> &str {
        "respond_exchange_rate"
    }
}

/// Listener form of [`log_exchange_rate`].
#[derive(Debug, Default)]
pub struct RateLogger;

#[async_trait]
impl Listener for RateLogger {
    async fn handle(&self, event: &Event) -> BusResult<()> {
        log_exchange_rate(event)
    }

    fn name(&self) -> &str {
        "log_exchange_rate"
    }
}

/// Rate side of the application: the provider (usually a chain) plus its
/// telemetry counters.
pub struct RateService {
    provider: Arc<dyn ExchangeRateProvider>,
    stats: Arc<ProviderStats>,
}

impl RateService {
    pub fn new(provider: Arc<dyn ExchangeRateProvider>) -> Self {
        Self {
            provider,
            stats: Arc::new(ProviderStats::new()),
        }
    }

    /// Register the responder, the logger and the counters on `bus`.
    pub fn register(&self, bus: &EventBus) {
        bus.register(
            EventKind::RateRequested,
            RateResponder::new(Arc::clone(&self.provider)),
        );
        for kind in [EventKind::ProviderFetched, EventKind::ProviderFailed] {
            bus.register(kind, RateLogger);
            bus.subscribe(kind, self.stats.clone());
        }
    }

    /// Fetch a rate directly, bypassing the bus.
    #[instrument(skip(self, pair), fields(pair = %pair))]
    pub async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
        self.provider.get_exchange_rate(pair).await
    }

    pub fn stats(&self) -> &ProviderStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ProviderChain;
    use crate::error::RateError;
    use crate::provider::MockRateProvider;
    use std::time::Duration;
    use xrate_bus::Request;

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "UAH")
    }

    fn rate_request() -> Request {
        Request::new("test")
            .ask(Payload::RateRequested { pair: pair() }, EventKind::RateResponded)
            .timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_rate_over_bus_through_chain() {
        let bus = EventBus::new();
        let chain = ProviderChain::new(
            vec![
                Arc::new(MockRateProvider::failing("p1")),
                Arc::new(MockRateProvider::returning("p2", 1_600_000.0)),
            ],
            bus.clone(),
        );
        let service = RateService::new(Arc::new(chain));
        service.register(&bus);

        let responses = bus.request(rate_request()).await.unwrap();

        assert_eq!(responses.exchange_rate(), Some(1_600_000.0));
        assert_eq!(service.stats().get("p1").failed, 1);
        assert_eq!(service.stats().get("p2").fetched, 1);
    }

    #[tokio::test]
    async fn test_provider_error_surfaces_in_dispatch() {
        let bus = EventBus::new();
        let service = RateService::new(Arc::new(MockRateProvider::failing("p1")));
        service.register(&bus);

        let err = bus.request(rate_request()).await.unwrap_err();

        let rate_err = err.find_listener_error::<RateError>().unwrap();
        assert!(matches!(rate_err, RateError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_respond_rejects_wrong_payload() {
        let provider = MockRateProvider::returning("p", 1.0);
        let event = Event::from_payload("test", Payload::SubscribersRequested { topic: pair() });

        let err = respond_exchange_rate(&provider, &event).await.unwrap_err();

        assert!(matches!(err, BusError::InvalidEvent { .. }));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_respond_requires_channel() {
        let provider = MockRateProvider::returning("p", 1.0);
        let event = Event::from_payload("test", Payload::RateRequested { pair: pair() });

        let err = respond_exchange_rate(&provider, &event).await.unwrap_err();

        assert!(matches!(err, BusError::InvalidChannel));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_log_rejects_wrong_payload() {
        let event = Event::from_payload("test", Payload::RateRequested { pair: pair() });
        assert!(log_exchange_rate(&event).is_err());
    }
}
