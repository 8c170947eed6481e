//! Wiring of the bus, the rate side and the subscription side.

use std::sync::Arc;
use tracing::info;
use xrate_bus::EventBus;
use xrate_common::CurrencyPair;
use xrate_notify::{
    FileSubscriptionRepository, LogMailer, MailSender, MessageComposer, SubscriptionService,
};
use xrate_rate::{
    ExchangeRateProvider, HttpClient, ProviderChain, RateService, ReqwestHttpClient, RetryConfig,
    RetryingProvider,
};

use crate::config::{AppConfig, ConfigError};

/// A fully wired application.
pub struct App {
    bus: EventBus,
    rates: RateService,
    subscriptions: SubscriptionService,
    default_topic: CurrencyPair,
}

impl App {
    /// Build the application with the real HTTP client and log mailer.
    pub fn build(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::build_with(
            config,
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(LogMailer),
        )
    }

    /// Build the application with a given HTTP client and mail sender.
    pub fn build_with(
        config: &AppConfig,
        client: Arc<dyn HttpClient>,
        mailer: Arc<dyn MailSender>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let bus = EventBus::with_dispatch(config.dispatch);
        let retry = RetryConfig::exponential(config.retry_max);

        let providers: Vec<Arc<dyn ExchangeRateProvider>> = config
            .enabled_providers()
            .map(|entry| -> Arc<dyn ExchangeRateProvider> {
                let provider =
                    entry
                        .kind
                        .build(entry.config.clone(), client.clone(), config.http_timeout);
                if retry.is_enabled() {
                    Arc::new(RetryingProvider::new(provider, retry.clone()))
                } else {
                    provider
                }
            })
            .collect();

        let chain = ProviderChain::new(providers, bus.clone());
        info!(
            providers = ?chain.provider_names(),
            dispatch = %config.dispatch,
            retries = config.retry_max,
            "Rate providers configured"
        );

        let rates = RateService::new(Arc::new(chain));
        rates.register(&bus);

        let composer = MessageComposer::new(config.mail_from_address()?);
        let subscriptions = SubscriptionService::new(
            bus.clone(),
            Arc::new(FileSubscriptionRepository::new(&config.data_dir)),
            mailer,
        )
        .with_composer(composer)
        .with_timeout(config.request_timeout);
        subscriptions.register();

        Ok(Self {
            bus,
            rates,
            subscriptions,
            default_topic: config.default_topic.clone(),
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn rates(&self) -> &RateService {
        &self.rates
    }

    pub fn subscriptions(&self) -> &SubscriptionService {
        &self.subscriptions
    }

    /// The given topic, or the configured default.
    pub fn topic(&self, topic: Option<CurrencyPair>) -> CurrencyPair {
        topic.unwrap_or_else(|| self.default_topic.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;
    use xrate_bus::EventKind;
    use xrate_common::EmailAddress;
    use xrate_notify::{RecordingMailer, Subscriber, Subscription};
    use xrate_rate::StubHttpClient;

    fn config(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            data_dir: dir.to_path_buf(),
            mail_from: Some("rates@xrate.dev".into()),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_first_parsable_provider() {
        let tmp = tempfile::tempdir().unwrap();
        // Only the CoinAPI response shape has a top-level "rate" field.
        let client = Arc::new(StubHttpClient::ok(r#"{"rate": 5.0}"#));
        let app = App::build_with(
            &config(tmp.path()),
            client.clone(),
            Arc::new(RecordingMailer::new()),
        )
        .unwrap();

        let topic = app.topic(None);
        let rate = assert_ok!(app.subscriptions().request_exchange_rate(&topic).await);

        assert_eq!(rate, 5.0);
        // exchangerate.host, Ninjas, Alpha Vantage, CoinAPI; CoinYep is never asked.
        assert_eq!(client.requests().len(), 4);

        let stats = app.rates().stats().get("coinapi");
        assert_eq!(stats.fetched, 1);
        assert_eq!(app.rates().stats().get("ninjas").failed, 1);
    }

    #[tokio::test]
    async fn test_subscribe_and_send() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let app = App::build_with(
            &config(tmp.path()),
            Arc::new(StubHttpClient::ok(r#"{"rate": 1612345.67}"#)),
            mailer.clone(),
        )
        .unwrap();

        let topic = app.topic(Some(CurrencyPair::new("BTC", "UAH")));
        app.subscriptions()
            .subscribe(Subscription::new(
                Subscriber::new(EmailAddress::parse("jane@example.com").unwrap()),
                topic.clone(),
            ))
            .await
            .unwrap();

        let sent = app.subscriptions().send_emails(&topic).await.unwrap();

        assert_eq!(sent, 1);
        let messages = mailer.sent();
        assert_eq!(
            messages[0].from.as_ref().map(|f| f.as_str()),
            Some("rates@xrate.dev")
        );
        assert_eq!(messages[0].body, "Current exchange rate: 1612345.670000");
    }

    #[test]
    fn test_registers_listeners() {
        let tmp = tempfile::tempdir().unwrap();
        let app = App::build_with(
            &config(tmp.path()),
            Arc::new(StubHttpClient::ok("{}")),
            Arc::new(RecordingMailer::new()),
        )
        .unwrap();

        assert_eq!(app.bus().listener_count(EventKind::RateRequested), 1);
        assert_eq!(app.bus().listener_count(EventKind::SubscribersRequested), 1);
        assert_eq!(app.bus().listener_count(EventKind::ProviderFailed), 2);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.mail_from = Some("nobody".into());

        let result = App::build_with(
            &config,
            Arc::new(StubHttpClient::ok("{}")),
            Arc::new(RecordingMailer::new()),
        );

        assert!(matches!(result, Err(ConfigError::InvalidMailFrom(_))));
    }
}
