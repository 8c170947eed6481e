//! Subscription service: subscribe, answer subscriber queries, notify.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use xrate_bus::{BusError, BusResult, Event, EventBus, EventKind, Listener, Payload, Request};
use xrate_common::{constants, now, CurrencyPair, EmailAddress};

use crate::compose::MessageComposer;
use crate::error::{NotifyError, NotifyResult};
use crate::mail::{MailError, MailSender};
use crate::model::{ExchangeRateData, Subscription};
use crate::repository::SubscriptionRepository;

/// Event source of subscription events.
pub const SUBSCRIPTION_SOURCE: &str = "subscription";

/// Answer a `SubscribersRequested` event with the addresses following its
/// topic.
pub async fn respond_subscribers(
    repo: &dyn SubscriptionRepository,
    event: &Event,
) -> BusResult<()> {
    let Payload::SubscribersRequested { topic } = &event.payload else {
        return Err(BusError::invalid_event("SubscribersRequested", event.kind));
    };
    if event.response.is_none() {
        return Err(BusError::InvalidChannel);
    }

    let subscribers: Vec<String> = repo
        .list()
        .await
        .map_err(BusError::listener)?
        .into_iter()
        .filter(|s| &s.topic == topic)
        .map(|s| s.subscriber.address.to_string())
        .collect();

    event.respond(
        SUBSCRIPTION_SOURCE,
        Payload::SubscribersResponded {
            topic: topic.clone(),
            subscribers,
        },
    )
}

/// Listener form of [`respond_subscribers`].
pub struct SubscribersResponder {
    repo: Arc<dyn SubscriptionRepository>,
}

impl SubscribersResponder {
    pub fn new(repo: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Listener for SubscribersResponder {
    async fn handle(&self, event: &Event) -> BusResult<()> {
        respond_subscribers(self.repo.as_ref(), event).await
    }

    fn name(&self) -> &str {
        "respond_subscribers"
    }
}

/// Manages subscriptions and sends rate notifications.
///
/// Rates and subscriber lists are requested over the bus, so the service
/// never talks to providers directly.
pub struct SubscriptionService {
    bus: EventBus,
    repo: Arc<dyn SubscriptionRepository>,
    mailer: Arc<dyn MailSender>,
    composer: MessageComposer,
    timeout: Duration,
}

impl SubscriptionService {
    pub fn new(
        bus: EventBus,
        repo: Arc<dyn SubscriptionRepository>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            bus,
            repo,
            mailer,
            composer: MessageComposer::default(),
            timeout: constants::request_timeout(),
        }
    }

    pub fn with_composer(mut self, composer: MessageComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Deadline for each request over the bus.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register the subscriber responder on the service's bus.
    pub fn register(&self) {
        self.bus.register(
            EventKind::SubscribersRequested,
            SubscribersResponder::new(Arc::clone(&self.repo)),
        );
    }

    /// Store a new subscription.
    #[instrument(skip(self, subscription), fields(subscription = %subscription))]
    pub async fn subscribe(&self, subscription: Subscription) -> NotifyResult<()> {
        subscription.topic.validate()?;
        self.repo.add(&subscription).await?;
        info!("Subscribed");
        Ok(())
    }

    /// All stored subscriptions.
    pub async fn subscriptions(&self) -> NotifyResult<Vec<Subscription>> {
        self.repo.list().await
    }

    /// Ask the bus for the current rate of `topic`.
    #[instrument(skip(self, topic), fields(topic = %topic))]
    pub async fn request_exchange_rate(&self, topic: &CurrencyPair) -> NotifyResult<f64> {
        let request = Request::new(SUBSCRIPTION_SOURCE)
            .ask(
                Payload::RateRequested {
                    pair: topic.clone(),
                },
                EventKind::RateResponded,
            )
            .timeout(self.timeout);

        self.bus
            .request(request)
            .await?
            .exchange_rate()
            .ok_or(NotifyError::MissingResponse("exchange rate"))
    }

    /// Ask the bus for the rate and the subscribers of `topic` at once.
    #[instrument(skip(self, topic), fields(topic = %topic))]
    pub async fn request_exchange_rate_data(
        &self,
        topic: &CurrencyPair,
    ) -> NotifyResult<ExchangeRateData> {
        let request = Request::new(SUBSCRIPTION_SOURCE)
            .ask(
                Payload::RateRequested {
                    pair: topic.clone(),
                },
                EventKind::RateResponded,
            )
            .ask(
                Payload::SubscribersRequested {
                    topic: topic.clone(),
                },
                EventKind::SubscribersResponded,
            )
            .timeout(self.timeout);

        let responses = self.bus.request(request).await?;

        let rate = responses
            .exchange_rate()
            .ok_or(NotifyError::MissingResponse("exchange rate"))?;
        let subscribers = responses
            .subscribers()
            .ok_or(NotifyError::MissingResponse("subscribers"))?
            .to_vec();

        Ok(ExchangeRateData {
            pair: topic.clone(),
            rate,
            subscribers,
        })
    }

    /// Send the current rate of `topic` to each of its subscribers.
    ///
    /// Returns the number of messages sent. Every failed delivery is
    /// collected; one failure does not stop the others.
    #[instrument(skip(self, topic), fields(topic = %topic))]
    pub async fn send_emails(&self, topic: &CurrencyPair) -> NotifyResult<usize> {
        topic.validate()?;

        let data = self.request_exchange_rate_data(topic).await?;
        if data.subscribers.is_empty() {
            return Err(NotifyError::NoSubscribers(topic.clone()));
        }

        let at = now();
        let mut sent = 0;
        let mut errors = Vec::new();

        for recipient in &data.subscribers {
            let to = match EmailAddress::parse(recipient) {
                Ok(to) => to,
                Err(e) => {
                    errors.push(MailError::permanent(recipient.as_str(), e.to_string()));
                    continue;
                }
            };

            let message = self.composer.compose(&data, to, &at);
            match self.mailer.send(&message).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Failed to send message");
                    errors.push(e);
                }
            }
        }

        info!(sent, failed = errors.len(), rate = data.rate, "Notifications sent");

        if errors.is_empty() {
            Ok(sent)
        } else {
            Err(NotifyError::Delivery { sent, errors })
        }
    }
}
