//! Event types that flow through the bus.

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;
use xrate_common::{CurrencyPair, ExchangeRate};

use crate::error::{BusError, BusResult};

/// Dispatch key of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    /// A rate for a pair is wanted.
    RateRequested,
    /// Answer to [`EventKind::RateRequested`].
    RateResponded,
    /// The subscribers of a topic are wanted.
    SubscribersRequested,
    /// Answer to [`EventKind::SubscribersRequested`].
    SubscribersResponded,
    /// Telemetry: a provider returned a rate.
    ProviderFetched,
    /// Telemetry: a provider call failed.
    ProviderFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RateRequested => "rate.requested",
            EventKind::RateResponded => "rate.responded",
            EventKind::SubscribersRequested => "subscribers.requested",
            EventKind::SubscribersResponded => "subscribers.responded",
            EventKind::ProviderFetched => "provider.fetched",
            EventKind::ProviderFailed => "provider.failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event data. One variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    RateRequested {
        pair: CurrencyPair,
    },
    RateResponded {
        rate: ExchangeRate,
    },
    SubscribersRequested {
        topic: CurrencyPair,
    },
    SubscribersResponded {
        topic: CurrencyPair,
        subscribers: Vec<String>,
    },
    ProviderFetched {
        provider: String,
        rate: ExchangeRate,
    },
    ProviderFailed {
        provider: String,
        pair: CurrencyPair,
        error: String,
    },
}

impl Payload {
    /// The kind this payload is normally published under.
    pub fn kind(&self) -> EventKind {
        match self {
            Payload::RateRequested { .. } => EventKind::RateRequested,
            Payload::RateResponded { .. } => EventKind::RateResponded,
            Payload::SubscribersRequested { .. } => EventKind::SubscribersRequested,
            Payload::SubscribersResponded { .. } => EventKind::SubscribersResponded,
            Payload::ProviderFetched { .. } => EventKind::ProviderFetched,
            Payload::ProviderFailed { .. } => EventKind::ProviderFailed,
        }
    }

    /// Pair carried by the payload, if any.
    pub fn currency_pair(&self) -> Option<&CurrencyPair> {
        match self {
            Payload::RateRequested { pair } => Some(pair),
            Payload::SubscribersRequested { topic }
            | Payload::SubscribersResponded { topic, .. } => Some(topic),
            Payload::RateResponded { rate } | Payload::ProviderFetched { rate, .. } => {
                Some(&rate.pair)
            }
            Payload::ProviderFailed { pair, .. } => Some(pair),
        }
    }

    /// Rate value carried by the payload, if any.
    pub fn exchange_rate(&self) -> Option<f64> {
        match self {
            Payload::RateResponded { rate } | Payload::ProviderFetched { rate, .. } => {
                Some(rate.value)
            }
            _ => None,
        }
    }

    /// Subscriber addresses carried by the payload, if any.
    pub fn subscribers(&self) -> Option<&[String]> {
        match self {
            Payload::SubscribersResponded { subscribers, .. } => Some(subscribers),
            _ => None,
        }
    }
}

/// An event on the bus.
///
/// `response` is owned by the publisher, which reads from the matching
/// receiver. The bus never closes it.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: Uuid,
    /// Id of the event this one answers.
    pub correlation_id: Option<Uuid>,
    pub source: String,
    pub kind: EventKind,
    pub payload: Payload,
    pub response: Option<mpsc::Sender<Event>>,
}

impl Event {
    /// Create an event with an explicit kind.
    pub fn new(source: impl Into<String>, kind: EventKind, payload: Payload) -> Self {
        Self {
            id: Uuid::now_v7(),
            correlation_id: None,
            source: source.into(),
            kind,
            payload,
            response: None,
        }
    }

    /// Create an event whose kind follows from its payload.
    pub fn from_payload(source: impl Into<String>, payload: Payload) -> Self {
        let kind = payload.kind();
        Self::new(source, kind, payload)
    }

    /// Attach a response channel.
    pub fn with_response(mut self, response: mpsc::Sender<Event>) -> Self {
        self.response = Some(response);
        self
    }

    /// Send an answer down the response channel.
    ///
    /// Never blocks. A requester that already gave up (receiver dropped) is
    /// not an error for the responder.
    pub fn respond(&self, source: &str, payload: Payload) -> BusResult<()> {
        let Some(response) = &self.response else {
            return Err(BusError::InvalidChannel);
        };

        let mut answer = Event::from_payload(source, payload);
        answer.correlation_id = Some(self.id);

        match response.try_send(answer) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(BusError::ResponseChannelFull),
            Err(TrySendError::Closed(answer)) => {
                debug!(
                    event_id = %self.id,
                    kind = %answer.kind,
                    "Requester gone, response dropped"
                );
                Ok(())
            }
        }
    }
}
