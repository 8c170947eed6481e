//! Request/response over the bus.
//!
//! A requester publishes one or more events sharing a single bounded
//! response channel, then waits until one answer of every expected kind has
//! arrived or the deadline passes.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, instrument, warn};
use xrate_common::constants;

use crate::bus::EventBus;
use crate::error::{BusError, BusResult};
use crate::event::{Event, EventKind, Payload};

/// Bounded response channel. Capacity is never below one.
pub fn response_channel(capacity: usize) -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(capacity.max(1))
}

/// Wait until one event of every `expected` kind has been received.
///
/// A closed channel does not end the wait early: the deadline is still
/// honoured, so callers observe a timeout no sooner than they asked for.
pub async fn wait_for(
    rx: &mut mpsc::Receiver<Event>,
    expected: &[EventKind],
    deadline: Instant,
) -> BusResult<Responses> {
    let mut received: HashMap<EventKind, Event> = HashMap::with_capacity(expected.len());

    loop {
        let missing: Vec<EventKind> = expected
            .iter()
            .filter(|kind| !received.contains_key(kind))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(Responses { events: received });
        }

        match time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => {
                if !expected.contains(&event.kind) {
                    return Err(BusError::invalid_event("a requested response", event.kind));
                }
                if received.contains_key(&event.kind) {
                    debug!(kind = %event.kind, event_id = %event.id, "Duplicate response ignored");
                    continue;
                }
                debug!(kind = %event.kind, source = %event.source, "Response received");
                received.insert(event.kind, event);
            }
            Ok(None) => {
                time::sleep_until(deadline).await;
                return Err(BusError::Timeout { missing });
            }
            Err(_) => {
                warn!(missing = ?missing, "Timed out waiting for responses");
                return Err(BusError::Timeout { missing });
            }
        }
    }
}

/// A batch of events published together, answered on one channel.
#[derive(Debug, Clone)]
pub struct Request {
    source: String,
    asks: Vec<(Payload, EventKind)>,
    timeout: Duration,
}

impl Request {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            asks: Vec::new(),
            timeout: constants::request_timeout(),
        }
    }

    /// Publish `payload` and expect one answer of kind `expect`.
    pub fn ask(mut self, payload: Payload, expect: EventKind) -> Self {
        self.asks.push((payload, expect));
        self
    }

    /// Upper bound for publishing and waiting together.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Kinds this request waits for.
    pub fn expected(&self) -> Vec<EventKind> {
        self.asks.iter().map(|(_, kind)| *kind).collect()
    }
}

/// Answers collected by [`EventBus::request`], keyed by kind.
#[derive(Debug, Clone, Default)]
pub struct Responses {
    events: HashMap<EventKind, Event>,
}

impl Responses {
    pub fn get(&self, kind: EventKind) -> Option<&Event> {
        self.events.get(&kind)
    }

    /// Rate from the `RateResponded` answer.
    pub fn exchange_rate(&self) -> Option<f64> {
        self.get(EventKind::RateResponded)
            .and_then(|e| e.payload.exchange_rate())
    }

    /// Addresses from the `SubscribersResponded` answer.
    pub fn subscribers(&self) -> Option<&[String]> {
        self.get(EventKind::SubscribersResponded)
            .and_then(|e| e.payload.subscribers())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventBus {
    /// Publish every event of `request` and collect the answers.
    ///
    /// Listener failures surface as [`BusError::Dispatch`]; missing answers
    /// surface as [`BusError::Timeout`] once the request timeout elapsed.
    #[instrument(skip(self, request), fields(source = %request.source, asks = request.asks.len()))]
    pub async fn request(&self, request: Request) -> BusResult<Responses> {
        let expected = request.expected();
        let deadline = Instant::now() + request.timeout;

        // The requester keeps its own sender so the channel stays open
        // until the deadline even if nobody answers.
        let (tx, mut rx) = response_channel(expected.len());

        for (payload, _) in request.asks {
            let event = Event::from_payload(request.source.clone(), payload).with_response(tx.clone());
            match time::timeout_at(deadline, self.publish(&event)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(kind = %event.kind, "Timed out publishing request");
                    return Err(BusError::Timeout { missing: expected });
                }
            }
        }

        let responses = wait_for(&mut rx, &expected, deadline).await;
        drop(tx);
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Dispatch;
    use crate::listener::listener_fn;
    use tokio_test::assert_ok;
    use xrate_common::{CurrencyPair, ExchangeRate};

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "UAH")
    }

    fn rate_request() -> Request {
        Request::new("test").ask(
            Payload::RateRequested { pair: pair() },
            EventKind::RateResponded,
        )
    }

    fn register_rate_responder(bus: &EventBus, value: f64) {
        bus.register(
            EventKind::RateRequested,
            listener_fn("rate", move |event| {
                Box::pin(async move {
                    let pair = event.payload.currency_pair().cloned().unwrap_or_else(pair);
                    event.respond(
                        "rate",
                        Payload::RateResponded {
                            rate: ExchangeRate::new(value, pair),
                        },
                    )
                })
            }),
        );
    }

    #[test]
    fn test_response_channel_minimum_capacity() {
        let (tx, _rx) = response_channel(0);
        assert_eq!(tx.max_capacity(), 1);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let bus = EventBus::new();
        register_rate_responder(&bus, 1.5);

        let responses = assert_ok!(bus.request(rate_request()).await);

        assert_eq!(responses.len(), 1);
        assert_eq!(responses.exchange_rate(), Some(1.5));
        assert!(responses.get(EventKind::RateResponded).unwrap().correlation_id.is_some());
    }

    async fn two_kinds_on_one_channel(dispatch: Dispatch) {
        let bus = EventBus::with_dispatch(dispatch);
        register_rate_responder(&bus, 2.0);
        bus.register(
            EventKind::SubscribersRequested,
            listener_fn("subs", |event| {
                Box::pin(async move {
                    event.respond(
                        "subs",
                        Payload::SubscribersResponded {
                            topic: CurrencyPair::new("BTC", "UAH"),
                            subscribers: vec!["a@x.com".into()],
                        },
                    )
                })
            }),
        );

        let request = rate_request().ask(
            Payload::SubscribersRequested { topic: pair() },
            EventKind::SubscribersResponded,
        );
        let responses = bus.request(request).await.unwrap();

        assert_eq!(responses.exchange_rate(), Some(2.0));
        assert_eq!(responses.subscribers(), Some(&["a@x.com".to_string()][..]));
    }

    #[tokio::test]
    async fn test_two_kinds_on_one_channel() {
        two_kinds_on_one_channel(Dispatch::Sequential).await;
    }

    #[tokio::test]
    async fn test_two_kinds_on_one_channel_concurrent() {
        two_kinds_on_one_channel(Dispatch::Concurrent).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_not_before_deadline() {
        let bus = EventBus::new();
        let timeout = Duration::from_millis(100);

        let start = Instant::now();
        let err = bus.request(rate_request().timeout(timeout)).await.unwrap_err();

        assert!(start.elapsed() >= timeout);
        match err {
            BusError::Timeout { missing } => assert_eq!(missing, vec![EventKind::RateResponded]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_still_waits() {
        let (tx, mut rx) = response_channel(1);
        drop(tx);

        let start = Instant::now();
        let deadline = start + Duration::from_millis(50);
        let err = wait_for(&mut rx, &[EventKind::RateResponded], deadline)
            .await
            .unwrap_err();

        assert!(matches!(err, BusError::Timeout { .. }));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_unexpected_kind() {
        let (tx, mut rx) = response_channel(1);
        tx.send(Event::from_payload(
            "test",
            Payload::SubscribersRequested { topic: pair() },
        ))
        .await
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(1);
        let err = wait_for(&mut rx, &[EventKind::RateResponded], deadline)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BusError::InvalidEvent {
                actual: EventKind::SubscribersRequested,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_listener_error_fails_request() {
        let bus = EventBus::new();
        bus.register(
            EventKind::RateRequested,
            listener_fn("broken", |event| {
                let kind = event.kind;
                Box::pin(async move { Err(BusError::invalid_event("nothing", kind)) })
            }),
        );

        let err = bus.request(rate_request()).await.unwrap_err();
        assert!(matches!(err, BusError::Dispatch { .. }));
    }

    #[tokio::test]
    async fn test_publish_without_response_channel() {
        let bus = EventBus::new();
        register_rate_responder(&bus, 1.0);

        let event = Event::from_payload("test", Payload::RateRequested { pair: pair() });
        let err = bus.publish(&event).await.unwrap_err();

        assert!(err.any(|e| matches!(e, BusError::InvalidChannel)));
    }
}
