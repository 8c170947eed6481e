//! Event bus: listener registry and dispatch.

use futures::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{BusError, BusResult};
use crate::event::{Event, EventKind};
use crate::listener::{FnListener, Listener};

/// How listeners of one event are run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// One listener at a time, in registration order.
    #[default]
    Sequential,
    /// All listeners polled together.
    Concurrent,
}

impl Dispatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dispatch::Sequential => "sequential",
            Dispatch::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dispatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Dispatch::Sequential),
            "concurrent" | "parallel" => Ok(Dispatch::Concurrent),
            other => Err(format!("unknown dispatch mode: {other}")),
        }
    }
}

type Listeners = HashMap<EventKind, Vec<Arc<dyn Listener>>>;

struct Inner {
    listeners: Mutex<Listeners>,
    dispatch: Dispatch,
    published: AtomicU64,
}

/// In-process publish/subscribe bus.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("dispatch", &self.inner.dispatch)
            .field("published", &self.events_published())
            .finish()
    }
}

impl EventBus {
    /// Create a bus with sequential dispatch.
    pub fn new() -> Self {
        Self::with_dispatch(Dispatch::default())
    }

    pub fn with_dispatch(dispatch: Dispatch) -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: Mutex::new(HashMap::new()),
                dispatch,
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener for `kind`. Registration order is kept.
    pub fn subscribe(&self, kind: EventKind, listener: Arc<dyn Listener>) {
        debug!(kind = %kind, listener = listener.name(), "Listener registered");
        self.inner
            .listeners
            .lock()
            .entry(kind)
            .or_default()
            .push(listener);
    }

    /// Register an owned listener for `kind`.
    pub fn register<L>(&self, kind: EventKind, listener: L)
    where
        L: Listener + 'static,
    {
        self.subscribe(kind, Arc::new(listener));
    }

    /// Register a closure listener for `kind`.
    pub fn subscribe_fn<F>(&self, kind: EventKind, name: impl Into<String>, f: F)
    where
        F: for<'a> Fn(&'a Event) -> BoxFuture<'a, BusResult<()>> + Send + Sync + 'static,
    {
        self.register(kind, FnListener::new(name, f));
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .lock()
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Total events published through this bus.
    pub fn events_published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Invoke every listener registered for `event.kind`.
    ///
    /// The registry lock is only held while the listener list is copied, so
    /// listeners may publish on the same bus.
    pub async fn publish(&self, event: &Event) -> BusResult<()> {
        let listeners: Vec<Arc<dyn Listener>> = self
            .inner
            .listeners
            .lock()
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();

        self.inner.published.fetch_add(1, Ordering::Relaxed);

        if listeners.is_empty() {
            debug!(kind = %event.kind, event_id = %event.id, "No listeners for event");
            return Ok(());
        }

        debug!(
            kind = %event.kind,
            event_id = %event.id,
            source = %event.source,
            listeners = listeners.len(),
            "Publishing event"
        );

        let errors: Vec<BusError> = match self.inner.dispatch {
            Dispatch::Sequential => {
                let mut errors = Vec::new();
                for listener in &listeners {
                    if let Err(e) = listener.handle(event).await {
                        warn!(kind = %event.kind, listener = listener.name(), error = %e, "Listener failed");
                        errors.push(e);
                    }
                }
                errors
            }
            Dispatch::Concurrent => {
                let results = join_all(listeners.iter().map(|l| l.handle(event))).await;
                listeners
                    .iter()
                    .zip(results)
                    .filter_map(|(listener, result)| match result {
                        Ok(()) => None,
                        Err(e) => {
                            warn!(kind = %event.kind, listener = listener.name(), error = %e, "Listener failed");
                            Some(e)
                        }
                    })
                    .collect()
            }
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BusError::Dispatch {
                kind: event.kind,
                errors,
            })
        }
    }
}
