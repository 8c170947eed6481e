//! Listener trait and closure adapter.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;

use crate::error::BusResult;
use crate::event::Event;

/// Handler registered against one [`crate::EventKind`].
///
/// Cancellation is by dropping the returned future; callers bound it with
/// their own deadline.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Handle one event.
    async fn handle(&self, event: &Event) -> BusResult<()>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Listener backed by a closure returning a boxed future.
pub struct FnListener<F> {
    name: String,
    f: F,
}

impl<F> FnListener<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Listener for FnListener<F>
where
    F: for<'a> Fn(&'a Event) -> BoxFuture<'a, BusResult<()>> + Send + Sync,
{
    async fn handle(&self, event: &Event) -> BusResult<()> {
        (self.f)(event).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as a [`Listener`].
///
/// ```ignore
/// let counter = listener_fn("counter", move |_event| {
///     let hits = hits.clone();
///     Box::pin(async move {
///         hits.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     })
/// });
/// ```
pub fn listener_fn<F>(name: impl Into<String>, f: F) -> FnListener<F>
where
    F: for<'a> Fn(&'a Event) -> BoxFuture<'a, BusResult<()>> + Send + Sync,
{
    FnListener::new(name, f)
}
