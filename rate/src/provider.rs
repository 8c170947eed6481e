//! Exchange-rate provider trait and a scripted test provider.

use async_trait::async_trait;
use std::sync::Arc;
use xrate_common::{CurrencyPair, ExchangeRate};

use crate::error::RateResult;

/// Source of exchange rates.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Stable identifier used in telemetry.
    fn name(&self) -> &str;

    /// Get the current rate for a currency pair.
    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate>;
}

#[async_trait]
impl<T: ExchangeRateProvider + ?Sized> ExchangeRateProvider for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
        (**self).get_exchange_rate(pair).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRateProvider;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use crate::error::RateError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Outcome = Box<dyn Fn(&CurrencyPair) -> RateResult<ExchangeRate> + Send + Sync>;

    /// Provider answering from a script of outcomes.
    ///
    /// Outcomes queued with [`MockRateProvider::then`] are used once each;
    /// after that the fallback outcome answers every call.
    pub struct MockRateProvider {
        name: String,
        queued: Mutex<VecDeque<Outcome>>,
        fallback: Outcome,
        calls: AtomicUsize,
    }

    impl MockRateProvider {
        /// Provider that always answers `value`.
        pub fn returning(name: impl Into<String>, value: f64) -> Self {
            Self::with_fallback(
                name,
                Box::new(move |pair| Ok(ExchangeRate::new(value, pair.clone()))),
            )
        }

        /// Provider that always fails with a retryable status error.
        pub fn failing(name: impl Into<String>) -> Self {
            let name = name.into();
            let provider = name.clone();
            Self::with_fallback(
                name,
                Box::new(move |_| {
                    Err(RateError::Status {
                        provider: provider.clone(),
                        status: 503,
                    })
                }),
            )
        }

        fn with_fallback(name: impl Into<String>, fallback: Outcome) -> Self {
            Self {
                name: name.into(),
                queued: Mutex::new(VecDeque::new()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        /// Queue one outcome ahead of the fallback.
        pub fn then(
            self,
            outcome: impl Fn(&CurrencyPair) -> RateResult<ExchangeRate> + Send + Sync + 'static,
        ) -> Self {
            self.queued.lock().push_back(Box::new(outcome));
            self
        }

        /// Number of `get_exchange_rate` calls so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExchangeRateProvider for MockRateProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let queued = self.queued.lock().pop_front();
            match queued {
                Some(outcome) => outcome(pair),
                None => (self.fallback)(pair),
            }
        }
    }
}
