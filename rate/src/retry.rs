//! Per-provider retry with backoff.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};
use xrate_common::{CurrencyPair, ExchangeRate};

use crate::error::RateResult;
use crate::provider::ExchangeRateProvider;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally +/- 50% jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(3),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let seconds = (base.as_secs_f64() * factor.powi(exponent)).min(max.as_secs_f64());
                let delay = Duration::from_secs_f64(seconds);

                if jitter {
                    let scale = rand::thread_rng().gen_range(0.5..=1.5);
                    delay.mul_f64(scale)
                } else {
                    delay
                }
            }
        }
    }
}

/// How often and how patiently a provider is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }
}

/// Retries one provider on retryable errors. Wraps a single link, never
/// the whole chain, so fallback order is unaffected.
#[derive(Debug)]
pub struct RetryingProvider<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: ExchangeRateProvider> RetryingProvider<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: ExchangeRateProvider> ExchangeRateProvider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
        let mut attempt = 0;
        loop {
            match self.inner.get_exchange_rate(pair).await {
                Ok(rate) => return Ok(rate),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.backoff.delay(attempt);
                    attempt += 1;
                    warn!(
                        provider = self.inner.name(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Retrying provider"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!(provider = self.inner.name(), attempts = attempt + 1, "Giving up");
                    return Err(e);
                }
            }
        }
    }
}
