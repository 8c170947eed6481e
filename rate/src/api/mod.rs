//! HTTP-backed providers.
//!
//! Every upstream API is a [`RateApi`]: it knows how to build a request for a
//! pair and how to read a rate out of the answer. [`HttpProvider`] supplies
//! the shared part (transport, deadline, status check).

mod alpha_vantage;
mod coinapi;
mod coinyep;
mod exchangerate_host;
mod ninjas;

pub use alpha_vantage::AlphaVantage;
pub use coinapi::CoinApi;
pub use coinyep::CoinYep;
pub use exchangerate_host::ExchangeRateHost;
pub use ninjas::Ninjas;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use xrate_common::{constants, CurrencyPair, ExchangeRate, ProviderConfig};

use crate::error::{RateError, RateResult};
use crate::http::{HttpClient, HttpRequest};
use crate::provider::ExchangeRateProvider;

/// Request/response strategy for one upstream API.
pub trait RateApi: Send + Sync {
    /// Provider id used in logs and telemetry.
    fn name(&self) -> &'static str;

    fn build_request(&self, config: &ProviderConfig, pair: &CurrencyPair) -> RateResult<HttpRequest>;

    fn parse_rate(&self, pair: &CurrencyPair, body: &str) -> RateResult<f64>;
}

/// Provider composed from an [`HttpClient`] and a [`RateApi`].
pub struct HttpProvider<A> {
    api: A,
    config: ProviderConfig,
    client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl<A: RateApi> fmt::Debug for HttpProvider<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProvider")
            .field("name", &self.api.name())
            .field("endpoint", &self.config.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<A: RateApi> HttpProvider<A> {
    pub fn new(api: A, config: ProviderConfig, client: Arc<dyn HttpClient>) -> Self {
        Self {
            api,
            config,
            client,
            timeout: constants::http_timeout(),
        }
    }

    /// Per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<A: RateApi> ExchangeRateProvider for HttpProvider<A> {
    fn name(&self) -> &str {
        self.api.name()
    }

    async fn get_exchange_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
        let name = self.api.name();
        let request = self
            .api
            .build_request(&self.config, pair)?
            .with_timeout(self.timeout);

        debug!(provider = name, url = %request.url, "Requesting exchange rate");

        let response = tokio::time::timeout(self.timeout, self.client.execute(request))
            .await
            .map_err(|_| RateError::Timeout {
                provider: name.to_string(),
            })?
            .map_err(|e| RateError::Http {
                provider: name.to_string(),
                message: e.message().to_string(),
                retryable: e.retryable(),
            })?;

        if !response.is_success() {
            return Err(RateError::Status {
                provider: name.to_string(),
                status: response.status,
            });
        }

        let value = self.api.parse_rate(pair, &response.body)?;
        Ok(ExchangeRate::new(value, pair.clone()))
    }
}

/// Upstream APIs known to the application, in default chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    ExchangeRateHost,
    Ninjas,
    AlphaVantage,
    CoinApi,
    CoinYep,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::ExchangeRateHost,
        ProviderKind::Ninjas,
        ProviderKind::AlphaVantage,
        ProviderKind::CoinApi,
        ProviderKind::CoinYep,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::ExchangeRateHost => ExchangeRateHost.name(),
            ProviderKind::Ninjas => Ninjas.name(),
            ProviderKind::AlphaVantage => AlphaVantage.name(),
            ProviderKind::CoinApi => CoinApi.name(),
            ProviderKind::CoinYep => CoinYep.name(),
        }
    }

    /// Public endpoint and auth header name of the upstream API.
    pub fn default_config(&self) -> ProviderConfig {
        let (endpoint, header) = match self {
            ProviderKind::ExchangeRateHost => ("https://api.exchangerate.host/latest", "-"),
            ProviderKind::Ninjas => ("https://api.api-ninjas.com/v1/exchangerate", "X-Api-Key"),
            ProviderKind::AlphaVantage => (
                "https://www.alphavantage.co/query?function=CURRENCY_EXCHANGE_RATE",
                "apikey",
            ),
            ProviderKind::CoinApi => ("https://rest.coinapi.io/v1/exchangerate", "X-CoinAPI-Key"),
            ProviderKind::CoinYep => ("https://coinyep.com/api/v1/", "-"),
        };
        ProviderConfig::new(endpoint, header, "")
    }

    /// Build the provider for this API.
    pub fn build(
        &self,
        config: ProviderConfig,
        client: Arc<dyn HttpClient>,
        timeout: Duration,
    ) -> Arc<dyn ExchangeRateProvider> {
        match self {
            ProviderKind::ExchangeRateHost => {
                Arc::new(HttpProvider::new(ExchangeRateHost, config, client).with_timeout(timeout))
            }
            ProviderKind::Ninjas => {
                Arc::new(HttpProvider::new(Ninjas, config, client).with_timeout(timeout))
            }
            ProviderKind::AlphaVantage => {
                Arc::new(HttpProvider::new(AlphaVantage, config, client).with_timeout(timeout))
            }
            ProviderKind::CoinApi => {
                Arc::new(HttpProvider::new(CoinApi, config, client).with_timeout(timeout))
            }
            ProviderKind::CoinYep => {
                Arc::new(HttpProvider::new(CoinYep, config, client).with_timeout(timeout))
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse the configured endpoint and append query parameters.
fn endpoint_with_query(
    provider: &'static str,
    endpoint: &str,
    params: &[(&str, &str)],
) -> RateResult<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| RateError::config(provider, format!("endpoint {endpoint:?}: {e}")))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

fn decode<T: DeserializeOwned>(provider: &'static str, body: &str) -> RateResult<T> {
    serde_json::from_str(body).map_err(|e| RateError::parse(provider, e))
}

/// Parse a rate sent as a JSON string.
fn parse_number(provider: &'static str, value: &str) -> RateResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| RateError::parse(provider, format!("rate {value:?}: {e}")))
}
