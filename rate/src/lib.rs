//! xrate Rate Providers
//!
//! Fetches exchange rates from unreliable third-party APIs.
//!
//! # Features
//!
//! - Ordered fallback chain with per-attempt telemetry on the event bus
//! - HTTP adapters for exchangerate.host, API Ninjas, Alpha Vantage,
//!   CoinAPI and CoinYep
//! - Per-provider retry with fixed or exponential backoff
//! - Bus listeners answering rate requests and counting provider outcomes
//!
//! # Example
//!
//! ```rust,ignore
//! use xrate_bus::EventBus;
//! use xrate_common::CurrencyPair;
//! use xrate_rate::{ProviderChain, ProviderKind, RateService, ReqwestHttpClient};
//!
//! let bus = EventBus::new();
//! let client = Arc::new(ReqwestHttpClient::new());
//! let providers = ProviderKind::ALL
//!     .iter()
//!     .map(|kind| kind.build(kind.default_config(), client.clone(), timeout))
//!     .collect();
//!
//! let chain = ProviderChain::new(providers, bus.clone());
//! RateService::new(Arc::new(chain)).register(&bus);
//! ```

pub mod api;
pub mod chain;
pub mod error;
pub mod http;
pub mod provider;
pub mod retry;
pub mod service;
pub mod stats;

pub use api::{HttpProvider, ProviderKind, RateApi};
pub use chain::ProviderChain;
pub use error::{RateError, RateResult};
pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use provider::ExchangeRateProvider;
pub use retry::{Backoff, RetryConfig, RetryingProvider};
pub use service::{log_exchange_rate, respond_exchange_rate, RateService};
pub use stats::{ProviderCounts, ProviderStats};

#[cfg(any(test, feature = "test-utils"))]
pub use http::StubHttpClient;
#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateProvider;
