//! Alpha Vantage `CURRENCY_EXCHANGE_RATE` function.

use serde::Deserialize;
use xrate_common::{CurrencyPair, ProviderConfig};

use super::{decode, endpoint_with_query, parse_number, RateApi};
use crate::error::RateResult;
use crate::http::HttpRequest;

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    realtime: RealtimeRate,
}

#[derive(Debug, Deserialize)]
struct RealtimeRate {
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: String,
}

/// Query-string API. The key travels as a query parameter named by the
/// configured header.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaVantage;

impl RateApi for AlphaVantage {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    fn build_request(&self, config: &ProviderConfig, pair: &CurrencyPair) -> RateResult<HttpRequest> {
        let mut params = vec![
            ("from_currency", pair.base_currency()),
            ("to_currency", pair.quote_currency()),
        ];
        if let Some((param, key)) = config.credentials() {
            params.push((param, key));
        }

        let url = endpoint_with_query(self.name(), &config.endpoint, &params)?;
        Ok(HttpRequest::get(url))
    }

    fn parse_rate(&self, _pair: &CurrencyPair, body: &str) -> RateResult<f64> {
        let data: ExchangeRateResponse = decode(self.name(), body)?;
        parse_number(self.name(), &data.realtime.exchange_rate)
    }
}
