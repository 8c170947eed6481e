//! exchangerate.host

use serde::Deserialize;
use std::collections::HashMap;
use xrate_common::{CurrencyPair, ProviderConfig};

use super::{decode, endpoint_with_query, RateApi};
use crate::error::{RateError, RateResult};
use crate::http::HttpRequest;

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// `GET {endpoint}?from=BASE&to=QUOTE`, rate under `rates.QUOTE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeRateHost;

impl RateApi for ExchangeRateHost {
    fn name(&self) -> &'static str {
        "exchangeratehost"
    }

    fn build_request(&self, config: &ProviderConfig, pair: &CurrencyPair) -> RateResult<HttpRequest> {
        let url = endpoint_with_query(
            self.name(),
            &config.endpoint,
            &[("from", pair.base_currency()), ("to", pair.quote_currency())],
        )?;

        let mut request = HttpRequest::get(url);
        if let Some((header, key)) = config.credentials() {
            request = request.with_header(header, key);
        }
        Ok(request)
    }

    fn parse_rate(&self, pair: &CurrencyPair, body: &str) -> RateResult<f64> {
        let data: LatestResponse = decode(self.name(), body)?;

        data.rates.get(pair.quote_currency()).copied().ok_or_else(|| {
            RateError::parse(
                self.name(),
                format!("no {} rate in response", pair.quote_currency()),
            )
        })
    }
}
