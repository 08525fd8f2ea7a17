//! Exchange rate adapter (apilayer `exchangerates_data/convert`).
//!
//! `GET {endpoint}?to=RUB&from=USD&amount=10` with the key in the `apikey` header.

use async_trait::async_trait;
use tracing::debug;

use fxb_core::{
    config::RatesApiConfig,
    domain::CurrencyCode,
    errors::{ApiError, Error},
    rates::{classify_response, RateQuote, RateSource},
    Result,
};

#[derive(Clone, Debug)]
pub struct ApiLayerClient {
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
}

impl ApiLayerClient {
    pub fn new(cfg: &RatesApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            http,
        })
    }

    fn request(&self, amount: f64, from: &CurrencyCode, to: &CurrencyCode) -> reqwest::RequestBuilder {
        self.http
            .get(&self.endpoint)
            .header("apikey", &self.api_key)
            .query(&[
                ("to", to.to_string()),
                ("from", from.to_string()),
                ("amount", amount.to_string()),
            ])
    }
}

#[async_trait]
impl RateSource for ApiLayerClient {
    async fn convert(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> std::result::Result<RateQuote, ApiError> {
        let resp = self
            .request(amount, from, to)
            .send()
            .await
            .map_err(|e| ApiError::ConnectionFailed(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::MalformedResponse(format!("cannot read body: {e}")))?;
        debug!("rates API {from}->{to}: HTTP {status}");

        classify_response(status, &body)
    }
}
