//! Conversion orchestration: cached rate first, live rate source on miss.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    cache::RateCache,
    domain::{round6, ConversionRequest, ConversionResult, RateOrigin},
    errors::{ApiError, ConvertError},
    rates::RateSource,
};

/// Stateless per request; safe to share behind an `Arc` across concurrent chats.
pub struct Converter {
    cache: RateCache,
    source: Arc<dyn RateSource>,
    timeout: Duration,
    diagnostic: bool,
}

impl Converter {
    pub fn new(
        cache: RateCache,
        source: Arc<dyn RateSource>,
        timeout: Duration,
        diagnostic: bool,
    ) -> Self {
        Self {
            cache,
            source,
            timeout,
            diagnostic,
        }
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Convert using a fresh cached rate when available, otherwise one call to the
    /// rate source. Rate source failures are final: stale entries are never used.
    pub async fn convert(&self, req: &ConversionRequest) -> Result<ConversionResult, ConvertError> {
        if let Some(rate) = self.cache.read_valid(&req.from, &req.to).await? {
            debug!("{}_{}: cache hit (rate {rate})", req.from, req.to);
            return Ok(ConversionResult {
                amount: req.amount,
                from: req.from.clone(),
                to: req.to.clone(),
                converted: round6(req.amount * rate),
                origin: RateOrigin::Cache,
            });
        }

        let quote = tokio::time::timeout(
            self.timeout,
            self.source.convert(req.amount, &req.from, &req.to),
        )
        .await
        .map_err(|_| {
            ApiError::ConnectionFailed(format!(
                "no response within {}ms",
                self.timeout.as_millis()
            ))
        })?
        .inspect_err(|e| warn!("{}_{}: rate source failed: {e}", req.from, req.to))?;

        match quote.rate {
            Some(rate) => {
                self.cache
                    .write_rate(&req.from, &req.to, rate, Utc::now())
                    .await?;
            }
            None if self.diagnostic => {
                return Err(ApiError::MissingFields {
                    field: "info.rate".to_string(),
                    body: format!("result={}", quote.result),
                }
                .into());
            }
            None => warn!("{}_{}: rate source returned no unit rate", req.from, req.to),
        }

        debug!("{}_{}: live result {}", req.from, req.to, quote.result);
        Ok(ConversionResult {
            amount: req.amount,
            from: req.from.clone(),
            to: req.to.clone(),
            converted: round6(quote.result),
            origin: RateOrigin::Live,
        })
    }
}
