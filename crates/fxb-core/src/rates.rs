//! Exchange rate source port and response classification.

use async_trait::async_trait;
use serde_json::Value;

use crate::{domain::CurrencyCode, errors::ApiError};

/// What a successful live conversion returned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateQuote {
    /// Converted amount.
    pub result: f64,
    /// Unit rate used for the conversion, if the API reported it.
    pub rate: Option<f64>,
}

/// Hexagonal port for a live exchange rate provider.
///
/// A single attempt per call; implementations must bound the call with a timeout.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn convert(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<RateQuote, ApiError>;
}

const BODY_SNIPPET_CHARS: usize = 200;

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

fn error_message(v: &Value) -> String {
    v.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("")
        .to_string()
}

/// Classify a `convert` endpoint response (`status`, raw body) into a quote or an [`ApiError`].
///
/// Expected shape: `{"success": true, "result": 950.0, "info": {"rate": 95.0}}`.
pub fn classify_response(status: u16, body: &str) -> Result<RateQuote, ApiError> {
    let v: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::MalformedResponse(format!("{e}: {}", snippet(body))))?;

    if status != 200 {
        return Err(ApiError::RequestRejected {
            status,
            message: error_message(&v),
        });
    }

    for field in ["success", "result"] {
        if v.get(field).is_none() {
            return Err(ApiError::MissingFields {
                field: field.to_string(),
                body: snippet(body),
            });
        }
    }

    let success = v
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::MissingFields {
            field: "success".to_string(),
            body: snippet(body),
        })?;

    if !success {
        let msg = error_message(&v);
        return Err(ApiError::ConversionFailed(if msg.is_empty() {
            snippet(body)
        } else {
            msg
        }));
    }

    let result = v
        .get("result")
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::MissingFields {
            field: "result".to_string(),
            body: snippet(body),
        })?;

    let rate = v
        .get("info")
        .and_then(|i| i.get("rate"))
        .and_then(Value::as_f64);

    Ok(RateQuote { result, rate })
}
