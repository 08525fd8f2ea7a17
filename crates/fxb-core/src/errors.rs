/// Process-level error type (config, i/o, adapters).
///
/// Adapter crates should map their specific errors into this type so startup and
/// transport failures are reported consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Rejected user input. Always rendered back to the user as help text.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("expected `amount from to` or `amount from in to`, got {tokens} token(s)")]
    BadShape { tokens: usize },

    #[error("conversion into {currency} is not needed")]
    SameCurrency { currency: String },

    #[error("cannot convert {token} {currency}")]
    BadAmount { token: String, currency: String },

    #[error("currency \"{token}\" is not supported")]
    UnknownCurrency { token: String },
}

/// Failures talking to the exchange rate API.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("connection to rates API failed: {0}")]
    ConnectionFailed(String),

    #[error("unexpected response from rates API: {0}")]
    MalformedResponse(String),

    #[error("rates API rejected the request: {status} {message}")]
    RequestRejected { status: u16, message: String },

    #[error("rates API response is missing {field}: {body}")]
    MissingFields { field: String, body: String },

    #[error("rates API could not convert: {0}")]
    ConversionFailed(String),
}

/// Faults of the rate cache backend.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CacheError {
    #[error("cache is not available: {0}")]
    Unavailable(String),

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cannot decode cached record {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("cannot encode cache record: {0}")]
    Encode(String),
}

/// Everything a conversion can fail with once the request has been parsed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
