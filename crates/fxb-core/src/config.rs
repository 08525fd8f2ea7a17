use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{catalog::Catalog, errors::Error, Result};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.apilayer.com/exchangerates_data/convert";

/// Which key-value store backs the rate cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
    None,
}

impl CacheBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "none" | "off" => Ok(Self::None),
            other => Err(Error::Config(format!(
                "CACHE_BACKEND must be redis, memory or none, got {other:?}"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub ttl: Duration,
}

#[derive(Clone, Debug)]
pub struct RatesApiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Typed configuration, built once at startup and passed into each component.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub rates: RatesApiConfig,
    pub cache: CacheConfig,
    /// Diagnostic mode: surface cache faults and internal error detail in replies.
    pub debug: bool,
    pub catalog: Catalog,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup (environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let api_key = get("RATES_API_KEY").ok_or_else(|| {
            Error::Config("RATES_API_KEY environment variable is required".to_string())
        })?;

        let rates = RatesApiConfig {
            endpoint: get("RATES_API_ENDPOINT").unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            api_key,
            timeout: Duration::from_millis(parse_num(&get, "RATES_API_TIMEOUT_MS")?.unwrap_or(10_000)),
        };

        // Cache: redis when a host is configured, otherwise no cache unless asked for.
        let host = get("CACHE_HOST").unwrap_or_default();
        let backend = match get("CACHE_BACKEND") {
            Some(raw) => CacheBackend::parse(&raw)?,
            None if host.is_empty() => CacheBackend::None,
            None => CacheBackend::Redis,
        };
        if backend == CacheBackend::Redis && host.is_empty() {
            return Err(Error::Config(
                "CACHE_HOST is required for the redis cache backend".to_string(),
            ));
        }
        let port = parse_num::<u16>(&get, "CACHE_PORT")?.unwrap_or(6379);
        let ttl = Duration::from_secs(parse_num(&get, "CACHE_TTL_SECS")?.unwrap_or(3600));

        let cache = CacheConfig {
            backend,
            host,
            port,
            password: get("CACHE_PASS"),
            ttl,
        };

        let debug = get("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false);

        let catalog = match get("CURRENCY_CATALOG_PATH") {
            Some(path) => Catalog::from_json_file(&PathBuf::from(path))?,
            None => Catalog::default(),
        };

        Ok(Self {
            telegram_bot_token,
            rates,
            cache,
            debug,
            catalog,
        })
    }
}

fn parse_num<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}

fn is_truthy(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
