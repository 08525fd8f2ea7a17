use std::sync::Arc;

use fxb_apilayer::ApiLayerClient;
use fxb_core::{
    bot::RateBot,
    cache::{KeyValueStore, MemoryStore, RateCache},
    config::{CacheBackend, Config},
    convert::Converter,
};
use fxb_redis::RedisStore;
use tracing::info;

async fn build_cache(cfg: &Config) -> RateCache {
    let store: Arc<dyn KeyValueStore> = match cfg.cache.backend {
        CacheBackend::None => return RateCache::disabled(cfg.cache.ttl, cfg.debug),
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
        CacheBackend::Redis => match RedisStore::new(&cfg.cache) {
            Ok(store) => Arc::new(store),
            Err(e) => return RateCache::unavailable(e, cfg.cache.ttl, cfg.debug),
        },
    };
    RateCache::connect(store, cfg.cache.ttl, cfg.debug).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fxb_core::logging::init("fxb")?;

    let cfg = Config::load()?;
    info!(
        "cache backend: {:?}, ttl {}s, diagnostic mode: {}",
        cfg.cache.backend,
        cfg.cache.ttl.as_secs(),
        cfg.debug
    );

    let cache = build_cache(&cfg).await;
    let source = Arc::new(ApiLayerClient::new(&cfg.rates)?);
    let converter = Converter::new(cache, source, cfg.rates.timeout, cfg.debug);
    let bot = Arc::new(RateBot::new(
        Arc::new(cfg.catalog.clone()),
        converter,
        cfg.debug,
    ));

    fxb_telegram::router::run_polling(&cfg.telegram_bot_token, bot).await
}
