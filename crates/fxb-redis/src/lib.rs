//! Redis adapter for the rate cache key-value port.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, IntoConnectionInfo};
use tokio::sync::Mutex;
use tracing::{info, warn};

use fxb_core::{cache::KeyValueStore, config::CacheConfig, errors::CacheError};

fn map_err(e: redis::RedisError) -> CacheError {
    if e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        CacheError::Unavailable(e.to_string())
    } else {
        CacheError::Backend(e.to_string())
    }
}

/// Lazily connected Redis store.
///
/// One multiplexed connection is shared by all concurrent conversions; it is
/// opened on first use (normally the startup probe) and reopened on the next
/// call after the server drops it.
pub struct RedisStore {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    pub fn new(cfg: &CacheConfig) -> Result<Self, CacheError> {
        let mut info = (cfg.host.as_str(), cfg.port)
            .into_connection_info()
            .map_err(map_err)?;
        info.redis.password = cfg.password.clone();

        let client = redis::Client::open(info).map_err(map_err)?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_err)?;
        info!("connected to redis");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Map a command result, forgetting the shared connection when it is broken.
    async fn checked<T>(&self, res: redis::RedisResult<T>) -> Result<T, CacheError> {
        match res {
            Ok(v) => Ok(v),
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    warn!("redis connection lost, reopening on next call: {e}");
                    *self.conn.lock().await = None;
                }
                Err(map_err(e))
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _pong: String = self.checked(redis::cmd("PING").query_async(&mut conn).await).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = self.checked(conn.get(key).await).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = self.checked(conn.set(key, value).await).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxb_core::config::CacheBackend;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };
    use tokio::{
        io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
        net::{TcpListener, TcpStream},
    };

    fn cfg(port: u16) -> CacheConfig {
        CacheConfig {
            backend: CacheBackend::Redis,
            host: "127.0.0.1".to_string(),
            port,
            password: Some("secret".to_string()),
            ttl: Duration::from_secs(3600),
        }
    }

    /// Read one RESP array command; `None` once the peer hangs up.
    async fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let argc: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;
            let mut buf = vec![0; len + 2];
            reader.read_exact(&mut buf).await.ok()?;
            buf.truncate(len);
            args.push(String::from_utf8_lossy(&buf).into_owned());
        }
        Some(args)
    }

    /// Minimal RESP server. The first connection is closed right after it
    /// answers a PING; later connections stay open.
    async fn flaky_server() -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
                tokio::spawn(async move {
                    let mut reader = BufReader::new(socket);
                    while let Some(args) = read_command(&mut reader).await {
                        let name = args.first().map(|a| a.to_uppercase()).unwrap_or_default();
                        let reply: &[u8] = match name.as_str() {
                            "PING" => b"+PONG\r\n",
                            "GET" => b"$-1\r\n",
                            _ => b"+OK\r\n",
                        };
                        if reader.get_mut().write_all(reply).await.is_err() {
                            return;
                        }
                        if first && name == "PING" {
                            return;
                        }
                    }
                });
            }
        });

        (port, accepted)
    }

    #[test]
    fn builds_client_without_connecting() {
        assert!(RedisStore::new(&cfg(6379)).is_ok());
    }

    #[tokio::test]
    async fn probe_fails_when_nothing_listens() {
        // Port 9 (discard) on localhost is not expected to speak RESP.
        let store = RedisStore::new(&cfg(9)).unwrap();
        assert!(store.ping().await.is_err());
    }

    #[tokio::test]
    async fn reopens_connection_after_server_drops_it() {
        let (port, accepted) = flaky_server().await;
        let mut cfg = cfg(port);
        cfg.password = None;
        let store = RedisStore::new(&cfg).unwrap();

        store.ping().await.unwrap();

        // The dropped connection may fail one call; the store must recover after that.
        let mut stored = false;
        for _ in 0..3 {
            if store.set("USD_RUB", r#"{"timestamp":1.0,"rate":2.0}"#).await.is_ok() {
                stored = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(stored);
        assert_eq!(store.get("USD_RUB").await.unwrap(), None);
        assert!(accepted.load(Ordering::SeqCst) >= 2);
    }
}
