//! Redis-backed JSON cache
//!
//! Values are stored under the configured key prefix with a TTL. When Redis
//! is disabled every lookup is a miss and every write is dropped; Redis
//! failures are logged and treated the same way so the portal keeps serving
//! from the database.

use redis::{AsyncCommands, Client, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use crate::config::RedisConfig;
use crate::utils::errors::Result;

#[derive(Clone)]
#[derive(Debug)]
pub struct CacheService {
    client: Option<Client>,
    prefix: String,
    ttl_seconds: u64,
}

impl CacheService {
    /// Create the cache; a disabled config yields a no-op cache
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = if config.enabled {
            Some(Client::open(config.url.as_str())?)
        } else {
            None
        };

        Ok(Self {
            client,
            prefix: config.prefix.clone(),
            ttl_seconds: config.ttl_seconds,
        })
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            client: None,
            prefix: String::new(),
            ttl_seconds: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.client.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "Redis connection failed");
                None
            }
        }
    }

    /// Fetch and decode a cached value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection().await?;
        let full_key = self.full_key(key);

        let result: RedisResult<Option<String>> = conn.get(&full_key).await;
        match result {
            Ok(Some(data)) => match serde_json::from_str::<T>(&data) {
                Ok(value) => {
                    debug!(key = %full_key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %full_key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %full_key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    /// Store a value with the default TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let full_key = self.full_key(key);

        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Failed to serialize cache value");
                return;
            }
        };

        let result: RedisResult<()> = conn.set_ex(&full_key, serialized, self.ttl_seconds).await;
        if let Err(e) = result {
            warn!(key = %full_key, error = %e, "Redis SET failed");
        } else {
            debug!(key = %full_key, ttl = self.ttl_seconds, "Value cached");
        }
    }

    /// Delete every key starting with `pattern_prefix`
    pub async fn invalidate_prefix(&self, pattern_prefix: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let pattern = format!("{}*", self.full_key(pattern_prefix));

        let keys: RedisResult<Vec<String>> = conn.keys(&pattern).await;
        let keys = match keys {
            Ok(keys) if keys.is_empty() => return,
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Redis KEYS failed");
                return;
            }
        };

        let result: RedisResult<u64> = conn.del(&keys).await;
        match result {
            Ok(deleted) => debug!(pattern = %pattern, deleted = deleted, "Cache entries invalidated"),
            Err(e) => warn!(pattern = %pattern, error = %e, "Redis DEL failed"),
        }
    }

    /// PING the server; a disabled cache counts as healthy
    pub async fn health_check(&self) -> bool {
        if self.client.is_none() {
            return true;
        }

        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(response) => response == "PONG",
            Err(e) => {
                warn!(error = %e, "Redis health check failed");
                false
            }
        }
    }
}
