use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, IntoConnectionInfo, RedisError};
use tracing::info;

use super::CacheStore;
use crate::error::CacheError;

/// Opens a managed connection. The manager reconnects on its own after a dropped
/// connection, so one instance is shared by the rank index and the cache.
pub async fn connect_redis(url: &str) -> Result<ConnectionManager, RedisError> {
    let client = redis::Client::open(url)?;
    let addr = client.get_connection_info().addr.to_string();
    let conn = ConnectionManager::new(client).await?;

    info!("Connected to Redis at {}", addr);
    Ok(conn)
}

/// `host:port` of a Redis URL, leaving out any credentials it carries.
pub fn redis_addr(url: &str) -> String {
    match url.into_connection_info() {
        Ok(info) => info.addr.to_string(),
        Err(_) => "an unparsable URL".to_string()
    }
}

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let (): () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let (): () = conn.del(keys).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
