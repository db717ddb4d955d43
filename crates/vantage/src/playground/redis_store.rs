use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use super::{base_key, data_key, BaseCheck, CachedCheck, PlaygroundStore, StoreError, PLAYGROUND_TTL};
use crate::protocol::CheckResult;

/// Playground cache in Redis: a hash for the base and a set of JSON results
#[derive(Clone)]
pub struct RedisPlaygroundStore {
    redis: ConnectionManager,
}

impl RedisPlaygroundStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        debug!("Connected playground store to Redis");
        Ok(Self { redis })
    }

    fn ttl_secs() -> i64 {
        PLAYGROUND_TTL.as_secs() as i64
    }
}

#[async_trait]
impl PlaygroundStore for RedisPlaygroundStore {
    async fn store_base(&self, id: &str, base: &BaseCheck) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let key = base_key(id);
        let time = base.time.to_string();
        let fields = [("url", base.url.as_str()), ("method", base.method.as_str()), ("time", time.as_str())];

        redis.hset_multiple::<_, _, _, ()>(&key, &fields[..]).await?;
        redis.expire::<_, ()>(&key, Self::ttl_secs()).await?;
        Ok(())
    }

    async fn store_check(&self, id: &str, check: &CheckResult) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let key = data_key(id);
        let member = serde_json::to_string(&check.clone().without_body())?;

        redis.sadd::<_, _, ()>(&key, member).await?;
        redis.expire::<_, ()>(&key, Self::ttl_secs()).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CachedCheck>, StoreError> {
        let mut redis = self.redis.clone();
        let key = base_key(id);

        let fields: HashMap<String, String> = redis.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let field = |name: &str| {
            fields.get(name).cloned().ok_or_else(|| StoreError::Corrupt {
                key: key.clone(),
                message: format!("missing field {name}"),
            })
        };
        let time = field("time")?.parse::<i64>().map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            message: e.to_string(),
        })?;
        let base = BaseCheck { url: field("url")?, method: field("method")?, time };

        let members: Vec<String> = redis.smembers(data_key(id)).await?;
        let checks = members
            .iter()
            .map(|member| serde_json::from_str::<CheckResult>(member))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CachedCheck::new(base, checks)))
    }
}
