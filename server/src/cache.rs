use redis::AsyncCommands;

/// Redis set per campaign of wallets that already submitted an entry.
///
/// Best effort: a Redis failure is logged and treated as a miss, the store's
/// uniqueness constraint stays authoritative.
pub struct JoinedCache {
    redis: redis::Client,
}

pub fn joined_wallets_key(campaign_id: &str) -> String {
    format!("campaign-{}:joined-wallets", campaign_id)
}

impl JoinedCache {
    pub fn open(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            redis: redis::Client::open(redis_url)?,
        })
    }

    pub async fn contains(&self, campaign_id: &str, wallet_address: &str) -> bool {
        let key = joined_wallets_key(campaign_id);

        match self.is_member(&key, wallet_address).await {
            Ok(hit) => {
                tracing::debug!(%key, wallet_address, hit, "joined cache lookup");
                hit
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "joined cache lookup failed");
                false
            }
        }
    }

    pub async fn remember(&self, campaign_id: &str, wallet_address: &str) {
        let key = joined_wallets_key(campaign_id);

        if let Err(err) = self.add_member(&key, wallet_address).await {
            tracing::warn!(%key, error = %err, "failed to write joined cache");
        }
    }

    pub async fn forget_campaign(&self, campaign_id: &str) {
        let key = joined_wallets_key(campaign_id);

        if let Err(err) = self.delete(&key).await {
            tracing::warn!(%key, error = %err, "failed to evict joined cache");
        }
    }

    async fn is_member(&self, key: &str, wallet_address: &str) -> redis::RedisResult<bool> {
        let mut con = self.redis.get_async_connection().await?;
        con.sismember(key, wallet_address).await
    }

    async fn add_member(&self, key: &str, wallet_address: &str) -> redis::RedisResult<()> {
        let mut con = self.redis.get_async_connection().await?;
        con.sadd(key, wallet_address).await
    }

    async fn delete(&self, key: &str) -> redis::RedisResult<()> {
        let mut con = self.redis.get_async_connection().await?;
        con.del(key).await
    }
}
