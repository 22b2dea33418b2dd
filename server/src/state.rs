use std::sync::Arc;

use crate::cache::JoinedCache;
use crate::config::Config;
use crate::error::ServerError;
use crate::payout::SimulatedPayout;
use crate::store::{MemoryStore, PgStore, Store};

pub struct AppState {
    pub store: Store,
    pub cache: Option<JoinedCache>,
    pub payout: SimulatedPayout,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self, ServerError> {
        let store = match (&config.database_url, &config.local_store_path) {
            (Some(url), _) => {
                tracing::info!("using postgres store");
                Store::Postgres(PgStore::connect(url).await?)
            }
            (None, Some(path)) => Store::Memory(MemoryStore::open(path.clone()).await?),
            (None, None) => {
                tracing::warn!("DATABASE_URL not set, campaigns are kept in memory only");
                Store::Memory(MemoryStore::new())
            }
        };

        let cache = match &config.redis_url {
            Some(url) => Some(JoinedCache::open(url)?),
            None => None,
        };

        Ok(Self {
            store,
            cache,
            payout: SimulatedPayout::new(config.payout_confirmation),
        })
    }
}
