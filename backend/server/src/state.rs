use std::sync::Arc;

use anyhow::Context;
use bank::{Service, store::FileStore};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::warn;

use super::{
    config::Config,
    database::{ContestListing, init_pool, init_schema},
};

const BUNDLED_CONTESTS: &str = include_str!("../data/contests.json");

pub struct State {
    pub config: Config,
    pub pool: SqlitePool,
    pub service: Mutex<Service<FileStore>>,
    pub fallback_contests: Vec<ContestListing>,
}

impl State {
    pub async fn new() -> anyhow::Result<Arc<Self>> {
        let config = Config::load();

        let pool = init_pool(&config.database_url).context("Invalid DATABASE_URL")?;
        if let Err(e) = init_schema(&pool).await {
            warn!("Contest tables unavailable, serving bundled contests until they are: {e}");
        }

        let store = FileStore::open(&config.data_dir).context("Cannot open data directory")?;
        let service = Service::open(store).context("Cannot load persisted state")?;

        Self::from_parts(config, pool, service)
    }

    pub fn from_parts(config: Config, pool: SqlitePool, service: Service<FileStore>) -> anyhow::Result<Arc<Self>> {
        Ok(Arc::new(Self {
            config,
            pool,
            service: Mutex::new(service),
            fallback_contests: bundled_contests()?,
        }))
    }
}

pub fn bundled_contests() -> anyhow::Result<Vec<ContestListing>> {
    serde_json::from_str(BUNDLED_CONTESTS).context("Bundled contests are malformed")
}
