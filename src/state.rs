use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::jwt::JwtKeys;
use crate::bicycles::repo::{BicycleRepo, PgBicycles};
use crate::config::AppConfig;
use crate::rentals::repo::{PgRentals, RentalRepo};
use crate::users::repo::{PgUsers, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Built once from `config.jwt`; shared by every request.
    pub jwt: Arc<JwtKeys>,
    pub bicycles: Arc<dyn BicycleRepo>,
    pub users: Arc<dyn UserRepo>,
    pub rentals: Arc<dyn RentalRepo>,
}

impl AppState {
    /// Connects to Postgres and returns the pool with a state built over it.
    pub async fn init() -> anyhow::Result<(Self, PgPool)> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        Ok((Self::from_pool(db.clone(), config), db))
    }

    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            jwt: Arc::new(JwtKeys::new(&config.jwt)),
            config,
            bicycles: Arc::new(PgBicycles::new(db.clone())),
            users: Arc::new(PgUsers::new(db.clone())),
            rentals: Arc::new(PgRentals::new(db)),
        }
    }

    /// State over a fresh in-memory store.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;
        use crate::store::memory::MemoryStore;

        let store = Arc::new(MemoryStore::default());
        let config = Arc::new(AppConfig {
            database_url: "postgres://localhost/velorent_test".into(),
            listen_addr: ([127, 0, 0, 1], 0).into(),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            admin: None,
        });

        Self {
            jwt: Arc::new(JwtKeys::new(&config.jwt)),
            config,
            bicycles: store.clone(),
            users: store.clone(),
            rentals: store,
        }
    }
}
