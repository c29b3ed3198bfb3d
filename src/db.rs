use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::PoolConfig;

/// Opens the shared pool. Acquiring a connection waits at most
/// `cfg.acquire_timeout` before failing with `PoolTimedOut`.
pub async fn connect(database_url: &str, cfg: &PoolConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.acquire_timeout)
        .connect(database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}
