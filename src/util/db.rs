use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

use crate::util::env::env_flag;

const CATALOG_SCHEMA: &str = include_str!("../../migrations/0001_catalog.sql");

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options =
            PgConnectOptions::from_str(database_url).context("invalid database URL")?;

        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        // PgBouncer txn mode safe unless prepared statements are explicitly wanted
        if !env_flag("USE_PREPARED", false) {
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .context("failed to connect to database")?;
        info!(max_connections, "connected to db");
        Ok(Self { pool })
    }

    /// Create the catalog tables if they are missing and seed the market rows.
    /// Every statement is idempotent, so this runs on each start.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(CATALOG_SCHEMA)
            .execute(&self.pool)
            .await
            .context("failed to apply catalog schema")?;
        info!("catalog schema ensured");
        Ok(())
    }
}
